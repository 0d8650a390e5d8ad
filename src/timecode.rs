//! Timecode values and timecode lookup on a mob.
//!
//! A timecode track carries a [`TimecodeClip`](crate::entities::TimecodeClip)
//! whose `start` is the frame count since midnight at the clip's first
//! position. [`timecode_at`] resolves a track offset to the timecode label
//! at that offset, which is how tape positions get reported back to users.
//!
//! Drop-frame counting (30 fps carriers only) skips frame numbers 0 and 1
//! of every minute except each tenth minute, so wall-clock and timecode stay
//! within a frame over an hour.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::leaf::{resolve_leaf, Neighbors, ResolveCtx, Window};
use crate::core::scope::ScopeStack;
use crate::core::EffectChoice;
use crate::entities::{ComponentKind, MediaCriteria, MobId, MobStore};
use crate::error::{ChainError, ChainResult};
use crate::rate::Position;

/// A timecode label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
    pub fps: u32,
    pub drop: bool,
}

impl Timecode {
    /// Label for a frame count since midnight. Wraps at 24h; negative
    /// offsets wrap backward. Drop-frame counting applies only on 30 fps
    /// carriers; for any other rate `drop` is carried but counts non-drop.
    pub fn from_offset(offset: Position, fps: u32, drop: bool) -> Self {
        let fps = fps.max(1);
        let day = fps as i64 * 86_400;
        let mut frame = offset.rem_euclid(day) as u64;
        if drop && fps == 30 {
            // re-index as if the dropped numbers existed
            let d = frame / 17_982; // frames per 10 minutes
            let m = frame % 17_982;
            frame += if m < 2 {
                18 * d
            } else {
                18 * d + 2 * ((m - 2) / 1_798) // frames per dropped minute
            };
        }
        let fps64 = fps as u64;
        Self {
            hours: (frame / (fps64 * 3600)) as u32,
            minutes: (frame / (fps64 * 60) % 60) as u32,
            seconds: (frame / fps64 % 60) as u32,
            frames: (frame % fps64) as u32,
            fps,
            drop,
        }
    }

    /// Frame count since midnight for this label.
    pub fn to_offset(&self) -> Position {
        let fps = self.fps.max(1) as i64;
        let seconds = self.hours as i64 * 3600 + self.minutes as i64 * 60 + self.seconds as i64;
        let mut frame = seconds * fps + self.frames as i64;
        if self.drop && self.fps == 30 {
            let minutes = self.hours as i64 * 60 + self.minutes as i64;
            frame -= 2 * (minutes - minutes / 10);
        }
        frame
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.drop { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hours, self.minutes, self.seconds, sep, self.frames
        )
    }
}

/// Timecode label at an origin-relative offset on a mob's timecode track.
pub fn timecode_at(store: &MobStore, mob_id: MobId, offset: Position) -> ChainResult<Timecode> {
    let mob = store
        .get(mob_id)
        .ok_or(ChainError::MobNotFound { mob_id })?;
    let track = mob
        .timecode_track()
        .ok_or(ChainError::not_possible("mob has no timecode track"))?;
    let mut scope = ScopeStack::new();
    let ctx = ResolveCtx {
        store,
        criteria: MediaCriteria::Any,
    };
    let win = Window {
        base: 0,
        pos: track.origin + offset,
        len: 1,
    };
    let leaf = resolve_leaf(
        &ctx,
        &track.segment,
        win,
        EffectChoice::Neutral,
        Neighbors::default(),
        &mut scope,
    )?;
    match leaf.leaf {
        ComponentKind::TimecodeClip(tc) => {
            let label = Timecode::from_offset(tc.start + leaf.diff_pos, tc.fps, tc.drop);
            debug!("timecode_at: mob={mob_id} offset={offset} -> {label}");
            Ok(label)
        }
        _ => Err(ChainError::not_possible("no timecode at position")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{MediaKind, Mob, MobClass, TimecodeClip, Track};
    use crate::rate::EditRate;

    #[test]
    fn test_non_drop_basics() {
        let tc = Timecode::from_offset(0, 25, false);
        assert_eq!(tc.to_string(), "00:00:00:00");
        let tc = Timecode::from_offset(25 * 3600, 25, false);
        assert_eq!(tc.to_string(), "01:00:00:00");
        assert_eq!(tc.to_offset(), 25 * 3600);
    }

    #[test]
    fn test_drop_frame_minute_boundary() {
        // 00:00:59;29 is the last frame before the first drop
        let tc = Timecode::from_offset(1799, 30, true);
        assert_eq!(tc.to_string(), "00:00:59;29");
        // the next frame number skips :00 and :01
        let tc = Timecode::from_offset(1800, 30, true);
        assert_eq!(tc.to_string(), "00:01:00;02");
        // tenth minute does not drop
        let tc = Timecode::from_offset(17_982, 30, true);
        assert_eq!(tc.to_string(), "00:10:00;00");
    }

    #[test]
    fn test_drop_frame_round_trip() {
        for offset in (0..20_000).step_by(7) {
            let tc = Timecode::from_offset(offset, 30, true);
            assert_eq!(tc.to_offset(), offset, "at {tc}");
        }
    }

    #[test]
    fn test_wraps_at_midnight() {
        let day = 25 * 86_400;
        let tc = Timecode::from_offset(day + 5, 25, false);
        assert_eq!(tc.to_offset(), 5);
        let tc = Timecode::from_offset(-1, 25, false);
        assert_eq!(tc.to_string(), "23:59:59:24");
    }

    #[test]
    fn test_timecode_at_on_tape_mob() {
        let mut store = MobStore::new();
        let mut tape = Mob::new("tape 042", MobClass::Source { essence: None });
        tape.tracks.push(Track::new(
            1,
            MediaKind::Timecode,
            EditRate::new(25, 1),
            TimecodeClip::new(90_000, 25 * 3600, 25, false),
        ));
        let id = store.add(tape);

        let tc = timecode_at(&store, id, 5).unwrap();
        assert_eq!(tc.to_string(), "01:00:00:05");
    }

    #[test]
    fn test_timecode_at_without_track() {
        let mut store = MobStore::new();
        let id = store.add(Mob::new("comp", MobClass::Composition));
        assert!(matches!(
            timecode_at(&store, id, 0),
            Err(ChainError::TraversalNotPossible { .. })
        ));
    }
}
