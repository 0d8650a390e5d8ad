//! Mobs: the media objects whose references form source chains.
//!
//! ## Layering
//!
//! A finished piece is a chain of mobs, each layer referencing the one
//! below through source clips:
//!
//! ```text
//! composition  ->  master  ->  file source  ->  tape source  ->  film source
//! (the edit)       (logical     (digitized      (the reel)       (the negative)
//!                   media)       essence)
//! ```
//!
//! Resolution walks down this chain; callers say how far with a
//! [`TargetKind`].
//!
//! ## Classification
//!
//! Stored mobs carry a structural [`MobClass`]; [`Mob::kind`] folds class,
//! essence and track layout into the concrete [`MobKind`] used for target
//! matching. A physical source without a recorded essence kind counts as
//! tape when it carries a timecode track, which is how most legacy tape
//! mobs arrive.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::track::{MediaKind, Track, TrackId};
use crate::error::{ChainError, ChainResult};

/// Mob identifier.
pub type MobId = Uuid;

/// Physical essence behind a source mob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EssenceKind {
    File,
    Tape,
    Film,
}

/// Structural class of a mob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum MobClass {
    /// An edit: sequences of references to master mobs.
    Composition,
    /// Logical media: indirection between edits and physical sources.
    Master,
    /// Physical media of some essence.
    Source {
        #[serde(default)]
        essence: Option<EssenceKind>,
    },
}

/// What role a composition plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCode {
    TopLevel,
    LowerLevel,
    SubClip,
    AdjustedClip,
    Template,
}

/// Concrete classification used for target matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobKind {
    Composition,
    Master,
    File,
    Tape,
    Film,
}

/// How far down the chain a search should go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Stop at the next mob, whatever it is.
    #[default]
    Any,
    Composition,
    Master,
    File,
    Tape,
    Film,
}

impl TargetKind {
    /// Decode an interchange code (0 = any .. 5 = film).
    pub fn from_raw(code: u32) -> ChainResult<Self> {
        match code {
            0 => Ok(Self::Any),
            1 => Ok(Self::Composition),
            2 => Ok(Self::Master),
            3 => Ok(Self::File),
            4 => Ok(Self::Tape),
            5 => Ok(Self::Film),
            _ => Err(ChainError::InvalidMobKind { code }),
        }
    }
}

/// A media object: identity, class and a set of tracks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mob {
    pub id: MobId,
    #[serde(default)]
    pub name: Option<String>,
    pub class: MobClass,
    #[serde(default)]
    pub usage: Option<UsageCode>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Mob {
    pub fn new(name: impl Into<String>, class: MobClass) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Some(name.into()),
            class,
            usage: None,
            tracks: Vec::new(),
        }
    }

    pub fn composition(name: impl Into<String>) -> Self {
        Self::new(name, MobClass::Composition)
    }

    pub fn master(name: impl Into<String>) -> Self {
        Self::new(name, MobClass::Master)
    }

    pub fn source(name: impl Into<String>, essence: Option<EssenceKind>) -> Self {
        Self::new(name, MobClass::Source { essence })
    }

    pub fn with_id(mut self, id: MobId) -> Self {
        self.id = id;
        self
    }

    pub fn with_usage(mut self, usage: UsageCode) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// First timecode track, if the mob carries one.
    pub fn timecode_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == MediaKind::Timecode)
    }

    /// Concrete classification; `None` for a physical source whose essence
    /// cannot be determined.
    pub fn kind(&self) -> Option<MobKind> {
        match self.class {
            MobClass::Composition => Some(MobKind::Composition),
            MobClass::Master => Some(MobKind::Master),
            MobClass::Source { essence } => match essence {
                Some(EssenceKind::File) => Some(MobKind::File),
                Some(EssenceKind::Tape) => Some(MobKind::Tape),
                Some(EssenceKind::Film) => Some(MobKind::Film),
                // legacy tape mobs: no essence record, no usage, labeled by timecode
                None if self.usage.is_none() && self.timecode_track().is_some() => {
                    Some(MobKind::Tape)
                }
                None => None,
            },
        }
    }

    /// Whether this mob satisfies the caller's search target.
    pub fn matches(&self, target: TargetKind) -> bool {
        let want = match target {
            TargetKind::Any => return true,
            TargetKind::Composition => MobKind::Composition,
            TargetKind::Master => MobKind::Master,
            TargetKind::File => MobKind::File,
            TargetKind::Tape => MobKind::Tape,
            TargetKind::Film => MobKind::Film,
        };
        self.kind() == Some(want)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::component::TimecodeClip;
    use crate::rate::EditRate;

    #[test]
    fn test_target_matching() {
        let master = Mob::master("m");
        assert!(master.matches(TargetKind::Any));
        assert!(master.matches(TargetKind::Master));
        assert!(!master.matches(TargetKind::Tape));

        let file = Mob::source("f", Some(EssenceKind::File));
        assert_eq!(file.kind(), Some(MobKind::File));
        assert!(file.matches(TargetKind::File));
    }

    #[test]
    fn test_tape_heuristic_needs_timecode_track() {
        let bare = Mob::source("reel", None);
        assert_eq!(bare.kind(), None);
        assert!(!bare.matches(TargetKind::Tape));

        let reel = bare.with_track(Track::new(
            1,
            MediaKind::Timecode,
            EditRate::new(25, 1),
            TimecodeClip::new(1000, 0, 25, false),
        ));
        assert_eq!(reel.kind(), Some(MobKind::Tape));
        assert!(reel.matches(TargetKind::Tape));

        // a recorded usage code disqualifies the heuristic
        let tagged = reel.with_usage(UsageCode::SubClip);
        assert_eq!(tagged.kind(), None);
    }

    #[test]
    fn test_target_kind_from_raw() {
        assert_eq!(TargetKind::from_raw(4).unwrap(), TargetKind::Tape);
        assert!(matches!(
            TargetKind::from_raw(9),
            Err(ChainError::InvalidMobKind { code: 9 })
        ));
    }
}
