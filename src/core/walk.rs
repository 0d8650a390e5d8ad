//! Mob-chain walker: hop from a resolved leaf to the referenced mob.
//!
//! One hop takes the leaf a track position resolved to, translates the
//! position into the referenced track's coordinates, and recurses until the
//! mob on hand satisfies the caller's target kind. Two hop flavors exist:
//!
//! - plain source clip: `start_time + diff` converted across the edit rates
//!   of the two tracks (`Nearest` for positions, `Ceiling` for window
//!   lengths, so the converted span still covers the original);
//! - cadence map around a source clip: positions walk the cadence pattern
//!   instead — the mapping *is* the rate conversion, no rational conversion
//!   applies on that hop.

use log::debug;

use super::leaf::{resolve_leaf, LeafResolution, Neighbors, ResolveCtx, Window};
use super::scope::ScopeStack;
use super::{CadenceHop, FindResult, SearchOptions};
use crate::cadence::map_offset;
use crate::entities::{ComponentKind, MobId, MobStore, Track, TrackId};
use crate::error::{ChainError, ChainResult};
use crate::rate::{convert_length, convert_position, Length, Position, Rounding};

/// Where the chain continues after one hop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NextHop {
    pub mob_id: MobId,
    pub track_id: TrackId,
    /// Origin-relative position on the target track, in its units.
    pub position: Position,
    /// Window length in the target track's units.
    pub length: Length,
    pub cadence: Option<CadenceHop>,
}

/// Translate a resolved leaf into the next hop down the chain.
pub fn find_next_mob(
    store: &MobStore,
    track: &Track,
    leaf: &LeafResolution<'_>,
) -> ChainResult<NextHop> {
    match leaf.leaf {
        ComponentKind::CadenceMap(cm) => match cm.input.as_ref() {
            ComponentKind::SourceClip(sc) => {
                if sc.source.is_null() {
                    return Err(ChainError::not_possible("null source reference (end of chain)"));
                }
                let mapped = map_offset(cm.kind, leaf.diff_pos, cm.phase, false, cm.direction);
                let mapped_end = map_offset(
                    cm.kind,
                    leaf.diff_pos + leaf.min_length,
                    cm.phase,
                    false,
                    cm.direction,
                );
                Ok(NextHop {
                    mob_id: sc.source.mob_id,
                    track_id: sc.source.track_id,
                    position: sc.source.start_time + mapped,
                    length: mapped_end - mapped,
                    cadence: Some(CadenceHop {
                        kind: cm.kind,
                        phase: cm.phase,
                        direction: cm.direction,
                    }),
                })
            }
            ComponentKind::Filler(_) => Err(ChainError::FillerReached {
                min_length: leaf.min_length,
            }),
            _ => Err(ChainError::not_possible("cadence map does not wrap a source clip")),
        },

        ComponentKind::SourceClip(sc) => {
            if sc.source.is_null() {
                return Err(ChainError::not_possible("null source reference (end of chain)"));
            }
            let target = store.get(sc.source.mob_id).ok_or(ChainError::MobNotFound {
                mob_id: sc.source.mob_id,
            })?;
            let target_track = store.resolve_track(target, sc.source.track_id)?;
            Ok(NextHop {
                mob_id: sc.source.mob_id,
                track_id: sc.source.track_id,
                position: convert_position(
                    sc.source.start_time + leaf.diff_pos,
                    track.edit_rate,
                    target_track.edit_rate,
                    Rounding::Nearest,
                ),
                length: convert_length(
                    leaf.min_length,
                    track.edit_rate,
                    target_track.edit_rate,
                    Rounding::Ceiling,
                ),
                cadence: None,
            })
        }

        ComponentKind::Filler(_) => Err(ChainError::FillerReached {
            min_length: leaf.min_length,
        }),

        _ => Err(ChainError::not_possible("leaf does not reference a source")),
    }
}

/// Classify-then-hop recursion: stop when the mob on hand matches the
/// desired kind, otherwise resolve, hop, recurse.
pub(crate) fn mob_find_source(
    store: &MobStore,
    mob_id: MobId,
    track_id: TrackId,
    offset: Position,
    length: Length,
    options: SearchOptions,
    cadence: Option<CadenceHop>,
) -> ChainResult<FindResult> {
    let mob = store.get(mob_id).ok_or(ChainError::MobNotFound { mob_id })?;
    let track = store.resolve_track(mob, track_id)?;

    if mob.matches(options.desired) {
        debug!("chain stop: mob={mob_id} track={track_id} pos={offset} len={length}");
        return Ok(FindResult {
            mob_id,
            track_id,
            position: offset,
            edit_rate: track.edit_rate,
            min_length: length,
            cadence,
            pending_effect: None,
        });
    }

    let ctx = ResolveCtx {
        store,
        criteria: options.criteria,
    };
    let mut scope = ScopeStack::new();
    let win = Window {
        base: 0,
        pos: track.origin + offset,
        len: length,
    };
    let leaf = resolve_leaf(&ctx, &track.segment, win, options.choice, Neighbors::default(), &mut scope)?;
    let hop = find_next_mob(store, track, &leaf)?;
    debug!(
        "hop: mob={mob_id} track={track_id} -> mob={} track={} pos={} len={}",
        hop.mob_id, hop.track_id, hop.position, hop.length
    );
    mob_find_source(
        store,
        hop.mob_id,
        hop.track_id,
        hop.position,
        hop.length,
        options,
        hop.cadence.or(cadence),
    )
}

/// Full-chain walk by straight position lookup.
///
/// `position` is origin-relative on the named track. The walk stops at the
/// first mob matching `options.desired` (the starting mob itself may match)
/// and reports the position, window and edit rate on that mob's track.
pub fn find_source(
    store: &MobStore,
    mob_id: MobId,
    track_id: TrackId,
    position: Position,
    length: Length,
    options: SearchOptions,
) -> ChainResult<FindResult> {
    debug!(
        "find_source: mob={mob_id} track={track_id} pos={position} len={length} desired={:?}",
        options.desired
    );
    mob_find_source(store, mob_id, track_id, position, length, options, None)
}
