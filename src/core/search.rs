//! Sequential source search over a track.
//!
//! A [`SourceSearch`] walks a track's sequence entry by entry, resolving
//! each down the mob chain. It keeps just enough state to make error
//! recovery useful:
//!
//! - filler entries surface as [`ChainError::FillerReached`] after the
//!   filler window is consumed, so the next call lands on real material;
//! - ambiguous effects surface as [`ChainError::AmbiguousEffect`] with the
//!   effect stashed and a shadow position planted past it; the next call
//!   jumps the shadow and reports the stashed effect as `pending_effect`
//!   on its result.
//!
//! [`search_source`] is the one-shot positioned variant sharing the same
//! machinery.

use log::debug;

use super::cursor::{CursorStep, SequenceCursor};
use super::leaf::{resolve_leaf, Neighbor, Neighbors, ResolveCtx, Window};
use super::scope::{ScopeFrame, ScopeStack};
use super::walk::{find_next_mob, mob_find_source};
use super::{FindResult, SearchOptions};
use crate::entities::{ComponentKind, Effect, Mob, MobId, MobStore, NestedScope, Track, TrackId};
use crate::error::{ChainError, ChainResult};
use crate::rate::{Length, Position};

/// Stateful sequential search over one track.
#[derive(Debug)]
pub struct SourceSearch<'a> {
    store: &'a MobStore,
    mob: &'a Mob,
    track: &'a Track,
    /// Scope wrapped around the iterated sequence, pre-seeded per resolve.
    enclosing: Option<&'a NestedScope>,
    cursor: SequenceCursor<'a>,
    current: Option<CursorStep<'a>>,
    prev: Option<CursorStep<'a>>,
    /// Segment-space position of the search head.
    position: Position,
    /// Where to resume after an ambiguous effect.
    shadow: Option<Position>,
    /// Effect deferred by an ambiguity, reported on the next success.
    stashed: Option<Effect>,
    options: SearchOptions,
}

impl<'a> SourceSearch<'a> {
    /// Open a search positioned at the start of the track's sequence.
    ///
    /// The track's top segment may be a Sequence, a NestedScope whose value
    /// slot is a Sequence, or any single component (iterated as a one-entry
    /// sequence).
    pub fn open(
        store: &'a MobStore,
        mob_id: MobId,
        track_id: TrackId,
        options: SearchOptions,
    ) -> ChainResult<Self> {
        let mob = store.get(mob_id).ok_or(ChainError::MobNotFound { mob_id })?;
        let track = store.resolve_track(mob, track_id)?;
        let (items, enclosing): (&[ComponentKind], _) = match &track.segment {
            ComponentKind::Sequence(seq) => (&seq.components, None),
            ComponentKind::NestedScope(ns) => match ns.slots.last() {
                Some(ComponentKind::Sequence(seq)) => (&seq.components, Some(ns)),
                _ => (std::slice::from_ref(&track.segment), None),
            },
            _ => (std::slice::from_ref(&track.segment), None),
        };
        debug!(
            "open search: mob={mob_id} track={track_id} entries={} scoped={}",
            items.len(),
            enclosing.is_some()
        );
        Ok(Self {
            store,
            mob,
            track,
            enclosing,
            cursor: SequenceCursor::new(items, store.checking_enabled()),
            current: None,
            prev: None,
            position: 0,
            shadow: None,
            stashed: None,
            options,
        })
    }

    /// Resolve the entry under the search head and advance past it.
    ///
    /// `FillerReached` consumes the filler window before re-raising;
    /// `AmbiguousEffect` stashes the effect and plants a shadow position
    /// past it; `EndOfSequence` reports exhaustion. Everything else
    /// surfaces unchanged without advancing.
    pub fn next_source(&mut self) -> ChainResult<FindResult> {
        if let Some(resume) = self.shadow.take() {
            self.position = resume;
        }
        let step = self.ensure_current()?;
        match self.resolve_current(step, None) {
            Ok((mut found, consume)) => {
                self.position += consume;
                found.pending_effect = self.stashed.take();
                Ok(found)
            }
            Err(ChainError::FillerReached { min_length }) => {
                let remaining = step.offset + step.exposed - self.position;
                self.position += min_length.min(remaining);
                Err(ChainError::FillerReached { min_length })
            }
            Err(ChainError::AmbiguousEffect { effect, length }) => {
                self.shadow = Some(self.position + length);
                self.stashed = Some((*effect).clone());
                Err(ChainError::AmbiguousEffect { effect, length })
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve the entry under the search head without consuming anything.
    ///
    /// On a fresh handle this materializes the first entry.
    pub fn this_source(&mut self) -> ChainResult<FindResult> {
        let step = self.ensure_current()?;
        let (mut found, _) = self.resolve_current(step, None)?;
        found.pending_effect = self.stashed.clone();
        Ok(found)
    }

    /// Explicitly end the search (dropping the handle does the same).
    pub fn close(self) {}

    /// Segment-space position of the search head.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn mob_id(&self) -> MobId {
        self.mob.id
    }

    /// Advance the cursor until an entry's exposure covers the head.
    fn ensure_current(&mut self) -> ChainResult<CursorStep<'a>> {
        loop {
            if let Some(step) = self.current {
                if self.position < step.offset + step.exposed {
                    return Ok(step);
                }
            }
            let next = self.cursor.advance()?;
            if let Some(passed) = self.current.take() {
                self.prev = Some(passed);
            }
            if self.position < next.offset {
                self.position = next.offset;
            }
            self.current = Some(next);
        }
    }

    /// Resolve the given entry at the head position, down the whole chain.
    ///
    /// Returns the find result and how much of the entry's window the
    /// resolution covered (in this track's units).
    fn resolve_current(
        &self,
        step: CursorStep<'a>,
        want: Option<Length>,
    ) -> ChainResult<(FindResult, Length)> {
        let mut scope = ScopeStack::new();
        if let Some(ns) = self.enclosing {
            scope.push(ScopeFrame::enter(ns, 0));
        }
        let ctx = ResolveCtx {
            store: self.store,
            criteria: self.options.criteria,
        };
        let remaining = step.offset + step.exposed - self.position;
        let win = Window {
            base: step.start,
            pos: self.position,
            len: want.map_or(remaining, |w| w.min(remaining)),
        };
        let neighbors = Neighbors {
            prev: self.prev.map(|p| Neighbor {
                component: p.component,
                base: p.start,
            }),
            next: self.cursor.peek().ok().map(|n| Neighbor {
                component: n.component,
                base: n.start,
            }),
        };
        let leaf = resolve_leaf(&ctx, step.component, win, self.options.choice, neighbors, &mut scope)?;
        let hop = find_next_mob(self.store, self.track, &leaf)?;
        let found = mob_find_source(
            self.store,
            hop.mob_id,
            hop.track_id,
            hop.position,
            hop.length,
            self.options,
            hop.cadence,
        )?;
        Ok((found, leaf.min_length))
    }
}

/// One-shot positioned search.
///
/// Classifies the starting mob first (a zero-hop match is allowed), then
/// resolves `position` through the track's sequence with full transition
/// and scope semantics.
pub fn search_source(
    store: &MobStore,
    mob_id: MobId,
    track_id: TrackId,
    position: Position,
    length: Length,
    options: SearchOptions,
) -> ChainResult<FindResult> {
    let mob = store.get(mob_id).ok_or(ChainError::MobNotFound { mob_id })?;
    let track = store.resolve_track(mob, track_id)?;
    if mob.matches(options.desired) {
        return Ok(FindResult {
            mob_id,
            track_id,
            position,
            edit_rate: track.edit_rate,
            min_length: length,
            cadence: None,
            pending_effect: None,
        });
    }
    let mut search = SourceSearch::open(store, mob_id, track_id, options)?;
    search.position = track.origin + position;
    let step = search.ensure_current()?;
    let (found, _) = search.resolve_current(step, Some(length))?;
    Ok(found)
}
