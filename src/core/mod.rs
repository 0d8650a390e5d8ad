//! Core module - source-chain resolution over the entities model
//!
//! `scope`, `cursor` and `leaf` resolve a position on one track down to a
//! leaf component; `walk` hops from that leaf to the referenced mob and
//! recurses; `search` adds the stateful sequential interface on top.

pub mod cursor;
pub mod leaf;
pub mod scope;
pub mod search;
pub mod walk;

use serde::{Deserialize, Serialize};

use crate::cadence::{CadenceDirection, CadenceKind};
use crate::entities::{Effect, MediaCriteria, MobId, TargetKind, TrackId};
use crate::rate::{EditRate, Length, Position};

pub use search::{search_source, SourceSearch};
pub use walk::find_source;

/// Which branch resolution follows through an effect or transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectChoice {
    /// No preference; an effect in the path is reported as ambiguous.
    #[default]
    Neutral,
    /// The material flowing into a transition (its preceding neighbor).
    Incoming,
    /// The material flowing out of a transition (its following neighbor).
    Outgoing,
    /// The stored rendered form.
    Rendered,
    /// A specific effect input slot.
    Slot(u32),
}

/// Knobs for a source search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// How far down the chain to go.
    pub desired: TargetKind,
    /// What to optimize when picking among media renditions.
    pub criteria: MediaCriteria,
    /// How to traverse effects and transitions.
    pub choice: EffectChoice,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_desired(mut self, desired: TargetKind) -> Self {
        self.desired = desired;
        self
    }

    pub fn with_criteria(mut self, criteria: MediaCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_choice(mut self, choice: EffectChoice) -> Self {
        self.choice = choice;
        self
    }
}

/// A cadence mapping crossed during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceHop {
    pub kind: CadenceKind,
    pub phase: u32,
    pub direction: CadenceDirection,
}

/// Where a source search landed.
#[derive(Clone, Debug, PartialEq)]
pub struct FindResult {
    pub mob_id: MobId,
    /// Track id as addressable under the store's revision.
    pub track_id: TrackId,
    /// Origin-relative position on the found track.
    pub position: Position,
    pub edit_rate: EditRate,
    /// Span for which this answer holds, in the found track's units.
    pub min_length: Length,
    /// Cadence mapping crossed on the way down, if any.
    pub cadence: Option<CadenceHop>,
    /// Effect deferred by an earlier ambiguity, reported once.
    pub pending_effect: Option<Effect>,
}
