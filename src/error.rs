//! Error taxonomy for chain resolution.
//!
//! Two of these variants are control flow rather than real failures and
//! call sites are expected to match on them:
//!
//! - [`ChainError::FillerReached`] - the requested position plays empty
//!   media. The chain below it is intact; there is just nothing recorded
//!   there. Carries the window length so iteration can continue past it.
//! - [`ChainError::AmbiguousEffect`] - resolution hit an effect whose
//!   output depends on which argument you follow, and the caller asked for
//!   the neutral choice. Carries the effect itself so the caller can pick a
//!   slot and re-resolve, or skip past it.
//!
//! Everything else is a hard failure of the walk: malformed graph shapes
//! surface as [`ChainError::TraversalNotPossible`] with a short reason,
//! missing registry entries as [`ChainError::MobNotFound`] /
//! [`ChainError::TrackNotFound`], and raw interchange codes that the decode
//! layer failed to validate as the `Invalid*` / `Unsupported*` variants.

use thiserror::Error;

use crate::entities::{Effect, MobId, TrackId};
use crate::rate::Length;

/// Result type alias used across the crate.
pub type ChainResult<T> = Result<T, ChainError>;

/// Failure modes of mob-chain resolution.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The graph cannot be walked further from the requested position.
    /// Also signals end of chain (a null source reference).
    #[error("traversal not possible: {reason}")]
    TraversalNotPossible { reason: &'static str },

    /// The position lands on filler. Non-error terminal.
    #[error("position lands on filler (min length {min_length})")]
    FillerReached { min_length: Length },

    /// An effect needs an explicit argument choice to resolve through.
    #[error("effect '{}' needs an argument choice (length {length})", effect.operation)]
    AmbiguousEffect { effect: Box<Effect>, length: Length },

    /// A rendered result was required but the effect has none.
    #[error("no rendered result available")]
    RenderNotFound,

    /// The referenced mob is not in the store.
    #[error("mob not found: {mob_id}")]
    MobNotFound { mob_id: MobId },

    /// The referenced track is not in the mob.
    #[error("track {track_id} not found in mob {mob_id}")]
    TrackNotFound { mob_id: MobId, track_id: TrackId },

    /// The sequence cursor ran off the end. Callers treat this as
    /// "no such neighbor".
    #[error("sequence cursor exhausted")]
    EndOfSequence,

    /// Unknown mob-kind code in interchange data.
    #[error("unknown mob kind code {code}")]
    InvalidMobKind { code: u32 },

    /// Unknown rounding-mode code in interchange data.
    #[error("unknown rounding mode code {code}")]
    InvalidRounding { code: u32 },

    /// Unknown cadence-pattern code in interchange data.
    #[error("unknown cadence kind code {code}")]
    UnsupportedCadenceKind { code: u32 },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ChainError {
    /// Shorthand for the most common failure.
    pub fn not_possible(reason: &'static str) -> Self {
        Self::TraversalNotPossible { reason }
    }

    /// True for the non-error terminal (position plays empty media).
    pub fn is_filler(&self) -> bool {
        matches!(self, Self::FillerReached { .. })
    }

    /// True when resolution stopped at an effect awaiting a choice.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::AmbiguousEffect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_reason() {
        let e = ChainError::not_possible("null source reference");
        assert_eq!(
            e.to_string(),
            "traversal not possible: null source reference"
        );
    }

    #[test]
    fn test_filler_predicate() {
        let e = ChainError::FillerReached { min_length: 12 };
        assert!(e.is_filler());
        assert!(!e.is_ambiguous());
    }
}
