//! SPINDLE - Mob chain source resolution library
//!
//! Re-exports all modules for use by interchange tools.

// Resolution engine (scope, cursor, leaf descent, chain walk, search)
pub mod core;

// Support modules
pub mod cadence;
pub mod config;
pub mod entities;
pub mod error;
pub mod rate;
pub mod timecode;

// Re-export the resolution entry points
pub use core::{
    find_source, search_source, CadenceHop, EffectChoice, FindResult, SearchOptions, SourceSearch,
};

// Re-export entities
pub use entities::{ComponentKind, MediaCriteria, MediaKind, Mob, MobId, MobStore, TargetKind, Track, TrackId};

// Re-export the vocabulary types
pub use cadence::{CadenceDirection, CadenceKind};
pub use error::{ChainError, ChainResult};
pub use rate::{EditRate, Length, Position, Rounding};
pub use timecode::{timecode_at, Timecode};
