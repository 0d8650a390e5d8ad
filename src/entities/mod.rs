//! Entities module - the persistent data model of an interchange file
//!
//! Components occupy time on tracks, tracks belong to mobs, mobs live in a
//! store. Resolution code under `core` walks these structures read-only.

pub mod component;
pub mod mob;
pub mod store;
pub mod track;

pub use component::{
    CadenceMap, Component, ComponentKind, EdgecodeClip, EdgecodeFormat, Effect, EffectSlot,
    Filler, LegacySlot, MediaGroup, NestedScope, ScopeReference, Selector, Sequence, SourceClip,
    SourceRef, TimecodeClip, TrackGroup, Transition,
};
pub use mob::{EssenceKind, Mob, MobClass, MobId, MobKind, TargetKind, UsageCode};
pub use store::{
    CheckingGuard, FirstChoiceSelector, MediaCriteria, MediaSelector, MobStore, Revision,
};
pub use track::{MediaKind, Track, TrackId};
