//! Timeline components.
//!
//! Everything that occupies time on a track is a [`ComponentKind`]. Leaf
//! components reference material directly; structural components arrange
//! other components and are peeled away during source resolution.
//!
//! ## Taxonomy
//!
//! ```text
//! leaves              structural
//! ------              ----------
//! Filler              Sequence        end-to-end run, transitions overlap
//! SourceClip          Selector        one picked branch + alternates
//! TimecodeClip        Transition      overlapped cut between neighbors
//! EdgecodeClip        Effect          operation over input slots
//! CadenceMap*         MediaGroup      interchangeable renditions
//!                     NestedScope     private slot namespace
//!                     ScopeReference  back-pointer into a scope
//!                     TrackGroup      legacy multi-slot container
//! ```
//!
//! `CadenceMap` is a leaf for resolution purposes: the walker consumes it
//! together with the source clip it wraps.
//!
//! ## Lengths
//!
//! Every component reports a length in the edit units of its track via the
//! [`Component`] trait. Structural components derive theirs: a sequence sums
//! its non-transition entries (transitions overlap their neighbors and add
//! nothing), a selector reports the selected branch, a cadence map converts
//! its input's length to the outer side of the cadence.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::mob::MobId;
use super::track::{MediaKind, TrackId};
use crate::cadence::{map_offset, CadenceDirection, CadenceKind};
use crate::rate::{Length, Position};

/// Common surface of every timeline component.
#[enum_dispatch]
pub trait Component: Send + Sync {
    /// Duration in the edit units of the enclosing track.
    fn length(&self) -> Length;

    /// Short token for logs and error prose.
    fn kind_name(&self) -> &'static str;
}

// === Leaves ===

/// Unspecified material. Resolution stops here without producing a source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filler {
    pub length: Length,
}

impl Filler {
    pub fn new(length: Length) -> Self {
        Self { length }
    }
}

impl Component for Filler {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "filler"
    }
}

/// Reference to a position on another mob's track.
///
/// The null reference (nil mob id) marks the end of a source chain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub mob_id: MobId,
    pub track_id: TrackId,
    /// Origin-relative position on the referenced track.
    pub start_time: Position,
}

impl SourceRef {
    pub fn new(mob_id: MobId, track_id: TrackId, start_time: Position) -> Self {
        Self {
            mob_id,
            track_id,
            start_time,
        }
    }

    /// The chain-terminating reference.
    pub fn null() -> Self {
        Self {
            mob_id: MobId::nil(),
            track_id: 0,
            start_time: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.mob_id.is_nil()
    }
}

/// A span of material taken from another mob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceClip {
    pub length: Length,
    pub source: SourceRef,
}

impl SourceClip {
    pub fn new(length: Length, source: SourceRef) -> Self {
        Self { length, source }
    }

    /// A clip whose chain ends here.
    pub fn null(length: Length) -> Self {
        Self {
            length,
            source: SourceRef::null(),
        }
    }
}

impl Component for SourceClip {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "clip"
    }
}

/// Timecode labeling for a span of a (usually tape) track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimecodeClip {
    pub length: Length,
    /// Frame count since midnight at the first position of the clip.
    pub start: Position,
    pub fps: u32,
    #[serde(default)]
    pub drop: bool,
}

impl TimecodeClip {
    pub fn new(length: Length, start: Position, fps: u32, drop: bool) -> Self {
        Self {
            length,
            start,
            fps,
            drop,
        }
    }
}

impl Component for TimecodeClip {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "timecode"
    }
}

/// Film edge numbering formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgecodeFormat {
    #[default]
    Keycode,
    EdgeNumber,
    Ink,
}

/// Film edge code labeling for a span of a film track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgecodeClip {
    pub length: Length,
    pub start: Position,
    #[serde(default)]
    pub format: EdgecodeFormat,
}

impl EdgecodeClip {
    pub fn new(length: Length, start: Position, format: EdgecodeFormat) -> Self {
        Self {
            length,
            start,
            format,
        }
    }
}

impl Component for EdgecodeClip {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "edgecode"
    }
}

// === Structural components ===

/// End-to-end run of components.
///
/// Transitions overlap their neighbors instead of occupying time of their
/// own, so the sequence length is the sum of the non-transition entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub components: Vec<ComponentKind>,
}

impl Sequence {
    pub fn new(components: Vec<ComponentKind>) -> Self {
        Self { components }
    }

    pub fn push(&mut self, component: impl Into<ComponentKind>) {
        self.components.push(component.into());
    }
}

impl Component for Sequence {
    fn length(&self) -> Length {
        self.components
            .iter()
            .filter(|c| !c.is_transition())
            .map(|c| c.length())
            .sum()
    }
    fn kind_name(&self) -> &'static str {
        "sequence"
    }
}

/// One picked branch plus unpicked alternates of the same length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    pub selected: Box<ComponentKind>,
    #[serde(default)]
    pub alternates: Vec<ComponentKind>,
}

impl Selector {
    pub fn new(selected: impl Into<ComponentKind>) -> Self {
        Self {
            selected: Box::new(selected.into()),
            alternates: Vec::new(),
        }
    }

    pub fn with_alternate(mut self, alternate: impl Into<ComponentKind>) -> Self {
        self.alternates.push(alternate.into());
        self
    }
}

impl Component for Selector {
    fn length(&self) -> Length {
        self.selected.length()
    }
    fn kind_name(&self) -> &'static str {
        "selector"
    }
}

/// Overlapped cut between two sequence neighbors.
///
/// The transition straddles the junction: the outgoing neighbor loses
/// `length - cut_point` positions of exposure, the incoming one loses
/// `cut_point`. `cut_point` is where the plain cut would fall inside the
/// transition span.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub length: Length,
    pub cut_point: Position,
    #[serde(default)]
    pub effect: Option<Box<Effect>>,
}

impl Transition {
    /// Transition with the cut at the midpoint.
    pub fn new(length: Length, effect: Option<Effect>) -> Self {
        Self {
            length,
            cut_point: length / 2,
            effect: effect.map(Box::new),
        }
    }

    pub fn with_cut_point(mut self, cut_point: Position) -> Self {
        self.cut_point = cut_point;
        self
    }
}

impl Component for Transition {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "transition"
    }
}

/// One input of an effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectSlot {
    pub slot_id: u32,
    pub value: ComponentKind,
}

/// An operation applied over input slots.
///
/// Without an argument choice an effect is opaque to resolution: the caller
/// must pick a slot or accept the rendered form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub length: Length,
    /// Operation identifier, e.g. `"video dissolve"`.
    pub operation: String,
    #[serde(default)]
    pub slots: Vec<EffectSlot>,
    /// Pre-computed result of the operation, when one was stored.
    #[serde(default)]
    pub rendering: Option<Box<ComponentKind>>,
}

impl Effect {
    pub fn new(length: Length, operation: impl Into<String>) -> Self {
        Self {
            length,
            operation: operation.into(),
            slots: Vec::new(),
            rendering: None,
        }
    }

    pub fn with_slot(mut self, slot_id: u32, value: impl Into<ComponentKind>) -> Self {
        self.slots.push(EffectSlot {
            slot_id,
            value: value.into(),
        });
        self
    }

    pub fn with_rendering(mut self, rendering: impl Into<ComponentKind>) -> Self {
        self.rendering = Some(Box::new(rendering.into()));
        self
    }

    pub fn slot(&self, slot_id: u32) -> Option<&ComponentKind> {
        self.slots
            .iter()
            .find(|s| s.slot_id == slot_id)
            .map(|s| &s.value)
    }
}

impl Component for Effect {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "effect"
    }
}

/// Interchangeable renditions of the same material.
///
/// All choices cover the same span; a media selector picks one at
/// resolution time based on the caller's criteria.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaGroup {
    pub choices: Vec<ComponentKind>,
    /// Optional single-frame stand-in for browsing.
    #[serde(default)]
    pub still_frame: Option<Box<ComponentKind>>,
}

impl MediaGroup {
    pub fn new(choices: Vec<ComponentKind>) -> Self {
        Self {
            choices,
            still_frame: None,
        }
    }
}

impl Component for MediaGroup {
    fn length(&self) -> Length {
        self.choices.first().map_or(0, |c| c.length())
    }
    fn kind_name(&self) -> &'static str {
        "media_group"
    }
}

/// Private slot namespace.
///
/// The last slot is the scope's value; earlier slots exist to be shared via
/// [`ScopeReference`] back-pointers from inside the scope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedScope {
    pub slots: Vec<ComponentKind>,
}

impl NestedScope {
    pub fn new(slots: Vec<ComponentKind>) -> Self {
        Self { slots }
    }
}

impl Component for NestedScope {
    fn length(&self) -> Length {
        self.slots.last().map_or(0, |c| c.length())
    }
    fn kind_name(&self) -> &'static str {
        "nested_scope"
    }
}

/// Back-pointer to a slot of an enclosing scope.
///
/// `rel_scope` counts scopes outward (0 = innermost enclosing scope);
/// `rel_slot` counts slots backward from the referencing slot (0 would be
/// the slot itself, which is rejected when semantic checking is on).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeReference {
    pub length: Length,
    pub rel_scope: u32,
    pub rel_slot: u32,
}

impl ScopeReference {
    pub fn new(length: Length, rel_scope: u32, rel_slot: u32) -> Self {
        Self {
            length,
            rel_scope,
            rel_slot,
        }
    }
}

impl Component for ScopeReference {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "scope_ref"
    }
}

/// Cadence conversion wrapped around a source clip.
///
/// Positions on the outer side are mapped through the cadence pattern into
/// the input's edit units, so the wrapped clip can live at a different
/// frame cadence (e.g. 24 fps film presented as 30 fps video).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CadenceMap {
    pub kind: CadenceKind,
    /// Starting offset into the cadence cycle.
    #[serde(default)]
    pub phase: u32,
    pub direction: CadenceDirection,
    pub input: Box<ComponentKind>,
}

impl CadenceMap {
    pub fn new(
        kind: CadenceKind,
        phase: u32,
        direction: CadenceDirection,
        input: impl Into<ComponentKind>,
    ) -> Self {
        Self {
            kind,
            phase,
            direction,
            input: Box::new(input.into()),
        }
    }
}

impl Component for CadenceMap {
    /// Outer-side length for the input's inner-side length.
    fn length(&self) -> Length {
        map_offset(self.kind, self.input.length(), self.phase, true, self.direction)
    }
    fn kind_name(&self) -> &'static str {
        "cadence_map"
    }
}

/// One slot of a legacy track group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacySlot {
    pub kind: MediaKind,
    pub segment: ComponentKind,
}

impl LegacySlot {
    pub fn new(kind: MediaKind, segment: impl Into<ComponentKind>) -> Self {
        Self {
            kind,
            segment: segment.into(),
        }
    }
}

/// Legacy multi-slot container predating one-track-per-slot layouts.
///
/// Old compositions nested whole slot bundles inside a track; resolution
/// descends into the first picture or sound slot. Their content routinely
/// violates modern sequence rules, so semantic checking pauses inside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackGroup {
    pub length: Length,
    pub slots: Vec<LegacySlot>,
}

impl TrackGroup {
    pub fn new(length: Length, slots: Vec<LegacySlot>) -> Self {
        Self { length, slots }
    }
}

impl Component for TrackGroup {
    fn length(&self) -> Length {
        self.length
    }
    fn kind_name(&self) -> &'static str {
        "track_group"
    }
}

// === The component enum ===

/// Any timeline component, dispatching [`Component`] to the payload.
#[enum_dispatch(Component)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
    Filler,
    SourceClip,
    TimecodeClip,
    EdgecodeClip,
    Sequence,
    Selector,
    Transition,
    Effect,
    MediaGroup,
    NestedScope,
    ScopeReference,
    CadenceMap,
    TrackGroup,
}

impl ComponentKind {
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition(_))
    }

    pub fn is_filler(&self) -> bool {
        matches!(self, Self::Filler(_))
    }

    pub fn as_source_clip(&self) -> Option<&SourceClip> {
        match self {
            Self::SourceClip(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_nested_scope(&self) -> Option<&NestedScope> {
        match self {
            Self::NestedScope(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Self::Transition(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(len: Length) -> ComponentKind {
        SourceClip::null(len).into()
    }

    #[test]
    fn test_sequence_length_skips_transitions() {
        let seq = Sequence::new(vec![
            clip(10),
            Transition::new(4, None).into(),
            clip(10),
        ]);
        assert_eq!(seq.length(), 20);
    }

    #[test]
    fn test_transition_cut_defaults_to_midpoint() {
        let t = Transition::new(5, None);
        assert_eq!(t.cut_point, 2);
        let t = Transition::new(4, None).with_cut_point(3);
        assert_eq!(t.cut_point, 3);
    }

    #[test]
    fn test_cadence_map_length_is_outer_side() {
        // 3 film frames behind a contracting 2:3 map span 5 video frames
        let map = CadenceMap::new(
            CadenceKind::TwoThree,
            0,
            CadenceDirection::Contract,
            SourceClip::null(3),
        );
        assert_eq!(map.length(), 5);
    }

    #[test]
    fn test_nested_scope_length_is_last_slot() {
        let ns = NestedScope::new(vec![clip(7), clip(9)]);
        assert_eq!(ns.length(), 9);
        assert_eq!(NestedScope::default().length(), 0);
    }

    #[test]
    fn test_null_source_ref() {
        assert!(SourceRef::null().is_null());
        assert!(!SourceRef::new(MobId::new_v4(), 1, 0).is_null());
    }

    #[test]
    fn test_serde_tag_round_trip() {
        let c: ComponentKind = Filler::new(12).into();
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["kind"], "filler");
        assert_eq!(v["length"], 12);
        let back: ComponentKind = serde_json::from_value(v).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(clip(1).kind_name(), "clip");
        let k: ComponentKind = Sequence::default().into();
        assert_eq!(k.kind_name(), "sequence");
    }
}
