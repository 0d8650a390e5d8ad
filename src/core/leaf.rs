//! Leaf resolver: recursive descent from a component to the leaf governing
//! a requested window.
//!
//! Structural components are peeled off one at a time — sequences locate the
//! covering entry, selectors and media groups pick a branch, scopes push a
//! frame and descend into their value slot, references jump back to an
//! enclosing scope's slot. Descent stops at a leaf (filler, clip, cadence
//! map) or at a typed failure.
//!
//! ## Windows
//!
//! A [`Window`] carries `base` (timeline position of the evaluated
//! component's material 0), `pos` (the absolute position being resolved) and
//! `len` (the requested span). `pos - base` is the material coordinate; it
//! may fall outside `[0, length)` on transition neighbors, which play
//! material from beyond their exposed span.
//!
//! ## Scope discipline
//!
//! Every frame pushed here is popped right after the recursive call that
//! needed it, success or error. Callers hand in a stack that is empty apart
//! from pre-seeded enclosing frames, and get it back in that exact state.

use log::trace;

use super::cursor::{CursorStep, SequenceCursor};
use super::scope::{ScopeFrame, ScopeStack};
use super::EffectChoice;
use crate::entities::{Component, ComponentKind, MediaCriteria, MediaKind, MobStore};
use crate::error::{ChainError, ChainResult};
use crate::rate::{Length, Position};

/// Read-only context threaded through the descent.
#[derive(Clone, Copy, Debug)]
pub struct ResolveCtx<'a> {
    pub store: &'a MobStore,
    pub criteria: MediaCriteria,
}

/// The span being resolved, in timeline coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    /// Timeline position of the evaluated component's material 0.
    pub base: Position,
    /// Absolute position being resolved.
    pub pos: Position,
    /// Requested span length.
    pub len: Length,
}

impl Window {
    fn rebase(self, base: Position) -> Self {
        Self { base, ..self }
    }
}

/// A sequence neighbor, for transition resolution.
#[derive(Clone, Copy, Debug)]
pub struct Neighbor<'a> {
    pub component: &'a ComponentKind,
    /// Timeline position of the neighbor's material 0.
    pub base: Position,
}

/// The components on either side of the one being resolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct Neighbors<'a> {
    pub prev: Option<Neighbor<'a>>,
    pub next: Option<Neighbor<'a>>,
}

/// Outcome of a descent.
#[derive(Clone, Copy, Debug)]
pub struct LeafResolution<'a> {
    pub leaf: &'a ComponentKind,
    /// Material coordinate of the requested position inside the leaf.
    pub diff_pos: Position,
    /// Span for which this answer holds.
    pub min_length: Length,
    /// A transition governed the landed position.
    pub is_transition: bool,
    /// Nested scopes crossed on the way down.
    pub nest_depth: u32,
}

/// Descend from `component` to the leaf governing `win.pos`.
pub fn resolve_leaf<'a>(
    ctx: &ResolveCtx<'a>,
    component: &'a ComponentKind,
    win: Window,
    choice: EffectChoice,
    neighbors: Neighbors<'a>,
    scope: &mut ScopeStack<'a>,
) -> ChainResult<LeafResolution<'a>> {
    trace!(
        "resolve: kind={} base={} pos={} len={} choice={:?} depth={}",
        component.kind_name(),
        win.base,
        win.pos,
        win.len,
        choice,
        scope.depth()
    );
    match component {
        ComponentKind::Filler(_)
        | ComponentKind::SourceClip(_)
        | ComponentKind::TimecodeClip(_)
        | ComponentKind::EdgecodeClip(_)
        | ComponentKind::CadenceMap(_) => Ok(LeafResolution {
            leaf: component,
            diff_pos: win.pos - win.base,
            min_length: component.length().min(win.len),
            is_transition: false,
            nest_depth: 0,
        }),

        ComponentKind::Sequence(seq) => {
            let mut cursor = SequenceCursor::new(&seq.components, ctx.store.checking_enabled());
            let mut prev: Option<CursorStep<'a>> = None;
            loop {
                let step = match cursor.advance() {
                    Ok(s) => s,
                    Err(ChainError::EndOfSequence) => {
                        return Err(ChainError::not_possible("position past end of sequence"));
                    }
                    Err(e) => return Err(e),
                };
                let lo = win.base + step.offset;
                let hi = lo + step.exposed;
                if win.pos < lo {
                    return Err(ChainError::not_possible("position before sequence start"));
                }
                if win.pos >= hi {
                    prev = Some(step);
                    continue;
                }
                let inner = Neighbors {
                    prev: prev.map(|p| Neighbor {
                        component: p.component,
                        base: win.base + p.start,
                    }),
                    next: cursor.peek().ok().map(|n| Neighbor {
                        component: n.component,
                        base: win.base + n.start,
                    }),
                };
                let inner_win = Window {
                    base: win.base + step.start,
                    pos: win.pos,
                    len: win.len.min(hi - win.pos),
                };
                let mut res = resolve_leaf(ctx, step.component, inner_win, choice, inner, scope)?;
                res.is_transition |= step.is_transition;
                return Ok(res);
            }
        }

        ComponentKind::Selector(sel) => {
            resolve_leaf(ctx, &sel.selected, win, choice, neighbors, scope)
        }

        ComponentKind::MediaGroup(group) => {
            let picked = ctx.store.media_selector().choose(group, ctx.criteria)?;
            resolve_leaf(ctx, picked, win, choice, neighbors, scope)
        }

        ComponentKind::Transition(t) => {
            let side = match choice {
                EffectChoice::Incoming => neighbors.prev,
                EffectChoice::Outgoing => neighbors.next,
                _ => None,
            };
            let mut res = match side {
                Some(n) => {
                    if n.component.is_transition() {
                        return Err(ChainError::not_possible("transition neighbors a transition"));
                    }
                    resolve_leaf(
                        ctx,
                        n.component,
                        win.rebase(n.base),
                        EffectChoice::Neutral,
                        Neighbors::default(),
                        scope,
                    )?
                }
                // no side picked (or none present): fall back to the render
                None => match t.effect.as_deref().and_then(|e| e.rendering.as_deref()) {
                    Some(r) => resolve_leaf(
                        ctx,
                        r,
                        win,
                        EffectChoice::Neutral,
                        Neighbors::default(),
                        scope,
                    )?,
                    None => return Err(ChainError::RenderNotFound),
                },
            };
            res.is_transition = true;
            Ok(res)
        }

        ComponentKind::Effect(e) => match choice {
            EffectChoice::Rendered => match e.rendering.as_deref() {
                Some(r) => resolve_leaf(
                    ctx,
                    r,
                    win,
                    EffectChoice::Neutral,
                    Neighbors::default(),
                    scope,
                ),
                None => Err(ChainError::RenderNotFound),
            },
            EffectChoice::Slot(id) => match e.slot(id) {
                Some(v) => resolve_leaf(
                    ctx,
                    v,
                    win,
                    EffectChoice::Neutral,
                    Neighbors::default(),
                    scope,
                ),
                None => Err(ChainError::not_possible("effect has no such input slot")),
            },
            EffectChoice::Incoming | EffectChoice::Outgoing => {
                Err(ChainError::not_possible("effect choice names no input slot"))
            }
            EffectChoice::Neutral => Err(ChainError::AmbiguousEffect {
                effect: Box::new(e.clone()),
                length: e.length.min(win.len),
            }),
        },

        ComponentKind::NestedScope(ns) => {
            let Some(value_slot) = ns.slots.last() else {
                return Err(ChainError::not_possible("nested scope has no slots"));
            };
            scope.push(ScopeFrame::enter(ns, win.base));
            let result = resolve_leaf(ctx, value_slot, win, choice, neighbors, scope);
            scope.pop(1);
            let mut res = result?;
            res.nest_depth += 1;
            Ok(res)
        }

        ComponentKind::ScopeReference(sr) => {
            let Some(frame) = scope.peek(sr.rel_scope as usize + 1).copied() else {
                return Err(ChainError::not_possible("scope reference outside any scope"));
            };
            if ctx.store.checking_enabled() && sr.rel_slot == 0 {
                return Err(ChainError::not_possible("scope slot references itself"));
            }
            let idx = frame.current_slot as i64 - sr.rel_slot as i64;
            if idx < 1 || idx > frame.slot_count as i64 {
                return Err(ChainError::not_possible("scope reference outside the scope"));
            }
            let idx = idx as usize;
            let target = &frame.scope.slots[idx - 1];
            let depth = sr.rel_scope as usize + 1;
            // references chained inside the slot are relative to that slot
            scope.retarget(depth, idx);
            let result = resolve_leaf(
                ctx,
                target,
                win.rebase(frame.base),
                choice,
                Neighbors::default(),
                scope,
            );
            scope.retarget(depth, frame.current_slot);
            result
        }

        ComponentKind::TrackGroup(tg) => {
            let _guard = ctx.store.pause_checking();
            let slot = tg
                .slots
                .iter()
                .find(|s| matches!(s.kind, MediaKind::Picture | MediaKind::Sound))
                .ok_or(ChainError::not_possible("track group has no picture or sound slot"))?;
            resolve_leaf(ctx, &slot.segment, win, choice, Neighbors::default(), scope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        Effect, Filler, LegacySlot, MediaGroup, NestedScope, ScopeReference, Selector, Sequence,
        SourceClip, TrackGroup, Transition,
    };

    fn clip(len: Length) -> ComponentKind {
        SourceClip::null(len).into()
    }

    fn resolve<'a>(
        store: &'a MobStore,
        component: &'a ComponentKind,
        pos: Position,
        len: Length,
        choice: EffectChoice,
    ) -> ChainResult<LeafResolution<'a>> {
        let ctx = ResolveCtx {
            store,
            criteria: MediaCriteria::Any,
        };
        let mut scope = ScopeStack::new();
        let win = Window { base: 0, pos, len };
        let res = resolve_leaf(&ctx, component, win, choice, Neighbors::default(), &mut scope);
        assert!(scope.is_empty(), "scope stack must stay balanced");
        res
    }

    #[test]
    fn test_leaf_window_math() {
        let store = MobStore::new();
        let c = clip(10);
        let res = resolve(&store, &c, 4, 100, EffectChoice::Neutral).unwrap();
        assert_eq!(res.diff_pos, 4);
        assert_eq!(res.min_length, 10);
        assert!(!res.is_transition);
        assert_eq!(res.nest_depth, 0);
    }

    #[test]
    fn test_sequence_descends_to_covering_entry() {
        let store = MobStore::new();
        let seq: ComponentKind = Sequence::new(vec![clip(10), clip(5)]).into();
        let res = resolve(&store, &seq, 12, 100, EffectChoice::Neutral).unwrap();
        assert_eq!(res.diff_pos, 2);
        assert_eq!(res.min_length, 3); // clamped to the entry's remaining exposure
        assert!(matches!(res.leaf, ComponentKind::SourceClip(_)));

        assert!(matches!(
            resolve(&store, &seq, 15, 1, EffectChoice::Neutral),
            Err(ChainError::TraversalNotPossible { .. })
        ));
    }

    #[test]
    fn test_transition_sides_resolve_neighbors() {
        let store = MobStore::new();
        let seq: ComponentKind = Sequence::new(vec![
            clip(10),
            Transition::new(4, None).with_cut_point(2).into(),
            clip(10),
        ])
        .into();

        // position 9 lands inside the transition window [8, 12)
        let incoming = resolve(&store, &seq, 9, 1, EffectChoice::Incoming).unwrap();
        assert!(incoming.is_transition);
        assert_eq!(incoming.diff_pos, 9); // previous clip's material

        let outgoing = resolve(&store, &seq, 9, 1, EffectChoice::Outgoing).unwrap();
        assert!(outgoing.is_transition);
        assert_eq!(outgoing.diff_pos, -1); // next clip's pre-roll, before its material 0

        // neutral needs a render, and this transition has none
        assert!(matches!(
            resolve(&store, &seq, 9, 1, EffectChoice::Neutral),
            Err(ChainError::RenderNotFound)
        ));
    }

    #[test]
    fn test_transition_render_fallback() {
        let store = MobStore::new();
        let effect = Effect::new(4, "video dissolve").with_rendering(clip(4));
        let seq: ComponentKind = Sequence::new(vec![
            clip(10),
            Transition::new(4, Some(effect)).with_cut_point(2).into(),
            clip(10),
        ])
        .into();

        let res = resolve(&store, &seq, 9, 1, EffectChoice::Neutral).unwrap();
        assert!(res.is_transition);
        assert_eq!(res.diff_pos, 1); // render's material, based at the transition
    }

    #[test]
    fn test_effect_choices() {
        let store = MobStore::new();
        let e: ComponentKind = Effect::new(10, "picture in picture")
            .with_slot(1, clip(10))
            .with_slot(2, clip(10))
            .into();

        let err = resolve(&store, &e, 3, 5, EffectChoice::Neutral).unwrap_err();
        match err {
            ChainError::AmbiguousEffect { effect, length } => {
                assert_eq!(effect.operation, "picture in picture");
                assert_eq!(length, 5);
            }
            other => panic!("expected AmbiguousEffect, got {other}"),
        }

        let res = resolve(&store, &e, 3, 5, EffectChoice::Slot(2)).unwrap();
        assert_eq!(res.diff_pos, 3);
        assert!(matches!(
            resolve(&store, &e, 3, 5, EffectChoice::Slot(9)),
            Err(ChainError::TraversalNotPossible { .. })
        ));
        assert!(matches!(
            resolve(&store, &e, 3, 5, EffectChoice::Rendered),
            Err(ChainError::RenderNotFound)
        ));
        assert!(matches!(
            resolve(&store, &e, 3, 5, EffectChoice::Incoming),
            Err(ChainError::TraversalNotPossible { .. })
        ));
    }

    #[test]
    fn test_selector_and_media_group_descend() {
        let store = MobStore::new();
        let sel: ComponentKind = Selector::new(clip(10)).with_alternate(clip(10)).into();
        let res = resolve(&store, &sel, 3, 2, EffectChoice::Neutral).unwrap();
        assert_eq!(res.diff_pos, 3);

        let group: ComponentKind = MediaGroup::new(vec![clip(10), clip(10)]).into();
        let res = resolve(&store, &group, 7, 2, EffectChoice::Neutral).unwrap();
        assert_eq!(res.diff_pos, 7);

        let empty: ComponentKind = MediaGroup::default().into();
        assert!(resolve(&store, &empty, 0, 1, EffectChoice::Neutral).is_err());
    }

    #[test]
    fn test_scope_reference_resolves_sibling_slot() {
        let store = MobStore::new();
        let ns: ComponentKind = NestedScope::new(vec![
            clip(10),
            ScopeReference::new(10, 0, 1).into(),
        ])
        .into();

        let res = resolve(&store, &ns, 4, 2, EffectChoice::Neutral).unwrap();
        assert_eq!(res.diff_pos, 4);
        assert_eq!(res.nest_depth, 1);
        assert!(matches!(res.leaf, ComponentKind::SourceClip(_)));

        // two slots back from the value slot
        let ns: ComponentKind = NestedScope::new(vec![
            clip(10),
            Filler::new(10).into(),
            ScopeReference::new(10, 0, 2).into(),
        ])
        .into();
        let res = resolve(&store, &ns, 4, 2, EffectChoice::Neutral).unwrap();
        assert!(matches!(res.leaf, ComponentKind::SourceClip(_)));
    }

    #[test]
    fn test_chained_scope_references_stay_slot_relative() {
        // slot 3 -> slot 2 -> slot 1; only correct if the frame's current
        // slot follows each jump
        let store = MobStore::new();
        let ns: ComponentKind = NestedScope::new(vec![
            clip(10),
            ScopeReference::new(10, 0, 1).into(),
            ScopeReference::new(10, 0, 1).into(),
        ])
        .into();

        let res = resolve(&store, &ns, 2, 1, EffectChoice::Neutral).unwrap();
        assert!(matches!(res.leaf, ComponentKind::SourceClip(_)));
        assert_eq!(res.diff_pos, 2);
    }

    #[test]
    fn test_scope_reference_rejections() {
        let store = MobStore::new();

        // reference with no scope on the stack
        let bare: ComponentKind = ScopeReference::new(10, 0, 1).into();
        assert!(resolve(&store, &bare, 0, 1, EffectChoice::Neutral).is_err());

        // rel_slot 0 points a slot at itself; rejected while checking is on
        let selfref: ComponentKind =
            NestedScope::new(vec![clip(10), ScopeReference::new(10, 0, 0).into()]).into();
        assert!(resolve(&store, &selfref, 0, 1, EffectChoice::Neutral).is_err());

        // slot index walks off the front of the scope
        let off: ComponentKind = NestedScope::new(vec![
            clip(10),
            ScopeReference::new(10, 0, 5).into(),
        ])
        .into();
        assert!(resolve(&store, &off, 0, 1, EffectChoice::Neutral).is_err());
    }

    #[test]
    fn test_track_group_pauses_checking_for_descent() {
        let store = MobStore::new();
        // legacy content: sequence starting with a transition
        let legacy = Sequence::new(vec![
            Transition::new(4, None).with_cut_point(2).into(),
            clip(10),
        ]);
        let group: ComponentKind = TrackGroup::new(
            12,
            vec![LegacySlot::new(MediaKind::Picture, legacy.clone())],
        )
        .into();

        // inside the group the malformed layout resolves
        let res = resolve(&store, &group, 6, 2, EffectChoice::Neutral).unwrap();
        assert_eq!(res.diff_pos, 4);
        // and the pause did not leak
        assert!(store.checking_enabled());

        // the same content outside a track group is rejected
        let direct: ComponentKind = legacy.into();
        assert!(resolve(&store, &direct, 6, 2, EffectChoice::Neutral).is_err());

        let empty: ComponentKind = TrackGroup::new(0, Vec::new()).into();
        assert!(resolve(&store, &empty, 0, 1, EffectChoice::Neutral).is_err());
        assert!(store.checking_enabled());
    }

    #[test]
    fn test_nested_scope_without_slots_fails() {
        let store = MobStore::new();
        let ns: ComponentKind = NestedScope::default().into();
        assert!(resolve(&store, &ns, 0, 1, EffectChoice::Neutral).is_err());
    }

    #[test]
    fn test_filler_is_a_leaf() {
        let store = MobStore::new();
        let f: ComponentKind = Filler::new(20).into();
        let res = resolve(&store, &f, 5, 8, EffectChoice::Neutral).unwrap();
        assert!(matches!(res.leaf, ComponentKind::Filler(_)));
        assert_eq!(res.min_length, 8);
    }
}
