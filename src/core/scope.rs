//! Scope stack: tracks which nested scopes enclose the current descent.
//!
//! Scope references address slots relative to the frames on this stack.
//! The leaf resolver keeps the stack strictly balanced: every frame it
//! pushes is popped right after the recursive call that needed it, on
//! success and on error alike. A stack therefore never outlives one
//! resolution call.

use crate::entities::NestedScope;
use crate::rate::Position;

/// One entered scope.
#[derive(Clone, Copy, Debug)]
pub struct ScopeFrame<'a> {
    pub scope: &'a NestedScope,
    pub slot_count: usize,
    /// Sequence-space position where the scope's slots start.
    pub base: Position,
    /// 1-based index of the slot currently being evaluated.
    pub current_slot: usize,
}

impl<'a> ScopeFrame<'a> {
    /// Frame for a scope about to be entered through its value slot.
    pub fn enter(scope: &'a NestedScope, base: Position) -> Self {
        Self {
            scope,
            slot_count: scope.slots.len(),
            base,
            current_slot: scope.slots.len(),
        }
    }
}

/// Stack of entered scopes, deepest last.
#[derive(Clone, Debug, Default)]
pub struct ScopeStack<'a> {
    frames: Vec<ScopeFrame<'a>>,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame; re-pushing the scope already on top updates that frame
    /// in place instead of growing the stack.
    pub fn push(&mut self, frame: ScopeFrame<'a>) {
        if let Some(top) = self.frames.last_mut() {
            if std::ptr::eq(top.scope, frame.scope) {
                *top = frame;
                return;
            }
        }
        self.frames.push(frame);
    }

    /// Remove `n` frames and return the frame left on top.
    pub fn pop(&mut self, n: usize) -> Option<&ScopeFrame<'a>> {
        debug_assert!(n <= self.frames.len(), "scope stack underflow");
        let new_len = self.frames.len().saturating_sub(n);
        self.frames.truncate(new_len);
        self.frames.last()
    }

    /// Read the n-th frame from the top (1-based, `peek(1)` = innermost).
    pub fn peek(&self, n: usize) -> Option<&ScopeFrame<'a>> {
        if n == 0 || n > self.frames.len() {
            return None;
        }
        self.frames.get(self.frames.len() - n)
    }

    /// Point the n-th frame from the top (1-based) at a different slot.
    ///
    /// Used while evaluating a referenced slot, so that references chained
    /// inside it stay relative to that slot. Callers restore the previous
    /// value afterward.
    pub fn retarget(&mut self, n: usize, current_slot: usize) {
        if n >= 1 && n <= self.frames.len() {
            let i = self.frames.len() - n;
            self.frames[i].current_slot = current_slot;
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
