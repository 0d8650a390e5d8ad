//! Sequence cursor: iterates sequence entries with transition overlap.
//!
//! ## Exposure
//!
//! A transition straddles the junction of its neighbors, so a component's
//! *exposed* span on the timeline is shorter than its length: the preceding
//! component gives up `length - cut_point` positions to the transition, the
//! following one gives up `cut_point`. The transition itself is reported
//! with its full length where the preceding exposure ends.
//!
//! ```text
//! [A(10), T(4, cut 2), B(10)]
//!
//! timeline   0        8      12        20
//!            |---A----|--T---|----B----|
//! exposed      A: 8     T: 4    B: 8          total 20
//! material   A starts at 0, T at 8, B at 10 (B's first 2 are under T)
//! ```
//!
//! Zero-length components and components fully swallowed by neighboring
//! transitions are skipped. Malformed layouts (a transition first, two
//! transitions adjacent) are rejected while semantic checking is on and
//! tolerated while it is paused.

use log::warn;

use crate::entities::{Component, ComponentKind};
use crate::error::{ChainError, ChainResult};
use crate::rate::{Length, Position};

/// Cursor position state; value-copied for peeking.
#[derive(Clone, Copy, Debug, Default)]
struct CursorState {
    index: usize,
    offset: Position,
    /// Cut point of the transition just passed, owed by the next component.
    pending_cut: Position,
    last_was_transition: bool,
}

/// One yielded sequence entry.
#[derive(Clone, Copy, Debug)]
pub struct CursorStep<'a> {
    pub component: &'a ComponentKind,
    pub index: usize,
    /// Timeline position where this entry's exposure starts.
    pub offset: Position,
    /// Timeline position of the entry's own material position 0.
    pub start: Position,
    /// Positions this entry exposes on the timeline.
    pub exposed: Length,
    pub is_transition: bool,
}

/// Iterates a component list, yielding exposure windows.
#[derive(Clone, Debug)]
pub struct SequenceCursor<'a> {
    items: &'a [ComponentKind],
    checking: bool,
    state: CursorState,
}

impl<'a> SequenceCursor<'a> {
    pub fn new(items: &'a [ComponentKind], checking: bool) -> Self {
        Self {
            items,
            checking,
            state: CursorState::default(),
        }
    }

    /// Step to the next visible entry; [`ChainError::EndOfSequence`] when
    /// the list is exhausted.
    pub fn advance(&mut self) -> ChainResult<CursorStep<'a>> {
        loop {
            let i = self.state.index;
            let Some(component) = self.items.get(i) else {
                return Err(ChainError::EndOfSequence);
            };
            self.state.index += 1;
            let len = component.length();

            if let ComponentKind::Transition(t) = component {
                if self.state.last_was_transition {
                    if self.checking {
                        return Err(ChainError::not_possible(
                            "adjacent transitions in sequence",
                        ));
                    }
                    warn!("tolerating adjacent transitions at entry {i}");
                }
                if i == 0 {
                    if self.checking {
                        return Err(ChainError::not_possible(
                            "sequence begins with a transition",
                        ));
                    }
                    warn!("tolerating a sequence that begins with a transition");
                }
                self.state.last_was_transition = true;
                self.state.pending_cut = t.cut_point;
                if len == 0 {
                    continue;
                }
                let step = CursorStep {
                    component,
                    index: i,
                    offset: self.state.offset,
                    start: self.state.offset,
                    exposed: len,
                    is_transition: true,
                };
                self.state.offset += len;
                return Ok(step);
            }

            let cut = self.state.pending_cut;
            self.state.pending_cut = 0;
            self.state.last_was_transition = false;
            let exposed = (len - cut - self.upcoming_overlap(self.state.index)).max(0);
            if len == 0 || exposed == 0 {
                continue;
            }
            let step = CursorStep {
                component,
                index: i,
                offset: self.state.offset,
                start: self.state.offset - cut,
                exposed,
                is_transition: false,
            };
            self.state.offset += exposed;
            return Ok(step);
        }
    }

    /// What the next `advance()` would yield, without perturbing the cursor.
    pub fn peek(&self) -> ChainResult<CursorStep<'a>> {
        self.clone().advance()
    }

    /// Exposure the next visible transition will take off the current entry.
    fn upcoming_overlap(&self, from: usize) -> Length {
        for c in &self.items[from..] {
            let len = c.length();
            if let ComponentKind::Transition(t) = c {
                if len == 0 {
                    continue;
                }
                return len - t.cut_point;
            }
            if len != 0 {
                return 0;
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Filler, SourceClip, Transition};

    fn clip(len: Length) -> ComponentKind {
        SourceClip::null(len).into()
    }

    fn transition(len: Length, cut: Position) -> ComponentKind {
        Transition::new(len, None).with_cut_point(cut).into()
    }

    fn steps(items: &[ComponentKind], checking: bool) -> Vec<(Position, Position, Length, bool)> {
        let mut cursor = SequenceCursor::new(items, checking);
        let mut out = Vec::new();
        loop {
            match cursor.advance() {
                Ok(s) => out.push((s.offset, s.start, s.exposed, s.is_transition)),
                Err(ChainError::EndOfSequence) => return out,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }

    #[test]
    fn test_transition_overlap_splits_at_cut() {
        let items = vec![clip(10), transition(4, 2), clip(10)];
        assert_eq!(
            steps(&items, true),
            vec![
                (0, 0, 8, false),  // A gives up length - cut = 2
                (8, 8, 4, true),   // T at full length
                (12, 10, 8, false) // B gives up cut = 2, material starts under T
            ]
        );
    }

    #[test]
    fn test_plain_sequence_accumulates_offsets() {
        let items = vec![clip(5), clip(7), clip(3)];
        assert_eq!(
            steps(&items, true),
            vec![(0, 0, 5, false), (5, 5, 7, false), (12, 12, 3, false)]
        );
    }

    #[test]
    fn test_zero_length_components_skipped() {
        let items = vec![clip(5), Filler::new(0).into(), clip(5)];
        assert_eq!(steps(&items, true), vec![(0, 0, 5, false), (5, 5, 5, false)]);
    }

    #[test]
    fn test_fully_swallowed_component_skipped() {
        // B(2) loses its whole length to the preceding transition's cut
        let items = vec![clip(10), transition(4, 2), clip(2)];
        assert_eq!(steps(&items, true), vec![(0, 0, 8, false), (8, 8, 4, true)]);
    }

    #[test]
    fn test_peek_matches_advance() {
        let items = vec![clip(10), transition(4, 2), clip(10)];
        let mut cursor = SequenceCursor::new(&items, true);
        cursor.advance().unwrap();

        let peeked = cursor.peek().unwrap();
        let advanced = cursor.advance().unwrap();
        assert_eq!(peeked.offset, advanced.offset);
        assert_eq!(peeked.exposed, advanced.exposed);
        assert_eq!(peeked.index, advanced.index);

        // peeking at the end reports exhaustion without consuming state
        cursor.advance().unwrap();
        assert!(matches!(cursor.peek(), Err(ChainError::EndOfSequence)));
        assert!(matches!(cursor.advance(), Err(ChainError::EndOfSequence)));
    }

    #[test]
    fn test_checking_rejects_leading_transition() {
        let items = vec![transition(4, 2), clip(10)];
        let mut cursor = SequenceCursor::new(&items, true);
        assert!(matches!(
            cursor.advance(),
            Err(ChainError::TraversalNotPossible { .. })
        ));
    }

    #[test]
    fn test_checking_rejects_adjacent_transitions() {
        let items = vec![clip(10), transition(4, 2), transition(6, 3), clip(10)];
        let mut cursor = SequenceCursor::new(&items, true);
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert!(matches!(
            cursor.advance(),
            Err(ChainError::TraversalNotPossible { .. })
        ));
    }

    #[test]
    fn test_paused_checking_tolerates_malformed_layout() {
        let items = vec![clip(10), transition(4, 2), transition(6, 3), clip(10)];
        let got = steps(&items, false);
        // A loses 2 to T1; T2's cut (3) lands on B
        assert_eq!(
            got,
            vec![
                (0, 0, 8, false),
                (8, 8, 4, true),
                (12, 12, 6, true),
                (18, 15, 7, false)
            ]
        );

        // leading transition exposes at offset 0, reduction has no target
        let items = vec![transition(4, 2), clip(10)];
        assert_eq!(steps(&items, false), vec![(0, 0, 4, true), (4, 2, 8, false)]);
    }
}
