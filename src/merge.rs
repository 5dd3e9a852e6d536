//! Merge-join of two event-sorted transition sequences.
//!
//! Synchronous composition walks the outgoing transitions of two states side
//! by side. Since both sequences are sorted by event, a linear merge suffices:
//! every step yields either a shared event or an event enabled on one side only.

use std::iter::Peekable;

use crate::types::Transition;

/// One step of a [`MergeJoin`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Merged {
    /// The event is enabled on both sides.
    Both(Transition, Transition),
    /// The event is enabled on the left side only.
    Left(Transition),
    /// The event is enabled on the right side only.
    Right(Transition),
}

/// Iterator merging two transition sequences sorted by event.
pub struct MergeJoin<L: Iterator, R: Iterator> {
    left: Peekable<L>,
    right: Peekable<R>,
}

impl<L, R> MergeJoin<L, R>
where
    L: Iterator<Item = Transition>,
    R: Iterator<Item = Transition>,
{
    pub fn new(left: L, right: R) -> Self {
        Self {
            left: left.peekable(),
            right: right.peekable(),
        }
    }
}

impl<L, R> Iterator for MergeJoin<L, R>
where
    L: Iterator<Item = Transition>,
    R: Iterator<Item = Transition>,
{
    type Item = Merged;

    fn next(&mut self) -> Option<Merged> {
        match (self.left.peek(), self.right.peek()) {
            (None, None) => None,
            (Some(_), None) => self.left.next().map(Merged::Left),
            (None, Some(_)) => self.right.next().map(Merged::Right),
            (Some(l), Some(r)) => {
                if l.ev == r.ev {
                    let l = self.left.next()?;
                    let r = self.right.next()?;
                    Some(Merged::Both(l, r))
                } else if l.ev < r.ev {
                    self.left.next().map(Merged::Left)
                } else {
                    self.right.next().map(Merged::Right)
                }
            }
        }
    }
}

/// Merge-joins two event-sorted transition sequences.
pub fn merge_join<L, R>(left: L, right: R) -> MergeJoin<L::IntoIter, R::IntoIter>
where
    L: IntoIterator<Item = Transition>,
    R: IntoIterator<Item = Transition>,
{
    MergeJoin::new(left.into_iter(), right.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, StateId};

    fn t(x1: u32, ev: u32, x2: u32) -> Transition {
        Transition::new(StateId::new(x1), EventId::new(ev), StateId::new(x2))
    }

    #[test]
    fn test_merge_three_way() {
        let left = vec![t(1, 1, 2), t(1, 3, 3), t(1, 5, 1)];
        let right = vec![t(7, 2, 7), t(7, 3, 8), t(7, 6, 9)];
        let merged: Vec<Merged> = merge_join(left, right).collect();
        assert_eq!(
            merged,
            vec![
                Merged::Left(t(1, 1, 2)),
                Merged::Right(t(7, 2, 7)),
                Merged::Both(t(1, 3, 3), t(7, 3, 8)),
                Merged::Left(t(1, 5, 1)),
                Merged::Right(t(7, 6, 9)),
            ]
        );
    }

    #[test]
    fn test_merge_one_side_empty() {
        let left = vec![t(1, 1, 2), t(1, 2, 2)];
        let merged: Vec<Merged> = merge_join(left.clone(), Vec::new()).collect();
        assert_eq!(merged, left.into_iter().map(Merged::Left).collect::<Vec<_>>());
        assert_eq!(merge_join(Vec::new(), Vec::new()).count(), 0);
    }
}
