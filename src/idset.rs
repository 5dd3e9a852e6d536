//! Ordered sets of state and event identifiers.
//!
//! This module provides a sparse bit set keyed by [`Id`]s: identifiers are
//! grouped into 64-bit blocks and only non-empty blocks are stored, sorted by
//! block index. Memory is thus proportional to the number of occupied blocks,
//! however large the identifiers get. Iteration is always in ascending
//! identifier order, which the synthesis algorithms rely on for deterministic
//! results.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, Sub};

use crate::types::{EventId, Id, StateId};

/// A set of states.
pub type StateSet = IdSet<StateId>;
/// A set of events.
pub type EventSet = IdSet<EventId>;

/// A set of identifiers backed by a sorted vector of non-empty 64-bit blocks.
pub struct IdSet<T> {
    /// Storage: `(block index, bits)`, sorted by block index, bits never zero
    blocks: Vec<(usize, u64)>,
    /// Number of set bits (cached for O(1) len())
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: Id> IdSet<T> {
    /// Number of bits per block.
    const BITS_PER_BLOCK: usize = 64;

    /// Creates a new empty set with room for the given number of dense
    /// identifiers.
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity.div_ceil(Self::BITS_PER_BLOCK)),
            count: 0,
            _marker: PhantomData,
        }
    }

    /// Creates an empty set with no pre-allocated capacity.
    pub fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            count: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the set has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    fn block_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_BLOCK, index % Self::BITS_PER_BLOCK)
    }

    #[inline]
    fn find(&self, block: usize) -> Result<usize, usize> {
        self.blocks.binary_search_by_key(&block, |&(b, _)| b)
    }

    /// Bits of the given block, zero if absent.
    #[inline]
    fn bits(&self, block: usize) -> u64 {
        match self.find(block) {
            Ok(pos) => self.blocks[pos].1,
            Err(_) => 0,
        }
    }

    /// Returns true if the identifier is a member.
    #[inline]
    pub fn contains(&self, id: T) -> bool {
        let (block, bit) = Self::block_and_bit(id.index());
        self.bits(block) & (1u64 << bit) != 0
    }

    /// Inserts the identifier. Returns true if it was not previously present.
    pub fn insert(&mut self, id: T) -> bool {
        let (block, bit) = Self::block_and_bit(id.index());
        let mask = 1u64 << bit;
        match self.find(block) {
            Ok(pos) => {
                let bits = &mut self.blocks[pos].1;
                if *bits & mask != 0 {
                    return false;
                }
                *bits |= mask;
            }
            Err(pos) => self.blocks.insert(pos, (block, mask)),
        }
        self.count += 1;
        true
    }

    /// Removes the identifier. Returns true if it was previously present.
    pub fn remove(&mut self, id: T) -> bool {
        let (block, bit) = Self::block_and_bit(id.index());
        let mask = 1u64 << bit;
        let Ok(pos) = self.find(block) else {
            return false;
        };
        let bits = &mut self.blocks[pos].1;
        if *bits & mask == 0 {
            return false;
        }
        *bits &= !mask;
        if *bits == 0 {
            self.blocks.remove(pos);
        }
        self.count -= 1;
        true
    }

    /// Returns the smallest element, if any.
    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    /// Finds and removes the smallest element.
    pub fn pop_first(&mut self) -> Option<T> {
        let first = self.first()?;
        self.remove(first);
        Some(first)
    }

    /// Removes all elements.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.count = 0;
    }

    /// Returns an iterator over all elements in ascending order.
    pub fn iter(&self) -> IdSetIter<'_, T> {
        IdSetIter {
            blocks: &self.blocks,
            pos: 0,
            current: self.blocks.first().map_or(0, |&(_, bits)| bits),
            _marker: PhantomData,
        }
    }

    /// Keeps only the elements for which the predicate holds.
    pub fn retain(&mut self, mut keep: impl FnMut(T) -> bool) {
        let drop: Vec<T> = self.iter().filter(|&id| !keep(id)).collect();
        for id in drop {
            self.remove(id);
        }
    }

    /// Merges the block lists of `self` and `other` with `op`. Blocks present
    /// on one side only are combined with an all-zero block.
    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) {
        let mut res = Vec::with_capacity(self.blocks.len().max(other.blocks.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.blocks.len() || j < other.blocks.len() {
            let (block, a, b) = match (self.blocks.get(i), other.blocks.get(j)) {
                (Some(&(ba, a)), Some(&(bb, b))) if ba == bb => {
                    i += 1;
                    j += 1;
                    (ba, a, b)
                }
                (Some(&(ba, a)), Some(&(bb, _))) if ba < bb => {
                    i += 1;
                    (ba, a, 0)
                }
                (Some(&(ba, a)), None) => {
                    i += 1;
                    (ba, a, 0)
                }
                (_, Some(&(bb, b))) => {
                    j += 1;
                    (bb, 0, b)
                }
                (None, None) => break,
            };
            let bits = op(a, b);
            if bits != 0 {
                res.push((block, bits));
            }
        }
        self.count = res.iter().map(|&(_, bits)| bits.count_ones() as usize).sum();
        self.blocks = res;
    }

    /// In-place union: `self ∪= other`.
    pub fn union_with(&mut self, other: &Self) {
        self.combine(other, |a, b| a | b);
    }

    /// In-place intersection: `self ∩= other`.
    pub fn intersect_with(&mut self, other: &Self) {
        self.combine(other, |a, b| a & b);
    }

    /// In-place difference: `self \= other`.
    pub fn difference_with(&mut self, other: &Self) {
        self.combine(other, |a, b| a & !b);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut res = self.clone();
        res.union_with(other);
        res
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let mut res = self.clone();
        res.intersect_with(other);
        res
    }

    pub fn difference(&self, other: &Self) -> Self {
        let mut res = self.clone();
        res.difference_with(other);
        res
    }

    /// Returns true if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.count <= other.count && self.blocks.iter().all(|&(block, bits)| bits & !other.bits(block) == 0)
    }

    /// Returns true if the sets share no element.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (small, large) = if self.blocks.len() <= other.blocks.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.blocks.iter().all(|&(block, bits)| bits & large.bits(block) == 0)
    }
}

impl<T> Clone for IdSet<T> {
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks.clone(),
            count: self.count,
            _marker: PhantomData,
        }
    }
}

impl<T: Id> Default for IdSet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Id> PartialEq for IdSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
    }
}

impl<T: Id> Eq for IdSet<T> {}

impl<T: Id> Hash for IdSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.blocks.hash(state);
    }
}

impl<T: Id> Ord for IdSet<T> {
    /// Lexicographic order on the ascending element sequences.
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Id> PartialOrd for IdSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Id> Extend<T> for IdSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl<T: Id> FromIterator<T> for IdSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl<'a, T: Id> IntoIterator for &'a IdSet<T> {
    type Item = T;
    type IntoIter = IdSetIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Id> BitOr for &IdSet<T> {
    type Output = IdSet<T>;

    fn bitor(self, rhs: Self) -> IdSet<T> {
        self.union(rhs)
    }
}

impl<T: Id> BitAnd for &IdSet<T> {
    type Output = IdSet<T>;

    fn bitand(self, rhs: Self) -> IdSet<T> {
        self.intersection(rhs)
    }
}

impl<T: Id> Sub for &IdSet<T> {
    type Output = IdSet<T>;

    fn sub(self, rhs: Self) -> IdSet<T> {
        self.difference(rhs)
    }
}

impl<T: Id> fmt::Debug for IdSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Id + fmt::Display> fmt::Display for IdSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}

/// Iterator over the elements of an [`IdSet`], in ascending order.
pub struct IdSetIter<'a, T> {
    blocks: &'a [(usize, u64)],
    pos: usize,
    current: u64,
    _marker: PhantomData<T>,
}

impl<T: Id> Iterator for IdSetIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1; // Clear lowest set bit
                let block = self.blocks[self.pos].0;
                return Some(T::from_index(block * IdSet::<T>::BITS_PER_BLOCK + bit));
            }

            self.pos += 1;
            let &(_, bits) = self.blocks.get(self.pos)?;
            self.current = bits;
        }
    }
}
