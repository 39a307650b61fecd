//! A growable array with positional insertion and bisection search.
//!
//! [`Sequence`] does not keep itself sorted. Callers that need ordering find
//! the insertion point with [`Sequence::bsearch`] and insert there with
//! [`Sequence::add_at`]; the sequence only guarantees that growth never
//! aborts the process.

use std::cmp::Ordering;

use crate::error::{SequenceError, SequenceResult};

/// Ordered collection of items addressed by index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence<T> {
    items: Vec<T>,
}

impl<T> Sequence<T> {
    /// Create an empty sequence with room for `hint` items.
    pub fn new(hint: usize) -> SequenceResult<Self> {
        let mut items = Vec::new();
        items.try_reserve_exact(hint)?;
        Ok(Self { items })
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the sequence holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Insert `item` at `index`, shifting later items right.
    ///
    /// `index` may equal `len()` to append.
    pub fn add_at(&mut self, index: usize, item: T) -> SequenceResult<()> {
        if index > self.items.len() {
            return Err(SequenceError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        self.items.try_reserve(1)?;
        self.items.insert(index, item);
        Ok(())
    }

    /// Remove and return the item at `index`, shifting later items left.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Binary search with a comparator that orders an item against the key.
    ///
    /// Returns `Ok(index)` of a matching item, or `Err(index)` where a
    /// matching item would have to be inserted to keep the order. The result
    /// is only meaningful if the sequence is sorted under the comparator.
    pub fn bsearch<F>(&self, compare: F) -> Result<usize, usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        self.items.binary_search_by(compare)
    }

    /// Apply `f` to every item in order, threading an accumulator through.
    pub fn map<A, F>(&self, acc: &mut A, mut f: F)
    where
        F: FnMut(&T, &mut A),
    {
        for item in &self.items {
            f(item, acc);
        }
    }

    /// Iterate over the items in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// View the items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<'a, T> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
