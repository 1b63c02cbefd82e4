// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bounds-checked cursor over an array allocation.
//!
//! A [`GcIter`] is a position inside `[begin, end)` of a contiguous
//! allocation. Reading or advancing outside that range returns
//! [`GcError::IteratorOutOfRange`] instead of touching memory. It also
//! implements [`Iterator`], so `for x in ptr.iter()` works.

use crate::GcError;
use std::fmt;

/// Forward cursor over the elements of an array allocation.
pub struct GcIter<'a, T> {
    elements: &'a [T],
    position: usize,
}

impl<'a, T> GcIter<'a, T> {
    /// Creates a cursor at `position` over `elements`.
    ///
    /// `position == elements.len()` is the one-past-the-end cursor.
    ///
    /// # Panics
    /// Panics if `position > elements.len()`.
    pub fn new(elements: &'a [T], position: usize) -> Self {
        assert!(
            position <= elements.len(),
            "iterator position {position} past end {}",
            elements.len()
        );
        Self {
            elements,
            position,
        }
    }

    /// Creates a cursor from raw `current`, `begin` and `end` addresses.
    ///
    /// # Safety
    /// `begin..end` must be a live, initialized allocation of `T` that
    /// outlives `'a`, and `current` must lie within `[begin, end]`.
    ///
    /// # Panics
    /// Panics if `T` is zero-sized, since positions cannot be recovered from
    /// addresses.
    pub unsafe fn from_raw_bounds(current: *const T, begin: *const T, end: *const T) -> Self {
        assert!(
            std::mem::size_of::<T>() != 0,
            "raw bounds are ambiguous for zero-sized types"
        );
        let len = end.offset_from(begin) as usize;
        let position = current.offset_from(begin) as usize;
        Self::new(std::slice::from_raw_parts(begin, len), position)
    }

    /// Index of the current element.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of elements between `begin` and `end`.
    pub fn array_len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.elements.len()
    }

    /// Address of the current position.
    pub fn as_ptr(&self) -> *const T {
        self.elements.as_ptr().wrapping_add(self.position)
    }

    /// Reads the element at the current position.
    pub fn get(&self) -> Result<&'a T, GcError> {
        self.elements
            .get(self.position)
            .ok_or(GcError::IteratorOutOfRange {
                position: self.position,
                len: self.elements.len(),
            })
    }

    /// Moves to the next element (prefix increment). Refuses to move past
    /// `end`.
    pub fn advance(&mut self) -> Result<&mut Self, GcError> {
        if self.is_at_end() {
            return Err(GcError::IteratorOutOfRange {
                position: self.position + 1,
                len: self.elements.len(),
            });
        }
        self.position += 1;
        Ok(self)
    }

    /// Moves to the next element and returns the cursor as it was before
    /// (postfix increment).
    pub fn post_advance(&mut self) -> Result<Self, GcError> {
        let before = self.clone();
        self.advance()?;
        Ok(before)
    }
}

impl<T> Clone for GcIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            elements: self.elements,
            position: self.position,
        }
    }
}

impl<T> PartialEq for GcIter<'_, T> {
    /// Cursors are equal when they sit at the same position of the same
    /// allocation.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.elements.as_ptr(), other.elements.as_ptr())
            && self.position == other.position
    }
}

impl<T> Eq for GcIter<'_, T> {}

impl<'a, T> Iterator for GcIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.elements.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.elements.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for GcIter<'_, T> {}

impl<T> fmt::Debug for GcIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcIter")
            .field("current", &self.as_ptr())
            .field("position", &self.position)
            .field("len", &self.elements.len())
            .finish()
    }
}
