// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-allocation bookkeeping.
//!
//! An [`AllocationRecord`] describes exactly one tracked allocation. It never
//! frees anything on its own initiative: the sweep in
//! [`Partition::collect`](crate::partition::Partition) removes a record from
//! its registry first and only then calls [`AllocationRecord::release`].

use std::fmt;
use std::ptr;

/// Bookkeeping entry for a single tracked allocation.
pub struct AllocationRecord<T> {
    address: *mut T,
    ref_count: usize,
    is_array: bool,
    array_len: usize,
}

impl<T> AllocationRecord<T> {
    /// Creates a record with a count of zero.
    ///
    /// The caller registering the record raises the count to one. The
    /// record is an array record iff `array_len > 0`.
    pub fn new(address: *mut T, array_len: usize) -> Self {
        Self {
            address,
            ref_count: 0,
            is_array: array_len > 0,
            array_len,
        }
    }

    /// The tracked address.
    pub fn address(&self) -> *mut T {
        self.address
    }

    /// Number of live handles referencing this allocation.
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Whether the allocation was created as an array.
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Element count for array records, zero otherwise.
    pub fn array_len(&self) -> usize {
        self.array_len
    }

    /// Returns `true` once no handle references the allocation.
    pub fn is_unreferenced(&self) -> bool {
        self.ref_count == 0
    }

    pub(crate) fn increment(&mut self) -> usize {
        self.ref_count += 1;
        self.ref_count
    }

    /// Decrements the count, saturating at zero.
    pub(crate) fn decrement(&mut self) -> usize {
        if self.ref_count > 0 {
            self.ref_count -= 1;
        }
        self.ref_count
    }

    pub(crate) fn clear_count(&mut self) {
        self.ref_count = 0;
    }

    /// Frees the tracked allocation.
    ///
    /// Array records are released as a boxed slice of `array_len` elements,
    /// everything else as a single boxed value. A null address is a no-op.
    ///
    /// # Safety
    /// The address must have been produced by `Box::into_raw` for a `T`
    /// (single records) or for a `[T; array_len]` / `Box<[T]>` of that
    /// length (array records), must not have been freed already, and no
    /// reference into the allocation may outlive this call.
    pub(crate) unsafe fn release(self) {
        if self.address.is_null() {
            return;
        }
        if self.is_array {
            let slice = ptr::slice_from_raw_parts_mut(self.address, self.array_len);
            drop(Box::from_raw(slice));
        } else {
            drop(Box::from_raw(self.address));
        }
    }
}

impl<T> PartialEq for AllocationRecord<T> {
    /// Records are equal iff they track the same address.
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.address, other.address)
    }
}

impl<T> Eq for AllocationRecord<T> {}

impl<T> fmt::Debug for AllocationRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationRecord")
            .field("address", &self.address)
            .field("ref_count", &self.ref_count)
            .field("is_array", &self.is_array)
            .field("array_len", &self.array_len)
            .finish()
    }
}

impl<T> fmt::Display for AllocationRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:p}] refs={}", self.address, self.ref_count)?;
        if self.is_array {
            write!(f, " array[{}]", self.array_len)
        } else {
            write!(f, " single")
        }
    }
}
