// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The reference-counted handle.
//!
//! [`GcPtr`] is the user-facing smart pointer. Every lifecycle event updates
//! exactly one record in the handle's partition:
//!
//! | event                   | record update                  | sweep        |
//! |-------------------------|--------------------------------|--------------|
//! | `new` / `from_raw`      | increment, or insert at 1      | no           |
//! | `clone`                 | increment                      | no           |
//! | `assign_raw` / `set`    | increment new, decrement old   | per policy   |
//! | `assign` / `clone_from` | increment new, decrement old   | per policy   |
//! | `drop`                  | decrement                      | per policy   |
//!
//! Assignments always take the new reference before giving up the old one,
//! so assigning a handle to itself never frees its allocation.

use crate::partition::Partition;
use crate::{CollectorStats, GcContext, GcError, GcIter};
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::{Deref, Index};
use std::ptr;
use std::rc::Rc;

/// A reference-counted pointer to a heap-allocated `T`, or to an array of
/// `N` elements of `T` when `N > 0`.
///
/// Handles of the same `T` but different `N` live in different partitions
/// and never share counts, even when they point at the same address.
///
/// `GcPtr` is neither `Send` nor `Sync`: partitions are single-threaded.
///
/// # Example
/// ```
/// use gc_pointer::{GcContext, GcPtr};
///
/// let ctx = GcContext::new();
/// let mut p = GcPtr::new(&ctx, String::from("first"));
/// let q = p.clone();
/// assert_eq!(*q, "first");
///
/// p.set(String::from("second"));
/// assert_eq!(*p, "second");
/// assert_eq!(q.ref_count(), 1);
/// assert_eq!(GcPtr::<String>::registry_size(&ctx), 2);
/// ```
pub struct GcPtr<T: 'static, const N: usize = 0> {
    address: *mut T,
    is_array: bool,
    array_len: usize,
    /// Partition epoch this handle was bound in.
    epoch: u64,
    partition: Rc<Partition<T, N>>,
    _owns: PhantomData<T>,
}

impl<T: 'static, const N: usize> GcPtr<T, N> {
    /// Creates a handle to nothing. No record is created.
    pub fn null(ctx: &GcContext) -> Self {
        Self::bind(ctx.partition::<T, N>(), ptr::null_mut())
    }

    /// Starts tracking `address`, or takes another reference to it if this
    /// partition already tracks it.
    ///
    /// The first handle constructed for a `(T, N)` combination registers the
    /// partition with `ctx` for teardown.
    ///
    /// # Safety
    /// `address` must be null, or come from `Box::into_raw` on a `T` when
    /// `N == 0`, or on a `[T; N]` / `Box<[T]>` of length `N` when `N > 0`.
    /// Ownership of the allocation passes to the partition: nothing else may
    /// free it, and no other partition or context may track it.
    pub unsafe fn from_raw(ctx: &GcContext, address: *mut T) -> Self {
        Self::bind(ctx.partition::<T, N>(), address)
    }

    /// Allocates `elements` and tracks them as an array of `N` elements.
    ///
    /// `T` must not be zero-sized; see [`GcPtr::new`].
    pub fn from_array(ctx: &GcContext, elements: [T; N]) -> Self {
        const { assert!(N > 0, "array handles need N > 0") };
        const { assert!(size_of::<T>() != 0, "GcPtr cannot allocate zero-sized values") };
        let address = Box::into_raw(Box::new(elements)) as *mut T;
        // SAFETY: a freshly boxed `[T; N]` is exactly what array records
        // release.
        unsafe { Self::from_raw(ctx, address) }
    }

    fn bind(partition: Rc<Partition<T, N>>, address: *mut T) -> Self {
        partition.retain_or_insert(address);
        let tracked = !address.is_null();
        Self {
            address,
            is_array: tracked && N > 0,
            array_len: if tracked { N } else { 0 },
            epoch: partition.epoch(),
            partition,
            _owns: PhantomData,
        }
    }

    /// Points this handle at `address`, releasing the previous allocation.
    ///
    /// # Safety
    /// Same contract as [`GcPtr::from_raw`].
    pub unsafe fn assign_raw(&mut self, address: *mut T) {
        let fresh = Self::bind(Rc::clone(&self.partition), address);
        // Dropping the old handle decrements its record and sweeps.
        *self = fresh;
    }

    /// Replaces the array this handle points at.
    pub fn set_array(&mut self, elements: [T; N]) {
        const { assert!(N > 0, "array handles need N > 0") };
        const { assert!(size_of::<T>() != 0, "GcPtr cannot allocate zero-sized values") };
        let address = Box::into_raw(Box::new(elements)) as *mut T;
        // SAFETY: see `from_array`.
        unsafe { self.assign_raw(address) }
    }

    /// Points this handle at whatever `other` points at.
    ///
    /// `other` may belong to a different context; the handle then moves to
    /// `other`'s partition.
    pub fn assign(&mut self, other: &Self) {
        *self = other.clone();
    }

    pub fn is_null(&self) -> bool {
        self.address.is_null()
    }

    /// Returns `true` if the handle's partition was torn down after the
    /// handle was bound. Detached handles never touch their memory again.
    pub fn is_detached(&self) -> bool {
        !self.address.is_null() && self.epoch != self.partition.epoch()
    }

    fn is_bound(&self) -> bool {
        !self.address.is_null() && self.epoch == self.partition.epoch()
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn array_len(&self) -> usize {
        self.array_len
    }

    /// Current count of the record this handle points at; zero for null and
    /// detached handles.
    pub fn ref_count(&self) -> usize {
        if !self.is_bound() {
            return 0;
        }
        self.partition.ref_count(self.address).unwrap_or(0)
    }

    /// The tracked address, for code that expects a plain pointer.
    pub fn as_ptr(&self) -> *mut T {
        self.address
    }

    /// Returns the pointee, or why it cannot be read.
    pub fn try_get(&self) -> Result<&T, GcError> {
        if self.address.is_null() {
            return Err(GcError::NullDereference);
        }
        if self.is_detached() {
            return Err(GcError::Detached);
        }
        // SAFETY: a bound handle holds a count of at least one, so the
        // allocation has not been swept.
        Ok(unsafe { &*self.address })
    }

    pub fn get(&self) -> Option<&T> {
        self.try_get().ok()
    }

    /// Mutable access, only while this is the sole handle to the allocation.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.ref_count() != 1 {
            return None;
        }
        // SAFETY: bound, and no other handle in this partition aliases it.
        Some(unsafe { &mut *self.address })
    }

    /// The elements of an array handle. Empty for single-object, null and
    /// detached handles.
    pub fn as_slice(&self) -> &[T] {
        if !self.is_array || !self.is_bound() {
            return &[];
        }
        // SAFETY: array records track a live allocation of `array_len`
        // elements while the handle is bound.
        unsafe { std::slice::from_raw_parts(self.address, self.array_len) }
    }

    /// Mutable elements, only while this is the sole handle to the array.
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        if !self.is_array || self.ref_count() != 1 {
            return None;
        }
        // SAFETY: as for `as_slice`, plus uniqueness.
        Some(unsafe { std::slice::from_raw_parts_mut(self.address, self.array_len) })
    }

    /// Unchecked element access.
    ///
    /// # Safety
    /// The handle must be bound and `index` must be within the allocation.
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        &*self.address.add(index)
    }

    /// Cursor at the first element.
    pub fn begin(&self) -> GcIter<'_, T> {
        GcIter::new(self.as_slice(), 0)
    }

    /// Cursor one past the last element.
    pub fn end(&self) -> GcIter<'_, T> {
        let elements = self.as_slice();
        GcIter::new(elements, elements.len())
    }

    pub fn iter(&self) -> GcIter<'_, T> {
        self.begin()
    }

    /// Sweeps this partition of `ctx`. Returns `true` if anything was freed.
    pub fn collect(ctx: &GcContext) -> bool {
        ctx.partition::<T, N>().collect()
    }

    /// Number of records in this partition of `ctx`.
    pub fn registry_size(ctx: &GcContext) -> usize {
        ctx.partition::<T, N>().len()
    }

    /// Lists every record in this partition of `ctx`.
    pub fn dump(ctx: &GcContext) -> String {
        ctx.partition::<T, N>().dump()
    }

    /// Tears down this partition of `ctx`, freeing records that live
    /// handles still reference. Returns the number of records freed.
    ///
    /// # Safety
    /// No reference obtained from a handle of this partition may be used
    /// after the call. The handles themselves become detached and may be
    /// dropped or reassigned as usual.
    pub unsafe fn shutdown(ctx: &GcContext) -> usize {
        ctx.partition::<T, N>().shutdown()
    }

    /// Like [`GcPtr::dump`], with every pointee's value.
    ///
    /// # Safety
    /// No `&mut` obtained through [`GcPtr::get_mut`] or
    /// [`GcPtr::as_mut_slice`] on this partition may be alive.
    pub unsafe fn dump_values(ctx: &GcContext) -> String
    where
        T: fmt::Debug,
    {
        ctx.partition::<T, N>().dump_values()
    }

    pub fn stats(ctx: &GcContext) -> CollectorStats {
        ctx.partition::<T, N>().stats()
    }

    /// Count recorded for `address` in this partition of `ctx`, if tracked.
    pub fn tracked_count(ctx: &GcContext, address: *const T) -> Option<usize> {
        ctx.partition::<T, N>().ref_count(address)
    }
}

impl<T: 'static> GcPtr<T> {
    /// Allocates `value` and tracks it.
    ///
    /// Zero-sized types are rejected at compile time: every boxed zero-sized
    /// value has the same address, so their records would merge.
    ///
    /// ```compile_fail
    /// use gc_pointer::{GcContext, GcPtr};
    ///
    /// struct Unit;
    /// let ctx = GcContext::new();
    /// let _p = GcPtr::new(&ctx, Unit);
    /// ```
    pub fn new(ctx: &GcContext, value: T) -> Self {
        const { assert!(size_of::<T>() != 0, "GcPtr cannot allocate zero-sized values") };
        let address = Box::into_raw(Box::new(value));
        // SAFETY: a freshly boxed `T`.
        unsafe { Self::from_raw(ctx, address) }
    }

    /// Replaces the pointee with a newly allocated `value`.
    pub fn set(&mut self, value: T) {
        const { assert!(size_of::<T>() != 0, "GcPtr cannot allocate zero-sized values") };
        let address = Box::into_raw(Box::new(value));
        // SAFETY: a freshly boxed `T`.
        unsafe { self.assign_raw(address) }
    }
}

impl<T: 'static, const N: usize> Clone for GcPtr<T, N> {
    /// Takes another reference to the same allocation.
    ///
    /// # Panics
    /// Panics if the address is missing from the partition, which means the
    /// registry no longer matches the live handles.
    fn clone(&self) -> Self {
        if self.is_bound() {
            self.partition
                .retain(self.address)
                .unwrap_or_else(|e| panic!("cannot copy GcPtr: {e}"));
        }
        Self {
            address: self.address,
            is_array: self.is_array,
            array_len: self.array_len,
            epoch: self.epoch,
            partition: Rc::clone(&self.partition),
            _owns: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source);
    }
}

impl<T: 'static, const N: usize> Drop for GcPtr<T, N> {
    fn drop(&mut self) {
        if self.address.is_null() {
            return;
        }
        if self.is_detached() {
            tracing::trace!("dropping detached GcPtr {:p}", self.address);
            return;
        }
        match self.partition.release(self.address) {
            Ok(_) => self.partition.sweep_after_release(),
            Err(e) => {
                tracing::error!("GcPtr drop: {e}");
                debug_assert!(false, "GcPtr drop: {e}");
            }
        }
    }
}

impl<T: 'static, const N: usize> Deref for GcPtr<T, N> {
    type Target = T;

    /// # Panics
    /// Panics on null and detached handles; use [`GcPtr::get`] to check.
    fn deref(&self) -> &T {
        match self.try_get() {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: 'static, const N: usize> Index<usize> for GcPtr<T, N> {
    type Output = T;

    /// Bounds-checked element access.
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<'a, T: 'static, const N: usize> IntoIterator for &'a GcPtr<T, N> {
    type Item = &'a T;
    type IntoIter = GcIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.begin()
    }
}

impl<T: 'static, const N: usize> PartialEq for GcPtr<T, N> {
    /// Handles are equal when they point at the same address.
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.address, other.address)
    }
}

impl<T: 'static, const N: usize> Eq for GcPtr<T, N> {}

impl<T: 'static, const N: usize> fmt::Pointer for GcPtr<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.address, f)
    }
}

impl<T: 'static, const N: usize> fmt::Debug for GcPtr<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcPtr")
            .field("address", &self.address)
            .field("ref_count", &self.ref_count())
            .field("is_array", &self.is_array)
            .field("array_len", &self.array_len)
            .field("detached", &self.is_detached())
            .finish()
    }
}
