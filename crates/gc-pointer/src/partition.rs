// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shared state for one (pointee type, array size) partition.
//!
//! A [`Partition`] owns the [`Registry`] for its combination together with
//! the sweep policy and the teardown epoch. It is shared between the owning
//! [`GcContext`](crate::GcContext) and every [`GcPtr`](crate::GcPtr) bound to
//! it via `Rc`, so handles can update counts and sweep without a reference
//! to the context.
//!
//! # Sweep
//! [`Partition::collect`] repeatedly takes the first zero-count record out of
//! the registry and releases it, restarting from the front each time. The
//! registry borrow is dropped before each release: destructors of the freed
//! values may drop further handles into this or other partitions, which
//! re-enter the registry and may run nested sweeps.
//!
//! # Epochs
//! Teardown bumps the epoch before freeing anything. Handles remember the
//! epoch they were bound in, and a handle from an older epoch is detached:
//! it never touches the registry or its (already freed) memory again, even
//! if a later allocation reuses the same address.

use crate::{CollectorStats, GcConfig, GcError, Registry, SweepPolicy};
use std::cell::{Cell, RefCell};

pub(crate) struct Partition<T: 'static, const N: usize> {
    registry: RefCell<Registry<T>>,
    epoch: Cell<u64>,
    policy: SweepPolicy,
    trace_sweeps: bool,
}

impl<T: 'static, const N: usize> Partition<T, N> {
    pub(crate) fn new(config: &GcConfig) -> Self {
        Self {
            registry: RefCell::new(Registry::new()),
            epoch: Cell::new(0),
            policy: config.sweep_policy,
            trace_sweeps: config.trace_sweeps,
        }
    }

    /// Human-readable partition name, e.g. `i32, 5`.
    pub(crate) fn label() -> String {
        format!("{}, {}", std::any::type_name::<T>(), N)
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.get()
    }

    pub(crate) fn retain_or_insert(&self, address: *mut T) {
        if address.is_null() {
            return;
        }
        self.registry.borrow_mut().retain_or_insert(address, N);
    }

    pub(crate) fn retain(&self, address: *const T) -> Result<usize, GcError> {
        self.registry.borrow_mut().retain(address)
    }

    pub(crate) fn release(&self, address: *const T) -> Result<usize, GcError> {
        self.registry.borrow_mut().release(address)
    }

    pub(crate) fn ref_count(&self, address: *const T) -> Option<usize> {
        self.registry.borrow().find(address).map(|r| r.ref_count())
    }

    /// Runs the sweep if the policy asks for one after a decrement.
    pub(crate) fn sweep_after_release(&self) {
        if self.policy == SweepPolicy::Eager {
            self.collect();
        }
    }

    /// Frees every zero-count record. Returns `true` if anything was freed.
    pub(crate) fn collect(&self) -> bool {
        let mut freed = 0usize;
        loop {
            let next = self.registry.borrow_mut().take_first_unreferenced();
            let Some(record) = next else { break };
            if self.trace_sweeps {
                tracing::debug!(
                    partition = %Self::label(),
                    "freeing {record}"
                );
            }
            freed += 1;
            // SAFETY: records only enter the registry through `GcPtr`
            // constructors, whose contract guarantees a live `Box`
            // allocation of matching shape. The record is already out of
            // the registry, and a zero count means no live handle of this
            // epoch references it.
            unsafe { record.release() };
        }
        self.registry.borrow_mut().stats_mut().record_sweep(freed);
        freed > 0
    }

    /// Forces every count to zero and frees everything. Returns the number
    /// of records freed.
    ///
    /// # Safety
    /// No reference obtained from a handle of this partition may be used
    /// after the call.
    pub(crate) unsafe fn shutdown(&self) -> usize {
        let freed_before = {
            let mut registry = self.registry.borrow_mut();
            if registry.is_empty() {
                return 0;
            }
            registry.force_all_counts_to_zero();
            registry.stats_mut().record_teardown();
            registry.stats().records_freed
        };
        self.epoch.set(self.epoch.get() + 1);
        self.collect();

        let freed = (self.registry.borrow().stats().records_freed - freed_before) as usize;
        tracing::info!(
            partition = %Self::label(),
            epoch = self.epoch.get(),
            "partition torn down, {freed} record(s) freed"
        );
        freed
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    pub(crate) fn dump(&self) -> String {
        self.registry.borrow().dump(&Self::label())
    }

    /// # Safety
    /// See [`Registry::dump_values`].
    pub(crate) unsafe fn dump_values(&self) -> String
    where
        T: std::fmt::Debug,
    {
        self.registry.borrow().dump_values(&Self::label())
    }

    pub(crate) fn stats(&self) -> CollectorStats {
        self.registry.borrow().stats().clone()
    }
}

impl<T: 'static, const N: usize> Drop for Partition<T, N> {
    fn drop(&mut self) {
        // SAFETY: every handle holds an `Rc` to its partition, so none is
        // left and no reference obtained through one can still be alive.
        unsafe { self.shutdown() };
    }
}

/// Type-erased view of a partition, used by the context to sweep, tear
/// down and report on partitions of every type.
pub(crate) trait ErasedPartition {
    fn label(&self) -> String;
    fn len(&self) -> usize;
    fn collect(&self) -> bool;
    /// # Safety
    /// Same contract as [`Partition::shutdown`].
    unsafe fn shutdown(&self) -> usize;
    fn dump(&self) -> String;
    fn stats(&self) -> CollectorStats;
}

impl<T: 'static, const N: usize> ErasedPartition for Partition<T, N> {
    fn label(&self) -> String {
        Self::label()
    }

    fn len(&self) -> usize {
        Partition::len(self)
    }

    fn collect(&self) -> bool {
        Partition::collect(self)
    }

    unsafe fn shutdown(&self) -> usize {
        Partition::shutdown(self)
    }

    fn dump(&self) -> String {
        Partition::dump(self)
    }

    fn stats(&self) -> CollectorStats {
        Partition::stats(self)
    }
}
