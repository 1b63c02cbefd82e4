// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Address-keyed record table for one partition.
//!
//! Lookups are a linear scan by identity. Registries stay small in practice
//! and the scan keeps insertion order stable, which keeps sweeps and dumps
//! deterministic.

use crate::{AllocationRecord, CollectorStats, GcError};
use std::fmt::Write as _;
use std::ptr;

/// The set of [`AllocationRecord`]s belonging to one partition.
pub struct Registry<T> {
    records: Vec<AllocationRecord<T>>,
    stats: CollectorStats,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            stats: CollectorStats::default(),
        }
    }

    /// Returns the record tracking `address`, if any.
    pub fn find(&self, address: *const T) -> Option<&AllocationRecord<T>> {
        self.records
            .iter()
            .find(|r| ptr::eq(r.address(), address))
    }

    fn find_mut(&mut self, address: *const T) -> Option<&mut AllocationRecord<T>> {
        self.records
            .iter_mut()
            .find(|r| ptr::eq(r.address(), address))
    }

    /// Inserts a record.
    ///
    /// Callers must check [`find`](Self::find) first; a registry holds at
    /// most one record per address.
    pub fn insert(&mut self, record: AllocationRecord<T>) {
        debug_assert!(
            self.find(record.address()).is_none(),
            "duplicate record for {:p}",
            record.address()
        );
        self.records.push(record);
        self.stats.record_insert(self.records.len());
    }

    /// Removes the record tracking `address` without releasing its memory.
    pub fn remove(&mut self, address: *const T) -> Option<AllocationRecord<T>> {
        let index = self
            .records
            .iter()
            .position(|r| ptr::eq(r.address(), address))?;
        Some(self.records.remove(index))
    }

    /// Increments the count of an already tracked address.
    pub fn retain(&mut self, address: *const T) -> Result<usize, GcError> {
        let record = self
            .find_mut(address)
            .ok_or(GcError::UntrackedAddress {
                address: address as usize,
            })?;
        let count = record.increment();
        self.stats.record_retain();
        Ok(count)
    }

    /// Increments the count for `address`, inserting a fresh record with
    /// `array_len` elements when the address is not tracked yet.
    pub fn retain_or_insert(&mut self, address: *mut T, array_len: usize) -> usize {
        if let Some(record) = self.find_mut(address) {
            let count = record.increment();
            self.stats.record_retain();
            return count;
        }
        let mut record = AllocationRecord::new(address, array_len);
        record.increment();
        self.insert(record);
        1
    }

    /// Decrements the count of `address` if it is above zero.
    pub fn release(&mut self, address: *const T) -> Result<usize, GcError> {
        let record = self
            .find_mut(address)
            .ok_or(GcError::UntrackedAddress {
                address: address as usize,
            })?;
        let count = record.decrement();
        self.stats.record_release();
        Ok(count)
    }

    /// Removes and returns the first record whose count is zero.
    ///
    /// This is the single step of the sweep. The caller releases the record
    /// only after it is out of the registry, so a freed address can never be
    /// found again.
    pub fn take_first_unreferenced(&mut self) -> Option<AllocationRecord<T>> {
        let index = self.records.iter().position(|r| r.is_unreferenced())?;
        Some(self.records.remove(index))
    }

    /// Sets every count to zero. Used by teardown only.
    pub fn force_all_counts_to_zero(&mut self) {
        for record in &mut self.records {
            record.clear_count();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AllocationRecord<T>> {
        self.records.iter()
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CollectorStats {
        &mut self.stats
    }

    /// Renders every record, one per line, under `label`.
    pub fn dump(&self, label: &str) -> String {
        let mut out = format!("registry<{label}>: {} record(s)\n", self.records.len());
        if self.records.is_empty() {
            out.push_str("  registry is empty\n");
        }
        for record in &self.records {
            let _ = writeln!(out, "  {record}");
        }
        out
    }

    /// Like [`Registry::dump`], with each pointee's value after its record.
    ///
    /// # Safety
    /// Every record must track a live allocation of the shape it describes,
    /// and no `&mut` to any of them may be alive during the call.
    pub unsafe fn dump_values(&self, label: &str) -> String
    where
        T: std::fmt::Debug,
    {
        let mut out = format!("registry<{label}>: {} record(s)\n", self.records.len());
        if self.records.is_empty() {
            out.push_str("  registry is empty\n");
        }
        for record in &self.records {
            if record.is_array() {
                let values = std::slice::from_raw_parts(record.address(), record.array_len());
                let _ = writeln!(out, "  {record} = {values:?}");
            } else {
                let _ = writeln!(out, "  {record} = {:?}", &*record.address());
            }
        }
        out
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("records", &self.records)
            .finish()
    }
}
