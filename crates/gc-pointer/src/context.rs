// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The application-owned home of every partition.
//!
//! A [`GcContext`] creates partitions lazily, the first time a handle of a
//! given (pointee type, array size) combination is constructed in it, and
//! remembers them in registration order so that [`GcContext::collect`] and
//! [`GcContext::shutdown`] can visit all of them deterministically.
//!
//! Dropping the context never frees a value a live handle can still reach.
//! Each partition is shared with its handles through `Rc`, and whatever the
//! context leaves behind is freed when the last handle of that partition is
//! dropped.

use crate::partition::{ErasedPartition, Partition};
use crate::{CollectorStats, GcConfig};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartitionKey {
    type_id: TypeId,
    array_len: usize,
}

struct PartitionSlot {
    key: PartitionKey,
    typed: Rc<dyn Any>,
    erased: Rc<dyn ErasedPartition>,
}

/// Owner of the registries for every partition used by an application.
///
/// Dropping the context sweeps zero-count records when
/// [`GcConfig::collect_on_drop`] is set (the default). Handles that outlive
/// the context keep their partition, and their pointees, alive.
///
/// # Example
/// ```
/// use gc_pointer::{GcContext, GcPtr};
///
/// let ctx = GcContext::new();
/// let a = GcPtr::new(&ctx, 7u32);
/// let b = a.clone();
/// assert_eq!(a.ref_count(), 2);
///
/// drop(a);
/// drop(b);
/// assert_eq!(GcPtr::<u32>::registry_size(&ctx), 0);
/// ```
pub struct GcContext {
    config: GcConfig,
    partitions: RefCell<Vec<PartitionSlot>>,
}

impl GcContext {
    /// Creates a context with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    /// Creates a context with the given configuration.
    pub fn with_config(config: GcConfig) -> Self {
        tracing::debug!(policy = %config.sweep_policy, "gc context created");
        Self {
            config,
            partitions: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Returns the partition for `(T, N)`, creating and registering it for
    /// teardown on first use.
    pub(crate) fn partition<T: 'static, const N: usize>(&self) -> Rc<Partition<T, N>> {
        let key = PartitionKey {
            type_id: TypeId::of::<T>(),
            array_len: N,
        };

        let existing = self
            .partitions
            .borrow()
            .iter()
            .find(|slot| slot.key == key)
            .map(|slot| Rc::clone(&slot.typed));
        if let Some(typed) = existing {
            return match typed.downcast::<Partition<T, N>>() {
                Ok(partition) => partition,
                Err(_) => unreachable!("partition key maps to a different type"),
            };
        }

        let partition = Rc::new(Partition::<T, N>::new(&self.config));
        let typed: Rc<dyn Any> = partition.clone();
        let erased: Rc<dyn ErasedPartition> = partition.clone();
        self.partitions.borrow_mut().push(PartitionSlot { key, typed, erased });
        tracing::debug!(
            partition = %Partition::<T, N>::label(),
            "partition registered for teardown"
        );
        partition
    }

    fn erased_partitions(&self) -> Vec<Rc<dyn ErasedPartition>> {
        self.partitions
            .borrow()
            .iter()
            .map(|slot| Rc::clone(&slot.erased))
            .collect()
    }

    /// Number of partitions created so far.
    pub fn partition_count(&self) -> usize {
        self.partitions.borrow().len()
    }

    /// Total records across every partition.
    pub fn tracked_records(&self) -> usize {
        self.erased_partitions().iter().map(|p| p.len()).sum()
    }

    /// Sweeps every partition. Returns `true` if anything was freed.
    pub fn collect(&self) -> bool {
        let mut freed = false;
        for partition in self.erased_partitions() {
            freed |= partition.collect();
        }
        freed
    }

    /// Tears down every partition in registration order, freeing records
    /// that live handles still reference. Those handles become detached.
    ///
    /// Idempotent: partitions with empty registries are skipped. Returns the
    /// number of records freed. [`GcContext::collect`] is the safe form that
    /// frees only zero-count records.
    ///
    /// # Safety
    /// No reference obtained from a handle of this context (through
    /// `Deref`, `get`, `as_slice`, `iter` and the like) may be used after
    /// the call. Handles themselves may outlive it.
    pub unsafe fn shutdown(&self) -> usize {
        let freed: usize = self
            .erased_partitions()
            .iter()
            // SAFETY: forwarded from the caller.
            .map(|p| unsafe { p.shutdown() })
            .sum();
        if freed > 0 {
            tracing::info!(
                partitions = self.partition_count(),
                "context shut down, {freed} record(s) freed"
            );
        }
        freed
    }

    /// Renders every partition's registry.
    pub fn dump(&self) -> String {
        let partitions = self.erased_partitions();
        if partitions.is_empty() {
            return "no partitions\n".to_string();
        }
        partitions.iter().map(|p| p.dump()).collect()
    }

    /// Statistics merged across every partition.
    pub fn stats(&self) -> CollectorStats {
        let mut total = CollectorStats::default();
        for partition in self.erased_partitions() {
            total.merge(&partition.stats());
        }
        total
    }

    /// Per-partition statistics, labelled by `type, array size`.
    pub fn partition_stats(&self) -> Vec<(String, CollectorStats)> {
        self.erased_partitions()
            .iter()
            .map(|p| (p.label(), p.stats()))
            .collect()
    }
}

impl Default for GcContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GcContext {
    fn drop(&mut self) {
        if self.config.collect_on_drop {
            self.collect();
        }
        let outstanding = self.tracked_records();
        if outstanding > 0 {
            tracing::debug!(
                "gc context dropped, {outstanding} record(s) deferred to their last handle"
            );
        }
    }
}

impl std::fmt::Debug for GcContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcContext")
            .field("config", &self.config)
            .field("partitions", &self.partition_count())
            .field("tracked_records", &self.tracked_records())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_created_once() {
        let ctx = GcContext::new();
        let a = ctx.partition::<u32, 0>();
        let b = ctx.partition::<u32, 0>();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(ctx.partition_count(), 1);
    }

    #[test]
    fn test_partitions_split_by_type_and_size() {
        let ctx = GcContext::new();
        ctx.partition::<u32, 0>();
        ctx.partition::<u32, 3>();
        ctx.partition::<u32, 5>();
        ctx.partition::<u64, 0>();
        assert_eq!(ctx.partition_count(), 4);
    }

    #[test]
    fn test_empty_context() {
        let ctx = GcContext::new();
        assert_eq!(ctx.tracked_records(), 0);
        assert!(!ctx.collect());
        assert_eq!(unsafe { ctx.shutdown() }, 0);
        assert_eq!(ctx.dump(), "no partitions\n");
    }

    #[test]
    fn test_dump_lists_partitions() {
        let ctx = GcContext::new();
        ctx.partition::<u32, 0>();
        ctx.partition::<u8, 4>();
        let dump = ctx.dump();
        assert!(dump.contains("registry<u32, 0>"));
        assert!(dump.contains("registry<u8, 4>"));
    }

    #[test]
    fn test_debug_format() {
        let ctx = GcContext::new();
        let debug = format!("{ctx:?}");
        assert!(debug.contains("GcContext"));
        assert!(debug.contains("partitions"));
    }
}
