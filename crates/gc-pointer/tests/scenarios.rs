// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: handle lifecycles against the registry.
//!
//! Every test checks the central invariant, the recorded count of an
//! address equals the number of live handles pointing at it, together with
//! exactly-once release of the pointee.

use gc_pointer::{GcConfig, GcContext, GcPtr, SweepPolicy};
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;

// ── Helpers ────────────────────────────────────────────────────

/// Counts how many times values of a test run were dropped.
#[derive(Clone, Default)]
struct DropLog(Rc<Cell<usize>>);

impl DropLog {
    fn count(&self) -> usize {
        self.0.get()
    }
}

struct Tracked {
    value: i32,
    log: DropLog,
}

impl Tracked {
    fn new(value: i32, log: &DropLog) -> Self {
        Self {
            value,
            log: log.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.0.set(self.log.0.get() + 1);
    }
}

/// Zero-sized, so any number of partitions can alias its dangling address
/// without a double free.
struct Marker;

thread_local! {
    static MARKER_DROPS: Cell<usize> = const { Cell::new(0) };
}

impl Drop for Marker {
    fn drop(&mut self) {
        MARKER_DROPS.with(|d| d.set(d.get() + 1));
    }
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn scenario_a_copy_then_destroy() {
    let ctx = GcContext::new();
    let log = DropLog::default();
    let baseline = GcPtr::<Tracked>::registry_size(&ctx);

    let h1 = GcPtr::new(&ctx, Tracked::new(1, &log));
    let p = h1.as_ptr();
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p), Some(1));

    let h2 = h1.clone();
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p), Some(2));

    drop(h1);
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p), Some(1));
    assert_eq!(log.count(), 0);
    assert_eq!(h2.value, 1);

    drop(h2);
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p), None);
    assert_eq!(log.count(), 1);
    assert_eq!(GcPtr::<Tracked>::registry_size(&ctx), baseline);
}

#[test]
fn scenario_b_reassign_raw_address() {
    let ctx = GcContext::new();
    let log = DropLog::default();

    let mut h = GcPtr::new(&ctx, Tracked::new(1, &log));
    let p1 = h.as_ptr();
    let p2 = Box::into_raw(Box::new(Tracked::new(2, &log)));

    unsafe { h.assign_raw(p2) };
    assert_eq!(log.count(), 1);
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p1), None);
    assert_eq!(h.as_ptr(), p2);
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p2), Some(1));
    assert_eq!(h.value, 2);
}

#[test]
fn scenario_b_manual_policy_frees_on_next_sweep() {
    let config = GcConfig::default().with_sweep_policy(SweepPolicy::Manual);
    let ctx = GcContext::with_config(config);
    let log = DropLog::default();

    let mut h = GcPtr::new(&ctx, Tracked::new(1, &log));
    let p1 = h.as_ptr();
    h.set(Tracked::new(2, &log));

    assert_eq!(log.count(), 0);
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p1), Some(0));

    assert!(GcPtr::<Tracked>::collect(&ctx));
    assert_eq!(log.count(), 1);
    assert_eq!(GcPtr::<Tracked>::tracked_count(&ctx, p1), None);
    assert_eq!(h.ref_count(), 1);
}

#[test]
fn scenario_c_array_traversal() {
    let ctx = GcContext::new();
    let arr = GcPtr::<i32, 5>::from_array(&ctx, [10, 20, 30, 40, 50]);

    let mut it = arr.begin();
    let end = arr.end();
    let mut positions = Vec::new();
    while it != end {
        positions.push((it.position(), *it.get().unwrap()));
        it.advance().unwrap();
    }

    assert_eq!(
        positions,
        vec![(0, 10), (1, 20), (2, 30), (3, 40), (4, 50)]
    );
    assert!(it.advance().is_err());
    assert!(it.get().is_err());

    let collected: Vec<i32> = (&arr).into_iter().copied().collect();
    assert_eq!(collected, vec![10, 20, 30, 40, 50]);
}

#[test]
fn scenario_d_teardown_frees_outstanding() {
    let ctx = GcContext::new();
    let log = DropLog::default();

    let a = GcPtr::new(&ctx, Tracked::new(1, &log));
    let b = GcPtr::new(&ctx, Tracked::new(2, &log));
    assert_eq!(GcPtr::<Tracked>::registry_size(&ctx), 2);

    // SAFETY: nothing borrowed from `a` or `b` is used after teardown.
    assert_eq!(unsafe { ctx.shutdown() }, 2);
    assert_eq!(log.count(), 2);
    assert_eq!(GcPtr::<Tracked>::registry_size(&ctx), 0);

    // Handles outliving teardown are inert.
    assert!(a.is_detached());
    assert!(b.get().is_none());
    drop(a);
    drop(b);
    assert_eq!(log.count(), 2);

    // Teardown is idempotent.
    assert_eq!(unsafe { ctx.shutdown() }, 0);
}

#[test]
fn context_drop_keeps_referenced_pointees_alive() {
    let log = DropLog::default();
    let survivor;
    {
        let ctx = GcContext::new();
        survivor = GcPtr::new(&ctx, Tracked::new(1, &log));
        let _gone = GcPtr::new(&ctx, Tracked::new(2, &log));
    }
    assert_eq!(log.count(), 1);

    // A borrow taken before the context went away stays valid.
    let borrowed: &Tracked = &survivor;
    assert!(!survivor.is_detached());
    assert_eq!(borrowed.value, 1);
    assert_eq!(survivor.ref_count(), 1);

    let copy = survivor.clone();
    drop(survivor);
    assert_eq!(log.count(), 1);
    drop(copy);
    assert_eq!(log.count(), 2);
}

#[test]
fn context_drop_sweeps_zero_counts_when_configured() {
    let log = DropLog::default();
    let manual = GcConfig::default().with_sweep_policy(SweepPolicy::Manual);

    let survivor;
    {
        let ctx = GcContext::with_config(manual.clone());
        survivor = GcPtr::new(&ctx, Tracked::new(1, &log));
        drop(GcPtr::new(&ctx, Tracked::new(2, &log)));
        assert_eq!(log.count(), 0);
    }
    assert_eq!(log.count(), 1);
    drop(survivor);
    assert_eq!(log.count(), 2);

    let no_collect = GcConfig {
        collect_on_drop: false,
        ..manual
    };
    let survivor;
    {
        let ctx = GcContext::with_config(no_collect);
        survivor = GcPtr::new(&ctx, Tracked::new(3, &log));
        drop(GcPtr::new(&ctx, Tracked::new(4, &log)));
    }
    // The zero-count record waits for the partition's last handle.
    assert_eq!(log.count(), 2);
    drop(survivor);
    assert_eq!(log.count(), 4);
}

// ── Partitions ─────────────────────────────────────────────────

#[test]
fn partitions_by_array_size_never_share_records() {
    let ctx = GcContext::new();
    let log = DropLog::default();

    let three = GcPtr::<Tracked, 3>::from_array(
        &ctx,
        [Tracked::new(1, &log), Tracked::new(2, &log), Tracked::new(3, &log)],
    );
    let five = GcPtr::<Tracked, 5>::from_array(
        &ctx,
        std::array::from_fn(|i| Tracked::new(i as i32, &log)),
    );
    let five_again = five.clone();

    assert_eq!(ctx.partition_count(), 2);
    assert_eq!(GcPtr::<Tracked, 3>::registry_size(&ctx), 1);
    assert_eq!(GcPtr::<Tracked, 5>::registry_size(&ctx), 1);
    assert_eq!(GcPtr::<Tracked>::registry_size(&ctx), 0);
    assert_eq!(three.ref_count(), 1);
    assert_eq!(five.ref_count(), 2);
    assert_eq!(GcPtr::<Tracked, 3>::tracked_count(&ctx, five.as_ptr()), None);

    drop(three);
    assert_eq!(log.count(), 3);
    assert_eq!(five_again.ref_count(), 2);

    drop(five);
    assert_eq!(log.count(), 3);
    drop(five_again);
    assert_eq!(log.count(), 8);
}

/// One address tracked through two array sizes gets two independent counts,
/// and each partition releases it on its own. Only zero-sized pointees make
/// that observable without a double free, so this pins the hazard down
/// through `from_raw`.
#[test]
fn shared_address_is_counted_per_array_size() {
    let ctx = GcContext::new();
    let shared = NonNull::<Marker>::dangling().as_ptr();

    let three = unsafe { GcPtr::<Marker, 3>::from_raw(&ctx, shared) };
    let five = unsafe { GcPtr::<Marker, 5>::from_raw(&ctx, shared) };
    let five_again = five.clone();

    assert_eq!(three.as_ptr(), five.as_ptr());
    assert_eq!(three.ref_count(), 1);
    assert_eq!(five.ref_count(), 2);

    MARKER_DROPS.with(|d| d.set(0));
    drop(three);
    assert_eq!(MARKER_DROPS.with(Cell::get), 3);
    drop(five);
    drop(five_again);
    assert_eq!(MARKER_DROPS.with(Cell::get), 8);
}

#[test]
fn partitions_by_type_are_independent() {
    let ctx = GcContext::new();
    let a = GcPtr::new(&ctx, 1u32);
    let b = GcPtr::new(&ctx, String::from("b"));
    let _c = b.clone();

    assert_eq!(GcPtr::<u32>::registry_size(&ctx), 1);
    assert_eq!(GcPtr::<String>::registry_size(&ctx), 1);
    assert_eq!(a.ref_count(), 1);
    assert_eq!(b.ref_count(), 2);
    assert_eq!(ctx.tracked_records(), 2);
}

// ── Invariant under churn ──────────────────────────────────────

#[test]
fn counts_match_live_handles_under_churn() {
    let ctx = GcContext::new();
    let log = DropLog::default();
    let mut handles: Vec<GcPtr<Tracked>> = (0..8)
        .map(|i| GcPtr::new(&ctx, Tracked::new(i, &log)))
        .collect();

    for round in 0..50usize {
        let i = round % handles.len();
        let j = (round * 7 + 3) % handles.len();
        match round % 4 {
            0 => handles.push(handles[i].clone()),
            1 => {
                let source = handles[j].clone();
                handles[i].assign(&source);
            }
            2 => handles[i].set(Tracked::new(round as i32, &log)),
            _ => {
                if handles.len() > 4 {
                    handles.swap_remove(i);
                }
            }
        }

        for h in &handles {
            let live = handles.iter().filter(|o| *o == h).count();
            assert_eq!(h.ref_count(), live, "round {round}");
        }
        let distinct = {
            let mut addrs: Vec<_> = handles.iter().map(|h| h.as_ptr()).collect();
            addrs.sort();
            addrs.dedup();
            addrs.len()
        };
        assert_eq!(GcPtr::<Tracked>::registry_size(&ctx), distinct);
    }

    let inserted = GcPtr::<Tracked>::stats(&ctx).records_inserted as usize;
    handles.clear();
    assert_eq!(GcPtr::<Tracked>::registry_size(&ctx), 0);
    assert_eq!(log.count(), inserted);
}

// ── Cycles ─────────────────────────────────────────────────────

struct Node {
    next: RefCell<Option<GcPtr<Node>>>,
    log: DropLog,
}

impl Drop for Node {
    fn drop(&mut self) {
        self.log.0.set(self.log.0.get() + 1);
    }
}

#[test]
fn cycles_survive_until_teardown() {
    let ctx = GcContext::new();
    let log = DropLog::default();

    let a = GcPtr::new(
        &ctx,
        Node {
            next: RefCell::new(None),
            log: log.clone(),
        },
    );
    let b = GcPtr::new(
        &ctx,
        Node {
            next: RefCell::new(Some(a.clone())),
            log: log.clone(),
        },
    );
    *a.next.borrow_mut() = Some(b.clone());

    drop(a);
    drop(b);
    assert_eq!(log.count(), 0);
    assert_eq!(GcPtr::<Node>::registry_size(&ctx), 2);
    assert!(!GcPtr::<Node>::collect(&ctx));

    // SAFETY: no borrow of either node is alive.
    assert_eq!(unsafe { GcPtr::<Node>::shutdown(&ctx) }, 2);
    assert_eq!(log.count(), 2);
    assert_eq!(GcPtr::<Node>::registry_size(&ctx), 0);
}

// ── Diagnostics ────────────────────────────────────────────────

#[test]
fn dump_and_stats_reflect_registry() {
    let ctx = GcContext::new();
    let a = GcPtr::new(&ctx, 1u8);
    let _b = a.clone();
    let _arr = GcPtr::<u8, 3>::from_array(&ctx, [1, 2, 3]);

    let dump = GcPtr::<u8>::dump(&ctx);
    assert!(dump.contains("registry<u8, 0>: 1 record(s)"));
    assert!(dump.contains("refs=2"));

    let all = ctx.dump();
    assert!(all.contains("registry<u8, 3>"));
    assert!(all.contains("array[3]"));

    let stats = ctx.stats();
    assert_eq!(stats.records_inserted, 2);
    assert_eq!(stats.retains, 3);

    let per_partition = ctx.partition_stats();
    assert_eq!(per_partition.len(), 2);
    assert_eq!(per_partition[0].0, "u8, 0");
}
