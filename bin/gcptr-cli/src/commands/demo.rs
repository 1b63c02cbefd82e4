// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gcptr demo` command: walk through the reference scenarios.
//!
//! ```text
//! A: copy then destroy     h1 ──clone──► h2, drop both, record disappears
//! B: reassign              h = new value, old pointee freed
//! C: array traversal       begin..end over GcPtr<i32, 5>
//! D: teardown              shutdown frees what live handles still hold
//! ```

use gc_pointer::{GcConfig, GcContext, GcPtr, SweepPolicy};
use std::fmt::Debug;

/// Pointee that announces when it is freed.
#[derive(Debug)]
struct Sample {
    name: &'static str,
}

impl Drop for Sample {
    fn drop(&mut self) {
        println!("        freed sample '{}'", self.name);
    }
}

pub fn execute(config: GcConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             gcptr · Handle Scenarios                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!(
        "  Policy: {} sweep, collect on drop: {}",
        config.sweep_policy, config.collect_on_drop
    );
    println!();

    let ctx = GcContext::with_config(config);

    scenario_copy_then_destroy(&ctx);
    scenario_reassign(&ctx);
    scenario_array_traversal(&ctx);
    scenario_teardown(&ctx);

    // ── Totals ─────────────────────────────────────────────────
    println!("  Totals");
    println!("   {}", ctx.stats().summary());
    for (label, stats) in ctx.partition_stats() {
        println!("   [{label}] {}", stats.summary());
    }

    Ok(())
}

fn scenario_copy_then_destroy(ctx: &GcContext) {
    println!("  [A] Copy then destroy");

    let h1 = GcPtr::new(ctx, Sample { name: "a" });
    println!("      h1 = new           refs={}", h1.ref_count());
    let h2 = h1.clone();
    println!("      h2 = h1.clone()    refs={}", h2.ref_count());
    print_dump(&values::<Sample, 0>(ctx));

    drop(h1);
    println!("      drop(h1)           refs={}", h2.ref_count());
    drop(h2);
    println!("      drop(h2)");
    print_dump(&values::<Sample, 0>(ctx));
    println!();
}

fn scenario_reassign(ctx: &GcContext) {
    println!("  [B] Reassign to a new allocation");

    let mut h = GcPtr::new(ctx, Sample { name: "b-old" });
    println!("      h = new            addr={:p}", h);
    h.set(Sample { name: "b-new" });
    println!("      h.set(..)          addr={:p}", h);
    print_dump(&values::<Sample, 0>(ctx));

    if ctx.config().sweep_policy == SweepPolicy::Manual {
        println!("      manual policy, sweeping now");
        GcPtr::<Sample>::collect(ctx);
        print_dump(&values::<Sample, 0>(ctx));
    }
    drop(h);
    println!();
}

fn scenario_array_traversal(ctx: &GcContext) {
    println!("  [C] Array traversal");

    let arr = GcPtr::<i32, 5>::from_array(ctx, [10, 20, 30, 40, 50]);
    let mut it = arr.begin();
    let end = arr.end();
    while it != end {
        if let Ok(value) = it.get() {
            println!("      [{}] = {value}", it.position());
        }
        if it.advance().is_err() {
            break;
        }
    }
    if let Err(e) = it.get() {
        println!("      read at end: {e}");
    }
    print_dump(&values::<i32, 5>(ctx));
    println!();
}

fn scenario_teardown(ctx: &GcContext) {
    println!("  [D] Teardown with live handles");

    let a = GcPtr::new(ctx, Sample { name: "d1" });
    let b = GcPtr::new(ctx, Sample { name: "d2" });
    print_dump(&values::<Sample, 0>(ctx));

    // SAFETY: no reference borrowed from `a` or `b` is used afterwards.
    let freed = unsafe { ctx.shutdown() };
    println!("      shutdown freed {freed} record(s)");
    println!(
        "      a detached: {}, b detached: {}",
        a.is_detached(),
        b.is_detached()
    );
    drop(a);
    drop(b);
    print_dump(&ctx.dump());
    println!();
}

/// Registry listing with pointee values.
fn values<T: Debug + 'static, const N: usize>(ctx: &GcContext) -> String {
    // SAFETY: the demo never holds a `&mut` from `get_mut` or
    // `as_mut_slice`.
    unsafe { GcPtr::<T, N>::dump_values(ctx) }
}

fn print_dump(dump: &str) {
    for line in dump.lines() {
        println!("      | {line}");
    }
}
