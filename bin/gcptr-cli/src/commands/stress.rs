// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gcptr stress` command: deterministic handle churn.
//!
//! Two partitions (`GcPtr<u64>` and `GcPtr<u32, 4>`) are churned with
//! construct, copy, reassign and drop operations picked by a seeded
//! generator. After every round the recorded count of each live handle is
//! compared against the number of handles sharing its address.

use anyhow::bail;
use gc_pointer::{CollectorStats, GcConfig, GcContext, GcPtr, SweepPolicy};
use serde::Serialize;
use std::time::Instant;

const SEED: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Serialize)]
struct StressReport {
    objects: usize,
    rounds: usize,
    sweep_policy: String,
    checks: u64,
    elapsed_ms: f64,
    total: CollectorStats,
    partitions: Vec<PartitionReport>,
}

#[derive(Debug, Serialize)]
struct PartitionReport {
    label: String,
    stats: CollectorStats,
}

/// xorshift64, enough to make runs reproducible.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

pub fn execute(config: GcConfig, objects: usize, rounds: usize, json: bool) -> anyhow::Result<()> {
    if objects == 0 {
        bail!("--objects must be at least 1");
    }

    let policy = config.sweep_policy;
    let ctx = GcContext::with_config(config);
    let mut rng = Rng(SEED);
    let start = Instant::now();

    let mut scalars: Vec<GcPtr<u64>> = (0..objects as u64).map(|i| GcPtr::new(&ctx, i)).collect();
    let mut arrays: Vec<GcPtr<u32, 4>> = (0..objects as u32)
        .map(|i| GcPtr::from_array(&ctx, [i; 4]))
        .collect();

    let mut checks = 0u64;
    for round in 0..rounds {
        churn(&ctx, &mut scalars, &mut rng, objects, round as u64);
        churn_arrays(&ctx, &mut arrays, &mut rng, objects, round as u32);

        if policy == SweepPolicy::Manual {
            ctx.collect();
        }

        checks += verify(&scalars, GcPtr::<u64>::registry_size(&ctx), "u64", round)?;
        checks += verify(&arrays, GcPtr::<u32, 4>::registry_size(&ctx), "[u32; 4]", round)?;
        tracing::trace!(round, records = ctx.tracked_records(), "round verified");
    }

    scalars.clear();
    arrays.clear();
    ctx.collect();
    if ctx.tracked_records() != 0 {
        bail!(
            "{} record(s) still tracked after every handle was dropped",
            ctx.tracked_records()
        );
    }

    let report = StressReport {
        objects,
        rounds,
        sweep_policy: policy.to_string(),
        checks,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        total: ctx.stats(),
        partitions: ctx
            .partition_stats()
            .into_iter()
            .map(|(label, stats)| PartitionReport { label, stats })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn churn(
    ctx: &GcContext,
    handles: &mut Vec<GcPtr<u64>>,
    rng: &mut Rng,
    objects: usize,
    round: u64,
) {
    match rng.below(4) {
        0 => handles.push(GcPtr::new(ctx, round)),
        1 if !handles.is_empty() => {
            let i = rng.below(handles.len());
            handles.push(handles[i].clone());
        }
        2 if !handles.is_empty() => {
            let i = rng.below(handles.len());
            let j = rng.below(handles.len());
            let source = handles[j].clone();
            handles[i].assign(&source);
        }
        _ if handles.len() > objects / 2 => {
            let i = rng.below(handles.len());
            handles.swap_remove(i);
        }
        _ => handles.push(GcPtr::new(ctx, round)),
    }
}

fn churn_arrays(
    ctx: &GcContext,
    handles: &mut Vec<GcPtr<u32, 4>>,
    rng: &mut Rng,
    objects: usize,
    round: u32,
) {
    match rng.below(4) {
        0 if !handles.is_empty() => {
            let i = rng.below(handles.len());
            handles[i].set_array([round; 4]);
        }
        1 if !handles.is_empty() => {
            let i = rng.below(handles.len());
            handles.push(handles[i].clone());
        }
        2 if handles.len() > objects / 2 => {
            let i = rng.below(handles.len());
            handles.swap_remove(i);
        }
        _ => handles.push(GcPtr::from_array(ctx, [round; 4])),
    }
}

/// Checks every handle's count and the registry size. Returns the number
/// of comparisons made.
fn verify<T: 'static, const N: usize>(
    handles: &[GcPtr<T, N>],
    registry_size: usize,
    label: &str,
    round: usize,
) -> anyhow::Result<u64> {
    let mut addresses: Vec<*mut T> = handles.iter().map(GcPtr::as_ptr).collect();
    addresses.sort();

    let mut checks = 0u64;
    for handle in handles {
        let address = handle.as_ptr();
        let live = addresses.iter().filter(|a| **a == address).count();
        if handle.ref_count() != live {
            bail!(
                "round {round}: {label} at {address:p} records {} reference(s), {live} live",
                handle.ref_count()
            );
        }
        checks += 1;
    }

    addresses.dedup();
    if registry_size != addresses.len() {
        bail!(
            "round {round}: {label} registry holds {registry_size} record(s) for {} live address(es)",
            addresses.len()
        );
    }
    Ok(checks + 1)
}

fn print_report(report: &StressReport) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              gcptr · Stress Results                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!("  Run");
    println!("   Objects:      {}", report.objects);
    println!("   Rounds:       {}", report.rounds);
    println!("   Sweep policy: {}", report.sweep_policy);
    println!("   Checks:       {} (all passed)", report.checks);
    println!("   Elapsed:      {:.2} ms", report.elapsed_ms);
    println!();

    println!("  Partitions");
    for partition in &report.partitions {
        println!("   {:<16} {}", partition.label, partition.stats.summary());
    }
    println!();
    println!("  {}", report.total.summary());
}
