// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collector statistics for diagnostics.
//!
//! [`CollectorStats`] tracks cumulative counters for one partition: how many
//! records were registered, how often counts moved, and how much the sweep
//! reclaimed. [`GcContext::stats`](crate::GcContext::stats) merges them
//! across partitions.

/// Cumulative statistics about a partition's registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CollectorStats {
    /// Records inserted into the registry.
    pub records_inserted: u64,
    /// Count increments (construction over a tracked address, copies).
    pub retains: u64,
    /// Count decrements (drops, reassignments).
    pub releases: u64,
    /// Sweeps run, whether or not they freed anything.
    pub sweeps: u64,
    /// Records removed and released by sweeps.
    pub records_freed: u64,
    /// Teardowns that found a non-empty registry.
    pub teardowns: u64,
    /// Largest registry size observed.
    pub peak_records: usize,
}

impl CollectorStats {
    pub(crate) fn record_insert(&mut self, registry_len: usize) {
        self.records_inserted += 1;
        self.retains += 1;
        if registry_len > self.peak_records {
            self.peak_records = registry_len;
        }
    }

    pub(crate) fn record_retain(&mut self) {
        self.retains += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    pub(crate) fn record_sweep(&mut self, freed: usize) {
        self.sweeps += 1;
        self.records_freed += freed as u64;
    }

    pub(crate) fn record_teardown(&mut self) {
        self.teardowns += 1;
    }

    /// Records that were inserted but not yet freed.
    pub fn outstanding(&self) -> u64 {
        self.records_inserted.saturating_sub(self.records_freed)
    }

    /// Folds another partition's counters into this one.
    ///
    /// Peaks are per partition, so the merged peak is the sum of the peaks
    /// (an upper bound on the simultaneous total).
    pub fn merge(&mut self, other: &CollectorStats) {
        self.records_inserted += other.records_inserted;
        self.retains += other.retains;
        self.releases += other.releases;
        self.sweeps += other.sweeps;
        self.records_freed += other.records_freed;
        self.teardowns += other.teardowns;
        self.peak_records += other.peak_records;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Records: {} inserted, {} freed, {} outstanding (peak {}); \
             {} retains, {} releases, {} sweeps, {} teardowns",
            self.records_inserted,
            self.records_freed,
            self.outstanding(),
            self.peak_records,
            self.retains,
            self.releases,
            self.sweeps,
            self.teardowns,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = CollectorStats::default();
        assert_eq!(s.records_inserted, 0);
        assert_eq!(s.outstanding(), 0);
    }

    #[test]
    fn test_peak_tracking() {
        let mut s = CollectorStats::default();
        s.record_insert(1);
        s.record_insert(2);
        s.record_sweep(2);
        s.record_insert(1);
        assert_eq!(s.peak_records, 2); // Doesn't decrease.
        assert_eq!(s.outstanding(), 1);
    }

    #[test]
    fn test_insert_counts_as_retain() {
        let mut s = CollectorStats::default();
        s.record_insert(1);
        s.record_retain();
        s.record_release();
        assert_eq!(s.retains, 2);
        assert_eq!(s.releases, 1);
    }

    #[test]
    fn test_merge() {
        let mut a = CollectorStats::default();
        a.record_insert(1);
        a.record_sweep(1);
        let mut b = CollectorStats::default();
        b.record_insert(1);
        b.record_insert(2);
        b.record_teardown();

        a.merge(&b);
        assert_eq!(a.records_inserted, 3);
        assert_eq!(a.records_freed, 1);
        assert_eq!(a.teardowns, 1);
        assert_eq!(a.peak_records, 3);
    }

    #[test]
    fn test_summary() {
        let mut s = CollectorStats::default();
        s.record_insert(1);
        s.record_release();
        s.record_sweep(1);
        let summary = s.summary();
        assert!(summary.contains("1 inserted"));
        assert!(summary.contains("1 freed"));
        assert!(summary.contains("1 sweeps"));
    }

    #[test]
    fn test_serialize() {
        let mut s = CollectorStats::default();
        s.record_insert(1);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"records_inserted\":1"));
    }
}
