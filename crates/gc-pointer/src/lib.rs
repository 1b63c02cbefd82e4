// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # gc-pointer
//!
//! Reference-counted smart pointers whose counts live in explicit,
//! per-partition registries instead of next to the value.
//!
//! # Key Components
//!
//! - [`GcPtr`]: the handle. Copying, reassigning and dropping handles
//!   keeps the count of every tracked allocation equal to the number of
//!   live handles pointing at it, and frees the allocation when it reaches
//!   zero.
//! - [`GcContext`]: owns one registry per (pointee type, array size)
//!   partition and tears all of them down deterministically.
//! - [`Registry`] / [`AllocationRecord`]: the bookkeeping: one record
//!   (address, count, array flag, length) per tracked allocation.
//! - [`GcIter`]: bounds-checked cursor over array allocations.
//! - [`GcConfig`]: sweep policy and teardown behaviour, loadable from TOML.
//! - [`CollectorStats`]: cumulative registry metrics.
//!
//! # Ownership Model
//!
//! ```text
//! GcContext ──owns──► Partition<T, N> ◄──Rc── GcPtr<T, N>
//!                         │
//!                         ├── Registry<T>: [AllocationRecord { addr, refs, .. }]
//!                         └── epoch (bumped by teardown)
//!
//! GcPtr::drop ──► record.refs -= 1 ──► sweep: remove zero-count records,
//!                                       then free them
//! ```
//!
//! Partitions are keyed by both `T` and `N`: a `GcPtr<i32, 3>` and a
//! `GcPtr<i32, 5>` never share a record, even for the same address. Track
//! each allocation through one partition only.
//!
//! Counting is not cycle-aware: handles that reach each other through their
//! pointees keep their counts above zero until teardown.
//!
//! # Teardown
//!
//! Dropping a [`GcContext`] only sweeps zero-count records. Values still
//! referenced by live handles are freed when the last of those handles
//! goes. Forcing them out early, cycles included, takes the `unsafe`
//! [`GcContext::shutdown`], since references borrowed from a handle carry
//! no epoch check of their own.
//!
//! Allocating constructors reject zero-sized `T` at compile time.
//!
//! # Example
//! ```
//! use gc_pointer::{GcContext, GcPtr};
//!
//! let ctx = GcContext::new();
//!
//! let h1 = GcPtr::new(&ctx, 42);
//! let h2 = h1.clone();
//! assert_eq!(h1.ref_count(), 2);
//!
//! drop(h1);
//! assert_eq!(h2.ref_count(), 1);
//!
//! let arr = GcPtr::<u8, 5>::from_array(&ctx, [1, 2, 3, 4, 5]);
//! assert_eq!(arr.iter().count(), 5);
//!
//! // SAFETY: no reference borrowed from `h2` or `arr` is used afterwards.
//! let freed = unsafe { ctx.shutdown() };
//! assert_eq!(freed, 2);
//! assert!(h2.is_detached());
//! ```

mod config;
mod context;
mod error;
mod iter;
mod partition;
mod pointer;
mod record;
mod registry;
mod stats;

pub use config::{GcConfig, SweepPolicy};
pub use context::GcContext;
pub use error::GcError;
pub use iter::GcIter;
pub use pointer::GcPtr;
pub use record::AllocationRecord;
pub use registry::Registry;
pub use stats::CollectorStats;
