// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tracked pointers.

/// Errors that can occur while tracking, dereferencing or traversing
/// reference-counted allocations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GcError {
    /// A count update referenced an address with no record in its partition.
    #[error("registry integrity error: address {address:#x} is not tracked by this partition")]
    UntrackedAddress { address: usize },

    /// Attempted to read through a null handle.
    #[error("dereference of a null GcPtr")]
    NullDereference,

    /// The handle was bound before its partition was torn down.
    #[error("GcPtr is detached: its partition was torn down")]
    Detached,

    /// An array iterator was read or advanced outside `[begin, end)`.
    #[error("iterator out of range: position {position} in an array of length {len}")]
    IteratorOutOfRange { position: usize, len: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
