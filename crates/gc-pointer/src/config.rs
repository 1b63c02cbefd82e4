// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collector configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! sweep_policy = "eager"
//! collect_on_drop = true
//! trace_sweeps = false
//! ```

use crate::GcError;
use std::fmt;
use std::path::Path;

/// When zero-count records are reclaimed.
///
/// The policy applies uniformly to every path that decrements a count:
/// dropping a handle, assigning a raw address and assigning another handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepPolicy {
    /// Sweep the partition after every decrement.
    #[default]
    Eager,
    /// Sweep only on explicit `collect()` or teardown.
    Manual,
}

impl SweepPolicy {
    /// Parses a policy name (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, GcError> {
        match s.trim().to_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "manual" | "deferred" => Ok(Self::Manual),
            other => Err(GcError::Config(format!(
                "unknown sweep policy '{other}'; expected 'eager' or 'manual'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SweepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a [`GcContext`](crate::GcContext).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GcConfig {
    /// Sweep policy shared by every partition of the context.
    #[serde(default)]
    pub sweep_policy: SweepPolicy,
    /// Whether dropping the context sweeps zero-count records. Records
    /// still referenced by live handles are freed when the last of those
    /// handles goes away.
    #[serde(default = "default_true")]
    pub collect_on_drop: bool,
    /// Whether each freed record is logged at debug level.
    #[serde(default)]
    pub trace_sweeps: bool,
}

fn default_true() -> bool {
    true
}

impl GcConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, GcError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GcError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, GcError> {
        toml::from_str(toml_str).map_err(|e| GcError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, GcError> {
        toml::to_string_pretty(self)
            .map_err(|e| GcError::Config(format!("TOML serialise error: {e}")))
    }

    /// Returns a copy using the given sweep policy.
    pub fn with_sweep_policy(mut self, policy: SweepPolicy) -> Self {
        self.sweep_policy = policy;
        self
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            sweep_policy: SweepPolicy::Eager,
            collect_on_drop: true,
            trace_sweeps: false,
        }
    }
}
