// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gcptr config` command: print the effective configuration.

use gc_pointer::GcConfig;

pub fn execute(config: &GcConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
