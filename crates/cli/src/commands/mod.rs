// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod connect;

use std::path::PathBuf;

use crate::config::{config_path, Config};
use crate::error::{Error, Result};

/// Load the configuration the CLI should use.
///
/// A path given with `--config` must exist; the implicit locations fall
/// back to defaults when no file is there.
pub(crate) fn load_config(explicit: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    let required = explicit.is_some();
    match config_path(explicit) {
        Some(path) if required && !path.exists() => {
            Err(Error::Config(format!("{} not found", path.display())))
        }
        Some(path) => {
            let config = Config::load_or_default(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((Config::default(), None)),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
