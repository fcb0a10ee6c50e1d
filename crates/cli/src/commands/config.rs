// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use super::load_config;
use crate::error::Result;

pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    let (config, source) = load_config(config_path)?;
    match source {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not found, using defaults)", path.display()),
        None => println!("# defaults"),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
