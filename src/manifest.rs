//! Manifest loading: YAML build inputs as values.
//!
//! Build programs frequently close over structured input data (package
//! lists, target descriptions, per-flavor settings). This module loads a
//! YAML document into a [`Value`] so the data can enter a program through
//! a `Con` node or a `With` binding.

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::debug;

use crate::value::Value;

/// Loads a YAML manifest file into a [`Value`].
pub fn load_manifest(path: &Utf8Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("failed to open manifest: {}", path))?;
    let reader = BufReader::new(file);
    let value: Value = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse manifest: {}", path))?;
    debug!("loaded manifest from {}", path);
    Ok(value)
}

/// Parses a YAML document into a [`Value`].
pub fn manifest_from_str(source: &str) -> Result<Value> {
    serde_yaml::from_str(source).context("failed to parse manifest")
}
