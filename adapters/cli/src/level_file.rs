use std::{fs, path::Path};

use anyhow::{Context, Result};
use match3_core::LevelConfig;

/// Reads and validates a level description stored as TOML.
pub(crate) fn load(path: &Path) -> Result<LevelConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read level file {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid level file {}", path.display()))
}

fn parse(text: &str) -> Result<LevelConfig> {
    let config: LevelConfig = toml::from_str(text).context("could not parse level TOML")?;
    config.validate()?;
    Ok(config)
}
