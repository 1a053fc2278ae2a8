//! Helpers shared by several commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use aula_config::{ReverbConfig, default_config_path};

/// Load `path`, or the user configuration if it exists, or the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ReverbConfig> {
    if let Some(path) = path {
        return ReverbConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }

    let user = default_config_path();
    if user.is_file() {
        tracing::debug!(path = %user.display(), "using user configuration");
        return ReverbConfig::load(&user)
            .with_context(|| format!("loading config {}", user.display()));
    }
    Ok(ReverbConfig::default())
}

/// The impulse given on the command line, else the configured one.
pub fn impulse_path(arg: Option<PathBuf>, config: &ReverbConfig) -> Option<PathBuf> {
    arg.or_else(|| config.impulse.path.clone())
}
