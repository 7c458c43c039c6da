//! CLI command implementations.

pub mod check;
pub mod history;
pub mod inspect;
pub mod run;

use std::path::{Path, PathBuf};

use quarry::PipelineConfig;

/// Load the configuration file if one was given, else the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> quarry::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Manifest location: explicit flag first, then configuration.
pub(crate) fn manifest_path(
    manifest: Option<PathBuf>,
    config: Option<&Path>,
) -> quarry::Result<PathBuf> {
    match manifest {
        Some(path) => Ok(path),
        None => Ok(load_config(config)?.storage.manifest_path()),
    }
}

/// Shorten text for one-line display.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
