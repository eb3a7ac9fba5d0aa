//! reqtrace library - Measure requirements coverage across a project
//!
//! This library exposes the pieces the `reqtrace` binary is built from
//! for testing and embedding purposes.

pub mod config;
pub mod output;
pub mod tasks;

use config::Config;
use eyre::{Result, WrapErr};
use reqtrace_core::{CoverageReport, SpecParser, scan_directory};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Markers that identify a project root, checked in order at each level
const ROOT_MARKERS: &[&str] = &[".config/reqtrace", ".git", "Cargo.toml"];

/// Walk up from `start` to the nearest directory holding a root marker,
/// falling back to `start` itself.
pub fn find_project_root_from(start: &Path) -> PathBuf {
    let mut current = start.to_path_buf();

    loop {
        if ROOT_MARKERS.iter().any(|marker| current.join(marker).exists()) {
            return current;
        }

        if !current.pop() {
            return start.to_path_buf();
        }
    }
}

pub fn find_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().wrap_err("Failed to get current directory")?;
    Ok(find_project_root_from(&cwd))
}

/// Load the config at `path`. A missing file yields the defaults; a file that
/// exists but cannot be read or parsed is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Parse specs and task lists, scan sources and compute the report for the
/// project at `root`.
pub fn build_report(root: &Path, config: &Config) -> CoverageReport {
    let specs_dir = config.specs_dir(root);
    let definitions = SpecParser::parse_directory(&specs_dir);
    info!(
        "found {} requirement definitions under {}",
        definitions.len(),
        specs_dir.display()
    );

    let sources_dir = config.sources_dir(root);
    let annotations = scan_directory(&sources_dir, &config.scan_options());
    info!(
        "found {} annotations under {}",
        annotations.len(),
        sources_dir.display()
    );

    let tasks_dir = config.tasks_dir(root);
    let tasks = tasks::parse_directory(&tasks_dir);
    info!("found {} tasks under {}", tasks.len(), tasks_dir.display());

    CoverageReport::compute(&definitions, &annotations, &tasks)
}
