//! Configuration schema for reqtrace
//!
//! Config lives at `.config/reqtrace/config.yaml` relative to the project root.
//! Every field is optional:
//!
//! ```yaml
//! specs: specs
//! tasks: specs
//! sources: .
//! exclude:
//!   - target/**
//! test_dirs:
//!   - tests
//! respect_gitignore: true
//! ```

use reqtrace_core::ScanOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file location relative to the project root
pub const CONFIG_PATH: &str = ".config/reqtrace/config.yaml";

/// Root configuration for reqtrace
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding one `<scope>/spec.md` per feature
    pub specs: PathBuf,

    /// Directory holding `<scope>/tasks.md` task lists, defaults to `specs`
    pub tasks: Option<PathBuf>,

    /// Root of the source tree scanned for annotations
    pub sources: PathBuf,

    /// Glob patterns (relative to `sources`) to skip
    pub exclude: Vec<String>,

    /// Path prefixes whose files count as tests
    pub test_dirs: Vec<String>,

    /// Honour .gitignore and friends while walking
    pub respect_gitignore: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            specs: PathBuf::from("specs"),
            tasks: None,
            sources: PathBuf::from("."),
            exclude: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                ".git/**".to_string(),
            ],
            test_dirs: vec!["tests".to_string()],
            respect_gitignore: true,
        }
    }
}

impl Config {
    pub fn specs_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.specs)
    }

    pub fn tasks_dir(&self, root: &Path) -> PathBuf {
        root.join(self.tasks.as_ref().unwrap_or(&self.specs))
    }

    pub fn sources_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.sources)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude: self.exclude.clone(),
            test_dirs: self.test_dirs.clone(),
            respect_gitignore: self.respect_gitignore,
        }
    }
}
