//! Source providers for annotation extraction

use crate::lexer::{Annotations, RequirementAnnotation, extract_from_content};
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options accepted by [`scan_directory`]
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Glob patterns, matched against paths relative to the scan root
    pub exclude: Vec<String>,
    /// Path prefixes (relative to the scan root) that hold test code
    pub test_dirs: Vec<String>,
    /// Honour `.gitignore`, `.ignore` and git exclude files
    pub respect_gitignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            test_dirs: Vec::new(),
            respect_gitignore: true,
        }
    }
}

/// Trait for providing source files to extract annotations from
pub trait Sources {
    /// Extract annotations from all sources
    fn extract(self) -> Result<Annotations>;
}

/// Whether `path` lies under any of the `test_dirs` prefixes.
///
/// Matching is per path component, so `tests` matches `tests/auth.rs` but not
/// `tests-data/auth.rs`.
pub fn is_test_path(path: &Path, test_dirs: &[String]) -> bool {
    let path = path.strip_prefix("./").unwrap_or(path);
    test_dirs.iter().any(|dir| {
        let dir = dir.trim_start_matches("./").trim_end_matches('/');
        !dir.is_empty() && path.starts_with(dir)
    })
}

/// Sources from an explicit list of file paths
pub struct PathSources {
    paths: Vec<PathBuf>,
    test_dirs: Vec<String>,
}

impl PathSources {
    /// Create from an iterator of paths
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            test_dirs: Vec::new(),
        }
    }

    /// Mark files under these prefixes as test code
    pub fn test_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.test_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }
}

impl Sources for PathSources {
    fn extract(self) -> Result<Annotations> {
        let files: Vec<(PathBuf, bool)> = self
            .paths
            .into_iter()
            .map(|path| {
                let is_test = is_test_path(&path, &self.test_dirs);
                (path, is_test)
            })
            .collect();

        let scanned = scan_files(&files, |path| {
            std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))
        });

        let mut annotations = Annotations::new();
        for result in scanned {
            annotations.extend(result?);
        }
        Ok(annotations)
    }
}

/// In-memory sources (useful for testing)
pub struct MemorySources(Vec<(PathBuf, String, bool)>);

impl MemorySources {
    /// Create empty memory sources
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a production file with content
    pub fn add(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.0.push((path.into(), content.into(), false));
        self
    }

    /// Add a test file with content
    pub fn add_test(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.0.push((path.into(), content.into(), true));
        self
    }
}

impl Default for MemorySources {
    fn default() -> Self {
        Self::new()
    }
}

impl Sources for MemorySources {
    fn extract(self) -> Result<Annotations> {
        let mut annotations = Annotations::new();
        for (path, content, is_test) in self.0 {
            extract_from_content(&path, &content, is_test, &mut annotations);
        }
        Ok(annotations)
    }
}

/// Read and scan every file, in parallel when the `parallel` feature is on.
///
/// Results come back in the order of `files`.
fn scan_files<F>(files: &[(PathBuf, bool)], read: F) -> Vec<Result<Annotations>>
where
    F: Fn(&Path) -> Result<String> + Sync,
{
    let scan_one = |(path, is_test): &(PathBuf, bool)| -> Result<Annotations> {
        let content = read(path)?;
        Ok(Annotations::extract_from_content(path, &content, *is_test))
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        files.par_iter().map(scan_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        files.iter().map(scan_one).collect()
    }
}

/// Gitignore-aware directory walker
#[cfg(feature = "walk")]
pub struct WalkSources {
    root: PathBuf,
    options: ScanOptions,
}

#[cfg(feature = "walk")]
impl WalkSources {
    /// Create a walker for the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            options: ScanOptions::default(),
        }
    }

    /// Use a complete set of scan options
    pub fn options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Add exclude patterns (e.g., `["target/**"]`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options
            .exclude
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add test directory prefixes (e.g., `["tests"]`)
    pub fn test_dirs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options
            .test_dirs
            .extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.options.respect_gitignore = respect;
        self
    }

    /// Files under the root that survive ignore rules and exclude patterns,
    /// paired with their test flag, in sorted order.
    fn collect_files(&self) -> Vec<(PathBuf, bool)> {
        use ignore::WalkBuilder;

        let exclude = build_globset(&self.options.exclude);
        let respect = self.options.respect_gitignore;

        let mut files: Vec<(PathBuf, bool)> = WalkBuilder::new(&self.root)
            .follow_links(true)
            .hidden(false) // Don't skip hidden files, only .git itself
            .filter_entry(|entry| entry.file_name() != ".git")
            .ignore(respect)
            .parents(respect)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect)
            .require_git(false)
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let path = entry.into_path();
                let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                if exclude.is_match(relative) {
                    return None;
                }
                let is_test = is_test_path(relative, &self.options.test_dirs);
                Some((path, is_test))
            })
            .collect();

        files.sort();
        files
    }
}

#[cfg(feature = "walk")]
impl Sources for WalkSources {
    fn extract(self) -> Result<Annotations> {
        if !self.root.exists() {
            debug!("scan root {} does not exist", self.root.display());
            return Ok(Annotations::new());
        }

        let files = self.collect_files();
        debug!(
            "scanning {} files under {}",
            files.len(),
            self.root.display()
        );

        let scanned = scan_files(&files, |path| {
            let bytes = std::fs::read(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            String::from_utf8(bytes)
                .wrap_err_with(|| format!("{} is not valid UTF-8", path.display()))
        });

        // A walk is best effort: unreadable or binary files are skipped
        let mut annotations = Annotations::new();
        for result in scanned {
            match result {
                Ok(file_annotations) => annotations.extend(file_annotations),
                Err(e) => debug!("{:#}", e),
            }
        }
        Ok(annotations)
    }
}

/// Compile exclude patterns; invalid patterns are logged and ignored.
#[cfg(feature = "walk")]
fn build_globset(patterns: &[String]) -> globset::GlobSet {
    use globset::{Glob, GlobSetBuilder};

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.replace('\\', "/");
        match Glob::new(&pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!("ignoring invalid exclude pattern '{}': {}", pattern, e),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!("failed to compile exclude patterns: {}", e);
        globset::GlobSet::empty()
    })
}

/// Recursively scan `root` for requirement annotations.
///
/// A root that does not exist yields no annotations.
#[cfg(feature = "walk")]
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Vec<RequirementAnnotation> {
    match Annotations::extract(WalkSources::new(root).options(options.clone())) {
        Ok(annotations) => annotations.into_vec(),
        Err(e) => {
            warn!("scan of {} failed: {:#}", root.display(), e);
            Vec::new()
        }
    }
}
