//! Requirement definitions extracted from `spec.md` documents
//!
//! A requirement is declared as a markdown bullet:
//!
//! ```markdown
//! - **FR:auth.session**: Sessions MUST expire after 90 minutes
//!   - **FR:auth.session.expiry**: [deferred] Configurable expiry
//! - ~~**FR:auth.legacy**: [deprecated: FR:auth.session] Cookie sessions~~
//! ```
//!
//! The scope of every definition is the name of the directory holding the
//! `spec.md` file. Nesting is cosmetic; hierarchy is derived from path
//! prefixes during coverage analysis.

use crate::req_id::{self, RequirementId, build_qualified, is_valid_segment};
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name looked up in every scope directory.
pub const SPEC_FILE_NAME: &str = "spec.md";

/// Lifecycle state of a requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Active,
    Deferred,
    Deprecated,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::Deferred => "deferred",
            LifecycleState::Deprecated => "deprecated",
        }
    }
}

/// A requirement declared in a spec document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDefinition {
    pub id: RequirementId,
    pub state: LifecycleState,
    /// Replacement requirement, only set when `state` is deprecated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_target: Option<String>,
    pub text: String,
    pub spec_file: PathBuf,
    /// Line number (1-indexed)
    pub spec_line: usize,
}

impl RequirementDefinition {
    /// `file:line` location used in diagnostics
    pub fn location(&self) -> String {
        format!("{}:{}", self.spec_file.display(), self.spec_line)
    }
}

/// Parser for requirement bullets in spec documents.
pub struct SpecParser;

impl SpecParser {
    /// Parse requirement definitions out of markdown content.
    ///
    /// Lines that are not requirement bullets are ignored.
    pub fn parse_content(content: &str, scope: &str, file: &Path) -> Vec<RequirementDefinition> {
        content
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let bullet = parse_bullet(line)?;
                let id = req_id::parse_short_form(bullet.id)?;
                let (state, deprecated_target, text) = split_state_marker(bullet.text);
                Some(RequirementDefinition {
                    id: build_qualified(id, scope),
                    state,
                    deprecated_target,
                    text: text.to_string(),
                    spec_file: file.to_path_buf(),
                    spec_line: idx + 1,
                })
            })
            .collect()
    }

    /// Read and parse a single spec file.
    pub fn parse_file(path: &Path, scope: &str) -> Result<Vec<RequirementDefinition>> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read spec file {}", path.display()))?;
        Ok(Self::parse_content(&content, scope, path))
    }

    /// Parse `<root>/<scope>/spec.md` for every immediate child directory of
    /// `root`. A missing root yields no definitions.
    pub fn parse_directory(root: &Path) -> Vec<RequirementDefinition> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("spec root {} not readable: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut scope_dirs: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        scope_dirs.sort();

        let mut definitions = Vec::new();
        for dir in scope_dirs {
            let spec_path = dir.join(SPEC_FILE_NAME);
            if !spec_path.is_file() {
                continue;
            }

            let Some(scope) = dir.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !is_valid_segment(scope) {
                warn!(
                    "skipping {}: directory name '{}' is not a valid requirement scope",
                    spec_path.display(),
                    scope
                );
                continue;
            }

            match Self::parse_file(&spec_path, scope) {
                Ok(parsed) => {
                    debug!(
                        "parsed {} requirements from {}",
                        parsed.len(),
                        spec_path.display()
                    );
                    definitions.extend(parsed);
                }
                Err(e) => warn!("{:#}", e),
            }
        }
        definitions
    }
}

struct Bullet<'a> {
    id: &'a str,
    text: &'a str,
}

/// Match `- **TYPE:path**: text`, tolerating `~~` strike-through around the
/// bullet body or around the bold identifier.
fn parse_bullet(line: &str) -> Option<Bullet<'_>> {
    let body = line.trim_start().strip_prefix("- ")?.trim();
    let (body, struck) = match body.strip_prefix("~~") {
        Some(rest) => (rest, true),
        None => (body, false),
    };

    let rest = body.strip_prefix("**")?;
    let close = rest.find("**")?;
    let id = &rest[..close];
    let mut after = &rest[close + 2..];

    // `~~**FR:x**~~: text` closes the strike-through right after the id
    if struck {
        after = after.strip_prefix("~~").unwrap_or(after);
    }

    let text = after.strip_prefix(':')?;
    if !text.is_empty() && !text.starts_with(char::is_whitespace) {
        return None;
    }
    let mut text = text.trim();
    if struck {
        text = text.strip_suffix("~~").unwrap_or(text).trim_end();
    }

    Some(Bullet { id, text })
}

/// Split a leading `[deferred]` / `[deprecated: id]` marker off the text.
fn split_state_marker(text: &str) -> (LifecycleState, Option<String>, &str) {
    let Some(rest) = text.strip_prefix('[') else {
        return (LifecycleState::Active, None, text);
    };
    let Some(close) = rest.find(']') else {
        return (LifecycleState::Active, None, text);
    };
    let marker = rest[..close].trim();
    let remainder = rest[close + 1..].trim_start();

    if marker == "deferred" {
        return (LifecycleState::Deferred, None, remainder);
    }
    if marker == "deprecated" {
        return (LifecycleState::Deprecated, None, remainder);
    }
    if let Some(target) = marker.strip_prefix("deprecated:") {
        let target = target.trim();
        let target = (!target.is_empty()).then(|| target.to_string());
        return (LifecycleState::Deprecated, target, remainder);
    }

    (LifecycleState::Active, None, text)
}
