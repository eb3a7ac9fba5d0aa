//! Task lists: `<root>/<scope>/tasks.md`
//!
//! One task per checkbox bullet:
//!
//! ```markdown
//! - [ ] T001 Wire up login form FR:auth.login, NFR:perf.login-latency
//! - [x] T002: Expire idle sessions (FR:auth.session.expiry)
//! ```
//!
//! Requirement ids without a scope are qualified with the task list's scope.

use eyre::{Result, WrapErr};
use reqtrace_core::TaskReference;
use reqtrace_core::req_id::{self, RequirementId};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TASKS_FILE_NAME: &str = "tasks.md";

/// Characters that separate requirement ids from surrounding prose
const DELIMITERS: &[char] = &[',', ';', '(', ')', '[', ']', '`', '*', '"', '\''];

/// Parse the tasks in an in-memory task list.
pub fn parse_content(content: &str, scope: &str, file: &Path) -> Vec<TaskReference> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let (task_id, text) = parse_task_line(line)?;
            Some(TaskReference {
                task_id: task_id.to_string(),
                scope: scope.to_string(),
                file: file.to_path_buf(),
                line: idx + 1,
                text: text.to_string(),
                requirements: requirement_refs(text, scope),
            })
        })
        .collect()
}

pub fn parse_file(path: &Path, scope: &str) -> Result<Vec<TaskReference>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read task list {}", path.display()))?;
    Ok(parse_content(&content, scope, path))
}

/// Read `tasks.md` from every immediate child directory of `root`, in sorted
/// order. A missing root yields no tasks.
pub fn parse_directory(root: &Path) -> Vec<TaskReference> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("task root {} not readable: {}", root.display(), e);
            return Vec::new();
        }
    };

    let mut scope_dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    scope_dirs.sort();

    let mut tasks = Vec::new();
    for dir in scope_dirs {
        let tasks_path = dir.join(TASKS_FILE_NAME);
        if !tasks_path.is_file() {
            continue;
        }
        let Some(scope) = dir
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| req_id::is_valid_segment(name))
        else {
            warn!(
                "skipping {}: directory name is not a valid requirement scope",
                tasks_path.display()
            );
            continue;
        };

        match parse_file(&tasks_path, scope) {
            Ok(parsed) => {
                debug!("parsed {} tasks from {}", parsed.len(), tasks_path.display());
                tasks.extend(parsed);
            }
            Err(e) => warn!("{:#}", e),
        }
    }
    tasks
}

/// Split `- [ ] T001 text` into the task id and the remaining text.
fn parse_task_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix("- [")?;
    let rest = rest
        .strip_prefix(" ]")
        .or_else(|| rest.strip_prefix("x]"))
        .or_else(|| rest.strip_prefix("X]"))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim_start();
    let (token, text) = match rest.split_once(char::is_whitespace) {
        Some((token, text)) => (token, text.trim()),
        None => (rest, ""),
    };
    let task_id = token.strip_suffix(':').unwrap_or(token);
    is_task_id(task_id).then_some((task_id, text))
}

fn is_task_id(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_uppercase())
        && token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Every token of `text` that parses as a requirement id, deduplicated in
/// first-seen order.
fn requirement_refs(text: &str, scope: &str) -> Vec<RequirementId> {
    let mut refs: Vec<RequirementId> = Vec::new();
    for token in text.split(|c: char| c.is_whitespace() || DELIMITERS.contains(&c)) {
        let token = token.trim_end_matches(['.', ':']);
        let Some(id) = req_id::parse(token) else {
            continue;
        };
        let id = req_id::build_qualified(id, scope);
        if !refs.contains(&id) {
            refs.push(id);
        }
    }
    refs
}
