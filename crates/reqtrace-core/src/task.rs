//! Task references supplied by task-list readers

use crate::req_id::RequirementId;
use serde::Serialize;
use std::path::PathBuf;

/// A task that claims to address some requirements
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReference {
    /// Task identifier, e.g. `T001`
    pub task_id: String,
    /// Scope of the task list the task came from, empty when unknown
    pub scope: String,
    pub file: PathBuf,
    /// Line number (1-indexed)
    pub line: usize,
    pub text: String,
    pub requirements: Vec<RequirementId>,
}

impl TaskReference {
    /// Key under which the task is indexed in a coverage report:
    /// `scope:taskId`, or the bare task id for unscoped tasks.
    pub fn index_key(&self) -> String {
        if self.scope.is_empty() {
            self.task_id.clone()
        } else {
            format!("{}:{}", self.scope, self.task_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(scope: &str) -> TaskReference {
        TaskReference {
            task_id: "T001".to_string(),
            scope: scope.to_string(),
            file: PathBuf::from("specs/auth/tasks.md"),
            line: 3,
            text: "Wire up login".to_string(),
            requirements: Vec::new(),
        }
    }

    #[test]
    fn index_key_includes_scope() {
        assert_eq!(task("auth").index_key(), "auth:T001");
        assert_eq!(task("").index_key(), "T001");
    }
}
