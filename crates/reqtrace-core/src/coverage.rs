//! Coverage analysis and reporting

use crate::lexer::RequirementAnnotation;
use crate::req_id::{RequirementId, RequirementType};
use crate::spec::{LifecycleState, RequirementDefinition};
use crate::task::TaskReference;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Bound;

/// Per-requirement coverage outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageStatus {
    Missing,
    Implemented,
    ImplementedPartial,
    Tested,
    Deferred,
    Deprecated,
    /// Has more detailed requirements beneath it; excluded from statistics
    Parent,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageStatus::Missing => "missing",
            CoverageStatus::Implemented => "implemented",
            CoverageStatus::ImplementedPartial => "implemented-partial",
            CoverageStatus::Tested => "tested",
            CoverageStatus::Deferred => "deferred",
            CoverageStatus::Deprecated => "deprecated",
            CoverageStatus::Parent => "parent",
        }
    }
}

impl std::fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A definition together with the annotations that reference it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementCoverage {
    pub definition: RequirementDefinition,
    /// Annotations from production code (partial or not)
    pub implementations: Vec<RequirementAnnotation>,
    /// Annotations from test code
    pub tests: Vec<RequirementAnnotation>,
    pub coverage_status: CoverageStatus,
}

impl RequirementCoverage {
    pub fn is_parent(&self) -> bool {
        self.coverage_status == CoverageStatus::Parent
    }
}

/// Annotations pointing at a requirement nobody defined
#[derive(Debug, Clone, Serialize)]
pub struct OrphanedAnnotation {
    pub id: RequirementId,
    /// `file:line` of every occurrence
    pub locations: Vec<String>,
}

/// A definition that reused an already defined qualified id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDefinition {
    pub id: RequirementId,
    /// Location of the definition that was kept
    pub first: String,
    /// Location of the definition that was ignored
    pub duplicate: String,
}

/// Statistics over leaf requirements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub total: usize,
    pub active: usize,
    pub implemented: usize,
    pub tested: usize,
    pub uncovered: usize,
    pub missing: usize,
    pub deferred: usize,
    pub deprecated: usize,
    pub implementation_coverage: u32,
    pub test_coverage: u32,
    pub task_coverage: u32,
    pub tasks_without_requirements: usize,
}

/// Coverage analysis results
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Every definition by qualified id, parents included
    pub requirements: BTreeMap<String, RequirementCoverage>,
    pub orphaned: Vec<OrphanedAnnotation>,
    /// Tasks keyed by [`TaskReference::index_key`]
    pub tasks: BTreeMap<String, TaskReference>,
    pub summary: CoverageSummary,
    pub duplicates: Vec<DuplicateDefinition>,
}

impl CoverageReport {
    /// Compute coverage from definitions, annotations and tasks.
    ///
    /// When two definitions share a qualified id the first one wins and the
    /// other is listed in [`CoverageReport::duplicates`].
    pub fn compute(
        definitions: &[RequirementDefinition],
        annotations: &[RequirementAnnotation],
        tasks: &[TaskReference],
    ) -> Self {
        let mut requirements: BTreeMap<String, RequirementCoverage> = BTreeMap::new();
        let mut duplicates = Vec::new();

        for definition in definitions {
            let key = definition.id.qualified();
            if let Some(existing) = requirements.get(key) {
                duplicates.push(DuplicateDefinition {
                    id: definition.id.clone(),
                    first: existing.definition.location(),
                    duplicate: definition.location(),
                });
                continue;
            }
            requirements.insert(
                key.to_string(),
                RequirementCoverage {
                    definition: definition.clone(),
                    implementations: Vec::new(),
                    tests: Vec::new(),
                    coverage_status: CoverageStatus::Missing,
                },
            );
        }

        let parents = find_parents(requirements.values().map(|r| &r.definition.id));

        let mut orphaned: Vec<OrphanedAnnotation> = Vec::new();
        let mut orphan_index: HashMap<String, usize> = HashMap::new();

        for annotation in annotations {
            let key = annotation.id.qualified();
            match requirements.get_mut(key) {
                Some(coverage) if annotation.is_test => coverage.tests.push(annotation.clone()),
                Some(coverage) => coverage.implementations.push(annotation.clone()),
                None => {
                    let idx = *orphan_index.entry(key.to_string()).or_insert_with(|| {
                        orphaned.push(OrphanedAnnotation {
                            id: annotation.id.clone(),
                            locations: Vec::new(),
                        });
                        orphaned.len() - 1
                    });
                    orphaned[idx].locations.push(annotation.location());
                }
            }
        }

        for (key, coverage) in requirements.iter_mut() {
            coverage.coverage_status = if parents.contains(key.as_str()) {
                CoverageStatus::Parent
            } else {
                leaf_status(coverage)
            };
        }

        let mut task_index: BTreeMap<String, TaskReference> = BTreeMap::new();
        for task in tasks {
            task_index
                .entry(task.index_key())
                .or_insert_with(|| task.clone());
        }

        let summary = summarize(&requirements, tasks);

        CoverageReport {
            requirements,
            orphaned,
            tasks: task_index,
            summary,
            duplicates,
        }
    }

    /// Requirements that count toward statistics
    pub fn leaves(&self) -> impl Iterator<Item = &RequirementCoverage> {
        self.requirements.values().filter(|r| !r.is_parent())
    }

    /// Requirements with the given status, in qualified-id order
    pub fn with_status(
        &self,
        status: CoverageStatus,
    ) -> impl Iterator<Item = &RequirementCoverage> {
        self.requirements
            .values()
            .filter(move |r| r.coverage_status == status)
    }

    /// Look up a requirement by qualified id
    pub fn requirement(&self, qualified: &str) -> Option<&RequirementCoverage> {
        self.requirements.get(qualified)
    }
}

/// Qualified ids of every definition that has another definition strictly
/// beneath it (same type and scope, path extended by `.segment`).
fn find_parents<'a>(ids: impl Iterator<Item = &'a RequirementId>) -> HashSet<String> {
    let ids: Vec<&RequirementId> = ids.collect();

    let mut groups: HashMap<(RequirementType, &str), BTreeSet<&str>> = HashMap::new();
    for id in &ids {
        groups
            .entry((id.kind(), id.scope()))
            .or_default()
            .insert(id.path());
    }

    // Paths sharing `path.` as a prefix sort contiguously from `path.` on
    ids.into_iter()
        .filter(|id| {
            let prefix = format!("{}.", id.path());
            groups
                .get(&(id.kind(), id.scope()))
                .and_then(|paths| {
                    paths
                        .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
                        .next()
                })
                .is_some_and(|next| next.starts_with(&prefix))
        })
        .map(|id| id.qualified().to_string())
        .collect()
}

fn leaf_status(coverage: &RequirementCoverage) -> CoverageStatus {
    match coverage.definition.state {
        LifecycleState::Deferred => CoverageStatus::Deferred,
        LifecycleState::Deprecated => CoverageStatus::Deprecated,
        LifecycleState::Active if !coverage.tests.is_empty() => CoverageStatus::Tested,
        LifecycleState::Active if coverage.implementations.is_empty() => CoverageStatus::Missing,
        LifecycleState::Active => {
            if coverage.implementations.iter().any(|a| !a.is_partial) {
                CoverageStatus::Implemented
            } else {
                CoverageStatus::ImplementedPartial
            }
        }
    }
}

fn summarize(
    requirements: &BTreeMap<String, RequirementCoverage>,
    tasks: &[TaskReference],
) -> CoverageSummary {
    let referenced_by_tasks: HashSet<&str> = tasks
        .iter()
        .flat_map(|task| task.requirements.iter().map(|id| id.qualified()))
        .collect();

    let mut summary = CoverageSummary::default();
    let mut task_covered = 0;

    for (key, coverage) in requirements.iter().filter(|(_, r)| !r.is_parent()) {
        summary.total += 1;
        match coverage.definition.state {
            LifecycleState::Deferred => summary.deferred += 1,
            LifecycleState::Deprecated => summary.deprecated += 1,
            LifecycleState::Active => {
                summary.active += 1;
                match coverage.coverage_status {
                    CoverageStatus::Tested => {
                        summary.implemented += 1;
                        summary.tested += 1;
                    }
                    CoverageStatus::Implemented => summary.implemented += 1,
                    CoverageStatus::Missing => summary.missing += 1,
                    _ => {}
                }
                if referenced_by_tasks.contains(key.as_str()) {
                    task_covered += 1;
                }
            }
        }
    }

    summary.uncovered = summary.missing;
    summary.implementation_coverage = percent(summary.implemented, summary.active);
    summary.test_coverage = percent(summary.tested, summary.active);
    summary.task_coverage = percent(task_covered, summary.active);
    summary.tasks_without_requirements = tasks
        .iter()
        .filter(|task| task.requirements.is_empty())
        .count();
    summary
}

/// Rounded percentage, 0 when there is nothing to measure against
fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::req_id::parse;
    use std::path::PathBuf;

    fn def(id: &str, state: LifecycleState) -> RequirementDefinition {
        RequirementDefinition {
            id: parse(id).unwrap(),
            state,
            deprecated_target: None,
            text: format!("text for {id}"),
            spec_file: PathBuf::from("specs/auth/spec.md"),
            spec_line: 1,
        }
    }

    fn active(id: &str) -> RequirementDefinition {
        def(id, LifecycleState::Active)
    }

    fn ann(id: &str, line: usize, is_partial: bool, is_test: bool) -> RequirementAnnotation {
        RequirementAnnotation {
            id: parse(id).unwrap(),
            file: PathBuf::from(if is_test { "tests/a.rs" } else { "src/a.rs" }),
            line,
            is_partial,
            is_test,
        }
    }

    fn task(id: &str, reqs: &[&str]) -> TaskReference {
        TaskReference {
            task_id: id.to_string(),
            scope: "auth".to_string(),
            file: PathBuf::from("specs/auth/tasks.md"),
            line: 1,
            text: String::new(),
            requirements: reqs.iter().map(|r| parse(r).unwrap()).collect(),
        }
    }

    fn status(report: &CoverageReport, id: &str) -> CoverageStatus {
        report.requirement(id).unwrap().coverage_status
    }

    #[test]
    fn test_parents_excluded_from_counts() {
        let defs = [
            active("FR:auth/session"),
            active("FR:auth/session.expiry"),
            active("FR:auth/session.refresh"),
        ];
        let anns = [
            ann("FR:auth/session.expiry", 1, false, false),
            ann("FR:auth/session.refresh", 2, false, false),
        ];
        let report = CoverageReport::compute(&defs, &anns, &[]);

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.active, 2);
        assert_eq!(report.summary.implementation_coverage, 100);
        assert_eq!(status(&report, "FR:auth/session"), CoverageStatus::Parent);
        assert_eq!(report.requirements.len(), 3);
    }

    #[test]
    fn test_parent_detection_needs_dot_boundary() {
        let defs = [
            active("FR:auth/session"),
            active("FR:auth/session-store"),
            active("NFR:auth/session.latency"),
            active("FR:billing/session.expiry"),
        ];
        let report = CoverageReport::compute(&defs, &[], &[]);
        assert_eq!(report.leaves().count(), 4);
    }

    #[test]
    fn test_grandchild_makes_parent() {
        let defs = [active("FR:auth/a"), active("FR:auth/a-b"), active("FR:auth/a.b.c")];
        let report = CoverageReport::compute(&defs, &[], &[]);
        assert_eq!(status(&report, "FR:auth/a"), CoverageStatus::Parent);
        assert_eq!(status(&report, "FR:auth/a-b"), CoverageStatus::Missing);
        assert_eq!(status(&report, "FR:auth/a.b.c"), CoverageStatus::Missing);
    }

    #[test]
    fn test_status_priority() {
        let defs = [
            active("FR:auth/full"),
            active("FR:auth/partial"),
            active("FR:auth/tested"),
            active("FR:auth/none"),
            def("FR:auth/later", LifecycleState::Deferred),
            def("FR:auth/old", LifecycleState::Deprecated),
        ];
        let anns = [
            ann("FR:auth/full", 1, true, false),
            ann("FR:auth/full", 2, false, false),
            ann("FR:auth/partial", 3, true, false),
            ann("FR:auth/tested", 4, true, false),
            ann("FR:auth/tested", 5, false, true),
            ann("FR:auth/later", 6, false, true),
            ann("FR:auth/old", 7, false, false),
        ];
        let report = CoverageReport::compute(&defs, &anns, &[]);

        assert_eq!(status(&report, "FR:auth/full"), CoverageStatus::Implemented);
        assert_eq!(
            status(&report, "FR:auth/partial"),
            CoverageStatus::ImplementedPartial
        );
        assert_eq!(status(&report, "FR:auth/tested"), CoverageStatus::Tested);
        assert_eq!(status(&report, "FR:auth/none"), CoverageStatus::Missing);
        assert_eq!(status(&report, "FR:auth/later"), CoverageStatus::Deferred);
        assert_eq!(status(&report, "FR:auth/old"), CoverageStatus::Deprecated);

        let summary = &report.summary;
        assert_eq!(summary.total, 6);
        assert_eq!(summary.active, 4);
        assert_eq!(summary.implemented, 2);
        assert_eq!(summary.tested, 1);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.uncovered, 1);
        assert_eq!(summary.deferred, 1);
        assert_eq!(summary.deprecated, 1);
        assert_eq!(summary.implementation_coverage, 50);
        assert_eq!(summary.test_coverage, 25);
    }

    #[test]
    fn test_tests_and_implementations_split() {
        let defs = [active("FR:auth/login")];
        let anns = [
            ann("FR:auth/login", 1, false, false),
            ann("FR:auth/login", 2, true, true),
        ];
        let report = CoverageReport::compute(&defs, &anns, &[]);
        let login = report.requirement("FR:auth/login").unwrap();
        assert_eq!(login.implementations.len(), 1);
        assert_eq!(login.tests.len(), 1);
    }

    #[test]
    fn test_orphans_merge_locations() {
        let defs = [active("FR:auth/login")];
        let anns = [
            ann("FR:auth/nonexistent", 10, false, false),
            ann("FR:auth/login", 11, false, false),
            ann("FR:auth/nonexistent", 20, false, true),
            ann("FR:auth.login", 30, false, false),
        ];
        let report = CoverageReport::compute(&defs, &anns, &[]);

        assert_eq!(report.orphaned.len(), 2);
        assert_eq!(report.orphaned[0].id.qualified(), "FR:auth/nonexistent");
        assert_eq!(
            report.orphaned[0].locations,
            ["src/a.rs:10", "tests/a.rs:20"]
        );
        assert_eq!(report.orphaned[1].id.qualified(), "FR:auth.login");
    }

    #[test]
    fn test_task_coverage() {
        let defs = [
            active("FR:auth/a"),
            active("FR:auth/b"),
            active("FR:auth/c"),
            active("FR:auth/d"),
        ];
        let tasks = [
            task("T001", &["FR:auth/a", "FR:auth/b"]),
            task("T002", &["FR:auth/b", "FR:auth/c"]),
        ];
        let report = CoverageReport::compute(&defs, &[], &tasks);
        assert_eq!(report.summary.task_coverage, 75);
        assert_eq!(report.summary.tasks_without_requirements, 0);
        assert!(report.tasks.contains_key("auth:T001"));
        assert!(report.tasks.contains_key("auth:T002"));
    }

    #[test]
    fn test_tasks_without_requirements() {
        let tasks = [task("T001", &[]), task("T002", &["FR:auth/x"])];
        let report = CoverageReport::compute(&[], &[], &tasks);
        assert_eq!(report.summary.tasks_without_requirements, 1);
        assert_eq!(report.summary.task_coverage, 0);
    }

    #[test]
    fn test_empty_inputs() {
        let report = CoverageReport::compute(&[], &[], &[]);
        assert_eq!(report.summary, CoverageSummary::default());
        assert!(report.requirements.is_empty());
        assert!(report.orphaned.is_empty());
    }

    #[test]
    fn test_duplicate_definitions_first_wins() {
        let mut second = active("FR:auth/login");
        second.spec_line = 9;
        second.text = "second".to_string();
        let defs = [active("FR:auth/login"), second];
        let report = CoverageReport::compute(&defs, &[], &[]);

        assert_eq!(report.requirements.len(), 1);
        assert_eq!(
            report.requirement("FR:auth/login").unwrap().definition.text,
            "text for FR:auth/login"
        );
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].first, "specs/auth/spec.md:1");
        assert_eq!(report.duplicates[0].duplicate, "specs/auth/spec.md:9");
    }

    #[test]
    fn test_rounding() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(0, 0), 0);
    }
}
