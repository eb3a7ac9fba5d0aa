//! Output formatting for coverage reports

use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use reqtrace_core::{CoverageReport, CoverageStatus, RequirementCoverage};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    #[value(alias = "md")]
    Markdown,
    Csv,
}

/// Render a coverage report in the specified format
pub fn render_report(
    report: &CoverageReport,
    format: OutputFormat,
    verbose: bool,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report, verbose)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Markdown => Ok(render_markdown(report, verbose)),
        OutputFormat::Csv => Ok(render_csv(report)),
    }
}

fn colored_percent(percent: u32) -> String {
    let percent_str = format!("{}%", percent);
    if percent >= 80 {
        percent_str.green().to_string()
    } else if percent >= 50 {
        percent_str.yellow().to_string()
    } else {
        percent_str.red().to_string()
    }
}

fn status_icon(status: CoverageStatus) -> String {
    match status {
        CoverageStatus::Tested => "✓".green().to_string(),
        CoverageStatus::Implemented => "+".green().to_string(),
        CoverageStatus::ImplementedPartial => "~".yellow().to_string(),
        CoverageStatus::Missing => "-".red().to_string(),
        CoverageStatus::Deferred => "…".dimmed().to_string(),
        CoverageStatus::Deprecated => "x".dimmed().to_string(),
        CoverageStatus::Parent => "◉".blue().to_string(),
    }
}

fn render_text(report: &CoverageReport, verbose: bool) -> String {
    let summary = &report.summary;
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!("{} Requirements Coverage Report\n", "##".bold()));
    output.push('\n');

    output.push_str(&format!(
        "Implementation: {} ({}/{} active requirements)\n",
        colored_percent(summary.implementation_coverage),
        summary.implemented,
        summary.active
    ));
    output.push_str(&format!(
        "Tests:          {} ({}/{} active requirements)\n",
        colored_percent(summary.test_coverage),
        summary.tested,
        summary.active
    ));
    if !report.tasks.is_empty() {
        output.push_str(&format!(
            "Tasks:          {} ({} tasks, {} without requirements)\n",
            colored_percent(summary.task_coverage),
            report.tasks.len(),
            summary.tasks_without_requirements
        ));
    }
    output.push_str(&format!(
        "  {}\n",
        format!(
            "{} requirements, {} active, {} deferred, {} deprecated",
            summary.total, summary.active, summary.deferred, summary.deprecated
        )
        .dimmed()
    ));
    output.push('\n');

    if !report.orphaned.is_empty() {
        output.push_str(&format!(
            "{} Orphaned Annotations ({}):\n",
            "!".red().bold(),
            report.orphaned.len()
        ));
        for orphan in &report.orphaned {
            output.push_str(&format!("  {} {}\n", "-".red(), orphan.id.yellow()));
            for location in &orphan.locations {
                output.push_str(&format!("      {}\n", location.dimmed()));
            }
        }
        output.push('\n');
    }

    if !report.duplicates.is_empty() {
        output.push_str(&format!(
            "{} Duplicate Definitions ({}):\n",
            "!".yellow().bold(),
            report.duplicates.len()
        ));
        for dup in &report.duplicates {
            output.push_str(&format!(
                "  {} {} at {} (first defined at {})\n",
                "-".yellow(),
                dup.id.yellow(),
                dup.duplicate,
                dup.first.dimmed()
            ));
        }
        output.push('\n');
    }

    let missing: Vec<&RequirementCoverage> =
        report.with_status(CoverageStatus::Missing).collect();
    if !missing.is_empty() {
        output.push_str(&format!(
            "{} Missing Requirements ({}):\n",
            "?".yellow().bold(),
            missing.len()
        ));
        for req in missing {
            output.push_str(&format!(
                "  {} {} {}\n",
                "-".yellow(),
                req.definition.id.dimmed(),
                req.definition.location().dimmed()
            ));
        }
        output.push('\n');
    }

    if verbose {
        output.push_str(&format!("{} All Requirements:\n", "*".bold()));
        for req in report.requirements.values() {
            output.push_str(&format!(
                "  {} {} [{}]\n",
                status_icon(req.coverage_status),
                req.definition.id,
                req.coverage_status.as_str().dimmed()
            ));
            for annotation in req.implementations.iter().chain(&req.tests) {
                output.push_str(&format!("      {}\n", annotation.location().dimmed()));
            }
        }
        output.push('\n');
    }

    output
}

fn render_json(report: &CoverageReport) -> Result<String> {
    serde_json::to_string_pretty(report).wrap_err("Failed to serialize coverage report")
}

fn render_markdown(report: &CoverageReport, verbose: bool) -> String {
    let summary = &report.summary;
    let mut output = String::new();

    output.push_str("# Requirements Coverage Report\n\n");

    output.push_str("| Metric | Value |\n|---|---|\n");
    output.push_str(&format!(
        "| Implementation coverage | {}% ({}/{}) |\n",
        summary.implementation_coverage, summary.implemented, summary.active
    ));
    output.push_str(&format!(
        "| Test coverage | {}% ({}/{}) |\n",
        summary.test_coverage, summary.tested, summary.active
    ));
    output.push_str(&format!("| Task coverage | {}% |\n", summary.task_coverage));
    output.push_str(&format!("| Requirements | {} |\n", summary.total));
    output.push_str(&format!("| Deferred | {} |\n", summary.deferred));
    output.push_str(&format!("| Deprecated | {} |\n", summary.deprecated));
    output.push('\n');

    if !report.orphaned.is_empty() {
        output.push_str("## Orphaned Annotations\n\n");
        for orphan in &report.orphaned {
            output.push_str(&format!(
                "- `{}` at {}\n",
                orphan.id,
                orphan
                    .locations
                    .iter()
                    .map(|l| format!("`{}`", l))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        output.push('\n');
    }

    if !report.duplicates.is_empty() {
        output.push_str("## Duplicate Definitions\n\n");
        for dup in &report.duplicates {
            output.push_str(&format!(
                "- `{}` at `{}` (first defined at `{}`)\n",
                dup.id, dup.duplicate, dup.first
            ));
        }
        output.push('\n');
    }

    let missing: Vec<_> = report.with_status(CoverageStatus::Missing).collect();
    if !missing.is_empty() {
        output.push_str("## Missing Requirements\n\n");
        for req in missing {
            output.push_str(&format!(
                "- `{}` {}\n",
                req.definition.id, req.definition.text
            ));
        }
        output.push('\n');
    }

    if verbose {
        output.push_str("## All Requirements\n\n");
        output.push_str("| Requirement | Status | Implementations | Tests |\n|---|---|---|---|\n");
        for req in report.requirements.values() {
            output.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                req.definition.id,
                req.coverage_status,
                req.implementations.len(),
                req.tests.len()
            ));
        }
        output.push('\n');
    }

    output
}

/// One row per requirement, parents included.
fn render_csv(report: &CoverageReport) -> String {
    let mut output = String::from("id,type,scope,path,status,implementations,tests,location\n");
    for req in report.requirements.values() {
        let id = &req.definition.id;
        let fields = [
            id.qualified().to_string(),
            id.kind().to_string(),
            id.scope().to_string(),
            id.path().to_string(),
            req.coverage_status.to_string(),
            req.implementations.len().to_string(),
            req.tests.len().to_string(),
            req.definition.location(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        output.push_str(&row.join(","));
        output.push('\n');
    }
    output
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqtrace_core::{Annotations, MemorySources, SpecParser};
    use std::path::Path;

    fn sample_report() -> CoverageReport {
        let definitions = SpecParser::parse_content(
            "- **FR:auth.login**: Users log in\n\
             - **FR:auth.logout**: Users log out, eventually\n",
            "auth",
            Path::new("specs/auth/spec.md"),
        );
        let annotations = Annotations::extract(
            MemorySources::new().add(
                "src/login.rs",
                "// @req FR:auth/auth.login\n// @req FR:auth/auth.gone\n",
            ),
        )
        .unwrap();
        CoverageReport::compute(&definitions, &annotations.annotations, &[])
    }

    #[test]
    fn test_format_names() {
        use clap::ValueEnum;

        assert_eq!(OutputFormat::from_str("JSON", true), Ok(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("md", false), Ok(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_str("csv", false), Ok(OutputFormat::Csv));
        assert!(OutputFormat::from_str("html", false).is_err());
    }

    #[test]
    fn test_text_lists_missing_and_orphans() {
        let text = render_report(&sample_report(), OutputFormat::Text, false).unwrap();
        assert!(text.contains("Missing Requirements"));
        assert!(text.contains("FR:auth/auth.logout"));
        assert!(text.contains("Orphaned Annotations"));
        assert!(text.contains("src/login.rs:2"));
    }

    #[test]
    fn test_json_round_trips_through_serde_json() {
        let json = render_report(&sample_report(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["implementationCoverage"], 50);
        assert_eq!(value["orphaned"][0]["id"], "FR:auth/auth.gone");
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_report(&sample_report(), OutputFormat::Markdown, true).unwrap();
        assert!(md.starts_with("# Requirements Coverage Report"));
        assert!(md.contains("| Implementation coverage | 50% (1/2) |"));
        assert!(md.contains("## Missing Requirements"));
        assert!(md.contains("| `FR:auth/auth.login` | implemented | 1 | 0 |"));
    }

    #[test]
    fn test_csv_rows() {
        let csv = render_report(&sample_report(), OutputFormat::Csv, false).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "FR:auth/auth.login,FR,auth,auth.login,implemented,1,0,specs/auth/spec.md:1"
        );
        assert!(lines[2].contains(",missing,0,0,"));
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
