//! reqtrace - Measure requirements coverage
//!
//! reqtrace reads requirement definitions from `<specs>/<scope>/spec.md`,
//! finds `@req` annotations in source and test comments, reads task lists,
//! and reports which requirements are implemented, tested, or missing.

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use reqtrace::config::CONFIG_PATH;
use reqtrace::output::{OutputFormat, render_report};
use reqtrace::{build_report, find_project_root, load_config};
use std::path::PathBuf;
use tracing::info;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "reqtrace", version, about = "Measure requirements coverage")]
struct Args {
    /// Subcommand to run (default: report)
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (default: .config/reqtrace/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root (default: nearest ancestor with .config/reqtrace, .git or Cargo.toml)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t, global = true)]
    format: OutputFormat,

    /// More output; repeat for debug logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Subcommands
#[derive(Debug, Subcommand)]
enum Command {
    /// Compute and print the coverage report
    Report,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command.as_ref().unwrap_or(&Command::Report) {
        Command::Report => run_report_command(&args),
    }
}

fn run_report_command(args: &Args) -> Result<()> {
    let project_root = match &args.root {
        Some(root) => root.clone(),
        None => find_project_root()?,
    };
    if !project_root.is_dir() {
        eyre::bail!("Project root {} is not a directory", project_root.display());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_root.join(CONFIG_PATH));
    let config = load_config(&config_path)?;
    info!("project root: {}", project_root.display());

    eprintln!(
        "{} Scanning {}...",
        "->".blue().bold(),
        project_root.display().to_string().cyan()
    );

    let report = build_report(&project_root, &config);

    eprintln!(
        "   Found {} requirements, {} orphaned annotations",
        report.requirements.len().to_string().green(),
        report.orphaned.len().to_string().yellow()
    );

    let output = render_report(&report, args.format, args.verbose > 0)?;
    print!("{}", output);

    use std::io::Write;
    std::io::stdout()
        .flush()
        .wrap_err("Failed to write report to stdout")?;

    Ok(())
}
