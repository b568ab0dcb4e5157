use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jacoco_gate::config::GithubConfig;
use jacoco_gate::git::GitDiff;
use jacoco_gate::notifications::post_pr_comment;
use jacoco_gate::{Config, CoverageGate, Evaluation, StatusReport};

const CONFIG_FILE: &str = "jacoco-gate.toml";

#[derive(Parser)]
#[command(name = "jacoco-gate")]
#[command(about = "Per-class JaCoCo coverage gate for code review")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: jacoco-gate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate changed classes against a JaCoCo report
    Check {
        /// JaCoCo XML report (default: report.path from config)
        report: Option<PathBuf>,

        #[command(flatten)]
        files: FileArgs,

        /// Base URL of the published HTML report
        #[arg(long)]
        report_url: Option<String>,

        /// Regex separating the source root from the package path
        #[arg(long)]
        delimiter: Option<String>,

        /// Only warn about classes without coverage data
        #[arg(long)]
        warn_no_coverage_data: bool,

        /// Write the markdown summary to this file instead of stdout
        #[arg(long)]
        markdown_out: Option<PathBuf>,

        /// Post the summary as a comment on this pull request
        #[arg(long)]
        github_pr: Option<u64>,
    },

    /// Show which classes the candidate files resolve to
    Classes {
        #[command(flatten)]
        files: FileArgs,
    },
}

#[derive(Args)]
struct FileArgs {
    /// Source files to check
    #[arg(long, num_args = 1..)]
    files: Vec<String>,

    /// Also check files changed since this git reference
    #[arg(long)]
    since: Option<String>,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::load_or_default(Path::new(CONFIG_FILE))?,
    };

    match cli.command {
        Commands::Check {
            report,
            files,
            report_url,
            delimiter,
            warn_no_coverage_data,
            markdown_out,
            github_pr,
        } => {
            let mut config = config;
            if let Some(report) = report {
                config.report.path = report;
            }
            if let Some(url) = report_url {
                config.report.url = url;
            }
            if let Some(delimiter) = delimiter {
                config.report.delimiter = delimiter;
            }
            if warn_no_coverage_data {
                config.report.fail_no_coverage_data_found = false;
            }
            if markdown_out.is_some() {
                config.output.markdown = markdown_out;
            }
            if github_pr.is_some() {
                config.github.enabled = true;
                config.github.pull_request = github_pr;
            }
            cmd_check(&config, &files)
        }
        Commands::Classes { files } => cmd_classes(&config, &files),
    }
}

fn cmd_check(config: &Config, args: &FileArgs) -> Result<bool> {
    let files = candidate_files(config, args)?;
    let gate = CoverageGate::new(config)?;
    let mut status = StatusReport::new();

    let evaluation = gate
        .evaluate(&files, &mut status)
        .with_context(|| format!("Could not evaluate {}", config.report.path.display()))?;

    match config.output.markdown {
        Some(ref path) => {
            fs::write(path, &evaluation.markdown)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Summary written to {}",
                "✓".green().bold(),
                path.display()
            );
        }
        None => println!("{}", evaluation.markdown),
    }

    if config.github.enabled {
        post_comment(&config.github, &evaluation.markdown)?;
        println!("{} Summary posted to pull request", "✓".green().bold());
    }

    print_summary(&evaluation, &status);

    Ok(status.passed())
}

#[tokio::main]
async fn post_comment(config: &GithubConfig, markdown: &str) -> Result<()> {
    post_pr_comment(config, markdown).await
}

fn print_summary(evaluation: &Evaluation, status: &StatusReport) {
    println!("{}", "─".repeat(50).dimmed());

    for warning in &status.warnings {
        println!("{} {}", "!".yellow().bold(), warning);
    }

    if status.passed() {
        println!(
            "{} {} class(es) checked, project coverage {}%",
            "✓".green().bold(),
            evaluation.classes.len(),
            evaluation.project.covered
        );
        return;
    }

    for error in &status.errors {
        println!("{} {}", "✗".red().bold(), error);
    }

    if let Some(ref path) = evaluation.failure_artifact {
        println!(
            "  {} {}",
            "failure status:".dimmed(),
            path.display()
        );
    }
}

fn cmd_classes(config: &Config, args: &FileArgs) -> Result<bool> {
    let files = candidate_files(config, args)?;
    let gate = CoverageGate::new(config)?;
    let classes = gate.classes(&files);

    if classes.is_empty() {
        println!("  {}", "No classes found".dimmed());
        return Ok(true);
    }

    println!("{}", "Classes:".bold());
    for (class_name, file) in classes.iter() {
        println!("  {} {}", "•".green(), class_name.cyan());
        println!("    {} {}", "file:".dimmed(), file);
    }

    Ok(true)
}

/// `--files`, then include globs, then git changes; first occurrence wins.
///
/// Git is consulted when `--since` is given or nothing else named a file.
fn candidate_files(config: &Config, args: &FileArgs) -> Result<Vec<String>> {
    let mut files = args.files.clone();

    // include globs are relative to report.root, like every resolved path
    let root = &config.report.root;
    for pattern in &config.files.include {
        let anchored = root.join(pattern).to_string_lossy().to_string();
        let paths =
            glob::glob(&anchored).with_context(|| format!("Invalid include glob '{}'", pattern))?;
        for path in paths.filter_map(|p| p.ok()) {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            files.push(relative.to_string_lossy().to_string());
        }
    }

    if args.since.is_some() || files.is_empty() {
        let diff = GitDiff::new(&config.report.root)?;
        files.extend(diff.changed_files_under(&config.report.root, args.since.as_deref())?);
    }

    let mut seen = HashSet::new();
    files.retain(|file| seen.insert(file.clone()));
    tracing::debug!(count = files.len(), "candidate files");

    Ok(files)
}
