//! scrubpdf CLI - redact confidential text and logos from PDF files

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use scrubpdf::{analyze, classify, ActionKind, RedactOptions, SourceDocument, TargetSet};

#[derive(Parser)]
#[command(name = "scrubpdf")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Redact confidential text and logos from PDF documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Redact target phrases (and optionally logos) from a PDF
    Redact {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to <input>.redacted.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Target phrase to remove; repeatable
        #[arg(short, long = "target", value_name = "PHRASE")]
        targets: Vec<String>,

        /// File with one target phrase per line
        #[arg(long, value_name = "FILE")]
        targets_file: Option<PathBuf>,

        /// Remove detected logo imagery
        #[arg(long)]
        remove_logos: bool,

        /// Draw a placeholder tint where a logo was removed
        #[arg(long)]
        placeholders: bool,

        /// Write the audit log as JSON
        #[arg(long, value_name = "FILE")]
        audit_json: Option<PathBuf>,

        /// Process pages sequentially
        #[arg(long)]
        sequential: bool,
    },

    /// Report whether a PDF is text-native or scanned
    Classify {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Score a PDF's text, image, and structure quality
    Analyze {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Redact {
            input,
            output,
            targets,
            targets_file,
            remove_logos,
            placeholders,
            audit_json,
            sequential,
        } => run_redact(
            &input,
            output,
            targets,
            targets_file,
            remove_logos,
            placeholders,
            audit_json,
            sequential,
        ),
        Commands::Classify { input } => run_classify(&input),
        Commands::Analyze { input } => run_analyze(&input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_redact(
    input: &Path,
    output: Option<PathBuf>,
    mut targets: Vec<String>,
    targets_file: Option<PathBuf>,
    remove_logos: bool,
    placeholders: bool,
    audit_json: Option<PathBuf>,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = targets_file {
        targets.extend(read_targets_file(&path)?);
    }
    let target_set = TargetSet::new(&targets)?;

    let mut options = RedactOptions::new()
        .with_logos(remove_logos)
        .with_placeholders(placeholders);
    if sequential {
        options = options.sequential();
    }
    log::debug!("redacting {} with {options:?}", input.display());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .expect("static template"),
    );
    spinner.set_message(format!("redacting {}", input.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let source = SourceDocument::open(input)?;
    let outcome = scrubpdf::redact(&source, &target_set, &options)?;

    spinner.finish_and_clear();

    let output = output.unwrap_or_else(|| default_output(input));
    outcome.write_output(&output)?;

    println!(
        "{} {} -> {}",
        "redacted".green().bold(),
        input.display(),
        output.display()
    );
    print_summary(&outcome.audit);

    for entry in &outcome.audit.entries {
        println!(
            "  {} page {:>3}  {:<28} {}",
            "·".dimmed(),
            entry.page,
            entry.action.to_string().cyan(),
            entry.detail.dimmed()
        );
    }

    if let Some(path) = audit_json {
        fs::write(&path, outcome.audit.to_json()?)?;
        println!("{} audit log written to {}", "·".dimmed(), path.display());
    }

    Ok(())
}

fn print_summary(audit: &scrubpdf::AuditLog) {
    let text = audit.count(ActionKind::TextRedacted);
    let logos = audit.count(ActionKind::LogoRemoved);
    let masked = audit.count(ActionKind::PageRasterizedAndRedacted);
    println!(
        "  {} text redactions, {} logos removed, {} scanned-page actions",
        text.to_string().bold(),
        logos.to_string().bold(),
        masked.to_string().bold()
    );
}

fn run_classify(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = SourceDocument::open(input)?;
    let kind = classify(&source)?;
    println!(
        "{}: {} ({} pages)",
        input.display(),
        kind.to_string().bold(),
        source.page_count()
    );
    Ok(())
}

fn run_analyze(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = SourceDocument::open(input)?;
    let report = analyze(&source)?;

    println!("{}", input.display());
    println!("  text quality:      {}", score_bar(report.text_quality));
    println!("  image quality:     {}", score_bar(report.image_quality));
    println!("  structure quality: {}", score_bar(report.structure_quality));
    println!("  overall:           {}", score_bar(report.overall));
    for note in &report.notes {
        println!("  {} {}", "!".yellow().bold(), note);
    }
    Ok(())
}

fn score_bar(score: u8) -> String {
    let filled = "#".repeat(score as usize);
    let empty = "-".repeat(5usize.saturating_sub(score as usize));
    format!("{}{} {}/5", filled.bold(), empty.dimmed(), score)
}

fn read_targets_file(path: &Path) -> Result<Vec<String>, std::io::Error> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}.redacted.pdf"))
}
