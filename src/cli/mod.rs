//! # CLI Module
//!
//! Thin command-line front end over the engine: one `scan` command
//! drives a full search and prints the grouped results, one
//! `rebuild-cache` command compacts the persisted fingerprint
//! database.
//!
//! ## Usage
//! ```bash
//! # Scan one or more directories for duplicates and defects
//! antidupe scan ~/Photos
//!
//! # Stricter threshold, no rotated/mirrored matching
//! antidupe scan ~/Photos --threshold 2 --no-transforms
//!
//! # JSON output for scripting
//! antidupe scan ~/Photos --output json
//! ```

use antidupe_core::core::engine::{Engine, StateKind};
use antidupe_core::core::comparator::MatchOutcome;
use antidupe_core::core::hint::Hint;
use antidupe_core::core::options::{Options, PathKind};
use antidupe_core::error::Result;
use antidupe_core::events::{Event, EventChannel, FingerprintEvent, ScanEvent, SearchEvent};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use tracing_subscriber::EnvFilter;

/// antidupe - find duplicate and defective images
#[derive(Parser, Debug)]
#[command(name = "antidupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan directories for duplicate and defective images
    Scan {
        /// Directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Directories to skip even when nested under a scanned one
        #[arg(long)]
        ignore: Vec<PathBuf>,

        /// Maximum accepted difference, percent (lower = stricter)
        #[arg(short, long, default_value = "5")]
        threshold: u32,

        /// Skip rotated/mirrored duplicate matching
        #[arg(long)]
        no_transforms: bool,

        /// Use the SSIM comparator instead of squared difference
        #[arg(long)]
        ssim: bool,

        /// Skip defect detection (truncated JPEGs, blockiness, blurring)
        #[arg(long)]
        no_defects: bool,

        /// Also compare images discovered under the same search root
        #[arg(long)]
        inside_folders: bool,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Fingerprint database directory (skips re-decoding on rescans)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Run without the fingerprint database
        #[arg(long)]
        no_cache: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Rebuild the fingerprint database, dropping superseded chunk files
    RebuildCache {
        /// Fingerprint database directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (recommended deletions only)
    Minimal,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("antidupe")
}

/// Run the CLI
pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            paths,
            ignore,
            threshold,
            no_transforms,
            ssim,
            no_defects,
            inside_folders,
            include_hidden,
            output,
            data_dir,
            no_cache,
            verbose,
        } => {
            let mut options = Options::default();
            options.compare.threshold = threshold;
            options.compare.transformed_image = !no_transforms;
            options.compare.use_ssim = ssim;
            options.defect.check_on_defect = !no_defects;
            options.search.compare_inside_one_folder = inside_folders;
            options.search.include_hidden = include_hidden;

            let data_dir = if no_cache { None } else { Some(data_dir.unwrap_or_else(default_data_dir)) };
            run_scan(paths, ignore, options, output, data_dir, verbose)
        }
        Commands::RebuildCache { data_dir } => {
            let dir = data_dir.unwrap_or_else(default_data_dir);
            let mut engine = Engine::new(Options::default());
            engine.clear_database(&dir)?;
            eprintln!(
                "rebuilt fingerprint database under {} ({} records)",
                dir.display(),
                engine.cached_fingerprints()
            );
            Ok(())
        }
    }
}

fn run_scan(
    paths: Vec<PathBuf>,
    ignore: Vec<PathBuf>,
    options: Options,
    output: OutputFormat,
    data_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("antidupe").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let mut engine = Engine::new(options);
    for path in &paths {
        engine.paths_mut(PathKind::Search).add(path.clone());
    }
    for path in &ignore {
        engine.paths_mut(PathKind::Ignore).add(path.clone());
    }

    if let Some(dir) = &data_dir {
        // A missing or corrupt database just means a cold scan.
        let _ = engine.load(StateKind::ImageData, dir);
        let _ = engine.load(StateKind::Mistakes, &dir.join("mistakes.adm"));
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        let mut fingerprinted = 0u64;
        for event in receiver.iter() {
            match event {
                Event::Search(SearchEvent::PhaseChanged { phase }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_message(format!("{phase}"));
                    }
                }
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_length(total_files as u64);
                    }
                }
                Event::Fingerprint(FingerprintEvent::FileFingerprinted { path }) => {
                    fingerprinted += 1;
                    if let Some(ref pb) = progress_clone {
                        pb.set_position(fingerprinted);
                        if verbose {
                            pb.set_message(
                                path.file_name().unwrap_or_default().to_string_lossy().to_string(),
                            );
                        }
                    }
                }
                Event::Search(SearchEvent::Completed { .. }) | Event::Search(SearchEvent::Stopped) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    });

    let summary = engine.search_with_events(&sender);
    drop(sender);
    event_thread.join().ok();
    let summary = summary?;

    if let Some(dir) = &data_dir {
        std::fs::create_dir_all(dir).ok();
        engine.save(StateKind::ImageData, dir)?;
    }

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &engine, &summary, verbose),
        OutputFormat::Json => print_json_results(&engine, &summary),
        OutputFormat::Minimal => print_minimal_results(&engine),
    }

    Ok(())
}

fn describe(result: &MatchOutcome) -> String {
    match result {
        MatchOutcome::Duplicate { difference, transform, .. } => {
            if matches!(transform, antidupe_core::core::fingerprint::Transform::Turn0) {
                format!("{difference:.2}% different")
            } else {
                format!("{difference:.2}% different ({transform:?})")
            }
        }
        MatchOutcome::Defect { defect, .. } => format!("{defect:?}"),
    }
}

fn hint_line(result: &MatchOutcome) -> Option<String> {
    match result {
        MatchOutcome::Duplicate { first, second, hint, .. } => match hint {
            Some(Hint::DeleteFirst) => Some(format!("delete {}", first.path.display())),
            Some(Hint::DeleteSecond) => Some(format!("delete {}", second.path.display())),
            Some(Hint::RenameFirstToSecond) => Some(format!(
                "replace {} with {}",
                second.path.display(),
                first.path.display()
            )),
            Some(Hint::RenameSecondToFirst) => Some(format!(
                "replace {} with {}",
                first.path.display(),
                second.path.display()
            )),
            None => None,
        },
        MatchOutcome::Defect { image, .. } => Some(format!("delete {}", image.path.display())),
    }
}

fn print_pretty_results(
    term: &Term,
    engine: &Engine,
    summary: &antidupe_core::events::SearchSummary,
    verbose: bool,
) {
    term.write_line("").ok();
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold())).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images scanned in {:.1}s",
        style(summary.total_files).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate pairs in {} groups",
        style(summary.duplicate_count).cyan(),
        style(summary.duplicate_groups).cyan()
    ))
    .ok();
    if summary.defect_count > 0 {
        term.write_line(&format!(
            "  {} possibly defective images",
            style(summary.defect_count).yellow()
        ))
        .ok();
    }
    term.write_line("").ok();

    if engine.groups().is_empty() {
        term.write_line(&format!("  {} Nothing found!", style("🎉").green())).ok();
        return;
    }

    term.write_line(&format!("{}", style("Groups:").bold().underlined())).ok();
    term.write_line("").ok();

    for group in engine.groups() {
        term.write_line(&format!(
            "  {} ({} images)",
            style(format!("Group {}:", group.id + 1)).bold(),
            group.images.len()
        ))
        .ok();
        for image in &group.images {
            term.write_line(&format!("    {} {}", style("○").dim(), image.path.display())).ok();
        }
        for result in &group.results {
            term.write_line(&format!("    {}", style(describe(result)).yellow())).ok();
            if verbose {
                if let Some(hint) = hint_line(result) {
                    term.write_line(&format!("    {} {}", style("Recommended:").dim(), style(hint).dim()))
                        .ok();
                }
            }
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("No files were touched. Review the recommendations before acting on them.").dim()
    ))
    .ok();
}

fn print_json_results(engine: &Engine, summary: &antidupe_core::events::SearchSummary) {
    let output = serde_json::json!({
        "total_files": summary.total_files,
        "duplicate_pairs": summary.duplicate_count,
        "duplicate_groups": summary.duplicate_groups,
        "defects": summary.defect_count,
        "duration_ms": summary.duration_ms,
        "groups": engine.groups().iter().map(|g| {
            serde_json::json!({
                "id": g.id,
                "images": g.images.iter().map(|i| i.path.clone()).collect::<Vec<_>>(),
                "results": g.results.iter().map(|r| {
                    match r {
                        MatchOutcome::Duplicate { first, second, difference, transform, .. } => {
                            serde_json::json!({
                                "kind": "duplicate",
                                "first": first.path,
                                "second": second.path,
                                "difference": difference,
                                "transform": format!("{transform:?}"),
                                "recommended": hint_line(r),
                            })
                        }
                        MatchOutcome::Defect { image, defect } => {
                            serde_json::json!({
                                "kind": "defect",
                                "image": image.path,
                                "defect": format!("{defect:?}"),
                            })
                        }
                    }
                }).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>()
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn print_minimal_results(engine: &Engine) {
    for result in engine.results() {
        if let Some(hint) = hint_line(result) {
            if let Some(path) = hint.strip_prefix("delete ") {
                println!("{path}");
            }
        }
    }
}
