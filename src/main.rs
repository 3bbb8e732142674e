mod config;
mod db;
mod error;
mod export;
mod fetch;
mod infer;
mod lookup;
mod merge;
mod model;
mod parser;
mod pipeline;
mod quality;
mod repair;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use config::Settings;
use db::SqliteStore;
use fetch::{DirFetcher, Fetcher, HttpFetcher};
use merge::{CanonicalSet, DuplicatePolicy, Resolution};
use model::{CanonicalRecord, SourceDocument};
use pipeline::{BatchControl, BatchRunner, RunState, TokioPacer};

#[derive(Parser)]
#[command(name = "tech_ingest", about = "Technology disclosure ingestion and normalization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize, score and store a batch of identifiers
    Run {
        /// Identifiers separated by commas, spaces or newlines
        #[arg(long, conflicts_with = "ids_file")]
        ids: Option<String>,
        /// File with identifiers (same separators)
        #[arg(long)]
        ids_file: Option<PathBuf>,
        /// Delay between items in milliseconds (default from config)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Read documents from <dir>/<id>.md instead of fetching over HTTP
        #[arg(long, conflicts_with = "base_url")]
        source_dir: Option<PathBuf>,
        /// URL template with {id} placeholder
        #[arg(long)]
        base_url: Option<String>,
        /// Duplicate handling when an id is already stored
        #[arg(long, default_value = "prompt")]
        policy: DuplicatePolicy,
        /// Existing canonical batch (JSON or CSV); its records win over fetched ones
        #[arg(long)]
        existing: Option<PathBuf>,
        /// Write the merged canonical set as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Write the merged canonical set as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write failed identifiers, one per line
        #[arg(long)]
        failed_out: Option<PathBuf>,
        /// Skip the database import
        #[arg(long)]
        no_store: bool,
    },
    /// Run a single document file through the pipeline
    Process {
        file: PathBuf,
        /// External identifier (default: file stem)
        #[arg(long)]
        id: Option<String>,
        /// Also print base and category-overlay fields separately
        #[arg(long)]
        fields: bool,
    },
    /// Merge batches, earliest file wins on duplicate ids
    Merge {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Quality reports for a JSON/CSV batch
    Score {
        input: PathBuf,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Dump stored records as CSV or JSON (by extension)
    Export {
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("loading configuration")?;

    let result = match cli.command {
        Commands::Run {
            ids,
            ids_file,
            interval_ms,
            source_dir,
            base_url,
            policy,
            existing,
            csv,
            json,
            failed_out,
            no_store,
        } => {
            let raw = match (ids, ids_file) {
                (Some(list), _) => list,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => String::new(),
            };
            let id_list = fetch::parse_id_list(&raw);

            if let Some(url) = base_url {
                settings.fetch.url_template = url;
            }
            if let Some(ms) = interval_ms {
                settings.fetch.interval_ms = ms;
            }

            let fetcher: Box<dyn Fetcher> = match source_dir {
                Some(dir) => Box::new(DirFetcher::new(dir)),
                None => Box::new(HttpFetcher::new(
                    settings.fetch.url_template.clone(),
                    Duration::from_secs(settings.fetch.timeout_secs),
                )?),
            };

            let mut set = match &existing {
                Some(path) => merge::merge([export::load_batch(path)?]).set,
                None => CanonicalSet::new(),
            };
            let existing_count = set.len();

            // First Ctrl-C stops the batch after the current item. Once the batch is
            // stopped or finished, Ctrl-C exits the process.
            let control = BatchControl::new();
            let on_signal = control.clone();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if on_signal.interrupt() {
                        warn!("interrupt received, stopping after the current item (Ctrl-C again to exit)");
                    } else {
                        warn!("interrupted");
                        std::process::exit(130);
                    }
                }
            });
            #[cfg(unix)]
            spawn_pause_toggle(control.clone());

            println!(
                "Processing {} identifiers ({} existing records)...",
                id_list.len(),
                existing_count
            );
            let pacer = TokioPacer;
            let runner = BatchRunner::new(fetcher.as_ref(), &pacer, &settings)
                .with_control(control.clone())
                .with_progress(progress_bar(id_list.len()));
            let summary = runner.run(&id_list, &mut set).await;
            control.stop();
            let summary = summary?;

            println!(
                "Done: {} succeeded, {} skipped, {} failed{}.",
                summary.succeeded,
                summary.skipped.len(),
                summary.failed.len(),
                if summary.stopped { " (stopped early)" } else { "" }
            );
            for (id, reason) in &summary.failed {
                println!("  failed {}: {}", id, reason);
            }
            let invalid = summary.processed.iter().filter(|p| !p.report.is_valid()).count();
            if invalid > 0 {
                println!("{} records have validation errors (see `score`).", invalid);
            }

            if let Some(path) = &failed_out {
                summary.write_failed_ids(path)?;
                println!("Failed ids written to {}", path.display());
            }
            for path in [csv.as_deref(), json.as_deref()].into_iter().flatten() {
                export::save_batch(path, set.records())?;
                println!("Wrote {} records to {}", set.len(), path.display());
            }

            if !no_store {
                let mut store = SqliteStore::open(&settings.db_path.0)?;
                let imported = pipeline::persist(
                    &mut store,
                    &summary.processed,
                    &summary.failed,
                    &settings.import,
                    policy,
                    &mut prompt_resolver,
                );
                println!(
                    "Stored: {} inserted, {} overwritten, {} skipped, {} failed.",
                    imported.inserted,
                    imported.overwritten,
                    imported.skipped,
                    imported.failed.len()
                );
            }
            Ok(())
        }
        Commands::Process { file, id, fields } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let id = id.unwrap_or_else(|| file_stem(&file));
            let doc = SourceDocument::new(id, fetch::strip_images(&text));
            let processed = pipeline::process_document(&doc, &settings);

            let category = processed.provenance.category;
            println!("Category: {}", category);
            if fields {
                println!("\n--- Base fields ---");
                println!("{:#?}", parser::extract::extract_base(&doc));
                println!("\n--- {} overlay ---", category);
                println!("{:#?}", parser::extract::extract_for(category, &doc));
            }
            for r in &processed.repairs {
                println!("  repair: {}", r);
            }
            for e in &processed.enhancements {
                println!("  enhance: {}", e);
            }
            println!("\n{}", serde_json::to_string_pretty(&processed.record)?);
            println!("\n{}", serde_json::to_string_pretty(&processed.provenance)?);
            println!("\n{}", serde_json::to_string_pretty(&processed.report)?);
            Ok(())
        }
        Commands::Merge { inputs, out } => {
            let batches = inputs
                .iter()
                .map(|p| export::load_batch(p))
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = merge::merge(batches);
            if outcome.set.is_empty() {
                println!("No records with an id in the inputs; {} not written.", out.display());
                return Ok(());
            }
            export::save_batch(&out, outcome.set.records())?;
            println!(
                "Merged {} records into {} ({} duplicates dropped, {} without id).",
                outcome.set.len(),
                out.display(),
                outcome.duplicates.len(),
                outcome.missing_id
            );
            Ok(())
        }
        Commands::Score { input, limit } => {
            let records = export::load_batch(&input)?;
            if records.is_empty() {
                println!("No records in {}.", input.display());
                return Ok(());
            }

            println!(
                "{:>8} | {:<36} | {:>6} | {:<17} | {:>3} | {:>3}",
                "ID", "Technology", "Score", "Level", "Err", "Wrn"
            );
            println!("{}", "-".repeat(90));

            let mut total = 0.0;
            for (i, record) in records.iter().enumerate() {
                let report = quality::score(record);
                total += report.score;
                if i >= limit {
                    continue;
                }
                println!(
                    "{:>8} | {:<36} | {:>6.2} | {:<17} | {:>3} | {:>3}",
                    truncate(&report.id, 8),
                    truncate(&record.technology_name_en, 36),
                    report.score,
                    report.level.as_str(),
                    report.errors.len(),
                    report.warnings.len()
                );
            }
            println!(
                "\n{} records | average score {:.1}",
                records.len(),
                total / records.len() as f64
            );
            Ok(())
        }
        Commands::Export { out } => {
            let store = SqliteStore::open(&settings.db_path.0)?;
            let records = store.all_records()?;
            export::save_batch(&out, &records)?;
            println!("Exported {} records to {}", records.len(), out.display());
            Ok(())
        }
        Commands::Stats => {
            let store = SqliteStore::open(&settings.db_path.0)?;
            let s = store.stats()?;
            println!("Technologies: {}", s.technologies);
            println!("Owners:       {}", s.owners);
            println!("Failures:     {}", s.failures);
            if !s.by_source.is_empty() {
                println!("\nBy source:");
                for (tag, count) in &s.by_source {
                    println!("  {:<32} {}", tag, count);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!(elapsed = %format_duration(elapsed), "finished");
    }

    result
}

/// SIGUSR1 toggles pause/resume of a running batch.
#[cfg(unix)]
fn spawn_pause_toggle(control: BatchControl) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let Ok(mut usr1) = signal(SignalKind::user_defined1()) else {
            return;
        };
        while usr1.recv().await.is_some() {
            match control.state() {
                RunState::Running => {
                    info!("pause requested");
                    control.pause();
                }
                RunState::Paused => {
                    info!("resuming");
                    control.resume();
                }
                RunState::Stopped => break,
            }
        }
    });
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Interactive duplicate resolution on stdin. Anything but "y" keeps the stored record.
fn prompt_resolver(existing: &CanonicalRecord, candidate: &CanonicalRecord) -> Resolution {
    println!("\nDuplicate id {}:", candidate.id);
    println!(
        "  stored:   {} ({})",
        truncate(&existing.technology_name_en, 60),
        existing.company_name
    );
    println!(
        "  incoming: {} ({})",
        truncate(&candidate.technology_name_en, 60),
        candidate.company_name
    );
    print!("Overwrite stored record? [y/N] ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return Resolution::KeepExisting;
    }
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Resolution::UseCandidate,
        _ => Resolution::KeepExisting,
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
