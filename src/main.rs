use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use filerescue::config::settings::Settings;
use filerescue::core::control::JobGate;
use filerescue::core::details::FileDetails;
use filerescue::core::events::{self, Event};
use filerescue::core::recovery::{Confirm, Layout, RecoveryEngine};
use filerescue::core::scanner::ScanEngine;
use filerescue::core::session::{self, SessionStore};
use filerescue::core::volumes;
use filerescue::export;
use filerescue::models::category::Category;
use filerescue::models::record::FileStatus;
use filerescue::models::scan_result::ScanState;
use filerescue::models::stats::{format_count, human_duration, human_readable_size};

#[derive(Parser, Debug)]
#[command(
    name = "filerescue",
    version,
    about = "Scan folders for intact and damaged files and copy them to safety"
)]
struct Cli {
    /// Settings file (default: <data dir>/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List mounted volumes with free/total space
    Volumes,

    /// Scan a folder without the interactive UI
    Scan {
        root: PathBuf,

        /// File category to keep (All, Pictures, Documents, ...)
        #[arg(short, long, default_value = "All")]
        category: Category,

        /// Skip files larger than this many bytes
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Follow symbolic links
        #[arg(long)]
        follow_symlinks: bool,

        /// Save the results as a session file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Write the file list as CSV
        #[arg(long)]
        export_csv: Option<PathBuf>,

        /// Write the full results as JSON
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Write a Markdown report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Interactive scan monitor and result browser
    Tui {
        root: PathBuf,

        #[arg(short, long, default_value = "All")]
        category: Category,
    },

    /// Copy files from a saved session to a destination folder
    Recover {
        /// Session file written by `scan --save`
        #[arg(long)]
        session: PathBuf,

        /// Destination folder (default: recovery folder from settings)
        #[arg(long)]
        dest: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = LayoutArg::Flat)]
        layout: LayoutArg,

        /// Which records to recover
        #[arg(long, value_enum, default_value_t = StatusArg::Good)]
        status: StatusArg,

        /// Recover damaged files without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Show size, times, attributes and hash of a file
    Details { file: PathBuf },

    /// List sessions saved from the TUI
    Sessions {
        /// Delete every saved session instead of listing them
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Flat,
    Structured,
    Metadata,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusArg {
    Good,
    All,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("reading {}", settings_path.display()))?;

    init_tracing(&cli.command, &settings)?;

    match cli.command {
        Command::Volumes => print_volumes(),
        Command::Scan {
            root,
            category,
            max_file_size,
            follow_symlinks,
            save,
            export_csv,
            export_json,
            report,
        } => {
            let mut settings = settings;
            if let Some(max) = max_file_size {
                settings.max_file_size = max;
            }
            settings.follow_symlinks |= follow_symlinks;
            let outputs = ScanOutputs {
                save,
                export_csv,
                export_json,
                report,
            };
            run_scan(root, category, settings, outputs).await
        }
        Command::Tui { root, category } => {
            let root = std::fs::canonicalize(&root)
                .with_context(|| format!("cannot open {}", root.display()))?;
            let mut app = filerescue::app::App::new(root, category, settings);
            app.run().await
        }
        Command::Recover {
            session,
            dest,
            layout,
            status,
            yes,
        } => {
            let dest = dest.unwrap_or_else(|| settings.recovery_folder.clone());
            run_recover(session, dest, layout, status, yes).await
        }
        Command::Sessions { clear } => {
            let store = SessionStore::new(settings.sessions_dir());
            if clear {
                store.clear().await?;
                println!("Removed saved sessions from {}", settings.sessions_dir().display());
                return Ok(());
            }
            let sessions = store.list().await?;
            if sessions.is_empty() {
                println!("No saved sessions");
            }
            for entry in sessions {
                println!(
                    "{}  {}  {} files ({} recoverable, {} damaged)\n    {}",
                    entry.meta.captured_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                    entry.meta.root_path.display(),
                    format_count(entry.meta.total_files),
                    format_count(entry.meta.recoverable_count),
                    format_count(entry.meta.damaged_count),
                    entry.path.display(),
                );
            }
            Ok(())
        }
        Command::Details { file } => {
            let details = FileDetails::inspect(&file);
            for (label, value) in details.lines() {
                println!("{:<11} {}", format!("{}:", label), value);
            }
            Ok(())
        }
    }
}

/// Logs go to stderr, except in the TUI where they go to a file.
fn init_tracing(command: &Command, settings: &Settings) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env());

    if matches!(command, Command::Tui { .. }) {
        std::fs::create_dir_all(&settings.data_dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(settings.log_path())?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        builder.with_writer(std::io::stderr).init();
    }
    Ok(())
}

fn print_volumes() -> anyhow::Result<()> {
    let volumes = volumes::list_volumes();
    println!(
        "{:<28} {:<28} {:<10} {:>12} {:>12}",
        "DEVICE", "MOUNT", "TYPE", "FREE", "TOTAL"
    );
    for v in volumes {
        let size = |b: Option<u64>| b.map(human_readable_size).unwrap_or_else(|| "unknown".into());
        println!(
            "{:<28} {:<28} {:<10} {:>12} {:>12}",
            v.device_id,
            v.mount_point.display(),
            v.fs_type,
            size(v.free_bytes),
            size(v.total_bytes),
        );
    }
    Ok(())
}

struct ScanOutputs {
    save: Option<PathBuf>,
    export_csv: Option<PathBuf>,
    export_json: Option<PathBuf>,
    report: Option<PathBuf>,
}

async fn run_scan(
    root: PathBuf,
    category: Category,
    settings: Settings,
    outputs: ScanOutputs,
) -> anyhow::Result<()> {
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("cannot open {}", root.display()))?;
    let (event_tx, mut event_rx) = events::create_event_channel();
    let engine = ScanEngine::new(settings, event_tx);
    engine.start(root.clone(), category)?;

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(Event::Progress { percent, status, current_path, .. }) => {
                    info!("{:>5.1}% {} ({})", percent, status, current_path.display());
                }
                Some(Event::ScanFinished { .. }) | None => break,
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping scan");
                engine.cancel();
            }
        }
    }

    let summary = engine.wait().await;
    let took = summary
        .stats
        .duration()
        .map(human_duration)
        .unwrap_or_default();
    println!("{:?}: {} in {}", summary.state, summary.stats.summary_line(), took);
    if summary.issue_count > 0 {
        println!("{} files or folders could not be read", summary.issue_count);
    }
    if let Some(failure) = &summary.failure {
        eprintln!("Scan failed: {}", failure);
    }

    if let Some(snapshot) = engine.snapshot() {
        if let Some(path) = &outputs.save {
            session::save(&snapshot, path).await?;
            println!("Session saved to: {}", path.display());
        }
        if let Some(path) = &outputs.export_csv {
            let rows = export::list::export_list(&snapshot.files, path)?;
            println!("Exported {} rows to: {}", rows, path.display());
        }
        if let Some(path) = &outputs.export_json {
            export::json::export_json(&snapshot, path)?;
            println!("Exported to: {}", path.display());
        }
        if let Some(path) = &outputs.report {
            export::markdown::export_markdown(&snapshot, &engine.issues(), path)?;
            println!("Report written to: {}", path.display());
        }
    }

    if summary.state == ScanState::Failed {
        anyhow::bail!("scan of {} failed", root.display());
    }
    Ok(())
}

async fn run_recover(
    session_path: PathBuf,
    dest: PathBuf,
    layout: LayoutArg,
    status: StatusArg,
    yes: bool,
) -> anyhow::Result<()> {
    let snapshot = session::load(&session_path)
        .await
        .with_context(|| format!("loading {}", session_path.display()))?;
    let records: Vec<_> = snapshot
        .files
        .into_iter()
        .filter(|r| matches!(status, StatusArg::All) || r.status == FileStatus::Good)
        .collect();
    if records.is_empty() {
        println!("Nothing to recover");
        return Ok(());
    }

    std::fs::create_dir_all(&dest).with_context(|| format!("creating {}", dest.display()))?;
    let layout = match layout {
        LayoutArg::Flat => Layout::Flat,
        LayoutArg::Structured => Layout::Structured {
            scan_root: snapshot.root_path.clone(),
        },
        LayoutArg::Metadata => Layout::FlatWithMetadata,
    };

    let confirm: Arc<dyn Confirm> = if yes {
        Arc::new(|_: &str, _: FileStatus| true)
    } else {
        Arc::new(ask_on_stdin)
    };

    let (event_tx, _event_rx) = events::create_event_channel();
    let engine = RecoveryEngine::new(event_tx, JobGate::new());
    let report = engine.spawn(records, dest.clone(), layout, confirm)?.await?;

    println!("{} in {}", report.summary_line(), dest.display());
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.source.display(), failure.reason);
    }
    Ok(())
}

fn ask_on_stdin(name: &str, status: FileStatus) -> bool {
    print!(
        "File {} appears to be {}. Attempt recovery anyway? [y/N] ",
        name,
        status.label().to_lowercase()
    );
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes" | "Yes")
}
