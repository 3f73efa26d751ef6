//! CLI entry point for cardmark.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardmark_app::{ProjectConfig, Repository};
use cardmark_plugins::PluginRegistry;
use cardmark_store_fs::{FsStorage, SingleFileStorage, Storage};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Kanban cards kept in the files they describe.
#[derive(Parser, Debug)]
#[command(
    name = "cardmark",
    version,
    about = "cardmark: task cards read from and written back to markdown and code comments"
)]
struct Cli {
    /// Project root (defaults to current directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Work on one file instead of the whole project.
    #[arg(long, conflicts_with = "root")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show configured lists with their task counts.
    Lists,

    /// List tasks, optionally of one list.
    Ls {
        /// List to show; every list when omitted.
        list: Option<String>,
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Move a task to a position of a list.
    Mv {
        /// Task id, or `path:line` of its title.
        task: String,
        /// Target list.
        list: String,
        /// Zero-based position in the target list (defaults to the end).
        #[arg(short, long)]
        position: Option<usize>,
    },

    /// Add a task to a file.
    Add {
        /// Target list.
        list: String,
        /// Title text.
        text: String,
        /// File to add to, relative to the root.
        #[arg(long, default_value = "TODO.md")]
        to: PathBuf,
        /// Explicit order.
        #[arg(long)]
        order: Option<f64>,
        /// Body lines.
        #[arg(short = 'd', long = "description")]
        description: Vec<String>,
    },

    /// Follow file changes and print index events until interrupted.
    Watch,
}

/// Output format for `ls`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    /// One line per task.
    Table,
    /// JSON array of tasks.
    Json,
}

fn main() -> Result<()> {
    let Cli { root, file, cmd } = Cli::parse();
    install_tracing();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    if let Some(file) = file {
        let root = file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), PathBuf::from);
        let config = ProjectConfig::from_workdir(&root)?;
        let storage = SingleFileStorage::new(&file)?;
        runtime.block_on(execute(storage, config, cmd))
    } else {
        let root = root.unwrap_or_else(|| PathBuf::from("."));
        let config = ProjectConfig::from_workdir(&root)?;
        let storage = FsStorage::new(&root, &config.board.exclude)?;
        runtime.block_on(execute(storage, config, cmd))
    }
}

async fn execute<S: Storage>(storage: S, config: ProjectConfig, cmd: Command) -> Result<()> {
    let ProjectConfig { board, plugins } = config;
    let repo = Repository::new(storage, board, PluginRegistry::new(plugins));
    let report = repo.init().await?;
    for (path, reason) in &report.failed {
        tracing::warn!(path = %path.display(), reason = %reason, "File skipped");
    }
    commands::run(&repo, cmd).await
}

fn install_tracing() {
    // RUST_LOG overrides; INFO otherwise.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
