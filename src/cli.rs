use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};

use crate::core::render;
use crate::explorer::{Explorer, RemoteEndpoints};
use crate::persist::SessionStore;
use crate::source::{DEFAULT_API_BASE, DEFAULT_RAW_BASE, OsDirProvider, SourceKind};

pub const DEFAULT_STATE_DIR: &str = ".repotree";

#[derive(Parser, Debug)]
#[command(name = "repotree")]
#[command(about = "Browse a GitHub repository or a local directory as one tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the persisted session record
    #[arg(long, global = true, default_value = DEFAULT_STATE_DIR)]
    pub state_dir: PathBuf,

    /// Base URL of the repository listing API
    #[arg(long, global = true, env = "REPOTREE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Base URL for raw file content
    #[arg(long, global = true, env = "REPOTREE_RAW_BASE", default_value = DEFAULT_RAW_BASE)]
    pub raw_base: String,

    #[arg(long, short, global = true, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Browse a GitHub repository
    Remote {
        /// owner/repo shorthand, a github.com URL, or a blob/tree deep link
        repo: String,
    },
    /// Browse a local directory
    Local {
        /// Root directory to browse
        path: PathBuf,
        /// Levels to materialize below the root (default: all)
        #[arg(long, short = 'L')]
        depth: Option<usize>,
    },
    /// Resume the previously persisted session
    Resume {
        /// Levels to materialize for a local session (default: all)
        #[arg(long, short = 'L')]
        depth: Option<usize>,
    },
    /// Print one file from the persisted session to stdout
    Show {
        /// Slash-delimited path of the file inside the tree
        path: String,
    },
    /// Forget the persisted session
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Silent => None,
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let store = SessionStore::new(&cli.state_dir);
    let endpoints = RemoteEndpoints {
        api_base: cli.api_base.clone(),
        raw_base: cli.raw_base.clone(),
    };
    let mut explorer = Explorer::with_endpoints(store, endpoints);

    match cli.command {
        Command::Remote { repo } => {
            explorer
                .open_remote(&repo)
                .await
                .with_context(|| format!("failed to open repository '{repo}'"))?;
            print_tree(&explorer)?;
        }
        Command::Local { path, depth } => {
            let provider = Arc::new(OsDirProvider::new());
            let reference = path.to_string_lossy().into_owned();
            explorer
                .open_local(provider, &reference)
                .await
                .with_context(|| format!("failed to open directory '{}'", path.display()))?;
            explorer.expand_to_depth(depth).await?;
            print_tree(&explorer)?;
        }
        Command::Resume { depth } => {
            let provider = Arc::new(OsDirProvider::new());
            match explorer
                .resume(provider)
                .await
                .context("failed to resume session")?
            {
                Some(SourceKind::Local) => {
                    explorer.expand_to_depth(depth).await?;
                    print_tree(&explorer)?;
                }
                Some(SourceKind::Remote) => print_tree(&explorer)?,
                None => println!("no saved session"),
            }
        }
        Command::Show { path } => {
            let provider = Arc::new(OsDirProvider::new());
            if explorer
                .resume(provider)
                .await
                .context("failed to resume session")?
                .is_none()
            {
                bail!("no saved session; open a repository or directory first");
            }
            explorer.ensure_path_loaded(&path).await?;
            let content = explorer
                .read_file(&path)
                .await
                .with_context(|| format!("failed to read '{path}'"))?;
            io::stdout().write_all(&content.bytes)?;
        }
        Command::Reset => {
            explorer.reset().await.context("failed to reset session")?;
            println!("session cleared");
        }
    }

    Ok(())
}

fn print_tree(explorer: &Explorer) -> Result<()> {
    let name = explorer.display_name().unwrap_or_else(|| ".".to_owned());
    let entries = explorer.session().entries();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render::write_tree(&mut out, &name, entries)?;

    // Local entries report size 0 until read, so the total only shows when
    // the listing actually carried sizes.
    let total: u64 = entries.iter().map(|e| e.size).sum();
    if total > 0 {
        writeln!(
            out,
            "\n{} entries, {} total",
            entries.len(),
            render::format_size(total)
        )?;
    } else {
        writeln!(out, "\n{} entries", entries.len())?;
    }
    Ok(())
}
