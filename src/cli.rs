use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use captain_hooks::config::Config;
use captain_hooks::core::{
    Engine, HookGroup, HookKind, HookSet, HookUsage, LiveLog, LiveMarker, LiveModeStore, ScanResult,
};

const CONFIG_FILE_NAME: &str = "captain-hooks.toml";

#[derive(Parser)]
#[command(name = "captain-hooks")]
#[command(about = "Find the actions, filters and shortcodes a PHP codebase exposes")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// List the hooks declared under a folder
    Scan {
        /// Folder to scan
        path: PathBuf,

        /// Ignore cached results and rescan
        #[arg(long)]
        refresh: bool,

        /// Do not store the scan result
        #[arg(long)]
        no_cache: bool,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// List the hooks declared in a single file
    File {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Print a file from a scanned folder
    Preview {
        /// Scanned folder
        root: PathBuf,

        /// Path relative to the folder, as reported by `scan`
        file: String,
    },

    /// Observe hook invocations
    Live {
        #[command(subcommand)]
        command: LiveCommands,
    },
}

#[derive(Subcommand)]
pub enum LiveCommands {
    /// Start observing a hook for the configured window
    Mark {
        hook: String,

        #[arg(long)]
        kind: HookKind,

        #[arg(long, default_value_t = 1)]
        num_args: usize,
    },

    /// List hooks currently being observed
    Active,

    /// Record one invocation; each argument is parsed as JSON, else kept as a string
    Record {
        hook: String,

        #[arg(long)]
        kind: HookKind,

        args: Vec<String>,
    },

    /// Show recorded invocations, newest first
    Logs {
        hook: String,

        #[arg(long)]
        kind: HookKind,

        /// Only the newest entry recorded after this RFC 3339 timestamp
        #[arg(long)]
        latest: Option<DateTime<Utc>>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let config = Config::load_or_default(self.config.as_ref())?;

        match self.command {
            Commands::Init { path } => init(path),
            Commands::Scan { path, refresh, no_cache, format } => {
                let mut engine = Engine::new(config)?;
                let result = engine
                    .get_path_hooks(&path, refresh, !no_cache)
                    .with_context(|| format!("Failed to scan {}", path.display()))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                    OutputFormat::Text => print!("{}", render_scan(&result)),
                }
                Ok(())
            }
            Commands::File { file, format } => {
                let source = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let mut engine = Engine::new(config)?;
                let hooks = engine.get_hooks_for_source(&source)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hooks)?),
                    OutputFormat::Text => print!("{}", render_hook_set(&hooks)),
                }
                Ok(())
            }
            Commands::Preview { root, file } => {
                let engine = Engine::new(config)?;
                let preview = engine.preview_file(&root, &file)?;
                print!("{}", preview.code);
                Ok(())
            }
            Commands::Live { command } => live(LiveModeStore::new(&config.live_mode), command),
        }
    }
}

fn init(path: Option<PathBuf>) -> Result<()> {
    let dir = path.unwrap_or_else(|| PathBuf::from("."));
    let target = dir.join(CONFIG_FILE_NAME);
    if target.exists() {
        bail!("{} already exists", target.display());
    }

    fs::create_dir_all(&dir)?;
    Config::default().save(&target)?;
    info!("Wrote {}", target.display());
    Ok(())
}

fn live(store: LiveModeStore, command: LiveCommands) -> Result<()> {
    let now = Utc::now();

    match command {
        LiveCommands::Mark { hook, kind, num_args } => {
            let marker = store.mark(&hook, kind, num_args, now)?;
            println!("{}", render_marker(&marker));
        }
        LiveCommands::Active => {
            for marker in store.active_markers(now)? {
                println!("{}", render_marker(&marker));
            }
        }
        LiveCommands::Record { hook, kind, args } => {
            let args = args
                .into_iter()
                .map(|arg| serde_json::from_str(&arg).unwrap_or(Value::String(arg)))
                .collect();
            if let Some(value) = store.record_invocation(&hook, kind, args, now)? {
                println!("{}", value);
            }
        }
        LiveCommands::Logs { hook, kind, latest } => {
            let logs: Vec<LiveLog> = store.logs(&hook, kind, latest)?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
    }

    Ok(())
}

fn render_marker(marker: &LiveMarker) -> String {
    format!(
        "{} {} ({} args) until {}",
        marker.kind,
        marker.hook,
        marker.num_args,
        marker.expiry.to_rfc3339()
    )
}

fn render_scan(result: &ScanResult) -> String {
    let mut out = String::new();
    for (title, groups) in [
        ("Actions", &result.actions),
        ("Filters", &result.filters),
        ("Shortcodes", &result.shortcodes),
    ] {
        out.push_str(&format!("{} ({})\n", title, groups.len()));
        for group in groups {
            out.push_str(&render_group(group));
        }
        out.push('\n');
    }
    for warning in &result.warnings {
        out.push_str(&format!("warning: {}\n", warning));
    }
    out
}

fn render_group(group: &HookGroup) -> String {
    let mut out = format!("  {} [{} args]\n", group.hook_name, group.arg_count);
    for usage in &group.usages {
        out.push_str(&format!("    {}\n", render_location(usage)));
    }
    out
}

fn render_hook_set(hooks: &HookSet) -> String {
    hooks
        .iter()
        .map(|usage| format!("{} {} {}\n", usage.kind, usage.hook_name, render_location(usage)))
        .collect()
}

fn render_location(usage: &HookUsage) -> String {
    let location = if usage.file.is_empty() {
        format!("line {}", usage.line_start)
    } else {
        format!("{}:{}", usage.file, usage.line_start)
    };
    if usage.source_code.is_empty() {
        location
    } else {
        format!("{}  {}", location, usage.source_code)
    }
}
