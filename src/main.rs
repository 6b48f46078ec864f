//! Journal Log View - Entry Point
//!
//! Loads a `journalctl -o json` export, applies a filter and prints one window
//! of entries (or the whole filtered journal with `--all`).

use clap::Parser;
use jlv::config::{self, CliOverrides, ResolvedConfig};
use jlv::model::error::AppError;
use jlv::model::{BootId, FilterSpec, LogEntry, Priority};
use jlv::source::{Direction, ExportFileProvider, JournalProvider};
use jlv::state::JournalView;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Boot selector meaning "the boot of the newest entry".
const CURRENT_BOOT: &str = "current";

/// Journal Log View - filtered, windowed journal output
#[derive(Parser, Debug)]
#[command(name = "jlv")]
#[command(version)]
#[command(about = "Print a filtered window of a journalctl JSON export")]
pub struct Args {
    /// Path to a `journalctl -o json` export ("-" reads stdin)
    pub file: PathBuf,

    /// Only entries from this boot id ("current" for the newest boot); repeatable
    #[arg(short, long = "boot", value_parser = parse_boot)]
    pub boots: Vec<String>,

    /// Only entries from this system unit; repeatable
    #[arg(short, long = "unit")]
    pub units: Vec<String>,

    /// Only entries from this user unit; repeatable
    #[arg(long = "user-unit")]
    pub user_units: Vec<String>,

    /// Only entries from this executable path; repeatable
    #[arg(short, long = "exe")]
    pub exes: Vec<String>,

    /// Priority ceiling: 0-7 or a keyword (emerg, alert, crit, err, warning, notice, info, debug)
    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Include kernel messages
    #[arg(short, long)]
    pub kernel: bool,

    /// Start at the newest entries
    #[arg(short, long)]
    pub tail: bool,

    /// Only print entries whose message contains this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Match --search case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Entries read per fetch
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: Option<u32>,

    /// Keep fetching until the whole filtered journal is loaded
    #[arg(short, long)]
    pub all: bool,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_boot(raw: &str) -> Result<String, String> {
    BootId::new(raw)
        .map(|_| raw.trim().to_string())
        .map_err(|e| e.to_string())
}

impl Args {
    fn cli_overrides(&self) -> CliOverrides {
        CliOverrides {
            chunk_size: self.chunk_size.map(|n| n as usize),
            show_kernel_messages: self.kernel.then_some(true),
            priority_ceiling: self.priority,
            start_at_tail: self.tail.then_some(true),
        }
    }

    /// Filter described by the selector flags and the resolved defaults.
    fn filter_spec(&self, config: &ResolvedConfig, current_boot: Option<BootId>) -> FilterSpec {
        let mut boots = Vec::new();
        for raw in &self.boots {
            if raw == CURRENT_BOOT {
                match &current_boot {
                    Some(boot) => boots.push(boot.clone()),
                    None => warn!("No current boot known; ignoring --boot current"),
                }
            } else if let Ok(boot) = BootId::new(raw.as_str()) {
                boots.push(boot);
            }
        }
        FilterSpec::new()
            .with_boots(boots)
            .with_priority_ceiling(config.priority_ceiling)
            .with_kernel_messages(config.show_kernel_messages)
            .with_system_units(self.units.iter().cloned())
            .with_user_units(self.user_units.iter().cloned())
            .with_executables(self.exes.iter().cloned())
    }
}

fn resolve_config(args: &Args) -> Result<ResolvedConfig, AppError> {
    // Defaults → Config File → Env Vars → CLI Args
    let config_file = config::load_config_with_precedence(args.config.clone())?;
    let merged = config::merge_config(config_file);
    let with_env = config::apply_env_overrides(merged);
    Ok(config::apply_cli_overrides(with_env, args.cli_overrides()))
}

fn load_provider(args: &Args) -> Result<ExportFileProvider, AppError> {
    if args.file.as_os_str() == "-" {
        let stdin = io::stdin();
        return Ok(ExportFileProvider::from_reader(stdin.lock(), "-")?);
    }
    Ok(ExportFileProvider::load(&args.file)?)
}

/// Entries to print, oldest first.
fn collect_output(view: &JournalView, args: &Args, start_at_tail: bool) -> Vec<LogEntry> {
    let Some(needle) = args.search.as_deref() else {
        return view.entries();
    };

    let mut found = Vec::new();
    if start_at_tail {
        let mut row = view.row_count().saturating_sub(1);
        while let Some(hit) = view.search(needle, row, args.case_sensitive, Direction::TowardsHead) {
            found.extend(view.row_at(hit));
            if hit > 0 {
                row = hit - 1;
                continue;
            }
            // Hit on the first buffered row: grow the head before searching on.
            if !view.can_fetch_more() {
                break;
            }
            let fetched = view.fetch_more();
            if fetched.head == 0 {
                break;
            }
            row = fetched.head - 1;
        }
        found.reverse();
    } else {
        let mut row = 0;
        while let Some(hit) = view.search(needle, row, args.case_sensitive, Direction::TowardsTail) {
            found.extend(view.row_at(hit));
            row = hit + 1;
        }
    }
    found
}

fn run(args: Args) -> Result<(), AppError> {
    let config = resolve_config(&args)?;
    jlv::logging::init(&config.log_file_path)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let provider = load_provider(&args)?;
    let view = JournalView::open(&provider, config.chunk_size);
    let spec = args.filter_spec(&config, provider.current_boot_id());
    view.set_filter(spec);
    if config.start_at_tail {
        view.seek_tail();
    }
    if args.all {
        while view.can_fetch_more() {
            if view.fetch_more().is_empty() {
                break;
            }
        }
    }

    let entries = collect_output(&view, &args, config.start_at_tail);
    info!(rows = view.row_count(), printed = entries.len(), "Writing entries");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for entry in &entries {
        writeln!(out, "{}", entry.display_line())?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    run(Args::parse())?;
    Ok(())
}
