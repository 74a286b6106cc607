//! Clap derive structures for the `waterpanel` CLI.
//!
//! Kept free of workspace crates so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// waterpanel -- live readout for the water-pump control panel
#[derive(Debug, Parser)]
#[command(
    name = "waterpanel",
    version,
    about = "Live readout for the water-pump control panel",
    long_about = "Shows the panel's live value from either the local MQTT broker\n\
        (currentInjector on /v1/device/+/rawdata) or the REST tag service (Flow_1).\n\n\
        The connection is validated before use, and after repeated failures\n\
        you are asked to choose a connection again.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (state.toml is kept next to it)
    #[arg(long, env = "WATERPANEL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    /// Local MQTT broker over WebSocket
    Mqtt,
    /// REST tag service
    Rest,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show live readings, reconnecting interactively on failure
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Fetch one value from the REST tag service and exit
    Probe(ProbeArgs),

    /// Inspect or reset configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Skip the transport prompt on first start
    #[arg(long, short = 't', requires = "host")]
    pub transport: Option<TransportArg>,

    /// Host or IP for the first connection (requires --transport)
    #[arg(long, short = 'H', requires = "transport")]
    pub host: Option<String>,

    /// REST polling interval in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Host or IP (default: configured host)
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// Endpoint path (default: configured REST endpoint)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Tag to read (default: configured display tag)
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (passwords redacted)
    Show,
    /// Print the config and state file paths
    Path,
    /// Forget the saved connection settings
    Reset,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
