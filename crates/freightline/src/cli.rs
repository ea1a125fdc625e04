//! Clap derive structures for the `freightline` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// freightline -- marketplace notifications from the command line
#[derive(Debug, Parser)]
#[command(
    name = "freightline",
    version,
    about = "Read and follow Freightline marketplace notifications",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "FREIGHTLINE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// REST API root (overrides profile)
    #[arg(long, env = "FREIGHTLINE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Session token (overrides profile and keyring)
    #[arg(long, env = "FREIGHTLINE_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// User id the token belongs to
    #[arg(long, env = "FREIGHTLINE_USER", global = true)]
    pub user: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FREIGHTLINE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "FREIGHTLINE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FREIGHTLINE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, read, and follow notifications
    #[command(alias = "n")]
    Notifications(NotificationsArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// Fetch and list notifications, newest first
    #[command(alias = "ls")]
    List {
        /// Only show unread notifications
        #[arg(long, short = 'u')]
        unread: bool,
    },

    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },

    /// Follow notifications as they are pushed
    Watch {
        /// Re-fetch the full list every N seconds (0 = only on start)
        #[arg(long)]
        refresh: Option<u64>,

        /// Reconnect with backoff when the push connection drops
        #[arg(long)]
        reconnect: bool,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the loaded configuration (tokens masked)
    Show,

    /// Store a session token in the system keyring (read from stdin)
    SetToken,
}
