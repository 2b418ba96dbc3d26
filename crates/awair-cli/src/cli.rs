//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};

use awair_types::ConflictPolicy;

/// Reusable API credential and device arguments.
#[derive(Debug, Clone, Args)]
pub struct ApiArgs {
    /// API bearer token, or use the AWAIR_TOKEN env var
    #[arg(long, env = "AWAIR_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Device type slug
    #[arg(long, env = "AWAIR_DEVICE_TYPE", default_value = "awair-element")]
    pub device_type: String,

    /// Numeric device id
    #[arg(long, env = "AWAIR_DEVICE_ID")]
    pub device_id: u64,
}

/// Reusable data-file location arguments.
#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// Data file path; '-' streams rows to stdout as JSON Lines.
    /// Defaults to the platform data dir keyed by device id.
    #[arg(short, long, env = "AWAIR_DATA_PATH")]
    pub data_path: Option<String>,
}

/// Reusable datetime window arguments.
#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    /// Start datetime (naive ISO-8601 or RFC 3339)
    #[arg(short, long)]
    pub from: Option<String>,

    /// End datetime (naive ISO-8601 or RFC 3339)
    #[arg(short, long)]
    pub to: Option<String>,
}

#[derive(Parser)]
#[command(name = "awair")]
#[command(author, version, about = "Awair air-quality data pipeline", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch raw readings for a date range into the store (or stdout)
    Fetch {
        #[command(flatten)]
        api: ApiArgs,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        window: WindowArgs,

        /// Max records per request
        #[arg(short, long, default_value = "360")]
        limit: u32,

        /// Sleep interval between requests, in seconds
        #[arg(short, long, default_value = "1.0")]
        sleep_s: f64,

        /// Action on data conflicts (error, warn, replace)
        #[arg(short = 'a', long, default_value = "warn")]
        conflict_action: ConflictPolicy,

        /// Fetch only data newer than the latest stored timestamp
        #[arg(short, long)]
        recent_only: bool,

        /// Cap the number of API requests (for bounded runs)
        #[arg(long)]
        max_requests: Option<u32>,
    },

    /// Catch the store up from its latest timestamp to now
    Update {
        #[command(flatten)]
        api: ApiArgs,

        #[command(flatten)]
        data: DataArgs,

        /// Cap the number of API requests (for bounded runs)
        #[arg(long)]
        max_requests: Option<u32>,
    },

    /// Show data file information
    Info {
        #[command(flatten)]
        data: DataArgs,

        /// Numeric device id, used for the default data path
        #[arg(long, env = "AWAIR_DEVICE_ID")]
        device_id: Option<u64>,
    },

    /// Report the largest timing gaps in the data
    Gaps {
        #[command(flatten)]
        data: DataArgs,

        /// Numeric device id, used for the default data path
        #[arg(long, env = "AWAIR_DEVICE_ID")]
        device_id: Option<u64>,

        #[command(flatten)]
        window: WindowArgs,

        /// Number of largest gaps to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,

        /// Minimum gap size in seconds to report
        #[arg(short, long)]
        min_gap: Option<i64>,
    },

    /// Histogram of record counts per day
    Hist {
        #[command(flatten)]
        data: DataArgs,

        /// Numeric device id, used for the default data path
        #[arg(long, env = "AWAIR_DEVICE_ID")]
        device_id: Option<u64>,

        #[command(flatten)]
        window: WindowArgs,
    },
}
