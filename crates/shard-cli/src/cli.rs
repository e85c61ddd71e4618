//! Top-level `clap` surface: `assign`, `extract`, `merge`.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shard-scheduler")]
#[command(about = "Duration-aware CI shard scheduler for Playwright test suites")]
#[command(version, long_about = None)]
#[command(styles = clap::builder::styling::Styles::styled()
    .header(clap::builder::styling::AnsiColor::Green.on_default().bold())
    .usage(clap::builder::styling::AnsiColor::Blue.on_default().bold())
    .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
    .placeholder(clap::builder::styling::AnsiColor::Yellow.on_default()))]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file overriding the hard-coded defaults (default: .shard-scheduler.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Partition a discovered test set into N shards.
    Assign {
        /// Discovery JSON produced by the test runner's list mode.
        #[arg(long, value_name = "PATH")]
        test_list: PathBuf,

        /// Number of shards to produce.
        #[arg(long)]
        shards: usize,

        /// Timing ledger to consult (defaults to an empty ledger if absent).
        #[arg(long, value_name = "PATH")]
        timing_file: Option<PathBuf>,

        /// CKK search deadline in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Keep tests from the same file together where it doesn't hurt makespan.
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_file_affinity")]
        file_affinity: bool,

        /// Disable the file-affinity penalty entirely.
        #[arg(long, action = ArgAction::SetTrue)]
        no_file_affinity: bool,

        /// Override the auto-computed file-affinity penalty, in milliseconds.
        #[arg(long)]
        file_affinity_penalty: Option<u64>,

        /// Output format for the result.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Directory to write each shard's test-list file into.
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },

    /// Summarize a post-run report into a shard-timing file.
    Extract {
        /// Post-run report JSON.
        #[arg(long, value_name = "PATH")]
        report: PathBuf,

        /// Runner project name to project the report onto.
        #[arg(long)]
        project: String,

        /// Shard index to stamp into the output.
        #[arg(long)]
        shard: u32,

        /// Output path for the shard-timing JSON.
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },

    /// Fold one or more shard-timing files into the durable ledger.
    Merge {
        /// Ledger to update in place (created if absent).
        #[arg(long, value_name = "PATH")]
        ledger: PathBuf,

        /// Shard-timing files to fold in, in the order given.
        #[arg(long = "shard-timing", value_name = "PATH")]
        shard_timing: Vec<PathBuf>,

        /// EMA smoothing factor, in [0, 1].
        #[arg(long)]
        alpha: Option<f64>,

        /// Age, in days, beyond which stale entries are pruned.
        #[arg(long)]
        prune_days: Option<i64>,
    },
}
