//! CLI entry point for the shard scheduler: `assign`, `extract`, `merge`.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Assign {
            test_list,
            shards,
            timing_file,
            timeout_ms,
            file_affinity,
            no_file_affinity,
            file_affinity_penalty,
            format,
            out_dir,
        } => commands::assign::run(
            &test_list,
            shards,
            timing_file.as_deref(),
            timeout_ms,
            file_affinity,
            no_file_affinity,
            file_affinity_penalty,
            format,
            out_dir.as_deref(),
            cli.config.as_deref(),
        ),

        Commands::Extract { report, project, shard, out } => {
            commands::extract::run(&report, &project, shard, &out)
        }

        Commands::Merge {
            ledger,
            shard_timing,
            alpha,
            prune_days,
        } => commands::merge::run(&ledger, &shard_timing, alpha, prune_days, cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
