//! `gitsalvage <url-or-listfile> [<dir>] [--force|--keep] [--list]`
//!
//! Thin CLI shell around [`gitsalvage_core::Engine`]: argument parsing, logging setup, and
//! process exit codes. All of the actual crawling lives in the core crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Reconstruct a working tree from an exposed `.git/` directory.
#[derive(Parser)]
#[command(name = "gitsalvage", version, about)]
struct Args {
    /// Base URL of the server to harvest, or (with --list) a path to a newline-delimited
    /// file of such URLs.
    target: String,

    /// Destination directory. Defaults to the target's host name.
    dir: Option<String>,

    /// Remove and recreate the destination if it already exists and is non-empty.
    #[arg(short, long)]
    force: bool,

    /// Proceed even if the destination already exists and is non-empty.
    #[arg(short, long)]
    keep: bool,

    /// Treat `target` as a list file: one URL per line, cloned into `<dir>/<host>`.
    #[arg(short, long)]
    list: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let engine = gitsalvage_core::Engine::default();

    let result = if args.list {
        engine.clone_list(&PathBuf::from(&args.target), args.dir.as_deref(), args.force, args.keep)
    } else {
        engine.clone(&args.target, args.dir.as_deref(), args.force, args.keep)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}
