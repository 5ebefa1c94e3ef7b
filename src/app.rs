//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments
//! - builds the HTTP transport from the environment
//! - dispatches `ls` / `rm`

use clap::Parser;
use regex::Regex;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, LsArgs, RmArgs};
use crate::error::AppError;
use crate::remote::{
    HttpTransport, RemoteError, RemoveOptions, RepoClient, RepoTransport, StdinConfirm,
};

/// Entry point for the `sxrepo` binary.
pub fn run() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = crate::cli::Cli::parse();
    let client = RepoClient::new(HttpTransport::from_env()?);

    match cli.command {
        Command::Ls(args) => handle_ls(&client, args),
        Command::Rm(args) => handle_rm(&client, args),
    }
}

fn handle_ls<T: RepoTransport>(client: &RepoClient<T>, args: LsArgs) -> Result<(), AppError> {
    let entries = client.list(&args.path, args.recursive)?;
    for entry in entries {
        if entry.is_dir {
            println!("{}/", entry.path);
        } else {
            println!("{}", entry.path);
        }
    }
    Ok(())
}

fn handle_rm<T: RepoTransport>(client: &RepoClient<T>, args: RmArgs) -> Result<(), AppError> {
    let pattern = args
        .pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(RemoteError::InvalidPattern)?;
    let opts = RemoveOptions {
        recursive: args.recursive,
        force: args.force,
        pattern,
    };

    let report = client.remove(&args.path, &opts, &mut StdinConfirm)?;
    for path in &report.deleted {
        println!("deleted {path}");
    }
    if !report.skipped.is_empty() {
        warn!(count = report.skipped.len(), "entries not matching the pattern were kept");
    }
    Ok(())
}
