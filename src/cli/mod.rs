//! Command-line parsing for the `sxrepo` package-repository helper.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the remote-client code.

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sxrepo", version, about = "Package-repository maintenance helper")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the entries under a repository path.
    Ls(LsArgs),
    /// Delete a file, or (with -r) the files under a directory.
    ///
    /// Paths containing a `master` or `develop` segment are refused unless
    /// `-f` is given and the prompt is answered with the literal `yes`.
    Rm(RmArgs),
}

#[derive(Debug, Parser)]
pub struct LsArgs {
    /// Repository path to list.
    pub path: String,

    /// Descend into subdirectories.
    #[arg(short = 'r', long)]
    pub recursive: bool,
}

#[derive(Debug, Parser)]
pub struct RmArgs {
    /// Repository path to delete.
    pub path: String,

    /// Delete the files under a directory.
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Allow deletion under protected segments (still prompts).
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Only delete files whose name matches this regex.
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,
}
