//! `sx-tools` library crate.
//!
//! Configuration companion for the source-extraction pipeline:
//!
//! - `config` — measurement images, model-fitting parameters, models,
//!   apertures
//! - `output` — the output-column registry consumed by the catalog writer
//! - `remote` — client for the package-repository HTTP API
//!
//! The binary (`sxrepo`) is a thin wrapper around this library so that the
//! command logic is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod remote;
