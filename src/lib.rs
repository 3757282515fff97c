//! httpsync - one-way directory mirroring over HTTP
//!
//! This crate provides the sync engine and the `httpsync` CLI tool.
//!
//! # Architecture
//!
//! - [`sync`] - Scan, manifest, diff, download and prune pipeline
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Settings resolution (flags, environment, config file)
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod sync;

pub use error::{Error, Result};
