//! Command-line front end for the townland loaders and queries
//!
//! The `townlands` binary parses a [`config::Cli`] and hands it to
//! [`commands::run`], which returns the text to print.

pub mod commands;
pub mod config;

pub use commands::run;
pub use config::{Cli, Command};
