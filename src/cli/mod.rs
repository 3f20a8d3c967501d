//! Command-line interface for Routinely.

pub mod args;

pub use args::Cli;
