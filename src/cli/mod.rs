//! CLI module for driftloop - argument parsing for the loop driver.

pub mod commands;

pub use commands::Cli;
