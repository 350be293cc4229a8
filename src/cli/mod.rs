//! Command-line interface for the `pathwatch` binary.
//!
//! Argument parsing lives in [`args`], command bodies in [`commands`].

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
