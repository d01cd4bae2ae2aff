//! Command-line interface for manifest-cache.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ProbeArgs, RenderArgs};
pub use commands::{Command, CommandDispatcher};
