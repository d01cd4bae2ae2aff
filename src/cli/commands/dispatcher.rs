//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandDispatcher`] for routing CLI subcommands

use crate::cli::args::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, writing results and status through `ui`.
    ///
    /// Any error ends the process with a non-zero exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<()>;
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    config: Config,
    auth_token: Option<String>,
}

impl CommandDispatcher {
    /// Create a dispatcher over an already-loaded configuration.
    pub fn new(config: Config, auth_token: Option<String>) -> Self {
        Self { config, auth_token }
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<()> {
        match &cli.command {
            Commands::Render(args) => {
                let cmd = super::render::RenderCommand::new(
                    &self.config,
                    self.auth_token.clone(),
                    args.clone(),
                );
                cmd.execute(ui)
            }
            Commands::Probe(args) => {
                let cmd = super::probe::ProbeCommand::new(
                    &self.config,
                    self.auth_token.clone(),
                    args.clone(),
                );
                cmd.execute(ui)
            }
            Commands::Cache(args) => {
                let cmd = super::cache::CacheCommand::new(&self.config, args.clone());
                cmd.execute(ui)
            }
        }
    }
}
