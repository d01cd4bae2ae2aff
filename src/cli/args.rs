//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::commands::cache::CacheArgs;

/// manifest-cache - render remote configuration sources, revalidated by ETag.
#[derive(Debug, Parser)]
#[command(name = "manifest-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides ./.manifest-cache.yml)
    #[arg(short, long, global = true, env = "MANIFEST_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a source, reusing cached output while it is unchanged upstream
    Render(RenderArgs),

    /// Ask upstream whether a source changed, without rendering
    Probe(ProbeArgs),

    /// Manage the on-disk cache
    Cache(CacheArgs),
}

/// Arguments for the `render` command.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Source identifier, e.g. github.com/owner/repo
    pub source: String,

    /// Directory inside the source to render
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Print documents as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `probe` command.
#[derive(Debug, Clone, Args)]
pub struct ProbeArgs {
    /// Source identifier, e.g. github.com/owner/repo
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::cache::CacheSubcommand;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_render_with_path() {
        let cli = Cli::parse_from([
            "manifest-cache",
            "render",
            "github.com/owner/repo",
            "--path",
            "overlays/dev",
            "--json",
        ]);

        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.source, "github.com/owner/repo");
                assert_eq!(args.path, PathBuf::from("overlays/dev"));
                assert!(args.json);
            }
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[test]
    fn render_path_defaults_to_root() {
        let cli = Cli::parse_from(["manifest-cache", "render", "github.com/owner/repo"]);

        match cli.command {
            Commands::Render(args) => assert_eq!(args.path, PathBuf::from(".")),
            other => panic!("expected render, got {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "manifest-cache",
            "probe",
            "github.com/owner/repo",
            "--debug",
            "--config",
            "custom.yml",
        ]);

        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
    }

    #[test]
    fn parse_cache_list_json() {
        let cli = Cli::parse_from(["manifest-cache", "cache", "list", "--json"]);

        match cli.command {
            Commands::Cache(args) => {
                assert!(matches!(args.command, CacheSubcommand::List { json: true }))
            }
            other => panic!("expected cache, got {:?}", other),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["manifest-cache"]).is_err());
    }
}
