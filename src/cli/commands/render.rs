//! Render command implementation.
//!
//! Runs the full pipeline: revalidate, fetch and render when needed, cache,
//! then print the documents.

use crate::cli::args::RenderArgs;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::DefaultFetcher;
use crate::render::{encode_documents, KustomizeRenderer, ManifestPipeline};
use crate::source::SourceId;
use crate::ui::UserInterface;

use super::dispatcher::Command;
use super::open_cache;

/// The render command implementation.
pub struct RenderCommand<'a> {
    config: &'a Config,
    auth_token: Option<String>,
    args: RenderArgs,
}

impl<'a> RenderCommand<'a> {
    pub fn new(config: &'a Config, auth_token: Option<String>, args: RenderArgs) -> Self {
        Self {
            config,
            auth_token,
            args,
        }
    }
}

impl Command for RenderCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<()> {
        let source = SourceId::parse(&self.args.source)?;
        let cache = open_cache(self.config, self.auth_token.clone())?;
        let renderer = KustomizeRenderer::with_binary(&self.config.kustomize_bin);
        let pipeline = ManifestPipeline::new(cache, DefaultFetcher::new(), renderer);

        let documents = pipeline.render(&source, &self.args.path)?;

        let rendered = if self.args.json {
            serde_json::to_string_pretty(&documents).map_err(anyhow::Error::from)?
        } else {
            encode_documents(&documents)?
        };
        ui.output(&rendered);
        ui.success(&format!(
            "{} documents from {}",
            documents.len(),
            source
        ));

        Ok(())
    }
}
