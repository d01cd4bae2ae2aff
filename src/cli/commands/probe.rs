//! Probe command implementation.
//!
//! Runs the revalidation step on its own and reports what a render would do.

use crate::cli::args::ProbeArgs;
use crate::config::Config;
use crate::error::Result;
use crate::source::SourceId;
use crate::ui::UserInterface;

use super::dispatcher::Command;
use super::open_cache;

/// The probe command implementation.
pub struct ProbeCommand<'a> {
    config: &'a Config,
    auth_token: Option<String>,
    args: ProbeArgs,
}

impl<'a> ProbeCommand<'a> {
    pub fn new(config: &'a Config, auth_token: Option<String>, args: ProbeArgs) -> Self {
        Self {
            config,
            auth_token,
            args,
        }
    }
}

impl Command for ProbeCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<()> {
        let source = SourceId::parse(&self.args.source)?;
        let cache = open_cache(self.config, self.auth_token.clone())?;

        ui.message(&format!(
            "Probing {}",
            source.api_url(&self.config.api_base)
        ));

        let status = match cache.get_manifests(&source)?.into_result() {
            Ok(documents) => format!("cached ({} documents)", documents.len()),
            Err(rerender) => rerender.to_string(),
        };
        ui.output(&status);

        if let Some(token) = cache.observed_token(&source) {
            ui.message(&format!("Token: {}", token));
        }

        Ok(())
    }
}
