//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    config::RemovalConfig,
    error::Result,
    models::ModelKind,
    runtime_env::RuntimeEnv,
};

/// Convert CLI arguments and prompt answers to a [`RemovalConfig`]
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the processing configuration for an activated environment
    pub(crate) fn build(
        env: &RuntimeEnv,
        model: ModelKind,
        alpha_matting: bool,
        only_mask: bool,
        debug: bool,
    ) -> Result<RemovalConfig> {
        RemovalConfig::builder()
            .model(model)
            .models_dir(env.models_dir())
            .alpha_matting(alpha_matting)
            .only_mask(only_mask)
            .debug(debug)
            .build()
    }

    /// Model preselected on the command line, if any
    pub(crate) fn model_from_cli(cli: &Cli) -> Option<ModelKind> {
        cli.model.map(Into::into)
    }

    /// `(alpha_matting, only_mask)` as far as flags determine them
    pub(crate) fn options_from_cli(cli: &Cli) -> (bool, bool) {
        (!cli.no_alpha_matting, cli.mask_only)
    }

    /// Whether any option flag was given, making the option prompts redundant
    pub(crate) fn options_are_explicit(cli: &Cli) -> bool {
        cli.no_alpha_matting || cli.mask_only
    }
}
