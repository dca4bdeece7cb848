use action_ball::{DetectorConfig, PipelineConfig, TrackerConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_FILE: &str = "action_ball";
const ENV_PREFIX: &str = "ACTION_BALL";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub tracker: TrackerConfig,
    pub detector: DetectorConfig,
}

/// Layers an optional config file and `ACTION_BALL__SECTION__KEY` environment
/// variables over the built-in defaults.
///
/// An explicitly given file must exist; the default `action_ball.toml` is optional.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name(DEFAULT_FILE).required(false),
    };
    let cfg = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read configuration")?;
    let app: AppConfig = cfg.try_deserialize().context("invalid configuration values")?;
    app.pipeline.validate()?;
    Ok(app)
}
