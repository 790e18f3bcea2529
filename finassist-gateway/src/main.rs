//! FinAssist Gateway - Main entry point.

use anyhow::Result;
use finassist_common::config::{config_path, load_dotenv, Config};
use finassist_common::logging::init_logging_with_exclusions;

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so its values can feed the config overrides
    let dotenv_path = load_dotenv();

    let mut config = Config::load()?;
    let ignored = config.apply_env_overrides();

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }
    let path = config_path();
    if path.exists() {
        tracing::info!(path = %path.display(), "Loaded config file");
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
    }
    for entry in &ignored {
        tracing::warn!(var = entry.var, value = %entry.value, "Ignoring unparsable environment override");
    }

    config.validate()?;

    tracing::info!("FinAssist Gateway v{}", env!("CARGO_PKG_VERSION"));

    finassist_gateway::start_server(&config).await
}
