use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides, e.g. `LREG__DATABASE__URL`.
pub const ENV_PREFIX: &str = "LREG";

/// Custom error type for config loading.
#[lreg_derive::lreg_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads a configuration file and overlays environment variables.
///
/// 1. **Base File**: `path` (default `server`, any extension `config` understands such as
///    `server.toml`). The file is optional; missing sections fall back to their defaults.
/// 2. **Environment Overrides**: variables prefixed with `LREG__`, nested with double
///    underscores (`LREG__SERVER__PORT=8080` maps to `server.port`).
///
/// # Errors
/// Returns [`ConfigError::Config`] when a source is malformed or the merged values do not
/// match `T`.
///
/// # Example
/// ```rust
/// use lreg_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(|| PathBuf::from("server"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .convert_case(config::Case::Snake),
        );

    info!("Loading config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
