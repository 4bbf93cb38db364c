use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Supported extensions for settings files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json", "toml"];

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "GTFS_MERGE";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Separator for list elements in environment variables.
const LIST_SEPARATOR: &str = ",";

/// Trait implemented by configuration structures that require list parsing help.
pub trait Config {
    /// Keys whose values should be parsed as lists when loading the configuration.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The settings file passed by the caller does not exist.
    #[error("settings file `{0}` does not exist")]
    MissingSettingsFile(PathBuf),

    /// The settings file has an extension no supported format maps to.
    #[error("settings file `{path}` has an unsupported extension; expected one of: {supported}")]
    UnsupportedExtension { path: PathBuf, supported: String },

    /// The settings file existed but could not be parsed.
    #[error("failed to load settings from `{path}`: {source}")]
    SettingsFileLoad {
        path: PathBuf,
        source: config::ConfigError,
    },

    /// Environment variable overrides failed to merge into the configuration.
    #[error("failed to load configuration from environment variables: {0}")]
    EnvironmentVariables(#[source] config::ConfigError),

    /// The sources were parsed but deserialization failed.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads configuration from an optional settings file and environment-variable overrides.
///
/// The file format is picked from the extension (`yaml`, `yml`, `json` or `toml`). Overrides
/// come from `GTFS_MERGE_`-prefixed environment variables; nested keys use double underscores
/// (`GTFS_MERGE_OUTPUT__LEVEL`) and keys listed in [`Config::LIST_PARSE_KEYS`] accept
/// comma-separated values. Without a file, every field falls back to its serde default.
pub fn load_config_from<T>(path: Option<&Path>) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    load_config_with_environment(path, None)
}

/// Same as [`load_config_from`], with the environment variables optionally taken from `env`
/// instead of the process environment.
fn load_config_with_environment<T>(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        check_settings_file(path)?;

        builder = builder.add_source(config::File::from(path));
        validate_settings_source(&builder, path)?;
    }

    let mut environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .source(env);

    if !T::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source
            .try_parsing(true)
            .list_separator(LIST_SEPARATOR);

        for key in <T as Config>::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::EnvironmentVariables)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

/// Checks that the settings file exists and carries a supported extension.
fn check_settings_file(path: &Path) -> Result<(), LoadConfigError> {
    if !path.is_file() {
        return Err(LoadConfigError::MissingSettingsFile(path.to_path_buf()));
    }

    let supported = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            CONFIG_FILE_EXTENSIONS
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        });

    if !supported {
        let supported = CONFIG_FILE_EXTENSIONS
            .iter()
            .map(|extension| format!("`{extension}`"))
            .collect::<Vec<_>>()
            .join(", ");

        return Err(LoadConfigError::UnsupportedExtension {
            path: path.to_path_buf(),
            supported,
        });
    }

    Ok(())
}

fn validate_settings_source(
    builder: &ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<(), LoadConfigError> {
    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::SettingsFileLoad {
            path: path.to_path_buf(),
            source,
        })
        .map(|_| ())
}
