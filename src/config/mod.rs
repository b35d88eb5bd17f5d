mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    GatewaySettings, HeartbeatSettings, LoggingSettings, ServerSettings, Settings,
};

/// Prefix of environment overrides, e.g. `NSGATE_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "NSGATE";

/// Loads the configuration from `config/default` and environment variables,
/// merged over the built-in defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Same as [`load_config`] with an explicit file stem (extension optional).
/// The file is not required to exist.
pub fn load_config_from(file_stem: &str) -> Result<Settings, ConfigError> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name(file_stem).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("gateway.namespaces"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    let settings = partial.merge(Settings::default());
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests;
