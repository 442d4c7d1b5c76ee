use std::path::PathBuf;

use common_enums::Environment;
use common_utils::{consts, Locale};
use domain_types::configuration::Configuration;

use crate::{error::ConfigurationError, logger::config::Log};

#[derive(Clone, serde::Deserialize, Debug)]
pub struct Config {
    pub checkout: Checkout,
    #[serde(default)]
    pub log: Log,
}

/// `[checkout]` table; turned into the [`Configuration`] forwarded to payment sessions.
#[derive(Clone, serde::Deserialize, Debug)]
pub struct Checkout {
    pub shopper_locale: String,
    #[serde(default)]
    pub environment: Environment,
}

impl Checkout {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.shopper_locale
            .parse::<Locale>()
            .map(|_| ())
            .map_err(|report| {
                ConfigurationError::InvalidCheckout(report.current_context().to_string())
            })
    }

    pub fn configuration(&self) -> Result<Configuration, ConfigurationError> {
        let shopper_locale = self.shopper_locale.parse::<Locale>().map_err(|report| {
            ConfigurationError::InvalidCheckout(report.current_context().to_string())
        })?;
        Ok(Configuration::new(shopper_locale, self.environment))
    }
}

impl Config {
    /// Function to build the configuration by picking it from default locations
    pub fn new() -> Result<Self, ConfigurationError> {
        Self::new_with_config_path(None)
    }

    /// Function to build the configuration from an explicit file, falling back to the
    /// default location for the current build profile
    pub fn new_with_config_path(
        explicit_config_path: Option<PathBuf>,
    ) -> Result<Self, ConfigurationError> {
        let env = consts::Env::current_env();
        let config_path = Self::config_path(&env, explicit_config_path);

        let config = Self::builder(&env)?
            .add_source(config::File::from(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("CHECKOUT")
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()?;

        #[allow(clippy::print_stderr)]
        let config: Self = serde_path_to_error::deserialize(config).map_err(|error| {
            eprintln!("Unable to deserialize checkout configuration: {error}");
            error.into_inner()
        })?;

        config.checkout.validate()?;

        Ok(config)
    }

    pub fn builder(
        environment: &consts::Env,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            // Here, it should be `set_override()` not `set_default()`.
            // "env" can't be altered by config field.
            .set_override("env", environment.to_string())
    }

    /// Config path.
    pub fn config_path(
        environment: &consts::Env,
        explicit_config_path: Option<PathBuf>,
    ) -> PathBuf {
        let mut config_path = PathBuf::new();
        if let Some(explicit_config_path_val) = explicit_config_path {
            config_path.push(explicit_config_path_val);
        } else {
            config_path.push(workspace_path());
            config_path.push("config");
            config_path.push(environment.config_path());
        }
        config_path
    }
}

pub fn workspace_path() -> PathBuf {
    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let mut path = PathBuf::from(manifest_dir);
        path.pop();
        path.pop();
        path
    } else {
        PathBuf::from(".")
    }
}
