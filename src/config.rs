use std::{collections::HashMap, path::PathBuf};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub validation: ValidationConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Run the signature relocation repair before parsing
    pub repair_before_parse: bool,
    /// Accept SHA-1 based digest and signature algorithms
    pub allow_sha1: bool,
    /// Indentation width of the pretty-printed response
    pub pretty_indent: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            repair_before_parse: false,
            allow_sha1: true,
            pretty_indent: 2,
        }
    }
}

/// Files read by the `saml2-verify` binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputConfig {
    pub certificate: Option<PathBuf>,
    pub response: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        Self::load_from("config/settings", env_vars)
    }

    fn load_from(
        settings_file: &str,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let defaults = ValidationConfig::default();
        let mut builder = ConfigLib::builder()
            .set_default("validation.repair_before_parse", defaults.repair_before_parse)?
            .set_default("validation.allow_sha1", defaults.allow_sha1)?
            .set_default("validation.pretty_indent", defaults.pretty_indent as u64)?
            .add_source(File::with_name(settings_file).required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_VALIDATION__ALLOW_SHA1 or APP_INPUT__CERTIFICATE
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
