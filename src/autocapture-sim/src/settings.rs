use std::path::Path;

use serde::Deserialize;

/// Simulator settings. Loaded from an optional TOML file and environment
/// variables with the prefix `AUTOCAPTURE_SIM__`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimSettings {
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default)]
    pub pretty: bool,
}

fn default_log_filter() -> String {
    "autocapture_sim=info,autocapture_web_sdk=info,autocapture_core=info".to_string()
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json_logs: false,
            pretty: false,
        }
    }
}

impl SimSettings {
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("AUTOCAPTURE_SIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }
}
