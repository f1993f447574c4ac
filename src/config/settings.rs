use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::config::{CompareConfig, EngineConfig, LogConfig, ScriptConfig};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub logs: LogConfig,

    #[serde(default)]
    pub compare: CompareConfig,

    #[serde(default)]
    pub script: ScriptConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn get_env_file_name() -> String {
    if let Ok(env_file) = std::env::var("SDIFF_ENV_FILE") {
        return env_file;
    }
    if let Ok(env) = std::env::var("SDIFF_ENV") {
        match env.to_lowercase().as_str() {
            "dev" => return ".env.dev".to_string(),
            "test" => return ".env.test".to_string(),
            _ => return ".env".to_string(),
        }
    }
    ".env".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file selected by `SDIFF_ENV_FILE` / `SDIFF_ENV`
        dotenvy::from_filename(get_env_file_name()).ok();

        let settings = Config::builder()
            // SDIFF__SECTION__KEY maps to settings.section.key
            .add_source(
                Environment::with_prefix("SDIFF")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let settings: Settings = settings.try_deserialize()?;

        Ok(settings)
    }

    pub fn print_config(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(err) => eprintln!("Failed to serialize settings: {}", err),
        }
    }
}
