use bedrock_world::WorldOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct InspectConfig {
    #[serde(default)]
    pub world: WorldSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub options: WorldOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorldSection {
    /// World folder (the one holding `level.dat` and `db/`).
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl InspectConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config() {
        let toml_str = r#"
            [world]
            path = "worlds/Bedrock level"

            [logging]
            level = "debug"

            [options]
            load_logs = false
        "#;
        let config: InspectConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.world.path, Some(PathBuf::from("worlds/Bedrock level")));
        assert_eq!(config.logging.level, "debug");
        assert!(!config.options.load_logs);
        // unset options keep their defaults
        assert!(!config.options.eager_sub_chunks);
        assert_eq!(config.options.surface_transparent_blocks.len(), 3);
    }

    #[test]
    fn empty_config_defaults() {
        let config: InspectConfig = toml::from_str("").unwrap();
        assert!(config.world.path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.options, WorldOptions::default());
    }

    #[test]
    fn missing_file_is_error() {
        assert!(InspectConfig::load("/nonexistent/inspect.toml").is_err());
    }
}
