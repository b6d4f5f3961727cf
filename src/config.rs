//! Configuration management for smartchef.
//!
//! Loads config from YAML files in standard locations. Every section is
//! optional and falls back to its defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub host: String,
    pub model: String,
    pub vision_model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".into(),
            model: "llama3.2:3b".into(),
            vision_model: "llava:7b".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; unset means ~/.local/share/smartchef.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "espeak-ng".into(),
            args: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub enabled: bool,
    pub frequency_hz: f32,
    pub beeps: u32,
    pub beep_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency_hz: 880.0,
            beeps: 3,
            beep_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GamificationConfig {
    pub points_per_ingredient: u64,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            points_per_ingredient: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8780 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub storage: StorageConfig,
    pub narration: NarrationConfig,
    pub alarm: AlarmConfig,
    pub gamification: GamificationConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/smartchef/config.yaml
    /// 3. /etc/smartchef/config.yaml
    pub fn load(path: Option<&Path>) -> Self {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/smartchef/config.yaml")),
                Some(PathBuf::from("/etc/smartchef/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", config_path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", config_path.display());
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .dir
            .clone()
            .unwrap_or_else(crate::storage::default_data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::parse(
            "ai:\n  model: mistral\nalarm:\n  beeps: 5\n",
        )
        .unwrap();

        assert_eq!(config.ai.model, "mistral");
        assert_eq!(config.ai.host, "http://localhost:11434");
        assert_eq!(config.alarm.beeps, 5);
        assert_eq!(config.alarm.frequency_hz, 880.0);
        assert_eq!(config.gamification.points_per_ingredient, 10);
    }

    #[test]
    fn test_narration_command() {
        let config = Config::parse(
            "narration:\n  command: spd-say\n  args: [\"--wait\"]\n",
        )
        .unwrap();
        assert!(config.narration.enabled);
        assert_eq!(config.narration.command, "spd-say");
        assert_eq!(config.narration.args, vec!["--wait"]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.yaml")));
        assert_eq!(config.server.port, 8780);
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "ai: [unclosed").unwrap();
        let config = Config::load(Some(&path));
        assert_eq!(config.ai.model, "llama3.2:3b");
    }

    #[test]
    fn test_storage_dir_override() {
        let config = Config::parse("storage:\n  dir: /tmp/chef\n").unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/chef"));
    }
}
