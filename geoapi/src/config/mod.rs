//! Configuration de l'application
//!
//! Construite une seule fois au démarrage : valeurs par défaut, puis fichier
//! JSON optionnel, puis variables d'environnement.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use geozone::StatisticsConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::store::DatabaseConfig;

/// Variable d'environnement désignant le fichier de configuration
pub const CONFIG_ENV: &str = "GEOAPI_CONFIG";

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub statistics: StatisticsSettings,

    /// Niveau de log par défaut (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            statistics: StatisticsSettings::default(),
            log_level: "info".into(),
        }
    }
}

/// Réglages du calcul de statistiques
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsSettings {
    /// Rayon de zone utilisé quand la commande n'en donne pas (mètres)
    pub default_distance: i64,

    /// Délai des lectures concurrentes parcelles/bâtiments
    pub fanout_timeout_ms: u64,

    /// Trace la durée de chaque calcul
    pub timing: bool,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            default_distance: 10,
            fanout_timeout_ms: 10_000,
            timing: false,
        }
    }
}

impl StatisticsSettings {
    pub fn engine_config(&self) -> StatisticsConfig {
        StatisticsConfig {
            fanout_timeout: Duration::from_millis(self.fanout_timeout_ms),
            timing: self.timing,
        }
    }
}

impl AppConfig {
    /// Charge la configuration depuis l'environnement du processus
    ///
    /// `path` (option `--config`) a priorité sur `GEOAPI_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV).ok();
        let path = path.or(from_env.as_deref().map(Path::new));
        Self::from_sources(path, |key| std::env::var(key).ok())
    }

    /// Défauts, fichier JSON puis surcharges d'environnement
    ///
    /// Un fichier explicitement désigné mais illisible est une erreur.
    pub fn from_sources(
        path: Option<&Path>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(var)?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un fichier
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        self.database.apply_env(&var)?;

        if let Some(distance) = var("GEOAPI_DEFAULT_DISTANCE") {
            self.statistics.default_distance = distance
                .parse()
                .with_context(|| format!("Invalid GEOAPI_DEFAULT_DISTANCE: {distance}"))?;
        }
        if let Some(timeout) = var("GEOAPI_FANOUT_TIMEOUT_MS") {
            self.statistics.fanout_timeout_ms = timeout
                .parse()
                .with_context(|| format!("Invalid GEOAPI_FANOUT_TIMEOUT_MS: {timeout}"))?;
        }
        if let Some(timing) = var("GEOAPI_FUNCTION_TIMING") {
            self.statistics.timing = parse_flag(&timing)
                .with_context(|| format!("Invalid GEOAPI_FUNCTION_TIMING: {timing}"))?;
        }
        if let Some(level) = var("GEOAPI_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.statistics.default_distance < 1 {
            anyhow::bail!(
                "default_distance must be >= 1, got {}",
                self.statistics.default_distance
            );
        }
        if self.statistics.fanout_timeout_ms == 0 {
            anyhow::bail!("fanout_timeout_ms must be > 0");
        }
        crate::store::postgres::validate_table_name(&self.database.table)?;
        self.level()?;
        Ok(())
    }

    /// Niveau de log configuré
    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log_level: {}", self.log_level))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn temp_config(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("geoapi-{}-{name}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_sources(None, env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.statistics.default_distance, 10);
        assert_eq!(
            config.statistics.engine_config().fanout_timeout,
            Duration::from_secs(10)
        );
        assert_eq!(config.level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_file_then_env() {
        let path = temp_config(
            "layers",
            r#"{
                "database": {"host": "file-host", "table": "gis.properties"},
                "statistics": {"default_distance": 25, "timing": true},
                "log_level": "debug"
            }"#,
        );

        let config = AppConfig::from_sources(
            Some(&path),
            env(&[("PGHOST", "env-host"), ("GEOAPI_FANOUT_TIMEOUT_MS", "250")]),
        )
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.database.host, "env-host");
        assert_eq!(config.database.table, "gis.properties");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.statistics.default_distance, 25);
        assert_eq!(config.statistics.fanout_timeout_ms, 250);
        assert!(config.statistics.timing);
        assert_eq!(config.level().unwrap(), Level::DEBUG);
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = std::env::temp_dir().join("geoapi-does-not-exist.json");
        let err = AppConfig::from_sources(Some(&path), env(&[])).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_json() {
        let path = temp_config("invalid", "{ not json");
        let result = AppConfig::from_sources(Some(&path), env(&[]));
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(AppConfig::from_sources(None, env(&[("GEOAPI_DEFAULT_DISTANCE", "0")])).is_err());
        assert!(AppConfig::from_sources(None, env(&[("GEOAPI_FUNCTION_TIMING", "maybe")])).is_err());
        assert!(AppConfig::from_sources(None, env(&[("GEOAPI_LOG_LEVEL", "loud")])).is_err());
        assert!(AppConfig::from_sources(None, env(&[("GEOAPI_TABLE", "x; drop")])).is_err());
    }

    #[test]
    fn test_timing_flag() {
        let config = AppConfig::from_sources(None, env(&[("GEOAPI_FUNCTION_TIMING", "1")])).unwrap();
        assert!(config.statistics.engine_config().timing);
    }
}
