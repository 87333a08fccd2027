use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::LoadOptions;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub input: InputConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the warehouse
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root of the catalog tree
    pub song_data: String,
    /// Root of the activity log tree
    pub log_data: String,
    /// File extension to load, without the dot
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Allowed absolute difference between event length and song duration,
    /// in seconds. Zero means exact equality.
    pub duration_tolerance: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/sparkifydb.sqlite".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            input: InputConfig {
                song_data: "data/song_data".to_string(),
                log_data: "data/log_data".to_string(),
                extension: "json".to_string(),
            },
            matching: MatchingConfig {
                duration_tolerance: 0.0,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], with an extra explicitly named file on top
    /// of the optional ones.
    pub fn load_from(explicit: Option<&str>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let mut builder = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("sparkify-etl").required(false));
        if let Some(path) = explicit {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        let config = builder
            // Add environment variables with prefix, e.g. SPARKIFY_ETL_DATABASE__PATH
            .add_source(
                Environment::with_prefix("SPARKIFY_ETL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database.path must not be empty"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate input config
        let extension = self.input.extension.trim();
        if extension.is_empty() || extension.starts_with('.') {
            return Err(anyhow::anyhow!(
                "Invalid input extension: {:?}. Give it without the leading dot",
                self.input.extension
            ));
        }

        // Validate matching config
        let tolerance = self.matching.duration_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(anyhow::anyhow!(
                "duration_tolerance must be a finite, non-negative number of seconds"
            ));
        }

        Ok(())
    }

    /// Get database path from environment or config
    pub fn get_database_path(&self) -> PathBuf {
        std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| self.database.path.clone())
            .into()
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Loader settings derived from this configuration
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            extension: self.input.extension.trim().to_string(),
            duration_tolerance: self.matching.duration_tolerance,
            ..LoadOptions::default()
        }
    }
}
