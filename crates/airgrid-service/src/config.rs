//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use airgrid_core::RetryConfig;
use airgrid_types::{City, PollutantRange, Province, RangeTable, RangeTableError};

/// Minimum API key length when key authentication is enabled.
pub const MIN_API_KEY_LENGTH: usize = 16;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Store retry policy.
    pub retry: RetrySettings,
    /// API key settings.
    pub security: SecurityConfig,
    /// Provinces and their cities, seeded into the store at startup.
    pub regions: Vec<RegionConfig>,
    /// Classification table. Empty means the built-in six-level table.
    pub levels: Vec<PollutantRange>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty and timeouts are non-zero
    /// - An API key of sufficient length is set when key auth is enabled
    /// - Region ids are positive and unique
    /// - The classification table covers every channel without gaps or overlaps
    ///
    /// # Example
    ///
    /// ```
    /// use airgrid_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.retry.validate());
        errors.extend(self.security.validate());

        // City ids are global, not per province.
        let mut seen_provinces = std::collections::HashSet::new();
        let mut seen_cities = std::collections::HashSet::new();
        for (i, region) in self.regions.iter().enumerate() {
            let prefix = format!("regions[{}]", i);
            errors.extend(region.validate(&prefix));

            if !seen_provinces.insert(region.id) {
                errors.push(ValidationError {
                    field: format!("{}.id", prefix),
                    message: format!("duplicate province id {}", region.id),
                });
            }
            for (j, city) in region.cities.iter().enumerate() {
                if !seen_cities.insert(city.id) {
                    errors.push(ValidationError {
                        field: format!("{}.cities[{}].id", prefix, j),
                        message: format!("duplicate city id {}", city.id),
                    });
                }
            }
        }

        if let Err(e) = self.range_table() {
            errors.push(ValidationError {
                field: "levels".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the classification table, falling back to the built-in one.
    pub fn range_table(&self) -> Result<RangeTable, RangeTableError> {
        if self.levels.is_empty() {
            Ok(RangeTable::standard())
        } else {
            RangeTable::new(self.levels.clone())
        }
    }

    /// Flatten the region seed into store rows.
    pub fn locations(&self) -> (Vec<Province>, Vec<City>) {
        let provinces = self
            .regions
            .iter()
            .map(|r| Province {
                id: r.id,
                name: r.name.clone(),
                abbr: r.abbr.clone(),
            })
            .collect();
        let cities = self
            .regions
            .iter()
            .flat_map(|r| {
                r.cities.iter().map(|c| City {
                    id: c.id,
                    name: c.name.clone(),
                    province_id: r.id,
                })
            })
            .collect();
        (provinces, cities)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
        } else {
            match self.bind.rsplit_once(':') {
                None => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                }),
                Some((_, port)) => match port.parse::<u16>() {
                    Ok(0) => errors.push(ValidationError {
                        field: "server.bind".to_string(),
                        message: "port cannot be 0".to_string(),
                    }),
                    Err(_) => errors.push(ValidationError {
                        field: "server.bind".to_string(),
                        message: format!("invalid port '{}': must be a number 1-65535", port),
                    }),
                    Ok(_) => {}
                },
            }
        }

        if self.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "server.request_timeout_secs".to_string(),
                message: "request timeout cannot be 0".to_string(),
            });
        }

        errors
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
    /// How long SQLite waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    /// How long a request waits for the store handle, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: airgrid_store::default_db_path(),
            busy_timeout_ms: airgrid_store::DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            acquire_timeout_ms: airgrid_core::DEFAULT_ACQUIRE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }
        for (field, value) in [
            ("storage.busy_timeout_ms", self.busy_timeout_ms),
            ("storage.acquire_timeout_ms", self.acquire_timeout_ms),
        ] {
            if value == 0 {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "timeout cannot be 0".to_string(),
                });
            }
        }

        errors
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

/// Retry policy for a store that is busy or locked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.initial_delay_ms > self.max_delay_ms {
            errors.push(ValidationError {
                field: "retry.initial_delay_ms".to_string(),
                message: format!(
                    "initial delay {}ms exceeds max delay {}ms",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            });
        }
        errors
    }

    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// Shared-key protection for the whole API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Require the `X-API-Key` header on every request except `/api/health`.
    pub api_key_enabled: bool,
    pub api_key: Option<String>,
}

impl SecurityConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.api_key_enabled {
            return errors;
        }
        match &self.api_key {
            None => errors.push(ValidationError {
                field: "security.api_key".to_string(),
                message: "api_key is required when api_key_enabled is true".to_string(),
            }),
            Some(key) if key.len() < MIN_API_KEY_LENGTH => errors.push(ValidationError {
                field: "security.api_key".to_string(),
                message: format!(
                    "api_key is too short (minimum {} characters)",
                    MIN_API_KEY_LENGTH
                ),
            }),
            Some(_) => {}
        }
        errors
    }
}

/// A province and its cities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub abbr: String,
    #[serde(default)]
    pub cities: Vec<CityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    pub id: i64,
    pub name: String,
}

impl RegionConfig {
    pub fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.id <= 0 {
            errors.push(ValidationError {
                field: format!("{}.id", prefix),
                message: format!("province id must be positive, got {}", self.id),
            });
        }
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: format!("{}.name", prefix),
                message: "province name cannot be empty".to_string(),
            });
        }

        for (i, city) in self.cities.iter().enumerate() {
            let field = format!("{}.cities[{}]", prefix, i);
            if city.id <= 0 {
                errors.push(ValidationError {
                    field: format!("{}.id", field),
                    message: format!("city id must be positive, got {}", city.id),
                });
            }
            if city.name.trim().is_empty() {
                errors.push(ValidationError {
                    field: format!("{}.name", field),
                    message: "city name cannot be empty".to_string(),
                });
            }
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `regions[0].cities[1].id`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("airgrid")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_fields(config: &Config) -> Vec<String> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.storage.path, airgrid_store::default_db_path());
        assert_eq!(config.retry.max_retries, 1);
        assert!(!config.security.api_key_enabled);
        assert!(config.regions.is_empty());
        assert!(config.levels.is_empty());
        assert_eq!(config.range_table().unwrap(), RangeTable::standard());
    }

    #[test]
    fn test_regions_serde() {
        let toml = r#"
            [[regions]]
            id = 1
            name = "Liaoning"
            abbr = "LN"
            cities = [{ id = 1, name = "Shenyang" }, { id = 2, name = "Dalian" }]

            [[regions]]
            id = 2
            name = "Jilin"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.regions.len(), 2);
        assert!(config.validate().is_ok());

        let (provinces, cities) = config.locations();
        assert_eq!(provinces.len(), 2);
        assert_eq!(provinces[0].abbr, "LN");
        assert_eq!(provinces[1].abbr, "");
        assert_eq!(cities.len(), 2);
        assert!(cities.iter().all(|c| c.province_id == 1));
    }

    #[test]
    fn test_invalid_bind_and_timeouts() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();
        config.storage.busy_timeout_ms = 0;
        config.server.request_timeout_secs = 0;

        let fields = validation_fields(&config);
        assert!(fields.contains(&"server.bind".to_string()));
        assert!(fields.contains(&"server.request_timeout_secs".to_string()));
        assert!(fields.contains(&"storage.busy_timeout_ms".to_string()));

        config = Config::default();
        config.server.bind = "0.0.0.0:0".to_string();
        assert_eq!(validation_fields(&config), vec!["server.bind".to_string()]);
    }

    #[test]
    fn test_api_key_required_when_enabled() {
        let mut config = Config::default();
        config.security.api_key_enabled = true;
        assert_eq!(validation_fields(&config), vec!["security.api_key".to_string()]);

        config.security.api_key = Some("short".to_string());
        assert_eq!(validation_fields(&config), vec!["security.api_key".to_string()]);

        config.security.api_key = Some("0123456789abcdef".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_and_invalid_regions() {
        let mut config = Config::default();
        config.regions = vec![
            RegionConfig {
                id: 1,
                name: "Liaoning".to_string(),
                abbr: "LN".to_string(),
                cities: vec![
                    CityConfig {
                        id: 1,
                        name: "Shenyang".to_string(),
                    },
                    CityConfig {
                        id: 1,
                        name: "Dalian".to_string(),
                    },
                ],
            },
            RegionConfig {
                id: 1,
                name: " ".to_string(),
                abbr: String::new(),
                cities: vec![],
            },
        ];

        let fields = validation_fields(&config);
        assert!(fields.contains(&"regions[0].cities[1].id".to_string()));
        assert!(fields.contains(&"regions[1].id".to_string()));
        assert!(fields.contains(&"regions[1].name".to_string()));
    }

    #[test]
    fn test_city_ids_unique_across_provinces() {
        let toml = r#"
            [[regions]]
            id = 1
            name = "Liaoning"
            cities = [{ id = 1, name = "Shenyang" }]

            [[regions]]
            id = 2
            name = "Jilin"
            cities = [{ id = 1, name = "Changchun" }]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            validation_fields(&config),
            vec!["regions[1].cities[0].id".to_string()]
        );
    }

    #[test]
    fn test_gapped_levels_rejected() {
        let mut levels = RangeTable::standard().into_ranges();
        levels[2].co.min += 1;

        let config = Config {
            levels,
            ..Default::default()
        };
        assert_eq!(validation_fields(&config), vec!["levels".to_string()]);
        assert!(config.range_table().is_err());
    }

    #[test]
    fn test_level_zero_rejected() {
        let mut levels = RangeTable::standard().into_ranges();
        levels[0].level = airgrid_types::Level::new(0);

        let config = Config {
            levels,
            ..Default::default()
        };
        assert_eq!(validation_fields(&config), vec!["levels".to_string()]);

        let toml = r##"
            [[levels]]
            level = 0
            label = "Excellent"
            color = "#00e400"
            so2 = { min = 0, max = 50 }
            co = { min = 0, max = 5 }
            spm = { min = 0, max = 50 }
        "##;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_retry_settings() {
        let settings = RetrySettings {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 100,
        };
        let retry = settings.to_retry_config();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_delay, Duration::from_millis(10));
        assert_eq!(retry.max_delay, Duration::from_millis(100));

        let config = Config {
            retry: RetrySettings {
                initial_delay_ms: 500,
                max_delay_ms: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            validation_fields(&config),
            vec!["retry.initial_delay_ms".to_string()]
        );
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("server.toml");

        let config = Config {
            server: ServerConfig {
                bind: "0.0.0.0:9090".to_string(),
                request_timeout_secs: 10,
            },
            levels: RangeTable::standard().into_ranges(),
            ..Default::default()
        };
        config.save(&config_path).unwrap();

        let loaded = Config::load_validated(&config_path).unwrap();
        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.server.request_timeout_secs, 10);
        assert_eq!(loaded.range_table().unwrap(), RangeTable::standard());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/airgrid/server.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
