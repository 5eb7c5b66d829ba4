use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Settings for the discount forecast pipeline
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Result cache time-to-live, in minutes. Zero disables caching.
    pub cache_ttl_minutes: f64,
    /// Replaces the artifact's decision threshold when set.
    pub threshold_override: Option<f64>,
    /// On-discount percentage used when the artifact does not declare one.
    pub discount_significance_pct: f64,
    /// Artifact file, or a directory holding `model_filename`.
    pub model_path: Option<PathBuf>,
    pub model_filename: String,
    pub default_model_path: PathBuf,
    pub min_history_rows: usize,
    pub query_timeout_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub forecast: ForecastConfig,
    pub log_level: String,
    pub log_format: String,
    pub environment: String,
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("Invalid {}: {}", key, raw)),
        _ => Ok(default),
    }
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?;
        let acquire_timeout_secs = parse_var("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64)?;
        let idle_timeout_secs = parse_var("DATABASE_IDLE_TIMEOUT_SECS", 600u64)?; // 10 minutes
        let max_lifetime_secs = parse_var("DATABASE_MAX_LIFETIME_SECS", 1800u64)?; // 30 minutes
        let test_before_acquire = parse_var("DATABASE_TEST_BEFORE_ACQUIRE", true)?;

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/pryzor".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl ForecastConfig {
    /// Create forecast config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let cache_ttl_minutes = parse_var("DISCOUNT30D_CACHE_MIN", defaults.cache_ttl_minutes)?;
        let discount_significance_pct =
            parse_var("DISCOUNT_SIGNIFICANCE_PCT", defaults.discount_significance_pct)?;
        let min_history_rows = parse_var("MIN_HISTORY_ROWS", defaults.min_history_rows)?;
        let query_timeout_secs =
            parse_var("PRICE_QUERY_TIMEOUT_SECS", defaults.query_timeout_secs)?;

        let threshold_override = match env::var("DISCOUNT_THRESHOLD_OVERRIDE") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid DISCOUNT_THRESHOLD_OVERRIDE: {}", raw))?,
            ),
            _ => None,
        };

        let model_path = env::var("MODEL_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let model_filename = env::var("MODEL_FILENAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.model_filename);

        let default_model_path = env::var("MODEL_DEFAULT_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.default_model_path);

        let config = Self {
            cache_ttl_minutes,
            threshold_override,
            discount_significance_pct,
            model_path,
            model_filename,
            default_model_path,
            min_history_rows,
            query_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), String> {
        if !self.cache_ttl_minutes.is_finite() || self.cache_ttl_minutes < 0.0 {
            return Err(format!(
                "DISCOUNT30D_CACHE_MIN must be a non-negative number, got {}",
                self.cache_ttl_minutes
            ));
        }

        if Duration::try_from_secs_f64(self.cache_ttl_minutes * 60.0).is_err() {
            return Err(format!(
                "DISCOUNT30D_CACHE_MIN is too large, got {}",
                self.cache_ttl_minutes
            ));
        }

        if let Some(threshold) = self.threshold_override {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(format!(
                    "DISCOUNT_THRESHOLD_OVERRIDE must be within [0, 1], got {}",
                    threshold
                ));
            }
        }

        if !(0.0..=100.0).contains(&self.discount_significance_pct) {
            return Err(format!(
                "DISCOUNT_SIGNIFICANCE_PCT must be within [0, 100], got {}",
                self.discount_significance_pct
            ));
        }

        if self.min_history_rows == 0 {
            return Err("MIN_HISTORY_ROWS must be greater than 0".to_string());
        }

        if self.query_timeout_secs == 0 {
            return Err("PRICE_QUERY_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get cache TTL as Duration. Values that are not a valid duration
    /// disable the cache; `validate` rejects them up front.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_from_secs_f64(self.cache_ttl_minutes * 60.0).unwrap_or(Duration::ZERO)
    }

    /// Get data-store query timeout as Duration
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            cache_ttl_minutes: 10.0,
            threshold_override: None,
            discount_significance_pct: 20.0,
            model_path: None,
            model_filename: "discount_30d_model.json".to_string(),
            default_model_path: PathBuf::from("ml_model/trained_models/discount_30d_model.json"),
            min_history_rows: 7,
            query_timeout_secs: 5,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let forecast = ForecastConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string());

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["text", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            forecast,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            forecast: ForecastConfig::default(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            environment: "development".to_string(),
        }
    }
}
