//! Configuration management for creatorscan
//!
//! Loads the TOML config, applies a named profile and `CREATORSCAN_*`
//! environment overrides, validates the result and turns it into pipeline
//! settings.

use crate::collector::CollectorConfig;
use crate::error::{Result, ScanError};
use crate::metrics::AdmissionCriteria;
use crate::output::OutputPaths;
use crate::pipeline::PipelineSettings;
use crate::source::ScrollDelay;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

const ENV_PREFIX: &str = "CREATORSCAN_";

/// Main configuration structure
///
/// Scalar keys must come before the tables for TOML serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub keyword: String,
    pub number_of_initial_posts_to_scan: usize,
    pub posts_per_creator: usize,
    pub minimum_comments_required: usize,
    pub minimum_text_percentage_required: f64,
    /// Seconds between comment batch requests, as `[min, max]`
    pub scroll_delay_range: ScrollDelay,
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Comment collection bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub triage_max_batches: usize,
    pub full_max_batches: usize,
    pub stability_threshold: usize,
    /// Per-post time limit such as "90s" or "2m"; empty means none
    pub deadline: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        let triage = CollectorConfig::triage();
        Self {
            triage_max_batches: triage.max_batches,
            full_max_batches: CollectorConfig::full().max_batches,
            stability_threshold: triage.stability_threshold,
            deadline: String::new(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub posts_csv: PathBuf,
    pub creators_csv: PathBuf,
    pub runs_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            posts_csv: PathBuf::from("output/posts.csv"),
            creators_csv: PathBuf::from("output/creators.csv"),
            runs_dir: PathBuf::from("~/.creatorscan/runs"),
        }
    }
}

/// Profile-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_initial_posts_to_scan: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_per_creator: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_comments_required: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_text_percentage_required: Option<f64>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScanError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(ScanError::ConfigNotFound { path }) => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                let mut config = Self::default();
                config.apply_env_overrides();
                ConfigValidator::validate(&config)?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ScanError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the configuration
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| ScanError::Config(format!("Unknown profile: {}", profile)))?;

        if let Some(n) = overrides.number_of_initial_posts_to_scan {
            self.number_of_initial_posts_to_scan = n;
        }
        if let Some(n) = overrides.posts_per_creator {
            self.posts_per_creator = n;
        }
        if let Some(n) = overrides.minimum_comments_required {
            self.minimum_comments_required = n;
        }
        if let Some(pct) = overrides.minimum_text_percentage_required {
            self.minimum_text_percentage_required = pct;
        }

        tracing::debug!("Applied profile '{}'", profile);
        ConfigValidator::validate(self)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: CREATORSCAN_KEY or CREATORSCAN_SECTION__KEY
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "KEYWORD" => self.keyword = value.to_string(),
            "NUMBER_OF_INITIAL_POSTS_TO_SCAN" => {
                self.number_of_initial_posts_to_scan = parse_env(path, value)?
            }
            "POSTS_PER_CREATOR" => self.posts_per_creator = parse_env(path, value)?,
            "MINIMUM_COMMENTS_REQUIRED" => {
                self.minimum_comments_required = parse_env(path, value)?
            }
            "MINIMUM_TEXT_PERCENTAGE_REQUIRED" => {
                self.minimum_text_percentage_required = parse_env(path, value)?
            }
            "PIPELINE__WORKERS" => self.pipeline.workers = parse_env(path, value)?,
            "COLLECTION__DEADLINE" => self.collection.deadline = value.to_string(),
            "OUTPUT__RUNS_DIR" => self.output.runs_dir = PathBuf::from(value),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Admission thresholds
    pub fn criteria(&self) -> AdmissionCriteria {
        AdmissionCriteria::new(
            self.minimum_comments_required,
            self.minimum_text_percentage_required,
        )
    }

    /// Per-post collection deadline, if configured
    pub fn deadline(&self) -> Result<Option<Duration>> {
        let raw = self.collection.deadline.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_duration(raw)
            .map(Some)
            .ok_or_else(|| ScanError::InvalidConfigValue {
                path: "collection.deadline".to_string(),
                message: format!("Invalid duration format: {}", raw),
            })
    }

    /// Settings for a pipeline run
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let deadline = self.deadline()?;
        let stability_threshold = self.collection.stability_threshold;

        Ok(PipelineSettings {
            keyword: self.keyword.clone(),
            candidate_limit: self.number_of_initial_posts_to_scan,
            posts_per_creator: self.posts_per_creator,
            criteria: self.criteria(),
            triage: CollectorConfig {
                max_batches: self.collection.triage_max_batches,
                stability_threshold,
                deadline,
            },
            full: CollectorConfig {
                max_batches: self.collection.full_max_batches,
                stability_threshold,
                deadline,
            },
        })
    }

    /// CSV output locations
    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            posts_csv: expand_home(&self.output.posts_csv),
            creators_csv: expand_home(&self.output.creators_csv),
        }
    }

    /// Run record directory with `~` expanded
    pub fn runs_dir(&self) -> PathBuf {
        expand_home(&self.output.runs_dir)
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ScanError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("creatorscan").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let criteria = AdmissionCriteria::default();

        Self {
            keyword: "lifestyle".to_string(),
            number_of_initial_posts_to_scan: 20,
            posts_per_creator: 5,
            minimum_comments_required: criteria.min_comments,
            minimum_text_percentage_required: criteria.min_text_percentage,
            scroll_delay_range: ScrollDelay::new(2.0, 4.0),
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            collection: CollectionConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ScanError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)\s*(ms|s|m|h)?$").ok())
        .as_ref()
}

/// Parse durations like "500ms", "90s", "2m", "1h"; a bare number is seconds
pub fn parse_duration(s: &str) -> Option<Duration> {
    let caps = duration_pattern()?.captures(s.trim())?;
    let value: u64 = caps.get(1)?.as_str().parse().ok()?;
    let duration = match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => Duration::from_millis(value),
        Some("m") => Duration::from_secs(value.checked_mul(60)?),
        Some("h") => Duration::from_secs(value.checked_mul(3600)?),
        _ => Duration::from_secs(value),
    };
    Some(duration)
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.keyword, "lifestyle");
        assert_eq!(config.number_of_initial_posts_to_scan, 20);
        assert_eq!(config.posts_per_creator, 5);
        assert_eq!(config.minimum_comments_required, 50);
        assert_eq!(config.minimum_text_percentage_required, 50.0);
        assert_eq!(config.scroll_delay_range, ScrollDelay::new(2.0, 4.0));
        assert_eq!(config.pipeline.workers, 1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.keyword = "travel".to_string();
        config.profiles.insert(
            "strict".to_string(),
            ProfileOverrides {
                minimum_comments_required: Some(100),
                minimum_text_percentage_required: Some(70.0),
                ..Default::default()
            },
        );
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.keyword, "travel");
        assert_eq!(loaded.collection.full_max_batches, 15);

        let strict = Config::load_with_profile(&path, "strict").unwrap();
        assert_eq!(strict.minimum_comments_required, 100);
        assert_eq!(strict.minimum_text_percentage_required, 70.0);
        assert_eq!(strict.posts_per_creator, 5);
    }

    #[test]
    fn test_minimal_file_uses_section_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
keyword = "food"
number_of_initial_posts_to_scan = 10
posts_per_creator = 3
minimum_comments_required = 40
minimum_text_percentage_required = 55.5
scroll_delay_range = [1, 2]

[_meta]
schema_version = "1.0.0"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scroll_delay_range, ScrollDelay::new(1.0, 2.0));
        assert_eq!(config.collection.triage_max_batches, 10);
        assert_eq!(config.output.posts_csv, PathBuf::from("output/posts.csv"));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(&path),
            Err(ScanError::ConfigNotFound { .. })
        ));
        assert_eq!(Config::load_or_default(&path).unwrap().posts_per_creator, 5);
    }

    #[test]
    fn test_unknown_profile() {
        let mut config = Config::default();
        assert!(config.apply_profile("nope").is_err());
    }

    #[test]
    fn test_env_values() {
        let mut config = Config::default();
        config.set_value_from_env("KEYWORD", "travel").unwrap();
        config.set_value_from_env("PIPELINE__WORKERS", "4").unwrap();
        config
            .set_value_from_env("MINIMUM_TEXT_PERCENTAGE_REQUIRED", "62.5")
            .unwrap();
        assert_eq!(config.keyword, "travel");
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.minimum_text_percentage_required, 62.5);

        assert!(config
            .set_value_from_env("POSTS_PER_CREATOR", "many")
            .is_err());
        assert_eq!(config.posts_per_creator, 5);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("-5s"), None);
    }

    #[test]
    fn test_pipeline_settings() {
        let mut config = Config::default();
        config.collection.deadline = "45s".to_string();
        let settings = config.pipeline_settings().unwrap();
        assert_eq!(settings.candidate_limit, 20);
        assert_eq!(settings.triage.max_batches, 10);
        assert_eq!(settings.full.max_batches, 15);
        assert_eq!(settings.full.deadline, Some(Duration::from_secs(45)));
        assert_eq!(settings.criteria, AdmissionCriteria::new(50, 50.0));
    }

    #[test]
    fn test_expand_home() {
        let plain = PathBuf::from("output/posts.csv");
        assert_eq!(expand_home(&plain), plain);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/.creatorscan/runs")),
                home.join(".creatorscan/runs")
            );
        }
    }
}
