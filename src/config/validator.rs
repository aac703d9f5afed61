use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::error::{Result, ScanError, ValidationError};
use crate::source::ScrollDelay;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, reporting every violation at once
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_admission(config, &mut errors);
        Self::validate_scroll_delay(config, &mut errors);
        Self::validate_collection(config, &mut errors);
        Self::validate_pipeline(config, &mut errors);
        Self::validate_output(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScanError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.keyword.trim().is_empty() {
            errors.push(ValidationError::new("keyword", "Keyword cannot be empty"));
        }

        if config.number_of_initial_posts_to_scan == 0 {
            errors.push(ValidationError::new(
                "number_of_initial_posts_to_scan",
                "Number of initial posts must be greater than 0",
            ));
        }

        if config.posts_per_creator == 0 {
            errors.push(ValidationError::new(
                "posts_per_creator",
                "Posts per creator must be greater than 0",
            ));
        }
    }

    fn validate_admission(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.minimum_comments_required == 0 {
            errors.push(ValidationError::new(
                "minimum_comments_required",
                "Minimum comments must be greater than 0",
            ));
        }

        let pct = config.minimum_text_percentage_required;
        if !(0.0..=100.0).contains(&pct) {
            errors.push(ValidationError::new(
                "minimum_text_percentage_required",
                format!("Text percentage must be between 0 and 100, got {}", pct),
            ));
        }
    }

    fn validate_scroll_delay(config: &Config, errors: &mut Vec<ValidationError>) {
        let delay = config.scroll_delay_range;
        if !delay.min_secs.is_finite() || !delay.max_secs.is_finite() {
            errors.push(ValidationError::new(
                "scroll_delay_range",
                "Delays must be finite numbers",
            ));
            return;
        }
        if delay.min_secs < 0.0 || delay.max_secs < 0.0 {
            errors.push(ValidationError::new(
                "scroll_delay_range",
                "Delays cannot be negative",
            ));
        }
        if delay.max_secs > ScrollDelay::MAX_SECS {
            errors.push(ValidationError::new(
                "scroll_delay_range",
                format!(
                    "Delays cannot exceed {} seconds, got {}",
                    ScrollDelay::MAX_SECS,
                    delay.max_secs
                ),
            ));
        }
        if delay.min_secs > delay.max_secs {
            errors.push(ValidationError::new(
                "scroll_delay_range",
                format!(
                    "Minimum delay {} exceeds maximum {}",
                    delay.min_secs, delay.max_secs
                ),
            ));
        }
    }

    fn validate_collection(config: &Config, errors: &mut Vec<ValidationError>) {
        let collection = &config.collection;

        if collection.triage_max_batches == 0 {
            errors.push(ValidationError::new(
                "collection.triage_max_batches",
                "Batch cap must be greater than 0",
            ));
        }

        if collection.full_max_batches == 0 {
            errors.push(ValidationError::new(
                "collection.full_max_batches",
                "Batch cap must be greater than 0",
            ));
        }

        if collection.stability_threshold == 0 {
            errors.push(ValidationError::new(
                "collection.stability_threshold",
                "Stability threshold must be greater than 0",
            ));
        }

        let deadline = collection.deadline.trim();
        if !deadline.is_empty() && parse_duration(deadline).is_none() {
            errors.push(ValidationError::new(
                "collection.deadline",
                format!("Invalid duration format: {}", deadline),
            ));
        }
    }

    fn validate_pipeline(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.pipeline.workers == 0 {
            errors.push(ValidationError::new(
                "pipeline.workers",
                "Workers must be at least 1",
            ));
        }
    }

    fn validate_output(config: &Config, errors: &mut Vec<ValidationError>) {
        let output = &config.output;
        let paths = [
            ("output.posts_csv", &output.posts_csv),
            ("output.creators_csv", &output.creators_csv),
            ("output.runs_dir", &output.runs_dir),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(key, "Path cannot be empty"));
            }
        }
    }
}
