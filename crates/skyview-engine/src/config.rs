//! Process-wide engine configuration.
//!
//! Built once at startup (defaults, then an optional TOML file, then
//! `SKYVIEW_*` environment overrides), validated, and shared read-only
//! behind an `Arc`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skyview_geom::{AngularRange, ValidationMode, DEFAULT_SAMPLE_COUNT};

use crate::error::{EngineError, Result};

/// Default per-direction evaluation timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default cap on directions in one batch (a tenth of a degree over a full
/// turn).
pub const DEFAULT_MAX_NUM_DIRECTIONS: usize = 3_600;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directions sampled when a request does not specify a count.
    pub default_num_directions: usize,
    /// Largest number of directions a single request may ask for.
    pub max_num_directions: usize,
    /// Azimuth range for sampled directions.
    pub range: AngularRange,
    /// Maximum directional evaluations in flight at once (`None` = all).
    pub max_concurrency: Option<usize>,
    /// Timeout for a single directional evaluation, in milliseconds.
    pub evaluation_timeout_ms: u64,
    /// Policy for degenerate triangles when a request does not choose one.
    pub validation: ValidationMode,
    /// Base URL of a remote compute peer used when a request names none.
    pub remote_target: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_num_directions: DEFAULT_SAMPLE_COUNT,
            max_num_directions: DEFAULT_MAX_NUM_DIRECTIONS,
            range: AngularRange::default(),
            max_concurrency: None,
            evaluation_timeout_ms: DEFAULT_TIMEOUT_MS,
            validation: ValidationMode::default(),
            remote_target: None,
        }
    }
}

impl EngineConfig {
    /// Parse from TOML; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply `SKYVIEW_*` environment overrides.
    ///
    /// - `SKYVIEW_NUM_DIRECTIONS`
    /// - `SKYVIEW_MAX_NUM_DIRECTIONS`
    /// - `SKYVIEW_MAX_CONCURRENCY` (`0` or empty means unbounded)
    /// - `SKYVIEW_TIMEOUT_MS`
    /// - `SKYVIEW_VALIDATION` (`strict` | `lenient`)
    /// - `SKYVIEW_REMOTE_TARGET`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SKYVIEW_NUM_DIRECTIONS") {
            self.default_num_directions = parse_env("SKYVIEW_NUM_DIRECTIONS", &v)?;
        }
        if let Some(v) = lookup("SKYVIEW_MAX_NUM_DIRECTIONS") {
            self.max_num_directions = parse_env("SKYVIEW_MAX_NUM_DIRECTIONS", &v)?;
        }
        if let Some(v) = lookup("SKYVIEW_MAX_CONCURRENCY") {
            let limit: usize = if v.trim().is_empty() {
                0
            } else {
                parse_env("SKYVIEW_MAX_CONCURRENCY", &v)?
            };
            self.max_concurrency = (limit > 0).then_some(limit);
        }
        if let Some(v) = lookup("SKYVIEW_TIMEOUT_MS") {
            self.evaluation_timeout_ms = parse_env("SKYVIEW_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("SKYVIEW_VALIDATION") {
            self.validation = match v.trim().to_ascii_lowercase().as_str() {
                "strict" => ValidationMode::Strict,
                "lenient" => ValidationMode::Lenient,
                other => {
                    return Err(EngineError::Config(format!(
                        "SKYVIEW_VALIDATION must be strict or lenient, got {other:?}"
                    )))
                }
            };
        }
        if let Some(v) = lookup("SKYVIEW_REMOTE_TARGET") {
            let v = v.trim();
            self.remote_target = (!v.is_empty()).then(|| v.to_string());
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants.
    pub fn validate(&self) -> Result<()> {
        if self.default_num_directions == 0 {
            return Err(EngineError::Config(
                "default_num_directions must be at least 1".into(),
            ));
        }
        if self.default_num_directions > self.max_num_directions {
            return Err(EngineError::Config(format!(
                "default_num_directions ({}) exceeds max_num_directions ({})",
                self.default_num_directions, self.max_num_directions
            )));
        }
        if self.max_concurrency == Some(0) {
            return Err(EngineError::Config(
                "max_concurrency must be positive when set".into(),
            ));
        }
        if self.evaluation_timeout_ms == 0 {
            return Err(EngineError::Config(
                "evaluation_timeout_ms must be positive".into(),
            ));
        }
        self.range
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(())
    }

    /// Reject a requested direction count above `max_num_directions`.
    pub fn check_direction_count(&self, n: usize) -> Result<()> {
        if n > self.max_num_directions {
            return Err(EngineError::Validation(format!(
                "{n} directions requested, at most {} allowed",
                self.max_num_directions
            )));
        }
        Ok(())
    }

    /// Per-direction timeout.
    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }

    /// Concurrency limit for a batch of `n` directions (at least 1).
    pub fn concurrency_limit(&self, n: usize) -> usize {
        self.max_concurrency.map_or(n, |m| m.min(n)).max(1)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Config(format!("{key} has invalid value {value:?}")))
}
