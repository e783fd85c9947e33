use quarry_common::{QuarryError, Result};
use quarry_logger::LogSeverity;
use quarry_nbt::Tolerance;
use quarry_region::{FailurePolicy, LoadOptions};
use serde::Deserialize;
use std::path::Path;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "quarry.json";
/// Overrides `log_level` when set.
pub const LOG_LEVEL_ENV: &str = "QUARRY_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceSetting {
    Ignore,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicySetting {
    DropRegion,
    SkipChunk,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Directory under the world holding region files.
    pub region_dir: String,
    /// Region file extension, without the dot.
    pub extension: String,
    pub compression_level: i32,
    pub max_concurrency: usize,
    pub tolerance: ToleranceSetting,
    pub failure_policy: FailurePolicySetting,
    pub log_level: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        let load = LoadOptions::default();
        ConvertConfig {
            region_dir: "region".to_owned(),
            extension: "mca".to_owned(),
            compression_level: quarry_slime::DEFAULT_COMPRESSION_LEVEL,
            max_concurrency: load.max_concurrency,
            tolerance: ToleranceSetting::Ignore,
            failure_policy: FailurePolicySetting::DropRegion,
            log_level: "info".to_owned(),
        }
    }
}

impl ConvertConfig {
    /// Reads `path` if given, else `quarry.json` when it exists, else defaults.
    /// `QUARRY_LOG` is applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => ConvertConfig::default(),
        };
        config.with_log_override(std::env::var(LOG_LEVEL_ENV).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            QuarryError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
            .map_err(|e| QuarryError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: ConvertConfig =
            serde_json::from_str(text).map_err(|e| QuarryError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_log_override(mut self, level: Option<String>) -> Result<Self> {
        if let Some(level) = level.filter(|level| !level.is_empty()) {
            self.log_level = level;
            self.validate()?;
        }
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        self.severity()?;
        if self.max_concurrency == 0 {
            return Err(QuarryError::ConfigError(
                "max_concurrency must be at least 1".to_owned(),
            ));
        }
        if !zstd::compression_level_range().contains(&self.compression_level) {
            return Err(QuarryError::ConfigError(format!(
                "compression_level {} is out of range",
                self.compression_level
            )));
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(QuarryError::ConfigError(format!(
                "extension `{}` must be non-empty and given without a dot",
                self.extension
            )));
        }
        Ok(())
    }

    pub fn severity(&self) -> Result<LogSeverity> {
        self.log_level.parse().map_err(QuarryError::ConfigError)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            tolerance: match self.tolerance {
                ToleranceSetting::Ignore => Tolerance::Ignore,
                ToleranceSetting::Reject => Tolerance::Reject,
            },
            failure_policy: match self.failure_policy {
                FailurePolicySetting::DropRegion => FailurePolicy::DropRegion,
                FailurePolicySetting::SkipChunk => FailurePolicy::SkipChunk,
            },
            max_concurrency: self.max_concurrency,
        }
    }
}
