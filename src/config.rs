//! Construction policy loaded from `stepscript.yaml`.
//!
//! ```yaml
//! number_fallback: warn        # error | warn
//! warnings_as_errors: false
//! duplicate_map_keys: allow    # warn | allow
//! ```
//!
//! Every key is optional; a missing file means defaults.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{builder::BuildOptions, diagnostics::Severity, errors::StepError};

pub const CONFIG_FILE: &str = "stepscript.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    #[default]
    Error,
    Warn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    #[default]
    Warn,
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Severity of a numeric literal that fits neither `i64` nor `f64`.
    pub number_fallback: FallbackPolicy,
    /// Reject a script that produced any diagnostic at all.
    pub warnings_as_errors: bool,
    pub duplicate_map_keys: DuplicateKeyPolicy,
}

impl Config {
    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, StepError> {
        // An empty file deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| StepError::Config {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, StepError> {
        let text = fs::read_to_string(path).map_err(|source| StepError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&text, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }

    /// Loads `stepscript.yaml` from `dir` if present, otherwise defaults.
    pub fn discover(dir: &Path) -> Result<Self, StepError> {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            tracing::trace!(dir = %dir.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            number_fallback: match self.number_fallback {
                FallbackPolicy::Error => Severity::Error,
                FallbackPolicy::Warn => Severity::Warning,
            },
            warn_duplicate_map_keys: self.duplicate_map_keys == DuplicateKeyPolicy::Warn,
        }
    }
}
