//! Export and import configuration

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::format::Format;
use crate::relationships::Includes;

/// What to do when a natural-key lookup matches more than one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaturalKeyPolicy {
    /// Fail the import with an ambiguous-match error
    Strict,
    /// Take the first candidate in store order
    First,
}

impl Default for NaturalKeyPolicy {
    fn default() -> Self {
        NaturalKeyPolicy::Strict
    }
}

impl FromStr for NaturalKeyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(NaturalKeyPolicy::Strict),
            "first" => Ok(NaturalKeyPolicy::First),
            _ => Err(ConfigError::InvalidValue {
                field: "natural_key_policy".to_string(),
                value: s.to_string(),
                expected: "strict or first".to_string(),
            }),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Associations to traverse
    pub includes: Includes,

    /// Remove identifiers and belongs-to foreign keys from the output
    pub strip_ids: bool,

    /// Encoding used when writing; `None` means detect from the destination path
    pub format: Option<Format>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            includes: Includes::none(),
            strip_ids: false,
            format: None,
        }
    }
}

impl ExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `EXPORTABLE_FORMAT` and `EXPORTABLE_STRIP_IDS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let format = match get_env_optional("EXPORTABLE_FORMAT") {
            Some(value) => Some(value.parse::<Format>().map_err(|_| ConfigError::InvalidValue {
                field: "EXPORTABLE_FORMAT".to_string(),
                value,
                expected: "json or yaml".to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            includes: Includes::none(),
            strip_ids: get_env_bool("EXPORTABLE_STRIP_IDS", false)?,
            format,
        })
    }

    pub fn with_includes(mut self, includes: impl Into<Includes>) -> Self {
        self.includes = includes.into();
        self
    }

    pub fn strip_ids(mut self) -> Self {
        self.strip_ids = true;
        self
    }

    pub fn keep_ids(mut self) -> Self {
        self.strip_ids = false;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}

/// Import configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Overwrite attributes of matched existing records
    pub allow_update: bool,

    /// Treat identifiers in the document as absent
    pub ignore_ids: bool,

    pub natural_key_policy: NaturalKeyPolicy,
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `EXPORTABLE_ALLOW_UPDATE`, `EXPORTABLE_IGNORE_IDS` and
    /// `EXPORTABLE_NATURAL_KEYS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let natural_key_policy = match get_env_optional("EXPORTABLE_NATURAL_KEYS") {
            Some(value) => value.parse()?,
            None => NaturalKeyPolicy::default(),
        };

        Ok(Self {
            allow_update: get_env_bool("EXPORTABLE_ALLOW_UPDATE", false)?,
            ignore_ids: get_env_bool("EXPORTABLE_IGNORE_IDS", false)?,
            natural_key_policy,
        })
    }

    pub fn allow_update(mut self) -> Self {
        self.allow_update = true;
        self
    }

    pub fn ignore_ids(mut self) -> Self {
        self.ignore_ids = true;
        self
    }

    pub fn with_natural_key_policy(mut self, policy: NaturalKeyPolicy) -> Self {
        self.natural_key_policy = policy;
        self
    }
}

fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_bool(key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_env_optional(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                field: key.to_string(),
                value,
                expected: "a boolean (true/false)".to_string(),
            }),
        },
    }
}
