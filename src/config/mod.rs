//! Plugin options from prefshare.toml
//!
//! The one recognized option is the bundle-id list; the permission name
//! and provider authority can be overridden but default to values built
//! from the `${applicationId}` placeholder at merge time.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::merge::ProviderOverrides;

/// Default config file name, resolved relative to the invocation dir
pub const DEFAULT_CONFIG_FILE: &str = "prefshare.toml";

/// Error types for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options controlling the manifest merge
///
/// ```toml
/// apps_bundle_ids = ["com.example.app2"]
/// # optional overrides
/// permission_name = "com.custom.permission.READ_SHARED_PREFS"
/// provider_authority = "com.custom.sharedpreferencesprovider"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Bundle ids of the sibling apps to share data with. Duplicates are
    /// tolerated; the merge deduplicates. Identifier well-formedness is
    /// deliberately not validated.
    #[serde(default)]
    pub apps_bundle_ids: Vec<String>,

    /// Override for the declared permission name
    pub permission_name: Option<String>,

    /// Override for the provider authority string
    pub provider_authority: Option<String>,
}

impl ShareConfig {
    /// Load and parse config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse config from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Bundle ids from the file followed by CLI-supplied extras
    pub fn bundle_ids_with(&self, extra: &[String]) -> Vec<String> {
        let mut ids = self.apps_bundle_ids.clone();
        ids.extend_from_slice(extra);
        ids
    }

    /// Operation B overrides carried by this config
    pub fn provider_overrides(&self) -> ProviderOverrides {
        ProviderOverrides {
            permission_name: self.permission_name.clone(),
            provider_authority: self.provider_authority.clone(),
        }
    }
}
