//! Manifest-transform pass orchestration
//!
//! Wires the boundary pieces around the merge core: load the manifest
//! file, parse it, run the three merge operations in the documented
//! order (uses-permissions, then permission + provider, then queries),
//! and render and write the result back. The operations touch disjoint
//! containers and are order-independent; the documented order is kept
//! anyway so regenerated manifests keep their element ordering.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, ShareConfig, DEFAULT_CONFIG_FILE};
use crate::manifest::{ManifestDocument, ManifestError};
use crate::merge::{
    add_package_queries, add_permission_and_provider, add_uses_permissions,
    READ_SHARED_PREFS_SUFFIX,
};
use crate::xml::{self, XmlDocument, XmlError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 1,
            PipelineError::ManifestNotFound(_) => 1,
            PipelineError::Xml(_) => 2,
            PipelineError::Manifest(_) => 2,
            PipelineError::Io(_) => 1,
            PipelineError::Serialization(_) => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to AndroidManifest.xml
    pub manifest_path: PathBuf,

    /// Path to prefshare.toml (default: ./prefshare.toml when present)
    pub config_path: Option<PathBuf>,

    /// Bundle ids supplied on the command line, appended after the
    /// config file's list
    pub bundle_ids: Vec<String>,

    /// Print the merged manifest instead of writing the file
    pub dry_run: bool,

    /// Verbose progress on stderr
    pub verbose: bool,
}

impl PipelineConfig {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            config_path: None,
            bundle_ids: Vec::new(),
            dry_run: false,
            verbose: false,
        }
    }
}

/// What one transform pass changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Manifest the pass ran against
    pub manifest_path: String,

    /// New uses-permission entries appended
    pub uses_permissions_added: usize,

    /// Whether the declared permission was appended
    pub permission_added: bool,

    /// Whether the provider was appended
    pub provider_added: bool,

    /// False when the manifest had no application node (provider skipped)
    pub application_present: bool,

    /// New queries/package entries appended
    pub packages_added: usize,
}

impl MergeSummary {
    /// True when the pass appended anything
    pub fn changed(&self) -> bool {
        self.uses_permissions_added > 0
            || self.permission_added
            || self.provider_added
            || self.packages_added > 0
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut lines = vec![format!("Manifest: {}", self.manifest_path)];
        lines.push(format!(
            "  uses-permission entries added: {}",
            self.uses_permissions_added
        ));
        lines.push(format!("  permission added: {}", self.permission_added));
        if self.application_present {
            lines.push(format!("  provider added: {}", self.provider_added));
        } else {
            lines.push("  provider skipped: no <application> node".to_string());
        }
        lines.push(format!("  queries packages added: {}", self.packages_added));
        lines.join("\n")
    }
}

/// Outcome of [`Pipeline::run`]
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: MergeSummary,

    /// The rendered manifest after the merge
    pub rendered: String,

    /// False on dry runs
    pub written: bool,
}

/// One manifest-transform pass
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the merge and write the manifest back (unless dry-run)
    pub fn run(&self) -> PipelineResult<RunOutcome> {
        let share_config = self.load_share_config()?;
        let bundle_ids = share_config.bundle_ids_with(&self.config.bundle_ids);

        if self.config.verbose {
            eprintln!(
                "Merging {} bundle id(s) into {}",
                bundle_ids.len(),
                self.config.manifest_path.display()
            );
        }

        let source = self.read_manifest()?;
        let parsed = xml::parse(&source)?;
        let has_declaration = parsed.has_declaration;
        let mut manifest = ManifestDocument::from_root(parsed.root)?;

        let summary = self.apply_merges(&mut manifest, &bundle_ids, &share_config);

        let rendered = xml::render(&XmlDocument {
            has_declaration,
            root: manifest.into_root(),
        })?;

        let written = if self.config.dry_run {
            false
        } else {
            fs::write(&self.config.manifest_path, &rendered)?;
            if self.config.verbose {
                eprintln!("Wrote: {}", self.config.manifest_path.display());
            }
            true
        };

        Ok(RunOutcome {
            summary,
            rendered,
            written,
        })
    }

    /// Report what a run would change, without touching the file.
    ///
    /// A summary with `changed() == false` means the manifest already
    /// contains every entry the merge would add.
    pub fn check(&self) -> PipelineResult<MergeSummary> {
        let share_config = self.load_share_config()?;
        let bundle_ids = share_config.bundle_ids_with(&self.config.bundle_ids);

        let source = self.read_manifest()?;
        let parsed = xml::parse(&source)?;
        let mut manifest = ManifestDocument::from_root(parsed.root)?;

        Ok(self.apply_merges(&mut manifest, &bundle_ids, &share_config))
    }

    fn apply_merges(
        &self,
        manifest: &mut ManifestDocument,
        bundle_ids: &[String],
        share_config: &ShareConfig,
    ) -> MergeSummary {
        let uses_permissions_added =
            add_uses_permissions(manifest, bundle_ids, READ_SHARED_PREFS_SUFFIX);
        let outcome = add_permission_and_provider(manifest, &share_config.provider_overrides());
        let packages_added = add_package_queries(manifest, bundle_ids);

        MergeSummary {
            manifest_path: self.config.manifest_path.display().to_string(),
            uses_permissions_added,
            permission_added: outcome.permission_added,
            provider_added: outcome.provider_added,
            application_present: outcome.application_present,
            packages_added,
        }
    }

    fn read_manifest(&self) -> PipelineResult<String> {
        if !self.config.manifest_path.exists() {
            return Err(PipelineError::ManifestNotFound(
                self.config.manifest_path.clone(),
            ));
        }
        Ok(fs::read_to_string(&self.config.manifest_path)?)
    }

    /// Explicit config path must exist; the default path is optional.
    fn load_share_config(&self) -> PipelineResult<ShareConfig> {
        match &self.config.config_path {
            Some(path) => Ok(ShareConfig::from_file(path)?),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Ok(ShareConfig::from_file(default)?)
                } else {
                    Ok(ShareConfig::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::new("AndroidManifest.xml");
        assert!(config.config_path.is_none());
        assert!(config.bundle_ids.is_empty());
        assert!(!config.dry_run);
        assert!(!config.verbose);
    }

    #[test]
    fn test_summary_changed() {
        let mut summary = MergeSummary {
            manifest_path: "AndroidManifest.xml".to_string(),
            uses_permissions_added: 0,
            permission_added: false,
            provider_added: false,
            application_present: true,
            packages_added: 0,
        };
        assert!(!summary.changed());

        summary.packages_added = 1;
        assert!(summary.changed());
    }

    #[test]
    fn test_summary_json_round_trip() {
        let summary = MergeSummary {
            manifest_path: "app/src/main/AndroidManifest.xml".to_string(),
            uses_permissions_added: 2,
            permission_added: true,
            provider_added: true,
            application_present: true,
            packages_added: 3,
        };

        let json = summary.to_json().unwrap();
        let parsed: MergeSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.uses_permissions_added, 2);
        assert_eq!(parsed.packages_added, 3);
    }

    #[test]
    fn test_missing_manifest_is_error_with_exit_code() {
        let pipeline = Pipeline::new(PipelineConfig::new("/nonexistent/AndroidManifest.xml"));
        let err = pipeline.run().unwrap_err();

        assert!(matches!(err, PipelineError::ManifestNotFound(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
