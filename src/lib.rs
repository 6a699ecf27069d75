//! prefshare-manifest - AndroidManifest.xml merger for cross-app
//! SharedPreferences sharing
//!
//! This crate implements the build-time manifest mutation behind the
//! app-data-sharing setup: given a manifest and a set of sibling app
//! bundle ids, it idempotently merges `uses-permission` declarations, a
//! declared permission + content provider pair, and `<queries>` package
//! visibility entries. The merge core is pure and infallible; parsing,
//! configuration, and file IO live at the boundary.

pub mod config;
pub mod manifest;
pub mod merge;
pub mod pipeline;
pub mod xml;

pub use config::ShareConfig;
pub use manifest::ManifestDocument;
pub use merge::{
    add_package_queries, add_permission_and_provider, add_uses_permissions, ProviderOverrides,
};
pub use pipeline::{MergeSummary, Pipeline, PipelineConfig, PipelineError};
