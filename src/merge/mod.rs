//! Idempotent manifest-merge operations
//!
//! Three independent merges share one shape: ensure the container
//! exists, collect the identities already present, append only the
//! missing entries. Nothing is ever removed, modified, or reordered,
//! and re-running any operation is a no-op.
//!
//! The core is infallible: degenerate documents (missing containers,
//! missing application node, entries without an identity attribute) are
//! tolerated, never an error.

use std::collections::HashSet;

use crate::manifest::{
    ManifestDocument, PackageQuery, Permission, Provider, QueriesBlock, UsesPermission,
};

/// Build-time token the host pipeline substitutes with the final
/// application id; passed through verbatim here.
pub const APPLICATION_ID_PLACEHOLDER: &str = "${applicationId}";

/// Suffix appended to a bundle id to form its read permission
pub const READ_SHARED_PREFS_SUFFIX: &str = ".permission.READ_SHARED_PREFS";

/// Suffix for the default provider authority
pub const PROVIDER_AUTHORITY_SUFFIX: &str = ".sharedpreferencesprovider";

/// Fixed provider component name; not configurable
pub const PROVIDER_NAME: &str = "com.data.SharedPreferencesProvider";

const PROTECTION_LEVEL_NORMAL: &str = "normal";

/// Element kinds keyed by an `android:name` identity
trait Identified {
    fn identity(&self) -> Option<&str>;
}

impl Identified for UsesPermission {
    fn identity(&self) -> Option<&str> {
        self.name()
    }
}

impl Identified for Permission {
    fn identity(&self) -> Option<&str> {
        self.name()
    }
}

impl Identified for Provider {
    fn identity(&self) -> Option<&str> {
        self.name()
    }
}

impl Identified for PackageQuery {
    fn identity(&self) -> Option<&str> {
        self.name()
    }
}

fn identity_set<T: Identified>(entries: &[T]) -> HashSet<String> {
    entries
        .iter()
        .filter_map(|e| e.identity())
        .map(str::to_string)
        .collect()
}

/// Append entries for every candidate identity not already present.
///
/// Candidates are deduplicated preserving first occurrence; existing
/// entries decide membership by identity only, so their other attributes
/// are never consulted or touched. Returns the number appended.
fn append_missing<T, I, F>(entries: &mut Vec<T>, candidates: I, build: F) -> usize
where
    T: Identified,
    I: IntoIterator<Item = String>,
    F: Fn(String) -> T,
{
    let mut present = identity_set(entries);
    let mut added = 0;

    for candidate in candidates {
        if present.contains(&candidate) {
            continue;
        }
        present.insert(candidate.clone());
        entries.push(build(candidate));
        added += 1;
    }

    added
}

/// Operation A: merge `<uses-permission>` declarations.
///
/// For each bundle id, the candidate permission is `id + suffix`. The
/// container is created when absent even if no entries are added, since
/// downstream steps may assume it exists.
pub fn add_uses_permissions(
    doc: &mut ManifestDocument,
    bundle_ids: &[String],
    suffix: &str,
) -> usize {
    let entries = doc.uses_permissions.get_or_insert_with(Vec::new);

    append_missing(
        entries,
        bundle_ids.iter().map(|id| format!("{id}{suffix}")),
        UsesPermission::new,
    )
}

/// Overrides for Operation B; defaults are built from the
/// `${applicationId}` placeholder when unset.
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    pub permission_name: Option<String>,
    pub provider_authority: Option<String>,
}

/// What Operation B did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderOutcome {
    pub permission_added: bool,
    pub provider_added: bool,
    /// False when the manifest has no application node; provider
    /// insertion is then skipped without error.
    pub application_present: bool,
}

/// Operation B: merge the declared permission and the shared-preferences
/// provider.
///
/// The provider's component name is fixed; only its authority and the
/// permission it requires are configurable.
pub fn add_permission_and_provider(
    doc: &mut ManifestDocument,
    overrides: &ProviderOverrides,
) -> ProviderOutcome {
    let permission_name = overrides
        .permission_name
        .clone()
        .unwrap_or_else(|| format!("{APPLICATION_ID_PLACEHOLDER}{READ_SHARED_PREFS_SUFFIX}"));
    let provider_authority = overrides
        .provider_authority
        .clone()
        .unwrap_or_else(|| format!("{APPLICATION_ID_PLACEHOLDER}{PROVIDER_AUTHORITY_SUFFIX}"));

    let permissions = doc.permissions.get_or_insert_with(Vec::new);
    let permission_added = append_missing(
        permissions,
        std::iter::once(permission_name.clone()),
        |name| Permission::new(name, PROTECTION_LEVEL_NORMAL),
    ) > 0;

    // No application node is a tolerated degenerate case, not an error.
    let Some(application) = doc.applications.first_mut() else {
        return ProviderOutcome {
            permission_added,
            provider_added: false,
            application_present: false,
        };
    };

    let providers = application.providers.get_or_insert_with(Vec::new);
    let provider_added = append_missing(
        providers,
        std::iter::once(PROVIDER_NAME.to_string()),
        |name| Provider::new(name, provider_authority.clone(), permission_name.clone()),
    ) > 0;

    ProviderOutcome {
        permission_added,
        provider_added,
        application_present: true,
    }
}

/// Operation C: merge `<queries>` package visibility entries.
///
/// The desired set is the `${applicationId}` self-reference plus the
/// bundle ids. When several blocks structurally hold a package sequence
/// the first one found is used; which block absorbs new entries is
/// incidental rather than contractual.
pub fn add_package_queries(doc: &mut ManifestDocument, bundle_ids: &[String]) -> usize {
    let blocks = doc.queries.get_or_insert_with(Vec::new);

    if !blocks.iter().any(|b| b.packages.is_some()) {
        blocks.push(QueriesBlock::with_packages());
    }

    let Some(packages) = blocks.iter_mut().find_map(|b| b.packages.as_mut()) else {
        return 0;
    };

    let candidates = std::iter::once(APPLICATION_ID_PLACEHOLDER.to_string())
        .chain(bundle_ids.iter().cloned());

    append_missing(packages, candidates, PackageQuery::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestDocument;
    use crate::xml::parse;

    fn typed(source: &str) -> ManifestDocument {
        ManifestDocument::from_root(parse(source).unwrap().root).unwrap()
    }

    fn empty_manifest() -> ManifestDocument {
        typed(r#"<manifest package="com.example.app"><application/></manifest>"#)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn uses_permission_names(doc: &ManifestDocument) -> Vec<&str> {
        doc.uses_permissions
            .as_ref()
            .map(|entries| entries.iter().filter_map(|e| e.name()).collect())
            .unwrap_or_default()
    }

    fn package_names(doc: &ManifestDocument) -> Vec<&str> {
        doc.queries
            .as_ref()
            .and_then(|blocks| blocks.iter().find_map(|b| b.packages.as_ref()))
            .map(|pkgs| pkgs.iter().filter_map(|p| p.name()).collect())
            .unwrap_or_default()
    }

    // Operation A

    #[test]
    fn test_uses_permissions_added_with_suffix() {
        let mut doc = empty_manifest();
        let added =
            add_uses_permissions(&mut doc, &ids(&["com.example.app2"]), READ_SHARED_PREFS_SUFFIX);

        assert_eq!(added, 1);
        assert_eq!(
            uses_permission_names(&doc),
            vec!["com.example.app2.permission.READ_SHARED_PREFS"]
        );
    }

    #[test]
    fn test_uses_permissions_idempotent() {
        let mut doc = empty_manifest();
        add_uses_permissions(&mut doc, &ids(&["a", "b"]), READ_SHARED_PREFS_SUFFIX);
        let again = add_uses_permissions(&mut doc, &ids(&["a", "b"]), READ_SHARED_PREFS_SUFFIX);

        assert_eq!(again, 0);
        assert_eq!(doc.uses_permissions.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_uses_permissions_input_deduplicated() {
        let mut a = empty_manifest();
        let mut b = empty_manifest();

        add_uses_permissions(&mut a, &ids(&["a", "a", "b"]), READ_SHARED_PREFS_SUFFIX);
        add_uses_permissions(&mut b, &ids(&["a", "b"]), READ_SHARED_PREFS_SUFFIX);

        assert_eq!(uses_permission_names(&a), uses_permission_names(&b));
    }

    #[test]
    fn test_uses_permissions_empty_input_still_creates_container() {
        let mut doc = empty_manifest();
        assert!(doc.uses_permissions.is_none());

        let added = add_uses_permissions(&mut doc, &[], READ_SHARED_PREFS_SUFFIX);

        assert_eq!(added, 0);
        assert_eq!(doc.uses_permissions.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_uses_permissions_preserves_existing_order_and_attributes() {
        let mut doc = typed(
            r#"<manifest>
    <uses-permission android:name="android.permission.INTERNET" tools:node="merge"/>
    <uses-permission android:name="android.permission.CAMERA"/>
</manifest>"#,
        );

        add_uses_permissions(&mut doc, &ids(&["com.other"]), READ_SHARED_PREFS_SUFFIX);

        let names = uses_permission_names(&doc);
        assert_eq!(
            names,
            vec![
                "android.permission.INTERNET",
                "android.permission.CAMERA",
                "com.other.permission.READ_SHARED_PREFS",
            ],
            "existing entries keep their order, new ones append"
        );
        assert_eq!(
            doc.uses_permissions.as_ref().unwrap()[0].attributes.len(),
            2,
            "pre-existing attributes untouched"
        );
    }

    #[test]
    fn test_uses_permissions_existing_identity_skipped() {
        let mut doc = typed(
            r#"<manifest>
    <uses-permission android:name="com.example.app2.permission.READ_SHARED_PREFS"/>
</manifest>"#,
        );

        let added =
            add_uses_permissions(&mut doc, &ids(&["com.example.app2"]), READ_SHARED_PREFS_SUFFIX);

        assert_eq!(added, 0);
        assert_eq!(doc.uses_permissions.as_ref().unwrap().len(), 1);
    }

    // Operation B

    #[test]
    fn test_permission_and_provider_defaults() {
        let mut doc = empty_manifest();
        let outcome = add_permission_and_provider(&mut doc, &ProviderOverrides::default());

        assert!(outcome.permission_added);
        assert!(outcome.provider_added);
        assert!(outcome.application_present);

        let permission = &doc.permissions.as_ref().unwrap()[0];
        assert_eq!(
            permission.name(),
            Some("${applicationId}.permission.READ_SHARED_PREFS")
        );
        assert_eq!(permission.protection_level(), Some("normal"));

        let provider = &doc.applications[0].providers.as_ref().unwrap()[0];
        assert_eq!(provider.name(), Some(PROVIDER_NAME));
        assert_eq!(
            provider.authorities(),
            Some("${applicationId}.sharedpreferencesprovider")
        );
        assert_eq!(
            provider.permission(),
            Some("${applicationId}.permission.READ_SHARED_PREFS")
        );
    }

    #[test]
    fn test_permission_and_provider_idempotent() {
        let mut doc = empty_manifest();
        add_permission_and_provider(&mut doc, &ProviderOverrides::default());
        let outcome = add_permission_and_provider(&mut doc, &ProviderOverrides::default());

        assert!(!outcome.permission_added);
        assert!(!outcome.provider_added);
        assert_eq!(doc.permissions.as_ref().unwrap().len(), 1);
        assert_eq!(doc.applications[0].providers.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_permission_and_provider_overrides() {
        let mut doc = empty_manifest();
        let overrides = ProviderOverrides {
            permission_name: Some("com.custom.PERM".to_string()),
            provider_authority: Some("com.custom.authority".to_string()),
        };
        add_permission_and_provider(&mut doc, &overrides);

        assert_eq!(
            doc.permissions.as_ref().unwrap()[0].name(),
            Some("com.custom.PERM")
        );
        let provider = &doc.applications[0].providers.as_ref().unwrap()[0];
        assert_eq!(provider.authorities(), Some("com.custom.authority"));
        assert_eq!(provider.permission(), Some("com.custom.PERM"));
        assert_eq!(provider.name(), Some(PROVIDER_NAME), "name is never configurable");
    }

    #[test]
    fn test_missing_application_skips_provider_without_error() {
        let mut doc = typed("<manifest/>");
        let outcome = add_permission_and_provider(&mut doc, &ProviderOverrides::default());

        assert!(outcome.permission_added);
        assert!(!outcome.provider_added);
        assert!(!outcome.application_present);
        assert_eq!(doc.permissions.as_ref().unwrap().len(), 1);
        assert!(doc.applications.is_empty());
    }

    #[test]
    fn test_existing_declared_permission_not_modified() {
        let mut doc = typed(
            r#"<manifest>
    <permission android:name="${applicationId}.permission.READ_SHARED_PREFS" android:protectionLevel="signature"/>
    <application/>
</manifest>"#,
        );

        let outcome = add_permission_and_provider(&mut doc, &ProviderOverrides::default());

        assert!(!outcome.permission_added);
        assert_eq!(
            doc.permissions.as_ref().unwrap()[0].protection_level(),
            Some("signature"),
            "pre-existing attributes win"
        );
    }

    #[test]
    fn test_existing_provider_not_duplicated() {
        let mut doc = typed(
            r#"<manifest>
    <application>
        <provider android:name="com.data.SharedPreferencesProvider" android:authorities="custom"/>
    </application>
</manifest>"#,
        );

        let outcome = add_permission_and_provider(&mut doc, &ProviderOverrides::default());

        assert!(!outcome.provider_added);
        let provider = &doc.applications[0].providers.as_ref().unwrap()[0];
        assert_eq!(provider.authorities(), Some("custom"));
    }

    // Operation C

    #[test]
    fn test_package_queries_include_self_reference() {
        let mut doc = empty_manifest();
        let added = add_package_queries(&mut doc, &ids(&["com.example.app2"]));

        assert_eq!(added, 2);
        assert_eq!(
            package_names(&doc),
            vec![APPLICATION_ID_PLACEHOLDER, "com.example.app2"]
        );
    }

    #[test]
    fn test_package_queries_idempotent_and_deduplicated() {
        let mut doc = empty_manifest();
        add_package_queries(&mut doc, &ids(&["a", "a", "b"]));
        let again = add_package_queries(&mut doc, &ids(&["a", "b"]));

        assert_eq!(again, 0);
        assert_eq!(
            package_names(&doc),
            vec![APPLICATION_ID_PLACEHOLDER, "a", "b"]
        );
    }

    #[test]
    fn test_package_queries_use_first_structural_match() {
        let mut doc = typed(
            r#"<manifest>
    <queries>
        <intent><action android:name="android.intent.action.VIEW"/></intent>
    </queries>
    <queries>
        <package android:name="com.first"/>
    </queries>
    <queries>
        <package android:name="com.second"/>
    </queries>
</manifest>"#,
        );

        add_package_queries(&mut doc, &ids(&["com.new"]));

        let blocks = doc.queries.as_ref().unwrap();
        assert!(blocks[0].packages.is_none(), "intent-only block untouched");
        assert_eq!(
            blocks[1]
                .packages
                .as_ref()
                .unwrap()
                .iter()
                .filter_map(|p| p.name())
                .collect::<Vec<_>>(),
            vec!["com.first", APPLICATION_ID_PLACEHOLDER, "com.new"]
        );
        assert_eq!(
            blocks[2].packages.as_ref().unwrap().len(),
            1,
            "later qualifying block untouched"
        );
    }

    #[test]
    fn test_package_queries_empty_input_creates_container() {
        let mut doc = empty_manifest();
        let added = add_package_queries(&mut doc, &[]);

        assert_eq!(added, 1, "self reference is always ensured");
        assert_eq!(package_names(&doc), vec![APPLICATION_ID_PLACEHOLDER]);
    }

    // Cross-operation scenarios

    #[test]
    fn test_full_merge_on_empty_document() {
        let mut doc = typed(r#"<manifest package="com.example.app"><application/></manifest>"#);
        let bundle_ids = ids(&["com.example.app2"]);

        add_uses_permissions(&mut doc, &bundle_ids, READ_SHARED_PREFS_SUFFIX);
        add_permission_and_provider(&mut doc, &ProviderOverrides::default());
        add_package_queries(&mut doc, &bundle_ids);

        assert_eq!(
            uses_permission_names(&doc),
            vec!["com.example.app2.permission.READ_SHARED_PREFS"]
        );
        assert_eq!(doc.permissions.as_ref().unwrap().len(), 1);
        assert_eq!(doc.applications[0].providers.as_ref().unwrap().len(), 1);
        assert_eq!(
            package_names(&doc),
            vec![APPLICATION_ID_PLACEHOLDER, "com.example.app2"]
        );
    }

    #[test]
    fn test_operations_commute_on_disjoint_containers() {
        let bundle_ids = ids(&["com.example.app2"]);

        let mut forward = empty_manifest();
        add_uses_permissions(&mut forward, &bundle_ids, READ_SHARED_PREFS_SUFFIX);
        add_permission_and_provider(&mut forward, &ProviderOverrides::default());
        add_package_queries(&mut forward, &bundle_ids);

        let mut reverse = empty_manifest();
        add_package_queries(&mut reverse, &bundle_ids);
        add_permission_and_provider(&mut reverse, &ProviderOverrides::default());
        add_uses_permissions(&mut reverse, &bundle_ids, READ_SHARED_PREFS_SUFFIX);

        assert_eq!(forward, reverse);
    }
}
