//! Typed view of an AndroidManifest.xml document
//!
//! The merge logic operates on this model rather than on raw XML. Each
//! container the merger may touch is an explicit optional field so that
//! "absent" and "present but empty" stay distinguishable; everything the
//! model does not understand is carried through verbatim in `rest` /
//! `extra` fields and survives a conversion round trip.
//!
//! Children are grouped by element kind. Relative order within a kind is
//! preserved exactly; order across kinds is normalized when converting
//! back to XML.

use thiserror::Error;

use crate::xml::{Attribute, Element, XmlNode};

/// Identity attribute for every element kind the merger manages
pub const ANDROID_NAME: &str = "android:name";
pub const ANDROID_PROTECTION_LEVEL: &str = "android:protectionLevel";
pub const ANDROID_AUTHORITIES: &str = "android:authorities";
pub const ANDROID_PERMISSION: &str = "android:permission";
pub const ANDROID_ENABLED: &str = "android:enabled";
pub const ANDROID_EXPORTED: &str = "android:exported";

const TAG_MANIFEST: &str = "manifest";
const TAG_USES_PERMISSION: &str = "uses-permission";
const TAG_PERMISSION: &str = "permission";
const TAG_QUERIES: &str = "queries";
const TAG_PACKAGE: &str = "package";
const TAG_APPLICATION: &str = "application";
const TAG_PROVIDER: &str = "provider";

/// Errors from the typed-conversion boundary
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("root element is <{0}>, expected <manifest>")]
    UnexpectedRoot(String),
}

fn attr_value<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.value.as_str())
}

/// A `<uses-permission>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsesPermission {
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

impl UsesPermission {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            attributes: vec![Attribute::new(ANDROID_NAME, name)],
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_NAME)
    }

    fn from_element(el: Element) -> Self {
        Self {
            attributes: el.attributes,
            children: el.children,
        }
    }

    fn into_element(self) -> Element {
        Element {
            name: TAG_USES_PERMISSION.to_string(),
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// A declared `<permission>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

impl Permission {
    pub fn new(name: impl Into<String>, protection_level: impl Into<String>) -> Self {
        Self {
            attributes: vec![
                Attribute::new(ANDROID_NAME, name),
                Attribute::new(ANDROID_PROTECTION_LEVEL, protection_level),
            ],
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_NAME)
    }

    pub fn protection_level(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_PROTECTION_LEVEL)
    }

    fn from_element(el: Element) -> Self {
        Self {
            attributes: el.attributes,
            children: el.children,
        }
    }

    fn into_element(self) -> Element {
        Element {
            name: TAG_PERMISSION.to_string(),
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// A `<provider>` entry under `<application>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

impl Provider {
    /// Build a provider entry with the managed attribute set
    pub fn new(
        name: impl Into<String>,
        authorities: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            attributes: vec![
                Attribute::new(ANDROID_NAME, name),
                Attribute::new(ANDROID_AUTHORITIES, authorities),
                Attribute::new(ANDROID_PERMISSION, permission),
                Attribute::new(ANDROID_ENABLED, "true"),
                Attribute::new(ANDROID_EXPORTED, "true"),
            ],
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_NAME)
    }

    pub fn authorities(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_AUTHORITIES)
    }

    pub fn permission(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_PERMISSION)
    }

    fn from_element(el: Element) -> Self {
        Self {
            attributes: el.attributes,
            children: el.children,
        }
    }

    fn into_element(self) -> Element {
        Element {
            name: TAG_PROVIDER.to_string(),
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// A `<package>` entry inside a `<queries>` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    pub attributes: Vec<Attribute>,
}

impl PackageQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            attributes: vec![Attribute::new(ANDROID_NAME, name)],
        }
    }

    pub fn name(&self) -> Option<&str> {
        attr_value(&self.attributes, ANDROID_NAME)
    }

    fn from_element(el: Element) -> Self {
        Self {
            attributes: el.attributes,
        }
    }

    fn into_element(self) -> Element {
        Element {
            name: TAG_PACKAGE.to_string(),
            attributes: self.attributes,
            children: Vec::new(),
        }
    }
}

/// One `<queries>` block.
///
/// `packages` is `Some` iff the block structurally holds a package
/// sequence; non-package children (intents, provider filters) ride along
/// in `rest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueriesBlock {
    pub attributes: Vec<Attribute>,
    pub packages: Option<Vec<PackageQuery>>,
    pub rest: Vec<XmlNode>,
}

impl QueriesBlock {
    /// An empty block holding a (still empty) package sequence
    pub fn with_packages() -> Self {
        Self {
            attributes: Vec::new(),
            packages: Some(Vec::new()),
            rest: Vec::new(),
        }
    }

    fn from_element(el: Element) -> Self {
        let mut packages: Option<Vec<PackageQuery>> = None;
        let mut rest = Vec::new();

        for child in el.children {
            match child {
                XmlNode::Element(e) if e.name == TAG_PACKAGE => {
                    packages
                        .get_or_insert_with(Vec::new)
                        .push(PackageQuery::from_element(e));
                }
                other => rest.push(other),
            }
        }

        Self {
            attributes: el.attributes,
            packages,
            rest,
        }
    }

    fn into_element(self) -> Element {
        let mut children: Vec<XmlNode> = Vec::new();
        if let Some(packages) = self.packages {
            children.extend(
                packages
                    .into_iter()
                    .map(|p| XmlNode::Element(p.into_element())),
            );
        }
        children.extend(self.rest);

        Element {
            name: TAG_QUERIES.to_string(),
            attributes: self.attributes,
            children,
        }
    }
}

/// The `<application>` node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub attributes: Vec<Attribute>,
    pub providers: Option<Vec<Provider>>,
    pub rest: Vec<XmlNode>,
}

impl Application {
    fn from_element(el: Element) -> Self {
        let mut providers: Option<Vec<Provider>> = None;
        let mut rest = Vec::new();

        for child in el.children {
            match child {
                XmlNode::Element(e) if e.name == TAG_PROVIDER => {
                    providers
                        .get_or_insert_with(Vec::new)
                        .push(Provider::from_element(e));
                }
                other => rest.push(other),
            }
        }

        Self {
            attributes: el.attributes,
            providers,
            rest,
        }
    }

    fn into_element(self) -> Element {
        let mut children = self.rest;
        if let Some(providers) = self.providers {
            children.extend(
                providers
                    .into_iter()
                    .map(|p| XmlNode::Element(p.into_element())),
            );
        }

        Element {
            name: TAG_APPLICATION.to_string(),
            attributes: self.attributes,
            children,
        }
    }
}

/// The whole manifest, grouped by element kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDocument {
    pub attributes: Vec<Attribute>,
    pub uses_permissions: Option<Vec<UsesPermission>>,
    pub permissions: Option<Vec<Permission>>,
    pub queries: Option<Vec<QueriesBlock>>,
    pub applications: Vec<Application>,
    pub rest: Vec<XmlNode>,
}

impl ManifestDocument {
    /// Build the typed view from a parsed root element.
    ///
    /// Only the root tag is checked; partially-populated or otherwise
    /// unusual manifests convert without error.
    pub fn from_root(root: Element) -> Result<Self, ManifestError> {
        if root.name != TAG_MANIFEST {
            return Err(ManifestError::UnexpectedRoot(root.name));
        }

        let mut doc = Self {
            attributes: root.attributes,
            uses_permissions: None,
            permissions: None,
            queries: None,
            applications: Vec::new(),
            rest: Vec::new(),
        };

        for child in root.children {
            match child {
                XmlNode::Element(el) if el.name == TAG_USES_PERMISSION => {
                    doc.uses_permissions
                        .get_or_insert_with(Vec::new)
                        .push(UsesPermission::from_element(el));
                }
                XmlNode::Element(el) if el.name == TAG_PERMISSION => {
                    doc.permissions
                        .get_or_insert_with(Vec::new)
                        .push(Permission::from_element(el));
                }
                XmlNode::Element(el) if el.name == TAG_QUERIES => {
                    doc.queries
                        .get_or_insert_with(Vec::new)
                        .push(QueriesBlock::from_element(el));
                }
                XmlNode::Element(el) if el.name == TAG_APPLICATION => {
                    doc.applications.push(Application::from_element(el));
                }
                other => doc.rest.push(other),
            }
        }

        Ok(doc)
    }

    /// Convert back to a root element for rendering
    pub fn into_root(self) -> Element {
        let mut children: Vec<XmlNode> = Vec::new();

        if let Some(entries) = self.uses_permissions {
            children.extend(
                entries
                    .into_iter()
                    .map(|e| XmlNode::Element(e.into_element())),
            );
        }
        if let Some(entries) = self.permissions {
            children.extend(
                entries
                    .into_iter()
                    .map(|e| XmlNode::Element(e.into_element())),
            );
        }
        if let Some(blocks) = self.queries {
            children.extend(
                blocks
                    .into_iter()
                    .map(|b| XmlNode::Element(b.into_element())),
            );
        }
        children.extend(
            self.applications
                .into_iter()
                .map(|a| XmlNode::Element(a.into_element())),
        );
        children.extend(self.rest);

        Element {
            name: TAG_MANIFEST.to_string(),
            attributes: self.attributes,
            children,
        }
    }
}
