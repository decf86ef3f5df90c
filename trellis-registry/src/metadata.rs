//! Component metadata and packages.

use crate::acl::AccessControlList;
use crate::address::ComponentAddress;
use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use trellis_crypto::Signature;

/// Describes a publishable component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// Component id, unique per author.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Opaque version string.
    pub version: String,
    /// Publishing author.
    pub author: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Search tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Dependency name → version range. The names are the imports the
    /// component may use when loaded.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Who may read the component.
    pub acl: AccessControlList,
    /// Publisher signature over the metadata (without this field) and code.
    #[serde(default)]
    pub signature: Option<Signature>,
}

impl ComponentMetadata {
    /// Unsigned metadata with empty description, tags and dependencies.
    pub fn new(
        author: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
        acl: AccessControlList,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            author: author.into(),
            description: String::new(),
            tags: Vec::new(),
            dependencies: BTreeMap::new(),
            acl,
            signature: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Adds a dependency.
    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }

    /// The component's address.
    pub fn address(&self) -> ComponentAddress {
        ComponentAddress {
            author: self.author.clone(),
            id: self.id.clone(),
            version: self.version.clone(),
        }
    }

    /// Validates the address parts, the name and the access list.
    pub fn validate(&self) -> RegistryResult<()> {
        self.address().validate()?;
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidMetadata("name is required".into()));
        }
        self.acl.validate()
    }

    /// Whether a signature is attached.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// A component as authored: metadata, code and optional initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPackage {
    pub metadata: ComponentMetadata,
    pub code: String,
    #[serde(default)]
    pub state: Option<Value>,
}

impl ComponentPackage {
    /// A package without initial state.
    pub fn new(metadata: ComponentMetadata, code: impl Into<String>) -> Self {
        Self {
            metadata,
            code: code.into(),
            state: None,
        }
    }

    /// Attaches initial state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }

    /// The package's address.
    pub fn address(&self) -> ComponentAddress {
        self.metadata.address()
    }
}
