//! Component addresses and their storage paths.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store prefix for plaintext (public) records.
pub const PUBLIC_ROOT: &str = "components/public";

/// Store prefix for encrypted (private and shared) records.
pub const PRIVATE_ROOT: &str = "components/private";

/// Which half of the store a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    /// The store prefix for this visibility.
    pub fn root(self) -> &'static str {
        match self {
            Visibility::Public => PUBLIC_ROOT,
            Visibility::Private => PRIVATE_ROOT,
        }
    }

    /// The other visibility.
    pub fn other(self) -> Self {
        match self {
            Visibility::Public => Visibility::Private,
            Visibility::Private => Visibility::Public,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        })
    }
}

/// `author/id/version`. Versions are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentAddress {
    pub author: String,
    pub id: String,
    pub version: String,
}

impl ComponentAddress {
    /// Builds and validates an address.
    pub fn new(
        author: impl Into<String>,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> RegistryResult<Self> {
        let address = Self {
            author: author.into(),
            id: id.into(),
            version: version.into(),
        };
        address.validate()?;
        Ok(address)
    }

    /// Checks that every part is non-empty and free of `/`.
    pub fn validate(&self) -> RegistryResult<()> {
        for (name, part) in [
            ("author", &self.author),
            ("id", &self.id),
            ("version", &self.version),
        ] {
            if part.is_empty() {
                return Err(RegistryError::InvalidAddress(format!("{name} is empty")));
            }
            if part.contains('/') {
                return Err(RegistryError::InvalidAddress(format!(
                    "{name} contains '/': {part:?}"
                )));
            }
        }
        Ok(())
    }

    /// Where a record with this address and visibility is stored.
    pub fn storage_path(&self, visibility: Visibility) -> String {
        format!(
            "{}/{}/{}/{}",
            visibility.root(),
            self.author,
            self.id,
            self.version
        )
    }

    /// Parses a storage path back into a visibility and address.
    pub fn from_storage_path(path: &str) -> Option<(Visibility, Self)> {
        [Visibility::Public, Visibility::Private]
            .into_iter()
            .find_map(|visibility| {
                let rest = path.strip_prefix(visibility.root())?.strip_prefix('/')?;
                rest.parse().ok().map(|address| (visibility, address))
            })
    }
}

impl fmt::Display for ComponentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.author, self.id, self.version)
    }
}

impl FromStr for ComponentAddress {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(author), Some(id), Some(version), None) => Self::new(author, id, version),
            _ => Err(RegistryError::InvalidAddress(format!(
                "expected author/id/version, got {s:?}"
            ))),
        }
    }
}
