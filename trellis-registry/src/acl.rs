//! Access control lists.

use crate::address::Visibility;
use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use trellis_crypto::PublicIdentity;

/// Who may read a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Anyone; stored in plaintext.
    Public,
    /// Only the listed users; stored encrypted.
    Private,
    /// Same storage and checks as `Private`, for lists naming other users.
    Shared,
}

/// A component's access control list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlList {
    #[serde(rename = "type")]
    pub access: AccessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_users: Option<Vec<PublicIdentity>>,
}

impl AccessControlList {
    /// Readable by anyone.
    pub fn public() -> Self {
        Self {
            access: AccessType::Public,
            allowed_users: None,
        }
    }

    /// Readable only by `users`.
    pub fn private(users: impl IntoIterator<Item = PublicIdentity>) -> Self {
        Self {
            access: AccessType::Private,
            allowed_users: Some(users.into_iter().collect()),
        }
    }

    /// Readable by a shared group of `users`.
    pub fn shared(users: impl IntoIterator<Item = PublicIdentity>) -> Self {
        Self {
            access: AccessType::Shared,
            allowed_users: Some(users.into_iter().collect()),
        }
    }

    /// Non-public lists must name at least one user.
    pub fn validate(&self) -> RegistryResult<()> {
        match (self.access, &self.allowed_users) {
            (AccessType::Public, _) => Ok(()),
            (_, Some(users)) if !users.is_empty() => Ok(()),
            (access, _) => Err(RegistryError::InvalidAcl(format!(
                "{access:?} access requires a non-empty allowed_users list"
            ))),
        }
    }

    /// Where records under this list are stored.
    pub fn visibility(&self) -> Visibility {
        match self.access {
            AccessType::Public => Visibility::Public,
            AccessType::Private | AccessType::Shared => Visibility::Private,
        }
    }

    /// Whether `user` may read.
    pub fn allows(&self, user: &PublicIdentity) -> bool {
        match self.access {
            AccessType::Public => true,
            AccessType::Private | AccessType::Shared => self
                .allowed_users
                .as_ref()
                .is_some_and(|users| users.contains(user)),
        }
    }

    /// The listed users (empty for public lists without one).
    pub fn users(&self) -> &[PublicIdentity] {
        self.allowed_users.as_deref().unwrap_or_default()
    }
}
