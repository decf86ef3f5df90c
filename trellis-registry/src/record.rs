//! Stored record formats.
//!
//! Public packages are stored as plaintext next to the publisher's public
//! identity. Private and shared packages are stored with metadata, code and
//! state each encrypted under a random content key, which is wrapped once
//! per allowed user.

use crate::address::ComponentAddress;
use crate::error::{RegistryError, RegistryResult};
use crate::metadata::{ComponentMetadata, ComponentPackage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_crypto::{
    decrypt_json, encrypt_json, generate_random_key, EncryptedData, Identity, KeyEnvelope,
    PublicIdentity,
};

/// A plaintext record at `components/public/...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRecord {
    pub metadata: ComponentMetadata,
    pub code: String,
    pub state: Option<Value>,
    pub publisher: PublicIdentity,
    pub published_at: DateTime<Utc>,
}

impl PublicRecord {
    /// Wraps a signed package.
    pub fn new(package: ComponentPackage, publisher: PublicIdentity) -> Self {
        Self {
            metadata: package.metadata,
            code: package.code,
            state: package.state,
            publisher,
            published_at: Utc::now(),
        }
    }

    /// The package this record holds.
    pub fn into_package(self) -> ComponentPackage {
        ComponentPackage {
            metadata: self.metadata,
            code: self.code,
            state: self.state,
        }
    }
}

/// An encrypted record at `components/private/...`.
///
/// The address stays in plaintext so versions can be listed without a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateRecord {
    pub address: ComponentAddress,
    pub publisher: PublicIdentity,
    pub metadata: EncryptedData,
    pub code: EncryptedData,
    pub state: Option<EncryptedData>,
    pub keys: KeyEnvelope,
    pub published_at: DateTime<Utc>,
}

impl PrivateRecord {
    /// Encrypts a signed package for every user on its access list.
    pub fn seal(package: &ComponentPackage, publisher: &Identity) -> RegistryResult<Self> {
        let content_key = generate_random_key();
        let keys = KeyEnvelope::seal(&content_key, package.metadata.acl.users(), publisher)?;

        Ok(Self {
            address: package.address(),
            publisher: publisher.public(),
            metadata: encrypt_json(&content_key, &package.metadata)?,
            code: encrypt_json(&content_key, &package.code)?,
            state: package
                .state
                .as_ref()
                .map(|state| encrypt_json(&content_key, state))
                .transpose()?,
            keys,
            published_at: Utc::now(),
        })
    }

    /// Decrypts the package as `requester`.
    ///
    /// Fails with `AccessDenied` when `requester` has no wrapped key.
    pub fn open(&self, requester: &Identity) -> RegistryResult<ComponentPackage> {
        let content_key = self
            .keys
            .open(requester, &self.publisher)?
            .ok_or_else(|| RegistryError::AccessDenied(self.address.to_string()))?;

        Ok(ComponentPackage {
            metadata: decrypt_json(&content_key, &self.metadata)?,
            code: decrypt_json(&content_key, &self.code)?,
            state: self
                .state
                .as_ref()
                .map(|state| decrypt_json(&content_key, state))
                .transpose()?,
        })
    }
}
