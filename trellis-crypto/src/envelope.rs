//! Per-recipient key envelopes.
//!
//! Content is encrypted once under a random content key. The content key is
//! then wrapped once per recipient under a secret derived from
//! (recipient public key, sender identity), so any listed recipient can
//! recover it with (sender public key, own identity) and nobody else can.
//!
//! Changing the recipient set only rewraps the content key; the content
//! itself is untouched.

use crate::cipher::{self, EncryptedData};
use crate::error::CryptoResult;
use crate::identity::{Identity, PublicIdentity};
use crate::key::DerivedKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A content key wrapped for each of a set of recipients.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyEnvelope {
    keys: BTreeMap<PublicIdentity, EncryptedData>,
}

impl KeyEnvelope {
    /// Wraps `content_key` for every recipient.
    pub fn seal<'a>(
        content_key: &DerivedKey,
        recipients: impl IntoIterator<Item = &'a PublicIdentity>,
        sender: &Identity,
    ) -> CryptoResult<Self> {
        let mut keys = BTreeMap::new();
        for recipient in recipients {
            keys.insert(*recipient, wrap_key(content_key, recipient, sender)?);
        }
        Ok(Self { keys })
    }

    /// Recovers the content key as `recipient`.
    ///
    /// Returns `Ok(None)` when the recipient is not listed; a listed entry
    /// that fails to unwrap is an error.
    pub fn open(
        &self,
        recipient: &Identity,
        sender: &PublicIdentity,
    ) -> CryptoResult<Option<DerivedKey>> {
        match self.keys.get(&recipient.public()) {
            Some(wrapped) => unwrap_key(wrapped, sender, recipient).map(Some),
            None => Ok(None),
        }
    }

    /// Whether `recipient` has an entry.
    pub fn contains(&self, recipient: &PublicIdentity) -> bool {
        self.keys.contains_key(recipient)
    }

    /// Listed recipients in key order.
    pub fn recipients(&self) -> impl Iterator<Item = &PublicIdentity> {
        self.keys.keys()
    }

    /// Number of recipients.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there are no recipients.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Encrypts `content_key` for `recipient`.
pub fn wrap_key(
    content_key: &DerivedKey,
    recipient: &PublicIdentity,
    sender: &Identity,
) -> CryptoResult<EncryptedData> {
    let shared = sender.derive_shared_secret(recipient)?;
    cipher::encrypt(&shared, content_key.as_bytes())
}

/// Decrypts a key wrapped by `sender` for `recipient`.
pub fn unwrap_key(
    wrapped: &EncryptedData,
    sender: &PublicIdentity,
    recipient: &Identity,
) -> CryptoResult<DerivedKey> {
    let shared = recipient.derive_shared_secret(sender)?;
    let bytes = cipher::decrypt(&shared, wrapped)?;
    DerivedKey::from_slice(&bytes)
}
