//! User and publisher identities.
//!
//! An identity holds two key pairs:
//! - Ed25519 for signing published components
//! - X25519 for deriving per-recipient shared secrets
//!
//! The public half is exchanged as a single string,
//! `<base64url(ed25519)>.<base64url(x25519)>`, which is what access lists
//! and per-user key maps are keyed by.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signer as _, Verifier as _};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519Secret};
use zeroize::Zeroize;

const SHARED_SECRET_INFO: &[u8] = b"trellis/shared-secret/v1";

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// A private identity: signing key plus key-agreement secret.
pub struct Identity {
    signing_key: ed25519_dalek::SigningKey,
    dh_secret: X25519Secret,
}

impl Identity {
    /// Generates a new random identity.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut OsRng),
            dh_secret: X25519Secret::random_from_rng(OsRng),
        }
    }

    /// Rebuilds an identity from its two raw 32-byte secrets.
    pub fn from_secret_bytes(signing: &[u8; 32], dh: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(signing),
            dh_secret: X25519Secret::from(dh),
        }
    }

    /// The shareable public half.
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            verifying: self.signing_key.verifying_key().to_bytes(),
            dh: X25519PublicKey::from(&self.dh_secret).to_bytes(),
        }
    }

    /// Signs `payload`.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        Signature(self.signing_key.sign(payload).to_bytes())
    }

    /// Derives a symmetric key shared with `peer`.
    ///
    /// `a.derive_shared_secret(&b.public())` equals
    /// `b.derive_shared_secret(&a.public())`.
    pub fn derive_shared_secret(&self, peer: &PublicIdentity) -> CryptoResult<DerivedKey> {
        let shared = self
            .dh_secret
            .diffie_hellman(&X25519PublicKey::from(peer.dh));
        if !shared.was_contributory() {
            return Err(CryptoError::KeyAgreement(
                "peer key produced a non-contributory secret".to_string(),
            ));
        }

        let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
        let mut okm = [0u8; KEY_SIZE];
        hk.expand(SHARED_SECRET_INFO, &mut okm)
            .map_err(|e| CryptoError::KeyAgreement(e.to_string()))?;
        let key = DerivedKey::from_bytes(okm);
        okm.zeroize();
        Ok(key)
    }

    /// Serializes both secrets for a key file.
    pub fn to_key_file(&self) -> IdentityKeyFile {
        IdentityKeyFile {
            signing_key: URL_SAFE_NO_PAD.encode(self.signing_key.to_bytes()),
            dh_key: URL_SAFE_NO_PAD.encode(self.dh_secret.to_bytes()),
        }
    }

    /// Restores an identity from a key file.
    pub fn from_key_file(file: &IdentityKeyFile) -> CryptoResult<Self> {
        let mut signing = decode_32(&file.signing_key)?;
        let dh = decode_32(&file.dh_key)?;
        let identity = Self::from_secret_bytes(&signing, dh);
        signing.zeroize();
        Ok(identity)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public", &self.public().to_string())
            .field("secrets", &"[REDACTED]")
            .finish()
    }
}

/// Persisted form of an [`Identity`]. Secrets are base64url encoded.
#[derive(Serialize, Deserialize)]
pub struct IdentityKeyFile {
    pub signing_key: String,
    pub dh_key: String,
}

impl Drop for IdentityKeyFile {
    fn drop(&mut self) {
        self.signing_key.zeroize();
        self.dh_key.zeroize();
    }
}

/// The public half of an [`Identity`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicIdentity {
    verifying: [u8; 32],
    dh: [u8; 32],
}

impl PublicIdentity {
    /// Builds a public identity from raw key bytes, checking the Ed25519 point.
    pub fn from_bytes(verifying: [u8; 32], dh: [u8; 32]) -> CryptoResult<Self> {
        ed25519_dalek::VerifyingKey::from_bytes(&verifying)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { verifying, dh })
    }

    /// Raw Ed25519 verifying key.
    pub fn verifying_bytes(&self) -> &[u8; 32] {
        &self.verifying
    }

    /// Raw X25519 public key.
    pub fn dh_bytes(&self) -> &[u8; 32] {
        &self.dh
    }

    /// Verifies `signature` over `payload`.
    pub fn verify(&self, payload: &[u8], signature: &Signature) -> CryptoResult<()> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&self.verifying)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        key.verify(payload, &ed25519_dalek::Signature::from_bytes(&signature.0))
            .map_err(|_| CryptoError::SignatureInvalid)
    }
}

impl fmt::Display for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            URL_SAFE_NO_PAD.encode(self.verifying),
            URL_SAFE_NO_PAD.encode(self.dh)
        )
    }
}

impl fmt::Debug for PublicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicIdentity({self})")
    }
}

impl FromStr for PublicIdentity {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (verifying, dh) = s
            .split_once('.')
            .ok_or_else(|| CryptoError::InvalidPublicKey(format!("missing '.' in {s:?}")))?;
        Self::from_bytes(decode_32(verifying)?, decode_32(dh)?)
    }
}

impl Serialize for PublicIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// A detached Ed25519 signature. Serializes as base64url.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    /// Creates a signature from its raw bytes.
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw signature bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        let array: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| CryptoError::MalformedSignature(format!("{} bytes", b.len())))?;
        Ok(Self(array))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

fn decode_32(encoded: &str) -> CryptoResult<[u8; 32]> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: b.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let id = Identity::generate();
        let sig = id.sign(b"hello world");
        assert!(id.public().verify(b"hello world", &sig).is_ok());
    }

    #[test]
    fn wrong_message_fails() {
        let id = Identity::generate();
        let sig = id.sign(b"correct");
        assert!(id.public().verify(b"wrong", &sig).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let a = Identity::generate();
        let b = Identity::generate();
        let sig = a.sign(b"message");
        assert!(b.public().verify(b"message", &sig).is_err());
    }

    #[test]
    fn shared_secret_is_symmetric() {
        let a = Identity::generate();
        let b = Identity::generate();
        let ab = a.derive_shared_secret(&b.public()).unwrap();
        let ba = b.derive_shared_secret(&a.public()).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn shared_secret_differs_per_pair() {
        let a = Identity::generate();
        let b = Identity::generate();
        let c = Identity::generate();
        let ab = a.derive_shared_secret(&b.public()).unwrap();
        let ac = a.derive_shared_secret(&c.public()).unwrap();
        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn key_file_roundtrip() {
        let id = Identity::generate();
        let restored = Identity::from_key_file(&id.to_key_file()).unwrap();
        assert_eq!(id.public(), restored.public());
    }
}
