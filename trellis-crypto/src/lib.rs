//! Cryptography for Trellis.
//!
//! Provides the crypto collaborator used by the component registry:
//! - `sign` / `verify`: Ed25519 over canonical payload bytes
//! - `encrypt` / `decrypt`: ChaCha20-Poly1305 AEAD with random nonces
//! - `derive_shared_secret`: X25519 key agreement expanded with HKDF-SHA256
//! - [`KeyEnvelope`]: a random content key wrapped once per recipient

mod cipher;
mod envelope;
mod error;
mod identity;
mod key;

pub use cipher::{
    decrypt, decrypt_json, encrypt, encrypt_json, EncryptedData, NONCE_SIZE, TAG_SIZE,
};
pub use envelope::{unwrap_key, wrap_key, KeyEnvelope};
pub use error::{CryptoError, CryptoResult};
pub use identity::{Identity, IdentityKeyFile, PublicIdentity, Signature, SIGNATURE_SIZE};
pub use key::{generate_random_key, DerivedKey, KEY_SIZE};

/// Signs `payload` with `identity`'s signing key.
pub fn sign(payload: &[u8], identity: &Identity) -> Signature {
    identity.sign(payload)
}

/// Verifies `signature` over `payload` against `signer`.
pub fn verify(payload: &[u8], signature: &Signature, signer: &PublicIdentity) -> CryptoResult<()> {
    signer.verify(payload, signature)
}

/// Derives the symmetric key shared between `own` and `peer`.
pub fn derive_shared_secret(peer: &PublicIdentity, own: &Identity) -> CryptoResult<DerivedKey> {
    own.derive_shared_secret(peer)
}
