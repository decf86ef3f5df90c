//! Property-based tests for the crypto module.
//!
//! These tests verify security properties that must always hold:
//! - Encryption is reversible with the correct key
//! - Wrong keys fail decryption
//! - Tampering is detected
//! - Signatures only verify for the exact payload

use proptest::prelude::*;
use trellis_crypto::{decrypt, encrypt, generate_random_key, Identity};

fn plaintext_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4096)
}

proptest! {
    /// Encryption followed by decryption with the same key returns the plaintext.
    #[test]
    fn roundtrip_preserves_data(plaintext in plaintext_strategy()) {
        let key = generate_random_key();
        let encrypted = encrypt(&key, &plaintext).unwrap();
        prop_assert_eq!(decrypt(&key, &encrypted).unwrap(), plaintext);
    }

    /// A different key never opens the ciphertext.
    #[test]
    fn wrong_key_always_fails(plaintext in plaintext_strategy()) {
        let encrypted = encrypt(&generate_random_key(), &plaintext).unwrap();
        prop_assert!(decrypt(&generate_random_key(), &encrypted).is_err());
    }

    /// Flipping any ciphertext bit is detected.
    #[test]
    fn tampering_is_detected(plaintext in plaintext_strategy(), index in any::<prop::sample::Index>()) {
        let key = generate_random_key();
        let mut encrypted = encrypt(&key, &plaintext).unwrap();
        let i = index.index(encrypted.ciphertext.len());
        encrypted.ciphertext[i] ^= 0x01;
        prop_assert!(decrypt(&key, &encrypted).is_err());
    }

    /// A signature over one payload does not verify another.
    #[test]
    fn signature_binds_payload(a in plaintext_strategy(), b in plaintext_strategy()) {
        prop_assume!(a != b);
        let id = Identity::generate();
        let sig = id.sign(&a);
        prop_assert!(id.public().verify(&a, &sig).is_ok());
        prop_assert!(id.public().verify(&b, &sig).is_err());
    }
}
