//! Package signatures.
//!
//! The signed payload is the JSON encoding of
//! `{"code": <code>, "metadata": <metadata without "signature">}`. Object
//! keys serialize in sorted order, so the encoding is canonical for a given
//! package.

use crate::error::{RegistryError, RegistryResult};
use crate::metadata::{ComponentMetadata, ComponentPackage};
use serde_json::{json, Value};
use trellis_crypto::{Identity, PublicIdentity};

/// The bytes a package signature covers.
pub fn signing_payload(metadata: &ComponentMetadata, code: &str) -> RegistryResult<Vec<u8>> {
    let mut metadata = serde_json::to_value(metadata)?;
    if let Value::Object(fields) = &mut metadata {
        fields.remove("signature");
    }
    Ok(serde_json::to_vec(&json!({
        "code": code,
        "metadata": metadata,
    }))?)
}

/// Signs `package` in place as `identity`, replacing any existing signature.
pub fn sign_package(package: &mut ComponentPackage, identity: &Identity) -> RegistryResult<()> {
    let payload = signing_payload(&package.metadata, &package.code)?;
    package.metadata.signature = Some(identity.sign(&payload));
    Ok(())
}

/// Verifies `package`'s signature against `publisher`.
pub fn verify_package(package: &ComponentPackage, publisher: &PublicIdentity) -> RegistryResult<()> {
    let address = package.address().to_string();
    let signature = package
        .metadata
        .signature
        .as_ref()
        .ok_or_else(|| RegistryError::Signature(address.clone()))?;
    let payload = signing_payload(&package.metadata, &package.code)?;
    publisher
        .verify(&payload, signature)
        .map_err(|_| RegistryError::Signature(address))
}
