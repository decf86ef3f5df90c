//! Node identity key file.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use trellis_crypto::{Identity, IdentityKeyFile};

/// Loads the identity at `path`, or generates one and writes it there.
pub fn load_or_generate_identity(path: &Path) -> Result<Identity> {
    if path.exists() {
        info!("Loading identity from {:?}", path);
        let text = fs::read_to_string(path).context("Failed to read identity file")?;
        let file: IdentityKeyFile =
            serde_json::from_str(&text).context("Failed to parse identity file")?;
        Identity::from_key_file(&file).context("Failed to decode identity keys")
    } else {
        info!("Generating new identity at {:?}", path);
        let identity = Identity::generate();
        let text = serde_json::to_string_pretty(&identity.to_key_file())?;
        fs::write(path, text).context("Failed to write identity file")?;
        Ok(identity)
    }
}
