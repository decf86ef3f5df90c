//! Secure component registry for Trellis.
//!
//! Components are published into the graph store under
//! `components/{public|private}/{author}/{id}/{version}`:
//!
//! - every package is signed by its publisher over its metadata and code
//! - public packages are stored in plaintext and indexed for fuzzy search
//! - private and shared packages are encrypted under a random content key
//!   that is wrapped for each allowed user
//!
//! Fetching verifies the signature before returning anything. Loading hands
//! verified code to a [`ComponentExecutor`]; the registry never runs code
//! itself.

mod acl;
mod address;
mod config;
mod error;
pub mod executor;
mod metadata;
mod record;
mod registry;
mod search;
mod signing;

pub use acl::{AccessControlList, AccessType};
pub use address::{ComponentAddress, Visibility, PRIVATE_ROOT, PUBLIC_ROOT};
pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use executor::{ComponentExecutor, ExecutionUnit};
pub use metadata::{ComponentMetadata, ComponentPackage};
pub use record::{PrivateRecord, PublicRecord};
pub use registry::{FetchedComponent, Registry, RegistryEvent, VersionListing, UPDATE_TOPIC};
pub use search::{levenshtein, normalized_levenshtein, IndexEntry, SearchIndex, SearchResult};
pub use signing::{sign_package, signing_payload, verify_package};
