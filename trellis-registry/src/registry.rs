//! The component registry.

use crate::acl::AccessControlList;
use crate::address::{ComponentAddress, Visibility, PRIVATE_ROOT, PUBLIC_ROOT};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::executor::{ComponentExecutor, ExecutionUnit};
use crate::metadata::{ComponentMetadata, ComponentPackage};
use crate::record::{PrivateRecord, PublicRecord};
use crate::search::{IndexEntry, SearchIndex, SearchResult};
use crate::signing::{sign_package, verify_package};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_crypto::{Identity, PublicIdentity};
use trellis_peer::Messenger;
use trellis_store::GraphStore;

/// Peer topic carrying the address of a freshly published component.
pub const UPDATE_TOPIC: &str = "registry.update";

/// Registry lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A package was stored.
    Published {
        address: ComponentAddress,
        visibility: Visibility,
    },
    /// A record was removed because the package moved to the other
    /// visibility.
    Tombstoned {
        address: ComponentAddress,
        visibility: Visibility,
    },
}

/// A verified package read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedComponent {
    pub package: ComponentPackage,
    pub publisher: PublicIdentity,
    pub visibility: Visibility,
    pub published_at: DateTime<Utc>,
}

/// One stored version of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionListing {
    pub address: ComponentAddress,
    pub visibility: Visibility,
    pub publisher: PublicIdentity,
    pub published_at: DateTime<Utc>,
    /// Present for public records only.
    pub metadata: Option<ComponentMetadata>,
}

/// Publishes, fetches and searches signed components in the graph store.
pub struct Registry {
    store: Arc<dyn GraphStore>,
    config: RegistryConfig,
    messenger: Option<Arc<dyn Messenger>>,
    index: Arc<RwLock<SearchIndex>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Registry {
    /// Opens a registry over `store`, indexing every verifiable public
    /// record already present.
    pub async fn open(store: Arc<dyn GraphStore>, config: RegistryConfig) -> RegistryResult<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let registry = Self {
            store,
            config,
            messenger: None,
            index: Arc::new(RwLock::new(SearchIndex::new())),
            events,
        };
        registry.rebuild_index().await?;
        Ok(registry)
    }

    /// Opens a registry that announces publishes through `messenger`.
    pub async fn with_messenger(
        store: Arc<dyn GraphStore>,
        config: RegistryConfig,
        messenger: Arc<dyn Messenger>,
    ) -> RegistryResult<Self> {
        let mut registry = Self::open(store, config).await?;
        registry.messenger = Some(messenger);
        Ok(registry)
    }

    /// The registry's configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Subscribes to registry events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Number of indexed public components.
    pub async fn indexed_len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Re-scans `components/public` and replaces the search index.
    pub async fn rebuild_index(&self) -> RegistryResult<usize> {
        let mut fresh = SearchIndex::new();
        for (path, value) in self.store.scan(PUBLIC_ROOT).await? {
            match verified_public_entry(&path, value) {
                Ok(entry) => fresh.upsert(entry),
                Err(e) => warn!("Skipping public record at {}: {}", path, e),
            }
        }
        let count = fresh.len();
        *self.index.write().await = fresh;
        info!("Indexed {} public components", count);
        Ok(count)
    }

    // ── Publishing ──────────────────────────────────────────────────

    /// Signs and stores `package` as `identity`, returning the signed
    /// metadata.
    pub async fn publish(
        &self,
        mut package: ComponentPackage,
        identity: &Identity,
    ) -> RegistryResult<ComponentMetadata> {
        package.metadata.validate()?;
        sign_package(&mut package, identity)?;

        let address = package.address();
        let visibility = package.metadata.acl.visibility();
        let record = match visibility {
            Visibility::Public => serde_json::to_value(PublicRecord::new(
                package.clone(),
                identity.public(),
            ))?,
            Visibility::Private => serde_json::to_value(PrivateRecord::seal(&package, identity)?)?,
        };
        self.store
            .put(&address.storage_path(visibility), record)
            .await?;
        info!("Published {} ({})", address, visibility);

        let stale = visibility.other();
        let stale_path = address.storage_path(stale);
        if self.store.get(&stale_path).await?.is_some() {
            self.store.put(&stale_path, Value::Null).await?;
            info!("Tombstoned {} ({})", address, stale);
            let _ = self.events.send(RegistryEvent::Tombstoned {
                address: address.clone(),
                visibility: stale,
            });
        }

        let _ = self.events.send(RegistryEvent::Published {
            address: address.clone(),
            visibility,
        });

        {
            let mut index = self.index.write().await;
            match visibility {
                Visibility::Public => index.upsert(IndexEntry::from(&package.metadata)),
                Visibility::Private => {
                    index.remove(&address);
                }
            }
        }

        if let Some(messenger) = &self.messenger {
            if let Err(e) = messenger
                .broadcast(UPDATE_TOPIC, address.to_string().as_bytes())
                .await
            {
                warn!("Failed to announce {}: {}", address, e);
            }
        }

        Ok(package.metadata)
    }

    /// Republishes `package` under `acl`.
    ///
    /// Users dropped from the list keep whatever they already fetched.
    pub async fn update_access(
        &self,
        mut package: ComponentPackage,
        acl: AccessControlList,
        identity: &Identity,
    ) -> RegistryResult<ComponentMetadata> {
        debug!(
            "Changing access for {} to {:?}",
            package.address(),
            acl.access
        );
        package.metadata.acl = acl;
        self.publish(package, identity).await
    }

    // ── Fetching ────────────────────────────────────────────────────

    /// Reads and verifies the package at `address`.
    ///
    /// Private packages need a `requester` on the access list.
    pub async fn fetch(
        &self,
        address: &ComponentAddress,
        requester: Option<&Identity>,
    ) -> RegistryResult<FetchedComponent> {
        address.validate()?;

        if let Some(value) = self
            .store
            .get(&address.storage_path(Visibility::Public))
            .await?
        {
            let record: PublicRecord = serde_json::from_value(value)?;
            let publisher = record.publisher;
            let published_at = record.published_at;
            let package = record.into_package();
            check_package(address, &package, &publisher)?;
            return Ok(FetchedComponent {
                package,
                publisher,
                visibility: Visibility::Public,
                published_at,
            });
        }

        let Some(value) = self
            .store
            .get(&address.storage_path(Visibility::Private))
            .await?
        else {
            return Err(RegistryError::NotFound(address.to_string()));
        };

        let record: PrivateRecord = serde_json::from_value(value)?;
        if record.address != *address {
            return Err(RegistryError::Signature(address.to_string()));
        }
        let Some(requester) = requester else {
            warn!("Anonymous fetch of private component {} denied", address);
            return Err(RegistryError::AccessDenied(address.to_string()));
        };
        let package = record.open(requester).inspect_err(|e| {
            if matches!(e, RegistryError::AccessDenied(_)) {
                warn!("{} is not allowed to read {}", requester.public(), address);
            }
        })?;
        check_package(address, &package, &record.publisher)?;

        Ok(FetchedComponent {
            package,
            publisher: record.publisher,
            visibility: Visibility::Private,
            published_at: record.published_at,
        })
    }

    /// Every stored version of `author/id`, public and private, ordered by
    /// version.
    pub async fn list_versions(&self, author: &str, id: &str) -> RegistryResult<Vec<VersionListing>> {
        ComponentAddress::new(author, id, "_")?;

        let mut listings = Vec::new();
        for root in [PUBLIC_ROOT, PRIVATE_ROOT] {
            let prefix = format!("{root}/{author}/{id}");
            for (path, value) in self.store.scan(&prefix).await? {
                match listing(&path, value) {
                    Ok(Some(entry)) => listings.push(entry),
                    Ok(None) => debug!("Ignoring unexpected node {}", path),
                    Err(e) => warn!("Skipping unreadable record at {}: {}", path, e),
                }
            }
        }
        listings.sort_by(|a, b| {
            a.address
                .version
                .cmp(&b.address.version)
                .then_with(|| a.visibility.root().cmp(b.visibility.root()))
        });
        Ok(listings)
    }

    // ── Search ──────────────────────────────────────────────────────

    /// Fuzzy search over public components. `limit` defaults to the
    /// configured limit.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Vec<SearchResult> {
        let limit = limit.unwrap_or(self.config.default_search_limit);
        self.index
            .read()
            .await
            .search(query, limit, self.config.search_threshold)
    }

    /// Keeps the search index current with public records written by any
    /// peer. Abort the returned handle to stop.
    pub fn watch_public(&self) -> JoinHandle<()> {
        let mut feed = self.store.subscribe(PUBLIC_ROOT);
        let index = Arc::clone(&self.index);

        tokio::spawn(async move {
            while let Some(update) = feed.recv().await {
                let Some((Visibility::Public, address)) =
                    ComponentAddress::from_storage_path(&update.path)
                else {
                    continue;
                };
                match update.value {
                    Some(value) => match verified_public_entry(&update.path, value) {
                        Ok(entry) => {
                            debug!("Indexing {} from {:?} update", address, update.origin);
                            index.write().await.upsert(entry);
                        }
                        Err(e) => warn!("Not indexing {}: {}", address, e),
                    },
                    None => {
                        if index.write().await.remove(&address) {
                            debug!("Dropped {} from the index", address);
                        }
                    }
                }
            }
        })
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Fetches and verifies `address`, then runs it through `executor`
    /// with its dependency names as the only allowed imports.
    pub async fn load(
        &self,
        address: &ComponentAddress,
        requester: Option<&Identity>,
        executor: &dyn ComponentExecutor,
    ) -> RegistryResult<Value> {
        let fetched = self.fetch(address, requester).await?;
        let allowed_imports: Vec<String> = fetched
            .package
            .metadata
            .dependencies
            .keys()
            .cloned()
            .collect();
        let unit = ExecutionUnit {
            address: address.clone(),
            code: fetched.package.code,
            state: fetched.package.state,
        };

        debug!("Loading {} with imports {:?}", address, allowed_imports);
        executor
            .execute(&unit, &allowed_imports)
            .await
            .map_err(|e| match e {
                RegistryError::Execution(_) => e,
                other => RegistryError::Execution(other.to_string()),
            })
    }
}

/// Verifies the signature and that the signed metadata names `address`.
fn check_package(
    address: &ComponentAddress,
    package: &ComponentPackage,
    publisher: &PublicIdentity,
) -> RegistryResult<()> {
    if package.address() != *address {
        warn!(
            "Record at {} carries metadata for {}",
            address,
            package.address()
        );
        return Err(RegistryError::Signature(address.to_string()));
    }
    verify_package(package, publisher).inspect_err(|_| {
        warn!("Signature check failed for {}", address);
    })
}

fn verified_public_entry(path: &str, value: Value) -> RegistryResult<IndexEntry> {
    let (_, address) = ComponentAddress::from_storage_path(path)
        .ok_or_else(|| RegistryError::InvalidAddress(path.to_string()))?;
    let record: PublicRecord = serde_json::from_value(value)?;
    let publisher = record.publisher;
    let package = record.into_package();
    check_package(&address, &package, &publisher)?;
    Ok(IndexEntry::from(&package.metadata))
}

fn listing(path: &str, value: Value) -> RegistryResult<Option<VersionListing>> {
    let Some((visibility, address)) = ComponentAddress::from_storage_path(path) else {
        return Ok(None);
    };
    let entry = match visibility {
        Visibility::Public => {
            let record: PublicRecord = serde_json::from_value(value)?;
            VersionListing {
                address,
                visibility,
                publisher: record.publisher,
                published_at: record.published_at,
                metadata: Some(record.metadata),
            }
        }
        Visibility::Private => {
            let record: PrivateRecord = serde_json::from_value(value)?;
            VersionListing {
                address,
                visibility,
                publisher: record.publisher,
                published_at: record.published_at,
                metadata: None,
            }
        }
    };
    Ok(Some(entry))
}
