use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{IngestError, IngestResult, StoreError};
use crate::models::{CollectionConfig, CollectionHandle};
use crate::store::DocumentStore;

/// Makes sure a target collection exists before documents are written to it
///
/// Lookups are cached for the lifetime of the provisioner. The lock is held
/// across the list/create round trip so two calls on the same instance never
/// both issue a create.
pub struct CollectionProvisioner {
    store: Arc<dyn DocumentStore>,
    known: Mutex<HashMap<String, CollectionHandle>>,
}

impl CollectionProvisioner {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            known: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self))]
    pub async fn ensure_collection(&self, name: &str) -> IngestResult<CollectionHandle> {
        let mut known = self.known.lock().await;

        if let Some(handle) = known.get(name) {
            debug!("Collection already provisioned by this instance");
            return Ok(CollectionHandle {
                name: handle.name.clone(),
                created: false,
            });
        }

        let names = self.store.list_collection_names().await.map_err(|e| {
            IngestError::Provisioning(format!("Failed to list collections: {}", e))
        })?;

        let handle = if names.iter().any(|n| n == name) {
            CollectionHandle {
                name: name.to_string(),
                created: false,
            }
        } else {
            info!("Collection {} does not exist. Creating new collection.", name);
            self.create(name).await?
        };

        known.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    async fn create(&self, name: &str) -> IngestResult<CollectionHandle> {
        let config = CollectionConfig::new(name);

        match self.store.create_collection(&config).await {
            Ok(()) => Ok(CollectionHandle {
                name: config.name,
                created: true,
            }),
            // Lost a create race against another invocation
            Err(StoreError::AlreadyExists(_)) => {
                debug!(collection = %name, "Collection created concurrently");
                Ok(CollectionHandle {
                    name: config.name,
                    created: false,
                })
            }
            Err(e) => Err(IngestError::Provisioning(format!(
                "Failed to create collection {}: {}",
                name, e
            ))),
        }
    }
}
