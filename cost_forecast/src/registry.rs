//! In-memory registry of loaded models
//!
//! The registry publishes an immutable [`RegistrySnapshot`]. A reload builds a
//! complete new snapshot from the store and swaps it in with a single pointer
//! write, so concurrent readers see either the old set or the new one.

use crate::codec::{decode, encode, CanonicalKey};
use crate::error::{ForecastError, Result};
use crate::models::{TrainedArimaModel, TrainedForecastModel};
use crate::store::{ModelArtifact, ModelStore};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Model shared between the registry and in-flight requests
pub type SharedModel = Arc<dyn TrainedForecastModel>;

/// Immutable mapping from canonical key to loaded model
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    models: HashMap<CanonicalKey, SharedModel>,
}

impl RegistrySnapshot {
    pub fn get(&self, key: &str) -> Option<&SharedModel> {
        self.models.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// Registered keys, in unspecified order
    pub fn keys(&self) -> impl Iterator<Item = &CanonicalKey> {
        self.models.keys()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// What a reload did with each artifact it saw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Artifacts loaded into the new snapshot
    pub loaded: usize,
    /// Artifacts whose token is not a valid key encoding
    pub undecodable: usize,
    /// Artifacts whose body could not be deserialized
    pub corrupt: usize,
    /// Artifacts that could not be read from storage
    pub unreadable: usize,
    /// Artifacts whose key was already loaded from another artifact
    pub duplicate: usize,
}

impl ReloadSummary {
    pub fn skipped(&self) -> usize {
        self.undecodable + self.corrupt + self.unreadable + self.duplicate
    }
}

/// Registry of models loaded from a [`ModelStore`]
pub struct ModelRegistry {
    store: Arc<dyn ModelStore>,
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ModelRegistry {
    /// Create an empty registry over a store; call [`reload`](Self::reload) to fill it
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
        }
    }

    /// Create a registry and load everything the store holds
    pub fn load(store: Arc<dyn ModelStore>) -> Result<Self> {
        let registry = Self::new(store);
        registry.reload()?;
        Ok(registry)
    }

    pub fn store(&self) -> &Arc<dyn ModelStore> {
        &self.store
    }

    /// Rebuild the snapshot from storage and publish it.
    ///
    /// Artifacts that fail to read, decode or deserialize are skipped one by
    /// one. Only a failure to enumerate storage at all fails the reload, in
    /// which case the previous snapshot stays published.
    pub fn reload(&self) -> Result<ReloadSummary> {
        let mut models: HashMap<CanonicalKey, SharedModel> = HashMap::new();
        let mut summary = ReloadSummary::default();

        for entry in self.store.list()? {
            let artifact = match entry {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable model artifact");
                    summary.unreadable += 1;
                    continue;
                }
            };

            let key = match decode(&artifact.token) {
                Ok(key) => key,
                Err(e) => {
                    warn!(token = %artifact.token, error = %e, "skipping artifact with undecodable name");
                    summary.undecodable += 1;
                    continue;
                }
            };

            let body = match ModelArtifact::<TrainedArimaModel>::from_bytes(&artifact.bytes) {
                Ok(body) => body,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping corrupt model artifact");
                    summary.corrupt += 1;
                    continue;
                }
            };

            if body.key != key {
                warn!(key = %key, recorded = %body.key, "artifact records a different key, using its name");
            }

            // a legacy standard-alphabet name can decode to a key that is
            // also stored under its canonical name; the canonical one wins
            if models.contains_key(&key) {
                summary.duplicate += 1;
                if artifact.token != encode(&key) {
                    warn!(token = %artifact.token, key = %key, "skipping duplicate artifact for key");
                    continue;
                }
                warn!(token = %artifact.token, key = %key, "canonical artifact replaces duplicate for key");
                models.insert(key, Arc::new(body.model));
                continue;
            }

            models.insert(key, Arc::new(body.model));
            summary.loaded += 1;
        }

        *self.current.write() = Arc::new(RegistrySnapshot { models });

        info!(
            loaded = summary.loaded,
            skipped = summary.skipped(),
            "model registry reloaded"
        );
        Ok(summary)
    }

    /// Currently published snapshot
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Model registered under `key`
    pub fn lookup(&self, key: &CanonicalKey) -> Result<SharedModel> {
        self.snapshot()
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| ForecastError::NotFound(format!("no model registered for '{}'", key)))
    }

    /// Keys of the currently published snapshot
    pub fn keys(&self) -> HashSet<CanonicalKey> {
        self.snapshot().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.len())
            .finish()
    }
}
