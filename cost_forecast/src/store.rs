//! Persistence of trained models
//!
//! One artifact per canonical key, named `arima_{token}.{extension}` (see
//! [`crate::codec`]). The artifact body is a JSON envelope carrying a format
//! version, the key, the training time and the model itself.

use crate::codec::{encode, ArtifactName, CanonicalKey, EncodedToken};
use crate::error::{ForecastError, Result};
use crate::models::TrainedArimaModel;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Version of the artifact body layout
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Default artifact file extension
pub const DEFAULT_EXTENSION: &str = "json";

/// Body of a persisted model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub format_version: u32,
    pub key: CanonicalKey,
    pub trained_at: DateTime<Utc>,
    pub model: M,
}

impl<'a> ModelArtifact<&'a TrainedArimaModel> {
    pub fn new(key: &CanonicalKey, model: &'a TrainedArimaModel) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            key: key.clone(),
            trained_at: Utc::now(),
            model,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl ModelArtifact<TrainedArimaModel> {
    /// Parse an artifact body, rejecting layouts newer than this build
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if artifact.format_version > ARTIFACT_FORMAT_VERSION {
            return Err(ForecastError::DataError(format!(
                "Artifact format version {} is newer than supported version {}",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }
}

/// Raw artifact as enumerated from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub token: EncodedToken,
    pub bytes: Vec<u8>,
}

/// Lazy enumeration of artifacts; each entry fails independently
pub type ArtifactIter<'a> = Box<dyn Iterator<Item = Result<StoredArtifact>> + 'a>;

/// Storage of one serialized model per encoded key
pub trait ModelStore: Send + Sync {
    /// Enumerate every artifact currently in storage.
    ///
    /// Each call re-reads storage. An `Err` from this method means storage
    /// could not be enumerated at all.
    fn list(&self) -> Result<ArtifactIter<'_>>;

    /// Write an artifact body under the given token, replacing any previous one
    fn write_artifact(&self, token: &EncodedToken, bytes: &[u8]) -> Result<()>;

    /// Serialize and persist a model under its key
    fn save(&self, key: &CanonicalKey, model: &TrainedArimaModel) -> Result<()> {
        let bytes = ModelArtifact::new(key, model).to_bytes()?;
        self.write_artifact(&encode(key), &bytes)
    }
}

/// Artifacts as files in one directory
#[derive(Debug, Clone)]
pub struct FsModelStore {
    root: PathBuf,
    extension: String,
}

impl FsModelStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::with_extension(root, DEFAULT_EXTENSION)
    }

    pub fn with_extension<P: AsRef<Path>>(root: P, extension: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the artifact for `key` is stored at
    pub fn artifact_path(&self, key: &CanonicalKey) -> PathBuf {
        self.root.join(ArtifactName::for_key(key, &self.extension).file_name())
    }
}

impl ModelStore for FsModelStore {
    fn list(&self) -> Result<ArtifactIter<'_>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Box::new(std::iter::empty()));
            }
            Err(e) => return Err(e.into()),
        };

        let iter = entries.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            let file_name = entry.file_name();
            let name = ArtifactName::parse(file_name.to_str()?, &self.extension)?;
            if !entry.path().is_file() {
                return None;
            }

            Some(
                fs::read(entry.path())
                    .map(|bytes| StoredArtifact {
                        token: name.into_token(),
                        bytes,
                    })
                    .map_err(ForecastError::from),
            )
        });

        Ok(Box::new(iter))
    }

    fn write_artifact(&self, token: &EncodedToken, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let name = ArtifactName::new(token.clone(), &self.extension);
        let target = self.root.join(name.file_name());

        // Readers only ever see a complete file: write aside, then rename
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&target).map_err(|e| ForecastError::from(e.error))?;

        Ok(())
    }
}

/// Artifacts held in memory, keyed by token
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    artifacts: RwLock<BTreeMap<EncodedToken, Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }

    /// Tokens currently stored
    pub fn tokens(&self) -> Vec<EncodedToken> {
        self.artifacts.read().keys().cloned().collect()
    }
}

impl ModelStore for MemoryModelStore {
    fn list(&self) -> Result<ArtifactIter<'_>> {
        let snapshot: Vec<StoredArtifact> = self
            .artifacts
            .read()
            .iter()
            .map(|(token, bytes)| StoredArtifact {
                token: token.clone(),
                bytes: bytes.clone(),
            })
            .collect();

        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn write_artifact(&self, token: &EncodedToken, bytes: &[u8]) -> Result<()> {
        self.artifacts.write().insert(token.clone(), bytes.to_vec());
        Ok(())
    }
}
