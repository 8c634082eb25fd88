//! JSON bundle store: Implementation of ModelStore.
//!
//! Layout of a model directory:
//! - `ensemble.json`: the serialized bundle
//! - `manifest.json`: format version, creation time and the SHA-256 of every
//!   bound file
//!
//! `load` only returns bytes whose hash matches the manifest entry.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ports::ModelStore;

const BUNDLE_FILE: &str = "ensemble.json";
const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// Error type for bundle storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Manifest(String),

    #[error("Integrity check failed for {0}: hash does not match manifest")]
    Integrity(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BundleManifest {
    version: u32,
    created_at: i64,
    files: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Directory-backed bundle store.
#[derive(Debug, Clone)]
pub struct JsonModelStore {
    dir: PathBuf,
}

impl JsonModelStore {
    #[must_use]
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl ModelStore for JsonModelStore {
    type Error = StoreError;

    fn save(&self, bundle: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;

        let bundle_path = self.dir.join(BUNDLE_FILE);
        fs::write(&bundle_path, bundle).map_err(Self::io_err(&bundle_path))?;

        let mut files = BTreeMap::new();
        files.insert(BUNDLE_FILE.to_string(), sha256_hex(bundle));
        let manifest = BundleManifest {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            files,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StoreError::Manifest(e.to_string()))?;

        // Written last: a crash mid-save leaves a bundle without a matching
        // manifest, which `load` rejects.
        let manifest_path = self.dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, manifest_bytes).map_err(Self::io_err(&manifest_path))?;

        tracing::info!("Saved model bundle ({} bytes) to {:?}", bundle.len(), self.dir);
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Ok(None);
        }

        let manifest_bytes = fs::read(&manifest_path).map_err(Self::io_err(&manifest_path))?;
        let manifest: BundleManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| StoreError::Manifest(format!("invalid manifest.json format: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(StoreError::Manifest(format!(
                "unsupported manifest version: {}",
                manifest.version
            )));
        }

        let expected = manifest.files.get(BUNDLE_FILE).ok_or_else(|| {
            StoreError::Manifest(format!("manifest.json does not bind {BUNDLE_FILE}"))
        })?;

        let bundle_path = self.dir.join(BUNDLE_FILE);
        let bundle = fs::read(&bundle_path).map_err(Self::io_err(&bundle_path))?;
        if !sha256_hex(&bundle).eq_ignore_ascii_case(expected) {
            tracing::error!("Model bundle hash mismatch in {:?}", self.dir);
            return Err(StoreError::Integrity(BUNDLE_FILE.to_string()));
        }

        tracing::debug!("Verified model bundle in {:?}", self.dir);
        Ok(Some(bundle))
    }
}
