//! TOML persistence of a key together with its shape tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::ShapeTree;
use crate::infrastructure::key::KeyDocument;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::{InfraError, InfraResult};

/// Everything a CLI invocation operates on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Document {
    pub key: KeyDocument,
    #[serde(default)]
    pub tree: ShapeTree,
}

impl Document {
    pub fn new(key: KeyDocument, tree: ShapeTree) -> Self {
        Self { key, tree }
    }
}

/// Loads and saves a [`Document`] at a fixed path.
pub struct DocumentStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.fs.exists(&self.path)
    }

    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> InfraResult<Document> {
        if !self.exists() {
            return Err(InfraError::DocumentMissing(self.path.clone()));
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| InfraError::io(format!("read {}", self.path.display()), e))?;
        let document: Document = toml::from_str(&content).map_err(|e| InfraError::Document {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        debug!(nodes = document.tree.len(), shapes = document.key.shapes().len(), "loaded document");
        Ok(document)
    }

    #[instrument(level = "debug", skip(self, document), fields(path = %self.path.display()))]
    pub fn save(&self, document: &Document) -> InfraResult<()> {
        let content = toml::to_string_pretty(document).map_err(|e| InfraError::Document {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        self.fs
            .ensure_parent(&self.path)
            .map_err(|e| InfraError::io(format!("create parent of {}", self.path.display()), e))?;
        self.fs
            .write_atomic(&self.path, &content)
            .map_err(|e| InfraError::io(format!("write {}", self.path.display()), e))?;
        Ok(())
    }

    /// Writes a fresh document, refusing to overwrite unless `force` is set.
    pub fn create(&self, document: &Document, force: bool) -> InfraResult<()> {
        if self.exists() && !force {
            return Err(InfraError::DocumentExists(self.path.clone()));
        }
        self.save(document)
    }
}
