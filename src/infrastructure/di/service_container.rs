//! Service container for dependency injection
//!
//! Wires the document store and shape tree service from settings.

use std::path::Path;
use std::sync::Arc;

use crate::application::services::{NamingOptions, ShapeTreeService};
use crate::config::Settings;
use crate::domain::{HostCapabilities, ShapeTree};
use crate::infrastructure::document::{Document, DocumentStore};
use crate::infrastructure::key::KeyDocument;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Container holding shared dependencies.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
        }
    }

    /// Store for the configured document, resolved against `project_dir`.
    pub fn document_store(&self, project_dir: &Path) -> DocumentStore {
        let path = if self.settings.document.is_absolute() {
            self.settings.document.clone()
        } else {
            project_dir.join(&self.settings.document)
        };
        DocumentStore::new(Arc::clone(&self.fs), path)
    }

    /// An empty document using the configured capabilities and prefix.
    pub fn new_document(&self, key_name: &str, capabilities: Option<HostCapabilities>) -> Document {
        let capabilities = capabilities.unwrap_or_else(|| self.settings.capabilities());
        Document::new(
            KeyDocument::new(key_name, capabilities),
            ShapeTree::new(&self.settings.property_prefix),
        )
    }

    pub fn naming(&self) -> NamingOptions {
        NamingOptions {
            group_name: self.settings.group_name.clone(),
            shape_name: self.settings.shape_name.clone(),
        }
    }

    /// Loads the document and hands it to a service.
    pub fn open(&self, project_dir: &Path) -> InfraResult<ShapeTreeService<KeyDocument>> {
        let document = self.document_store(project_dir).load()?;
        Ok(ShapeTreeService::new(document.key, document.tree, self.naming()))
    }

    /// Saves a service's state back to the document.
    pub fn close(&self, project_dir: &Path, service: ShapeTreeService<KeyDocument>) -> InfraResult<()> {
        let (key, tree) = service.into_parts();
        self.document_store(project_dir).save(&Document::new(key, tree))
    }
}
