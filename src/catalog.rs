//! Remote pack catalog entries
//!
//! The catalog is a JSON array of `{ "id", "name", "downloadURL" }` objects.
//! Fetching it is left to the caller; this module only defines the entry
//! type and how a fetched document is read.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One downloadable pack listed in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
}

/// Source of catalog entries
pub trait CatalogSource {
    fn entries(&self) -> Result<Vec<CatalogEntry>>;
}

/// Catalog read from a JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for JsonCatalog {
    fn entries(&self) -> Result<Vec<CatalogEntry>> {
        let data = fs::read(&self.path).map_err(|e| Error::io(&self.path, e))?;
        parse_catalog(&data, &self.path)
    }
}

/// Parse a catalog document
pub fn parse_catalog(data: &[u8], path: &Path) -> Result<Vec<CatalogEntry>> {
    serde_json::from_slice(data).map_err(|e| Error::parse(path, e))
}

/// Find an entry by pack id
pub fn find_entry<'a>(entries: &'a [CatalogEntry], id: &str) -> Option<&'a CatalogEntry> {
    entries.iter().find(|e| e.id == id)
}
