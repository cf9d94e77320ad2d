//! GCP archive reading
//!
//! A `.gcp` pack is a ZIP archive holding `info.json` and three nested ZIP
//! sub-archives (see [`crate::layout`]). This module lists and extracts the
//! outer archive and decodes a whole pack into a [`StagingTree`].

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::layout::{Category, MANIFEST_NAME};
use crate::model::{self, PackManifest};
use crate::staging::StagingTree;
use crate::subpack::{extract_zip, unpack_subpack};

/// ZIP compression methods found in packs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// No compression (stored as-is)
    Store,
    /// Standard DEFLATE compression
    Deflate,
    /// Any other method; readable only if the zip backend supports it
    Unknown,
}

impl From<zip::CompressionMethod> for CompressionMethod {
    fn from(value: zip::CompressionMethod) -> Self {
        match value {
            zip::CompressionMethod::Stored => CompressionMethod::Store,
            zip::CompressionMethod::Deflated => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown,
        }
    }
}

impl CompressionMethod {
    pub(crate) fn to_zip(self) -> zip::CompressionMethod {
        match self {
            CompressionMethod::Deflate => zip::CompressionMethod::Deflated,
            CompressionMethod::Store | CompressionMethod::Unknown => zip::CompressionMethod::Stored,
        }
    }
}

/// A single top-level entry of a GCP archive
#[derive(Debug, Clone)]
pub struct GcpEntry {
    /// Entry name within the archive
    pub name: String,
    /// Compressed size in bytes
    pub compressed_size: u64,
    /// Uncompressed size in bytes
    pub uncompressed_size: u64,
    /// Compression method used
    pub compression_method: CompressionMethod,
}

/// Upper bound for buffers sized from an entry header
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

fn initial_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_PREALLOC) as usize
}

/// Read-only view of a GCP archive's top-level entries
pub struct GcpFile {
    archive: ZipArchive<BufReader<File>>,
    path: std::path::PathBuf,
    entries: HashMap<String, GcpEntry>,
    entry_list: Vec<String>,
}

impl GcpFile {
    /// Open a GCP file for reading
    ///
    /// # Example
    /// ```no_run
    /// use gcpstudio::GcpFile;
    /// let gcp = GcpFile::open("trivia.gcp")?;
    /// # Ok::<(), gcpstudio::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::archive(path, e))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| Error::archive(path, e))?;

        let mut entries = HashMap::with_capacity(archive.len());
        let mut entry_list = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| Error::archive(path, format!("Failed to read entry: {}", e)))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            entry_list.push(name.clone());
            entries.insert(
                name.clone(),
                GcpEntry {
                    name,
                    compressed_size: entry.compressed_size(),
                    uncompressed_size: entry.size(),
                    compression_method: CompressionMethod::from(entry.compression()),
                },
            );
        }

        Ok(GcpFile {
            archive,
            path: path.to_path_buf(),
            entries,
            entry_list,
        })
    }

    /// Entry names in archive order
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entry_list.iter().map(|s| s.as_str())
    }

    /// All entries in archive order
    pub fn entries(&self) -> Vec<&GcpEntry> {
        self.entry_list
            .iter()
            .filter_map(|name| self.entries.get(name))
            .collect()
    }

    /// Get the number of entries in the archive
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the archive is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a specific entry by name
    pub fn get_entry(&self, name: &str) -> Option<&GcpEntry> {
        self.entries.get(name)
    }

    /// Extract an entry and return its contents
    pub fn extract(&mut self, name: &str) -> Result<Vec<u8>> {
        let size = self
            .entries
            .get(name)
            .map(|e| e.uncompressed_size)
            .ok_or_else(|| Error::archive(&self.path, format!("Entry not found: {}", name)))?;

        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|e| Error::archive(&self.path, e))?;
        let mut data = Vec::with_capacity(initial_capacity(size));
        entry
            .read_to_end(&mut data)
            .map_err(|e| Error::archive(&self.path, format!("Failed to read {}: {}", name, e)))?;
        Ok(data)
    }

    /// Read and parse `info.json` without unpacking anything else
    pub fn manifest(&mut self) -> Result<PackManifest> {
        if !self.entries.contains_key(MANIFEST_NAME) {
            return Err(Error::MissingManifest(self.path.clone()));
        }
        let data = self.extract(MANIFEST_NAME)?;
        model::parse_manifest(&data, &self.path.join(MANIFEST_NAME))
    }
}

/// A pack unpacked into a staging tree
#[derive(Debug)]
pub struct DecodedPack {
    pub staging: StagingTree,
    pub manifest: PackManifest,
}

/// Decode a `.gcp` archive into a fresh staging tree
///
/// On failure the partially filled staging tree is removed before the error
/// is returned.
pub fn decode<P: AsRef<Path>>(archive_path: P) -> Result<DecodedPack> {
    let staging = StagingTree::create()?;
    decode_into(archive_path.as_ref(), staging)
}

/// Decode a `.gcp` archive into a staging tree created inside `parent`
pub fn decode_in<P: AsRef<Path>>(archive_path: P, parent: &Path) -> Result<DecodedPack> {
    let staging = StagingTree::create_in(parent)?;
    decode_into(archive_path.as_ref(), staging)
}

fn decode_into(archive_path: &Path, staging: StagingTree) -> Result<DecodedPack> {
    info!("Decoding {}", archive_path.display());

    let file = File::open(archive_path).map_err(|e| Error::archive(archive_path, e))?;
    let extracted = extract_zip(BufReader::new(file), archive_path, staging.root())?;
    debug!("Extracted {} top-level entries", extracted.len());

    // The archive may omit empty categories
    staging.ensure_category_dirs()?;

    for category in Category::ALL {
        let subpack = staging.root().join(category.subpack_name());
        if !subpack.is_file() {
            continue;
        }
        unpack_subpack(&subpack, &staging.category_dir(category), category)?;
        fs::remove_file(&subpack).map_err(|e| Error::io(&subpack, e))?;
    }

    if !staging.manifest_path().is_file() {
        return Err(Error::MissingManifest(archive_path.to_path_buf()));
    }
    let manifest = model::load_manifest(staging.root())?;

    info!(
        "Opened pack '{}' ({}) with {} deck(s)",
        manifest.name,
        manifest.id,
        manifest.decks.len()
    );

    Ok(DecodedPack { staging, manifest })
}
