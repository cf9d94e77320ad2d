//! GCP archive writing
//!
//! [`GcpWriter`] writes a flat archive into a temporary file next to the
//! destination and renames it into place on [`GcpWriter::finish`], so an
//! existing pack is never left half-written. [`encode`] builds a complete
//! pack from a staging tree.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::ZipWriter;

use crate::error::{Error, Result};
use crate::gcp::CompressionMethod;
use crate::layout::{archive_entries, Category, MANIFEST_NAME};
use crate::subpack::{as_write_error, pack_subpack, prepare_category_dir, zip_file_options, zip_to_io};
use crate::utils::copy_dir_recursive;

/// Options for writing GCP files
#[derive(Debug, Clone)]
pub struct GcpWriteOptions {
    /// Compression method for every entry, outer and inner
    pub compression: CompressionMethod,
    /// Compression level for Deflate (0-9, default 6)
    pub deflate_level: i64,
}

impl Default for GcpWriteOptions {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Store,
            deflate_level: 6,
        }
    }
}

/// Writer for the flat top-level archive
pub struct GcpWriter {
    writer: ZipWriter<NamedTempFile>,
    output: PathBuf,
    options: GcpWriteOptions,
    names: Vec<String>,
}

impl GcpWriter {
    /// Start writing a new archive that will end up at `output`
    pub fn create<P: AsRef<Path>>(output: P) -> Result<Self> {
        Self::create_with_options(output, GcpWriteOptions::default())
    }

    /// Start writing a new archive with custom options
    pub fn create_with_options<P: AsRef<Path>>(output: P, options: GcpWriteOptions) -> Result<Self> {
        let output = output.as_ref().to_path_buf();
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let temp = tempfile::Builder::new()
            .prefix(".gcp-")
            .suffix(".tmp")
            .tempfile_in(&parent)
            .map_err(|e| Error::write(&output, e))?;

        Ok(Self {
            writer: ZipWriter::new(temp),
            output,
            options,
            names: Vec::new(),
        })
    }

    /// Add an entry with the given name and contents
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, zip_file_options(&self.options))
            .map_err(|e| Error::write(&self.output, zip_to_io(e)))?;
        self.writer
            .write_all(data)
            .map_err(|e| Error::write(&self.output, e))?;
        self.names.push(name.to_string());
        Ok(())
    }

    /// Add a file from disk under its own file name
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::write(path, std::io::Error::new(std::io::ErrorKind::InvalidInput, "No file name"))
            })?;
        let data = fs::read(path).map_err(|e| Error::write(path, e))?;
        self.add_entry(&name, &data)
    }

    /// Names of the entries written so far
    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    /// Finalize the archive and move it over the destination
    pub fn finish(self) -> Result<PathBuf> {
        let output = self.output;
        let temp = self
            .writer
            .finish()
            .map_err(|e| Error::write(&output, zip_to_io(e)))?;
        temp.as_file().sync_all().map_err(|e| Error::write(&output, e))?;
        temp.persist(&output).map_err(|e| Error::write(&output, e.error))?;
        Ok(output)
    }
}

/// Encode a staging tree into a `.gcp` archive at `output`
///
/// The staging tree itself is never modified: the work happens on a scratch
/// copy that is removed whether encoding succeeds or not.
pub fn encode(staging_root: &Path, output: &Path, options: &GcpWriteOptions) -> Result<()> {
    info!("Encoding {} -> {}", staging_root.display(), output.display());

    if !staging_root.join(MANIFEST_NAME).is_file() {
        return Err(Error::MissingManifest(staging_root.to_path_buf()));
    }

    let scratch = tempfile::Builder::new()
        .prefix("gcp-encode-")
        .tempdir()
        .map_err(|e| Error::write(output, e))?;
    let work = scratch.path().join("pack");
    copy_dir_recursive(staging_root, &work).map_err(as_write_error)?;

    for category in Category::ALL {
        let dir = work.join(category.dir_name());
        let converted = prepare_category_dir(&dir, category)?;
        let subpack = work.join(category.subpack_name());
        let written = pack_subpack(&dir, &subpack, options)?;
        debug!(
            "Packed {} entries ({} converted) into {}",
            written,
            converted,
            category.subpack_name()
        );
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| Error::write(&dir, e))?;
        }
    }

    let mut writer = GcpWriter::create_with_options(output, options.clone())?;
    for name in archive_entries() {
        writer.add_file(&work.join(name))?;
    }
    let output = writer.finish()?;

    info!("Wrote {}", output.display());
    Ok(())
}
