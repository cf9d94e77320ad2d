//! Inner sub-archive handling (`deck.gcdp`, `image.gcip`, `sound.gcsp`)
//!
//! Sub-archives are standard ZIP files holding one flat entry per deck, named
//! `<deck id>.<packed ext>`. This module extracts them into a category
//! directory and builds them back from one.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::gcp::CompressionMethod;
use crate::gcp_writer::GcpWriteOptions;
use crate::layout::Category;
use crate::transform;
use crate::utils::{extension_of, list_files, rename_extension};

/// Extract every file entry of a ZIP archive below `output_dir`
///
/// Entries whose names would land outside `output_dir` are rejected.
/// `archive_path` is only used for error messages.
///
/// # Returns
/// Paths of the extracted files
pub fn extract_zip<R: Read + Seek>(
    reader: R,
    archive_path: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut archive = ZipArchive::new(reader).map_err(|e| Error::archive(archive_path, e))?;
    let mut extracted = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::archive(archive_path, format!("Failed to read entry: {}", e)))?;

        let relative = entry.enclosed_name().ok_or_else(|| {
            Error::archive(archive_path, format!("Unsafe entry name: {}", entry.name()))
        })?;
        let destination = output_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&destination).map_err(|e| Error::io(&destination, e))?;
            continue;
        }

        if destination.is_dir() {
            return Err(Error::archive(
                archive_path,
                format!("Entry '{}' collides with a directory", entry.name()),
            ));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut output_file = File::create(&destination).map_err(|e| Error::io(&destination, e))?;
        io::copy(&mut entry, &mut output_file)
            .map_err(|e| Error::archive(archive_path, format!("Failed to read {}: {}", entry.name(), e)))?;

        extracted.push(destination);
    }

    Ok(extracted)
}

/// Extract a sub-archive into its category directory and restore real files
///
/// Files carrying the category's packed extension are renamed to the real
/// extension; deck payloads are shifted back first. Anything else in the
/// directory is left as it is.
///
/// # Returns
/// Number of files restored
pub fn unpack_subpack(subpack_path: &Path, category_dir: &Path, category: Category) -> Result<usize> {
    fs::create_dir_all(category_dir).map_err(|e| Error::io(category_dir, e))?;

    let file = File::open(subpack_path)
        .map_err(|e| Error::archive(subpack_path, e))?;
    extract_zip(file, subpack_path, category_dir)?;

    let mut restored = 0;
    for path in list_files(category_dir)? {
        let Some(packed) = extension_of(&path).and_then(Category::from_packed_ext) else {
            continue;
        };

        if packed.is_shifted() {
            let mut data = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            transform::shift_down(&mut data);
            fs::write(&path, data).map_err(|e| Error::io(&path, e))?;
        }

        // Any packed extension becomes this directory's real extension
        rename_extension(&path, category.real_ext())?;
        restored += 1;
    }

    debug!(
        "Unpacked {} {} file(s) from {}",
        restored,
        category,
        subpack_path.display()
    );

    Ok(restored)
}

/// Convert a category directory in place to its packed form
///
/// Real-extension files are renamed to the packed extension and deck payloads
/// are shifted up. Must only be used on a scratch copy.
///
/// # Returns
/// Number of files converted
pub fn prepare_category_dir(category_dir: &Path, category: Category) -> Result<usize> {
    let mut converted = 0;
    for path in list_files(category_dir).map_err(as_write_error)? {
        if extension_of(&path) != Some(category.real_ext()) {
            continue;
        }

        if category.is_shifted() {
            let mut data = fs::read(&path).map_err(|e| Error::write(&path, e))?;
            transform::shift_up(&mut data);
            fs::write(&path, data).map_err(|e| Error::write(&path, e))?;
        }

        rename_extension(&path, category.packed_ext()).map_err(as_write_error)?;
        converted += 1;
    }
    Ok(converted)
}

/// Write `files` into a new ZIP at `output`, storing only their file names
pub fn write_flat_zip(files: &[PathBuf], output: &Path, options: &GcpWriteOptions) -> Result<()> {
    let out = File::create(output).map_err(|e| Error::write(output, e))?;
    let mut writer = ZipWriter::new(out);
    let file_options = zip_file_options(options);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::write(path, io::Error::new(io::ErrorKind::InvalidInput, "No file name")))?;

        let data = fs::read(path).map_err(|e| Error::write(path, e))?;
        writer
            .start_file(name, file_options)
            .map_err(|e| Error::write(output, zip_to_io(e)))?;
        writer.write_all(&data).map_err(|e| Error::write(output, e))?;
    }

    writer
        .finish()
        .map_err(|e| Error::write(output, zip_to_io(e)))?
        .sync_all()
        .map_err(|e| Error::write(output, e))?;

    Ok(())
}

/// Pack a category directory into its sub-archive
///
/// Every regular file in the directory ends up in the archive, sorted by
/// name. A missing directory produces an empty sub-archive.
///
/// # Returns
/// Number of entries written
pub fn pack_subpack(
    category_dir: &Path,
    output: &Path,
    options: &GcpWriteOptions,
) -> Result<usize> {
    let files = list_files(category_dir).map_err(as_write_error)?;
    write_flat_zip(&files, output, options)?;
    Ok(files.len())
}

/// Entry information from a sub-archive
#[derive(Debug, Clone)]
pub struct SubpackEntryInfo {
    /// Entry name within the sub-archive
    pub name: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Compressed size in bytes
    pub compressed_size: u64,
    /// Compression method of the entry
    pub compression_method: CompressionMethod,
}

/// List entries of a sub-archive held in memory without extracting
pub fn list_subpack_entries_from_memory(data: &[u8]) -> Result<Vec<SubpackEntryInfo>> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::archive("<memory>", e))?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| Error::archive("<memory>", format!("Failed to read entry: {}", e)))?;

        if entry.is_dir() || entry.name().is_empty() {
            continue;
        }

        entries.push(SubpackEntryInfo {
            name: entry.name().to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
            compression_method: CompressionMethod::from(entry.compression()),
        });
    }

    Ok(entries)
}

pub(crate) fn zip_file_options(options: &GcpWriteOptions) -> SimpleFileOptions {
    let base = SimpleFileOptions::default().compression_method(options.compression.to_zip());
    match options.compression {
        CompressionMethod::Deflate => base.compression_level(Some(options.deflate_level)),
        _ => base,
    }
}

/// Report a filesystem failure while building a pack as a write failure
pub(crate) fn as_write_error(err: Error) -> Error {
    match err {
        Error::Io { path, source } => Error::write(path, source),
        other => other,
    }
}

pub(crate) fn zip_to_io(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}
