//! GCP pack utility functions
//!
//! This module contains the command-level operations behind the `gcp` tool:
//! listing, inspecting, unpacking, packing and editing packs.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

use crate::catalog::{CatalogSource, JsonCatalog};
use crate::layout::{Category, MANIFEST_NAME};
use crate::model::{self, Card};
use crate::subpack::list_subpack_entries_from_memory;
use crate::utils::{create_glob_matcher, format_size, list_files, matches_filter};
use crate::{CompressionMethod, GcpFile, GcpWriteOptions, NewDeck, Session};

fn progress_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    )?)
}

fn method_name(method: CompressionMethod) -> &'static str {
    match method {
        CompressionMethod::Store => "Store",
        CompressionMethod::Deflate => "Deflate",
        CompressionMethod::Unknown => "Unknown",
    }
}

/// List the entries of a pack, including the contents of its sub-archives
pub fn list_pack(gcp_path: &Path, filter: Option<&str>) -> Result<()> {
    println!("Opening {}...", gcp_path.display());

    let mut gcp = GcpFile::open(gcp_path)
        .with_context(|| format!("Failed to open {}", gcp_path.display()))?;

    let matcher = filter.map(create_glob_matcher).transpose()?;

    let mut count = 0u64;
    let mut total_size = 0u64;

    let names: Vec<String> = gcp.entry_names().map(String::from).collect();
    for name in names {
        let entry = match gcp.get_entry(&name) {
            Some(entry) => entry.clone(),
            None => continue,
        };

        if matches_filter(&entry.name, matcher.as_ref()) {
            println!(
                "{:>10} {:>10} {:>8} {}",
                format_size(entry.uncompressed_size),
                format_size(entry.compressed_size),
                method_name(entry.compression_method),
                entry.name
            );
            count += 1;
            total_size += entry.uncompressed_size;
        }

        let is_subpack = Category::ALL.iter().any(|c| c.subpack_name() == name);
        if !is_subpack {
            continue;
        }

        let data = gcp.extract(&name)?;
        for inner in list_subpack_entries_from_memory(&data)
            .with_context(|| format!("Failed to read {}", name))?
        {
            let full_name = format!("{}/{}", name, inner.name);
            if !matches_filter(&full_name, matcher.as_ref()) {
                continue;
            }
            println!(
                "{:>10} {:>10} {:>8} {}",
                format_size(inner.size),
                format_size(inner.compressed_size),
                method_name(inner.compression_method),
                full_name
            );
            count += 1;
            total_size += inner.size;
        }
    }

    println!();
    println!("Total: {} entries, {}", count, format_size(total_size));

    Ok(())
}

/// Show pack metadata and the asset state of every deck
pub fn show_info(gcp_path: &Path) -> Result<()> {
    println!("Opening {}...", gcp_path.display());

    let mut session = Session::new();
    session
        .open(gcp_path)
        .with_context(|| format!("Failed to open {}", gcp_path.display()))?;

    let manifest = session.manifest()?;
    let archive_size = fs::metadata(gcp_path)?.len();

    println!();
    println!("Pack Information:");
    println!("  File: {}", gcp_path.display());
    println!("  Size: {}", format_size(archive_size));
    println!("  ID: {}", manifest.id);
    println!("  Name: {}", manifest.name);
    println!("  Decks: {}", manifest.decks.len());
    println!();
    println!("{:<16} {:<24} {:<10} {:>5} {:>5} {:>5}", "ID", "Name", "Color", "Cards", "Image", "Sound");

    for (deck, status) in session.deck_overview()? {
        let cards = match session.load_deck(&deck.id) {
            Ok(content) => content.cards.len().to_string(),
            Err(e) if e.is_non_fatal() => "-".to_string(),
            Err(e) => return Err(e.into()),
        };
        println!(
            "{:<16} {:<24} {:<10} {:>5} {:>5} {:>5}",
            deck.id,
            deck.name,
            deck.color,
            cards,
            if status.image { "yes" } else { "-" },
            if status.sound { "yes" } else { "-" },
        );
    }

    session.close()?;
    Ok(())
}

/// Unpack a pack into a plain directory tree
pub fn unpack_pack(gcp_path: &Path, output: &Path) -> Result<()> {
    println!("Opening {}...", gcp_path.display());

    let mut session = Session::new();
    session
        .open(gcp_path)
        .with_context(|| format!("Failed to open {}", gcp_path.display()))?;
    let staging = session.staging()?;

    let mut files = vec![staging.manifest_path()];
    for category in Category::ALL {
        files.extend(list_files(&staging.category_dir(category))?);
    }

    println!("Unpacking {} files...", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(progress_style()?);

    for file in &files {
        let relative = file.strip_prefix(staging.root())?;
        pb.set_message(relative.display().to_string());

        let dest = output.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(file, &dest).with_context(|| format!("Failed to write {}", dest.display()))?;
        pb.inc(1);
    }

    // Empty categories still get their directory
    for category in Category::ALL {
        fs::create_dir_all(output.join(category.dir_name()))?;
    }

    pb.finish_with_message("Done");
    session.close()?;

    println!("\nUnpacked to: {}", output.display());
    Ok(())
}

/// Build a pack from a directory laid out like an unpacked pack
pub fn pack_directory(source_dir: &Path, output: &Path, compression: CompressionMethod) -> Result<()> {
    println!("Creating GCP from {}...", source_dir.display());

    if !source_dir.join(MANIFEST_NAME).is_file() {
        bail!("{} has no {}", source_dir.display(), MANIFEST_NAME);
    }

    let manifest = model::load_manifest(source_dir)
        .with_context(|| format!("Failed to read manifest in {}", source_dir.display()))?;
    manifest.validate()?;

    for deck in &manifest.decks {
        let path = source_dir
            .join(Category::Deck.dir_name())
            .join(Category::Deck.file_name(&deck.id));
        if !path.is_file() {
            println!("Warning: deck file {} is missing", path.display());
        }
    }

    let options = GcpWriteOptions {
        compression,
        ..Default::default()
    };
    crate::gcp_writer::encode(source_dir, output, &options)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("\nCreated: {} ({} decks)", output.display(), manifest.decks.len());
    Ok(())
}

/// Open a pack, apply `edit`, and save it to `output` (or back in place)
pub fn edit_pack<F>(gcp_path: &Path, output: Option<&Path>, options: GcpWriteOptions, edit: F) -> Result<()>
where
    F: FnOnce(&mut Session) -> Result<()>,
{
    let mut session = Session::new().with_options(options);
    session
        .open(gcp_path)
        .with_context(|| format!("Failed to open {}", gcp_path.display()))?;

    edit(&mut session)?;

    let target = output.unwrap_or(gcp_path);
    session
        .save_as(target)
        .with_context(|| format!("Failed to save {}", target.display()))?;
    session.close()?;

    println!("Saved: {}", target.display());
    Ok(())
}

/// Add a deck to a pack
pub fn add_deck(
    gcp_path: &Path,
    deck: NewDeck,
    output: Option<&Path>,
    options: GcpWriteOptions,
) -> Result<()> {
    let id = deck.id.clone();
    edit_pack(gcp_path, output, options, |session| {
        session.add_deck(deck)?;
        println!("Added deck: {}", id);
        Ok(())
    })
}

/// Change a deck id and rename its assets
pub fn rename_deck(
    gcp_path: &Path,
    old_id: &str,
    new_id: &str,
    output: Option<&Path>,
    options: GcpWriteOptions,
) -> Result<()> {
    edit_pack(gcp_path, output, options, |session| {
        session.rename_deck_id(old_id, new_id)?;
        println!("Renamed deck: {} -> {}", old_id, new_id);
        Ok(())
    })
}

/// Remove a deck and its assets from a pack
pub fn remove_deck(
    gcp_path: &Path,
    deck_id: &str,
    output: Option<&Path>,
    options: GcpWriteOptions,
) -> Result<()> {
    edit_pack(gcp_path, output, options, |session| {
        session.remove_deck(deck_id)?;
        println!("Removed deck: {}", deck_id);
        Ok(())
    })
}

/// Change pack id and/or name
pub fn set_pack_info(
    gcp_path: &Path,
    id: Option<&str>,
    name: Option<&str>,
    output: Option<&Path>,
    options: GcpWriteOptions,
) -> Result<()> {
    if id.is_none() && name.is_none() {
        bail!("Nothing to change: pass --id and/or --name");
    }
    edit_pack(gcp_path, output, options, |session| {
        session.set_pack_info(id, name)?;
        Ok(())
    })
}

/// Append a card to a deck
pub fn add_card(
    gcp_path: &Path,
    deck_id: &str,
    answer: &str,
    hints: &[String],
    output: Option<&Path>,
    options: GcpWriteOptions,
) -> Result<()> {
    edit_pack(gcp_path, output, options, |session| {
        let mut deck = session.load_deck(deck_id)?;
        deck.cards.push(Card::new(answer, hints.to_vec()));
        let count = deck.cards.len();
        session.update_deck(deck_id, deck)?;
        println!("Deck {} now has {} cards", deck_id, count);
        Ok(())
    })
}

/// Replace the image or sound of a deck
pub fn replace_asset(
    gcp_path: &Path,
    deck_id: &str,
    category: Category,
    source: &Path,
    output: Option<&Path>,
    options: GcpWriteOptions,
) -> Result<()> {
    edit_pack(gcp_path, output, options, |session| {
        match category {
            Category::Image => session.replace_image(deck_id, source)?,
            Category::Sound => session.replace_sound(deck_id, source)?,
            Category::Deck => bail!("Deck files are edited through cards, not replaced"),
        }
        println!("Replaced {} of deck {}", category, deck_id);
        Ok(())
    })
}

/// Print the entries of a catalog document
pub fn list_catalog(path: &Path) -> Result<()> {
    let catalog = JsonCatalog::new(path);
    let entries = catalog
        .entries()
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    for entry in &entries {
        println!("{:<16} {:<32} {}", entry.id, entry.name, entry.download_url);
    }
    println!();
    println!("Total: {} packs", entries.len());
    Ok(())
}
