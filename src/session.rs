//! Editing session over a single open pack
//!
//! A [`Session`] is either closed or holds exactly one open pack: its staging
//! tree, its manifest and the path it was opened from. Opening another pack
//! tears the current one down first, and every edit goes through `&mut self`,
//! so two packs can never share or interleave a staging tree.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gcpstudio::{NewDeck, Session};
//!
//! fn main() -> gcpstudio::Result<()> {
//!     let mut session = Session::new();
//!     session.open("trivia.gcp")?;
//!     session.add_deck(NewDeck::new("history", "History", "#aa3300"))?;
//!     session.rename_deck_id("history", "hist")?;
//!     session.save()?;
//!     session.close()
//! }
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::assets::{import_image, import_sound};
use crate::error::{Error, Result};
use crate::gcp;
use crate::gcp_writer::{encode, GcpWriteOptions};
use crate::layout::Category;
use crate::model::{self, DeckContent, DeckRef, PackManifest};
use crate::staging::{AssetStatus, StagingTree};

/// Input for adding a deck
#[derive(Debug, Clone, Default)]
pub struct NewDeck {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Cover image; PNG or any format that can be converted to PNG
    pub image: Option<PathBuf>,
    /// Audio clip, stored as-is
    pub sound: Option<PathBuf>,
}

impl NewDeck {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            image: None,
            sound: None,
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(path.into());
        self
    }

    pub fn with_sound(mut self, path: impl Into<PathBuf>) -> Self {
        self.sound = Some(path.into());
        self
    }
}

/// Add a deck to a manifest and its staging tree
///
/// The id must be non-empty and unused. On any failure both the manifest and
/// the staging tree are left as they were.
pub fn add_deck(manifest: &mut PackManifest, staging: &StagingTree, deck: NewDeck) -> Result<()> {
    let deck_ref = DeckRef::new(deck.id, deck.name, deck.color);
    deck_ref.validate()?;
    if manifest.contains(&deck_ref.id) {
        return Err(Error::DuplicateDeckId(deck_ref.id));
    }

    let mut written: Vec<PathBuf> = Vec::new();
    let result = (|| -> Result<()> {
        if let Some(source) = &deck.image {
            let dest = staging.asset_path(Category::Image, &deck_ref.id);
            import_image(source, &dest)?;
            written.push(dest);
        }
        if let Some(source) = &deck.sound {
            let dest = staging.asset_path(Category::Sound, &deck_ref.id);
            import_sound(source, &dest)?;
            written.push(dest);
        }
        let content = DeckContent::empty(deck_ref.name.clone(), deck_ref.color.clone());
        model::save_deck(&content, staging.root(), &deck_ref.id)?;
        written.push(staging.asset_path(Category::Deck, &deck_ref.id));
        Ok(())
    })();

    if let Err(e) = result {
        for path in &written {
            if let Err(cleanup) = std::fs::remove_file(path) {
                warn!("Failed to roll back {}: {}", path.display(), cleanup);
            }
        }
        return Err(e);
    }

    debug!("Added deck '{}'", deck_ref.id);
    manifest.push_deck(deck_ref)
}

/// Rename a deck id together with its asset files
///
/// Asset categories without a file for `old_id` are skipped.
pub fn rename_deck_id(
    manifest: &mut PackManifest,
    staging: &StagingTree,
    old_id: &str,
    new_id: &str,
) -> Result<()> {
    if new_id.trim().is_empty() {
        return Err(Error::missing_field("deck.id"));
    }
    if !model::is_valid_deck_id(new_id) {
        return Err(Error::InvalidDeckId(new_id.to_string()));
    }
    if !manifest.contains(old_id) {
        return Err(Error::DeckNotFound(old_id.to_string()));
    }
    if old_id == new_id {
        return Ok(());
    }
    if manifest.contains(new_id) {
        return Err(Error::DuplicateDeckId(new_id.to_string()));
    }

    let renamed = staging.rename_assets(old_id, new_id)?;
    debug!("Renamed deck '{}' -> '{}' ({:?})", old_id, new_id, renamed);

    if let Some(deck) = manifest.deck_mut(old_id) {
        deck.id = new_id.to_string();
    }
    Ok(())
}

struct OpenPack {
    staging: StagingTree,
    manifest: PackManifest,
    source: Option<PathBuf>,
}

/// Editing session: closed, or open on exactly one pack
#[derive(Default)]
pub struct Session {
    open: Option<OpenPack>,
    options: GcpWriteOptions,
    staging_parent: Option<PathBuf>,
}

impl Session {
    /// Create a closed session with default write options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the options used when saving
    pub fn with_options(mut self, options: GcpWriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Create staging trees inside `parent` instead of the system temp dir
    pub fn with_staging_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.staging_parent = Some(parent.into());
        self
    }

    /// Whether a pack is currently open
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn pack(&self) -> Result<&OpenPack> {
        self.open.as_ref().ok_or(Error::NoOpenPack)
    }

    fn pack_mut(&mut self) -> Result<&mut OpenPack> {
        self.open.as_mut().ok_or(Error::NoOpenPack)
    }

    fn new_staging(&self) -> Result<StagingTree> {
        match &self.staging_parent {
            Some(parent) => StagingTree::create_in(parent),
            None => StagingTree::create(),
        }
    }

    /// Open a pack, closing the current one first
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<&PackManifest> {
        let path = path.as_ref();
        self.close()?;

        let decoded = match &self.staging_parent {
            Some(parent) => gcp::decode_in(path, parent)?,
            None => gcp::decode(path)?,
        };

        let pack = self.open.insert(OpenPack {
            staging: decoded.staging,
            manifest: decoded.manifest,
            source: Some(path.to_path_buf()),
        });
        Ok(&pack.manifest)
    }

    /// Start a new, empty pack, closing the current one first
    ///
    /// The pack has no file yet; save it with [`Session::save_as`].
    pub fn create(&mut self, id: impl Into<String>, name: impl Into<String>) -> Result<&PackManifest> {
        self.close()?;

        let staging = self.new_staging()?;
        let manifest = PackManifest::new(id, name);
        model::save_manifest(&manifest, staging.root())?;
        info!("Created new pack '{}'", manifest.id);

        let pack = self.open.insert(OpenPack {
            staging,
            manifest,
            source: None,
        });
        Ok(&pack.manifest)
    }

    /// Close the open pack and remove its staging tree
    ///
    /// Closing an already closed session does nothing.
    pub fn close(&mut self) -> Result<()> {
        if let Some(pack) = self.open.take() {
            debug!("Closing pack '{}'", pack.manifest.id);
            pack.staging.close()?;
        }
        Ok(())
    }

    /// Manifest of the open pack
    pub fn manifest(&self) -> Result<&PackManifest> {
        Ok(&self.pack()?.manifest)
    }

    /// Staging tree of the open pack
    pub fn staging(&self) -> Result<&StagingTree> {
        Ok(&self.pack()?.staging)
    }

    /// Path the open pack was loaded from or last saved to
    pub fn source_path(&self) -> Result<Option<&Path>> {
        Ok(self.pack()?.source.as_deref())
    }

    /// Update pack id and/or name
    pub fn set_pack_info(&mut self, id: Option<&str>, name: Option<&str>) -> Result<()> {
        let pack = self.pack_mut()?;
        if let Some(id) = id {
            pack.manifest.id = id.to_string();
        }
        if let Some(name) = name {
            pack.manifest.name = name.to_string();
        }
        Ok(())
    }

    /// Decks in manifest order with the presence of their assets
    pub fn deck_overview(&self) -> Result<Vec<(DeckRef, AssetStatus)>> {
        let pack = self.pack()?;
        Ok(pack
            .manifest
            .decks
            .iter()
            .map(|d| (d.clone(), pack.staging.asset_status(&d.id)))
            .collect())
    }

    /// Presence of a deck's assets
    pub fn asset_status(&self, deck_id: &str) -> Result<AssetStatus> {
        let pack = self.pack()?;
        if !pack.manifest.contains(deck_id) {
            return Err(Error::DeckNotFound(deck_id.to_string()));
        }
        Ok(pack.staging.asset_status(deck_id))
    }

    /// Add a deck at the end of the pack
    pub fn add_deck(&mut self, deck: NewDeck) -> Result<()> {
        let pack = self.pack_mut()?;
        add_deck(&mut pack.manifest, &pack.staging, deck)
    }

    /// Change a deck's id and rename its assets
    pub fn rename_deck_id(&mut self, old_id: &str, new_id: &str) -> Result<()> {
        let pack = self.pack_mut()?;
        rename_deck_id(&mut pack.manifest, &pack.staging, old_id, new_id)
    }

    fn deck_ref_mut(&mut self, deck_id: &str) -> Result<&mut DeckRef> {
        self.pack_mut()?
            .manifest
            .deck_mut(deck_id)
            .ok_or_else(|| Error::DeckNotFound(deck_id.to_string()))
    }

    /// Change a deck's display name
    pub fn rename_deck(&mut self, deck_id: &str, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::missing_field(format!("deck[{}].name", deck_id)));
        }
        self.deck_ref_mut(deck_id)?.name = name.to_string();
        Ok(())
    }

    /// Change a deck's color
    pub fn recolor_deck(&mut self, deck_id: &str, color: &str) -> Result<()> {
        if color.trim().is_empty() {
            return Err(Error::missing_field(format!("deck[{}].color", deck_id)));
        }
        self.deck_ref_mut(deck_id)?.color = color.to_string();
        Ok(())
    }

    /// Remove a deck and delete its assets
    pub fn remove_deck(&mut self, deck_id: &str) -> Result<DeckRef> {
        let pack = self.pack_mut()?;
        if !pack.manifest.contains(deck_id) {
            return Err(Error::DeckNotFound(deck_id.to_string()));
        }
        pack.staging.remove_assets(deck_id)?;
        pack.manifest
            .remove_deck(deck_id)
            .ok_or_else(|| Error::DeckNotFound(deck_id.to_string()))
    }

    fn replace_asset(&mut self, deck_id: &str, category: Category, source: &Path) -> Result<()> {
        let pack = self.pack()?;
        if !pack.manifest.contains(deck_id) {
            return Err(Error::DeckNotFound(deck_id.to_string()));
        }
        let dest = pack.staging.asset_path(category, deck_id);
        match category {
            Category::Image => import_image(source, &dest),
            Category::Sound => import_sound(source, &dest),
            Category::Deck => Err(Error::missing_field("asset category")),
        }
    }

    /// Replace a deck's cover image
    pub fn replace_image(&mut self, deck_id: &str, source: &Path) -> Result<()> {
        self.replace_asset(deck_id, Category::Image, source)
    }

    /// Replace a deck's audio clip
    pub fn replace_sound(&mut self, deck_id: &str, source: &Path) -> Result<()> {
        self.replace_asset(deck_id, Category::Sound, source)
    }

    /// Load a deck's cards
    pub fn load_deck(&self, deck_id: &str) -> Result<DeckContent> {
        let pack = self.pack()?;
        if !pack.manifest.contains(deck_id) {
            return Err(Error::DeckNotFound(deck_id.to_string()));
        }
        model::load_deck(pack.staging.root(), deck_id)
    }

    /// Store a deck's cards
    ///
    /// Name and color always follow the manifest entry.
    pub fn update_deck(&mut self, deck_id: &str, mut content: DeckContent) -> Result<()> {
        let pack = self.pack()?;
        let deck = pack
            .manifest
            .deck(deck_id)
            .ok_or_else(|| Error::DeckNotFound(deck_id.to_string()))?;
        content.sync_with(deck);
        model::save_deck(&content, pack.staging.root(), deck_id)
    }

    /// Save the open pack back to the file it came from
    pub fn save(&mut self) -> Result<PathBuf> {
        let target = self
            .pack()?
            .source
            .clone()
            .ok_or_else(|| Error::missing_field("output path"))?;
        self.save_as(&target)
    }

    /// Save the open pack to `output` and remember it as the pack's path
    pub fn save_as<P: AsRef<Path>>(&mut self, output: P) -> Result<PathBuf> {
        let output = output.as_ref().to_path_buf();
        let options = self.options.clone();
        let pack = self.pack_mut()?;

        pack.manifest.validate()?;
        sync_deck_files(pack)?;
        model::save_manifest(&pack.manifest, pack.staging.root())?;
        encode(pack.staging.root(), &output, &options)?;

        info!("Saved pack '{}' to {}", pack.manifest.id, output.display());
        pack.source = Some(output.clone());
        Ok(output)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(pack) = self.open.take() {
            if let Err(e) = pack.staging.close() {
                warn!("Failed to clean up staging tree: {}", e);
            }
        }
    }
}

fn sync_deck_files(pack: &OpenPack) -> Result<()> {
    let root = pack.staging.root();
    for deck in &pack.manifest.decks {
        let mut content = match model::load_deck(root, &deck.id) {
            Ok(content) => content,
            Err(Error::AssetNotFound(path)) => {
                warn!("Deck file {} is missing, saving without it", path.display());
                continue;
            }
            Err(e) => return Err(e),
        };
        if content.sync_with(deck) {
            model::save_deck(&content, root, &deck.id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Card;
    use std::fs;

    fn open_blank(parent: &Path) -> Session {
        let mut session = Session::new().with_staging_parent(parent);
        session.create("p1", "Pack One").unwrap();
        session
    }

    #[test]
    fn test_closed_session_rejects_edits() {
        let mut session = Session::new();
        assert!(!session.is_open());
        assert!(matches!(session.save(), Err(Error::NoOpenPack)));
        assert!(matches!(session.add_deck(NewDeck::new("a", "A", "#000")), Err(Error::NoOpenPack)));
        assert!(matches!(session.manifest(), Err(Error::NoOpenPack)));
        session.close().unwrap();
    }

    #[test]
    fn test_add_deck_appends_and_writes_empty_deck() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());

        session.add_deck(NewDeck::new("b", "Bravo", "#222")).unwrap();
        session.add_deck(NewDeck::new("a", "Alpha", "#111")).unwrap();

        let ids: Vec<_> = session.manifest().unwrap().deck_ids().map(String::from).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let deck = session.load_deck("a").unwrap();
        assert_eq!(deck, DeckContent::empty("Alpha", "#111"));
        assert_eq!(
            session.asset_status("a").unwrap(),
            AssetStatus { deck: true, image: false, sound: false }
        );
    }

    #[test]
    fn test_path_like_deck_ids_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());

        let err = session.add_deck(NewDeck::new("../../escaped", "Out", "#111")).unwrap_err();
        assert!(matches!(err, Error::InvalidDeckId(_)));
        assert!(session.manifest().unwrap().decks.is_empty());
        assert!(!tmp.path().join("escaped.json").exists());

        session.add_deck(NewDeck::new("d1", "One", "#111")).unwrap();
        let err = session.rename_deck_id("d1", "../d1").unwrap_err();
        assert!(matches!(err, Error::InvalidDeckId(_)));
        assert!(session.manifest().unwrap().contains("d1"));
        assert!(session.asset_status("d1").unwrap().deck);
    }

    #[test]
    fn test_add_duplicate_deck_changes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        session.add_deck(NewDeck::new("d1", "One", "#111")).unwrap();
        let before = session.manifest().unwrap().clone();
        let deck_before = fs::read(session.staging().unwrap().asset_path(Category::Deck, "d1")).unwrap();

        let sound = tmp.path().join("clip.m4a");
        fs::write(&sound, b"new clip").unwrap();
        let err = session
            .add_deck(NewDeck::new("d1", "Other", "#999").with_sound(&sound))
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateDeckId(ref id) if id == "d1"));
        assert_eq!(session.manifest().unwrap(), &before);
        let staging = session.staging().unwrap();
        assert_eq!(fs::read(staging.asset_path(Category::Deck, "d1")).unwrap(), deck_before);
        assert!(!staging.asset_path(Category::Sound, "d1").exists());
    }

    #[test]
    fn test_add_deck_rolls_back_on_bad_asset() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        let image = tmp.path().join("cover.png");
        image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]))
            .save_with_format(&image, image::ImageFormat::Png)
            .unwrap();

        let err = session
            .add_deck(
                NewDeck::new("d1", "One", "#111")
                    .with_image(&image)
                    .with_sound(tmp.path().join("missing.m4a")),
            )
            .unwrap_err();
        assert!(matches!(err, Error::AssetNotFound(_)));
        assert!(session.manifest().unwrap().decks.is_empty());
        assert_eq!(session.asset_status("d1").ok(), None);
        let staging = session.staging().unwrap();
        assert!(!staging.asset_path(Category::Image, "d1").exists());
        assert!(!staging.asset_path(Category::Deck, "d1").exists());
    }

    #[test]
    fn test_add_deck_requires_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        let err = session.add_deck(NewDeck::new("", "Name", "#000")).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { .. }));
        let err = session.add_deck(NewDeck::new("x", "Name", "")).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { .. }));
    }

    #[test]
    fn test_rename_deck_id_moves_existing_assets() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        let sound = tmp.path().join("clip.m4a");
        fs::write(&sound, b"clip").unwrap();
        session.add_deck(NewDeck::new("old", "Deck", "#123").with_sound(&sound)).unwrap();
        session.add_deck(NewDeck::new("other", "Other", "#456")).unwrap();

        session.rename_deck_id("old", "new").unwrap();

        let ids: Vec<_> = session.manifest().unwrap().deck_ids().map(String::from).collect();
        assert_eq!(ids, vec!["new", "other"]);
        assert_eq!(
            session.asset_status("new").unwrap(),
            AssetStatus { deck: true, image: false, sound: true }
        );
        let staging = session.staging().unwrap();
        assert!(!staging.asset_path(Category::Deck, "old").exists());
        assert!(!staging.asset_path(Category::Image, "new").exists());

        assert!(matches!(
            session.rename_deck_id("new", "other"),
            Err(Error::DuplicateDeckId(_))
        ));
        assert!(matches!(session.rename_deck_id("ghost", "x"), Err(Error::DeckNotFound(_))));
        assert!(matches!(
            session.rename_deck_id("new", " "),
            Err(Error::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_update_deck_follows_manifest_name_and_color() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        session.add_deck(NewDeck::new("d1", "One", "#111")).unwrap();
        session.rename_deck("d1", "Uno").unwrap();
        session.recolor_deck("d1", "#abcdef").unwrap();

        let mut deck = session.load_deck("d1").unwrap();
        deck.cards.push(Card::new("Paris", vec!["France".into(), "Seine".into(), "Eiffel".into()]));
        session.update_deck("d1", deck).unwrap();

        let deck = session.load_deck("d1").unwrap();
        assert_eq!(deck.name, "Uno");
        assert_eq!(deck.color, "#abcdef");
        assert_eq!(deck.cards[0].answer, "Paris");
    }

    #[test]
    fn test_remove_deck_deletes_assets() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        for id in ["a", "b", "c"] {
            session.add_deck(NewDeck::new(id, id, "#000")).unwrap();
        }
        let removed = session.remove_deck("b").unwrap();
        assert_eq!(removed.id, "b");
        let ids: Vec<_> = session.manifest().unwrap().deck_ids().map(String::from).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(!session.staging().unwrap().asset_path(Category::Deck, "b").exists());
    }

    #[test]
    fn test_save_without_path_and_with_blank_pack_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        assert!(matches!(session.save(), Err(Error::MissingRequiredField { .. })));

        session.set_pack_info(None, Some("")).unwrap();
        let err = session.save_as(tmp.path().join("x.gcp")).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { ref field } if field == "pack.name"));
        assert!(!tmp.path().join("x.gcp").exists());
    }

    #[test]
    fn test_close_and_reopen_tear_down_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = open_blank(tmp.path());
        let first = session.staging().unwrap().root().to_path_buf();

        session.create("p2", "Pack Two").unwrap();
        assert!(!first.exists());
        let second = session.staging().unwrap().root().to_path_buf();

        session.close().unwrap();
        assert!(!session.is_open());
        assert!(!second.exists());
    }
}
