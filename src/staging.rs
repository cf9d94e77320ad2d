//! Staging tree: the unpacked, editable form of a pack
//!
//! ```text
//! <root>/
//!   info.json
//!   deck/<id>.json
//!   image/<id>.png
//!   sound/<id>.m4a
//! ```
//!
//! A [`StagingTree`] owns its directory. Dropping it removes the directory
//! recursively, whichever way the owning operation ends.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::layout::{Category, MANIFEST_NAME};
use crate::model::is_valid_deck_id;
use crate::subpack::as_write_error;

/// Which assets of a deck are present in the staging tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStatus {
    pub deck: bool,
    pub image: bool,
    pub sound: bool,
}

impl AssetStatus {
    /// Whether the asset of the given category exists
    pub fn has(&self, category: Category) -> bool {
        match category {
            Category::Deck => self.deck,
            Category::Image => self.image,
            Category::Sound => self.sound,
        }
    }
}

/// Temporary directory holding an unpacked pack
#[derive(Debug)]
pub struct StagingTree {
    dir: TempDir,
}

impl StagingTree {
    /// Create a fresh, empty staging tree with all category directories
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("gcp-staging-")
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        let tree = Self { dir };
        tree.ensure_category_dirs()?;
        debug!("Created staging tree at {}", tree.root().display());
        Ok(tree)
    }

    /// Create a staging tree inside `parent` instead of the system temp dir
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("gcp-staging-")
            .tempdir_in(parent)
            .map_err(|e| Error::io(parent, e))?;
        let tree = Self { dir };
        tree.ensure_category_dirs()?;
        Ok(tree)
    }

    /// Root directory of the tree
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `info.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.root().join(MANIFEST_NAME)
    }

    /// Directory of a category
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root().join(category.dir_name())
    }

    /// Path of a deck's asset in a category, whether or not it exists
    pub fn asset_path(&self, category: Category, deck_id: &str) -> PathBuf {
        self.category_dir(category).join(category.file_name(deck_id))
    }

    /// Path of an existing asset, or [`Error::AssetNotFound`]
    pub fn existing_asset(&self, category: Category, deck_id: &str) -> Result<PathBuf> {
        let path = self.asset_path(category, deck_id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::AssetNotFound(path))
        }
    }

    /// Create `deck/`, `image/` and `sound/` if missing
    pub fn ensure_category_dirs(&self) -> Result<()> {
        for category in Category::ALL {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }

    /// Presence of every asset of a deck
    pub fn asset_status(&self, deck_id: &str) -> AssetStatus {
        AssetStatus {
            deck: self.asset_path(Category::Deck, deck_id).is_file(),
            image: self.asset_path(Category::Image, deck_id).is_file(),
            sound: self.asset_path(Category::Sound, deck_id).is_file(),
        }
    }

    /// Rename every existing asset of `old_id` to `new_id`
    ///
    /// Categories without a file for `old_id` are skipped. If a rename fails,
    /// the ones already done are moved back before the error is returned.
    ///
    /// # Returns
    /// Categories that were renamed
    pub fn rename_assets(&self, old_id: &str, new_id: &str) -> Result<Vec<Category>> {
        check_deck_id(old_id)?;
        check_deck_id(new_id)?;

        let mut renamed = Vec::new();
        for category in [Category::Image, Category::Sound, Category::Deck] {
            let old_path = self.asset_path(category, old_id);
            if !old_path.is_file() {
                continue;
            }
            let new_path = self.asset_path(category, new_id);
            if let Err(e) = fs::rename(&old_path, &new_path) {
                self.undo_renames(&renamed, old_id, new_id);
                return Err(Error::write(&new_path, e));
            }
            renamed.push(category);
        }
        Ok(renamed)
    }

    fn undo_renames(&self, renamed: &[Category], old_id: &str, new_id: &str) {
        for &category in renamed.iter().rev() {
            let from = self.asset_path(category, new_id);
            let to = self.asset_path(category, old_id);
            if let Err(e) = fs::rename(&from, &to) {
                warn!("Failed to restore {}: {}", to.display(), e);
            }
        }
    }

    /// Delete every existing asset of a deck
    pub fn remove_assets(&self, deck_id: &str) -> Result<()> {
        check_deck_id(deck_id)?;
        for category in Category::ALL {
            let path = self.asset_path(category, deck_id);
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| Error::write(&path, e))?;
            }
        }
        Ok(())
    }

    /// Copy the whole tree into `dest`, which must not exist yet
    pub fn export_to(&self, dest: &Path) -> Result<()> {
        crate::utils::copy_dir_recursive(self.root(), dest).map_err(as_write_error)
    }

    /// Remove the directory now and report failures
    pub fn close(self) -> Result<()> {
        let path = self.root().to_path_buf();
        self.dir.close().map_err(|e| {
            warn!("Failed to remove staging tree {}: {}", path.display(), e);
            Error::io(&path, e)
        })?;
        debug!("Removed staging tree {}", path.display());
        Ok(())
    }
}

fn check_deck_id(deck_id: &str) -> Result<()> {
    if is_valid_deck_id(deck_id) {
        Ok(())
    } else {
        Err(Error::InvalidDeckId(deck_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_has_category_dirs_and_is_removed_on_drop() {
        let tree = StagingTree::create().unwrap();
        let root = tree.root().to_path_buf();
        for category in Category::ALL {
            assert!(tree.category_dir(category).is_dir());
        }
        drop(tree);
        assert!(!root.exists());
    }

    #[test]
    fn test_close_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let tree = StagingTree::create_in(parent.path()).unwrap();
        let root = tree.root().to_path_buf();
        tree.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_rename_assets_skips_missing_categories() {
        let tree = StagingTree::create().unwrap();
        fs::write(tree.asset_path(Category::Deck, "old"), b"{}").unwrap();
        fs::write(tree.asset_path(Category::Sound, "old"), b"snd").unwrap();

        let renamed = tree.rename_assets("old", "new").unwrap();
        assert_eq!(renamed, vec![Category::Sound, Category::Deck]);

        let status = tree.asset_status("new");
        assert_eq!(status, AssetStatus { deck: true, image: false, sound: true });
        assert_eq!(tree.asset_status("old"), AssetStatus::default());
        assert!(matches!(
            tree.existing_asset(Category::Image, "new"),
            Err(Error::AssetNotFound(_))
        ));
    }

    #[test]
    fn test_rename_assets_rolls_back_on_failure() {
        let tree = StagingTree::create().unwrap();
        fs::write(tree.asset_path(Category::Image, "old"), b"png").unwrap();
        fs::write(tree.asset_path(Category::Sound, "old"), b"snd").unwrap();
        fs::write(tree.asset_path(Category::Deck, "old"), b"{}").unwrap();
        // A non-empty directory in the way makes the deck rename fail
        let blocker = tree.asset_path(Category::Deck, "new");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let err = tree.rename_assets("old", "new").unwrap_err();
        assert!(matches!(err, Error::PackWrite { .. }));
        assert_eq!(tree.asset_status("old"), AssetStatus { deck: true, image: true, sound: true });
        assert!(!tree.asset_status("new").image);
        assert!(!tree.asset_status("new").sound);
    }

    #[test]
    fn test_path_like_ids_are_refused() {
        let parent = tempfile::tempdir().unwrap();
        let tree = StagingTree::create_in(parent.path()).unwrap();
        let outside = parent.path().join("victim.json");
        fs::write(&outside, b"{}").unwrap();

        let escaping = "../../victim";
        assert!(matches!(tree.remove_assets(escaping), Err(Error::InvalidDeckId(_))));
        assert!(matches!(tree.rename_assets(escaping, "moved"), Err(Error::InvalidDeckId(_))));
        assert!(matches!(tree.rename_assets("d1", "../moved"), Err(Error::InvalidDeckId(_))));
        assert!(outside.is_file());
    }

    #[test]
    fn test_export_to_copies_everything() {
        let tree = StagingTree::create().unwrap();
        fs::write(tree.manifest_path(), b"{}").unwrap();
        fs::write(tree.asset_path(Category::Image, "d1"), b"png").unwrap();

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("pack");
        tree.export_to(&dest).unwrap();
        assert!(dest.join("info.json").is_file());
        assert_eq!(fs::read(dest.join("image/d1.png")).unwrap(), b"png".to_vec());
        assert!(dest.join("sound").is_dir());
    }
}
