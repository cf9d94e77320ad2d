//! Fixed GCP container layout
//!
//! A `.gcp` file is a ZIP archive with four top-level entries:
//!
//! | entry        | contents                                   |
//! |--------------|--------------------------------------------|
//! | `info.json`  | pack manifest                              |
//! | `deck.gcdp`  | ZIP of `<id>.gcd` files (shifted JSON)     |
//! | `image.gcip` | ZIP of `<id>.gci` files (PNG bytes)        |
//! | `sound.gcsp` | ZIP of `<id>.gcs` files (M4A bytes)        |
//!
//! Once unpacked, each category lives in its own directory with the real
//! file extension.

/// Name of the manifest entry at the archive root
pub const MANIFEST_NAME: &str = "info.json";

/// Asset categories stored in a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Deck JSON files
    Deck,
    /// Deck cover images
    Image,
    /// Deck audio clips
    Sound,
}

impl Category {
    /// All categories in archive order
    pub const ALL: [Category; 3] = [Category::Deck, Category::Image, Category::Sound];

    /// Directory name inside the staging tree
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Deck => "deck",
            Category::Image => "image",
            Category::Sound => "sound",
        }
    }

    /// Extension of the unpacked file (without dot)
    pub fn real_ext(self) -> &'static str {
        match self {
            Category::Deck => "json",
            Category::Image => "png",
            Category::Sound => "m4a",
        }
    }

    /// Extension used inside the sub-archive (without dot)
    pub fn packed_ext(self) -> &'static str {
        match self {
            Category::Deck => "gcd",
            Category::Image => "gci",
            Category::Sound => "gcs",
        }
    }

    /// Entry name of the sub-archive at the pack root
    pub fn subpack_name(self) -> &'static str {
        match self {
            Category::Deck => "deck.gcdp",
            Category::Image => "image.gcip",
            Category::Sound => "sound.gcsp",
        }
    }

    /// Whether payloads of this category go through the byte transform
    pub fn is_shifted(self) -> bool {
        matches!(self, Category::Deck)
    }

    /// File name of the asset for a deck id, e.g. `d1.png`
    pub fn file_name(self, deck_id: &str) -> String {
        format!("{}.{}", deck_id, self.real_ext())
    }

    /// Look up the category whose packed extension is `ext`
    pub fn from_packed_ext(ext: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.packed_ext() == ext)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Top-level entry names of a finished archive, in write order
pub fn archive_entries() -> [&'static str; 4] {
    [
        MANIFEST_NAME,
        Category::Deck.subpack_name(),
        Category::Image.subpack_name(),
        Category::Sound.subpack_name(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_extensions() {
        assert_eq!(Category::Deck.file_name("d1"), "d1.json");
        assert_eq!(Category::Image.packed_ext(), "gci");
        assert_eq!(Category::Sound.subpack_name(), "sound.gcsp");
        assert_eq!(Category::from_packed_ext("gcd"), Some(Category::Deck));
        assert_eq!(Category::from_packed_ext("json"), None);
    }

    #[test]
    fn test_only_decks_are_shifted() {
        assert!(Category::Deck.is_shifted());
        assert!(!Category::Image.is_shifted());
        assert!(!Category::Sound.is_shifted());
    }

    #[test]
    fn test_archive_entries() {
        assert_eq!(
            archive_entries(),
            ["info.json", "deck.gcdp", "image.gcip", "sound.gcsp"]
        );
    }
}
