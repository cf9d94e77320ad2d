//! Pack metadata and deck content
//!
//! `info.json` stores each deck summary wrapped in a single-key object whose
//! key is the deck color:
//!
//! ```json
//! { "id": "p1", "name": "Pack One",
//!   "cards": [ { "#ff0000": { "id": "d1", "name": "Deck One", "color": "#ff0000" } } ] }
//! ```
//!
//! The wrapping only exists on disk. In memory a [`PackManifest`] holds a
//! plain ordered list of [`DeckRef`].

use std::fs;
use std::io;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::{Category, MANIFEST_NAME};

/// Pack manifest stored as `info.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Deck summaries in display and save order
    #[serde(default, rename = "cards", with = "wrapped_decks")]
    pub decks: Vec<DeckRef>,
    /// Keys this editor does not know about, written back unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Deck summary inside the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRef {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Full deck stored as `deck/<id>.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckContent {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// A single card: the answer and its hints in reveal order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub answer: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

/// Number of hint slots the editor offers for a new card
pub const DEFAULT_HINT_COUNT: usize = 3;

impl Card {
    pub fn new(answer: impl Into<String>, hints: Vec<String>) -> Self {
        Self {
            answer: answer.into(),
            hints,
        }
    }

    /// An empty card with the default number of empty hints
    pub fn blank() -> Self {
        Self {
            answer: String::new(),
            hints: vec![String::new(); DEFAULT_HINT_COUNT],
        }
    }
}

/// Whether `id` can name deck files: a single plain path component
///
/// Ids end up as file stems inside the category directories, so separators,
/// `.`/`..` and absolute paths are refused.
pub fn is_valid_deck_id(id: &str) -> bool {
    if id.trim().is_empty() || id.contains(|c: char| c == '/' || c == '\\') {
        return false;
    }
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl DeckRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }

    /// Check that id, name and color are all set
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::missing_field("deck.id"));
        }
        if !is_valid_deck_id(&self.id) {
            return Err(Error::InvalidDeckId(self.id.clone()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::missing_field(format!("deck[{}].name", self.id)));
        }
        if self.color.trim().is_empty() {
            return Err(Error::missing_field(format!("deck[{}].color", self.id)));
        }
        Ok(())
    }
}

impl DeckContent {
    /// An empty deck
    pub fn empty(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            cards: Vec::new(),
        }
    }

    /// Copy name and color from the manifest entry
    pub fn sync_with(&mut self, deck: &DeckRef) -> bool {
        let changed = self.name != deck.name || self.color != deck.color;
        self.name.clone_from(&deck.name);
        self.color.clone_from(&deck.color);
        changed
    }
}

impl PackManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a deck summary by id
    pub fn deck(&self, id: &str) -> Option<&DeckRef> {
        self.decks.iter().find(|d| d.id == id)
    }

    /// Get a mutable deck summary by id
    pub fn deck_mut(&mut self, id: &str) -> Option<&mut DeckRef> {
        self.decks.iter_mut().find(|d| d.id == id)
    }

    /// Check whether a deck id is already used
    pub fn contains(&self, id: &str) -> bool {
        self.decks.iter().any(|d| d.id == id)
    }

    /// Deck ids in manifest order
    pub fn deck_ids(&self) -> impl Iterator<Item = &str> {
        self.decks.iter().map(|d| d.id.as_str())
    }

    /// Append a deck at the end
    ///
    /// Fails with [`Error::DuplicateDeckId`] if the id is taken.
    pub fn push_deck(&mut self, deck: DeckRef) -> Result<()> {
        deck.validate()?;
        if self.contains(&deck.id) {
            return Err(Error::DuplicateDeckId(deck.id));
        }
        self.decks.push(deck);
        Ok(())
    }

    /// Remove a deck, keeping the order of the others
    pub fn remove_deck(&mut self, id: &str) -> Option<DeckRef> {
        let pos = self.decks.iter().position(|d| d.id == id)?;
        Some(self.decks.remove(pos))
    }

    /// Check pack fields and every deck summary
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::missing_field("pack.id"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("pack.name"));
        }
        let mut seen = std::collections::HashSet::new();
        for deck in &self.decks {
            deck.validate()?;
            if !seen.insert(deck.id.as_str()) {
                return Err(Error::DuplicateDeckId(deck.id.clone()));
            }
        }
        Ok(())
    }
}

/// On-disk shape of the manifest deck list: `[{ "<color>": DeckRef }, ...]`
mod wrapped_decks {
    use super::{is_valid_deck_id, DeckRef};
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    struct Wrapped<'a>(&'a DeckRef);

    impl Serialize for Wrapped<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(&self.0.color, self.0)?;
            map.end()
        }
    }

    pub fn serialize<S: Serializer>(decks: &[DeckRef], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(decks.iter().map(Wrapped))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<DeckRef>, D::Error> {
        let raw: Vec<BTreeMap<String, DeckRef>> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .enumerate()
            .map(|(i, entry)| {
                if entry.len() != 1 {
                    return Err(D::Error::custom(format!(
                        "cards[{}] must hold exactly one deck, found {}",
                        i,
                        entry.len()
                    )));
                }
                let deck = entry
                    .into_values()
                    .next()
                    .ok_or_else(|| D::Error::custom(format!("cards[{}] is empty", i)))?;
                if !deck.id.trim().is_empty() && !is_valid_deck_id(&deck.id) {
                    return Err(D::Error::custom(format!(
                        "cards[{}] has deck id '{}', which is not a plain file name",
                        i, deck.id
                    )));
                }
                Ok(deck)
            })
            .collect()
    }
}

/// Pretty printer with 2-space indentation that escapes non-ASCII text
///
/// Keeps every written byte below `0x80` so deck files survive the byte
/// shift applied when packing.
struct AsciiPrettyFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl AsciiPrettyFormatter<'_> {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize a value as 2-space indented, ASCII-only JSON
pub fn to_json_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut serializer = serde_json::Serializer::with_formatter(Vec::new(), AsciiPrettyFormatter::new());
    value.serialize(&mut serializer)?;
    Ok(serializer.into_inner())
}

/// Parse manifest bytes
pub fn parse_manifest(data: &[u8], path: &Path) -> Result<PackManifest> {
    serde_json::from_slice(data).map_err(|e| Error::parse(path, e))
}

/// Read `info.json` from a staging root
pub fn load_manifest(root: &Path) -> Result<PackManifest> {
    let path = root.join(MANIFEST_NAME);
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::MissingManifest(root.to_path_buf())),
        Err(e) => return Err(Error::io(&path, e)),
    };
    let manifest = parse_manifest(&data, &path)?;
    debug!("Loaded manifest '{}' with {} deck(s)", manifest.id, manifest.decks.len());
    Ok(manifest)
}

/// Write `info.json` into a staging root
pub fn save_manifest(manifest: &PackManifest, root: &Path) -> Result<()> {
    let path = root.join(MANIFEST_NAME);
    let data = to_json_bytes(manifest).map_err(|e| Error::parse(&path, e))?;
    fs::write(&path, data).map_err(|e| Error::write(&path, e))
}

/// Read `deck/<id>.json` from a staging root
pub fn load_deck(root: &Path, deck_id: &str) -> Result<DeckContent> {
    if !is_valid_deck_id(deck_id) {
        return Err(Error::InvalidDeckId(deck_id.to_string()));
    }
    let path = root.join(Category::Deck.dir_name()).join(Category::Deck.file_name(deck_id));
    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::AssetNotFound(path)),
        Err(e) => return Err(Error::io(&path, e)),
    };
    serde_json::from_slice(&data).map_err(|e| Error::parse(&path, e))
}

/// Write `deck/<id>.json` into a staging root
pub fn save_deck(content: &DeckContent, root: &Path, deck_id: &str) -> Result<()> {
    if !is_valid_deck_id(deck_id) {
        return Err(Error::InvalidDeckId(deck_id.to_string()));
    }
    let dir = root.join(Category::Deck.dir_name());
    fs::create_dir_all(&dir).map_err(|e| Error::write(&dir, e))?;
    let path = dir.join(Category::Deck.file_name(deck_id));
    let data = to_json_bytes(content).map_err(|e| Error::parse(&path, e))?;
    fs::write(&path, data).map_err(|e| Error::write(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform;

    const INFO: &str = r##"{"id":"p1","name":"Pack One","cards":[{"#ff0000":{"id":"d1","name":"Deck One","color":"#ff0000"}},{"blue":{"id":"d2","name":"Deck Two","color":"#0000ff"}}]}"##;

    #[test]
    fn test_manifest_unwraps_decks() {
        let manifest = parse_manifest(INFO.as_bytes(), Path::new("info.json")).unwrap();
        assert_eq!(manifest.id, "p1");
        assert_eq!(
            manifest.decks,
            vec![
                DeckRef::new("d1", "Deck One", "#ff0000"),
                DeckRef::new("d2", "Deck Two", "#0000ff"),
            ]
        );
    }

    #[test]
    fn test_manifest_rewraps_with_color_key() {
        let manifest = parse_manifest(INFO.as_bytes(), Path::new("info.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&to_json_bytes(&manifest).unwrap()).unwrap();
        assert_eq!(value["cards"][0]["#ff0000"]["id"], "d1");
        // The original wrapper key is not kept, the color is used instead
        assert_eq!(value["cards"][1]["#0000ff"]["name"], "Deck Two");
        assert!(value["cards"][1].get("blue").is_none());
    }

    #[test]
    fn test_manifest_rejects_multi_key_entry() {
        let bad = r#"{"id":"p","name":"n","cards":[{"a":{"id":"x","name":"x","color":"a"},"b":{"id":"y","name":"y","color":"b"}}]}"#;
        let err = parse_manifest(bad.as_bytes(), Path::new("info.json")).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }

    #[test]
    fn test_deck_id_must_be_plain_file_name() {
        for good in ["d1", "deck one", "v1.2", "..a"] {
            assert!(is_valid_deck_id(good), "{good}");
        }
        for bad in ["", " ", ".", "..", "../x", "a/b", "a\\b", "/abs", "../../escaped"] {
            assert!(!is_valid_deck_id(bad), "{bad}");
        }

        let err = DeckRef::new("../up", "Up", "#111").validate().unwrap_err();
        assert!(matches!(err, Error::InvalidDeckId(id) if id == "../up"));
    }

    #[test]
    fn test_manifest_rejects_path_like_deck_id() {
        let bad = r##"{"id":"p","name":"n","cards":[{"#fff":{"id":"../../../victim","name":"v","color":"#fff"}}]}"##;
        let err = parse_manifest(bad.as_bytes(), Path::new("info.json")).unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }

    #[test]
    fn test_deck_files_refuse_path_like_ids() {
        let root = tempfile::tempdir().unwrap();
        let err = save_deck(&DeckContent::empty("a", "#fff"), root.path(), "../a").unwrap_err();
        assert!(matches!(err, Error::InvalidDeckId(_)));
        assert!(!root.path().join("a.json").exists());
        assert!(matches!(load_deck(root.path(), "../a"), Err(Error::InvalidDeckId(_))));
    }

    #[test]
    fn test_manifest_keeps_unknown_keys() {
        let data = r#"{"id":"p","name":"n","version":3,"cards":[]}"#;
        let manifest = parse_manifest(data.as_bytes(), Path::new("info.json")).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&to_json_bytes(&manifest).unwrap()).unwrap();
        assert_eq!(value["version"], 3);
    }

    #[test]
    fn test_json_output_is_indented_ascii() {
        let deck = DeckContent {
            name: "Caf\u{e9} \u{1F600}".to_string(),
            color: "#fff".to_string(),
            cards: vec![Card::new("a", vec!["h".into()])],
        };
        let bytes = to_json_bytes(&deck).unwrap();
        assert!(transform::is_shift_safe(&bytes));

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("Caf\\u00e9 \\ud83d\\ude00"));
        assert!(text.starts_with("{\n  \"name\""));

        let back: DeckContent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, deck);
    }

    #[test]
    fn test_push_deck_rejects_duplicates_and_blanks() {
        let mut manifest = PackManifest::new("p", "Pack");
        manifest.push_deck(DeckRef::new("d1", "One", "#111")).unwrap();

        let err = manifest.push_deck(DeckRef::new("d1", "Other", "#222")).unwrap_err();
        assert!(matches!(err, Error::DuplicateDeckId(id) if id == "d1"));

        let err = manifest.push_deck(DeckRef::new("d2", "", "#222")).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredField { .. }));

        assert_eq!(manifest.decks.len(), 1);
    }

    #[test]
    fn test_remove_deck_keeps_order() {
        let mut manifest = PackManifest::new("p", "Pack");
        for id in ["a", "b", "c"] {
            manifest.push_deck(DeckRef::new(id, id, "#000")).unwrap();
        }
        assert!(manifest.remove_deck("b").is_some());
        assert!(manifest.remove_deck("zz").is_none());
        assert_eq!(manifest.deck_ids().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_load_and_save_in_staging_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(load_manifest(root.path()), Err(Error::MissingManifest(_))));

        let mut manifest = PackManifest::new("p1", "Pack One");
        manifest.push_deck(DeckRef::new("d1", "Deck One", "#ff0000")).unwrap();
        save_manifest(&manifest, root.path()).unwrap();
        assert_eq!(load_manifest(root.path()).unwrap(), manifest);

        let mut deck = DeckContent::empty("Deck One", "#ff0000");
        deck.cards.push(Card::blank());
        save_deck(&deck, root.path(), "d1").unwrap();
        assert_eq!(load_deck(root.path(), "d1").unwrap(), deck);
        assert_eq!(deck.cards[0].hints.len(), DEFAULT_HINT_COUNT);

        assert!(matches!(load_deck(root.path(), "missing"), Err(Error::AssetNotFound(_))));
    }

    #[test]
    fn test_sync_with_manifest_entry() {
        let mut deck = DeckContent::empty("Old", "#000");
        assert!(deck.sync_with(&DeckRef::new("d", "New", "#fff")));
        assert_eq!(deck.name, "New");
        assert!(!deck.sync_with(&DeckRef::new("d", "New", "#fff")));
    }
}
