//! # gcpstudio
//!
//! A Rust library for reading, editing and repacking `.gcp` trivia card packs.
//!
//! ## Overview
//!
//! A `.gcp` pack is a ZIP archive holding a pack manifest (`info.json`) and
//! three nested ZIP archives with one file per deck: the deck's cards as
//! bit-shifted JSON, a PNG cover image and an M4A audio clip. This library
//! provides:
//!
//! - Decoding a pack into an editable staging tree
//! - Encoding a staging tree back into a pack, replacing the target atomically
//! - The manifest and deck data model
//! - An editing [`Session`] with add/rename/remove deck operations
//! - The deck byte transform
//!
//! ## Example - Reading
//!
//! ```rust,no_run
//! use gcpstudio::GcpFile;
//!
//! fn main() -> gcpstudio::Result<()> {
//!     let mut gcp = GcpFile::open("trivia.gcp")?;
//!
//!     for name in gcp.entry_names() {
//!         println!("{}", name);
//!     }
//!
//!     let manifest = gcp.manifest()?;
//!     println!("{} decks", manifest.decks.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Editing
//!
//! ```rust,no_run
//! use gcpstudio::{Card, NewDeck, Session};
//!
//! fn main() -> gcpstudio::Result<()> {
//!     let mut session = Session::new();
//!     session.open("trivia.gcp")?;
//!
//!     session.add_deck(NewDeck::new("science", "Science", "#00aa55").with_image("science.jpg"))?;
//!
//!     let mut deck = session.load_deck("science")?;
//!     deck.cards.push(Card::new("Mercury", vec!["Planet".into(), "Smallest".into(), "Closest".into()]));
//!     session.update_deck("science", deck)?;
//!
//!     session.save_as("trivia_edited.gcp")?;
//!     session.close()
//! }
//! ```

pub mod assets;
pub mod catalog;
pub mod error;
pub mod gcp;
pub mod gcp_utils;
pub mod gcp_writer;
pub mod layout;
pub mod model;
pub mod session;
pub mod staging;
pub mod subpack;
pub mod transform;
pub mod utils;

pub use catalog::{CatalogEntry, CatalogSource, JsonCatalog};
pub use error::{Error, Result};
pub use gcp::{decode, decode_in, CompressionMethod, DecodedPack, GcpEntry, GcpFile};
pub use gcp_writer::{encode, GcpWriteOptions, GcpWriter};
pub use layout::Category;
pub use model::{Card, DeckContent, DeckRef, PackManifest};
pub use session::{NewDeck, Session};
pub use staging::{AssetStatus, StagingTree};
pub use utils::{create_glob_matcher, format_size, matches_filter};
