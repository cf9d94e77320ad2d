//! gcp - A tool for inspecting and editing .gcp trivia card packs
//!
//! Usage:
//!   gcp info <pack>                          - Show pack metadata and decks
//!   gcp list <pack> [filter]                 - List archive entries
//!   gcp unpack <pack> [-o dir]               - Unpack into a plain directory tree
//!   gcp pack <output> <dir>                  - Create a pack from a directory
//!   gcp add-deck <pack> <id> <name> <color>  - Add a deck
//!   gcp rename-deck <pack> <old> <new>       - Change a deck id
//!   gcp remove-deck <pack> <id>              - Remove a deck
//!   gcp set-info <pack> [--id] [--name]      - Change pack id or name
//!   gcp add-card <pack> <deck> <answer> ...  - Append a card to a deck
//!   gcp catalog <catalog.json>               - List a downloaded pack catalog

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use gcpstudio::gcp_utils::{
    add_card, add_deck, list_catalog, list_pack, pack_directory, remove_deck, rename_deck,
    replace_asset, set_pack_info, show_info, unpack_pack,
};
use gcpstudio::{Category, CompressionMethod, GcpWriteOptions, NewDeck};

#[derive(Parser)]
#[command(name = "gcp")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and edit .gcp trivia card packs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Compression used when writing a pack
    #[arg(short, long, global = true, value_enum, default_value = "store")]
    compression: Compression,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Compression {
    Store,
    Deflate,
}

impl From<Compression> for CompressionMethod {
    fn from(c: Compression) -> Self {
        match c {
            Compression::Store => CompressionMethod::Store,
            Compression::Deflate => CompressionMethod::Deflate,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show pack metadata and decks
    Info {
        /// Path to the .gcp file
        gcp_file: PathBuf,
    },
    /// List entries of the pack and its sub-archives
    List {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Filter pattern (e.g., *.gcd, image.gcip/*)
        filter: Option<String>,
    },
    /// Unpack a pack into a directory
    Unpack {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Create a pack from a directory holding info.json, deck/, image/ and sound/
    Pack {
        /// Output .gcp file path
        output: PathBuf,
        /// Source directory
        source_dir: PathBuf,
    },
    /// Add a deck with an empty card list
    AddDeck {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Deck id
        id: String,
        /// Display name
        name: String,
        /// Color string (e.g., #ff0000)
        color: String,
        /// Cover image (PNG or JPEG)
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Audio clip
        #[arg(short, long)]
        sound: Option<PathBuf>,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Change a deck id and rename its assets
    RenameDeck {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Current deck id
        old_id: String,
        /// New deck id
        new_id: String,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove a deck and its assets
    RemoveDeck {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Deck id
        id: String,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Change the pack id or display name
    SetInfo {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// New pack id
        #[arg(long)]
        id: Option<String>,
        /// New pack name
        #[arg(long)]
        name: Option<String>,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Append a card to a deck
    AddCard {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Deck id
        deck_id: String,
        /// Card answer
        answer: String,
        /// Hints, from hardest to easiest
        #[arg(num_args = 0..)]
        hints: Vec<String>,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the cover image of a deck
    ReplaceImage {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Deck id
        deck_id: String,
        /// New image (PNG or JPEG)
        image: PathBuf,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the audio clip of a deck
    ReplaceSound {
        /// Path to the .gcp file
        gcp_file: PathBuf,
        /// Deck id
        deck_id: String,
        /// New audio clip
        sound: PathBuf,
        /// Write to this file instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List a downloaded pack catalog
    Catalog {
        /// Path to the catalog JSON document
        catalog_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let options = GcpWriteOptions {
        compression: cli.compression.into(),
        ..Default::default()
    };

    match cli.command {
        Some(Commands::Info { gcp_file }) => {
            show_info(&gcp_file)?;
        }
        Some(Commands::List { gcp_file, filter }) => {
            list_pack(&gcp_file, filter.as_deref())?;
        }
        Some(Commands::Unpack { gcp_file, output }) => {
            unpack_pack(&gcp_file, &output)?;
        }
        Some(Commands::Pack { output, source_dir }) => {
            pack_directory(&source_dir, &output, options.compression)?;
        }
        Some(Commands::AddDeck {
            gcp_file,
            id,
            name,
            color,
            image,
            sound,
            output,
        }) => {
            let mut deck = NewDeck::new(id, name, color);
            if let Some(image) = image {
                deck = deck.with_image(image);
            }
            if let Some(sound) = sound {
                deck = deck.with_sound(sound);
            }
            add_deck(&gcp_file, deck, output.as_deref(), options)?;
        }
        Some(Commands::RenameDeck {
            gcp_file,
            old_id,
            new_id,
            output,
        }) => {
            rename_deck(&gcp_file, &old_id, &new_id, output.as_deref(), options)?;
        }
        Some(Commands::RemoveDeck {
            gcp_file,
            id,
            output,
        }) => {
            remove_deck(&gcp_file, &id, output.as_deref(), options)?;
        }
        Some(Commands::SetInfo {
            gcp_file,
            id,
            name,
            output,
        }) => {
            set_pack_info(
                &gcp_file,
                id.as_deref(),
                name.as_deref(),
                output.as_deref(),
                options,
            )?;
        }
        Some(Commands::AddCard {
            gcp_file,
            deck_id,
            answer,
            hints,
            output,
        }) => {
            add_card(&gcp_file, &deck_id, &answer, &hints, output.as_deref(), options)?;
        }
        Some(Commands::ReplaceImage {
            gcp_file,
            deck_id,
            image,
            output,
        }) => {
            replace_asset(
                &gcp_file,
                &deck_id,
                Category::Image,
                &image,
                output.as_deref(),
                options,
            )?;
        }
        Some(Commands::ReplaceSound {
            gcp_file,
            deck_id,
            sound,
            output,
        }) => {
            replace_asset(
                &gcp_file,
                &deck_id,
                Category::Sound,
                &sound,
                output.as_deref(),
                options,
            )?;
        }
        Some(Commands::Catalog { catalog_file }) => {
            list_catalog(&catalog_file)?;
        }
        None => {
            eprintln!("Usage: gcp info <pack>");
            eprintln!("       gcp list <pack> [filter]");
            eprintln!("       gcp unpack <pack> [-o output]");
            eprintln!("       gcp pack <output> <dir> [-c compression]");
            eprintln!("       gcp add-deck <pack> <id> <name> <color> [-i image] [-s sound]");
            eprintln!("       gcp rename-deck <pack> <old_id> <new_id>");
            eprintln!("       gcp remove-deck <pack> <id>");
            eprintln!("       gcp set-info <pack> [--id id] [--name name]");
            eprintln!("       gcp add-card <pack> <deck_id> <answer> [hints...]");
            eprintln!("       gcp replace-image <pack> <deck_id> <image>");
            eprintln!("       gcp replace-sound <pack> <deck_id> <sound>");
            eprintln!("       gcp catalog <catalog.json>");
            std::process::exit(1);
        }
    }

    Ok(())
}
