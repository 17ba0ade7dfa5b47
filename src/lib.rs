//! # Awful Vectors (library root)
//!
//! An in-process store for fixed-dimension `f32` embeddings with brute-force cosine
//! similarity search. There is no index structure, no persistence and no network
//! surface: vectors live in memory for the lifetime of the [`VectorStore`], and every
//! query scores every occupied slot.
//!
//! - Slot storage with stable indices, tombstones and compaction (`slots`).
//! - The thread-safe store and its lifecycle operations (`vector_store`).
//! - Cosine similarity (`similarity`) and ranking with optional parallel scoring (`search`).
//! - Raw vector file loading (`loader`) and the embedding collaborator (`embeddings`).
//! - CLI parsing, configuration and report printing (`commands`, `config`, `pretty`).
//!
//! ## Quick start
//! ```rust
//! use awful_vectors::{Parallelism, VectorStore};
//!
//! # fn main() -> Result<(), awful_vectors::StoreError> {
//! let store = VectorStore::new(3)?;
//! let a = store.append(&[1.0, 0.0, 0.0], false)?;
//! let b = store.append(&[0.0, 1.0, 0.0], false)?;
//! store.delete(a)?;
//!
//! let hits = store.search(&[0.0, 1.0, 0.0], 5, true, Parallelism::Auto)?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id, b);
//!
//! store.compact();
//! assert_eq!(store.count(), 1);
//! # Ok(()) }
//! ```
//!
//! ## Cargo features
//! - `embeddings`: enables `embeddings::SentenceEmbeddingsModel`, a Candle-backed
//!   BERT sentence embedder, and the `avs embed` subcommand.

use directories::ProjectDirs;
use std::error::Error;

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod loader;
pub mod pretty;
pub mod search;
pub mod similarity;
pub mod slots;
pub mod vector_store;

pub use error::StoreError;
pub use search::{Parallelism, SearchResult};
pub use vector_store::VectorStore;

/// Return the per-platform configuration directory used by Awful Vectors.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "awful-sec", "avs")`, so you get the right place on each OS
/// (e.g., `~/Library/Application Support/com.awful-sec.avs` on macOS).
///
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "awful-sec", "avs")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
