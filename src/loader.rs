//! # Vector files
//!
//! Reading and writing raw embedding files.
//!
//! ## Format
//! One vector per file: exactly `dimension * 4` bytes holding `dimension` little-endian
//! IEEE-754 `f32` values, no header. A file of any other length is rejected with
//! [`StoreError::Format`].
//!
//! ```text
//! embedding-000.dat   [f32 LE; 1024]  (4096 bytes)
//! embedding-001.dat   [f32 LE; 1024]
//! ...
//! ```
//!
//! [`load_dir`] loads every `*.dat` file of a directory in file-name order, reading and
//! decoding in parallel on rayon's pool while an `indicatif` progress bar ticks.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::StoreError;

/// Extension of vector files picked up by [`load_dir`].
pub const VECTOR_FILE_EXTENSION: &str = "dat";

/// Decode `bytes` as `dimension` little-endian `f32` values.
///
/// `path` is only used to label a [`StoreError::Format`]. A `dimension` whose byte
/// length overflows `usize` is [`StoreError::InvalidDimension`].
pub fn decode_vector(bytes: &[u8], dimension: usize, path: &Path) -> Result<Vec<f32>, StoreError> {
    let expected = dimension
        .checked_mul(std::mem::size_of::<f32>())
        .ok_or(StoreError::InvalidDimension)?;
    if bytes.len() != expected {
        return Err(StoreError::Format {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Encode `vector` as little-endian `f32` bytes.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Read one vector file.
///
/// # Errors
/// [`StoreError::Io`] if the file cannot be read, [`StoreError::Format`] if its length
/// is not `dimension * 4` bytes.
pub fn load_vector(path: impl AsRef<Path>, dimension: usize) -> Result<Vec<f32>, StoreError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    decode_vector(&bytes, dimension, path)
}

/// Write `vector` to `path` in the vector file format.
pub fn write_vector(path: impl AsRef<Path>, vector: &[f32]) -> Result<(), StoreError> {
    fs::write(path, encode_vector(vector))?;
    Ok(())
}

/// List the `*.dat` files of `dir`, sorted by file name.
pub fn vector_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, StoreError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == VECTOR_FILE_EXTENSION))
        .collect();
    files.sort();
    Ok(files)
}

/// Load every vector file in `dir`, returning `(path, vector)` pairs in file-name order.
///
/// The first unreadable or malformed file aborts the whole load.
///
/// # Errors
/// See [`load_vector`].
pub fn load_dir(
    dir: impl AsRef<Path>,
    dimension: usize,
) -> Result<Vec<(PathBuf, Vec<f32>)>, StoreError> {
    let dir = dir.as_ref();
    let files = vector_files(dir)?;
    debug!(dir = %dir.display(), files = files.len(), "loading vector directory");

    let bar = ProgressBar::new(files.len() as u64);
    let template = "{spinner} loading vectors {pos}/{len} {wide_bar}";
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style);
    }

    let loaded = files
        .into_par_iter()
        .progress_with(bar.clone())
        .map(|path| load_vector(&path, dimension).map(|v| (path, v)))
        .collect::<Result<Vec<_>, _>>();
    bar.finish_and_clear();

    let loaded = loaded?;
    info!(dir = %dir.display(), count = loaded.len(), "loaded vectors");
    Ok(loaded)
}
