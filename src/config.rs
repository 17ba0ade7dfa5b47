//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `StoreConfig` struct, which holds the knobs used when the CLI builds a
//! [`VectorStore`](crate::vector_store::VectorStore) and runs searches, and a
//! `load_config` function to load the configuration from a YAML file.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use awful_vectors::config::{StoreConfig, load_config};
//!
//! let config_file_path = "/path/to/config.yaml";
//! let config: StoreConfig = load_config(config_file_path).unwrap();
//! println!("{:?}", config);
//! ```
//!
//! A complete file:
//!
//! ```yaml
//! dimension: 1024
//! reuse_slots: true
//! threads: 0        # 0 = auto, 1 = sequential, n = dedicated pool of n workers
//! top_n: 5
//! embedding_model: "sentence-transformers/all-MiniLM-L6-v2"
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

use tracing::debug;

use crate::search::Parallelism;

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StoreConfig {
    /// Length of every vector in the store.
    pub dimension: usize,

    /// Whether appends fill tombstoned slots before growing the store.
    #[serde(default = "default_reuse_slots")]
    pub reuse_slots: bool,

    // Scoring threads: 0 = auto, 1 = sequential, n = dedicated pool.
    #[serde(default)]
    pub threads: usize,

    // Default number of results per search.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    // Hugging Face model id used by `avs embed`.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_reuse_slots() -> bool {
    true
}

fn default_top_n() -> usize {
    5
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: 1024,
            reuse_slots: default_reuse_slots(),
            threads: 0,
            top_n: default_top_n(),
            embedding_model: default_embedding_model(),
        }
    }
}

impl StoreConfig {
    /// Search parallelism derived from `threads`.
    pub fn parallelism(&self) -> Parallelism {
        Parallelism::from_thread_count(self.threads)
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Parameters
///
/// - `file`: The path to the YAML configuration file.
///
/// # Returns
///
/// - `Ok(StoreConfig)`: The loaded configuration.
/// - `Err(Box<dyn Error>)`: An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: impl AsRef<Path>) -> Result<StoreConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: StoreConfig = serde_yaml::from_str(&content)?;
    if config.dimension == 0 {
        return Err("config: dimension must be greater than zero".into());
    }
    Ok(config)
}

/// Writes `config` as YAML to `file`, creating parent directories as needed.
pub fn save_config(config: &StoreConfig, file: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    let file = file.as_ref();
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, serde_yaml::to_string(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
dimension: 384
reuse_slots: false
threads: 4
top_n: 10
embedding_model: "example_model"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path());

        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.dimension, 384);
        assert!(!config.reuse_slots);
        assert_eq!(config.threads, 4);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.embedding_model, "example_model");
        assert_eq!(config.parallelism(), Parallelism::from_thread_count(4));
    }

    #[test]
    fn test_load_config_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "dimension: 2").unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(
            config,
            StoreConfig {
                dimension: 2,
                ..StoreConfig::default()
            }
        );
        assert_eq!(config.parallelism(), Parallelism::Auto);
    }

    #[test]
    fn test_load_config_invalid_file() {
        let config = load_config("non/existent/path");
        assert!(config.is_err());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: config: format"#).unwrap();

        let config = load_config(temp_file.path());
        assert!(config.is_err());
    }

    #[test]
    fn test_load_config_zero_dimension() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "dimension: 0").unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.yaml");
        let config = StoreConfig {
            dimension: 8,
            threads: 1,
            ..StoreConfig::default()
        };
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }
}
