//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! Parsing command-line arguments:
//!
//! ```no_run
//! use clap::Parser;
//! use awful_vectors::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Commands::Search { query, .. } => println!("query file: {}", query.display()),
//!     _ => {}
//! }
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    /// Path to a YAML config file. Defaults to `config.yaml` under the config directory.
    #[arg(short = 'c', long, global = true, env = "AVS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured vector dimension.
    #[arg(short = 'd', long, global = true)]
    pub dimension: Option<usize>,

    /// Override the configured scoring thread count (0 = auto, 1 = sequential).
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default `config.yaml` to the config directory.
    Init,

    /// Walk a directory of vector files through append, search, delete, replace,
    /// slot reuse and compaction, printing each step.
    #[clap(name = "demo", alias = "d")]
    Demo {
        /// Directory holding `*.dat` vector files.
        data_dir: PathBuf,
    },

    /// Load a directory of vector files and rank them against a query file.
    #[clap(name = "search", alias = "s")]
    Search {
        /// Directory holding `*.dat` vector files.
        data_dir: PathBuf,

        /// Vector file used as the query.
        query: PathBuf,

        /// Number of results (defaults to `top_n` from the config).
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Rank least similar first.
        #[arg(short = 'l', long)]
        least: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Cosine similarity between two vector files.
    #[clap(name = "similarity", alias = "sim")]
    Similarity { a: PathBuf, b: PathBuf },

    /// Time repeated searches over a directory of vector files.
    #[clap(name = "bench", alias = "b")]
    Bench {
        /// Directory holding `*.dat` vector files.
        data_dir: PathBuf,

        /// Searches per parallelism mode.
        #[arg(short = 'i', long, default_value_t = 100)]
        iterations: usize,
    },

    /// Embed text and write it as a vector file.
    #[cfg(feature = "embeddings")]
    #[clap(name = "embed", alias = "e")]
    Embed {
        /// Text to embed.
        text: String,

        /// Output vector file.
        #[arg(short = 'o', long)]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "avs", "-d", "2", "search", "data", "q.dat", "-n", "3", "--least",
        ])
        .unwrap();
        assert_eq!(cli.dimension, Some(2));
        match cli.command {
            Commands::Search {
                data_dir,
                query,
                top,
                least,
                json,
            } => {
                assert_eq!(data_dir, PathBuf::from("data"));
                assert_eq!(query, PathBuf::from("q.dat"));
                assert_eq!(top, Some(3));
                assert!(least);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_alias_and_global_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["avs", "sim", "a.dat", "b.dat", "-j", "4"]).unwrap();
        assert_eq!(cli.threads, Some(4));
        assert!(matches!(cli.command, Commands::Similarity { .. }));
    }

    #[test]
    fn test_bench_default_iterations() {
        let cli = Cli::try_parse_from(["avs", "bench", "data"]).unwrap();
        assert!(matches!(cli.command, Commands::Bench { iterations: 100, .. }));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["avs"]).is_err());
    }
}
