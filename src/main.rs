//! Main module for the Awful Vectors CLI application (avs).
//!
//! This module provides the main function and the handlers behind each subcommand.
//! It handles command parsing, configuration loading, and tracing initialization,
//! then loads vector files into a [`VectorStore`] and reports on it.
//!
//! # Examples
//!
//! Ranking a directory of embeddings against one of them:
//!
//! ```sh
//! cargo run -- search sample_data sample_data/embedding-000.dat -n 5
//! avs search sample_data sample_data/embedding-000.dat -n 5 --json
//! ```
//!
//! Initializing the application's configuration:
//!
//! ```sh
//! avs init
//! ```

use awful_vectors::commands::{Cli, Commands};
use awful_vectors::config::{self, StoreConfig};
use awful_vectors::pretty::{
    write_heading, write_note, write_results, write_similarity, write_timing,
};
use awful_vectors::similarity::cosine_similarity;
use awful_vectors::{Parallelism, SearchResult, VectorStore, config_dir, loader};

use clap::Parser;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::io::{Write, stdout};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use std::{error::Error, thread};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

/// Slots filled by `avs demo` before it starts deleting.
const DEMO_APPEND: usize = 20;

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    });
    run()
}

/// Parses the command line, resolves configuration, and executes the subcommand.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a vector file is missing or
/// malformed, or a store operation is rejected.
fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let overrides = Overrides {
        path: cli.config,
        dimension: cli.dimension,
        threads: cli.threads,
    };

    match cli.command {
        Commands::Init => init(overrides.path),
        Commands::Demo { data_dir } => demo(&overrides.resolve()?, &data_dir),
        Commands::Search {
            data_dir,
            query,
            top,
            least,
            json,
        } => {
            let config = overrides.resolve()?;
            let n = top.unwrap_or(config.top_n);
            search(&config, &data_dir, &query, n, !least, json)
        }
        Commands::Similarity { a, b } => similarity(&overrides.resolve()?, &a, &b),
        Commands::Bench {
            data_dir,
            iterations,
        } => bench(&overrides.resolve()?, &data_dir, iterations),
        #[cfg(feature = "embeddings")]
        Commands::Embed { text, out } => embed(&overrides.resolve()?, &text, &out),
    }
}

/// Global flags that shape the resolved [`StoreConfig`].
struct Overrides {
    path: Option<PathBuf>,
    dimension: Option<usize>,
    threads: Option<usize>,
}

impl Overrides {
    /// Resolves the config file and applies the command-line overrides on top.
    fn resolve(&self) -> Result<StoreConfig, Box<dyn Error>> {
        let mut config = resolve_config(self.path.as_deref())?;
        if let Some(dimension) = self.dimension {
            config.dimension = dimension;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        debug!("Config resolved: {:?}", config);
        Ok(config)
    }
}

/// Loads the config from an explicit path, else from the config directory, else
/// falls back to [`StoreConfig::default`].
fn resolve_config(explicit: Option<&Path>) -> Result<StoreConfig, Box<dyn Error>> {
    if let Some(path) = explicit {
        return config::load_config(path);
    }
    let path = config_dir()?.join("config.yaml");
    if path.is_file() {
        config::load_config(&path)
    } else {
        debug!("No config at {}, using defaults", path.display());
        Ok(StoreConfig::default())
    }
}

/// Writes a default `config.yaml`.
fn init(explicit: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let path = match explicit {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };
    info!("Creating config file: {}", path.display());
    config::save_config(&StoreConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Loads `data_dir` into a fresh store, returning it with one label per slot.
fn load_store(
    config: &StoreConfig,
    data_dir: &Path,
) -> Result<(VectorStore, Vec<Vec<f32>>, Vec<String>), Box<dyn Error>> {
    let loaded = loader::load_dir(data_dir, config.dimension)?;
    if loaded.is_empty() {
        let ext = loader::VECTOR_FILE_EXTENSION;
        return Err(format!("no *.{ext} files in {}", data_dir.display()).into());
    }
    let store = VectorStore::new(config.dimension)?;
    let mut names = Vec::with_capacity(loaded.len());
    let mut vectors = Vec::with_capacity(loaded.len());
    for (path, vector) in loaded {
        store.append(&vector, false)?;
        names.push(file_label(&path));
        vectors.push(vector);
    }
    Ok((store, vectors, names))
}

/// Walks the full slot lifecycle over the first vectors of `data_dir`.
fn demo(config: &StoreConfig, data_dir: &Path) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    let loaded = loader::load_dir(data_dir, config.dimension)?;
    if loaded.is_empty() {
        return Err(format!("no vector files in {}", data_dir.display()).into());
    }
    let store = VectorStore::new(config.dimension)?;
    let n = config.top_n;

    write_heading(&mut out, &format!("Appending {} vectors", DEMO_APPEND.min(loaded.len())))?;
    let mut names = Vec::new();
    for (path, vector) in loaded.iter().take(DEMO_APPEND) {
        let id = store.append(vector, false)?;
        names.push(file_label(path));
        writeln!(out, "  {} -> id {id}", file_label(path))?;
    }
    writeln!(out, "  count after append: {}", store.count())?;

    let query = &loaded[0].1;
    let hits = store.search(query, n, true, Parallelism::Sequential)?;
    write_results(&mut out, &format!("Top-{n} Most Similar (sequential)"), &hits, &names)?;
    let hits = store.search(query, n, true, config.parallelism())?;
    let heading = format!("Top-{n} Most Similar ({:?})", config.parallelism());
    write_results(&mut out, &heading, &hits, &names)?;
    let hits = store.search(query, n, false, Parallelism::Sequential)?;
    write_results(&mut out, &format!("Top-{n} Least Similar"), &hits, &names)?;

    write_heading(&mut out, "Delete")?;
    for id in [5, 10, 15].into_iter().filter(|id| *id < store.len()) {
        store.delete(id)?;
        writeln!(out, "  deleted id {id}")?;
    }
    for id in [5, 6] {
        if let Ok(tombstoned) = store.is_tombstoned(id) {
            writeln!(out, "  id {id} tombstoned? {}", if tombstoned { "yes" } else { "no" })?;
        }
    }

    if store.len() > 3 {
        let (path, vector) = loaded.get(100).unwrap_or(&loaded[loaded.len() - 1]);
        store.replace(3, vector)?;
        names[3] = file_label(path);
        write_heading(&mut out, "Replace")?;
        writeln!(out, "  id 3 <- {}", names[3])?;
    }

    let (path, vector) = loaded.get(50).unwrap_or(&loaded[loaded.len() - 1]);
    let id = store.append(vector, config.reuse_slots)?;
    if id == names.len() {
        names.push(file_label(path));
    } else {
        names[id] = file_label(path);
    }
    write_heading(&mut out, "Append with reuse")?;
    writeln!(out, "  {} -> id {id}", file_label(path))?;

    write_heading(&mut out, "Compact")?;
    let len = store.len();
    for id in len.saturating_sub(2)..len {
        store.delete(id)?;
        writeln!(out, "  deleted trailing id {id}")?;
    }
    writeln!(out, "  count before compact: {} ({} slots)", store.count(), store.len())?;
    // compaction renumbers, so relabel survivors in slot order first
    names = names
        .into_iter()
        .enumerate()
        .filter(|(i, _)| matches!(store.is_tombstoned(*i), Ok(false)))
        .map(|(_, name)| name)
        .collect();
    let reclaimed = store.compact();
    writeln!(out, "  reclaimed {reclaimed} slots, count after compact: {}", store.count())?;

    let hits = store.search(query, n, true, config.parallelism())?;
    write_results(&mut out, &format!("Final Top-{n}"), &hits, &names)?;

    write_heading(&mut out, "Pairwise Similarity")?;
    if let Some((other_path, other)) = loaded.get(1) {
        let label = format!("sim({}, {})", file_label(&loaded[0].0), file_label(other_path));
        write_similarity(&mut out, &label, store.similarity(query, other)?)?;
    }
    let label = format!("sim({0}, {0}) (self)", file_label(&loaded[0].0));
    write_similarity(&mut out, &label, store.similarity(query, query)?)?;
    Ok(())
}

#[derive(Serialize)]
struct JsonHit<'a> {
    rank: usize,
    id: usize,
    score: f32,
    file: &'a str,
}

/// Ranks every vector in `data_dir` against the vector in `query_path`.
fn search(
    config: &StoreConfig,
    data_dir: &Path,
    query_path: &Path,
    n: usize,
    most_similar: bool,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let (store, _, names) = load_store(config, data_dir)?;
    let query = loader::load_vector(query_path, config.dimension)?;
    let hits: Vec<SearchResult> = store.search(&query, n, most_similar, config.parallelism())?;

    let mut out = stdout();
    if json {
        let body: Vec<JsonHit> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| JsonHit {
                rank: i + 1,
                id: hit.id,
                score: hit.score,
                file: names[hit.id].as_str(),
            })
            .collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    } else {
        let direction = if most_similar { "Most" } else { "Least" };
        let title = format!("Top-{n} {direction} Similar to {}", file_label(query_path));
        write_results(&mut out, &title, &hits, &names)?;
    }
    Ok(())
}

/// Cosine similarity between two vector files.
fn similarity(config: &StoreConfig, a: &Path, b: &Path) -> Result<(), Box<dyn Error>> {
    let va = loader::load_vector(a, config.dimension)?;
    let vb = loader::load_vector(b, config.dimension)?;
    let label = format!("sim({}, {})", file_label(a), file_label(b));
    write_similarity(&mut stdout(), &label, cosine_similarity(&va, &vb))
}

/// Times `iterations` searches per parallelism mode and checks the rankings agree.
fn bench(config: &StoreConfig, data_dir: &Path, iterations: usize) -> Result<(), Box<dyn Error>> {
    let (store, vectors, _) = load_store(config, data_dir)?;
    let mut out = stdout();

    let dedicated = if config.threads > 1 {
        config.threads
    } else {
        thread::available_parallelism().map_or(2, NonZeroUsize::get)
    };
    let modes = [
        ("sequential", Parallelism::Sequential),
        ("auto", Parallelism::Auto),
        (
            "dedicated",
            Parallelism::Threads(NonZeroUsize::new(dedicated).unwrap_or(NonZeroUsize::MIN)),
        ),
    ];

    write_heading(
        &mut out,
        &format!("{} searches over {} vectors (top {})", iterations, store.count(), config.top_n),
    )?;

    let mut all_rankings = Vec::with_capacity(modes.len());
    for (label, parallelism) in modes {
        let mut rankings = Vec::with_capacity(iterations);
        let mut total = Duration::ZERO;
        for i in 0..iterations {
            let query = &vectors[i % vectors.len()];
            let started = Instant::now();
            let hits = store.search(query, config.top_n, true, parallelism)?;
            total += started.elapsed();
            rankings.push(hits);
        }
        write_timing(&mut out, label, total, iterations)?;
        all_rankings.push((label, rankings));
    }

    let (_, expected) = &all_rankings[0];
    for (label, rankings) in &all_rankings[1..] {
        if rankings != expected {
            warn!("{label} ranking differs from sequential ranking");
            write_note(&mut out, &format!("  {label}: ranking differs from sequential"))?;
        }
    }
    Ok(())
}

/// Embeds `text` and writes the vector to `out_path`.
#[cfg(feature = "embeddings")]
fn embed(config: &StoreConfig, text: &str, out_path: &Path) -> Result<(), Box<dyn Error>> {
    use awful_vectors::embeddings::{Embedder, SentenceEmbeddingsModel};

    let model = SentenceEmbeddingsModel::load(&config.embedding_model)?;
    let vector = model.embed(text)?;
    if vector.len() != config.dimension {
        warn!(
            "{} produces {} dimensions, config expects {}",
            config.embedding_model,
            vector.len(),
            config.dimension
        );
    }
    loader::write_vector(out_path, &vector)?;
    println!("Wrote {} ({} dimensions)", out_path.display(), vector.len());
    Ok(())
}
