//! # Pretty Printing - search reports
//!
//! Terminal rendering for the `avs` CLI: section headings, ranked search results,
//! similarity scores and benchmark timings. Colors and attributes go through
//! **Crossterm**, so every writer here works against any `impl Write` (stdout in the
//! binary, a `Vec<u8>` in tests).
//!
//! ```text
//! == Top-5 Most Similar ==
//!   Rank 1: id=0     score=1.000000  embedding-000.dat
//!   Rank 2: id=12    score=0.734120  embedding-012.dat
//! ```
//!
//! Scores are colored by sign: green for positive, red for negative, grey for zero.

use crossterm::{
    QueueableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use std::error::Error;
use std::io::Write;
use std::time::Duration;

use crate::search::SearchResult;

/// Print a bold cyan section heading.
pub fn write_heading<W: Write>(out: &mut W, title: &str) -> Result<(), Box<dyn Error>> {
    out.queue(SetForegroundColor(Color::Cyan))?;
    out.queue(SetAttribute(Attribute::Bold))?;
    writeln!(out, "\n== {title} ==")?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(SetForegroundColor(Color::Reset))?;
    Ok(())
}

/// Plain-text line for one ranked result; `name` is appended when known.
pub fn format_result(rank: usize, result: &SearchResult, name: Option<&str>) -> String {
    let line = format!("Rank {}: id={:<5} score={:.6}", rank, result.id, result.score);
    match name {
        Some(name) => format!("{line}  {name}"),
        None => line,
    }
}

/// Print a ranked result list under `title`.
///
/// `names` maps slot ids to display labels (typically the source file name); ids
/// without a label are printed bare.
pub fn write_results<W: Write>(
    out: &mut W,
    title: &str,
    results: &[SearchResult],
    names: &[String],
) -> Result<(), Box<dyn Error>> {
    write_heading(out, title)?;
    if results.is_empty() {
        out.queue(SetForegroundColor(Color::DarkGrey))?;
        writeln!(out, "  (no results)")?;
        out.queue(SetForegroundColor(Color::Reset))?;
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        let name = names.get(result.id).map(String::as_str);
        out.queue(SetForegroundColor(score_color(result.score)))?;
        writeln!(out, "  {}", format_result(i + 1, result, name))?;
    }
    out.queue(SetForegroundColor(Color::Reset))?;
    out.flush()?;
    Ok(())
}

/// Print a single labelled similarity score.
pub fn write_similarity<W: Write>(
    out: &mut W,
    label: &str,
    score: f32,
) -> Result<(), Box<dyn Error>> {
    write!(out, "  {label} = ")?;
    out.queue(SetForegroundColor(score_color(score)))?;
    writeln!(out, "{score:.6}")?;
    out.queue(SetForegroundColor(Color::Reset))?;
    out.flush()?;
    Ok(())
}

/// Print a benchmark line: total time and mean time per iteration.
pub fn write_timing<W: Write>(
    out: &mut W,
    label: &str,
    total: Duration,
    iterations: usize,
) -> Result<(), Box<dyn Error>> {
    let per_iter = total.as_secs_f64() * 1e3 / iterations.max(1) as f64;
    out.queue(SetAttribute(Attribute::Bold))?;
    write!(out, "  {label:<14}")?;
    out.queue(SetAttribute(Attribute::Reset))?;
    writeln!(
        out,
        " {:>10.3} ms total  {:>8.4} ms/search",
        total.as_secs_f64() * 1e3,
        per_iter
    )?;
    out.flush()?;
    Ok(())
}

/// Print a dim informational line.
pub fn write_note<W: Write>(out: &mut W, text: &str) -> Result<(), Box<dyn Error>> {
    out.queue(SetForegroundColor(Color::DarkGrey))?;
    writeln!(out, "{text}")?;
    out.queue(SetForegroundColor(Color::Reset))?;
    Ok(())
}

fn score_color(score: f32) -> Color {
    if score > 0.0 {
        Color::Green
    } else if score < 0.0 {
        Color::Red
    } else {
        Color::DarkGrey
    }
}
