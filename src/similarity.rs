//! # Similarity
//!
//! Cosine similarity between two equal-length `f32` vectors.
//!
//! Products and sums are accumulated in `f64` so that long vectors (1024 and more
//! components) stay within `1e-5` of a double-precision reference before the result is
//! narrowed back to `f32`.
//!
//! ```rust
//! use awful_vectors::similarity::cosine_similarity;
//!
//! let a = [1.0, 0.0];
//! let b = [1.0, 1.0];
//! let sim = cosine_similarity(&a, &b);
//! assert!((sim - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
//! ```

/// Dot product of `a` and `b`, accumulated in `f64`.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Euclidean (L2) magnitude of `v`, accumulated in `f64`.
#[inline]
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}

/// Cosine similarity of `a` and `b`.
///
/// Returns `0.0` when either vector has zero magnitude; that case is a defined
/// score, not an error.
///
/// Callers are expected to pass slices of the same length. Extra trailing components
/// on the longer slice are ignored by the dot product but still count toward its norm;
/// [`VectorStore::similarity`](crate::vector_store::VectorStore::similarity) checks the
/// lengths for you.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    score_with_norm(a, l2_norm(a), b)
}

/// Cosine similarity when the norm of `query` is already known.
///
/// The ranker computes the query norm once per search instead of once per slot.
#[inline]
pub(crate) fn score_with_norm(query: &[f32], query_norm: f64, row: &[f32]) -> f32 {
    let row_norm = l2_norm(row);
    if query_norm > 0.0 && row_norm > 0.0 {
        (dot(query, row) / (query_norm * row_norm)) as f32
    } else {
        0.0
    }
}
