use crate::error::SimilarityError;

/// Text similarity capability consumed by the scoring model.
///
/// Implementations receive caption-cleaned text and should return a score in
/// `[0, 1]`. Errors, non-finite scores and slow calls are all absorbed by the
/// aligner, which falls back to its lexical score.
pub trait SimilarityProvider: Send + Sync {
    fn score(&self, source: &str, target: &str) -> Result<f32, SimilarityError>;

    fn name(&self) -> &str;

    /// Called after every batch so implementations can drop batch-scoped
    /// caches such as embeddings.
    fn release_batch_state(&self) {}
}
