use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::alignment::lexical::{lexical_score, ConceptTable};
use crate::error::SimilarityError;
use crate::pipeline::traits::SimilarityProvider;

/// Concept-table similarity. Always available.
#[derive(Debug, Clone, Default)]
pub struct LexicalSimilarity {
    table: Arc<ConceptTable>,
}

impl LexicalSimilarity {
    pub fn new(table: Arc<ConceptTable>) -> Self {
        Self { table }
    }
}

impl SimilarityProvider for LexicalSimilarity {
    fn score(&self, source: &str, target: &str) -> Result<f32, SimilarityError> {
        Ok(lexical_score(&self.table, source, target))
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

/// Source and target phrasings of one meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseGroup {
    pub name: String,
    pub source_phrases: Vec<String>,
    pub target_phrases: Vec<String>,
    pub confidence: f32,
}

fn builtin_phrase_groups() -> Vec<PhraseGroup> {
    fn group(name: &str, source: &[&str], target: &[&str], confidence: f32) -> PhraseGroup {
        PhraseGroup {
            name: name.to_string(),
            source_phrases: source.iter().map(|s| (*s).to_string()).collect(),
            target_phrases: target.iter().map(|s| (*s).to_string()).collect(),
            confidence,
        }
    }
    vec![
        group(
            "wish_better",
            &[
                "wish ours was that fancy",
                "i'd be so happy if",
                "want our ship to be better",
            ],
            &["我們的船好破爛", "船如果那麼漂亮就好了", "希望我們的船更好"],
            0.9,
        ),
        group(
            "question_why",
            &["why is that", "because it looks better", "why"],
            &["為什麼", "就因為它比較新", "原因是"],
            0.95,
        ),
    ]
}

/// Recognizes whole phrasings that share a meaning, deferring to an inner
/// provider for everything else. Returns the larger of the two scores.
pub struct PhraseGroupSimilarity {
    groups: Vec<PhraseGroup>,
    inner: Arc<dyn SimilarityProvider>,
}

impl PhraseGroupSimilarity {
    pub fn new(groups: Vec<PhraseGroup>, inner: Arc<dyn SimilarityProvider>) -> Self {
        let groups = groups
            .into_iter()
            .map(|mut group| {
                group.source_phrases = group
                    .source_phrases
                    .into_iter()
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect();
                group.target_phrases.retain(|p| !p.trim().is_empty());
                group.confidence = group.confidence.clamp(0.0, 1.0);
                group
            })
            .collect();
        Self { groups, inner }
    }

    pub fn with_builtin_groups(inner: Arc<dyn SimilarityProvider>) -> Self {
        Self::new(builtin_phrase_groups(), inner)
    }

    fn group_score(&self, source_lower: &str, target: &str) -> f32 {
        self.groups
            .iter()
            .filter(|group| {
                group
                    .source_phrases
                    .iter()
                    .any(|p| source_lower.contains(p.as_str()))
                    && group
                        .target_phrases
                        .iter()
                        .any(|p| target.contains(p.as_str()))
            })
            .map(|group| group.confidence)
            .fold(0.0, f32::max)
    }
}

impl SimilarityProvider for PhraseGroupSimilarity {
    fn score(&self, source: &str, target: &str) -> Result<f32, SimilarityError> {
        let group = self.group_score(&source.to_lowercase(), target);
        let inner = self.inner.score(source, target)?;
        Ok(group.max(inner))
    }

    fn name(&self) -> &str {
        "phrase-groups"
    }

    fn release_batch_state(&self) {
        self.inner.release_batch_state();
    }
}

/// Embedding-style similarity over signed hashed character n-grams.
///
/// Useful between languages that share a script. Embeddings are cached per
/// batch and dropped by [`SimilarityProvider::release_batch_state`].
pub struct HashedNgramSimilarity {
    dim: usize,
    cache: Mutex<HashMap<String, Arc<[f32]>>>,
}

impl HashedNgramSimilarity {
    pub const DEFAULT_DIM: usize = 256;

    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(8),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_embeddings(&self) -> usize {
        self.cache.lock().len()
    }

    fn embedding(&self, text: &str) -> Arc<[f32]> {
        if let Some(hit) = self.cache.lock().get(text) {
            return Arc::clone(hit);
        }
        let embedding: Arc<[f32]> = embed_char_ngrams(text, self.dim).into();
        self.cache
            .lock()
            .insert(text.to_string(), Arc::clone(&embedding));
        embedding
    }
}

impl Default for HashedNgramSimilarity {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIM)
    }
}

impl SimilarityProvider for HashedNgramSimilarity {
    fn score(&self, source: &str, target: &str) -> Result<f32, SimilarityError> {
        if source.trim().is_empty() || target.trim().is_empty() {
            return Ok(0.0);
        }
        let a = self.embedding(source);
        let b = self.embedding(target);
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        Ok(dot.clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "ngram"
    }

    fn release_batch_state(&self) {
        self.cache.lock().clear();
    }
}

fn fnv1a(chars: &[char]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &c in chars {
        hash ^= c as u32;
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// L2-normalized signed hashing of uni/bi/tri-grams with boundary markers.
fn embed_char_ngrams(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    let mut chars: Vec<char> = Vec::with_capacity(text.len() + 2);
    chars.push('\u{0002}');
    chars.extend(text.to_lowercase().chars());
    chars.push('\u{0003}');

    for n in 1..=3usize {
        if chars.len() < n {
            continue;
        }
        for window in chars.windows(n) {
            let h = fnv1a(window);
            let sign = if h & 1 == 0 { 1.0 } else { -1.0 };
            v[(h as usize >> 1) % dim] += sign;
        }
    }

    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_similarity_uses_table() {
        let provider = LexicalSimilarity::default();
        assert_eq!(provider.score("Look!", "看!").unwrap(), 1.0);
        assert_eq!(provider.score("Look!", "好").unwrap(), 0.0);
        assert_eq!(provider.name(), "lexical");
    }

    #[test]
    fn phrase_group_beats_inner_score() {
        let provider = PhraseGroupSimilarity::with_builtin_groups(Arc::new(LexicalSimilarity::default()));
        let score = provider
            .score("I wish ours was that fancy", "船如果那麼漂亮就好了")
            .unwrap();
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn phrase_group_defers_to_inner_provider() {
        let provider = PhraseGroupSimilarity::with_builtin_groups(Arc::new(LexicalSimilarity::default()));
        assert_eq!(provider.score("Hello", "你好").unwrap(), 1.0);
        assert_eq!(provider.score("Good night", "晚安").unwrap(), 0.0);
    }

    #[test]
    fn phrase_group_propagates_inner_failure() {
        struct Down;
        impl SimilarityProvider for Down {
            fn score(&self, _: &str, _: &str) -> Result<f32, SimilarityError> {
                Err(SimilarityError::Unavailable("offline".to_string()))
            }
            fn name(&self) -> &str {
                "down"
            }
        }
        let provider = PhraseGroupSimilarity::with_builtin_groups(Arc::new(Down));
        assert!(provider.score("why", "為什麼").is_err());
    }

    #[test]
    fn ngram_similarity_ranks_close_text_higher() {
        let provider = HashedNgramSimilarity::default();
        let same = provider.score("the magic lamp", "the magic lamp").unwrap();
        let close = provider.score("the magic lamp", "a magic lamp!").unwrap();
        let far = provider.score("the magic lamp", "xyz qrs").unwrap();
        assert!((same - 1.0).abs() < 1e-4);
        assert!(close > far);
        assert!((0.0..=1.0).contains(&far));
    }

    #[test]
    fn ngram_hash_is_fnv1a_over_code_points() {
        assert_eq!(fnv1a(&[]), 0x811c_9dc5);
        assert_eq!(fnv1a(&['a']), 0xe40c_292c);
        let v = embed_char_ngrams("你好", 32);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(v, embed_char_ngrams("你好", 32));
    }

    #[test]
    fn ngram_cache_is_released_per_batch() {
        let provider = HashedNgramSimilarity::new(64);
        provider.score("bonjour", "bonsoir").unwrap();
        assert_eq!(provider.cached_embeddings(), 2);
        provider.release_batch_state();
        assert_eq!(provider.cached_embeddings(), 0);
    }
}
