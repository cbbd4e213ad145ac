use std::collections::HashMap;
use std::sync::Arc;

use crate::alignment::lexical::{lexical_score, ConceptTable};
use crate::alignment::prepared::PreparedCue;
use crate::config::AlignerConfig;
use crate::pipeline::feedback::FeedbackSnapshot;
use crate::pipeline::provider_guard::{BatchProviderState, ProviderGuard};
use crate::types::CandidatePairScore;

/// Batch-scoped scoring state: feedback snapshot, provider breaker and the
/// pair cache. Dropping it releases everything the batch accumulated.
pub(crate) struct ScoringScope {
    pub feedback: FeedbackSnapshot,
    pub provider: BatchProviderState,
    cache: HashMap<(usize, usize), CandidatePairScore>,
}

impl ScoringScope {
    pub(crate) fn new(feedback: FeedbackSnapshot) -> Self {
        Self {
            feedback,
            provider: BatchProviderState::default(),
            cache: HashMap::new(),
        }
    }

    pub(crate) fn cached_pairs(&self) -> usize {
        self.cache.len()
    }
}

/// Fuses timing proximity, content similarity, structural plausibility and
/// feedback into one confidence per candidate pair.
pub(crate) struct ScoringModel {
    config: AlignerConfig,
    concepts: Arc<ConceptTable>,
    guard: ProviderGuard,
}

impl ScoringModel {
    pub(crate) fn new(config: AlignerConfig, concepts: Arc<ConceptTable>, guard: ProviderGuard) -> Self {
        Self {
            config,
            concepts,
            guard,
        }
    }

    pub(crate) fn guard(&self) -> &ProviderGuard {
        &self.guard
    }

    /// Scores the pair at (`source_idx`, `target_idx`), reusing a cached
    /// result from earlier in the batch when there is one.
    pub(crate) fn score_indexed(
        &self,
        scope: &mut ScoringScope,
        source_idx: usize,
        source: &PreparedCue,
        target_idx: usize,
        target: &PreparedCue,
        index_delta: isize,
    ) -> CandidatePairScore {
        if let Some(hit) = scope.cache.get(&(source_idx, target_idx)) {
            return CandidatePairScore {
                index_delta,
                ..*hit
            };
        }
        let score = self.score(scope, source, target, index_delta);
        scope.cache.insert((source_idx, target_idx), score);
        score
    }

    pub(crate) fn score(
        &self,
        scope: &mut ScoringScope,
        source: &PreparedCue,
        target: &PreparedCue,
        index_delta: isize,
    ) -> CandidatePairScore {
        if source.is_blank() || target.is_blank() {
            return CandidatePairScore {
                index_delta,
                ..CandidatePairScore::default()
            };
        }

        let timing = self.timing_score(source, target);
        let structure = self.structure_score(source, target);
        let lexical = lexical_score(&self.concepts, &source.cleaned, &target.cleaned);
        let (semantic, degraded) =
            match self
                .guard
                .score(&mut scope.provider, &source.cleaned, &target.cleaned)
            {
                Some(semantic) => (semantic, false),
                None => (lexical * self.config.fallback_discount, true),
            };

        let content = clamp_unit(
            self.config.lexical_weight * lexical
                + self.config.semantic_weight * semantic
                + self.config.structure_weight * structure,
        );
        let base = self.config.content_weight * content + self.config.timing_weight * timing;
        let boost = scope.feedback.lookup(&source.lower, &target.cleaned);

        CandidatePairScore {
            timing,
            content,
            structure,
            combined: clamp_unit(base + boost),
            index_delta,
            degraded,
            feedback_boosted: boost > 0.0,
        }
    }

    fn timing_score(&self, source: &PreparedCue, target: &PreparedCue) -> f32 {
        let delta = (source.seconds - target.seconds).abs() as f32;
        clamp_unit(1.0 - delta / self.config.window_seconds)
    }

    /// Mean of punctuation-class parity and length-ratio plausibility.
    fn structure_score(&self, source: &PreparedCue, target: &PreparedCue) -> f32 {
        let parity = [
            source.is_question == target.is_question,
            source.is_exclamation == target.is_exclamation,
        ]
        .iter()
        .filter(|&&same| same)
        .count() as f32
            / 2.0;

        let expected_words = target.char_count as f32 / self.config.target_chars_per_source_word;
        let ratio = source.word_count as f32 / expected_words.max(1.0);
        let length = clamp_unit(1.0 - (ratio - 1.0).abs());

        0.5 * parity + 0.5 * length
    }
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
