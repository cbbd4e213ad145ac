use std::sync::Arc;

use crate::alignment::lexical::ConceptTable;
use crate::alignment::scoring::ScoringModel;
use crate::config::AlignerConfig;
use crate::error::AlignmentError;
use crate::pipeline::defaults::LexicalSimilarity;
use crate::pipeline::feedback::FeedbackStore;
use crate::pipeline::provider_guard::ProviderGuard;
use crate::pipeline::runtime::{SubtitleAligner, SubtitleAlignerParts};
use crate::pipeline::traits::SimilarityProvider;

pub struct SubtitleAlignerBuilder {
    config: AlignerConfig,
    concepts: Option<ConceptTable>,
    similarity_provider: Option<Arc<dyn SimilarityProvider>>,
    feedback_store: Option<Arc<FeedbackStore>>,
}

impl SubtitleAlignerBuilder {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            concepts: None,
            similarity_provider: None,
            feedback_store: None,
        }
    }

    pub fn with_concepts(mut self, concepts: ConceptTable) -> Self {
        self.concepts = Some(concepts);
        self
    }

    pub fn with_similarity_provider(mut self, provider: Arc<dyn SimilarityProvider>) -> Self {
        self.similarity_provider = Some(provider);
        self
    }

    /// Shares one feedback store between several aligners, e.g. one per
    /// request in a long-running service.
    pub fn with_feedback_store(mut self, store: Arc<FeedbackStore>) -> Self {
        self.feedback_store = Some(store);
        self
    }

    pub fn build(self) -> Result<SubtitleAligner, AlignmentError> {
        self.config.validate()?;

        let concepts = Arc::new(self.concepts.unwrap_or_default());
        let provider = self
            .similarity_provider
            .unwrap_or_else(|| Arc::new(LexicalSimilarity::new(Arc::clone(&concepts))));
        let feedback = self.feedback_store.unwrap_or_else(|| {
            Arc::new(FeedbackStore::new(
                self.config.feedback_capacity,
                self.config.feedback_boost,
            ))
        });
        if feedback.capacity() != self.config.feedback_capacity {
            tracing::debug!(
                store_capacity = feedback.capacity(),
                configured_capacity = self.config.feedback_capacity,
                "using shared feedback store with its own capacity"
            );
        }

        let guard = ProviderGuard::new(provider, &self.config);
        let model = ScoringModel::new(self.config.clone(), concepts, guard);
        Ok(SubtitleAligner::from_parts(SubtitleAlignerParts {
            config: self.config,
            model,
            feedback,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimilarityError;
    use crate::types::{Cue, CueTrack};

    struct Constant(f32);

    impl SimilarityProvider for Constant {
        fn score(&self, _: &str, _: &str) -> Result<f32, SimilarityError> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    #[test]
    fn builder_defaults_to_lexical_provider() {
        let aligner = SubtitleAlignerBuilder::new(AlignerConfig::default())
            .build()
            .expect("build should succeed");
        assert_eq!(aligner.provider_name(), "lexical");
        assert_eq!(
            aligner.feedback_store().capacity(),
            AlignerConfig::DEFAULT_FEEDBACK_CAPACITY
        );
    }

    #[test]
    fn builder_provider_can_be_overridden() {
        let aligner = SubtitleAlignerBuilder::new(AlignerConfig::default())
            .with_similarity_provider(Arc::new(Constant(0.5)))
            .build()
            .unwrap();
        assert_eq!(aligner.provider_name(), "constant");
    }

    #[test]
    fn build_fails_on_invalid_config() {
        let config = AlignerConfig {
            timing_weight: 0.9,
            ..AlignerConfig::default()
        };
        assert!(SubtitleAlignerBuilder::new(config).build().is_err());
    }

    #[test]
    fn custom_concepts_drive_lexical_scoring() {
        let concepts = ConceptTable::from_json(r#"{"bonjour": ["hello"]}"#).unwrap();
        let aligner = SubtitleAlignerBuilder::new(AlignerConfig::default())
            .with_concepts(concepts)
            .build()
            .unwrap();
        let score = aligner.score_pair(
            &Cue::new("1", "00:00:01,000", "Bonjour"),
            &Cue::new("a", "00:00:01,000", "hello there"),
        );
        assert!(score.content > 0.8, "{score:?}");
    }

    #[test]
    fn shared_feedback_store_is_visible_to_every_aligner() {
        let store = Arc::new(FeedbackStore::new(10, 0.3));
        let first = SubtitleAlignerBuilder::new(AlignerConfig::default())
            .with_feedback_store(Arc::clone(&store))
            .build()
            .unwrap();
        let second = SubtitleAlignerBuilder::new(AlignerConfig::default())
            .with_feedback_store(Arc::clone(&store))
            .build()
            .unwrap();
        first.submit_feedback("over there", "在那边", true);
        assert_eq!(second.feedback_store().len(), 1);

        let source: CueTrack = vec![Cue::new("1", "00:00:01,000", "Over there!")].into();
        let target: CueTrack = vec![Cue::new("a", "00:00:01,000", "在那边！")].into();
        let out = second.align(&source, &target).unwrap();
        assert_eq!(out.diagnostics.feedback_boosted_records, 1);
    }
}
