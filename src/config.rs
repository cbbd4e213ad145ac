use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AlignmentError;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

/// Tunables of the alignment engine. Every numeric weight is a policy
/// default, not a structural requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Timing score decays linearly to 0 over this many seconds.
    pub window_seconds: f32,
    /// Candidate window half-width in target positions.
    pub search_radius: usize,
    /// Centre the window on the proportional target position instead of the
    /// source position. Off by default.
    pub scaled_window_centre: bool,
    pub aligned_threshold: f32,
    pub review_threshold: f32,
    pub short_phrase_aligned_threshold: f32,
    pub long_sentence_aligned_threshold: f32,
    pub short_phrase_max_words: usize,
    /// Sentences with more words than this use the long-sentence threshold.
    pub long_sentence_min_words: usize,
    pub batch_size: usize,
    pub content_weight: f32,
    pub timing_weight: f32,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub structure_weight: f32,
    pub target_chars_per_source_word: f32,
    pub feedback_capacity: usize,
    pub feedback_boost: f32,
    /// 0 disables the context boost.
    pub context_radius: usize,
    pub context_good_threshold: f32,
    pub context_weight: f32,
    /// Multiplier applied to the lexical score when it stands in for a failed provider.
    pub fallback_discount: f32,
    pub provider_max_retries: u32,
    pub provider_timeout_ms: u64,
    /// Run provider calls on worker threads and stop waiting at the budget.
    pub provider_isolated_calls: bool,
    pub provider_workers: usize,
    pub provider_max_consecutive_failures: u32,
    pub parallel_batches: bool,
}

impl AlignerConfig {
    pub const DEFAULT_WINDOW_SECONDS: f32 = 5.0;
    pub const DEFAULT_SEARCH_RADIUS: usize = 12;
    pub const DEFAULT_BATCH_SIZE: usize = 32;
    pub const DEFAULT_FEEDBACK_CAPACITY: usize = 100;
    pub const DEFAULT_PROVIDER_WORKERS: usize = 4;

    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read aligner config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| AlignmentError::json("parse aligner config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AlignmentError> {
        let weights = [
            ("content_weight", self.content_weight),
            ("timing_weight", self.timing_weight),
            ("lexical_weight", self.lexical_weight),
            ("semantic_weight", self.semantic_weight),
            ("structure_weight", self.structure_weight),
            ("feedback_boost", self.feedback_boost),
            ("context_weight", self.context_weight),
            ("fallback_discount", self.fallback_discount),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(AlignmentError::invalid_config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.fallback_discount > 1.0 {
            return Err(AlignmentError::invalid_config(format!(
                "fallback_discount must not exceed 1, got {}",
                self.fallback_discount
            )));
        }

        let top = self.content_weight + self.timing_weight;
        if (top - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AlignmentError::invalid_config(format!(
                "content_weight + timing_weight must sum to 1, got {top}"
            )));
        }
        let content = self.lexical_weight + self.semantic_weight + self.structure_weight;
        if (content - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AlignmentError::invalid_config(format!(
                "lexical_weight + semantic_weight + structure_weight must sum to 1, got {content}"
            )));
        }

        let thresholds = [
            ("aligned_threshold", self.aligned_threshold),
            ("review_threshold", self.review_threshold),
            (
                "short_phrase_aligned_threshold",
                self.short_phrase_aligned_threshold,
            ),
            (
                "long_sentence_aligned_threshold",
                self.long_sentence_aligned_threshold,
            ),
            ("context_good_threshold", self.context_good_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(AlignmentError::invalid_config(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        let min_aligned = self
            .aligned_threshold
            .min(self.short_phrase_aligned_threshold)
            .min(self.long_sentence_aligned_threshold);
        if self.review_threshold > min_aligned {
            return Err(AlignmentError::invalid_config(format!(
                "review_threshold ({}) must not exceed any aligned threshold ({min_aligned})",
                self.review_threshold
            )));
        }

        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(AlignmentError::invalid_config(format!(
                "window_seconds must be positive, got {}",
                self.window_seconds
            )));
        }
        if !self.target_chars_per_source_word.is_finite() || self.target_chars_per_source_word <= 0.0
        {
            return Err(AlignmentError::invalid_config(format!(
                "target_chars_per_source_word must be positive, got {}",
                self.target_chars_per_source_word
            )));
        }
        if self.batch_size == 0 {
            return Err(AlignmentError::invalid_config("batch_size must be at least 1"));
        }
        if self.feedback_capacity == 0 {
            return Err(AlignmentError::invalid_config(
                "feedback_capacity must be at least 1",
            ));
        }
        if self.provider_isolated_calls && self.provider_workers == 0 {
            return Err(AlignmentError::invalid_config(
                "provider_workers must be at least 1 when provider_isolated_calls is set",
            ));
        }
        if self.short_phrase_max_words >= self.long_sentence_min_words {
            return Err(AlignmentError::invalid_config(format!(
                "short_phrase_max_words ({}) must be below long_sentence_min_words ({})",
                self.short_phrase_max_words, self.long_sentence_min_words
            )));
        }
        Ok(())
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            window_seconds: Self::DEFAULT_WINDOW_SECONDS,
            search_radius: Self::DEFAULT_SEARCH_RADIUS,
            scaled_window_centre: false,
            aligned_threshold: 0.7,
            review_threshold: 0.4,
            short_phrase_aligned_threshold: 0.6,
            long_sentence_aligned_threshold: 0.8,
            short_phrase_max_words: 3,
            long_sentence_min_words: 8,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            content_weight: 0.6,
            timing_weight: 0.4,
            lexical_weight: 0.4,
            semantic_weight: 0.4,
            structure_weight: 0.2,
            target_chars_per_source_word: 3.0,
            feedback_capacity: Self::DEFAULT_FEEDBACK_CAPACITY,
            feedback_boost: 0.3,
            context_radius: 2,
            context_good_threshold: 0.6,
            context_weight: 0.1,
            fallback_discount: 0.9,
            provider_max_retries: 2,
            provider_timeout_ms: 2_000,
            provider_isolated_calls: true,
            provider_workers: Self::DEFAULT_PROVIDER_WORKERS,
            provider_max_consecutive_failures: 3,
            parallel_batches: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligner_config_default_is_valid() {
        let config = AlignerConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(config.window_seconds, 5.0);
        assert_eq!(config.search_radius, 12);
        assert_eq!(config.batch_size, AlignerConfig::DEFAULT_BATCH_SIZE);
        assert!((config.content_weight + config.timing_weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AlignerConfig =
            serde_json::from_str(r#"{"search_radius": 4, "batch_size": 10}"#).unwrap();
        assert_eq!(config.search_radius, 4);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.aligned_threshold, 0.7);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let config = AlignerConfig {
            content_weight: 0.7,
            timing_weight: 0.5,
            ..AlignerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("content_weight + timing_weight"));
    }

    #[test]
    fn rejects_review_above_aligned() {
        let config = AlignerConfig {
            review_threshold: 0.65,
            ..AlignerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch_and_capacity() {
        let config = AlignerConfig {
            batch_size: 0,
            ..AlignerConfig::default()
        };
        assert!(config.validate().is_err());
        let config = AlignerConfig {
            feedback_capacity: 0,
            ..AlignerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn isolated_calls_need_a_worker() {
        let config = AlignerConfig {
            provider_workers: 0,
            ..AlignerConfig::default()
        };
        assert!(config.validate().is_err());
        let config = AlignerConfig {
            provider_workers: 0,
            provider_isolated_calls: false,
            ..AlignerConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn load_reads_and_validates_file() {
        let path = std::env::temp_dir().join("subtitle_align_config_load.json");
        std::fs::write(&path, r#"{"window_seconds": 3.5, "timing_weight": 0.5, "content_weight": 0.5}"#)
            .expect("write config");
        let config = AlignerConfig::load(&path).expect("load config");
        assert_eq!(config.window_seconds, 3.5);
        assert_eq!(config.timing_weight, 0.5);

        std::fs::write(&path, r#"{"window_seconds": -1}"#).expect("write config");
        assert!(AlignerConfig::load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_fails_on_missing_file() {
        let err = AlignerConfig::load(Path::new("/nonexistent/aligner.json")).unwrap_err();
        assert!(matches!(err, AlignmentError::Io { .. }));
    }
}
