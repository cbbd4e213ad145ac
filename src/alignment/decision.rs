use crate::config::AlignerConfig;
use crate::types::{AlignmentStatus, MatchQuality};

const EXCELLENT_FLOOR: f32 = 0.9;
const GOOD_FLOOR: f32 = 0.75;
const FAIR_FLOOR: f32 = 0.5;

/// ALIGNED bound for a source cue of `word_count` words.
///
/// Short phrases have little lexical surface, so they pass with less
/// evidence; long sentences must clear a stricter bound.
pub fn aligned_threshold_for(config: &AlignerConfig, word_count: usize) -> f32 {
    if word_count <= config.short_phrase_max_words {
        config.short_phrase_aligned_threshold
    } else if word_count > config.long_sentence_min_words {
        config.long_sentence_aligned_threshold
    } else {
        config.aligned_threshold
    }
}

pub fn classify(config: &AlignerConfig, confidence: f32, word_count: usize) -> AlignmentStatus {
    if confidence > aligned_threshold_for(config, word_count) {
        AlignmentStatus::Aligned
    } else if confidence > config.review_threshold {
        AlignmentStatus::Review
    } else {
        AlignmentStatus::Misaligned
    }
}

pub fn quality_for(confidence: f32, status: AlignmentStatus) -> MatchQuality {
    if status == AlignmentStatus::Misaligned {
        return MatchQuality::Unmatched;
    }
    if confidence >= EXCELLENT_FLOOR {
        MatchQuality::Excellent
    } else if confidence >= GOOD_FLOOR {
        MatchQuality::Good
    } else if confidence >= FAIR_FLOOR {
        MatchQuality::Fair
    } else {
        MatchQuality::Poor
    }
}
