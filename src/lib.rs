pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use alignment::decision::{aligned_threshold_for, classify, quality_for};
pub use alignment::lexical::{clean_text, lexical_score, Concept, ConceptTable};
pub use alignment::report::AlignmentSummary;
pub use alignment::timestamp::{
    format_srt_timestamp, offset_timestamp, parse_timestamp, to_seconds, TimestampError,
};
pub use config::AlignerConfig;
pub use error::{AlignmentError, SimilarityError};
pub use pipeline::builder::SubtitleAlignerBuilder;
pub use pipeline::defaults::{
    HashedNgramSimilarity, LexicalSimilarity, PhraseGroup, PhraseGroupSimilarity,
};
pub use pipeline::feedback::{FeedbackEntry, FeedbackSnapshot, FeedbackStore};
pub use pipeline::runtime::{align, SubtitleAligner};
pub use pipeline::traits::SimilarityProvider;
pub use types::{
    AlignmentDiagnostics, AlignmentOutput, AlignmentRecord, AlignmentStatus, CandidatePairScore,
    Cue, CueTrack, MatchQuality, TimestampDiagnostic, TrackRole,
};
