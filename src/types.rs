use std::fmt;

use serde::{Deserialize, Serialize};

/// One timed subtitle entry as produced by a timed-text parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub id: String,
    /// `HH:MM:SS,mmm` or `HH:MM:SS.mmm`. Unparsable values normalize to 0 s.
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub text: String,
}

impl Cue {
    pub fn new(id: impl Into<String>, start: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: start.into(),
            end: None,
            text: text.into(),
        }
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }
}

/// Ordered cues of one language. Positions are meaningful for windowed search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueTrack {
    cues: Vec<Cue>,
}

impl CueTrack {
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }
}

impl From<Vec<Cue>> for CueTrack {
    fn from(cues: Vec<Cue>) -> Self {
        Self::new(cues)
    }
}

impl FromIterator<Cue> for CueTrack {
    fn from_iter<I: IntoIterator<Item = Cue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Source,
    Target,
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// Per-axis scores of one source/target comparison. Recomputed per
/// comparison, never stored on records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidatePairScore {
    pub timing: f32,
    pub content: f32,
    pub structure: f32,
    pub combined: f32,
    /// Target position minus window centre.
    pub index_delta: isize,
    /// Semantic term came from the lexical fallback instead of the provider.
    pub degraded: bool,
    pub feedback_boosted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentStatus {
    Aligned,
    Review,
    Misaligned,
}

impl AlignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aligned => "ALIGNED",
            Self::Review => "REVIEW",
            Self::Misaligned => "MISALIGNED",
        }
    }
}

/// Coarse confidence band, independent of the adaptive status thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Unmatched,
}

impl MatchQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Unmatched => "unmatched",
        }
    }
}

/// Result for one source cue. `status == Misaligned` implies every target
/// field is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    pub source_id: String,
    pub source_start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_end: Option<String>,
    pub source_text: String,
    pub target_id: Option<String>,
    pub target_start: Option<String>,
    pub target_text: Option<String>,
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub status: AlignmentStatus,
    pub quality: MatchQuality,
    /// The provider failed for the winning pair and the lexical fallback was used.
    #[serde(default)]
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampDiagnostic {
    pub role: TrackRole,
    pub cue_id: String,
    pub raw: String,
}

/// Side channel for degraded inputs and fallbacks. Never changes the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentDiagnostics {
    pub malformed_timestamps: Vec<TimestampDiagnostic>,
    pub provider_fallbacks: usize,
    pub provider_timeouts: usize,
    pub feedback_boosted_records: usize,
    pub batches: usize,
}

impl AlignmentDiagnostics {
    pub(crate) fn absorb(&mut self, other: AlignmentDiagnostics) {
        self.malformed_timestamps.extend(other.malformed_timestamps);
        self.provider_fallbacks += other.provider_fallbacks;
        self.provider_timeouts += other.provider_timeouts;
        self.feedback_boosted_records += other.feedback_boosted_records;
        self.batches += other.batches;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutput {
    pub records: Vec<AlignmentRecord>,
    pub diagnostics: AlignmentDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&AlignmentStatus::Misaligned).unwrap();
        assert_eq!(json, "\"MISALIGNED\"");
        assert_eq!(AlignmentStatus::Review.as_str(), "REVIEW");
    }

    #[test]
    fn track_deserializes_from_plain_array() {
        let track: CueTrack = serde_json::from_str(
            r#"[{"id": "1", "start": "00:00:01,000", "text": "hello"},
                {"id": "2", "start": "00:00:02,000", "end": "00:00:03,000", "text": "why"}]"#,
        )
        .unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.get(1).and_then(|c| c.end.as_deref()), Some("00:00:03,000"));
    }

    #[test]
    fn diagnostics_absorb_sums_counters() {
        let mut total = AlignmentDiagnostics::default();
        total.absorb(AlignmentDiagnostics {
            provider_fallbacks: 2,
            batches: 1,
            ..Default::default()
        });
        total.absorb(AlignmentDiagnostics {
            provider_fallbacks: 1,
            provider_timeouts: 1,
            batches: 1,
            ..Default::default()
        });
        assert_eq!(total.provider_fallbacks, 3);
        assert_eq!(total.provider_timeouts, 1);
        assert_eq!(total.batches, 2);
    }
}
