use crate::alignment::lexical::clean_text;
use crate::alignment::timestamp::parse_timestamp;
use crate::types::{CueTrack, TimestampDiagnostic, TrackRole};

/// Features of one cue computed once per alignment request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedCue {
    pub seconds: f64,
    pub cleaned: String,
    pub lower: String,
    pub word_count: usize,
    pub char_count: usize,
    pub is_question: bool,
    pub is_exclamation: bool,
}

impl PreparedCue {
    pub(crate) fn from_parts(seconds: f64, text: &str) -> Self {
        let cleaned = clean_text(text);
        let lower = cleaned.to_lowercase();
        Self {
            seconds,
            word_count: cleaned.split_whitespace().count(),
            char_count: cleaned.chars().filter(|c| !c.is_whitespace()).count(),
            is_question: cleaned.contains(|c: char| c == '?' || c == '？'),
            is_exclamation: cleaned.contains(|c: char| c == '!' || c == '！'),
            cleaned,
            lower,
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.cleaned.is_empty()
    }
}

pub(crate) struct PreparedTrack {
    pub cues: Vec<PreparedCue>,
    pub malformed: Vec<TimestampDiagnostic>,
}

pub(crate) fn prepare_track(track: &CueTrack, role: TrackRole) -> PreparedTrack {
    let mut malformed = Vec::new();
    let cues = track
        .cues()
        .iter()
        .map(|cue| {
            let seconds = match parse_timestamp(&cue.start) {
                Ok(seconds) => seconds,
                Err(err) => {
                    tracing::warn!(
                        role = %role,
                        cue_id = cue.id.as_str(),
                        raw = cue.start.as_str(),
                        reason = %err,
                        "malformed cue timestamp; treating as 0 s"
                    );
                    malformed.push(TimestampDiagnostic {
                        role,
                        cue_id: cue.id.clone(),
                        raw: cue.start.clone(),
                    });
                    0.0
                }
            };
            PreparedCue::from_parts(seconds, &cue.text)
        })
        .collect();
    PreparedTrack { cues, malformed }
}
