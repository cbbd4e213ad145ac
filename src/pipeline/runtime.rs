use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use crate::alignment::decision::{classify, quality_for};
use crate::alignment::prepared::{prepare_track, PreparedCue, PreparedTrack};
use crate::alignment::scoring::{ScoringModel, ScoringScope};
use crate::alignment::search::{find_best, BestCandidate};
use crate::alignment::timestamp::to_seconds;
use crate::config::AlignerConfig;
use crate::error::AlignmentError;
use crate::pipeline::builder::SubtitleAlignerBuilder;
use crate::pipeline::feedback::FeedbackStore;
use crate::types::{
    AlignmentDiagnostics, AlignmentOutput, AlignmentRecord, AlignmentStatus, CandidatePairScore,
    Cue, CueTrack, TrackRole,
};

pub struct SubtitleAligner {
    config: AlignerConfig,
    model: ScoringModel,
    feedback: Arc<FeedbackStore>,
}

pub(crate) struct SubtitleAlignerParts {
    pub config: AlignerConfig,
    pub model: ScoringModel,
    pub feedback: Arc<FeedbackStore>,
}

impl SubtitleAligner {
    pub(crate) fn from_parts(parts: SubtitleAlignerParts) -> Self {
        Self {
            config: parts.config,
            model: parts.model,
            feedback: parts.feedback,
        }
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.model.guard().provider_name()
    }

    pub fn feedback_store(&self) -> &Arc<FeedbackStore> {
        &self.feedback
    }

    /// Records reviewer feedback and returns the number of stored pairings.
    pub fn submit_feedback(&self, source_text: &str, target_text: &str, was_correct: bool) -> usize {
        self.feedback.record(source_text, target_text, was_correct)
    }

    /// Scores a single pair outside any alignment request.
    pub fn score_pair(&self, source: &Cue, target: &Cue) -> CandidatePairScore {
        let mut scope = ScoringScope::new(self.feedback.snapshot());
        let score = self.model.score(
            &mut scope,
            &PreparedCue::from_parts(to_seconds(&source.start), &source.text),
            &PreparedCue::from_parts(to_seconds(&target.start), &target.text),
            0,
        );
        self.model.guard().release_batch_state();
        score
    }

    pub fn align(
        &self,
        source: &CueTrack,
        target: &CueTrack,
    ) -> Result<AlignmentOutput, AlignmentError> {
        self.align_with_progress(source, target, &|_| {})
    }

    /// Like [`align`](Self::align), calling `on_batch` with the number of
    /// source cues finished after every batch. Batches may finish out of
    /// order; records never do.
    pub fn align_with_progress(
        &self,
        source: &CueTrack,
        target: &CueTrack,
        on_batch: &(dyn Fn(usize) + Sync),
    ) -> Result<AlignmentOutput, AlignmentError> {
        if source.is_empty() {
            return Err(AlignmentError::empty_track(TrackRole::Source));
        }
        if target.is_empty() {
            return Err(AlignmentError::empty_track(TrackRole::Target));
        }

        let prepared_source = prepare_track(source, TrackRole::Source);
        let prepared_target = prepare_track(target, TrackRole::Target);

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<Range<usize>> = (0..source.len())
            .step_by(batch_size)
            .map(|start| start..(start + batch_size).min(source.len()))
            .collect();

        tracing::info!(
            source_cues = source.len(),
            target_cues = target.len(),
            batches = batches.len(),
            provider = self.provider_name(),
            "aligning subtitle tracks"
        );

        let run = |range: &Range<usize>| {
            let out = self.align_batch(range.clone(), source, target, &prepared_source, &prepared_target);
            on_batch(range.len());
            out
        };
        let results: Vec<(Vec<AlignmentRecord>, AlignmentDiagnostics)> =
            if self.config.parallel_batches && batches.len() > 1 {
                batches.par_iter().map(run).collect()
            } else {
                batches.iter().map(run).collect()
            };

        let mut records = Vec::with_capacity(source.len());
        let mut diagnostics = AlignmentDiagnostics {
            malformed_timestamps: prepared_source.malformed,
            ..AlignmentDiagnostics::default()
        };
        diagnostics
            .malformed_timestamps
            .extend(prepared_target.malformed);
        for (batch_records, batch_diagnostics) in results {
            records.extend(batch_records);
            diagnostics.absorb(batch_diagnostics);
        }

        tracing::info!(
            records = records.len(),
            aligned = records.iter().filter(|r| r.status == AlignmentStatus::Aligned).count(),
            provider_fallbacks = diagnostics.provider_fallbacks,
            malformed_timestamps = diagnostics.malformed_timestamps.len(),
            "alignment finished"
        );
        Ok(AlignmentOutput {
            records,
            diagnostics,
        })
    }

    fn align_batch(
        &self,
        range: Range<usize>,
        source: &CueTrack,
        target: &CueTrack,
        prepared_source: &PreparedTrack,
        prepared_target: &PreparedTrack,
    ) -> (Vec<AlignmentRecord>, AlignmentDiagnostics) {
        let mut scope = ScoringScope::new(self.feedback.snapshot());
        let mut records = Vec::with_capacity(range.len());
        let mut boosted = 0usize;

        for source_idx in range.clone() {
            let best = find_best(
                &self.model,
                &mut scope,
                &self.config,
                source_idx,
                &prepared_source.cues,
                &prepared_target.cues,
            );
            if best.is_some_and(|b| b.score.feedback_boosted) {
                boosted += 1;
            }
            records.push(self.build_record(
                &source.cues()[source_idx],
                &prepared_source.cues[source_idx],
                best,
                target,
            ));
        }

        let diagnostics = AlignmentDiagnostics {
            malformed_timestamps: Vec::new(),
            provider_fallbacks: scope.provider.fallbacks,
            provider_timeouts: scope.provider.timeouts,
            feedback_boosted_records: boosted,
            batches: 1,
        };
        tracing::debug!(
            batch_start = range.start,
            batch_len = range.len(),
            cached_pairs = scope.cached_pairs(),
            "runtime: batch done, releasing batch state"
        );
        drop(scope);
        self.model.guard().release_batch_state();
        (records, diagnostics)
    }

    fn build_record(
        &self,
        cue: &Cue,
        prepared: &PreparedCue,
        best: Option<BestCandidate>,
        target: &CueTrack,
    ) -> AlignmentRecord {
        let confidence = best.map_or(0.0, |b| b.confidence);
        let status = match best {
            Some(_) => classify(&self.config, confidence, prepared.word_count),
            None => AlignmentStatus::Misaligned,
        };
        let matched = match (status, best) {
            (AlignmentStatus::Misaligned, _) | (_, None) => None,
            (_, Some(b)) => target.get(b.target_idx),
        };

        AlignmentRecord {
            source_id: cue.id.clone(),
            source_start: cue.start.clone(),
            source_end: cue.end.clone(),
            source_text: cue.text.clone(),
            target_id: matched.map(|t| t.id.clone()),
            target_start: matched.map(|t| t.start.clone()),
            target_text: matched.map(|t| t.text.clone()),
            confidence,
            status,
            quality: quality_for(confidence, status),
            degraded: best.is_some_and(|b| b.score.degraded),
        }
    }
}

/// One-shot alignment with the default lexical similarity and a fresh
/// feedback store.
pub fn align(
    source: &CueTrack,
    target: &CueTrack,
    config: AlignerConfig,
) -> Result<Vec<AlignmentRecord>, AlignmentError> {
    let aligner = SubtitleAlignerBuilder::new(config).build()?;
    Ok(aligner.align(source, target)?.records)
}
