use std::ops::Range;

use crate::alignment::prepared::PreparedCue;
use crate::alignment::scoring::{clamp_unit, ScoringModel, ScoringScope};
use crate::config::AlignerConfig;
use crate::types::CandidatePairScore;

const TIE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BestCandidate {
    pub target_idx: usize,
    pub score: CandidatePairScore,
    /// `score.combined` plus the context bonus, in [0, 1].
    pub confidence: f32,
}

/// Target position the candidate window is centred on: the source position
/// itself, or with `scaled` the position proportional to the track lengths.
pub(crate) fn window_centre(
    source_idx: usize,
    source_len: usize,
    target_len: usize,
    scaled: bool,
) -> usize {
    if !scaled {
        return source_idx;
    }
    if source_len <= 1 || target_len <= 1 {
        return 0;
    }
    let scaled = source_idx as f64 * (target_len - 1) as f64 / (source_len - 1) as f64;
    (scaled.round() as usize).min(target_len - 1)
}

/// `[centre - radius, centre + radius]` intersected with the target track.
/// Empty when the centre lies more than `radius` past the last target.
pub(crate) fn candidate_window(centre: usize, radius: usize, target_len: usize) -> Range<usize> {
    let end = centre.saturating_add(radius).saturating_add(1).min(target_len);
    let start = centre.saturating_sub(radius).min(end);
    start..end
}

/// Greedy best match for one source cue inside its bounded window.
///
/// Returns `None` when every candidate scores 0. Equal scores keep the
/// candidate nearest the window centre.
pub(crate) fn find_best(
    model: &ScoringModel,
    scope: &mut ScoringScope,
    config: &AlignerConfig,
    source_idx: usize,
    sources: &[PreparedCue],
    targets: &[PreparedCue],
) -> Option<BestCandidate> {
    let source = sources.get(source_idx)?;
    let centre = window_centre(
        source_idx,
        sources.len(),
        targets.len(),
        config.scaled_window_centre,
    );
    let mut best: Option<(usize, CandidatePairScore)> = None;

    for target_idx in candidate_window(centre, config.search_radius, targets.len()) {
        let delta = target_idx as isize - centre as isize;
        let score = model.score_indexed(
            scope,
            source_idx,
            source,
            target_idx,
            &targets[target_idx],
            delta,
        );
        if score.combined <= 0.0 {
            continue;
        }
        let replace = match &best {
            None => true,
            Some((_, current)) if score.combined > current.combined + TIE_EPSILON => true,
            Some((_, current))
                if (score.combined - current.combined).abs() <= TIE_EPSILON
                    && delta.unsigned_abs() < current.index_delta.unsigned_abs() =>
            {
                true
            }
            _ => false,
        };
        if replace {
            best = Some((target_idx, score));
        }
    }

    let (target_idx, score) = best?;
    let bonus = context_bonus(model, scope, config, source_idx, target_idx, sources, targets);
    if bonus > 0.0 {
        tracing::debug!(
            source_idx,
            target_idx,
            combined = format!("{:.3}", score.combined),
            bonus = format!("{:.3}", bonus),
            "search: context bonus applied"
        );
    }
    Some(BestCandidate {
        target_idx,
        score,
        confidence: clamp_unit(score.combined + bonus),
    })
}

/// Bonus for a pairing that sits inside a locally consistent alignment:
/// `context_weight` times the share of neighbouring diagonal pairs that
/// score above `context_good_threshold`.
pub(crate) fn context_bonus(
    model: &ScoringModel,
    scope: &mut ScoringScope,
    config: &AlignerConfig,
    source_idx: usize,
    target_idx: usize,
    sources: &[PreparedCue],
    targets: &[PreparedCue],
) -> f32 {
    let radius = config.context_radius as isize;
    if radius == 0 || config.context_weight <= 0.0 {
        return 0.0;
    }

    let mut considered = 0usize;
    let mut good = 0usize;
    for offset in -radius..=radius {
        if offset == 0 {
            continue;
        }
        let (Some(si), Some(tj)) = (
            source_idx.checked_add_signed(offset),
            target_idx.checked_add_signed(offset),
        ) else {
            continue;
        };
        let (Some(source), Some(target)) = (sources.get(si), targets.get(tj)) else {
            continue;
        };
        considered += 1;
        let neighbour = model.score_indexed(scope, si, source, tj, target, offset);
        if neighbour.combined > config.context_good_threshold {
            good += 1;
        }
    }

    if considered == 0 {
        return 0.0;
    }
    config.context_weight * good as f32 / considered as f32
}
