use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{AlignmentRecord, AlignmentStatus};

/// Per-request counts for reviewers and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentSummary {
    pub total_source: usize,
    pub total_target: usize,
    pub aligned: usize,
    pub needs_review: usize,
    pub misaligned: usize,
    pub degraded: usize,
    pub mean_confidence: f32,
    /// Record count per quality band, keyed by the band's name.
    pub quality: BTreeMap<&'static str, usize>,
}

impl AlignmentSummary {
    pub fn from_records(records: &[AlignmentRecord], total_target: usize) -> Self {
        let mut summary = Self {
            total_source: records.len(),
            total_target,
            aligned: 0,
            needs_review: 0,
            misaligned: 0,
            degraded: 0,
            mean_confidence: 0.0,
            quality: BTreeMap::new(),
        };
        let mut confidence_sum = 0.0f64;
        for record in records {
            match record.status {
                AlignmentStatus::Aligned => summary.aligned += 1,
                AlignmentStatus::Review => summary.needs_review += 1,
                AlignmentStatus::Misaligned => summary.misaligned += 1,
            }
            *summary.quality.entry(record.quality.as_str()).or_default() += 1;
            if record.degraded {
                summary.degraded += 1;
            }
            confidence_sum += record.confidence as f64;
        }
        if !records.is_empty() {
            summary.mean_confidence = (confidence_sum / records.len() as f64) as f32;
        }
        summary
    }

    /// Share of source cues that need no human attention.
    pub fn aligned_ratio(&self) -> f32 {
        if self.total_source == 0 {
            0.0
        } else {
            self.aligned as f32 / self.total_source as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::decision::quality_for;

    fn record(status: AlignmentStatus, confidence: f32, degraded: bool) -> AlignmentRecord {
        AlignmentRecord {
            source_id: "1".to_string(),
            source_start: "00:00:01,000".to_string(),
            source_end: None,
            source_text: "hello".to_string(),
            target_id: None,
            target_start: None,
            target_text: None,
            confidence,
            status,
            quality: quality_for(confidence, status),
            degraded,
        }
    }

    #[test]
    fn counts_each_status() {
        let records = vec![
            record(AlignmentStatus::Aligned, 0.9, false),
            record(AlignmentStatus::Aligned, 0.8, true),
            record(AlignmentStatus::Review, 0.5, false),
            record(AlignmentStatus::Misaligned, 0.2, false),
        ];
        let summary = AlignmentSummary::from_records(&records, 7);
        assert_eq!(summary.total_source, 4);
        assert_eq!(summary.total_target, 7);
        assert_eq!(summary.aligned, 2);
        assert_eq!(summary.needs_review, 1);
        assert_eq!(summary.misaligned, 1);
        assert_eq!(summary.degraded, 1);
        assert!((summary.mean_confidence - 0.6).abs() < 1e-6);
        assert!((summary.aligned_ratio() - 0.5).abs() < 1e-6);
        let bands: Vec<(&str, usize)> = summary.quality.into_iter().collect();
        assert_eq!(
            bands,
            [("excellent", 1), ("fair", 1), ("good", 1), ("unmatched", 1)]
        );
    }

    #[test]
    fn empty_records_have_zero_mean() {
        let summary = AlignmentSummary::from_records(&[], 0);
        assert_eq!(summary.mean_confidence, 0.0);
        assert_eq!(summary.aligned_ratio(), 0.0);
        assert!(summary.quality.is_empty());
    }
}
