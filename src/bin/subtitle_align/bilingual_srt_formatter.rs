use std::fs;
use std::path::Path;

use subtitle_align::{offset_timestamp, AlignmentRecord, AlignmentStatus};

/// Display time given to cues that carry no end timestamp.
const DEFAULT_CUE_DURATION_MS: i64 = 3_000;

/// Renders every matched pair as one cue, target text first. Returns `None`
/// when no record carries a target.
pub fn render_bilingual_srt(records: &[AlignmentRecord]) -> Option<String> {
    let mut out = String::new();
    let mut sequence = 0usize;
    for record in records {
        if record.status == AlignmentStatus::Misaligned {
            continue;
        }
        let Some(target_text) = record.target_text.as_deref() else {
            continue;
        };
        sequence += 1;
        let start = offset_timestamp(&record.source_start, 0);
        let end = match record.source_end.as_deref() {
            Some(end) => offset_timestamp(end, 0),
            None => offset_timestamp(&record.source_start, DEFAULT_CUE_DURATION_MS),
        };
        out.push_str(&format!(
            "{sequence}\n{start} --> {end}\n{target_text}\n{}\n\n",
            record.source_text
        ));
    }
    (sequence > 0).then_some(out)
}

pub fn write_bilingual_srt(path: &Path, records: &[AlignmentRecord]) -> Result<usize, String> {
    let content = render_bilingual_srt(records)
        .ok_or_else(|| "No aligned pairs to write to the bilingual SRT.".to_string())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create SRT output directory '{}': {err}",
                parent.display()
            )
        })?;
    }
    fs::write(path, &content)
        .map_err(|err| format!("Failed to write SRT file '{}': {err}", path.display()))?;
    Ok(content.matches(" --> ").count())
}

#[cfg(test)]
mod tests {
    use subtitle_align::MatchQuality;

    use super::*;

    fn record(status: AlignmentStatus, target: Option<&str>, end: Option<&str>) -> AlignmentRecord {
        AlignmentRecord {
            source_id: "1".to_string(),
            source_start: "00:00:58.500".to_string(),
            source_end: end.map(str::to_string),
            source_text: "hello".to_string(),
            target_id: target.map(|_| "a".to_string()),
            target_start: target.map(|_| "00:00:58,700".to_string()),
            target_text: target.map(str::to_string),
            confidence: 0.9,
            status,
            quality: MatchQuality::Excellent,
            degraded: false,
        }
    }

    #[test]
    fn renders_target_above_source_with_default_duration() {
        let srt = render_bilingual_srt(&[
            record(AlignmentStatus::Aligned, Some("你好"), None),
            record(AlignmentStatus::Misaligned, None, None),
            record(AlignmentStatus::Review, Some("您好"), Some("00:01:00,000")),
        ])
        .unwrap();
        assert_eq!(
            srt,
            "1\n00:00:58,500 --> 00:01:01,500\n你好\nhello\n\n2\n00:00:58,500 --> 00:01:00,000\n您好\nhello\n\n"
        );
    }

    #[test]
    fn nothing_to_render_without_matches() {
        assert!(render_bilingual_srt(&[record(AlignmentStatus::Misaligned, None, None)]).is_none());
    }
}
