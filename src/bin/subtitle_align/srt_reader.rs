use std::fs;
use std::path::Path;

use subtitle_align::{Cue, CueTrack};

pub fn read_track(path: &Path) -> Result<CueTrack, String> {
    let content = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read subtitle file '{}': {err}", path.display()))?;
    Ok(parse_srt(&content))
}

/// Parses SRT blocks: a sequence line, a `start --> end` line and one or
/// more text lines joined with a space. Malformed blocks are skipped.
pub fn parse_srt(content: &str) -> CueTrack {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in content.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            block.push(line.trim());
            continue;
        }
        if block.is_empty() {
            continue;
        }
        match parse_block(&block) {
            Some(cue) => cues.push(cue),
            None => tracing::debug!(first_line = block[0], "skipping malformed SRT block"),
        }
        block.clear();
    }
    CueTrack::new(cues)
}

fn parse_block(lines: &[&str]) -> Option<Cue> {
    if lines.len() < 3 {
        return None;
    }
    let (start, end) = lines[1].split_once("-->")?;
    let start = start.trim();
    if start.is_empty() {
        return None;
    }
    // Position hints such as "X1:40" may follow the end time.
    let end = end.split_whitespace().next().unwrap_or_default();
    let cue = Cue::new(lines[0], start, lines[2..].join(" "));
    Some(if end.is_empty() { cue } else { cue.with_end(end) })
}
