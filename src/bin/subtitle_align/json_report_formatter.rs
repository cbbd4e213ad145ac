use std::fs;
use std::path::Path;

use serde::Serialize;
use subtitle_align::{AlignerConfig, AlignmentDiagnostics, AlignmentRecord, AlignmentSummary};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct Meta<'a> {
    pub generated_at: String,
    pub source_path: String,
    pub target_path: String,
    pub provider: &'a str,
    pub config: &'a AlignerConfig,
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub schema_version: u32,
    pub meta: Meta<'a>,
    pub summary: &'a AlignmentSummary,
    pub diagnostics: &'a AlignmentDiagnostics,
    pub records: &'a [AlignmentRecord],
}

/// Pretty JSON with a trailing newline.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|err| format!("Failed to serialize report JSON: {err}"))?;
    text.push('\n');
    Ok(text)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), String> {
    let text = render_json(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create '{}': {err}", parent.display()))?;
    }
    fs::write(path, text).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
}
