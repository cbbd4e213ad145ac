use thiserror::Error;

/// Why a timestamp could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("expected 3 ':'-separated fields, found {0}")]
    SegmentCount(usize),
    #[error("{0} field is not numeric")]
    NonNumeric(&'static str),
}

/// Strict parse of `H:M:S,fff` / `H:M:S.fff` into seconds.
///
/// Fields may have any digit count (`1:2:3.4` is 1 h 2 min 3.4 s).
pub fn parse_timestamp(raw: &str) -> Result<f64, TimestampError> {
    let normalized = raw.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return Err(TimestampError::SegmentCount(parts.len()));
    }

    let hours: u64 = parse_integer_field(parts[0], "hours")?;
    let minutes: u64 = parse_integer_field(parts[1], "minutes")?;
    let seconds_field = parts[2].trim();
    if seconds_field.is_empty()
        || !seconds_field
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.')
        || seconds_field.matches('.').count() > 1
    {
        return Err(TimestampError::NonNumeric("seconds"));
    }
    let seconds: f64 = seconds_field
        .parse()
        .map_err(|_| TimestampError::NonNumeric("seconds"))?;

    let total = hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds;
    if !total.is_finite() {
        return Err(TimestampError::NonNumeric("seconds"));
    }
    Ok(total)
}

fn parse_integer_field(field: &str, name: &'static str) -> Result<u64, TimestampError> {
    let field = field.trim();
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return Err(TimestampError::NonNumeric(name));
    }
    field.parse().map_err(|_| TimestampError::NonNumeric(name))
}

/// Lenient normalization: any parse failure yields 0 so one malformed cue
/// cannot abort a whole track. Use [`parse_timestamp`] to detect failures.
pub fn to_seconds(raw: &str) -> f64 {
    parse_timestamp(raw).unwrap_or(0.0)
}

/// Renders seconds as `HH:MM:SS,mmm`. Negative and non-finite input renders as zero.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours:02}:{minutes:02}:{secs:02},{ms:03}")
}

/// Adds `millis` to a raw timestamp. Unparsable input is returned unchanged.
pub fn offset_timestamp(raw: &str, millis: i64) -> String {
    match parse_timestamp(raw) {
        Ok(seconds) => format_srt_timestamp(seconds + millis as f64 / 1000.0),
        Err(_) => raw.to_string(),
    }
}
