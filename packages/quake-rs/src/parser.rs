use crate::types::Sample;
use std::fmt;
use tokio::time::Instant;

/// Why a raw line did not yield a sample
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Blank line (keep-alive or line-ending noise)
    Empty,
    /// Bytes are not valid UTF-8
    Undecodable,
    /// Line did not split into exactly three comma-separated fields
    FieldCount(usize),
    /// A field is not a finite decimal number
    NotNumeric(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty line"),
            SkipReason::Undecodable => write!(f, "line is not valid UTF-8"),
            SkipReason::FieldCount(n) => write!(f, "expected 3 fields, found {}", n),
            SkipReason::NotNumeric(field) => write!(f, "'{}' is not a number", field),
        }
    }
}

/// Result of parsing one raw line
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Sample(Sample),
    Skip(SkipReason),
}

/// Parse one `x,y,z` line received at `observed_at`.
///
/// Surrounding whitespace (including `\r\n`) is ignored, as is whitespace
/// around each field. Malformed input never aborts the caller; it is reported
/// as a [`SkipReason`].
pub fn parse_line(raw: &[u8], observed_at: Instant) -> ParseOutcome {
    let text = match std::str::from_utf8(raw) {
        Ok(t) => t.trim(),
        Err(_) => return ParseOutcome::Skip(SkipReason::Undecodable),
    };

    if text.is_empty() {
        return ParseOutcome::Skip(SkipReason::Empty);
    }

    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 3 {
        return ParseOutcome::Skip(SkipReason::FieldCount(fields.len()));
    }

    let mut axes = [0.0f64; 3];
    for (slot, field) in axes.iter_mut().zip(&fields) {
        match parse_axis(field) {
            Some(v) => *slot = v,
            None => return ParseOutcome::Skip(SkipReason::NotNumeric(field.trim().to_string())),
        }
    }

    ParseOutcome::Sample(Sample::new(axes[0], axes[1], axes[2], observed_at))
}

fn parse_axis(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
