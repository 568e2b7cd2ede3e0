//! Progress events classified from generator output lines.

use std::sync::OnceLock;

use regex::bytes::Regex;
use serde::Serialize;

/// One classified line of generator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Percentage from a bar-style progress line, 0..=100.
    Progress(u8),
    /// Anything else, decoded lossily.
    Message(String),
}

/// Point-in-time view of overall job progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Overall completion in [0, 1].
    pub fraction: f64,
    pub description: Option<String>,
    pub stage: Option<&'static str>,
}

/// Published to the caller whenever the snapshot changes.
pub type ProgressUpdate = ProgressSnapshot;

fn bar_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // regex is a finite automaton, so matching stays linear in the line length
    PATTERN.get_or_init(|| Regex::new(r"(\d+)%\|").expect("progress pattern is valid"))
}

/// Classify one line of output (terminator already stripped).
///
/// Lines containing `<digits>%|` become [`ProgressEvent::Progress`] using the
/// first occurrence. Percentages above 100 are clamped. If the digits do not
/// fit an integer the line is kept as a message instead.
pub fn classify(raw: &[u8]) -> ProgressEvent {
    let line = strip_line_ending(raw);

    if let Some(caps) = bar_pattern().captures(line) {
        let percent = caps
            .get(1)
            .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
            .and_then(|digits| digits.parse::<u32>().ok());
        if let Some(percent) = percent {
            return ProgressEvent::Progress(percent.min(100) as u8);
        }
    }

    ProgressEvent::Message(String::from_utf8_lossy(line).into_owned())
}

fn strip_line_ending(raw: &[u8]) -> &[u8] {
    let mut end = raw.len();
    while end > 0 && matches!(raw[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &raw[..end]
}
