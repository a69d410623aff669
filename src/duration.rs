//! Free-text duration parsing and human-readable duration rendering.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?|\.\d+)\s*([wdh]|m)").expect("invalid duration regex"));

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3600;
/// Tracker working day: 8 hours.
pub const SECONDS_PER_DAY: u64 = 8 * SECONDS_PER_HOUR;
/// Tracker working week: 5 working days.
pub const SECONDS_PER_WEEK: u64 = 5 * SECONDS_PER_DAY;

fn unit_seconds(unit: &str) -> u64 {
    match unit {
        "w" => SECONDS_PER_WEEK,
        "d" => SECONDS_PER_DAY,
        "h" => SECONDS_PER_HOUR,
        _ => SECONDS_PER_MINUTE,
    }
}

/// Parses "1w 2d 3h 4m" style text into seconds.
///
/// Tokens are case-insensitive, may be combined in any subset and carry decimal
/// magnitudes ("1.5h"). A bare number is read as minutes. Anything else yields 0,
/// which callers treat as "no usable duration" rather than as an error.
pub fn parse_duration(text: &str) -> u64 {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return 0;
    }

    let mut total = 0f64;
    let mut matched = false;
    for capture in DURATION_TOKEN_REGEX.captures_iter(&normalized) {
        let Ok(value) = capture[1].parse::<f64>() else {
            continue;
        };
        matched = true;
        total += value * unit_seconds(&capture[2]) as f64;
    }

    if !matched {
        if let Ok(minutes) = normalized.parse::<f64>() {
            total = minutes * SECONDS_PER_MINUTE as f64;
        }
    }

    if total.is_finite() && total > 0.0 {
        total.trunc() as u64
    } else {
        0
    }
}

/// "1h 1m", "45m", "<1m" for a nonzero sub-minute value, "0m" for zero.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "0m".to_string();
    }

    let hours = seconds / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if parts.is_empty() {
        return "<1m".to_string();
    }
    parts.join(" ")
}

/// Live clock for a running timer started at `start_ms` (epoch milliseconds).
pub fn format_live_duration(start_ms: i64) -> String {
    let elapsed_ms = Utc::now().timestamp_millis().saturating_sub(start_ms).max(0);
    format_elapsed_clock((elapsed_ms / 1000) as u64)
}

/// Always shows minutes and seconds; hours only once there are any.
pub fn format_elapsed_clock(seconds: u64) -> String {
    let hours = seconds / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else {
        format!("{}m {}s", minutes, secs)
    }
}
