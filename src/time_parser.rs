//! Timer durations from free-text cooking instructions.
//!
//! Best-effort heuristic: "Simmer for 10 minutes" → 600s, "Rest 45 seconds"
//! → 45s. Minutes take priority over seconds. A range such as "2-3 minutes"
//! or "2 to 3 minutes" resolves to its lower bound, and the hyphenated
//! "10-minute rest" counts too. Fractional amounts ("1.5 minutes") give no
//! timer.

use std::sync::LazyLock;

use regex::Regex;

// Group 1 is the whole number, group 2 a fractional part. The leading
// class keeps "1.5" from matching as "5".
static MINUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^\w.])(\d+)(\.\d+)?(?:\s*(?:-|–|to)\s*\d+(?:\.\d+)?)?\s*-?\s*(?:minutes?|mins?)\b",
    )
    .expect("minutes pattern is valid")
});

static SECONDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[^\w.])(\d+)(\.\d+)?(?:\s*(?:-|–|to)\s*\d+(?:\.\d+)?)?\s*-?\s*(?:seconds?|secs?)\b",
    )
    .expect("seconds pattern is valid")
});

fn whole_number(caps: &regex::Captures<'_>) -> Option<u64> {
    if caps.get(2).is_some() {
        return None;
    }
    caps[1].parse().ok()
}

/// Extract a duration in seconds from an instruction, if one is mentioned.
pub fn parse_duration(instruction: &str) -> Option<u64> {
    if let Some(caps) = MINUTES.captures(instruction) {
        return whole_number(&caps)?.checked_mul(60);
    }

    SECONDS
        .captures(instruction)
        .and_then(|caps| whole_number(&caps))
}

/// Format seconds as `M:SS` for the countdown display.
pub fn format_countdown(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
