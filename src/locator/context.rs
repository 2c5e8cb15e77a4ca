use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("valid regex")
});

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"in (?:the )?(\w+) (?:tab|section|area)").expect("valid regex")
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// What a verify target says about where the checked text should be.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    /// Text quoted in the target, e.g. `The Idea Jar`.
    pub anchor_text: Option<String>,
    /// Lower-cased container name from "in the X tab/section/area".
    pub expected_location: Option<String>,
}

impl ExecutionContext {
    /// Both an anchor and a location are known, so the check is location-strict.
    pub fn is_strict(&self) -> bool {
        self.anchor_text.is_some() && self.expected_location.is_some()
    }
}

/// Extract anchor text and expected location from a target description.
pub fn extract_context(target: &str) -> ExecutionContext {
    ExecutionContext {
        anchor_text: anchor_text(target),
        expected_location: LOCATION
            .captures(&target.to_lowercase())
            .map(|c| c[1].to_string()),
    }
}

/// Text inside the first matching pair of quotes. The other quote kind may
/// appear inside, as in `"Bob's Groceries"`. An empty pair counts as none.
pub fn anchor_text(target: &str) -> Option<String> {
    QUOTED
        .captures(target)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

/// First run of ASCII digits in `text`, as a number.
///
/// A run too long for `i64` saturates at `i64::MAX` rather than being dropped.
pub fn extract_number(text: &str) -> Option<i64> {
    NUMBER
        .find(text)
        .map(|m| m.as_str().parse().unwrap_or(i64::MAX))
}

/// Whether values typed into this target must never be logged or read back.
pub fn is_sensitive(target: &str) -> bool {
    target.to_lowercase().contains("password")
}

/// One `*` per character.
pub fn mask(value: &str) -> String {
    "*".repeat(value.chars().count())
}
