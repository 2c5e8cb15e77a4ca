//! Locator expressions and the logic that derives them from a free-text target.

pub mod candidates;
pub mod context;

pub use candidates::{classify, generate, Family};
pub use context::{extract_context, extract_number, is_sensitive, mask, ExecutionContext};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single way of finding elements.
///
/// The variant is decided once, from the syntax of the source string, so the
/// driver never has to sniff strings itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// `button.primary`, `input[name='email']`
    Css(String),
    /// `//h5[contains(., 'x')]`, or anything prefixed `xpath=`
    XPath(String),
    /// `text=Complete` - element whose own trimmed text equals this, ignoring case
    Text(String),
}

/// Selectors that match "any element of this kind". Acting on the first of many
/// matches for one of these is a guess.
const GENERIC_TIER: &[&str] = &[
    "button",
    ".btn",
    ".button",
    "button[type='button']",
    "button[type='submit']",
    "input[type='submit']",
    "a",
    ".link",
    "a[role='button']",
    "[role='tab']",
    ".nav-link",
    ".nav-item a",
    ".tab",
    ".tab-button",
    "input",
    "h1",
    "h2",
    "h3",
    "div",
    "span",
    "p",
];

impl Locator {
    /// Decide the locator kind from its syntax.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(v) = s.strip_prefix("xpath=") {
            return Locator::XPath(v.trim().into());
        }
        if let Some(v) = s.strip_prefix("css=") {
            return Locator::Css(v.trim().into());
        }
        if let Some(v) = s.strip_prefix("text=") {
            return Locator::Text(v.trim().into());
        }
        if s.starts_with("//") || s.starts_with("(//") || s.starts_with("./") {
            return Locator::XPath(s.into());
        }
        Locator::Css(s.into())
    }

    pub fn css(s: impl Into<String>) -> Self {
        Locator::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Locator::XPath(s.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Locator::Text(s.into())
    }

    /// The bare expression, without any kind prefix.
    pub fn expr(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) | Locator::Text(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css",
            Locator::XPath(_) => "xpath",
            Locator::Text(_) => "text",
        }
    }

    /// Whether this is a last-resort locator that says nothing about which element is meant.
    pub fn is_generic(&self) -> bool {
        matches!(self, Locator::Css(s) if GENERIC_TIER.contains(&s.as_str()))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => f.write_str(s),
            Locator::XPath(s) if s.starts_with("//") || s.starts_with("(//") => f.write_str(s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
            Locator::Text(s) => write!(f, "text={}", s),
        }
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator::parse(s)
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Locator::parse(&s))
    }
}

/// Quote `s` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so text containing both quote kinds is
/// spliced together with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Quote `s` as a CSS attribute-value string.
pub fn css_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// XPath expression for the lower-cased, whitespace-normalized text of the context node.
pub(crate) const LOWER_TEXT: &str =
    "translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz')";
