use crate::locator::Locator;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// What a step does in the browser.
///
/// Anything the planner emits that is not one of the known words becomes
/// [`Action::Unknown`]; it is rejected when the step runs, not when the plan loads,
/// so the rest of the plan still executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate,
    Click,
    Fill,
    Wait,
    Verify,
    Screenshot,
    Unknown(String),
}

impl Action {
    /// Short name for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Wait => "wait",
            Self::Verify => "verify",
            Self::Screenshot => "screenshot",
            Self::Unknown(other) => other,
        }
    }

    /// Parse an action word, case-insensitively.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "navigate" => Self::Navigate,
            "click" => Self::Click,
            "fill" => Self::Fill,
            "wait" => Self::Wait,
            "verify" => Self::Verify,
            "screenshot" => Self::Screenshot,
            _ => Self::Unknown(s.trim().to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(ActionVisitor)
    }
}

struct ActionVisitor;

impl<'de> Visitor<'de> for ActionVisitor {
    type Value = Action;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an action name (navigate, click, fill, wait, verify, screenshot)")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Action::parse(value))
    }
}

/// One step of a reproduction plan, as produced by the planner.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    /// Position in the plan. Zero means "not given"; the loader fills it in.
    #[serde(default)]
    pub step_number: u32,

    pub action: Action,

    /// Free-text description of the element or page the step acts on.
    #[serde(default, alias = "target_description")]
    pub target: String,

    /// Locators supplied by the planner, tried in order before any generated ones.
    #[serde(default, alias = "explicit_locators", alias = "locators")]
    pub selectors: Vec<Locator>,

    /// URL for navigate, text for fill, milliseconds for wait.
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,

    /// Capture a screenshot after the step succeeds.
    #[serde(default)]
    pub screenshot: bool,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub expected_result: Option<String>,
}

impl Step {
    /// Build a step in code (tests, embedding).
    pub fn new(step_number: u32, action: Action, target: impl Into<String>) -> Self {
        Self {
            step_number,
            action,
            target: target.into(),
            selectors: Vec::new(),
            value: None,
            screenshot: false,
            description: None,
            expected_result: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selectors = selectors.into_iter().map(|s| Locator::parse(s.as_ref())).collect();
        self
    }

    pub fn with_screenshot(mut self) -> Self {
        self.screenshot = true;
        self
    }

    pub fn navigate(step_number: u32, url: impl Into<String>) -> Self {
        Self::new(step_number, Action::Navigate, "application URL").with_value(url)
    }

    pub fn click(step_number: u32, target: impl Into<String>) -> Self {
        Self::new(step_number, Action::Click, target)
    }

    pub fn fill(step_number: u32, target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(step_number, Action::Fill, target).with_value(value)
    }

    pub fn wait(step_number: u32, ms: u64) -> Self {
        Self::new(step_number, Action::Wait, "").with_value(ms.to_string())
    }

    pub fn verify(step_number: u32, target: impl Into<String>) -> Self {
        Self::new(step_number, Action::Verify, target)
    }

    pub fn screenshot(step_number: u32) -> Self {
        Self::new(step_number, Action::Screenshot, "page")
    }

    /// The step value with surrounding whitespace removed, if any is left.
    pub fn value_trimmed(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Planners write `value: 2000` as often as `value: "2000"`; accept any scalar.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(de::Error::custom("step value must be a string or a scalar")),
    }
}
