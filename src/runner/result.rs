use crate::locator::{extract_number, Locator};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    /// Something relevant was found on the page, but no single element.
    Partial,
    /// Not produced by the engine; part of the output contract for analysis stages.
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one step. Exactly one per input step, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub step_number: u32,
    pub action: String,
    pub target: String,
    pub status: StepStatus,
    pub message: String,
    /// Only set on success.
    pub matched_locator: Option<Locator>,
    pub extracted_text: Option<String>,
    /// First run of digits in `extracted_text`.
    pub extracted_number: Option<i64>,
    /// `Some` only when the step checked an expected location.
    pub location_verified: Option<bool>,
    pub artifact_ref: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    fn new(status: StepStatus, message: impl Into<String>) -> Self {
        Self {
            step_number: 0,
            action: String::new(),
            target: String::new(),
            status,
            message: message.into(),
            matched_locator: None,
            extracted_text: None,
            extracted_number: None,
            location_verified: None,
            artifact_ref: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StepStatus::Success, message)
    }

    pub fn partial(message: impl Into<String>) -> Self {
        Self::new(StepStatus::Partial, message)
    }

    /// A failed result whose `error` carries the failure text.
    pub fn failed(error: &crate::Error) -> Self {
        let text = error.to_string();
        let mut result = Self::new(StepStatus::Failed, text.clone());
        result.error = Some(text);
        result
    }

    /// Record the locator that matched. Ignored unless the step succeeded.
    pub fn with_locator(mut self, locator: Locator) -> Self {
        if self.status == StepStatus::Success {
            self.matched_locator = Some(locator);
        }
        self
    }

    /// Record extracted text and the number in it, if any.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.extracted_number = extract_number(&text);
        self.extracted_text = Some(text);
        self
    }

    pub fn with_location(mut self, verified: bool) -> Self {
        self.location_verified = Some(verified);
        self
    }

    pub fn with_artifact(mut self, reference: Option<String>) -> Self {
        if reference.is_some() {
            self.artifact_ref = reference;
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<ExecutionResult>,
    /// A navigate step failed and the remaining steps were not attempted.
    pub aborted: bool,
    /// The browser session failed; every step from that point is `failed`.
    pub fatal_error: Option<String>,
    pub duration_ms: u64,
}

impl RunReport {
    fn count(&self, status: StepStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(StepStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(StepStatus::Failed)
    }

    pub fn partial(&self) -> usize {
        self.count(StepStatus::Partial)
    }

    /// The run went through every step without aborting or losing the browser.
    pub fn completed(&self) -> bool {
        !self.aborted && self.fatal_error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn locator_only_kept_on_success() {
        let ok = ExecutionResult::success("clicked").with_locator(Locator::css("#a"));
        assert_eq!(ok.matched_locator, Some(Locator::css("#a")));

        let partial = ExecutionResult::partial("text only").with_locator(Locator::css("#a"));
        assert_eq!(partial.matched_locator, None);
    }

    #[test]
    fn number_follows_text() {
        let r = ExecutionResult::success("ok").with_text("Total: 7 items");
        assert_eq!(r.extracted_number, Some(7));
        let r = ExecutionResult::success("ok").with_text("No data");
        assert_eq!(r.extracted_number, None);
    }

    #[test]
    fn failed_carries_error_text() {
        let r = ExecutionResult::failed(&Error::InvalidInput("no value".into()));
        assert_eq!(r.status, StepStatus::Failed);
        assert_eq!(r.error.as_deref(), Some("invalid input: no value"));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(StepStatus::Partial).unwrap(),
            serde_json::json!("partial")
        );
    }
}
