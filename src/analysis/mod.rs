//! Page analysis and test-case validation
//!
//! The pipeline treats analysis and validation as capabilities behind two
//! traits, [`PageAnalyzer`] and [`TestValidator`]. This module defines the
//! result model they exchange plus the built-in implementations:
//! - [`HeuristicAnalyzer`]: element extraction and template-based test cases
//! - [`RuleValidator`]: offline structural review
//! - [`ChatValidator`]: review through an OpenAI-compatible chat endpoint

mod chat;
mod elements;
mod heuristic;
mod rules;

pub use chat::ChatValidator;
pub use elements::{extract_page_elements, FormControl, FormElement, PageElements};
pub use heuristic::HeuristicAnalyzer;
pub(crate) use heuristic::escape_ts;
pub use rules::RuleValidator;

use crate::url::pascal_case;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Placeholder written when normalization finds no preconditions
pub const NO_PRECONDITIONS: &str = "No specific preconditions";

/// Errors from the analysis step
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Empty HTML content provided")]
    EmptyHtml,

    #[error("Invalid URL provided: {0}")]
    InvalidUrl(String),

    #[error("Analysis failed: {0}")]
    Failed(String),
}

/// Errors from the validation step
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Validator not configured: {0}")]
    NotConfigured(String),

    #[error("Validation request failed: {0}")]
    RequestFailed(String),

    #[error("Validator returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse validator response: {0}")]
    ParseError(String),
}

/// Turns a page into test cases and a page-object class
#[async_trait]
pub trait PageAnalyzer: Send + Sync {
    async fn analyze(&self, html: &str, url: &str) -> Result<PipelineResult, AnalysisError>;
}

/// Reviews generated test cases, returning free-form feedback
#[async_trait]
pub trait TestValidator: Send + Sync {
    async fn validate(
        &self,
        test_cases: &[TestCase],
        pom_code: &str,
    ) -> Result<String, ValidationError>;
}

/// Output of one page analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    #[serde(default)]
    pub test_cases: Vec<TestCase>,

    #[serde(default)]
    pub pom_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// Set by analyzers that report failure in-band
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    /// True when the result carries test cases and page-object code
    pub fn is_complete(&self) -> bool {
        !self.test_cases.is_empty() && !self.pom_code.trim().is_empty()
    }
}

/// A single generated test case
///
/// Fields the pipeline doesn't interpret (test data, accessibility notes and
/// so on) are kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub title: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub priority: String,

    #[serde(default)]
    pub preconditions: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default)]
    pub expected_results: ExpectedResults,

    #[serde(default)]
    pub edge_cases: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCase {
    /// Fills the optional fields downstream stages rely on
    pub fn normalize(&mut self) {
        if self.preconditions.is_none() {
            self.preconditions = Some(NO_PRECONDITIONS.to_string());
        }
        if self.edge_cases.is_none() {
            self.edge_cases = Some(Vec::new());
        }
    }

    pub fn preconditions_text(&self) -> &str {
        self.preconditions.as_deref().unwrap_or(NO_PRECONDITIONS)
    }

    pub fn edge_cases(&self) -> &[String] {
        self.edge_cases.as_deref().unwrap_or(&[])
    }
}

/// One action in a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub action: String,

    #[serde(default)]
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What a test case expects to observe
///
/// Analyzers put the target URL or selector either at the top level or under
/// `details`; [`target_url`](Self::target_url) and
/// [`target_selector`](Self::target_selector) look in both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedResults {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ExpectedResults {
    fn detail_str(&self, name: &str) -> Option<&str> {
        self.details.as_ref()?.get(name)?.as_str()
    }

    pub fn target_url(&self) -> Option<&str> {
        self.url.as_deref().or_else(|| self.detail_str("url"))
    }

    pub fn target_selector(&self) -> Option<&str> {
        self.selector
            .as_deref()
            .or_else(|| self.detail_str("selector"))
    }
}

/// Converts a step field or selector into a method-name suffix
///
/// Words are split on non-alphanumeric characters and joined in PascalCase,
/// so `form1Submit` becomes `Form1Submit` and `.nav-bar` becomes `NavBar`.
pub fn member_suffix(field: &str) -> String {
    pascal_case(field)
}

impl Step {
    /// Page-object method a generated test calls for this step, if any
    pub fn pom_method(&self) -> Option<String> {
        let suffix = member_suffix(&self.field);
        match self.action.as_str() {
            "fill" => Some(format!("fill{}", suffix)),
            "click" => Some(format!("click{}", suffix)),
            "assert" => Some(format!("assert{}Exists", suffix)),
            _ => None,
        }
    }
}

impl ExpectedResults {
    /// Page-object getter used for an `elementVisible` expectation
    pub fn pom_getter(&self) -> Option<String> {
        self.target_selector()
            .map(|selector| format!("get{}", member_suffix(selector)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_test_case() {
        let tc: TestCase = serde_json::from_value(json!({
            "title": "Login",
            "steps": [{"action": "click", "field": "submit"}],
            "expectedResults": {"type": "redirect", "url": "/dashboard"}
        }))
        .unwrap();

        assert_eq!(tc.title, "Login");
        assert!(tc.preconditions.is_none());
        assert!(tc.edge_cases.is_none());
        assert_eq!(tc.expected_results.target_url(), Some("/dashboard"));
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let mut tc: TestCase = serde_json::from_value(json!({"title": "t"})).unwrap();
        tc.normalize();
        assert_eq!(tc.preconditions.as_deref(), Some(NO_PRECONDITIONS));
        assert_eq!(tc.edge_cases, Some(vec![]));
    }

    #[test]
    fn test_normalize_keeps_existing_values() {
        let mut tc: TestCase = serde_json::from_value(json!({
            "title": "t",
            "preconditions": "Logged in",
            "edgeCases": ["Offline"]
        }))
        .unwrap();
        tc.normalize();
        assert_eq!(tc.preconditions_text(), "Logged in");
        assert_eq!(tc.edge_cases(), ["Offline".to_string()]);
    }

    #[test]
    fn test_unknown_fields_survive() {
        let input = json!({
            "title": "t",
            "testData": {"valid": ["a"]},
            "expectedResults": {"type": "success"}
        });
        let tc: TestCase = serde_json::from_value(input).unwrap();
        let back = serde_json::to_value(&tc).unwrap();
        assert_eq!(back["testData"], json!({"valid": ["a"]}));
    }

    #[test]
    fn test_selector_from_details() {
        let expected: ExpectedResults = serde_json::from_value(json!({
            "type": "elementVisible",
            "details": {"selector": "nav"}
        }))
        .unwrap();
        assert_eq!(expected.target_selector(), Some("nav"));
        assert_eq!(expected.target_url(), None);
    }

    #[test]
    fn test_result_completeness() {
        let mut result: PipelineResult =
            serde_json::from_value(json!({"testCases": [{"title": "t"}], "pomCode": ""}))
                .unwrap();
        assert!(!result.is_complete());

        result.pom_code = "export class HomePage {}".to_string();
        assert!(result.is_complete());
    }

    #[test]
    fn test_error_marker_deserializes() {
        let result: PipelineResult =
            serde_json::from_value(json!({"error": "Analysis error"})).unwrap();
        assert_eq!(result.error.as_deref(), Some("Analysis error"));
        assert!(result.test_cases.is_empty());
    }

    #[test]
    fn test_member_suffix() {
        assert_eq!(member_suffix("nav"), "Nav");
        assert_eq!(member_suffix("form1Submit"), "Form1Submit");
        assert_eq!(member_suffix(".nav-bar"), "NavBar");
        assert_eq!(member_suffix("user name"), "UserName");
    }

    #[test]
    fn test_step_pom_method() {
        let fill: Step =
            serde_json::from_value(json!({"action": "fill", "field": "username", "value": "x"}))
                .unwrap();
        assert_eq!(fill.pom_method().as_deref(), Some("fillUsername"));

        let check: Step =
            serde_json::from_value(json!({"action": "assert", "field": "nav"})).unwrap();
        assert_eq!(check.pom_method().as_deref(), Some("assertNavExists"));

        let wait: Step = serde_json::from_value(json!({"action": "wait"})).unwrap();
        assert!(wait.pom_method().is_none());
    }
}
