//! Offline validator
//!
//! Checks that each test case is well formed and that every page-object method
//! the generated test will call is actually defined in the page-object code.

use crate::analysis::{TestCase, TestValidator, ValidationError};
use async_trait::async_trait;

/// Expectation types the code generator knows how to assert
const ASSERTED_KINDS: &[&str] = &["redirect", "elementVisible"];

#[derive(Debug, Default, Clone)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }

    /// Collects one finding per problem, prefixed with the test case title
    pub fn review(&self, test_cases: &[TestCase], pom_code: &str) -> Vec<String> {
        let mut findings = Vec::new();

        if !pom_code.contains("export class") {
            findings.push("Page object code does not export a class".to_string());
        }

        for (index, tc) in test_cases.iter().enumerate() {
            let label = if tc.title.trim().is_empty() {
                format!("Test case {}", index + 1)
            } else {
                tc.title.clone()
            };

            if tc.title.trim().is_empty() {
                findings.push(format!("[{}] missing title", label));
            }

            if tc.steps.is_empty() {
                findings.push(format!("[{}] has no steps", label));
            }

            for step in &tc.steps {
                if step.action == "fill" && step.value.is_none() {
                    findings.push(format!(
                        "[{}] fill step on '{}' has no value",
                        label, step.field
                    ));
                }
                if let Some(method) = step.pom_method() {
                    if !defines_method(pom_code, &method) {
                        findings.push(format!(
                            "[{}] step calls {}() which the page object does not define",
                            label, method
                        ));
                    }
                }
            }

            let expected = &tc.expected_results;
            if expected.kind.is_empty() {
                findings.push(format!("[{}] expected results have no type", label));
            } else if !ASSERTED_KINDS.contains(&expected.kind.as_str()) {
                findings.push(format!(
                    "[{}] expected result '{}' is not asserted in generated code",
                    label, expected.kind
                ));
            }

            if expected.kind == "redirect" && expected.target_url().is_none() {
                findings.push(format!("[{}] redirect expectation has no url", label));
            }

            if expected.kind == "elementVisible" {
                match expected.pom_getter() {
                    Some(getter) if defines_method(pom_code, &getter) => {}
                    Some(getter) => findings.push(format!(
                        "[{}] expectation uses {}() which the page object does not define",
                        label, getter
                    )),
                    None => findings.push(format!(
                        "[{}] elementVisible expectation has no selector",
                        label
                    )),
                }
            }

            if tc.edge_cases().is_empty() {
                findings.push(format!("[{}] lists no edge cases", label));
            }
        }

        findings
    }
}

fn defines_method(pom_code: &str, name: &str) -> bool {
    let call = format!("{}(", name);
    pom_code.lines().any(|line| {
        let line = line.trim_start();
        let line = line.strip_prefix("async ").unwrap_or(line);
        line.starts_with(&call)
    })
}

#[async_trait]
impl TestValidator for RuleValidator {
    async fn validate(
        &self,
        test_cases: &[TestCase],
        pom_code: &str,
    ) -> Result<String, ValidationError> {
        let findings = self.review(test_cases, pom_code);

        if findings.is_empty() {
            return Ok(format!(
                "No issues found in {} test case(s).",
                test_cases.len()
            ));
        }

        let mut feedback = format!("{} issue(s) found:\n", findings.len());
        for finding in findings {
            feedback.push_str(&format!("- {}\n", finding));
        }
        Ok(feedback)
    }
}
