//! Per-run side outputs
//!
//! Every processed page adds its test cases to the run's listing. After each
//! page both files are rewritten from the accumulated state:
//! - `test_cases.json`: `{"testCases": [...]}`, each case tagged with `pageUrl`
//! - `test_cases.md`: one table per page

use crate::analysis::TestCase;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const JSON_FILE: &str = "test_cases.json";
pub const MARKDOWN_FILE: &str = "test_cases.md";

/// Placeholder written when a validator returns nothing
pub const EMPTY_FEEDBACK: &str = "Validation produced no feedback";

/// Errors raised while writing run outputs
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedCase<'a> {
    page_url: &'a str,
    #[serde(flatten)]
    case: &'a TestCase,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Listing<'a> {
    test_cases: Vec<ListedCase<'a>>,
}

/// Test-case listing for one run, kept in page order
#[derive(Debug)]
pub struct RunReport {
    dir: PathBuf,
    pages: Vec<(String, Vec<TestCase>)>,
}

impl RunReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pages: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Total test cases recorded so far
    pub fn case_count(&self) -> usize {
        self.pages.iter().map(|(_, cases)| cases.len()).sum()
    }

    /// Records a page's test cases and rewrites both output files
    ///
    /// # Arguments
    ///
    /// * `page_url` - URL the cases were generated for
    /// * `cases` - Normalized test cases for that page
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Both files were written
    /// * `Err(ReportError)` - Directory creation, serialization or a write failed
    pub fn record(&mut self, page_url: &str, cases: &[TestCase]) -> ReportResult<()> {
        match self.pages.iter_mut().find(|(url, _)| url == page_url) {
            Some((_, existing)) => *existing = cases.to_vec(),
            None => self.pages.push((page_url.to_string(), cases.to_vec())),
        }

        std::fs::create_dir_all(&self.dir)?;
        write_file(&self.dir.join(JSON_FILE), &self.to_json()?)?;
        write_file(&self.dir.join(MARKDOWN_FILE), &self.to_markdown())?;
        Ok(())
    }

    fn to_json(&self) -> ReportResult<String> {
        let listing = Listing {
            test_cases: self
                .pages
                .iter()
                .flat_map(|(url, cases)| {
                    cases.iter().map(move |case| ListedCase {
                        page_url: url.as_str(),
                        case,
                    })
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&listing)?)
    }

    /// Formats the accumulated cases as markdown tables
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Generated Test Cases\n\n");

        for (url, cases) in &self.pages {
            md.push_str(&format!("## {}\n\n", url));
            md.push_str("| Title | Preconditions | Steps | Expected Results | Edge Cases |\n");
            md.push_str("|-------|---------------|-------|------------------|------------|\n");
            for tc in cases {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    cell(&tc.title),
                    cell(tc.preconditions_text()),
                    cell(&steps_summary(tc)),
                    cell(&expected_summary(tc)),
                    cell(&tc.edge_cases().join("; "))
                ));
            }
            md.push('\n');
        }

        md
    }
}

/// Writes validation feedback, substituting a placeholder for empty text
pub fn write_feedback(path: &Path, feedback: &str) -> ReportResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = if feedback.trim().is_empty() {
        EMPTY_FEEDBACK
    } else {
        feedback
    };
    write_file(path, text)
}

fn write_file(path: &Path, content: &str) -> ReportResult<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn steps_summary(tc: &TestCase) -> String {
    tc.steps
        .iter()
        .map(|step| {
            let mut text = format!("{} {}", step.action, step.field);
            if let Some(value) = step.value.as_deref().filter(|v| !v.is_empty()) {
                text.push_str(&format!(" with '{}'", value));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn expected_summary(tc: &TestCase) -> String {
    let expected = &tc.expected_results;
    match expected.target_url().or_else(|| expected.target_selector()) {
        Some(target) => format!("{} ({})", expected.kind, target),
        None => expected.kind.clone(),
    }
}

/// Keeps a value inside its table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
