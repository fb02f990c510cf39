//! Playwright test generation
//!
//! Each test case becomes one `test(...)` block driving the page object the
//! analyzer produced. Steps map onto page-object methods through
//! [`Step::pom_method`](crate::analysis::Step::pom_method), so generated tests
//! and the generated class agree on names.

use crate::analysis::{escape_ts, ExpectedResults, Step, TestCase};
use crate::url::page_class_name;
use url::Url;

/// Name of the first exported class in a page-object module
pub fn exported_class(pom_code: &str) -> Option<&str> {
    let start = pom_code.find("export class ")? + "export class ".len();
    let rest = &pom_code[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Renders the test file for one page
///
/// `pom_import` is the module specifier of the page-object file. The class
/// name is read from `pom_code`, falling back to the name derived from the URL.
pub fn generate_test_code(
    test_cases: &[TestCase],
    pom_code: &str,
    page_url: &Url,
    pom_import: &str,
) -> String {
    let class = exported_class(pom_code)
        .map(str::to_string)
        .unwrap_or_else(|| page_class_name(page_url));

    let mut out = String::new();
    out.push_str("import { test, expect } from '@playwright/test';\n");
    out.push_str(&format!("import {{ {} }} from '{}';\n\n", class, pom_import));

    for tc in test_cases {
        out.push_str(&format!(
            "test('{}', async ({{ page }}) => {{\n",
            escape_ts(&tc.title)
        ));
        out.push_str(&format!("  const pageObject = new {}(page);\n", class));
        out.push_str(&format!("  // {}\n", single_line(tc.preconditions_text())));
        out.push_str(&format!(
            "  await pageObject.goto('{}');\n",
            escape_ts(page_url.as_str())
        ));

        for step in &tc.steps {
            out.push_str(&step_line(step));
        }
        out.push_str(&expectation_line(&tc.expected_results));
        out.push_str("});\n\n");
    }

    out
}

fn step_line(step: &Step) -> String {
    match (step.action.as_str(), step.pom_method()) {
        ("fill", Some(method)) => format!(
            "  await pageObject.{}('{}');\n",
            method,
            escape_ts(step.value.as_deref().unwrap_or_default())
        ),
        (_, Some(method)) => format!("  await pageObject.{}();\n", method),
        (action, None) => {
            let mut line = format!("  // {} {}", single_line(action), single_line(&step.field));
            if let Some(description) = &step.description {
                line.push_str(": ");
                line.push_str(&single_line(description));
            }
            line.push('\n');
            line
        }
    }
}

fn expectation_line(expected: &ExpectedResults) -> String {
    match expected.kind.as_str() {
        "redirect" => match expected.target_url() {
            Some(url) => format!("  await expect(page).toHaveURL('{}');\n", escape_ts(url)),
            None => "  // redirect expected, no target url given\n".to_string(),
        },
        "elementVisible" => match expected.pom_getter() {
            Some(getter) => format!(
                "  await expect(pageObject.{}()).toBeVisible();\n",
                getter
            ),
            None => "  // elementVisible expected, no selector given\n".to_string(),
        },
        "" => String::new(),
        other => format!("  // expect: {}\n", single_line(other)),
    }
}

/// Keeps free text inside a `//` comment
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
