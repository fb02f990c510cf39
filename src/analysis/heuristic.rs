//! Built-in page analyzer
//!
//! Produces a fixed family of test cases from the elements found on a page
//! (navigation, links, image alt text, one case per form) and a Playwright
//! page-object class whose methods line up with the steps of those cases.

use crate::analysis::elements::{extract_page_elements, FormElement, PageElements};
use crate::analysis::{
    AnalysisError, ExpectedResults, PageAnalyzer, PipelineResult, Step, TestCase,
};
use crate::url::page_class_name;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map};
use url::Url;

/// Control types that accept typed text
const FILLABLE_KINDS: &[&str] = &[
    "text", "email", "password", "search", "tel", "url", "number", "textarea",
];

/// Deterministic analyzer that needs no external service
#[derive(Debug, Default, Clone)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, html: &str, url: &str) -> Result<PipelineResult, AnalysisError> {
        let page_url = Url::parse(url).map_err(|e| AnalysisError::InvalidUrl(e.to_string()))?;
        let elements = extract_page_elements(html)?;

        let test_cases = build_test_cases(&elements);
        let pom_code = build_pom(&page_url, &elements);

        tracing::debug!(
            "Analyzed {}: {} test cases from {} links, {} forms",
            url,
            test_cases.len(),
            elements.links.len(),
            elements.forms.len()
        );

        Ok(PipelineResult {
            test_cases,
            pom_code,
            metadata: Some(json!({
                "url": url,
                "timestamp": Utc::now().to_rfc3339(),
                "elementCounts": elements.counts(),
            })),
            error: None,
        })
    }
}

fn step(action: &str, field: &str, value: Option<&str>, description: &str) -> Step {
    Step {
        action: action.to_string(),
        field: field.to_string(),
        value: value.map(str::to_string),
        description: Some(description.to_string()),
    }
}

fn case(
    title: String,
    category: &str,
    preconditions: String,
    steps: Vec<Step>,
    expected_results: ExpectedResults,
    edge_cases: &[&str],
) -> TestCase {
    TestCase {
        title,
        category: category.to_string(),
        priority: "high".to_string(),
        preconditions: Some(preconditions),
        steps,
        expected_results,
        edge_cases: Some(edge_cases.iter().map(|s| s.to_string()).collect()),
        extra: Map::new(),
    }
}

fn build_test_cases(elements: &PageElements) -> Vec<TestCase> {
    let mut cases = Vec::new();

    if elements.navigation.is_some() {
        cases.push(case(
            "Navigation Menu Accessibility".to_string(),
            "accessibility",
            "Navigation menu is present on the page".to_string(),
            vec![step(
                "assert",
                "nav",
                None,
                "Verify navigation menu is present and accessible",
            )],
            ExpectedResults {
                kind: "elementVisible".to_string(),
                selector: Some("nav".to_string()),
                details: Some(json!({"selector": "nav", "accessibility": true})),
                ..ExpectedResults::default()
            },
            &[
                "Navigation menu not rendered",
                "Navigation menu not keyboard accessible",
            ],
        ));
    }

    if !elements.links.is_empty() {
        cases.push(case(
            "Link Functionality".to_string(),
            "functional",
            "Page contains clickable links".to_string(),
            vec![step(
                "click",
                "link",
                None,
                "Click a link and verify navigation",
            )],
            ExpectedResults {
                kind: "navigation".to_string(),
                details: Some(json!({"verify": "href destination"})),
                ..ExpectedResults::default()
            },
            &["Link href is invalid", "Link target page not found"],
        ));
    }

    if !elements.images.is_empty() {
        cases.push(case(
            "Image Accessibility".to_string(),
            "accessibility",
            "Page contains images".to_string(),
            vec![step(
                "assert",
                "imageAlt",
                None,
                "Verify all images have alt text",
            )],
            ExpectedResults {
                kind: "attribute".to_string(),
                details: Some(json!({"attribute": "alt", "present": true})),
                ..ExpectedResults::default()
            },
            &[
                "Missing alt text",
                "Empty alt text",
                "Non-descriptive alt text",
            ],
        ));
    }

    for n in 1..=elements.forms.len() {
        cases.push(case(
            format!("Form {} Validation", n),
            "functional",
            format!("Form {} is present and accessible on the page", n),
            vec![
                step(
                    "fill",
                    &format!("form{}", n),
                    Some("test"),
                    "Fill form fields with valid data",
                ),
                step(
                    "click",
                    &format!("form{}Submit", n),
                    None,
                    "Submit form",
                ),
            ],
            ExpectedResults {
                kind: "success".to_string(),
                details: Some(json!({"message": "Form submitted successfully"})),
                ..ExpectedResults::default()
            },
            &[
                "Invalid form data",
                "Form submission timeout",
                "Network error during submission",
            ],
        ));
    }

    cases
}

/// Escapes text for a single-quoted TypeScript string literal
pub(crate) fn escape_ts(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn build_pom(url: &Url, elements: &PageElements) -> String {
    let mut getters: Vec<String> = Vec::new();
    let mut actions: Vec<String> = Vec::new();
    let mut assertions: Vec<String> = Vec::new();

    if elements.navigation.is_some() {
        getters.push(getter("Nav", "nav"));
        actions.push(
            "    async navigateToLink(href: string) {\n        await this.page.click(`nav a[href=\"${href}\"]`);\n    }"
                .to_string(),
        );
        assertions.push(
            "    async assertNavExists() {\n        await expect(this.page.locator('nav')).toBeVisible();\n    }"
                .to_string(),
        );
    }

    if !elements.links.is_empty() {
        getters.push(getter("Links", "a"));
        actions.push(
            "    async clickLink(text?: string) {\n        const link = text ? this.page.locator(`a:text(\"${text}\")`) : this.page.locator('a[href]').first();\n        await link.click();\n    }"
                .to_string(),
        );
        assertions.push(
            "    async assertLinkExists(text: string) {\n        await expect(this.page.locator(`a:text(\"${text}\")`)).toBeVisible();\n    }"
                .to_string(),
        );
    }

    if !elements.buttons.is_empty() {
        getters.push(getter(
            "Buttons",
            "button, input[type=\"button\"], input[type=\"submit\"]",
        ));
        actions.push(
            "    async clickButton(text: string) {\n        await this.page.click(`button:text(\"${text}\"), input[type=\"button\"][value=\"${text}\"], input[type=\"submit\"][value=\"${text}\"]`);\n    }"
                .to_string(),
        );
    }

    if !elements.images.is_empty() {
        getters.push(getter("Images", "img"));
        assertions.push(
            "    async assertImageAltExists() {\n        for (const image of await this.page.locator('img').all()) {\n            await expect(image).toHaveAttribute('alt');\n        }\n    }"
                .to_string(),
        );
    }

    if !elements.headings.is_empty() {
        getters.push(getter("Headings", "h1, h2, h3, h4, h5, h6"));
    }

    if !elements.forms.is_empty() {
        getters.push(getter("Forms", "form"));
        for (index, form) in elements.forms.iter().enumerate() {
            actions.push(form_actions(index, form));
        }
        assertions.push(
            "    async assertFormExists(index: number) {\n        await expect(this.page.locator('form').nth(index)).toBeVisible();\n    }"
                .to_string(),
        );
    }

    let mut pom = String::new();
    pom.push_str("import { Page, Locator, expect } from '@playwright/test';\n\n");
    pom.push_str(&format!("export class {} {{\n", page_class_name(url)));
    pom.push_str("    readonly page: Page;\n\n");
    pom.push_str("    constructor(page: Page) {\n        this.page = page;\n    }\n\n");
    pom.push_str("    // Navigation\n");
    pom.push_str(&format!(
        "    async goto() {{\n        await this.page.goto('{}');\n    }}\n",
        escape_ts(url.as_str())
    ));

    for (heading, members) in [
        ("Getters for elements", &getters),
        ("Actions", &actions),
        ("Assertions", &assertions),
    ] {
        if members.is_empty() {
            continue;
        }
        pom.push_str(&format!("\n    // {}\n", heading));
        pom.push_str(&members.join("\n\n"));
        pom.push('\n');
    }

    pom.push_str("}\n");
    pom
}

fn getter(name: &str, selector: &str) -> String {
    format!(
        "    get{}(): Locator {{\n        return this.page.locator('{}');\n    }}",
        name,
        escape_ts(selector)
    )
}

fn form_actions(index: usize, form: &FormElement) -> String {
    let n = index + 1;
    let names: Vec<&str> = form
        .controls
        .iter()
        .filter(|c| !c.name.is_empty() && !c.disabled && FILLABLE_KINDS.contains(&c.kind.as_str()))
        .map(|c| c.name.as_str())
        .collect();
    // JSON string arrays are valid TypeScript literals
    let names = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());

    format!(
        "    async fillForm{n}(value: string) {{\n        const form = this.page.locator('form').nth({index});\n        for (const name of {names}) {{\n            await form.locator(`[name=\"${{name}}\"]`).fill(value);\n        }}\n    }}\n\n    async clickForm{n}Submit() {{\n        const form = this.page.locator('form').nth({index});\n        await form.evaluate((f) => (f as HTMLFormElement).requestSubmit());\n    }}",
        n = n,
        index = index,
        names = names
    )
}
