//! Extraction of testable page elements
//!
//! Walks a parsed document and records the elements the heuristic analyzer
//! writes tests for: links, buttons, images, headings, the first `<nav>` and
//! every form together with its controls.

use crate::analysis::AnalysisError;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

const BUTTON_SELECTOR: &str = r#"button, input[type="button"], input[type="submit"]"#;
const CONTROL_SELECTOR: &str = "input, select, textarea, button";

/// Elements found on one page
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageElements {
    pub links: Vec<LinkElement>,
    pub buttons: Vec<ButtonElement>,
    pub images: Vec<ImageElement>,
    pub headings: Vec<HeadingElement>,
    pub navigation: Option<NavElement>,
    pub forms: Vec<FormElement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkElement {
    pub text: String,
    pub href: String,
    pub id: String,
    pub aria_label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonElement {
    pub text: String,
    pub kind: String,
    pub id: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageElement {
    pub src: String,
    pub alt: Option<String>,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadingElement {
    pub level: u8,
    pub text: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavElement {
    pub items: Vec<NavItem>,
    pub aria_label: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavItem {
    pub text: String,
    pub href: String,
}

/// A `<form>` and its controls
#[derive(Debug, Clone, Serialize)]
pub struct FormElement {
    pub action: String,
    pub method: String,
    pub id: String,
    pub novalidate: bool,
    pub enctype: String,
    pub controls: Vec<FormControl>,
}

/// An input, select, textarea or button inside a form
#[derive(Debug, Clone, Serialize)]
pub struct FormControl {
    pub kind: String,
    pub name: String,
    pub id: String,
    pub label: String,
    pub required: bool,
    pub disabled: bool,
    pub placeholder: String,
    pub options: Vec<String>,
}

impl PageElements {
    /// Element counts, as recorded in analysis metadata
    pub fn counts(&self) -> serde_json::Value {
        serde_json::json!({
            "links": self.links.len(),
            "buttons": self.buttons.len(),
            "images": self.images.len(),
            "headings": self.headings.len(),
            "forms": self.forms.len(),
        })
    }
}

/// Extracts testable elements from HTML
///
/// # Errors
///
/// Returns [`AnalysisError::EmptyHtml`] if the document is blank.
pub fn extract_page_elements(html: &str) -> Result<PageElements, AnalysisError> {
    if html.trim().is_empty() {
        return Err(AnalysisError::EmptyHtml);
    }

    let document = Html::parse_document(html);
    let root = document.root_element();

    let links = select(root, "a")
        .into_iter()
        .map(|a| LinkElement {
            text: element_text(a),
            href: attr(a, "href"),
            id: attr(a, "id"),
            aria_label: attr(a, "aria-label"),
        })
        .collect();

    let buttons = select(root, BUTTON_SELECTOR)
        .into_iter()
        .map(|b| {
            let is_button = b.value().name() == "button";
            ButtonElement {
                text: if is_button {
                    element_text(b)
                } else {
                    attr(b, "value")
                },
                kind: b
                    .value()
                    .attr("type")
                    .unwrap_or("button")
                    .to_string(),
                id: attr(b, "id"),
                disabled: has_attr(b, "disabled"),
            }
        })
        .collect();

    let images = select(root, "img")
        .into_iter()
        .map(|img| ImageElement {
            src: attr(img, "src"),
            alt: img.value().attr("alt").map(str::to_string),
            id: attr(img, "id"),
        })
        .collect();

    let headings = select(root, "h1, h2, h3, h4, h5, h6")
        .into_iter()
        .map(|h| HeadingElement {
            level: heading_level(h.value().name()),
            text: element_text(h),
            id: attr(h, "id"),
        })
        .collect();

    let navigation = select(root, "nav").into_iter().next().map(|nav| NavElement {
        items: select(nav, "a")
            .into_iter()
            .map(|a| NavItem {
                text: element_text(a),
                href: attr(a, "href"),
            })
            .collect(),
        aria_label: attr(nav, "aria-label"),
        id: attr(nav, "id"),
    });

    let forms = select(root, "form").into_iter().map(extract_form).collect();

    Ok(PageElements {
        links,
        buttons,
        images,
        headings,
        navigation,
        forms,
    })
}

fn extract_form(form: ElementRef<'_>) -> FormElement {
    let controls = select(form, CONTROL_SELECTOR)
        .into_iter()
        .map(|control| extract_control(form, control))
        .collect();

    FormElement {
        action: attr(form, "action"),
        method: form
            .value()
            .attr("method")
            .unwrap_or("GET")
            .to_uppercase(),
        id: attr(form, "id"),
        novalidate: has_attr(form, "novalidate"),
        enctype: form
            .value()
            .attr("enctype")
            .unwrap_or("application/x-www-form-urlencoded")
            .to_string(),
        controls,
    }
}

fn extract_control(form: ElementRef<'_>, control: ElementRef<'_>) -> FormControl {
    let tag = control.value().name();
    let kind = match control.value().attr("type") {
        Some(t) => t.to_string(),
        None if tag == "input" => "text".to_string(),
        None => tag.to_string(),
    };
    let id = attr(control, "id");

    let options = if tag == "select" {
        select(control, "option")
            .into_iter()
            .map(|opt| {
                opt.value()
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| element_text(opt))
            })
            .collect()
    } else {
        Vec::new()
    };

    FormControl {
        kind,
        name: attr(control, "name"),
        label: control_label(form, control, &id),
        id,
        required: has_attr(control, "required"),
        disabled: has_attr(control, "disabled"),
        placeholder: attr(control, "placeholder"),
        options,
    }
}

/// `<label for=id>` inside the form, else an enclosing `<label>`
fn control_label(form: ElementRef<'_>, control: ElementRef<'_>, id: &str) -> String {
    if !id.is_empty() {
        let by_for = select(form, "label")
            .into_iter()
            .find(|label| label.value().attr("for") == Some(id));
        if let Some(label) = by_for {
            return element_text(label);
        }
    }

    control
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|parent| parent.value().name() == "label")
        .map(element_text)
        .unwrap_or_default()
}

fn select<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(e) => {
            tracing::error!("Bad selector {:?}: {:?}", css, e);
            Vec::new()
        }
    }
}

fn attr(element: ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).unwrap_or_default().to_string()
}

fn has_attr(element: ElementRef<'_>, name: &str) -> bool {
    element.value().attr(name).is_some()
}

/// Text content with each text node trimmed, blanks dropped
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn heading_level(tag: &str) -> u8 {
    tag.strip_prefix('h')
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <nav aria-label="Main"><a href="/">Home</a><a href="/about">About</a></nav>
          <h1>Welcome</h1><h3 id="sub">Sub</h3>
          <img src="/logo.png" alt="Logo"><img src="/hero.png">
          <button type="submit">Go</button>
          <input type="button" value="Press">
          <form action="/login" method="post" id="login">
            <label for="user">User name</label>
            <input id="user" name="username" required>
            <label>Password <input type="password" name="password"></label>
            <select name="role"><option value="a">A</option><option>B</option></select>
            <input type="submit" value="Sign in">
          </form>
        </body></html>
    "#;

    #[test]
    fn test_empty_html_is_error() {
        assert!(matches!(
            extract_page_elements("   "),
            Err(AnalysisError::EmptyHtml)
        ));
    }

    #[test]
    fn test_extract_counts() {
        let elements = extract_page_elements(PAGE).unwrap();
        assert_eq!(elements.links.len(), 2);
        assert_eq!(elements.images.len(), 2);
        assert_eq!(elements.headings.len(), 2);
        assert_eq!(elements.forms.len(), 1);
        // button, input[type=button] and the form's submit input
        assert_eq!(elements.buttons.len(), 3);
    }

    #[test]
    fn test_navigation() {
        let elements = extract_page_elements(PAGE).unwrap();
        let nav = elements.navigation.unwrap();
        assert_eq!(nav.aria_label, "Main");
        assert_eq!(nav.items.len(), 2);
        assert_eq!(nav.items[1].href, "/about");
    }

    #[test]
    fn test_headings_and_images() {
        let elements = extract_page_elements(PAGE).unwrap();
        assert_eq!(elements.headings[0].level, 1);
        assert_eq!(elements.headings[1].level, 3);
        assert_eq!(elements.headings[1].id, "sub");
        assert_eq!(elements.images[0].alt.as_deref(), Some("Logo"));
        assert!(elements.images[1].alt.is_none());
    }

    #[test]
    fn test_form_controls() {
        let elements = extract_page_elements(PAGE).unwrap();
        let form = &elements.forms[0];
        assert_eq!(form.method, "POST");
        assert_eq!(form.action, "/login");
        assert_eq!(form.controls.len(), 4);

        let user = &form.controls[0];
        assert_eq!(user.kind, "text");
        assert_eq!(user.label, "User name");
        assert!(user.required);

        let password = &form.controls[1];
        assert_eq!(password.label, "Password");

        let role = &form.controls[2];
        assert_eq!(role.kind, "select");
        assert_eq!(role.options, vec!["a".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_page_without_elements() {
        let elements = extract_page_elements("<html><body><p>Hi</p></body></html>").unwrap();
        assert!(elements.links.is_empty());
        assert!(elements.navigation.is_none());
        assert!(elements.forms.is_empty());
    }
}
