//! URL handling module for Pomforge
//!
//! This module provides URL normalization, domain extraction, the crawl's domain
//! scope, and conversion of URLs into filesystem-safe names.

mod domain;
mod naming;
mod normalize;

pub use domain::{extract_domain, DomainScope};
pub use naming::{output_namespace, page_class_name, page_slug, pascal_case};
pub use normalize::normalize_url;
