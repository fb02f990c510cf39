//! URL to artifact path mapping
//!
//! Slugs come from the URL path. Within a run the mapping is kept injective:
//! when a slug is already held by a different URL, the newcomer gets the first
//! eight hex digits of its URL's SHA-256 appended.

use crate::url::page_slug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use url::Url;

/// Where one page's generated files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub slug: String,
    /// `pages/<slug>.page.ts`
    pub pom_file: String,
    /// `tests/<slug>.test.ts`
    pub test_file: String,
}

impl ArtifactPaths {
    fn for_slug(slug: String) -> Self {
        Self {
            pom_file: format!("pages/{}.page.ts", slug),
            test_file: format!("tests/{}.test.ts", slug),
            slug,
        }
    }

    /// Module specifier the test file uses to import the page object
    pub fn pom_import(&self) -> String {
        format!("../pages/{}.page", self.slug)
    }

    /// Validation feedback file name, relative to the run's output directory
    pub fn feedback_file(&self) -> String {
        format!("validation_feedback_{}.txt", self.slug)
    }
}

/// Hands out slugs for one run
#[derive(Debug, Default)]
pub struct PathAllocator {
    owners: HashMap<String, String>,
}

impl PathAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the paths for `url`, stable for repeated calls with the same URL
    pub fn allocate(&mut self, url: &Url) -> ArtifactPaths {
        let base = page_slug(url);

        let slug = match self.owners.get(&base) {
            None => base,
            Some(owner) if owner == url.as_str() => base,
            Some(owner) => {
                let hashed = format!("{}-{}", base, short_hash(url.as_str()));
                tracing::warn!(
                    "Slug {} already used by {}, using {} for {}",
                    base,
                    owner,
                    hashed,
                    url
                );
                hashed
            }
        };

        self.owners
            .entry(slug.clone())
            .or_insert_with(|| url.as_str().to_string());
        ArtifactPaths::for_slug(slug)
    }
}

fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..4])
}
