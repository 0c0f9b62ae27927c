use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// A trending search term and the slug used to name everything produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    name: String,
    slug: String,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Self { name, slug }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Slug namespacing the artifacts of one script variation (1-based).
    pub fn variation_slug(&self, variation: usize) -> String {
        format!("{}_{}", self.slug, variation)
    }

    /// Title handed to the publisher.
    pub fn publish_title(&self) -> String {
        format!("¡{}! 🚀 #viral", self.name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub fn slugify(name: &str) -> String {
    NON_WORD.replace_all(name, "_").to_lowercase()
}
