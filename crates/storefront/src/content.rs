//! Markdown content pages (about, FAQ, shipping & returns, ...).
//!
//! Pages are loaded once at startup from `*.md` files in the content
//! directory. Each file starts with YAML frontmatter:
//!
//! ```markdown
//! ---
//! title: Shipping & Returns
//! description: How long delivery takes and how to send things back.
//! nav_order: 3
//! ---
//! ## Delivery
//! ...
//! ```
//!
//! The file stem is the page slug, served at `/pages/{slug}`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use comrak::{Options, markdown_to_html};
use gray_matter::{Matter, ParsedEntity, engine::YAML};
use regex::Regex;
use serde::Deserialize;

/// Frontmatter of a content page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<NaiveDate>,
    /// Position in the footer links; pages without one are not linked.
    #[serde(default)]
    pub nav_order: Option<u32>,
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Page {
    pub slug: String,
    pub meta: PageMeta,
    pub content_html: String,
    /// Tag-free text of the page, for the search index.
    pub text: String,
}

/// All loaded pages, keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    pages: Arc<BTreeMap<String, Page>>,
}

impl ContentStore {
    /// Load every `*.md` page in `dir`.
    ///
    /// A missing directory yields an empty store; pages that fail to parse
    /// are logged and skipped.
    #[must_use]
    pub fn load(dir: &Path) -> Self {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Content directory unavailable");
                return Self::default();
            }
        };

        let mut pages = Vec::new();
        for path in entries.flatten().map(|entry| entry.path()) {
            if path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let result = std::fs::read_to_string(&path)
                .map_err(|e| ContentError::Io(e.to_string()))
                .and_then(|source| parse_page(slug, &source));
            match result {
                Ok(page) => {
                    tracing::debug!(slug = %page.slug, "Loaded page");
                    pages.push(page);
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to load page");
                }
            }
        }

        tracing::info!(count = pages.len(), "Content pages loaded");
        Self::from_pages(pages)
    }

    #[must_use]
    pub fn from_pages(pages: Vec<Page>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|p| (p.slug.clone(), p)).collect()),
        }
    }

    /// Get a page by slug
    #[must_use]
    pub fn get_page(&self, slug: &str) -> Option<&Page> {
        self.pages.get(slug)
    }

    /// Get all pages, by slug
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Pages linked from the footer, by `nav_order`.
    #[must_use]
    pub fn nav_pages(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self
            .pages
            .values()
            .filter(|p| p.meta.nav_order.is_some())
            .collect();
        pages.sort_by_key(|p| p.meta.nav_order);
        pages
    }
}

/// Parse a page from its markdown source.
///
/// # Errors
///
/// Returns `ContentError::Parse` if the frontmatter is missing or invalid.
pub fn parse_page(slug: &str, source: &str) -> Result<Page, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed: ParsedEntity<PageMeta> = matter
        .parse(source)
        .map_err(|e| ContentError::Parse(format!("Failed to parse frontmatter: {e}")))?;
    let meta = parsed
        .data
        .ok_or_else(|| ContentError::Parse("Missing frontmatter".to_string()))?;

    let content_html = render_markdown(&parsed.content);
    let text = plain_text(&content_html);

    Ok(Page {
        slug: slug.to_string(),
        meta,
        content_html,
        text,
    })
}

/// Render markdown to HTML with GitHub Flavored Markdown support.
///
/// Raw HTML in the source is escaped.
fn render_markdown(content: &str) -> String {
    let mut options = Options::default();

    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.header_ids = Some(String::new());

    markdown_to_html(content, &options)
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Strip tags and collapse whitespace, decoding the entities comrak emits.
#[must_use]
pub fn plain_text(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim()
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Content loading errors
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
