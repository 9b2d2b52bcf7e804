//! Full-text search using Tantivy.
//!
//! The index covers active products, categories and content pages. It is
//! built in RAM by a background task at startup and swapped in when ready;
//! until then searches return empty results flagged as still indexing.
//!
//! Results carry slugs, not prices or stock: the search page resolves
//! products against the live dataset so placed orders and admin edits are
//! reflected without reindexing.

mod indexer;

use std::sync::{Arc, RwLock};

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, RegexQuery, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, ReloadPolicy, Term};
use tracing::instrument;

pub use indexer::build_index_async;

/// Name of the stemming tokenizer registered on the index.
const TOKENIZER: &str = "en_stem";

/// Document types that can be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Product,
    Category,
    Page,
}

impl DocType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Page => "page",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "product" => Some(Self::Product),
            "category" => Some(Self::Category),
            "page" => Some(Self::Page),
            _ => None,
        }
    }

    /// Storefront path of a document of this type.
    #[must_use]
    pub fn url(self, slug: &str) -> String {
        match self {
            Self::Product => format!("/products/{slug}"),
            Self::Category => format!("/categories/{slug}"),
            Self::Page => format!("/pages/{slug}"),
        }
    }
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub doc_type: DocType,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub score: f32,
}

/// Schema field handles for the search index.
#[derive(Clone)]
pub struct SearchFields {
    // Stored fields (returned in results)
    pub doc_type: Field,
    pub slug: Field,
    pub title: Field,
    pub description: Field,
    // Text fields for full-text search (not stored, just indexed)
    pub title_text: Field,
    pub body_text: Field,
    pub tags_text: Field,
}

/// Inner index state (once built).
struct ReadyIndex {
    index: Index,
    reader: IndexReader,
    fields: SearchFields,
}

/// The search index.
///
/// Starts empty and is populated asynchronously by a background task.
#[derive(Clone, Default)]
pub struct SearchIndex {
    inner: Arc<RwLock<Option<ReadyIndex>>>,
}

/// Grouped search results.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub products: Vec<SearchResult>,
    pub categories: Vec<SearchResult>,
    pub pages: Vec<SearchResult>,
    pub query: String,
    /// The index has not been built yet.
    pub indexing: bool,
}

impl SearchResults {
    /// Check if there are any results.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.products.is_empty() && self.categories.is_empty() && self.pages.is_empty()
    }

    /// Get the total number of results.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.products.len() + self.categories.len() + self.pages.len()
    }
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Index error: {0}")]
    Index(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Build error: {0}")]
    Build(String),
}

impl SearchIndex {
    /// Create a new empty search index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the index is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Get the number of documents in the index, or 0 if not ready.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|r| r.reader.searcher().num_docs()))
            .unwrap_or(0)
    }

    /// Swap in a built index.
    pub(crate) fn set_ready(&self, index: Index, fields: SearchFields) -> Result<(), SearchError> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::Index(format!("Failed to create reader: {e}")))?;

        let ready = ReadyIndex {
            index,
            reader,
            fields,
        };

        *self
            .inner
            .write()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))? = Some(ready);

        Ok(())
    }

    /// Build the schema for the search index.
    pub(crate) fn build_schema() -> (Schema, SearchFields) {
        let mut schema_builder = Schema::builder();

        // STRING means indexed but not tokenized (exact match)
        let doc_type = schema_builder.add_text_field("doc_type", STRING | STORED);
        let slug = schema_builder.add_text_field("slug", STORED);
        let title = schema_builder.add_text_field("title", STORED);
        let description = schema_builder.add_text_field("description", STORED);

        let text_indexing = TextFieldIndexing::default()
            .set_tokenizer(TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions);
        let text_options = TextOptions::default().set_indexing_options(text_indexing);

        let title_text = schema_builder.add_text_field("title_text", text_options.clone());
        let body_text = schema_builder.add_text_field("body_text", text_options.clone());
        let tags_text = schema_builder.add_text_field("tags_text", text_options);

        let fields = SearchFields {
            doc_type,
            slug,
            title,
            description,
            title_text,
            body_text,
            tags_text,
        };

        (schema_builder.build(), fields)
    }

    /// Full search, grouped by document type with at most `limit` hits per
    /// group.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the query fails.
    #[instrument(skip(self))]
    // The read guard must outlive `ready`, which borrows from it.
    #[allow(clippy::significant_drop_tightening)]
    pub fn search(&self, query_str: &str, limit: usize) -> Result<SearchResults, SearchError> {
        let query_str = query_str.trim().to_lowercase();

        let guard = self
            .inner
            .read()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))?;

        let Some(ready) = guard.as_ref() else {
            return Ok(SearchResults {
                query: query_str,
                indexing: true,
                ..SearchResults::default()
            });
        };

        let mut results = SearchResults {
            query: query_str.clone(),
            ..SearchResults::default()
        };
        if query_str.is_empty() {
            return Ok(results);
        }

        let query = ready.full_query(&query_str)?;
        for hit in ready.run(&query, limit * 3)? {
            let group = match hit.doc_type {
                DocType::Product => &mut results.products,
                DocType::Category => &mut results.categories,
                DocType::Page => &mut results.pages,
            };
            if group.len() < limit {
                group.push(hit);
            }
        }

        Ok(results)
    }

    /// Type-ahead suggestions: every word of `query_str` is matched as a
    /// prefix of a title or tag word.
    ///
    /// Returns nothing while the index is being built.
    ///
    /// # Errors
    ///
    /// Returns an error if the index lock is poisoned or the query fails.
    #[instrument(skip(self))]
    #[allow(clippy::significant_drop_tightening)]
    pub fn suggest(&self, query_str: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let query_str = query_str.trim().to_lowercase();
        if query_str.is_empty() {
            return Ok(Vec::new());
        }

        let guard = self
            .inner
            .read()
            .map_err(|_| SearchError::Index("Lock poisoned".to_string()))?;
        let Some(ready) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for word in query_str.split_whitespace() {
            let pattern = format!("{}.*", regex::escape(word));
            let mut alternatives: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for field in [ready.fields.title_text, ready.fields.tags_text] {
                let prefix = RegexQuery::from_pattern(&pattern, field)
                    .map_err(|e| SearchError::Query(format!("Invalid prefix: {e}")))?;
                alternatives.push((Occur::Should, Box::new(prefix)));
            }
            for token in ready.analyze(ready.fields.title_text, word)? {
                let term = Term::from_field_text(ready.fields.title_text, &token);
                alternatives.push((
                    Occur::Should,
                    Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
                ));
            }
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(alternatives))));
        }

        let mut hits = ready.run(&BooleanQuery::new(clauses), limit)?;
        hits.truncate(limit);
        Ok(hits)
    }
}

impl ReadyIndex {
    /// Run `text` through the field's tokenizer (lowercase + stem).
    fn analyze(&self, field: Field, text: &str) -> Result<Vec<String>, SearchError> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(field)
            .map_err(|e| SearchError::Index(format!("Missing tokenizer: {e}")))?;
        let mut tokens = Vec::new();
        analyzer
            .token_stream(text)
            .process(&mut |token| tokens.push(token.text.clone()));
        Ok(tokens)
    }

    /// Any word may match: exact stems on title and tags, one-edit fuzzy
    /// matches on title and body for words of three letters or more.
    fn full_query(&self, query_str: &str) -> Result<BooleanQuery, SearchError> {
        let fields = &self.fields;
        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        for token in self.analyze(fields.title_text, query_str)? {
            for field in [fields.title_text, fields.tags_text, fields.body_text] {
                let term = Term::from_field_text(field, &token);
                subqueries.push((
                    Occur::Should,
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
                ));
            }
            if token.chars().count() >= 3 {
                for field in [fields.title_text, fields.body_text] {
                    let term = Term::from_field_text(field, &token);
                    subqueries.push((Occur::Should, Box::new(FuzzyTermQuery::new(term, 1, true))));
                }
            }
        }

        Ok(BooleanQuery::new(subqueries))
    }

    fn run(&self, query: &dyn Query, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(query, &TopDocs::with_limit(limit.max(1)))
            .map_err(|e| SearchError::Query(format!("Search failed: {e}")))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc = searcher
                .doc::<tantivy::TantivyDocument>(address)
                .map_err(|e| SearchError::Query(format!("Failed to retrieve doc: {e}")))?;
            results.push(self.doc_to_result(&doc, score)?);
        }
        Ok(results)
    }

    fn doc_to_result(
        &self,
        doc: &tantivy::TantivyDocument,
        score: f32,
    ) -> Result<SearchResult, SearchError> {
        let get_text = |field: Field| -> String {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        let doc_type_str = get_text(self.fields.doc_type);
        let doc_type = DocType::parse(&doc_type_str)
            .ok_or_else(|| SearchError::Query(format!("Invalid doc_type: {doc_type_str}")))?;

        Ok(SearchResult {
            doc_type,
            slug: get_text(self.fields.slug),
            title: get_text(self.fields.title),
            description: get_text(self.fields.description),
            score,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use harbor_core::Dataset;

    use super::*;
    use crate::content::{ContentStore, parse_page};

    fn ready_index() -> SearchIndex {
        let dataset = Dataset::seed().unwrap();
        let page = parse_page(
            "shipping",
            "---\ntitle: Shipping & Returns\n---\nReturns are free within 30 days.",
        )
        .unwrap();
        let content = ContentStore::from_pages(vec![page]);
        let index = SearchIndex::new();
        indexer::rebuild(&index, &dataset, &content).unwrap();
        index
    }

    #[test]
    fn test_empty_until_built() {
        let index = SearchIndex::new();
        assert!(!index.is_ready());
        let results = index.search("tote", 5).unwrap();
        assert!(results.indexing);
        assert!(results.is_empty());
        assert!(index.suggest("to", 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_finds_products_by_stemmed_word() {
        let index = ready_index();
        assert!(index.is_ready());
        assert!(index.num_docs() > 0);

        let results = index.search("Totes", 5).unwrap();
        assert!(!results.indexing);
        assert!(!results.products.is_empty());
        assert!(results.products.iter().all(|r| r.doc_type == DocType::Product));
    }

    #[test]
    fn test_search_finds_pages() {
        let index = ready_index();
        let results = index.search("returns", 5).unwrap();
        assert_eq!(results.pages.len(), 1);
        assert_eq!(results.pages[0].slug, "shipping");
        assert_eq!(DocType::Page.url("shipping"), "/pages/shipping");
    }

    #[test]
    fn test_suggest_matches_prefixes() {
        let index = ready_index();
        let hits = index.suggest("to", 5).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.len() <= 5);
    }

    #[tokio::test]
    async fn test_background_build_serves_products() {
        let store = crate::db::Store::load(None).unwrap();
        let index = SearchIndex::new();
        indexer::build_index_async(index.clone(), store, ContentStore::default());

        for _ in 0..200 {
            if index.is_ready() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        assert!(index.is_ready());

        let results = index.search("tote", 5).unwrap();
        assert!(!results.indexing);
        assert!(!results.products.is_empty());
    }

    #[test]
    fn test_blank_query_returns_nothing() {
        let index = ready_index();
        assert!(index.search("   ", 5).unwrap().is_empty());
    }
}
