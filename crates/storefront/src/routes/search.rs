//! Search route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::search::{SearchResult, SearchResults};
use crate::state::AppState;
use crate::views::{Layout, ProductCardView};

/// Hits per group on the search page.
const PAGE_LIMIT: usize = 24;

/// Suggestions in the header dropdown.
const SUGGEST_LIMIT: usize = 6;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A non-product hit (category or page).
pub struct HitView {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl From<&SearchResult> for HitView {
    fn from(hit: &SearchResult) -> Self {
        Self {
            title: hit.title.clone(),
            description: hit.description.clone(),
            url: hit.doc_type.url(&hit.slug),
        }
    }
}

/// Full search page template.
#[derive(Template, WebTemplate)]
#[template(path = "search/index.html")]
pub struct SearchPageTemplate {
    pub layout: Layout,
    pub query: String,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<HitView>,
    pub pages: Vec<HitView>,
    pub total: usize,
    pub indexing: bool,
}

/// Suggestions fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/search_suggest.html")]
pub struct SuggestTemplate {
    pub query: String,
    pub suggestions: Vec<HitView>,
    pub indexing: bool,
}

/// Full search page.
///
/// Product hits are resolved against the live catalog so prices and stock
/// are current; products unpublished since indexing are dropped.
#[instrument(skip(state, session))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> SearchPageTemplate {
    let layout = Layout::load(&state, &session).await;
    let results = state
        .search()
        .search(&query.q, PAGE_LIMIT)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Search failed");
            SearchResults::default()
        });

    let dataset = state.store().read().await;
    let products: Vec<ProductCardView> = results
        .products
        .iter()
        .filter_map(|hit| dataset.product_by_slug(&hit.slug))
        .filter(|p| p.is_active())
        .map(|p| ProductCardView::new(p, &dataset.settings))
        .collect();
    let categories: Vec<HitView> = results.categories.iter().map(HitView::from).collect();
    let pages: Vec<HitView> = results.pages.iter().map(HitView::from).collect();

    tracing::debug!(query = %query.q, hits = results.total(), "Search");

    SearchPageTemplate {
        layout,
        query: query.q.trim().to_string(),
        total: products.len() + categories.len() + pages.len(),
        products,
        categories,
        pages,
        indexing: results.indexing,
    }
}

/// Search suggestions endpoint, returns an HTML fragment.
#[instrument(skip(state))]
pub async fn suggest(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> SuggestTemplate {
    let suggestions = state
        .search()
        .suggest(&query.q, SUGGEST_LIMIT)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Suggest failed");
            Vec::new()
        });

    SuggestTemplate {
        query: query.q.trim().to_string(),
        suggestions: suggestions.iter().map(HitView::from).collect(),
        indexing: !state.search().is_ready(),
    }
}
