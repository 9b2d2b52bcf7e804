//! Category route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, RawQuery, State};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::routes::products::{CatalogQuery, CatalogTemplate, catalog_template};
use crate::state::AppState;
use crate::views::{CategoryView, Layout};

/// Category listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryView>,
}

/// Display all categories.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> CategoriesIndexTemplate {
    let layout = Layout::load(&state, &session).await;
    let dataset = state.store().read().await;
    let categories = dataset
        .categories
        .iter()
        .map(|c| CategoryView::new(c, &dataset.products))
        .collect();

    CategoriesIndexTemplate { layout, categories }
}

/// Display the catalog restricted to one category.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<CatalogTemplate> {
    let query = CatalogQuery::parse(raw.as_deref());
    let layout = Layout::load(&state, &session).await;
    let dataset = state.store().read().await;

    let category = dataset
        .category_by_slug(&slug)
        .ok_or_else(|| AppError::NotFound("that category".to_string()))?;

    Ok(catalog_template(layout, &dataset, &query, Some(category)))
}
