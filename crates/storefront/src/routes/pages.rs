//! Static content page route handlers.
//!
//! Serves markdown-based content pages like about, FAQ and shipping.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::views::Layout;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/show.html")]
pub struct ContentPageTemplate {
    pub layout: Layout,
    pub title: String,
    pub description: String,
    pub updated_at: Option<String>,
    pub content_html: String,
}

/// Serve a content page by slug.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Result<ContentPageTemplate> {
    let page = state
        .content()
        .get_page(&slug)
        .ok_or_else(|| AppError::NotFound("that page".to_string()))?;

    Ok(ContentPageTemplate {
        title: page.meta.title.clone(),
        description: page.meta.description.clone().unwrap_or_default(),
        updated_at: page
            .meta
            .updated_at
            .map(|d| d.format("%B %-d, %Y").to_string()),
        content_html: page.content_html.clone(),
        layout: Layout::load(&state, &session).await,
    })
}
