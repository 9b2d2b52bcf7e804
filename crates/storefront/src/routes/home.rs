//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::catalog::{ProductSort, sort_products};

use crate::state::AppState;
use crate::views::{CategoryView, Layout, ProductCardView};

/// Tiles in the featured and new-arrival rows.
const HOME_ROW_SIZE: usize = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<ProductCardView>,
    pub new_arrivals: Vec<ProductCardView>,
    pub categories: Vec<CategoryView>,
    pub free_shipping: Option<String>,
}

/// Display the home page.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> HomeTemplate {
    let layout = Layout::load(&state, &session).await;
    let dataset = state.store().read().await;
    let settings = &dataset.settings;

    let featured = dataset
        .active_products()
        .filter(|p| p.featured)
        .take(HOME_ROW_SIZE)
        .map(|p| ProductCardView::new(p, settings))
        .collect();

    let mut newest: Vec<_> = dataset.active_products().collect();
    sort_products(&mut newest, ProductSort::Newest);
    let new_arrivals = newest
        .into_iter()
        .take(HOME_ROW_SIZE)
        .map(|p| ProductCardView::new(p, settings))
        .collect();

    let categories = dataset
        .categories
        .iter()
        .map(|c| CategoryView::new(c, &dataset.products))
        .collect();

    HomeTemplate {
        layout,
        featured,
        new_arrivals,
        categories,
        free_shipping: settings
            .free_shipping_threshold
            .map(|t| settings.money(t)),
    }
}
