//! Product route handlers.
//!
//! Create, edit, delete, publish/unpublish and restock products. Only
//! products that have never been ordered can be deleted; the rest are
//! archived instead so order history keeps resolving.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{OriginalUri, Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use harbor_core::catalog::{Product, paginate};
use harbor_core::validation::FieldErrors;
use harbor_core::{Dataset, ProductId, ProductStatus, VariantId};

use crate::components::{DataTable, DataTableConfig, FilterOption, TableColumn, TableFilter};
use crate::components::data_table::TableQuery;
use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::session::flash;
use crate::models::{CurrentAdmin, Flash, ProductForm};
use crate::state::AppState;
use crate::views::{Layout, SelectOption, format_date};

/// Products per list page.
const PER_PAGE: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index))
        .route("/products/new", get(new_page).post(create))
        .route("/products/{id}/edit", get(edit_page).post(update))
        .route("/products/{id}/delete", post(delete))
        .route("/products/{id}/status", post(toggle_status))
        .route(
            "/products/{id}/variants/{variant_id}/stock",
            post(set_stock),
        )
}

// =============================================================================
// List
// =============================================================================

/// Build the products table configuration.
#[must_use]
pub fn products_table_config(dataset: &Dataset) -> DataTableConfig {
    let categories = dataset
        .categories
        .iter()
        .map(|c| FilterOption::new(&c.id.to_string(), &c.name))
        .collect();
    let statuses = ProductStatus::ALL
        .iter()
        .map(|s| FilterOption::new(s.as_str(), s.label()))
        .collect();

    DataTableConfig::new("/products")
        .column(TableColumn::sortable("name", "Product"))
        .column(TableColumn::new("category", "Category"))
        .column(TableColumn::sortable("price", "Price").numeric())
        .column(TableColumn::sortable("stock", "Stock").numeric())
        .column(TableColumn::sortable("status", "Status"))
        .column(TableColumn::sortable("created", "Added"))
        .filter(TableFilter::select("status", "Status", statuses))
        .filter(TableFilter::select("category", "Category", categories))
        .search_placeholder("Search by name, brand or SKU")
        .default_sort("name", false)
        .empty_state("No products found", Some("Try adjusting your search or filters"))
}

/// Products matching `query`, in its sort order.
#[must_use]
pub fn list_products<'a>(dataset: &'a Dataset, query: &TableQuery) -> Vec<&'a Product> {
    let q = query.q.to_lowercase();
    let status = query.filter("status");
    let category = query.filter("category");

    let mut products: Vec<&Product> = dataset
        .products
        .iter()
        .filter(|p| status.is_empty() || p.status.as_str() == status)
        .filter(|p| category.is_empty() || p.category_id.to_string() == category)
        .filter(|p| {
            q.is_empty()
                || p.name.to_lowercase().contains(&q)
                || p.brand.to_lowercase().contains(&q)
                || p.variants.iter().any(|v| v.sku.to_lowercase().contains(&q))
        })
        .collect();

    products.sort_by(|a, b| {
        let ordering = match query.sort.key.as_str() {
            "price" => a.effective_price().cmp(&b.effective_price()),
            "stock" => a.total_stock().cmp(&b.total_stock()),
            "status" => a.status.as_str().cmp(b.status.as_str()),
            "created" => a.created_at.cmp(&b.created_at),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        let ordering = ordering.then(a.id.cmp(&b.id));
        if query.sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    products
}

pub struct ProductRowView {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub brand: String,
    pub category: String,
    pub price: String,
    pub sale_price: Option<String>,
    pub stock: u32,
    pub low_stock: bool,
    pub status_label: &'static str,
    pub status_class: &'static str,
    /// Button text for the status toggle.
    pub toggle_label: &'static str,
    pub featured: bool,
    pub created_at: String,
}

impl ProductRowView {
    fn new(product: &Product, dataset: &Dataset) -> Self {
        let settings = &dataset.settings;
        let stock = product.total_stock();
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            brand: product.brand.clone(),
            category: dataset
                .category(product.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            price: settings.money(product.price),
            sale_price: product.discount_price.map(|d| settings.money(d)),
            stock,
            low_stock: stock <= settings.low_stock_threshold,
            status_label: product.status.label(),
            status_class: product.status.badge_class(),
            toggle_label: match product.status.toggled() {
                ProductStatus::Active => "Publish",
                _ => "Unpublish",
            },
            featured: product.featured,
            created_at: format_date(product.created_at),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub table: DataTable,
    pub products: Vec<ProductRowView>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// GET /products
#[instrument(skip_all)]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw): RawQuery,
) -> ProductsIndexTemplate {
    let (table, page) = {
        let dataset = state.store().read().await;
        let table = DataTable::new(products_table_config(&dataset), raw.as_deref());
        let products = list_products(&dataset, &table.query);
        let page = paginate(products, table.query.page, PER_PAGE)
            .map(|p| ProductRowView::new(p, &dataset));
        (table, page)
    };

    ProductsIndexTemplate {
        layout: Layout::load(&state, &session, admin, "/products").await,
        table,
        products: page.items,
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }
}

// =============================================================================
// Create / edit
// =============================================================================

pub struct VariantRowView {
    pub id: i32,
    pub sku: String,
    pub label: String,
    pub stock: u32,
    pub low_stock: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    pub title: String,
    pub action: String,
    /// Set when editing.
    pub product_id: Option<i32>,
    pub form: ProductForm,
    pub errors: FieldErrors,
    pub categories: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    pub variants: Vec<VariantRowView>,
}

impl ProductFormTemplate {
    async fn render_for(
        state: &AppState,
        session: &Session,
        admin: CurrentAdmin,
        product: Option<&Product>,
        form: ProductForm,
        errors: FieldErrors,
    ) -> Self {
        let (categories, low_stock_threshold) = {
            let dataset = state.store().read().await;
            let categories = dataset
                .categories
                .iter()
                .map(|c| SelectOption::new(c.id.to_string(), c.name.clone(), &form.category_id))
                .collect();
            (categories, dataset.settings.low_stock_threshold)
        };
        let statuses = ProductStatus::ALL
            .iter()
            .map(|s| SelectOption::new(s.as_str(), s.label(), &form.status))
            .collect();

        let (title, action, current_path) = match product {
            Some(p) => (
                format!("Edit {}", p.name),
                format!("/products/{}/edit", p.id),
                format!("/products/{}/edit", p.id),
            ),
            None => (
                "New product".to_string(),
                "/products/new".to_string(),
                "/products/new".to_string(),
            ),
        };

        Self {
            layout: Layout::load(state, session, admin, &current_path).await,
            title,
            action,
            product_id: product.map(|p| p.id.as_i32()),
            form,
            errors,
            categories,
            statuses,
            variants: product
                .map(|p| {
                    p.variants
                        .iter()
                        .map(|v| VariantRowView {
                            id: v.id.as_i32(),
                            sku: v.sku.clone(),
                            label: v.label().unwrap_or_else(|| "Default".to_string()),
                            stock: v.stock,
                            low_stock: v.stock <= low_stock_threshold,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// GET /products/new
#[instrument(skip_all)]
async fn new_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> ProductFormTemplate {
    ProductFormTemplate::render_for(
        &state,
        &session,
        admin,
        None,
        ProductForm::new_product(),
        FieldErrors::new(),
    )
    .await
}

/// POST /products/new
#[instrument(skip_all)]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let validated = {
        let dataset = state.store().read().await;
        form.validate(&dataset.categories, &dataset.products, None)
    };
    let input = match validated {
        Ok(input) => input,
        Err(errors) => {
            let page =
                ProductFormTemplate::render_for(&state, &session, admin, None, form, errors).await;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let product = ProductRepository::new(state.store())
        .create(input, Utc::now())
        .await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    flash(&session, Flash::success(format!("Created {}.", product.name))).await;
    Ok(Redirect::to(&format!("/products/{}/edit", product.id)).into_response())
}

/// GET /products/{id}/edit
#[instrument(skip(admin, state, session))]
async fn edit_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<ProductFormTemplate> {
    let product = ProductRepository::new(state.store())
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;
    let form = ProductForm::from_product(&product);
    let errors = FieldErrors::new();
    Ok(
        ProductFormTemplate::render_for(&state, &session, admin, Some(&product), form, errors)
            .await,
    )
}

/// POST /products/{id}/edit
#[instrument(skip(admin, state, session, form))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let (product, validated) = {
        let dataset = state.store().read().await;
        let product = dataset
            .product(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("product".to_string()))?;
        let validated = form.validate(&dataset.categories, &dataset.products, Some(id));
        (product, validated)
    };
    let input = match validated {
        Ok(input) => input,
        Err(errors) => {
            let product = Some(&product);
            let page =
                ProductFormTemplate::render_for(&state, &session, admin, product, form, errors)
                    .await;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let product = ProductRepository::new(state.store()).update(id, input).await?;
    tracing::info!(product_id = %product.id, "Product updated");
    flash(&session, Flash::success(format!("Saved {}.", product.name))).await;
    Ok(Redirect::to(&format!("/products/{id}/edit")).into_response())
}

// =============================================================================
// Actions
// =============================================================================

/// POST /products/{id}/delete
#[instrument(skip(_admin, state, session))]
async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Redirect> {
    match ProductRepository::new(state.store()).delete(id).await {
        Ok(product) => {
            tracing::info!(product_id = %id, slug = %product.slug, "Product deleted");
            flash(&session, Flash::success(format!("Deleted {}.", product.name))).await;
            Ok(Redirect::to("/products"))
        }
        Err(RepositoryError::Conflict(_)) => {
            flash(
                &session,
                Flash::error(
                    "This product has been ordered and can't be deleted. Archive it instead.",
                ),
            )
            .await;
            Ok(Redirect::to(&format!("/products/{id}/edit")))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /products/{id}/status
#[instrument(skip(_admin, state, session, uri))]
async fn toggle_status(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    uri: OriginalUri,
) -> Result<Redirect> {
    let status = ProductRepository::new(state.store())
        .toggle_status(id)
        .await?;
    tracing::info!(product_id = %id, status = %status, "Product status changed");
    flash(
        &session,
        Flash::success(format!("Product is now {}.", status.label())),
    )
    .await;
    Ok(Redirect::to(&return_path(&uri, "/products")))
}

#[derive(Debug, Default, Deserialize)]
pub struct StockForm {
    #[serde(default)]
    pub stock: String,
}

/// POST /products/{id}/variants/{variant_id}/stock
#[instrument(skip(_admin, state, session, form))]
async fn set_stock(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path((id, variant_id)): Path<(ProductId, VariantId)>,
    Form(form): Form<StockForm>,
) -> Result<Redirect> {
    let back = format!("/products/{id}/edit");
    let Ok(stock) = form.stock.trim().parse::<u32>() else {
        flash(&session, Flash::error("Stock must be a whole number of zero or more.")).await;
        return Ok(Redirect::to(&back));
    };

    let variant = ProductRepository::new(state.store())
        .set_stock(id, variant_id, stock)
        .await?;
    tracing::info!(product_id = %id, sku = %variant.sku, stock, "Stock updated");
    flash(
        &session,
        Flash::success(format!("{} now has {stock} in stock.", variant.sku)),
    )
    .await;
    Ok(Redirect::to(&back))
}

/// Where a list action returns to: the `return_to` query parameter when it
/// is a local path, `fallback` otherwise.
pub(crate) fn return_path(uri: &OriginalUri, fallback: &str) -> String {
    uri.0
        .query()
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "return_to")
                .map(|(_, v)| v.into_owned())
        })
        .filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(raw: &str, dataset: &Dataset) -> TableQuery {
        TableQuery::parse(Some(raw), &products_table_config(dataset))
    }

    #[test]
    fn test_filter_by_status_and_category() {
        let dataset = Dataset::seed().unwrap();
        let drafts = list_products(&dataset, &query("status=draft", &dataset));
        assert!(drafts.iter().all(|p| p.status == ProductStatus::Draft));

        let category = dataset.categories.first().unwrap().id;
        let filter = query(&format!("category={category}"), &dataset);
        let in_category = list_products(&dataset, &filter);
        assert!(!in_category.is_empty());
        assert!(in_category.iter().all(|p| p.category_id == category));
    }

    #[test]
    fn test_sort_by_price_descending() {
        let dataset = Dataset::seed().unwrap();
        let products = list_products(&dataset, &query("sort=-price", &dataset));
        assert_eq!(products.len(), dataset.products.len());
        assert!(products.windows(2).all(|w| match w {
            [a, b] => a.effective_price() >= b.effective_price(),
            _ => true,
        }));
    }

    #[test]
    fn test_search_matches_sku() {
        let dataset = Dataset::seed().unwrap();
        let product = dataset.products.first().unwrap();
        let sku = product.variants.first().unwrap().sku.to_lowercase();
        let found = list_products(&dataset, &query(&format!("q={sku}"), &dataset));
        assert!(found.iter().any(|p| p.id == product.id));
    }

    #[test]
    fn test_return_path_stays_local() {
        let uri = |s: &str| OriginalUri(s.parse().unwrap());
        assert_eq!(
            return_path(&uri("/products/1/status?return_to=%2Fproducts%3Fpage%3D2"), "/products"),
            "/products?page=2"
        );
        assert_eq!(
            return_path(&uri("/products/1/status?return_to=https://evil.example"), "/products"),
            "/products"
        );
        assert_eq!(return_path(&uri("/products/1/status"), "/products"), "/products");
    }
}
