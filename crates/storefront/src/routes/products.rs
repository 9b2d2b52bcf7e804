//! Product route handlers.
//!
//! The listing accepts its filters as a plain GET query so every filtered
//! view is linkable:
//!
//! ```text
//! /products?q=canvas&brand=Northfold&brand=Harbor+%26+Pine&min_price=20
//!          &max_price=150&min_rating=4&in_stock=1&on_sale=1&sort=price-asc&page=2
//! ```
//!
//! `brand` may repeat, which `serde_urlencoded` cannot express, so the query
//! is parsed by hand.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;
use url::form_urlencoded;

use harbor_core::cart::MAX_LINE_QUANTITY;
use harbor_core::catalog::{
    Category, Product, ProductFilter, ProductSort, brands, filter_products, paginate, price_range,
    related_products, sort_products,
};
use harbor_core::validation::parse_money;
use harbor_core::Dataset;

use crate::state::AppState;
use crate::views::{Layout, ProductCardView};

/// Related products shown under a product.
const RELATED_LIMIT: usize = 4;

// =============================================================================
// Query
// =============================================================================

/// Parsed catalog query. Text fields keep what the shopper typed so the
/// filter form can be redisplayed as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub q: String,
    pub min_price: String,
    pub max_price: String,
    pub brands: Vec<String>,
    pub min_rating: String,
    pub in_stock: bool,
    pub on_sale: bool,
    pub sort: ProductSort,
    pub page: usize,
}

impl CatalogQuery {
    /// Parse a raw query string. Unknown keys and malformed values are
    /// ignored.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self {
            page: 1,
            ..Self::default()
        };
        let Some(raw) = raw else {
            return query;
        };

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim().to_string();
            match key.as_ref() {
                "q" => query.q = value,
                "min_price" => query.min_price = value,
                "max_price" => query.max_price = value,
                "brand" if !value.is_empty() => query.brands.push(value),
                "min_rating" => query.min_rating = value,
                "in_stock" => query.in_stock = !value.is_empty(),
                "on_sale" => query.on_sale = !value.is_empty(),
                "sort" => query.sort = ProductSort::parse_or_default(Some(&value)),
                "page" => query.page = value.parse().unwrap_or(1),
                _ => {}
            }
        }
        query
    }

    /// Catalog filter for this query, optionally restricted to a category.
    #[must_use]
    pub fn filter(&self, category: Option<&Category>) -> ProductFilter {
        ProductFilter {
            category_id: category.map(|c| c.id),
            min_price: parse_money(&self.min_price),
            max_price: parse_money(&self.max_price),
            brands: self.brands.clone(),
            min_rating: self.min_rating.parse::<Decimal>().ok(),
            in_stock_only: self.in_stock,
            on_sale_only: self.on_sale,
            query: Some(self.q.clone()).filter(|q| !q.is_empty()),
        }
    }

    /// Query string for the same filters on another page.
    #[must_use]
    pub fn with_page(&self, page: usize) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("q", &self.q),
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
            ("min_rating", &self.min_rating),
        ] {
            if !value.is_empty() {
                out.append_pair(key, value);
            }
        }
        for brand in &self.brands {
            out.append_pair("brand", brand);
        }
        if self.in_stock {
            out.append_pair("in_stock", "1");
        }
        if self.on_sale {
            out.append_pair("on_sale", "1");
        }
        if self.sort != ProductSort::default() {
            out.append_pair("sort", self.sort.as_str());
        }
        if page > 1 {
            out.append_pair("page", &page.to_string());
        }
        out.finish()
    }
}

// =============================================================================
// Listing
// =============================================================================

/// A choice in a select or checkbox group.
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Product listing template, shared by `/products` and `/categories/{slug}`.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct CatalogTemplate {
    pub layout: Layout,
    pub heading: String,
    pub intro: Option<String>,
    pub base_path: String,
    pub products: Vec<ProductCardView>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub first_item: usize,
    pub last_item: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub q: String,
    pub min_price: String,
    pub max_price: String,
    pub in_stock: bool,
    pub on_sale: bool,
    pub brands: Vec<OptionView>,
    pub ratings: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
    pub sort: String,
    pub price_hint: Option<String>,
    pub filters_active: bool,
}

fn page_url(base_path: &str, query: &CatalogQuery, page: usize) -> String {
    let qs = query.with_page(page);
    if qs.is_empty() {
        base_path.to_string()
    } else {
        format!("{base_path}?{qs}")
    }
}

/// Filter, sort and paginate the active catalog.
pub(crate) fn catalog_template(
    layout: Layout,
    dataset: &Dataset,
    query: &CatalogQuery,
    category: Option<&Category>,
) -> CatalogTemplate {
    let settings = &dataset.settings;
    let base_path = category.map_or_else(
        || "/products".to_string(),
        |c| format!("/categories/{}", c.slug),
    );

    // Facets describe the scope (whole catalog or category), not the result
    let scope: Vec<&Product> = dataset
        .active_products()
        .filter(|p| category.is_none_or(|c| p.category_id == c.id))
        .collect();
    let price_hint = price_range(&scope)
        .map(|(min, max)| format!("{} to {}", settings.money(min), settings.money(max)));
    let brands = brands(&scope)
        .into_iter()
        .map(|brand| OptionView {
            selected: query.brands.iter().any(|b| b.eq_ignore_ascii_case(&brand)),
            value: brand.clone(),
            label: brand,
        })
        .collect();

    let filter = query.filter(category);
    let mut matches: Vec<&Product> = filter_products(&dataset.products, &filter)
        .into_iter()
        .filter(|p| p.is_active())
        .collect();
    sort_products(&mut matches, query.sort);
    let page = paginate(matches, query.page, settings.products_per_page);

    let ratings = [("", "Any rating"), ("4", "4 stars & up"), ("3", "3 stars & up")]
        .into_iter()
        .map(|(value, label)| OptionView {
            value: value.to_string(),
            label: label.to_string(),
            selected: query.min_rating == value,
        })
        .collect();
    let sorts = ProductSort::ALL
        .into_iter()
        .map(|s| OptionView {
            value: s.as_str().to_string(),
            label: s.label().to_string(),
            selected: s == query.sort,
        })
        .collect();

    // The category itself is the page, not a filter the shopper can clear
    let filters_active = ProductFilter {
        category_id: None,
        ..filter.clone()
    }
    .is_active();

    CatalogTemplate {
        layout,
        heading: category.map_or_else(|| "All products".to_string(), |c| c.name.clone()),
        intro: category.map(|c| c.description.clone()),
        prev_url: page
            .has_previous()
            .then(|| page_url(&base_path, query, page.page - 1)),
        next_url: page
            .has_next()
            .then(|| page_url(&base_path, query, page.page + 1)),
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
        first_item: page.first_item_number(),
        last_item: page.last_item_number(),
        products: page
            .items
            .iter()
            .map(|p| ProductCardView::new(p, settings))
            .collect(),
        base_path,
        q: query.q.clone(),
        min_price: query.min_price.clone(),
        max_price: query.max_price.clone(),
        in_stock: query.in_stock,
        on_sale: query.on_sale,
        brands,
        ratings,
        sorts,
        sort: query.sort.as_str().to_string(),
        price_hint,
        filters_active,
    }
}

/// Display product listing page.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RawQuery(raw): RawQuery,
) -> CatalogTemplate {
    let query = CatalogQuery::parse(raw.as_deref());
    let layout = Layout::load(&state, &session).await;
    let dataset = state.store().read().await;
    catalog_template(layout, &dataset, &query, None)
}

// =============================================================================
// Detail
// =============================================================================

/// Purchasable variant choice.
pub struct VariantOption {
    pub id: i32,
    pub label: String,
    pub available: bool,
    pub note: Option<String>,
    pub selected: bool,
}

/// Product detail display data.
pub struct ProductDetailView {
    pub card: ProductCardView,
    pub description: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetailView,
    pub variants: Vec<VariantOption>,
    pub max_quantity: u32,
    pub related: Vec<ProductCardView>,
}

/// Shown for unknown or unpublished products, with featured products as a
/// fallback.
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub layout: Layout,
    pub slug: String,
    pub suggestions: Vec<ProductCardView>,
}

fn variant_options(product: &Product, low_stock_threshold: u32) -> Vec<VariantOption> {
    let default = product.variants.iter().find(|v| v.stock > 0).map(|v| v.id);
    product
        .variants
        .iter()
        .map(|v| VariantOption {
            id: v.id.as_i32(),
            label: v.label().unwrap_or_else(|| "Default".to_string()),
            available: v.stock > 0,
            note: match v.stock {
                0 => Some("Sold out".to_string()),
                n if n <= low_stock_threshold => Some(format!("Only {n} left")),
                _ => None,
            },
            selected: Some(v.id) == default,
        })
        .collect()
}

/// Display product detail page.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
) -> Response {
    let layout = Layout::load(&state, &session).await;
    let dataset = state.store().read().await;
    let settings = &dataset.settings;

    let Some(product) = dataset.product_by_slug(&slug).filter(|p| p.is_active()) else {
        tracing::debug!(slug = %slug, "Product not found");
        let suggestions = dataset
            .active_products()
            .filter(|p| p.featured)
            .take(RELATED_LIMIT)
            .map(|p| ProductCardView::new(p, settings))
            .collect();
        return (
            StatusCode::NOT_FOUND,
            ProductNotFoundTemplate {
                layout,
                slug,
                suggestions,
            },
        )
            .into_response();
    };

    let category = dataset.category(product.category_id);
    let view = ProductDetailView {
        card: ProductCardView::new(product, settings),
        description: product.description.clone(),
        images: product.images.clone(),
        tags: product.tags.clone(),
        category_name: category.map(|c| c.name.clone()),
        category_slug: category.map(|c| c.slug.clone()),
    };
    let related = related_products(&dataset.products, product, RELATED_LIMIT)
        .into_iter()
        .map(|p| ProductCardView::new(p, settings))
        .collect();

    ProductShowTemplate {
        layout,
        variants: variant_options(product, settings.low_stock_threshold),
        product: view,
        max_quantity: MAX_LINE_QUANTITY,
        related,
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let query = CatalogQuery::parse(Some(
            concat!(
                "q=canvas&brand=Northfold&brand=Harbor+%26+Pine",
                "&min_price=20&in_stock=1&sort=price-asc&page=2&junk=x",
            ),
        ));
        assert_eq!(query.q, "canvas");
        assert_eq!(query.brands, ["Northfold", "Harbor & Pine"]);
        assert!(query.in_stock);
        assert!(!query.on_sale);
        assert_eq!(query.sort, ProductSort::PriceAsc);
        assert_eq!(query.page, 2);

        let filter = query.filter(None);
        assert_eq!(filter.min_price, Some(Decimal::from(20)));
        assert_eq!(filter.max_price, None);
        assert_eq!(filter.query.as_deref(), Some("canvas"));
    }

    #[test]
    fn test_parse_bad_values_fall_back() {
        let query = CatalogQuery::parse(Some("page=abc&sort=cheapest&min_rating=lots"));
        assert_eq!(query.page, 1);
        assert_eq!(query.sort, ProductSort::Featured);
        assert_eq!(query.filter(None).min_rating, None);
        assert_eq!(CatalogQuery::parse(None).page, 1);
    }

    #[test]
    fn test_with_page_keeps_filters() {
        let query = CatalogQuery::parse(Some("brand=Harbor+%26+Pine&on_sale=1&sort=newest"));
        let qs = query.with_page(3);
        assert_eq!(CatalogQuery::parse(Some(&qs)), CatalogQuery { page: 3, ..query.clone() });
        assert_eq!(page_url("/products", &CatalogQuery::parse(None), 1), "/products");
    }

    #[test]
    fn test_catalog_restricted_to_category() {
        let dataset = Dataset::seed().unwrap();
        let bags = dataset.category_by_slug("bags").unwrap();
        let all_in_bags = |q: &CatalogQuery| {
            let filter = q.filter(Some(bags));
            filter_products(&dataset.products, &filter)
                .into_iter()
                .all(|p| p.category_id == bags.id)
        };
        assert!(all_in_bags(&CatalogQuery::parse(None)));
        assert!(all_in_bags(&CatalogQuery::parse(Some("sort=price-desc"))));
    }

    #[test]
    fn test_variant_options_preselect_first_in_stock() {
        let dataset = Dataset::seed().unwrap();
        let boot = dataset.product_by_slug("trailhead-hiking-boot").unwrap();
        let options = variant_options(boot, 5);

        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        let sold_out = options.iter().find(|o| !o.available).unwrap();
        assert_eq!(sold_out.note.as_deref(), Some("Sold out"));
        assert!(!sold_out.selected);
    }
}
