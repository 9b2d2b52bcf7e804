//! Catalog records and the list transforms the storefront and admin share:
//! filtering, sorting, pagination and facet extraction.
//!
//! All operations are pure functions over slices of [`Product`]. Prices are
//! compared on the *effective* price, which is the discount price when one is
//! set and the list price otherwise.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId, ProductStatus, VariantId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// A purchasable color/size combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub sku: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub stock: u32,
}

impl Variant {
    /// "Navy / M", "Navy", "M" or `None` for a default variant.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match (self.color.as_deref(), self.size.as_deref()) {
            (Some(color), Some(size)) => Some(format!("{color} / {size}")),
            (Some(one), None) | (None, Some(one)) => Some(one.to_owned()),
            (None, None) => None,
        }
    }
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub category_id: CategoryId,
    pub brand: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    /// Average review score, 0 to 5.
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Discount price if present, else list price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether a discount price below the list price is set.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.discount_price.is_some_and(|d| d < self.price)
    }

    /// Whole-percent saving for sale badges ("-25%").
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        use rust_decimal::prelude::ToPrimitive;

        if !self.is_on_sale() || self.price.is_zero() {
            return None;
        }
        let saving = (self.price - self.effective_price()) / self.price * Decimal::ONE_HUNDRED;
        saving
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    }

    /// Sum of variant stock.
    #[must_use]
    pub fn total_stock(&self) -> u32 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(|v| v.stock > 0)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Look up one of this product's variants.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Case-insensitive substring match over name, brand and tags.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.brand.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }
}

/// Catalog filter criteria. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    /// Inclusive lower bound on effective price.
    pub min_price: Option<Decimal>,
    /// Inclusive upper bound on effective price.
    pub max_price: Option<Decimal>,
    /// Accepted brands, compared case-insensitively. Empty means any brand.
    pub brands: Vec<String>,
    pub min_rating: Option<Decimal>,
    pub in_stock_only: bool,
    pub on_sale_only: bool,
    pub query: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let price = product.effective_price();
        self.category_id.is_none_or(|c| product.category_id == c)
            && self.min_price.is_none_or(|min| price >= min)
            && self.max_price.is_none_or(|max| price <= max)
            && (self.brands.is_empty()
                || self
                    .brands
                    .iter()
                    .any(|b| b.eq_ignore_ascii_case(&product.brand)))
            && self.min_rating.is_none_or(|r| product.rating >= r)
            && (!self.in_stock_only || product.in_stock())
            && (!self.on_sale_only || product.is_on_sale())
            && self
                .query
                .as_deref()
                .is_none_or(|q| product.matches_query(q))
    }

    /// Whether any criterion is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }
}

/// Apply `filter`, keeping catalog order.
#[must_use]
pub fn filter_products<'a>(products: &'a [Product], filter: &ProductFilter) -> Vec<&'a Product> {
    products.iter().filter(|p| filter.matches(p)).collect()
}

/// Catalog sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductSort {
    /// Featured products first, then catalog order.
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    Newest,
    TopRated,
}

impl ProductSort {
    pub const ALL: [Self; 7] = [
        Self::Featured,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::NameAsc,
        Self::NameDesc,
        Self::Newest,
        Self::TopRated,
    ];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::Newest => "newest",
            Self::TopRated => "rating",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::NameAsc => "Name: A to Z",
            Self::NameDesc => "Name: Z to A",
            Self::Newest => "Newest",
            Self::TopRated => "Top Rated",
        }
    }

    /// Parse a query-string value, falling back to the default order.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::ALL.into_iter().find(|s| s.as_str() == v))
            .unwrap_or_default()
    }
}

/// Sort in place. The sort is stable, so ties keep catalog order.
pub fn sort_products(products: &mut [&Product], sort: ProductSort) {
    match sort {
        ProductSort::Featured => products.sort_by_key(|p| !p.featured),
        ProductSort::PriceAsc => products.sort_by_key(|p| p.effective_price()),
        ProductSort::PriceDesc => {
            products.sort_by(|a, b| b.effective_price().cmp(&a.effective_price()));
        }
        ProductSort::NameAsc => products.sort_by_cached_key(|p| p.name.to_lowercase()),
        ProductSort::NameDesc => {
            products.sort_by(|a, b| b.name.to_lowercase().cmp(&a.name.to_lowercase()));
        }
        ProductSort::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        ProductSort::TopRated => products.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| b.review_count.cmp(&a.review_count))
        }),
    }
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number, always within `1..=total_pages`.
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    /// At least 1, even for an empty list.
    pub total_pages: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based index of the first item on this page, 0 when empty.
    #[must_use]
    pub const fn first_item_number(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }

    /// 1-based index of the last item on this page, 0 when empty.
    #[must_use]
    pub const fn last_item_number(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.per_page + self.items.len()
        }
    }

    /// Map the items, keeping the page bookkeeping.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Slice `items` into pages of `per_page` and return page `page`.
///
/// Page numbers outside the valid range are clamped; `per_page` of 0 is
/// treated as 1.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

/// Distinct brands, sorted case-insensitively.
#[must_use]
pub fn brands(products: &[&Product]) -> Vec<String> {
    let mut brands: Vec<String> = products.iter().map(|p| p.brand.clone()).collect();
    brands.sort_by_key(|b| b.to_lowercase());
    brands.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    brands
}

/// Lowest and highest effective price, `None` for an empty slice.
#[must_use]
pub fn price_range(products: &[&Product]) -> Option<(Decimal, Decimal)> {
    let prices = products.iter().map(|p| p.effective_price());
    let min = prices.clone().min()?;
    let max = prices.max()?;
    Some((min, max))
}

/// Active products in the same category as `product`, excluding it.
#[must_use]
pub fn related_products<'a>(
    products: &'a [Product],
    product: &Product,
    limit: usize,
) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| p.id != product.id && p.category_id == product.category_id && p.is_active())
        .take(limit)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    pub(crate) fn product(id: i32, name: &str, category: i32, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: String::new(),
            category_id: CategoryId::new(category),
            brand: "Harbor".to_owned(),
            price: d(price),
            discount_price: None,
            rating: d("4"),
            review_count: 10,
            images: Vec::new(),
            tags: Vec::new(),
            status: ProductStatus::Active,
            featured: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(i64::from(id)),
            variants: vec![Variant {
                id: VariantId::new(id * 10),
                sku: format!("SKU-{id}"),
                color: None,
                size: None,
                stock: 5,
            }],
        }
    }

    fn sample() -> Vec<Product> {
        let mut a = product(1, "Canvas Tote", 1, "40");
        a.discount_price = Some(d("15"));
        a.brand = "Pine".to_owned();
        let b = product(2, "anchor mug", 2, "20");
        let mut c = product(3, "Rain Shell", 1, "120");
        c.rating = d("4.8");
        c.featured = true;
        c.variants[0].stock = 0;
        vec![a, b, c]
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        let products = sample();
        assert_eq!(products[0].effective_price(), d("15"));
        assert_eq!(products[1].effective_price(), d("20"));
        assert_eq!(products[0].discount_percent(), Some(63));
    }

    #[test]
    fn test_filter_by_category_restricts_results() {
        let products = sample();
        let filter = ProductFilter {
            category_id: Some(CategoryId::new(1)),
            ..ProductFilter::default()
        };
        let result = filter_products(&products, &filter);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.category_id == CategoryId::new(1)));
    }

    #[test]
    fn test_filter_price_range_uses_effective_price() {
        let products = sample();
        let filter = ProductFilter {
            min_price: Some(d("10")),
            max_price: Some(d("20")),
            ..ProductFilter::default()
        };
        let ids: Vec<i32> = filter_products(&products, &filter)
            .iter()
            .map(|p| p.id.as_i32())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_filter_inverted_price_range_is_empty() {
        let products = sample();
        let filter = ProductFilter {
            min_price: Some(d("50")),
            max_price: Some(d("10")),
            ..ProductFilter::default()
        };
        assert!(filter_products(&products, &filter).is_empty());
    }

    #[test]
    fn test_filter_brand_rating_stock_and_query() {
        let products = sample();
        let by_brand = ProductFilter {
            brands: vec!["pine".to_owned()],
            ..ProductFilter::default()
        };
        assert_eq!(filter_products(&products, &by_brand).len(), 1);

        let by_rating = ProductFilter {
            min_rating: Some(d("4.5")),
            ..ProductFilter::default()
        };
        assert_eq!(filter_products(&products, &by_rating)[0].id, ProductId::new(3));

        let in_stock = ProductFilter {
            in_stock_only: true,
            ..ProductFilter::default()
        };
        assert_eq!(filter_products(&products, &in_stock).len(), 2);

        let query = ProductFilter {
            query: Some("MUG".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter_products(&products, &query)[0].id, ProductId::new(2));
    }

    #[test]
    fn test_filter_empty_input() {
        assert!(filter_products(&[], &ProductFilter::default()).is_empty());
    }

    #[test]
    fn test_sort_price_ascending_is_non_decreasing() {
        let products = sample();
        let mut list: Vec<&Product> = products.iter().collect();
        sort_products(&mut list, ProductSort::PriceAsc);
        assert!(
            list.windows(2)
                .all(|w| w[0].effective_price() <= w[1].effective_price())
        );
        assert_eq!(list[0].id, ProductId::new(1));
    }

    #[test]
    fn test_sort_name_is_case_insensitive() {
        let products = sample();
        let mut list: Vec<&Product> = products.iter().collect();
        sort_products(&mut list, ProductSort::NameAsc);
        let names: Vec<&str> = list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["anchor mug", "Canvas Tote", "Rain Shell"]);
    }

    #[test]
    fn test_sort_newest_and_featured() {
        let products = sample();
        let mut list: Vec<&Product> = products.iter().collect();
        sort_products(&mut list, ProductSort::Newest);
        assert_eq!(list[0].id, ProductId::new(3));

        let mut list: Vec<&Product> = products.iter().collect();
        sort_products(&mut list, ProductSort::Featured);
        assert_eq!(list[0].id, ProductId::new(3));
        assert_eq!(list[1].id, ProductId::new(1));
    }

    #[test]
    fn test_sort_parse_falls_back() {
        assert_eq!(
            ProductSort::parse_or_default(Some("price-desc")),
            ProductSort::PriceDesc
        );
        assert_eq!(
            ProductSort::parse_or_default(Some("bogus")),
            ProductSort::Featured
        );
    }

    #[test]
    fn test_paginate_clamps_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 9, 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.first_item_number(), 21);
        assert!(!page.has_next());

        let first = paginate((1..=25).collect::<Vec<_>>(), 0, 10);
        assert_eq!(first.page, 1);
        assert!(!first.has_previous());
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u8>::new(), 1, 12);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.first_item_number(), 0);
    }

    #[test]
    fn test_facets() {
        let products = sample();
        let list: Vec<&Product> = products.iter().collect();
        assert_eq!(brands(&list), vec!["Harbor", "Pine"]);
        assert_eq!(price_range(&list), Some((d("15"), d("120"))));
        assert_eq!(price_range(&[]), None);
    }

    #[test]
    fn test_related_products() {
        let products = sample();
        let related = related_products(&products, &products[0], 4);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, ProductId::new(3));
    }

    #[test]
    fn test_variant_label() {
        let mut v = sample()[0].variants[0].clone();
        assert_eq!(v.label(), None);
        v.color = Some("Navy".to_owned());
        v.size = Some("M".to_owned());
        assert_eq!(v.label().as_deref(), Some("Navy / M"));
    }
}
