//! Product edit form.

use rust_decimal::Decimal;
use serde::Deserialize;

use harbor_core::catalog::{Category, Product};
use harbor_core::validation::{FieldErrors, is_valid_slug, parse_money};
use harbor_core::{CategoryId, ProductId, ProductStatus};

/// Product form, as posted. Every field arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: String,
    pub brand: String,
    pub price: String,
    pub discount_price: String,
    pub status: String,
    /// Checkbox: present when ticked.
    pub featured: Option<String>,
    /// Comma separated.
    pub tags: String,
    /// One image URL per line.
    pub images: String,
    /// Stock of the default variant. Only read when creating a product.
    pub stock: String,
}

/// A validated product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: CategoryId,
    pub brand: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub status: ProductStatus,
    pub featured: bool,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub initial_stock: u32,
}

impl ProductForm {
    /// Form pre-filled from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            category_id: product.category_id.to_string(),
            brand: product.brand.clone(),
            price: product.price.to_string(),
            discount_price: product
                .discount_price
                .map(|d| d.to_string())
                .unwrap_or_default(),
            status: product.status.as_str().to_string(),
            featured: product.featured.then(|| "on".to_string()),
            tags: product.tags.join(", "),
            images: product.images.join("\n"),
            stock: product.total_stock().to_string(),
        }
    }

    /// Blank form for a new product.
    #[must_use]
    pub fn new_product() -> Self {
        Self {
            status: ProductStatus::Draft.as_str().to_string(),
            stock: "0".to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_featured(&self) -> bool {
        self.featured.is_some()
    }

    /// Validate against the current catalog. `editing` is the product being
    /// edited, which may keep its own slug.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field fails.
    pub fn validate(
        &self,
        categories: &[Category],
        products: &[Product],
        editing: Option<ProductId>,
    ) -> Result<ProductInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = errors.require("name", "Name", &self.name);

        let slug = errors.require("slug", "Slug", &self.slug);
        if !slug.is_empty() {
            if !is_valid_slug(&slug) {
                errors.add(
                    "slug",
                    "Slug may only contain lowercase letters, digits and single dashes",
                );
            } else if products
                .iter()
                .any(|p| p.slug == slug && Some(p.id) != editing)
            {
                errors.add("slug", "Another product already uses this slug");
            }
        }

        let category_id = self
            .category_id
            .parse::<CategoryId>()
            .ok()
            .filter(|id| categories.iter().any(|c| c.id == *id))
            .unwrap_or_else(|| {
                errors.add("category_id", "Choose a category");
                CategoryId::new(0)
            });

        let price = if self.price.trim().is_empty() {
            errors.add("price", "Price is required");
            Decimal::ZERO
        } else {
            match parse_money(&self.price) {
                Some(p) if p > Decimal::ZERO => p,
                _ => {
                    errors.add("price", "Price must be an amount greater than zero");
                    Decimal::ZERO
                }
            }
        };

        let discount_price = if self.discount_price.trim().is_empty() {
            None
        } else {
            match parse_money(&self.discount_price) {
                Some(d) if d > Decimal::ZERO && (price.is_zero() || d < price) => Some(d),
                Some(d) if d > Decimal::ZERO => {
                    errors.add("discount_price", "Sale price must be lower than the price");
                    None
                }
                _ => {
                    errors.add("discount_price", "Sale price must be an amount greater than zero");
                    None
                }
            }
        };

        let status = self.status.parse::<ProductStatus>().unwrap_or_else(|_| {
            errors.add("status", "Choose a status");
            ProductStatus::Draft
        });

        let initial_stock = if editing.is_some() || self.stock.trim().is_empty() {
            0
        } else {
            self.stock.trim().parse::<u32>().unwrap_or_else(|_| {
                errors.add("stock", "Stock must be a whole number");
                0
            })
        };

        errors.into_result(ProductInput {
            name,
            slug,
            description: self.description.trim().to_string(),
            category_id,
            brand: self.brand.trim().to_string(),
            price,
            discount_price,
            status,
            featured: self.is_featured(),
            tags: split_list(&self.tags, ','),
            images: split_list(&self.images, '\n'),
            initial_stock,
        })
    }
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use harbor_core::Dataset;

    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: "Canvas Tote".to_string(),
            slug: "canvas-tote-xl".to_string(),
            category_id: "1".to_string(),
            price: "48.00".to_string(),
            status: "active".to_string(),
            featured: Some("on".to_string()),
            tags: "bags, canvas, ,gift".to_string(),
            images: "/static/img/tote.jpg\n\n".to_string(),
            stock: "12".to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_valid_form() {
        let dataset = Dataset::seed().unwrap();
        let input = form()
            .validate(&dataset.categories, &dataset.products, None)
            .unwrap();
        assert_eq!(input.price, Decimal::new(4800, 2));
        assert_eq!(input.tags, ["bags", "canvas", "gift"]);
        assert_eq!(input.images.len(), 1);
        assert_eq!(input.initial_stock, 12);
        assert!(input.featured);
    }

    #[test]
    fn test_required_fields() {
        let dataset = Dataset::seed().unwrap();
        let errors = ProductForm::default()
            .validate(&dataset.categories, &dataset.products, None)
            .unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.has("slug"));
        assert!(errors.has("price"));
        assert!(errors.has("category_id"));
    }

    #[test]
    fn test_price_rules() {
        let dataset = Dataset::seed().unwrap();
        let mut bad = form();
        bad.price = "0".to_string();
        let errors = bad
            .validate(&dataset.categories, &dataset.products, None)
            .unwrap_err();
        assert!(errors.has("price"));

        let mut bad = form();
        bad.discount_price = "48.00".to_string();
        let errors = bad
            .validate(&dataset.categories, &dataset.products, None)
            .unwrap_err();
        assert_eq!(
            errors.get("discount_price"),
            Some("Sale price must be lower than the price")
        );
    }

    #[test]
    fn test_slug_must_be_unique_except_for_itself() {
        let dataset = Dataset::seed().unwrap();
        let existing = &dataset.products[0];
        let mut taken = ProductForm::from_product(existing);

        let errors = taken
            .validate(&dataset.categories, &dataset.products, None)
            .unwrap_err();
        assert!(errors.has("slug"));

        taken.stock = "not a number".to_string();
        assert!(
            taken
                .validate(&dataset.categories, &dataset.products, Some(existing.id))
                .is_ok()
        );
    }

    #[test]
    fn test_slug_format() {
        let dataset = Dataset::seed().unwrap();
        let mut bad = form();
        bad.slug = "Canvas Tote".to_string();
        let errors = bad
            .validate(&dataset.categories, &dataset.products, None)
            .unwrap_err();
        assert!(errors.has("slug"));
    }
}
