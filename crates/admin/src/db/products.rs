//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use harbor_core::catalog::{Product, Variant};
use harbor_core::{ProductId, ProductStatus, VariantId, next_id};

use super::{RepositoryError, Store};
use crate::models::ProductInput;

/// Repository for product operations.
pub struct ProductRepository<'a> {
    store: &'a Store,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: ProductId) -> Option<Product> {
        self.store.read().await.product(id).cloned()
    }

    /// Add a product with a single default variant holding the initial
    /// stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug was taken meanwhile.
    pub async fn create(
        &self,
        input: ProductInput,
        now: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let mut dataset = self.store.write().await;
        if dataset.product_by_slug(&input.slug).is_some() {
            return Err(RepositoryError::Conflict(format!("slug {}", input.slug)));
        }

        let id: ProductId = next_id(dataset.products.iter().map(|p| p.id));
        let variant_id: VariantId = next_id(
            dataset
                .products
                .iter()
                .flat_map(|p| p.variants.iter().map(|v| v.id)),
        );
        let product = Product {
            id,
            name: input.name,
            slug: input.slug.clone(),
            description: input.description,
            category_id: input.category_id,
            brand: input.brand,
            price: input.price,
            discount_price: input.discount_price,
            rating: Decimal::ZERO,
            review_count: 0,
            images: input.images,
            tags: input.tags,
            status: input.status,
            featured: input.featured,
            created_at: now,
            variants: vec![Variant {
                id: variant_id,
                sku: input.slug.to_uppercase(),
                color: None,
                size: None,
                stock: input.initial_stock,
            }],
        };
        dataset.products.push(product.clone());
        Ok(product)
    }

    /// Replace a product's editable fields. Variants, rating and creation
    /// date are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if the slug was taken meanwhile.
    pub async fn update(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product, RepositoryError> {
        let mut dataset = self.store.write().await;
        if dataset
            .products
            .iter()
            .any(|p| p.slug == input.slug && p.id != id)
        {
            return Err(RepositoryError::Conflict(format!("slug {}", input.slug)));
        }

        let product = dataset
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.name = input.name;
        product.slug = input.slug;
        product.description = input.description;
        product.category_id = input.category_id;
        product.brand = input.brand;
        product.price = input.price;
        product.discount_price = input.discount_price;
        product.status = input.status;
        product.featured = input.featured;
        product.tags = input.tags;
        product.images = input.images;
        Ok(product.clone())
    }

    /// Delete a product that has never been ordered. Ordered products stay
    /// so order history keeps resolving; archive them instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if an order references the product.
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let mut dataset = self.store.write().await;
        let position = dataset
            .products
            .iter()
            .position(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if dataset
            .orders
            .iter()
            .any(|o| o.items.iter().any(|i| i.product_id == id))
        {
            return Err(RepositoryError::Conflict(
                "product appears in orders".to_string(),
            ));
        }
        Ok(dataset.products.remove(position))
    }

    /// Publish a draft or archived product, or take an active one back to
    /// draft. Returns the new status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn toggle_status(&self, id: ProductId) -> Result<ProductStatus, RepositoryError> {
        let mut dataset = self.store.write().await;
        let product = dataset
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.status = product.status.toggled();
        Ok(product.status)
    }

    /// Set one variant's stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or variant does
    /// not exist.
    pub async fn set_stock(
        &self,
        id: ProductId,
        variant_id: VariantId,
        stock: u32,
    ) -> Result<Variant, RepositoryError> {
        let mut dataset = self.store.write().await;
        let variant = dataset
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .and_then(|p| p.variants.iter_mut().find(|v| v.id == variant_id))
            .ok_or(RepositoryError::NotFound)?;
        variant.stock = stock;
        Ok(variant.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use harbor_core::{CategoryId, Dataset};

    use super::*;

    fn input(slug: &str) -> ProductInput {
        ProductInput {
            name: "Tide Pool Socks".to_string(),
            slug: slug.to_string(),
            description: String::new(),
            category_id: CategoryId::new(6),
            brand: "Harbor & Pine".to_string(),
            price: Decimal::new(1800, 2),
            discount_price: None,
            status: ProductStatus::Draft,
            featured: false,
            tags: vec![],
            images: vec![],
            initial_stock: 9,
        }
    }

    fn store() -> Store {
        Store::new(Dataset::seed().unwrap())
    }

    #[tokio::test]
    async fn test_create_keeps_dataset_consistent() {
        let store = store();
        let product = ProductRepository::new(&store)
            .create(input("tide-pool-socks"), Utc::now())
            .await
            .unwrap();
        assert_eq!(product.total_stock(), 9);
        assert!(store.read().await.integrity_errors().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_slug() {
        let store = store();
        let taken = store.read().await.products[0].slug.clone();
        let result = ProductRepository::new(&store)
            .create(input(&taken), Utc::now())
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_ordered_products_cannot_be_deleted() {
        let store = store();
        let ordered = store.read().await.orders[0].items[0].product_id;
        let repo = ProductRepository::new(&store);
        assert!(matches!(
            repo.delete(ordered).await,
            Err(RepositoryError::Conflict(_))
        ));

        let fresh = repo.create(input("tide-pool-socks"), Utc::now()).await.unwrap();
        repo.delete(fresh.id).await.unwrap();
        assert!(repo.get(fresh.id).await.is_none());
    }

    #[tokio::test]
    async fn test_toggle_and_restock() {
        let store = store();
        let repo = ProductRepository::new(&store);
        let product = store.read().await.products[0].clone();

        let status = repo.toggle_status(product.id).await.unwrap();
        assert_eq!(status, product.status.toggled());

        let variant = repo
            .set_stock(product.id, product.variants[0].id, 40)
            .await
            .unwrap();
        assert_eq!(variant.stock, 40);
        assert!(matches!(
            repo.set_stock(product.id, VariantId::new(-1), 1).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
