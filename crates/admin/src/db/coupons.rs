//! Coupon repository.

use harbor_core::coupon::{Coupon, normalize_code};
use harbor_core::{CouponId, next_id};

use super::{RepositoryError, Store};
use crate::models::CouponInput;

/// Repository for coupon operations.
pub struct CouponRepository<'a> {
    store: &'a Store,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: CouponId) -> Option<Coupon> {
        self.store.read().await.coupon(id).cloned()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code was taken meanwhile.
    pub async fn create(&self, input: CouponInput) -> Result<Coupon, RepositoryError> {
        let mut dataset = self.store.write().await;
        ensure_code_free(&dataset.coupons, &input.code, None)?;

        let coupon = Coupon {
            id: next_id(dataset.coupons.iter().map(|c| c.id)),
            code: input.code,
            description: input.description,
            discount: input.discount,
            min_subtotal: input.min_subtotal,
            usage_limit: input.usage_limit,
            times_used: 0,
            starts_at: input.starts_at,
            expires_at: input.expires_at,
            active: input.active,
        };
        dataset.coupons.push(coupon.clone());
        Ok(coupon)
    }

    /// Replace a coupon's editable fields. The usage count is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if the code was taken meanwhile.
    pub async fn update(
        &self,
        id: CouponId,
        input: CouponInput,
    ) -> Result<Coupon, RepositoryError> {
        let mut dataset = self.store.write().await;
        ensure_code_free(&dataset.coupons, &input.code, Some(id))?;

        let coupon = dataset
            .coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        coupon.code = input.code;
        coupon.description = input.description;
        coupon.discount = input.discount;
        coupon.min_subtotal = input.min_subtotal;
        coupon.usage_limit = input.usage_limit;
        coupon.starts_at = input.starts_at;
        coupon.expires_at = input.expires_at;
        coupon.active = input.active;
        Ok(coupon.clone())
    }

    /// Switch a coupon off without removing it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn deactivate(&self, id: CouponId) -> Result<Coupon, RepositoryError> {
        let mut dataset = self.store.write().await;
        let coupon = dataset
            .coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        coupon.active = false;
        Ok(coupon.clone())
    }

    /// Remove a coupon. Orders that used it keep the code they were placed
    /// with.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: CouponId) -> Result<Coupon, RepositoryError> {
        let mut dataset = self.store.write().await;
        let position = dataset
            .coupons
            .iter()
            .position(|c| c.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(dataset.coupons.remove(position))
    }
}

fn ensure_code_free(
    coupons: &[Coupon],
    code: &str,
    editing: Option<CouponId>,
) -> Result<(), RepositoryError> {
    let code = normalize_code(code);
    if coupons
        .iter()
        .any(|c| normalize_code(&c.code) == code && Some(c.id) != editing)
    {
        return Err(RepositoryError::Conflict(format!("coupon code {code}")));
    }
    Ok(())
}
