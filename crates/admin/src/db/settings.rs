//! Store settings.
//!
//! Settings changes apply to checkout quotes from the next request on.

use harbor_core::settings::StoreSettings;

use super::Store;

/// Current store settings.
pub async fn get_settings(store: &Store) -> StoreSettings {
    store.read().await.settings.clone()
}

/// Replace the store settings with an already validated set.
pub async fn update_settings(store: &Store, settings: StoreSettings) {
    let mut dataset = store.write().await;
    tracing::info!(
        store_name = %settings.store_name,
        currency = settings.currency.code(),
        tax_rate_percent = %settings.tax_rate_percent,
        "Store settings updated"
    );
    dataset.settings = settings;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use harbor_core::Dataset;
    use rust_decimal::Decimal;

    use super::*;

    #[tokio::test]
    async fn test_update_replaces_settings() {
        let store = Store::new(Dataset::seed().unwrap());
        let mut settings = get_settings(&store).await;
        settings.tax_rate_percent = Decimal::new(725, 2);
        settings.free_shipping_threshold = None;

        update_settings(&store, settings.clone()).await;
        assert_eq!(get_settings(&store).await, settings);
    }
}
