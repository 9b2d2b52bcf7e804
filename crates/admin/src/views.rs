//! Display models shared across admin pages.

use chrono::{DateTime, Utc};
use tower_sessions::Session;

use harbor_core::order::Order;
use harbor_core::settings::StoreSettings;

use crate::models::session::take_flash;
use crate::models::{CurrentAdmin, Flash};
use crate::state::AppState;

/// Sidebar sections, in display order.
const NAV: [(&str, &str); 6] = [
    ("Dashboard", "/"),
    ("Products", "/products"),
    ("Orders", "/orders"),
    ("Customers", "/customers"),
    ("Coupons", "/coupons"),
    ("Settings", "/settings"),
];

pub struct NavItem {
    pub label: &'static str,
    pub href: &'static str,
    pub active: bool,
}

/// Everything `base.html` renders around a page.
pub struct Layout {
    pub store_name: String,
    pub admin_user: CurrentAdmin,
    pub current_path: String,
    pub nav: Vec<NavItem>,
    pub flash: Option<Flash>,
}

impl Layout {
    /// Gather layout data for the current request. Consumes the pending
    /// flash message, if any.
    pub async fn load(
        state: &AppState,
        session: &Session,
        admin_user: CurrentAdmin,
        current_path: &str,
    ) -> Self {
        let store_name = state.store().read().await.settings.store_name.clone();
        Self {
            store_name,
            admin_user,
            current_path: current_path.to_string(),
            nav: nav_for(current_path),
            flash: take_flash(session).await,
        }
    }
}

fn nav_for(current_path: &str) -> Vec<NavItem> {
    NAV.iter()
        .map(|&(label, href)| NavItem {
            label,
            href,
            active: if href == "/" {
                current_path == "/"
            } else {
                current_path == href || current_path.starts_with(&format!("{href}/"))
            },
        })
        .collect()
}

/// An `<option>` of a form select.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        Self {
            selected: value == current,
            label: label.into(),
            value,
        }
    }
}

/// One row of an order table.
pub struct OrderRowView {
    pub id: i32,
    pub number: String,
    pub placed_at: String,
    pub email: String,
    pub item_count: u32,
    pub total: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub payment_label: &'static str,
    pub payment_class: &'static str,
}

impl OrderRowView {
    #[must_use]
    pub fn new(order: &Order, settings: &StoreSettings) -> Self {
        Self {
            id: order.id.as_i32(),
            number: order.number.clone(),
            placed_at: format_datetime(order.placed_at),
            email: order.email.clone(),
            item_count: order.item_count(),
            total: settings.money(order.total),
            status_label: order.status.label(),
            status_class: order.status.badge_class(),
            payment_label: order.payment_status.label(),
            payment_class: order.payment_status.badge_class(),
        }
    }
}

/// "Mar 4, 2025"
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// "Mar 4, 2025 14:05 UTC"
#[must_use]
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M UTC").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn active(path: &str) -> Vec<&'static str> {
        nav_for(path)
            .into_iter()
            .filter(|n| n.active)
            .map(|n| n.label)
            .collect()
    }

    #[test]
    fn test_nav_marks_current_section() {
        assert_eq!(active("/"), ["Dashboard"]);
        assert_eq!(active("/orders/4"), ["Orders"]);
        assert_eq!(active("/coupons/new"), ["Coupons"]);
        assert!(active("/ordersx").is_empty());
    }

    #[test]
    fn test_format_datetime() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 14, 5, 0).unwrap();
        assert_eq!(format_date(at), "Mar 4, 2025");
        assert_eq!(format_datetime(at), "Mar 4, 2025 14:05 UTC");
    }
}
