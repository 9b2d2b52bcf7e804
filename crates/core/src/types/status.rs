//! Status enums for orders, payments, products, coupons and users.
//!
//! Each enum round-trips through its `snake_case` string form so it can be
//! used in seed files, query strings and form posts alike.

use serde::{Deserialize, Serialize};

/// Error returned when a status string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The machine-readable form used in URLs and forms.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Order lifecycle status.
///
/// Forward path: `Pending → Processing → Shipped → Delivered`. An order may
/// be cancelled while it is still `Pending` or `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// Error returned for a status change outside the order lifecycle.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot move an order from {from} to {to}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// The forward (non-cancelled) path shown on the tracking timeline.
    pub const TIMELINE: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// CSS badge class for tables and detail pages.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Pending => "badge badge-warning",
            Self::Processing => "badge badge-info",
            Self::Shipped => "badge badge-primary",
            Self::Delivered => "badge badge-success",
            Self::Cancelled => "badge badge-error",
        }
    }

    /// Position on the forward timeline, `None` for cancelled orders.
    #[must_use]
    pub fn timeline_position(&self) -> Option<usize> {
        Self::TIMELINE.iter().position(|s| s == self)
    }

    /// Whether an order in this status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Statuses reachable from this one.
    #[must_use]
    pub fn next_statuses(&self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|s| self.can_transition_to(*s))
            .collect()
    }

    /// Validate a status change.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if `next` is not reachable from `self`.
    pub const fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }

    /// Whether the order is finished (no further transitions).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
    Failed,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
    Failed => "failed",
});

impl PaymentStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Refunded => "Refunded",
            Self::Failed => "Failed",
        }
    }

    /// CSS badge class.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Pending => "badge badge-warning",
            Self::Paid => "badge badge-success",
            Self::Refunded => "badge badge-neutral",
            Self::Failed => "badge badge-error",
        }
    }
}

/// Catalog visibility of a product. Only `Active` products are sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

string_enum!(ProductStatus, "product status", {
    Active => "active",
    Draft => "draft",
    Archived => "archived",
});

impl ProductStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Draft, Self::Archived];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Draft => "Draft",
            Self::Archived => "Archived",
        }
    }

    /// CSS badge class.
    #[must_use]
    pub const fn badge_class(&self) -> &'static str {
        match self {
            Self::Active => "badge badge-success",
            Self::Draft => "badge badge-neutral",
            Self::Archived => "badge badge-warning",
        }
    }

    /// Status after the admin "toggle" action: active products go to draft,
    /// everything else becomes active.
    #[must_use]
    pub const fn toggled(&self) -> Self {
        match self {
            Self::Active => Self::Draft,
            Self::Draft | Self::Archived => Self::Active,
        }
    }
}

/// User role. Admin-role users may sign in to the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

string_enum!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});
