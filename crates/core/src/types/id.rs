//! Newtype IDs for type-safe entity references.
//!
//! Seed records reference each other by numeric id (order → product,
//! cart line → variant). Wrapping each id in its own type keeps a
//! `VariantId` from being passed where a `ProductId` is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>`, `Into<i32>` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use harbor_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BinId);
///
/// let shelf = ShelfId::new(1);
/// let bin = BinId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = bin;
/// # let _ = (shelf, bin);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(VariantId);
define_id!(CategoryId);
define_id!(OrderId);
define_id!(UserId);
define_id!(CouponId);

/// Allocate the next id after the largest one in `ids`, starting at 1.
pub fn next_id<T, I>(ids: I) -> T
where
    T: Copy + Ord + From<i32>,
    I: IntoIterator<Item = T>,
    i32: From<T>,
{
    ids.into_iter()
        .max()
        .map_or_else(|| T::from(1), |max| T::from(i32::from(max) + 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_empty() {
        let id: ProductId = next_id(Vec::<ProductId>::new());
        assert_eq!(id, ProductId::new(1));
    }

    #[test]
    fn test_next_id_skips_gaps() {
        let id = next_id([OrderId::new(3), OrderId::new(9), OrderId::new(4)]);
        assert_eq!(id, OrderId::new(10));
    }

    #[test]
    fn test_from_str_trims() {
        let id: VariantId = " 42 ".parse().unwrap();
        assert_eq!(id.as_i32(), 42);
        assert!("abc".parse::<VariantId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&CategoryId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
