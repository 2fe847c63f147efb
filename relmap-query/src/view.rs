//! Destination views: the objects relationship fetches deliver.

use crate::error::FetchResult;
use crate::value::{Row, Value};

/// A destination type materialized from a store entity.
///
/// Views are identified by a single key field. Declaring zero or several key
/// fields is accepted by the compiler but rejected when a
/// [`RelationshipDescriptor`](crate::RelationshipDescriptor) or
/// [`RelationFetcher`](crate::RelationFetcher) is built for the view.
///
/// ```rust
/// use relmap_query::{Value, View};
///
/// struct OrderView {
///     id: i64,
/// }
///
/// impl View for OrderView {
///     const SOURCE_ENTITY: &'static str = "Order";
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
///
///     fn primary_key_value(&self) -> Value {
///         self.id.into()
///     }
/// }
/// ```
pub trait View: Send + Sync + 'static {
    /// Name of the store entity this view is projected from.
    const SOURCE_ENTITY: &'static str;

    /// Identifier field names.
    const PRIMARY_KEY: &'static [&'static str];

    /// The identifier of this instance.
    fn primary_key_value(&self) -> Value;
}

/// Build a value from a store row.
pub trait FromRow: Sized {
    /// Decode one row.
    fn from_row(row: &Row) -> FetchResult<Self>;
}

/// Check that a view declares exactly one identifier field and return it.
pub fn view_key<V: View>() -> FetchResult<&'static str> {
    match V::PRIMARY_KEY {
        [key] => Ok(key),
        [] => Err(crate::error::FetchError::missing_identifier(
            std::any::type_name::<V>(),
        )),
        keys => Err(crate::error::FetchError::composite_identifier(
            std::any::type_name::<V>(),
            keys.len(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    struct Keyed;
    struct Keyless;
    struct Composite;

    impl View for Keyed {
        const SOURCE_ENTITY: &'static str = "Order";
        const PRIMARY_KEY: &'static [&'static str] = &["id"];
        fn primary_key_value(&self) -> Value {
            Value::Int(1)
        }
    }

    impl View for Keyless {
        const SOURCE_ENTITY: &'static str = "Order";
        const PRIMARY_KEY: &'static [&'static str] = &[];
        fn primary_key_value(&self) -> Value {
            Value::Null
        }
    }

    impl View for Composite {
        const SOURCE_ENTITY: &'static str = "OrderLine";
        const PRIMARY_KEY: &'static [&'static str] = &["order_id", "line_no"];
        fn primary_key_value(&self) -> Value {
            Value::Null
        }
    }

    #[test]
    fn test_view_key() {
        assert_eq!(view_key::<Keyed>().unwrap(), "id");
        assert_eq!(view_key::<Keyless>().unwrap_err().code, ErrorCode::MissingIdentifier);
        assert_eq!(view_key::<Composite>().unwrap_err().code, ErrorCode::CompositeIdentifier);
    }
}
