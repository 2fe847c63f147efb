//! Shared fixtures for unit tests.

use relmap_schema::{EntityModel, FieldDef, JoinTableSpec, RelationDef, Schema};

use crate::error::{FetchError, FetchResult};
use crate::store::MemoryStore;
use crate::value::{Row, Value};
use crate::view::{FromRow, View};

pub(crate) fn shop_schema() -> Schema {
    Schema::new()
        .with_entity(
            EntityModel::new("Customer")
                .table("customers")
                .field(FieldDef::id("id"))
                .field(FieldDef::new("name"))
                .relation(RelationDef::one_to_many("orders", "Order").references(["customer_id"])),
        )
        .with_entity(
            EntityModel::new("Order")
                .table("orders")
                .field(FieldDef::id("id"))
                .field(FieldDef::new("customer_id"))
                .relation(RelationDef::many_to_one("customer", "Customer").fields(["customer_id"]))
                .relation(RelationDef::many_to_many(
                    "tags",
                    "Tag",
                    JoinTableSpec::new("order_tags", "order_id", "tag_id"),
                )),
        )
        .with_entity(
            EntityModel::new("Tag")
                .table("tags")
                .field(FieldDef::id("id"))
                .field(FieldDef::new("label")),
        )
}

/// Customers 1, 2, 3; orders 10 and 11 belong to 1, order 12 to 3.
pub(crate) fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (id, name) in [(1, "Ada"), (2, "Brook"), (3, "Cyd")] {
        store.insert("customers", Row::new().with("id", id).with("name", name));
    }
    for (id, customer) in [(10, 1), (11, 1), (12, 3)] {
        store.insert("orders", Row::new().with("id", id).with("customer_id", customer));
    }
    for (id, label) in [(100, "rush"), (101, "gift")] {
        store.insert("tags", Row::new().with("id", id).with("label", label));
    }
    for (order, tag) in [(10, 100), (10, 101), (11, 100), (12, 101)] {
        store.insert("order_tags", Row::new().with("order_id", order).with("tag_id", tag));
    }
    store
}

fn int(row: &Row, entity: &str, column: &str) -> FetchResult<i64> {
    row.get_or_null(column)
        .as_int()
        .ok_or_else(|| FetchError::row_decode(entity, format!("`{}` is not an integer", column)))
}

#[derive(Debug, PartialEq)]
pub(crate) struct CustomerView {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl View for CustomerView {
    const SOURCE_ENTITY: &'static str = "Customer";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn primary_key_value(&self) -> Value {
        self.id.into()
    }
}

impl FromRow for CustomerView {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            id: int(row, "Customer", "id")?,
            name: row.get_or_null("name").as_str().unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct OrderView {
    pub(crate) id: i64,
    pub(crate) customer_id: i64,
}

impl View for OrderView {
    const SOURCE_ENTITY: &'static str = "Order";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn primary_key_value(&self) -> Value {
        self.id.into()
    }
}

impl FromRow for OrderView {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            id: int(row, "Order", "id")?,
            customer_id: int(row, "Order", "customer_id")?,
        })
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct TagView {
    pub(crate) id: i64,
    pub(crate) label: String,
}

impl View for TagView {
    const SOURCE_ENTITY: &'static str = "Tag";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn primary_key_value(&self) -> Value {
        self.id.into()
    }
}

impl FromRow for TagView {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            id: int(row, "Tag", "id")?,
            label: row.get_or_null("label").as_str().unwrap_or_default().to_string(),
        })
    }
}
