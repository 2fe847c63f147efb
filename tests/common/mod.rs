//! Shared fixtures for integration tests.

#![allow(dead_code)]

use relmap::prelude::*;
use relmap::{FromRow, Row};

pub const SHOP_TOML: &str = r#"
    [fetch]
    callback_dispatch = "sequential"

    [entities.Customer]
    table = "customers"
    id = ["id"]
    fields = ["name"]

    [entities.Customer.relations.orders]
    kind = "one_to_many"
    target = "Order"
    references = ["customer_id"]

    [entities.Order]
    table = "orders"
    id = ["id"]
    fields = ["customer_id", "total"]
    columns = { total = "total_cents" }

    [entities.Order.relations.customer]
    kind = "many_to_one"
    target = "Customer"
    fields = ["customer_id"]

    [entities.Order.relations.tags]
    kind = "many_to_many"
    target = "Tag"
    through = { table = "order_tags", source_column = "order_id", target_column = "tag_id" }

    [entities.Tag]
    table = "tags"
    id = ["id"]
    fields = ["label"]

    [entities.Tag.relations.orders]
    kind = "many_to_many"
    target = "Order"
    through = { table = "order_tags", source_column = "tag_id", target_column = "order_id" }
"#;

pub fn shop_config() -> RelmapConfig {
    RelmapConfig::from_str(SHOP_TOML).expect("shop config parses")
}

pub fn shop_schema() -> Schema {
    shop_config().schema().expect("shop schema validates")
}

/// Customers 1, 2, 3; orders 10 and 11 belong to 1, order 12 to 3.
pub fn shop_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .load_json(
            "customers",
            &serde_json::json!([
                {"id": 1, "name": "Ada"},
                {"id": 2, "name": "Brook"},
                {"id": 3, "name": "Cyd"},
            ]),
        )
        .expect("customers load");
    store
        .load_json(
            "orders",
            &serde_json::json!([
                {"id": 10, "customer_id": 1, "total_cents": 1250},
                {"id": 11, "customer_id": 1, "total_cents": 400},
                {"id": 12, "customer_id": 3, "total_cents": 9900},
            ]),
        )
        .expect("orders load");
    store
        .load_json(
            "tags",
            &serde_json::json!([
                {"id": 100, "label": "rush"},
                {"id": 101, "label": "gift"},
            ]),
        )
        .expect("tags load");
    store
        .load_json(
            "order_tags",
            &serde_json::json!([
                {"order_id": 10, "tag_id": 100},
                {"order_id": 11, "tag_id": 100},
                {"order_id": 12, "tag_id": 101},
            ]),
        )
        .expect("order_tags load");
    store
}

fn int(row: &Row, entity: &str, column: &str) -> FetchResult<i64> {
    row.get_or_null(column)
        .as_int()
        .ok_or_else(|| FetchError::row_decode(entity, format!("`{}` is not an integer", column)))
}

#[derive(Debug, PartialEq)]
pub struct CustomerSummary {
    pub id: i64,
    pub name: String,
}

impl View for CustomerSummary {
    const SOURCE_ENTITY: &'static str = "Customer";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn primary_key_value(&self) -> Value {
        self.id.into()
    }
}

impl FromRow for CustomerSummary {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            id: int(row, "Customer", "id")?,
            name: row.get_or_null("name").as_str().unwrap_or_default().to_string(),
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct OrderSummary {
    pub id: i64,
    pub total_cents: i64,
}

impl View for OrderSummary {
    const SOURCE_ENTITY: &'static str = "Order";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn primary_key_value(&self) -> Value {
        self.id.into()
    }
}

impl FromRow for OrderSummary {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            id: int(row, "Order", "id")?,
            total_cents: int(row, "Order", "total_cents")?,
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct TagLabel {
    pub id: i64,
    pub label: String,
}

impl View for TagLabel {
    const SOURCE_ENTITY: &'static str = "Tag";
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn primary_key_value(&self) -> Value {
        self.id.into()
    }
}

impl FromRow for TagLabel {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            id: int(row, "Tag", "id")?,
            label: row.get_or_null("label").as_str().unwrap_or_default().to_string(),
        })
    }
}

/// A view that lies about its identifier shape.
pub struct KeylessOrder;

impl View for KeylessOrder {
    const SOURCE_ENTITY: &'static str = "Order";
    const PRIMARY_KEY: &'static [&'static str] = &[];

    fn primary_key_value(&self) -> Value {
        Value::Null
    }
}

impl FromRow for KeylessOrder {
    fn from_row(_row: &Row) -> FetchResult<Self> {
        Ok(Self)
    }
}

/// An order view keyed by its foreign key instead of its identifier.
#[derive(Debug, PartialEq)]
pub struct OrderByCustomer {
    pub customer_id: i64,
}

impl View for OrderByCustomer {
    const SOURCE_ENTITY: &'static str = "Order";
    const PRIMARY_KEY: &'static [&'static str] = &["customer_id"];

    fn primary_key_value(&self) -> Value {
        self.customer_id.into()
    }
}

impl FromRow for OrderByCustomer {
    fn from_row(row: &Row) -> FetchResult<Self> {
        Ok(Self {
            customer_id: int(row, "Order", "customer_id")?,
        })
    }
}
