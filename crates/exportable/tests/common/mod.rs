//! Shared shop schema and seed data for the integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use elif_exportable::{
    attributes, AssociationDescriptor, AttributeValue, Attributes, MemoryRecord, MemoryStore,
    ModelDefinition, RecordKey, RecordStore, Schema,
};

pub fn shop_schema() -> Schema {
    Schema::from_models([
        ModelDefinition::new("Customer")
            .with_columns(["name", "email"])
            .with_association(
                AssociationDescriptor::has_many("orders", "Order")
                    .with_foreign_key("customer_id")
                    .with_inverse("customer"),
            )
            .with_association(
                AssociationDescriptor::has_one("profile", "Profile")
                    .with_foreign_key("customer_id")
                    .with_inverse("customer"),
            ),
        ModelDefinition::new("Profile")
            .with_columns(["bio"])
            .with_association(AssociationDescriptor::belongs_to("customer", "Customer")),
        ModelDefinition::new("Order")
            .with_columns(["total"])
            .with_required(["total"])
            .with_association(AssociationDescriptor::belongs_to("customer", "Customer"))
            .with_association(
                AssociationDescriptor::has_many("items", "Item")
                    .with_foreign_key("order_id")
                    .with_inverse("order"),
            ),
        ModelDefinition::new("Item")
            .with_columns(["qty"])
            .with_association(AssociationDescriptor::belongs_to("order", "Order"))
            .with_association(AssociationDescriptor::belongs_to("product", "Product")),
        ModelDefinition::new("Product")
            .with_columns(["sku", "name", "price"])
            .with_natural_key(["sku"]),
        ModelDefinition::new("Post")
            .with_columns(["title"])
            .with_date_columns(["published_at"])
            .with_association(
                AssociationDescriptor::has_and_belongs_to_many("tags", "Tag", "posts_tags")
                    .with_inverse("posts"),
            ),
        ModelDefinition::new("Tag")
            .with_columns(["label"])
            .with_association(
                AssociationDescriptor::has_and_belongs_to_many("posts", "Post", "posts_tags")
                    .with_inverse("tags"),
            ),
        ModelDefinition::new("Comment")
            .with_columns(["body"])
            .with_association(AssociationDescriptor::belongs_to_polymorphic("commentable")),
        ModelDefinition::new("Invoice")
            .with_columns(["number"])
            .with_association(AssociationDescriptor::has_many("lines", "Line").with_foreign_key("invoice_id")),
        ModelDefinition::new("Line").with_columns(["amount", "invoice_id"]),
    ])
    .expect("shop schema is valid")
}

pub fn empty_shop() -> MemoryStore {
    MemoryStore::new(shop_schema()).expect("store")
}

pub fn key(id: i64) -> RecordKey {
    RecordKey::Integer(id)
}

pub fn fetch(store: &MemoryStore, class_name: &str, id: i64) -> MemoryRecord {
    store
        .get(class_name, &key(id))
        .unwrap_or_else(|| panic!("{} {} not stored", class_name, id))
}

/// Order 7 (total 42) with items 1 (qty 2) and 2 (qty 3)
pub fn order_with_items() -> MemoryStore {
    let mut store = empty_shop();
    store.insert("Order", attributes([("id", 7), ("total", 42)])).unwrap();
    store
        .insert("Item", attributes([("id", 1), ("qty", 2), ("order_id", 7)]))
        .unwrap();
    store
        .insert("Item", attributes([("id", 2), ("qty", 3), ("order_id", 7)]))
        .unwrap();
    store.clear_journal();
    store
}

/// A customer with a profile, two orders, items and products
pub fn populated_shop() -> MemoryStore {
    let mut store = empty_shop();

    store
        .insert("Customer", attributes([("name", "Ada"), ("email", "ada@example.com")]))
        .unwrap();
    store
        .insert("Customer", attributes([("name", "Grace"), ("email", "grace@example.com")]))
        .unwrap();
    store
        .insert("Profile", attrs(&[("bio", "Countess".into()), ("customer_id", 1.into())]))
        .unwrap();

    store
        .insert("Product", attrs(&[("sku", "KB-1".into()), ("name", "Keyboard".into()), ("price", 49.5.into())]))
        .unwrap();
    store
        .insert("Product", attrs(&[("sku", "MS-2".into()), ("name", "Mouse".into()), ("price", 19.0.into())]))
        .unwrap();

    store
        .insert("Order", attrs(&[("total", 99.into()), ("customer_id", 1.into())]))
        .unwrap();
    store
        .insert("Order", attrs(&[("total", 19.into()), ("customer_id", 1.into())]))
        .unwrap();
    store
        .insert("Order", attrs(&[("total", 5.into()), ("customer_id", 2.into())]))
        .unwrap();

    store
        .insert("Item", attrs(&[("qty", 1.into()), ("order_id", 1.into()), ("product_id", 1.into())]))
        .unwrap();
    store
        .insert("Item", attrs(&[("qty", 2.into()), ("order_id", 1.into()), ("product_id", 2.into())]))
        .unwrap();
    store
        .insert("Item", attrs(&[("qty", 1.into()), ("order_id", 2.into()), ("product_id", 2.into())]))
        .unwrap();

    store.clear_journal();
    store
}

/// A published post tagged twice, with a comment pointing at it
pub fn blog() -> MemoryStore {
    let mut store = empty_shop();
    let published_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

    let post = store
        .insert("Post", attrs(&[("title", "Hello".into()), ("published_at", published_at.into())]))
        .unwrap();
    let rust = store.insert("Tag", attributes([("label", "rust")])).unwrap();
    let serde = store.insert("Tag", attributes([("label", "serde")])).unwrap();
    store.link(&post, "tags", &rust).unwrap();
    store.link(&post, "tags", &serde).unwrap();

    store
        .insert(
            "Comment",
            attrs(&[
                ("body", "Nice".into()),
                ("commentable_id", 1.into()),
                ("commentable_type", "Post".into()),
            ]),
        )
        .unwrap();

    store.clear_journal();
    store
}

pub fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Attribute bags of every stored record of `class_name`, by key
pub fn rows(store: &MemoryStore, class_name: &str) -> Vec<Attributes> {
    use elif_exportable::Persistable;

    store
        .all(class_name)
        .unwrap()
        .iter()
        .map(Persistable::attributes)
        .collect()
}
