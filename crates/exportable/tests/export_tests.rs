//! Export Integration Tests
//!
//! Serializes graphs from the memory store and checks the document shape.

mod common;

use elif_exportable::{
    AssociationKind, AttributeValue, Document, DocumentNode, ExportConfig, ExportError, ExportInput, Exporter,
    Format, Includes, StoreError,
};
use serde_json::json;
use tempfile::TempDir;

use common::fetch;

fn names(node: &DocumentNode) -> Vec<&str> {
    node.associations.iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn test_order_with_items_document() {
    let store = common::order_with_items();
    let order = fetch(&store, "Order", 7);

    let exporter = Exporter::new(&store, ExportConfig::new().with_includes("items"));
    let document = exporter.export_record(&order).unwrap();

    assert_eq!(
        serde_json::to_value(&document).unwrap(),
        json!({
            "class_name": "Order",
            "attributes": {"id": 7, "total": 42, "customer_id": null},
            "associations": [{
                "name": "items",
                "inverse": "order",
                "kind": "has_many",
                "content": [
                    {
                        "class_name": "Item",
                        "attributes": {"id": 1, "qty": 2, "order_id": 7, "product_id": null},
                        "associations": []
                    },
                    {
                        "class_name": "Item",
                        "attributes": {"id": 2, "qty": 3, "order_id": 7, "product_id": null},
                        "associations": []
                    }
                ]
            }]
        })
    );
}

#[test]
fn test_no_includes_means_no_associations() {
    let store = common::order_with_items();
    let order = fetch(&store, "Order", 7);

    let document = Exporter::new(&store, ExportConfig::new()).export_record(&order).unwrap();
    let node = document.as_one().unwrap();
    assert!(node.associations.is_empty());
    assert_eq!(node.attribute("total"), Some(&AttributeValue::Integer(42)));
}

#[test]
fn test_nested_include_scoping() {
    let store = common::populated_shop();
    let customer = fetch(&store, "Customer", 1);

    let includes = Includes::map([("orders", Includes::map([("items", "product")]))]);
    let document = Exporter::new(&store, ExportConfig::new().with_includes(includes))
        .export_record(&customer)
        .unwrap();

    let root = document.as_one().unwrap();
    // profile exists in the store but was not requested
    assert_eq!(names(root), vec!["orders"]);

    let orders = root.association("orders").unwrap().nodes();
    assert_eq!(orders.len(), 2);
    for order in orders {
        assert_eq!(names(order), vec!["items"]);
        for item in order.association("items").unwrap().nodes() {
            assert_eq!(names(item), vec!["product"]);
            let product = &item.association("product").unwrap().nodes()[0];
            assert_eq!(product.class_name, "Product");
            assert!(product.associations.is_empty());
        }
    }
}

#[test]
fn test_list_and_duplicate_includes() {
    let store = common::populated_shop();
    let customer = fetch(&store, "Customer", 1);

    let includes = Includes::list([
        Includes::name("profile"),
        Includes::name("orders"),
        Includes::map([("orders", "items")]),
    ]);
    let document = Exporter::new(&store, ExportConfig::new().with_includes(includes))
        .export_record(&customer)
        .unwrap();

    let root = document.as_one().unwrap();
    assert_eq!(names(root), vec!["profile", "orders"]);

    let profile = root.association("profile").unwrap();
    assert_eq!(profile.kind, AssociationKind::HasOne);
    assert_eq!(profile.nodes().len(), 1);
    assert!(!profile.content.as_ref().unwrap().is_many());

    let first_order = &root.association("orders").unwrap().nodes()[0];
    assert_eq!(names(first_order), vec!["items"]);
}

#[test]
fn test_includes_from_yaml_text() {
    let store = common::populated_shop();
    let customer = fetch(&store, "Customer", 1);

    let includes: Includes = "{orders: [items], profile: []}".parse().unwrap();
    let document = Exporter::new(&store, ExportConfig::new().with_includes(includes))
        .export_record(&customer)
        .unwrap();

    assert_eq!(names(document.as_one().unwrap()), vec!["orders", "profile"]);
}

#[test]
fn test_strip_ids() {
    let store = common::populated_shop();
    let item = fetch(&store, "Item", 1);

    let config = ExportConfig::new()
        .with_includes(Includes::list(["order", "product"]))
        .strip_ids();
    let document = Exporter::new(&store, config).export_record(&item).unwrap();
    let node = document.as_one().unwrap();

    assert!(node.attribute("id").is_none());
    assert!(node.attribute("order_id").is_none());
    assert!(node.attribute("product_id").is_none());
    assert_eq!(node.attribute("qty"), Some(&AttributeValue::Integer(1)));

    // The descriptor still names the key so import can rebuild it
    let product = node.association("product").unwrap();
    assert_eq!(product.foreign_key.as_deref(), Some("product_id"));
    assert!(product.nodes()[0].attribute("id").is_none());

    // Foreign keys of unincluded belongs_to associations stay
    let order = &node.association("order").unwrap().nodes()[0];
    assert!(order.attribute("id").is_none());
    assert_eq!(order.attribute("customer_id"), Some(&AttributeValue::Integer(1)));
}

#[test]
fn test_owned_associations_omit_foreign_keys() {
    let store = common::populated_shop();
    let customer = fetch(&store, "Customer", 1);

    let document = Exporter::new(&store, ExportConfig::new().with_includes("orders"))
        .export_record(&customer)
        .unwrap();
    let orders = document.as_one().unwrap().association("orders").unwrap();

    assert_eq!(orders.inverse.as_deref(), Some("customer"));
    assert!(orders.foreign_key.is_none());
    assert!(orders.foreign_type.is_none());
    assert!(orders.content.as_ref().unwrap().is_many());
}

#[test]
fn test_empty_to_one_has_no_content() {
    let store = common::order_with_items();
    let item = fetch(&store, "Item", 1);

    let document = Exporter::new(&store, ExportConfig::new().with_includes("product"))
        .export_record(&item)
        .unwrap();
    let product = document.as_one().unwrap().association("product").unwrap();

    assert_eq!(product.kind, AssociationKind::BelongsTo);
    assert!(product.content.is_none());

    let encoded = serde_json::to_value(product).unwrap();
    assert!(encoded.get("content").is_none());
}

#[test]
fn test_empty_collection_is_an_array() {
    let store = common::populated_shop();
    let customer = fetch(&store, "Customer", 2);

    let document = Exporter::new(&store, ExportConfig::new().with_includes("profile"))
        .export_record(&customer)
        .unwrap();
    assert!(document.as_one().unwrap().association("profile").unwrap().content.is_none());

    let order = fetch(&store, "Order", 3);
    let document = Exporter::new(&store, ExportConfig::new().with_includes("items"))
        .export_record(&order)
        .unwrap();
    let items = document.as_one().unwrap().association("items").unwrap();
    assert_eq!(serde_json::to_value(items).unwrap()["content"], json!([]));
}

#[test]
fn test_polymorphic_belongs_to() {
    let store = common::blog();
    let comment = fetch(&store, "Comment", 1);

    let document = Exporter::new(&store, ExportConfig::new().with_includes("commentable"))
        .export_record(&comment)
        .unwrap();
    let commentable = document.as_one().unwrap().association("commentable").unwrap();

    assert_eq!(commentable.foreign_key.as_deref(), Some("commentable_id"));
    assert_eq!(commentable.foreign_type.as_deref(), Some("commentable_type"));
    assert_eq!(commentable.nodes()[0].class_name, "Post");
}

#[test]
fn test_has_and_belongs_to_many() {
    let store = common::blog();
    let post = fetch(&store, "Post", 1);

    let document = Exporter::new(&store, ExportConfig::new().with_includes("tags"))
        .export_record(&post)
        .unwrap();
    let tags = document.as_one().unwrap().association("tags").unwrap();

    assert_eq!(tags.kind, AssociationKind::HasAndBelongsToMany);
    let labels: Vec<_> = tags.nodes().iter().map(|t| t.attribute("label").cloned()).collect();
    assert_eq!(labels, vec![Some("rust".into()), Some("serde".into())]);
}

#[test]
fn test_collection_export_keeps_order() {
    let store = common::populated_shop();
    let mut orders = store.all("Order").unwrap();
    orders.reverse();

    let document = Exporter::new(&store, ExportConfig::new()).export_collection(&orders).unwrap();
    let totals: Vec<_> = document.nodes().iter().map(|n| n.attribute("total").cloned()).collect();
    assert_eq!(totals, vec![Some(5.into()), Some(19.into()), Some(99.into())]);
    assert!(matches!(document, Document::Many(_)));
}

#[test]
fn test_mixed_collection_is_rejected() {
    let store = common::populated_shop();
    let mixed = vec![fetch(&store, "Order", 1), fetch(&store, "Customer", 1)];

    let err = Exporter::new(&store, ExportConfig::new().with_includes("items"))
        .export_collection(&mixed)
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidInput(_)));
}

#[test]
fn test_unknown_association() {
    let store = common::populated_shop();
    let order = fetch(&store, "Order", 1);

    let err = Exporter::new(&store, ExportConfig::new().with_includes("coupons"))
        .export_record(&order)
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Store(StoreError::UnknownAssociation { .. })
    ));
}

#[test]
fn test_to_one_with_several_records_fails() {
    let mut store = common::populated_shop();
    store
        .insert("Profile", common::attrs(&[("bio", "Second".into()), ("customer_id", 1.into())]))
        .unwrap();
    let customer = fetch(&store, "Customer", 1);

    let err = Exporter::new(&store, ExportConfig::new().with_includes("profile"))
        .export_record(&customer)
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Store(StoreError::Cardinality { count: 2, .. })
    ));
}

#[test]
fn test_export_reads_live_state() {
    let mut store = common::order_with_items();
    let order = fetch(&store, "Order", 7);
    store
        .insert("Item", common::attrs(&[("qty", 9.into()), ("order_id", 7.into())]))
        .unwrap();

    let document = Exporter::new(&store, ExportConfig::new().with_includes("items"))
        .export_record(&order)
        .unwrap();
    assert_eq!(document.as_one().unwrap().association("items").unwrap().nodes().len(), 3);
}

#[test]
fn test_export_to_string_formats() {
    let store = common::order_with_items();
    let order = fetch(&store, "Order", 7);
    let exporter = Exporter::new(&store, ExportConfig::new().with_includes("items"));
    let expected = exporter.export_record(&order).unwrap();

    for format in [Format::Json, Format::Yaml] {
        let encoded = exporter.export_to_string(ExportInput::record(&order), format).unwrap();
        assert_eq!(format.decode(&encoded).unwrap(), expected);
    }
}

#[test]
fn test_export_to_file() {
    let store = common::order_with_items();
    let order = fetch(&store, "Order", 7);
    let dir = TempDir::new().unwrap();

    let exporter = Exporter::new(&store, ExportConfig::new().with_includes("items"));
    let path = dir.path().join("order.yaml");
    let format = exporter.export_to_file(ExportInput::record(&order), &path).unwrap();
    assert_eq!(format, Format::Yaml);

    let body = std::fs::read_to_string(&path).unwrap();
    assert_eq!(Format::Yaml.decode(&body).unwrap(), exporter.export_record(&order).unwrap());

    let err = exporter
        .export_to_file(ExportInput::record(&order), dir.path().join("order.xml"))
        .unwrap_err();
    assert!(matches!(err, ExportError::Format(_)));

    // A configured format wins over the suffix
    let exporter = Exporter::new(&store, ExportConfig::new().with_format(Format::Json));
    let format = exporter
        .export_to_file(ExportInput::record(&order), dir.path().join("order.txt"))
        .unwrap();
    assert_eq!(format, Format::Json);
}

#[test]
fn test_default_filename() {
    let store = common::order_with_items();
    let order = fetch(&store, "Order", 7);
    let exporter = Exporter::new(&store, ExportConfig::new());

    assert_eq!(exporter.default_filename(&order, Format::Json).unwrap(), "order_7.json");
    assert_eq!(exporter.default_filename(&order, Format::Yaml).unwrap(), "order_7.yaml");
    assert_eq!(Format::Yaml.mime_type(), "application/yaml");
}
