use std::sync::Arc;

use firestore_explorer::firestore::{
    BulkContext, CollectionExporter, CollectionImporter, DatabaseId, ExportFile, GeoPoint, InMemoryDocumentStore,
    MapValue, ResourcePath, WireValue,
};

fn map(entries: &[(&str, WireValue)]) -> MapValue {
    MapValue::from_iter(entries.iter().map(|(name, value)| (name.to_string(), value.clone())))
}

fn seeded() -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new(DatabaseId::default("source"));
    store
        .insert(
            "users/ada",
            map(&[
                ("name", WireValue::string("Ada")),
                ("age", WireValue::Integer(36)),
                ("joined", WireValue::timestamp("2024-01-15T10:30:00Z")),
                ("home", WireValue::GeoPoint(GeoPoint::new(51.5, -0.12))),
                (
                    "tags",
                    WireValue::Array(vec![WireValue::string("math"), WireValue::Boolean(true)]),
                ),
            ]),
        )
        .unwrap();
    store
        .insert("users/bob", map(&[("name", WireValue::string("Bob")), ("score", WireValue::Double(2.5))]))
        .unwrap();
    store
        .insert("users/ada/orders/o1", map(&[("total", WireValue::Integer(12))]))
        .unwrap();
    store
        .insert(
            "users/ada/orders/o1/lines/l1",
            map(&[
                ("sku", WireValue::string("A-1")),
                ("meta", WireValue::Map(map(&[("gift", WireValue::Boolean(false))]))),
            ]),
        )
        .unwrap();
    store.insert("products/p1", map(&[("price", WireValue::Null)])).unwrap();
    store
}

fn temp_file(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("{name}-{}.json", std::process::id()))
}

#[tokio::test]
async fn export_file_import_preserves_three_levels() {
    let source = seeded();
    let export = CollectionExporter::new(BulkContext::new(Arc::new(source.clone())))
        .export_database(&ResourcePath::root())
        .await
        .unwrap();
    assert_eq!(export.document_count(), 5);

    let path = temp_file("round-trip");
    export.write_to_path(&path).unwrap();
    let loaded = ExportFile::read_from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, export);

    let target = InMemoryDocumentStore::new(DatabaseId::default("target"));
    let report = CollectionImporter::new(BulkContext::new(Arc::new(target.clone())))
        .import_database(&loaded)
        .await
        .unwrap();
    assert_eq!(report.succeeded, 5);
    assert!(report.is_complete());

    assert_eq!(target.document_paths(), source.document_paths());
    for document in source.document_paths() {
        assert_eq!(target.fields(&document), source.fields(&document), "{document}");
    }
}

#[tokio::test]
async fn export_file_has_no_wrapping_metadata() {
    let export = CollectionExporter::new(BulkContext::new(Arc::new(seeded())))
        .export_database(&ResourcePath::root())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&export.to_json_string().unwrap()).unwrap();

    let roots: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
    assert_eq!(roots, vec!["products", "users"]);
    let line = &json["users"]["ada"]["_subcollections"]["orders"]["o1"]["_subcollections"]["lines"]["l1"];
    assert_eq!(line["_fields"]["sku"], "A-1");
    assert_eq!(line["_fields"]["meta"]["gift"], false);
    assert!(json["users"]["bob"].get("_subcollections").is_none());
    assert_eq!(json["users"]["ada"]["_fields"]["home"]["_geopoint"], true);
}

#[tokio::test]
async fn hand_written_file_imports_with_inferred_types() {
    let file = ExportFile::from_json_str(
        r#"{
            "places": {
                "eiffel": {
                    "_fields": {
                        "location": { "latitude": 48.858, "longitude": 2.294 },
                        "opened": "1889-03-31T00:00:00",
                        "height": 330,
                        "note": "not-a-date"
                    }
                }
            }
        }"#,
    )
    .unwrap();
    let target = InMemoryDocumentStore::new(DatabaseId::default("p"));
    CollectionImporter::new(BulkContext::new(Arc::new(target.clone())))
        .import_database(&file)
        .await
        .unwrap();

    let fields = target.fields("places/eiffel").unwrap();
    assert_eq!(
        fields.get("location"),
        Some(&WireValue::GeoPoint(GeoPoint::new(48.858, 2.294)))
    );
    assert_eq!(fields.get("opened"), Some(&WireValue::timestamp("1889-03-31T00:00:00Z")));
    assert_eq!(fields.get("height"), Some(&WireValue::Integer(330)));
    assert_eq!(fields.get("note"), Some(&WireValue::string("not-a-date")));
}
