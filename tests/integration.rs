//! Integration tests for the document store.

use datason::{Catalog, CatalogConfig, CollectionOptions, IndexMode, METADATA_FILE};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> CatalogConfig {
    CatalogConfig::new(dir.path().join("data"))
}

fn open_catalog(dir: &TempDir) -> Catalog {
    Catalog::open(test_config(dir)).unwrap()
}

fn reload(dir: &TempDir) -> Catalog {
    Catalog::open_and_load(test_config(dir)).unwrap()
}

// --- Bootstrap ---

#[test]
fn test_open_creates_folder() {
    let dir = TempDir::new().unwrap();
    open_catalog(&dir);
    assert!(dir.path().join("data").is_dir());
}

#[test]
fn test_open_twice_keeps_data() {
    let dir = TempDir::new().unwrap();
    {
        let catalog = open_catalog(&dir);
        let table = catalog
            .create_collection("test", CollectionOptions::default())
            .unwrap();
        table.register("data", json!({"a": "b"})).unwrap();
    }

    open_catalog(&dir);
    let catalog = reload(&dir);

    let doc = catalog.get("test").unwrap().get("data").unwrap();
    assert_eq!(doc.read().payload(), &json!({"a": "b"}));
}

#[test]
fn test_create_collection_writes_layout() {
    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    let table = catalog
        .create_collection("test", CollectionOptions::default())
        .unwrap();

    table.register("data", json!({"a": "b"})).unwrap();

    let table_dir = dir.path().join("data").join("test");
    assert!(table_dir.join(METADATA_FILE).is_file());
    assert!(table_dir.join("data.json").is_file());
}

// --- Registration and Persistence ---

#[test]
fn test_register_returns_document() {
    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    let table = catalog
        .create_collection("test", CollectionOptions::default())
        .unwrap();

    let doc = table.register("data2", json!({"a": "b"})).unwrap();
    let doc = doc.read();
    assert_eq!(doc.id(), "data2");
    assert_eq!(doc.payload()["a"], "b");
}

#[test]
fn test_register_then_reload_round_trip() {
    let dir = TempDir::new().unwrap();
    let payload = json!({
        "text": "héllo",
        "count": 42,
        "ratio": 0.25,
        "tags": ["x", "y"],
        "nested": {"deep": {"flag": false, "nothing": null}}
    });

    {
        let catalog = open_catalog(&dir);
        catalog
            .create_collection("docs", CollectionOptions::default())
            .unwrap()
            .register("one", payload.clone())
            .unwrap();
    }

    let catalog = reload(&dir);
    let doc = catalog.get("docs").unwrap().get("one").unwrap();
    assert_eq!(doc.read().payload(), &payload);
}

#[test]
fn test_save_visibility() {
    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    let table = catalog
        .create_collection("test", CollectionOptions::default())
        .unwrap();
    let doc = table.register("data4", json!({"a": "b"})).unwrap();

    doc.write().payload_mut()["a"] = json!("c");

    // Not saved yet: an independent reload still sees the old value.
    let before = reload(&dir);
    let stale = before.get("test").unwrap().get("data4").unwrap();
    assert_eq!(stale.read().payload()["a"], "b");

    doc.read().save().unwrap();

    let after = reload(&dir);
    let fresh = after.get("test").unwrap().get("data4").unwrap();
    assert_eq!(fresh.read().payload()["a"], "c");
}

#[test]
fn test_last_register_wins() {
    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    let table = catalog
        .create_collection("test", CollectionOptions::default())
        .unwrap();

    table.register("dup", json!({"v": 1})).unwrap();
    table.register("dup", json!({"v": 2})).unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.get("dup").unwrap().read().payload(), &json!({"v": 2}));

    let reloaded = reload(&dir);
    let doc = reloaded.get("test").unwrap().get("dup").unwrap();
    assert_eq!(doc.read().payload(), &json!({"v": 2}));
}

#[test]
fn test_load_restores_all_collections() {
    let dir = TempDir::new().unwrap();
    {
        let catalog = open_catalog(&dir);
        let users = catalog
            .create_collection("users", CollectionOptions::default())
            .unwrap();
        let events = catalog
            .create_collection("events", CollectionOptions::time_indexed())
            .unwrap();

        for i in 0..10 {
            users.register(&format!("user{}", i), json!({"n": i})).unwrap();
        }
        events.register("boot", json!({})).unwrap();
    }

    let catalog = reload(&dir);
    assert_eq!(catalog.collection_names(), vec!["events", "users"]);

    let users = catalog.get("users").unwrap();
    assert_eq!(users.len(), 10);
    assert_eq!(users.get("user7").unwrap().read().payload()["n"], 7);

    // Options come back from the sidecar, not from the defaults.
    let events = catalog.get("events").unwrap();
    assert_eq!(events.index_mode(), IndexMode::Time);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_sidecar_options_win_on_recreate() {
    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    catalog
        .create_collection("t", CollectionOptions::time_indexed().with_bucket_size(3))
        .unwrap();

    let again = catalog
        .create_collection("t", CollectionOptions::default())
        .unwrap();
    assert_eq!(
        again.options(),
        &CollectionOptions::time_indexed().with_bucket_size(3)
    );
}

#[test]
fn test_typed_payload() {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Profile {
        name: String,
        langs: Vec<String>,
    }

    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    let table = catalog
        .create_collection("profiles", CollectionOptions::default())
        .unwrap();

    let profile = Profile {
        name: "grace".into(),
        langs: vec!["cobol".into()],
    };
    table
        .register("grace", serde_json::to_value(&profile).unwrap())
        .unwrap();

    let reloaded = reload(&dir);
    let doc = reloaded.get("profiles").unwrap().get("grace").unwrap();
    let back: Profile = doc.read().deserialize().unwrap();
    assert_eq!(back, profile);
}

// --- Concurrency ---

#[test]
fn test_concurrent_registration() {
    let dir = TempDir::new().unwrap();
    let catalog = open_catalog(&dir);
    let table = catalog
        .create_collection("events", CollectionOptions::time_indexed().with_bucket_size(4))
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..25 {
                    table
                        .register(&format!("t{}-{}", t, i), json!({"t": t, "i": i}))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(table.len(), 100);

    let stats = table.index_stats().unwrap();
    assert_eq!(stats.entry_count, 100);
    assert_eq!(stats.bucket_sizes.len(), 25);

    // Serialized appends keep every bucket in timestamp order.
    let index_ids = table.ids_from(datason::Timestamp::from_millis(0)).unwrap();
    assert_eq!(index_ids.len(), 100);

    assert_eq!(reload(&dir).get("events").unwrap().len(), 100);
}

// --- Properties ---

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _\\-]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_register_reload_round_trip(payload in arb_json()) {
        let dir = TempDir::new().unwrap();
        {
            let catalog = open_catalog(&dir);
            catalog
                .create_collection("p", CollectionOptions::default())
                .unwrap()
                .register("doc", payload.clone())
                .unwrap();
        }

        let catalog = reload(&dir);
        let doc = catalog.get("p").unwrap().get("doc").unwrap();
        let guard = doc.read();
        prop_assert_eq!(guard.payload(), &payload);
    }
}
