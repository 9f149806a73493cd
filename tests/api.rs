use doc_map::{DocMap, DocMapBuilder, Entry, Error, MemoryBackend};
use serde_json::json;

fn connected(backend: &MemoryBackend) -> DocMap<MemoryBackend> {
    let db = DocMap::open("mem://local", "app", "settings", backend.clone()).unwrap();
    db.connect().unwrap();
    db
}

fn connected_no_mirror(backend: &MemoryBackend) -> DocMap<MemoryBackend> {
    let db = DocMapBuilder::new("mem://local")
        .database("app")
        .collection("settings")
        .mirror(false)
        .build(backend.clone())
        .unwrap();
    db.connect().unwrap();
    db
}

// ---- set / get --------------------------------------------------------------

#[test]
fn read_after_write_through_the_mirror() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);

    assert!(db.set("k", json!({ "n": 1 })).unwrap());
    assert_eq!(db.get("k").unwrap(), Some(json!({ "n": 1 })));
    // and the write really is durable
    assert_eq!(db.get_uncached("k").unwrap(), Some(json!({ "n": 1 })));
}

#[test]
fn set_replaces_existing_value() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("k", json!(1)).unwrap();
    db.set("k", json!(2)).unwrap();
    assert_eq!(db.get("k").unwrap(), Some(json!(2)));
    assert_eq!(db.len().unwrap(), 1);
}

#[test]
fn failed_upstream_write_leaves_the_mirror_untouched() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("k", json!("old")).unwrap();

    backend.fail_next();
    let err = db.set("k", json!("new")).unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));

    assert_eq!(db.get("k").unwrap(), Some(json!("old")));
    assert_eq!(db.get_uncached("k").unwrap(), Some(json!("old")));
}

#[test]
fn works_with_the_mirror_disabled() {
    let backend = MemoryBackend::new();
    let db = connected_no_mirror(&backend);

    db.set("k", json!(7)).unwrap();
    assert_eq!(db.get("k").unwrap(), Some(json!(7)));
    assert!(db.has("k").unwrap());
    assert_eq!(db.len().unwrap(), 1);
    db.delete("k").unwrap();
    assert_eq!(db.get("k").unwrap(), None);
}

// ---- has / delete -----------------------------------------------------------

#[test]
fn has_reports_existence_not_its_inverse() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    assert!(!db.has("k").unwrap());
    db.set("k", json!(1)).unwrap();
    assert!(db.has("k").unwrap());
}

#[test]
fn delete_removes_from_both_layers() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("a", json!(1)).unwrap();

    assert!(db.delete("a").unwrap());
    assert!(!db.has("a").unwrap());
    assert_eq!(db.get("a").unwrap(), None);
    assert_eq!(db.get_uncached("a").unwrap(), None);
}

#[test]
fn delete_missing_key_is_false() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    assert!(!db.delete("ghost").unwrap());
}

// ---- clear ------------------------------------------------------------------

#[test]
fn clear_empties_both_layers() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("a", json!(1)).unwrap();
    db.set("b", json!(2)).unwrap();

    db.clear().unwrap();
    assert!(db.is_empty().unwrap());
    assert!(db.all_uncached().unwrap().is_empty());
}

// ---- defaults ---------------------------------------------------------------

#[test]
fn ensure_substitutes_the_default_on_a_miss() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.ensure(json!({ "level": 1 }));

    assert_eq!(db.get("missing").unwrap(), Some(json!({ "level": 1 })));
    // a stored value still wins
    db.set("present", json!("real")).unwrap();
    assert_eq!(db.get("present").unwrap(), Some(json!("real")));
}

#[test]
fn returned_default_is_a_deep_copy() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.ensure(json!({ "level": 1 }));

    let mut first = db.get("missing").unwrap().unwrap();
    first["level"] = json!(99);
    assert_eq!(db.get("missing").unwrap(), Some(json!({ "level": 1 })));
}

#[test]
fn ensure_is_overwritable() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.ensure(json!(1)).ensure(json!(2));
    assert_eq!(db.get("missing").unwrap(), Some(json!(2)));
}

#[test]
fn falsy_stored_values_are_not_replaced_by_the_default() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.ensure(json!("fallback"));

    db.set("zero", json!(0)).unwrap();
    db.set("empty", json!("")).unwrap();
    db.set("no", json!(false)).unwrap();

    assert_eq!(db.get("zero").unwrap(), Some(json!(0)));
    assert_eq!(db.get("empty").unwrap(), Some(json!("")));
    assert_eq!(db.get("no").unwrap(), Some(json!(false)));
}

#[test]
fn default_does_not_count_as_existence() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.ensure(json!(1));
    assert!(!db.has("missing").unwrap());
}

// ---- enumeration ------------------------------------------------------------

#[test]
fn mirror_enumeration_is_insertion_ordered() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    for (key, value) in [("c", 3), ("a", 1), ("b", 2)] {
        db.set(key, json!(value)).unwrap();
    }
    assert_eq!(db.keys().unwrap(), ["c", "a", "b"]);
    assert_eq!(db.values().unwrap(), [json!(3), json!(1), json!(2)]);
}

#[test]
fn enumeration_helpers_agree_with_all() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    for i in 0..5 {
        db.set(&format!("k{i}"), json!(i)).unwrap();
    }
    let all = db.all().unwrap();

    let mapped = db.map(|value, _, _| value.clone()).unwrap();
    let values: Vec<_> = all.iter().map(|entry| entry.value.clone()).collect();
    assert_eq!(mapped, values);

    let filtered = db
        .filter(|value, _, _| value.as_i64().unwrap() % 2 == 0)
        .unwrap();
    let expected: Vec<Entry> = all
        .iter()
        .filter(|entry| entry.value.as_i64().unwrap() % 2 == 0)
        .cloned()
        .collect();
    assert_eq!(filtered, expected);

    assert_eq!(db.first_n(3).unwrap(), all[..3].to_vec());
    assert_eq!(db.first().unwrap(), Some(all[0].clone()));
}

#[test]
fn filter_sees_keys_and_original_indexes() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("a", json!(10)).unwrap();
    db.set("b", json!(20)).unwrap();
    db.set("c", json!(30)).unwrap();

    let hits = db.filter(|_, key, index| key == "b" || index == 2).unwrap();
    let keys: Vec<&str> = hits.iter().map(|entry| entry.key.as_str()).collect();
    assert_eq!(keys, ["b", "c"]);
}

#[test]
fn find_returns_the_first_match_in_order() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("a", json!(1)).unwrap();
    db.set("b", json!(2)).unwrap();
    db.set("c", json!(2)).unwrap();

    assert_eq!(db.find(|v| v == &json!(2)).unwrap(), Some(json!(2)));
    assert_eq!(db.find(|v| v == &json!(9)).unwrap(), None);
}

#[test]
fn first_on_empty_store() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    assert_eq!(db.first().unwrap(), None);
    assert!(db.first_n(4).unwrap().is_empty());
}

#[test]
fn first_n_caps_at_store_size() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("only", json!(1)).unwrap();
    assert_eq!(db.first_n(10).unwrap().len(), 1);
}

// ---- sub-property operations ------------------------------------------------

#[test]
fn set_at_creates_the_document_and_intermediates() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);

    assert!(db.set_at("user", "profile.name", json!("zoe")).unwrap());
    assert_eq!(
        db.get("user").unwrap(),
        Some(json!({ "profile": { "name": "zoe" } }))
    );
    assert_eq!(db.get_at("user", "profile.name").unwrap(), Some(json!("zoe")));
}

#[test]
fn set_at_writes_the_whole_value_back() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("user", json!({ "profile": { "name": "zoe" }, "score": 10 }))
        .unwrap();

    db.set_at("user", "profile.name", json!("max")).unwrap();
    // untouched siblings survive the round trip, durably
    assert_eq!(
        db.get_uncached("user").unwrap(),
        Some(json!({ "profile": { "name": "max" }, "score": 10 }))
    );
}

#[test]
fn get_at_missing_field_is_none_but_missing_key_is_an_error() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("user", json!({ "a": 1 })).unwrap();

    assert_eq!(db.get_at("user", "z").unwrap(), None);
    let err = db.get_at("ghost", "a").unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
}

#[test]
fn get_at_with_escaped_dot_in_field_name() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("cfg", json!({ "a.b": { "c": 1 } })).unwrap();
    assert_eq!(db.get_at("cfg", "a\\.b.c").unwrap(), Some(json!(1)));
}

#[test]
fn delete_at_removes_the_field_and_persists() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("user", json!({ "a": 1, "b": 2 })).unwrap();

    assert!(db.delete_at("user", "a").unwrap());
    assert!(!db.delete_at("user", "a").unwrap());
    assert_eq!(db.get_uncached("user").unwrap(), Some(json!({ "b": 2 })));

    let err = db.delete_at("ghost", "a").unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
}

#[test]
fn sub_property_reads_respect_the_mirror_flag() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);
    db.set("doc", json!({ "n": 1 })).unwrap();

    let other = DocMap::open("mem://local", "app", "settings", backend.clone()).unwrap();
    other.connect().unwrap();
    other.set("doc", json!({ "n": 2 })).unwrap();

    assert_eq!(db.get_at("doc", "n").unwrap(), Some(json!(1)));
    assert_eq!(db.get_at_uncached("doc", "n").unwrap(), Some(json!(2)));
}

// ---- debug ------------------------------------------------------------------

#[test]
fn debug_impls_dont_panic() {
    let backend = MemoryBackend::new();
    let db = connected(&backend);

    let dbg_store = format!("{db:?}");
    assert!(dbg_store.contains("DocMap"));
    assert!(dbg_store.contains("settings"));

    let builder = DocMapBuilder::new("mem://local");
    assert!(format!("{builder:?}").contains("DocMapBuilder"));

    assert!(format!("{backend:?}").contains("MemoryBackend"));
}
