use doc_map::{DocMapBuilder, MemoryBackend};
use serde_json::json;

fn main() -> Result<(), doc_map::Error> {
    let db = DocMapBuilder::new("mem://local")
        .database("app")
        .collection("settings")
        .driver_option("appName", "doc-map-demo")
        .build(MemoryBackend::new())?;

    db.connect()?;
    db.ensure(json!({ "theme": "light" }));

    db.set("alice", json!({ "theme": "dark", "volume": 7 }))?;
    db.set("bob", json!({ "theme": "sepia" }))?;

    println!("alice: {}", db.get("alice")?.unwrap());
    // no entry for carol, so the ensure() default comes back
    println!("carol: {}", db.get("carol")?.unwrap());

    let dark_mode = db.filter(|value, _, _| value["theme"] == json!("dark"))?;
    println!("dark mode users: {}", dark_mode.len());

    db.delete("bob")?;
    println!("{} entries left", db.len()?);
    println!("store: {db:?}");
    Ok(())
}
