use doc_map::{DocMapBuilder, MemoryBackend};
use serde_json::json;

fn main() -> Result<(), doc_map::Error> {
    let db = DocMapBuilder::new("mem://local")
        .database("app")
        .collection("profiles")
        .build(MemoryBackend::new())?;
    db.connect()?;

    // set_at creates the document and any missing intermediate objects
    db.set_at("zoe", "profile.name", json!("Zoe"))?;
    db.set_at("zoe", "profile.links.homepage", json!("https://example.org"))?;
    db.set_at("zoe", "score", json!(120))?;

    println!("document: {}", db.get("zoe")?.unwrap());
    println!("name:     {}", db.get_at("zoe", "profile.name")?.unwrap());

    // a literal dot in a field name is escaped with a backslash
    db.set_at("zoe", "files.readme\\.md", json!("docs"))?;
    println!("tagged:   {}", db.get_at("zoe", "files.readme\\.md")?.unwrap());

    let removed = db.delete_at("zoe", "profile.links")?;
    println!("removed links: {removed}");
    println!("document: {}", db.get("zoe")?.unwrap());
    Ok(())
}
