//! Key-value map backed by a remote document store, with an optional
//! in-memory mirror for low-latency reads.
//!
//! Values are arbitrary JSON ([`serde_json::Value`]); nested fields can be
//! addressed with dotted paths (`"profile.name"`, escape literal dots as
//! `\.`). The database itself sits behind the [`DocumentBackend`] trait —
//! [`MemoryBackend`] ships in-crate, real drivers plug in the same way.
//!
//! ```rust
//! use doc_map::{DocMapBuilder, MemoryBackend};
//! use serde_json::json;
//!
//! # fn main() -> doc_map::Result<()> {
//! let db = DocMapBuilder::new("mem://local")
//!     .database("app")
//!     .collection("settings")
//!     .build(MemoryBackend::new())?;
//! db.connect()?;
//!
//! db.set("greeting", json!({ "text": "hello" }))?;
//! assert_eq!(db.get_at("greeting", "text")?, Some(json!("hello")));
//! # Ok(())
//! # }
//! ```
//!
//! **One writer per key.** The mirror gives read-after-write consistency for
//! a single caller; writers that bypass this instance are only picked up on
//! the next `connect()` or through the `_uncached` read variants.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod path;
pub mod store;

pub use backend::{DocumentBackend, Entry, MemoryBackend};
pub use error::{Error, Result};
pub use store::{ConnectionStatus, DocMap, DocMapBuilder};
