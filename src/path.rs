//! Dotted-path access into arbitrary JSON values.
//!
//! A path like `"profile.name"` addresses a nested field. Split happens on
//! unescaped dots; write `\.` for a literal dot inside a segment. Arrays are
//! addressed by decimal index (`"tags.0"`).
//!
//! These functions are usable on their own — the store's sub-property
//! operations are built on top of them.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Split a dotted path into its segments.
///
/// `\.` unescapes to a literal `.` and does not split; any other backslash
/// pair passes through verbatim. Empty segments (leading, trailing, or
/// doubled dots) are dropped. An empty input yields no segments.
#[must_use]
pub fn parse_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('.') => current.push('.'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Resolve `path` inside `root`, borrowing the addressed value.
///
/// Returns `Ok(None)` when the path walks off the edge of the data (a field
/// or index that simply isn't there). Walking *into* a scalar is a shape
/// mismatch and fails with [`Error::InvalidPath`]. An empty path resolves to
/// the root itself.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let mut current = root;
    for seg in parse_path(path) {
        current = match current {
            Value::Object(map) => match map.get(&seg) {
                Some(v) => v,
                None => return Ok(None),
            },
            Value::Array(items) => match seg.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(v) => v,
                None => return Ok(None),
            },
            other => {
                return Err(Error::InvalidPath(format!(
                    "cannot descend into {} at segment `{seg}`",
                    kind_of(other)
                )))
            }
        };
    }
    Ok(Some(current))
}

/// Write `value` at `path` inside `root`.
///
/// With `create_intermediate`, missing object fields along the way are
/// created as empty objects. Without it, a missing intermediate fails with
/// [`Error::InvalidPath`]. An intermediate that exists but is a scalar is
/// never silently replaced — that also fails with `InvalidPath`.
///
/// At an array terminal, an in-range index replaces the element and an index
/// equal to the length appends. Empty paths are rejected.
pub fn set_path(root: &mut Value, path: &str, value: Value, create_intermediate: bool) -> Result<()> {
    let segments = parse_path(path);
    let (last, inter) = match segments.split_last() {
        Some(parts) => parts,
        None => return Err(Error::InvalidPath("empty path".into())),
    };

    let mut current = root;
    for seg in inter {
        current = match current {
            Value::Object(map) => {
                if !map.contains_key(seg) {
                    if !create_intermediate {
                        return Err(Error::InvalidPath(format!("missing segment `{seg}`")));
                    }
                    map.insert(seg.clone(), Value::Object(Map::new()));
                }
                map.get_mut(seg)
                    .ok_or_else(|| Error::InvalidPath(format!("missing segment `{seg}`")))?
            }
            Value::Array(items) => {
                let idx = array_index(seg)?;
                match items.get_mut(idx) {
                    Some(v) => v,
                    None => {
                        return Err(Error::InvalidPath(format!("index {idx} out of range")))
                    }
                }
            }
            other => {
                return Err(Error::InvalidPath(format!(
                    "cannot descend into {} at segment `{seg}`",
                    kind_of(other)
                )))
            }
        };
        if !current.is_object() && !current.is_array() {
            return Err(Error::InvalidPath(format!("segment `{seg}` is not a container")));
        }
    }

    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let idx = array_index(last)?;
            if idx < items.len() {
                items[idx] = value;
                Ok(())
            } else if idx == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(Error::InvalidPath(format!("index {idx} out of range")))
            }
        }
        other => Err(Error::InvalidPath(format!(
            "cannot assign into {} at segment `{last}`",
            kind_of(other)
        ))),
    }
}

/// Remove the field or element addressed by `path` from `root`.
///
/// Returns whether something was actually removed: a path that walks off the
/// edge of the data yields `Ok(false)`, never an error. A shape mismatch
/// (descending into a scalar) fails with [`Error::InvalidPath`] — there is no
/// affirmative-but-meaningless fallback. Removing an object field keeps the
/// insertion order of the remaining fields.
pub fn delete_path(root: &mut Value, path: &str) -> Result<bool> {
    let segments = parse_path(path);
    let (last, inter) = match segments.split_last() {
        Some(parts) => parts,
        None => return Err(Error::InvalidPath("empty path".into())),
    };

    let mut current = root;
    for seg in inter {
        current = match current {
            Value::Object(map) => match map.get_mut(seg) {
                Some(v) => v,
                None => return Ok(false),
            },
            Value::Array(items) => {
                let idx = array_index(seg)?;
                match items.get_mut(idx) {
                    Some(v) => v,
                    None => return Ok(false),
                }
            }
            other => {
                return Err(Error::InvalidPath(format!(
                    "cannot descend into {} at segment `{seg}`",
                    kind_of(other)
                )))
            }
        };
    }

    match current {
        Value::Object(map) => Ok(map.shift_remove(last).is_some()),
        Value::Array(items) => {
            let idx = array_index(last)?;
            if idx < items.len() {
                items.remove(idx);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        other => Err(Error::InvalidPath(format!(
            "cannot remove from {} at segment `{last}`",
            kind_of(other)
        ))),
    }
}

fn array_index(seg: &str) -> Result<usize> {
    seg.parse::<usize>()
        .map_err(|_| Error::InvalidPath(format!("`{seg}` is not an array index")))
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
