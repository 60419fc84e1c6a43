//! Optional pre-fetched feature descriptions
//!
//! The cache is a JSON document in one of two shapes:
//!
//! ```text
//! [ {"feature_id": 12, "description": "...", "url": "..."}, ... ]
//! { "12": {"description": "...", "url": "..."}, "13": "bare description", ... }
//! ```
//!
//! Feature ids may be non-negative integers, integral floats, or numeric
//! strings. Text values are trimmed and empty text counts as absent. Entries
//! that do not fit either shape are skipped; a cache that cannot be read at
//! all yields an empty lookup. Neither case aborts a run.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use serde_json::Value;
use tracing::{info, warn};

/// Description and link of one feature. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub description: Option<String>,
    pub url: Option<String>,
}

/// Feature-id keyed description lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionCache {
    entries: BTreeMap<u64, Description>,
}

impl DescriptionCache {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the cache at `path`.
    ///
    /// Read and parse failures are logged as warnings and produce an empty
    /// cache, as are skipped entries (reported once with their count).
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let value = match File::open(path) {
            Ok(file) => serde_json::from_reader::<_, Value>(BufReader::new(file)),
            Err(e) => {
                warn!("Failed to open description cache {}: {e}", path.display());
                return Self::empty();
            }
        };
        let value = match value {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse description cache {}: {e}", path.display());
                return Self::empty();
            }
        };

        let (cache, skipped) = Self::from_value(&value);
        if skipped > 0 {
            warn!(
                "Skipped {skipped} malformed description cache entries in {}",
                path.display()
            );
        }
        info!("Loaded {} feature descriptions", cache.len());
        cache
    }

    /// Builds the cache from a parsed document.
    ///
    /// Returns the cache and the number of skipped entries. A document that is
    /// neither a list nor an object counts as one skipped entry.
    #[must_use]
    pub fn from_value(value: &Value) -> (Self, usize) {
        let mut entries = BTreeMap::new();
        let mut skipped = 0;
        match value {
            Value::Array(items) => {
                for item in items {
                    let parsed = item.as_object().and_then(|object| {
                        let id = feature_id(object.get("feature_id")?)?;
                        Some((id, description_from_object(object)))
                    });
                    match parsed {
                        Some((id, description)) => {
                            entries.insert(id, description);
                        }
                        None => skipped += 1,
                    }
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    let description = match item {
                        Value::Object(object) => Some(description_from_object(object)),
                        Value::String(text) => Some(Description {
                            description: clean_text(text),
                            url: None,
                        }),
                        _ => None,
                    };
                    match (feature_id_from_str(key), description) {
                        (Some(id), Some(description)) => {
                            entries.insert(id, description);
                        }
                        _ => skipped += 1,
                    }
                }
            }
            _ => skipped += 1,
        }
        (Self { entries }, skipped)
    }

    #[must_use]
    pub fn get(&self, feature_id: u64) -> Option<&Description> {
        self.entries.get(&feature_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn description_from_object(object: &serde_json::Map<String, Value>) -> Description {
    let text = |key: &str| object.get(key).and_then(Value::as_str).and_then(clean_text);
    Description {
        description: text("description"),
        url: text("url"),
    }
}

fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn feature_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
        }),
        Value::String(s) => feature_id_from_str(s),
        _ => None,
    }
}

fn feature_id_from_str(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}
