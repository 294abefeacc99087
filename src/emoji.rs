//! Emoji map model and the committed artifact format.
//!
//! The artifact is a single JSON object keyed by emoji name, one entry per
//! line, keys in byte order. Two layouts exist:
//!
//! - [`ArtifactLayout::Flat`]: `{"smile": "🙂"}`, the shape the bot library loads.
//! - [`ArtifactLayout::Categorized`]: `{"smile": {"surrogates": "🙂", "category": "people"}}`.
//!
//! [`EmojiMap::from_artifact`] accepts either shape (per value), so the loader
//! never needs to be told which layout produced a file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Shape of the values in the serialized artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactLayout {
    #[default]
    Flat,
    Categorized,
}

/// One emoji name and the unicode sequence it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiEntry {
    pub name: String,
    pub surrogates: String,
    pub category: Option<String>,
}

impl EmojiEntry {
    pub fn new(name: impl Into<String>, surrogates: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surrogates: surrogates.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Full name -> entry mapping, always iterated in canonical (byte) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmojiMap {
    entries: BTreeMap<String, EmojiEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ArtifactValue {
    Flat(String),
    Categorized {
        surrogates: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
}

impl EmojiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Listing the same mapping twice is harmless and the first
    /// occurrence is kept; the same name with a different representation is
    /// a schema violation.
    pub fn insert(&mut self, entry: EmojiEntry) -> Result<(), SchemaError> {
        if let Some(existing) = self.entries.get(&entry.name) {
            if existing.surrogates == entry.surrogates {
                return Ok(());
            }
            return Err(SchemaError::DuplicateKey {
                name: entry.name,
                first: existing.surrogates.clone(),
                second: entry.surrogates,
            });
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EmojiEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmojiEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialize to artifact bytes: pretty JSON, keys sorted, trailing newline.
    /// The flat layout has no room for categories and drops them.
    pub fn to_artifact(&self, layout: ArtifactLayout) -> Vec<u8> {
        let values: BTreeMap<&str, ArtifactValue> = self
            .entries
            .iter()
            .map(|(name, entry)| {
                let value = match layout {
                    ArtifactLayout::Flat => ArtifactValue::Flat(entry.surrogates.clone()),
                    ArtifactLayout::Categorized => ArtifactValue::Categorized {
                        surrogates: entry.surrogates.clone(),
                        category: entry.category.clone(),
                    },
                };
                (name.as_str(), value)
            })
            .collect();

        // A map of strings to plain data cannot fail to serialize.
        let mut bytes = serde_json::to_vec_pretty(&values).unwrap_or_default();
        bytes.push(b'\n');
        bytes
    }

    /// The mapping loader: parse artifact bytes back into a map.
    pub fn from_artifact(bytes: &[u8]) -> Result<Self, SchemaError> {
        let values: BTreeMap<String, ArtifactValue> =
            serde_json::from_slice(bytes).map_err(|e| SchemaError::Artifact(e.to_string()))?;

        let mut map = Self::new();
        for (name, value) in values {
            let entry = match value {
                ArtifactValue::Flat(surrogates) => EmojiEntry::new(name, surrogates),
                ArtifactValue::Categorized {
                    surrogates,
                    category,
                } => EmojiEntry {
                    name,
                    surrogates,
                    category,
                },
            };
            map.insert(entry)?;
        }
        Ok(map)
    }
}

impl FromIterator<EmojiEntry> for EmojiMap {
    /// Later duplicates are dropped silently; use [`EmojiMap::insert`] when
    /// conflicts must be reported.
    fn from_iter<I: IntoIterator<Item = EmojiEntry>>(iter: I) -> Self {
        let mut entries = BTreeMap::new();
        for entry in iter {
            entries.entry(entry.name.clone()).or_insert(entry);
        }
        Self { entries }
    }
}
