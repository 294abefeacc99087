//! Turns the raw upstream dataset into an [`EmojiMap`].
//!
//! Every name of every entry maps to that entry's surrogates, and each
//! `diversityChildren` element (skin-tone variations) contributes its own
//! names the same way. The result is keyed and ordered by name, so the same
//! dataset always serializes to the same bytes no matter how upstream orders
//! categories or entries.

use serde_json::Value;
use tracing::{debug, error, info};

use crate::contract::RawDataset;
use crate::emoji::{ArtifactLayout, EmojiEntry, EmojiMap};
use crate::error::SchemaError;

/// Pure dataset -> map transformation for one artifact layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    layout: ArtifactLayout,
}

impl Normalizer {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> ArtifactLayout {
        self.layout
    }

    /// Build the candidate map. Categories are only recorded when the layout
    /// can store them, which keeps the artifact round trip exact.
    pub fn normalize(&self, raw: &RawDataset) -> Result<EmojiMap, SchemaError> {
        let keep_category = self.layout == ArtifactLayout::Categorized;
        let mut map = EmojiMap::new();

        for (category, entries) in raw.categories() {
            debug!(category, entries = entries.len(), "Normalizing category");
            for (index, value) in entries.iter().enumerate() {
                let at = Location { category, index };
                let emoji = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
                    category: category.to_string(),
                    index,
                })?;

                add_names(&mut map, emoji, &at, keep_category)?;

                match emoji.get("diversityChildren") {
                    None | Some(Value::Null) => {}
                    Some(Value::Array(children)) => {
                        for child in children {
                            let child = child
                                .as_object()
                                .ok_or_else(|| at.missing("diversityChildren"))?;
                            add_names(&mut map, child, &at, keep_category)?;
                        }
                    }
                    Some(_) => return Err(at.missing("diversityChildren")),
                }
            }
        }

        if map.is_empty() {
            error!("Upstream dataset produced no emoji entries");
            return Err(SchemaError::Empty);
        }

        info!(
            emojis = map.len(),
            entries = raw.entry_count(),
            "Found {} emojis including variations",
            map.len()
        );
        Ok(map)
    }
}

/// Position of an entry in the raw dataset, for error reporting.
struct Location<'a> {
    category: &'a str,
    index: usize,
}

impl Location<'_> {
    fn missing(&self, field: &'static str) -> SchemaError {
        SchemaError::MissingField {
            category: self.category.to_string(),
            index: self.index,
            field,
        }
    }
}

fn add_names(
    map: &mut EmojiMap,
    emoji: &serde_json::Map<String, Value>,
    at: &Location<'_>,
    keep_category: bool,
) -> Result<(), SchemaError> {
    let surrogates = emoji
        .get("surrogates")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| at.missing("surrogates"))?;

    let names = emoji
        .get("names")
        .and_then(Value::as_array)
        .filter(|names| !names.is_empty())
        .ok_or_else(|| at.missing("names"))?;

    for name in names {
        let name = name
            .as_str()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| at.missing("names"))?;
        let mut entry = EmojiEntry::new(name, surrogates);
        if keep_category {
            entry = entry.with_category(at.category);
        }
        map.insert(entry)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: Value) -> RawDataset {
        RawDataset::from_json(&value.to_string()).unwrap()
    }

    fn people() -> Value {
        json!({
            "people": [
                {"names": ["smile", "slight_smile"], "surrogates": "🙂"},
                {
                    "names": ["thumbsup", "+1"],
                    "surrogates": "👍",
                    "hasDiversity": true,
                    "diversityChildren": [
                        {"names": ["thumbsup_tone1", "+1_tone1"], "surrogates": "👍🏻"}
                    ]
                }
            ],
            "nature": [{"names": ["dog"], "surrogates": "🐶", "unicodeVersion": 6}]
        })
    }

    #[test]
    fn expands_names_and_diversity_children() {
        let map = Normalizer::default().normalize(&dataset(people())).unwrap();
        assert_eq!(
            map.names().collect::<Vec<_>>(),
            vec!["+1", "+1_tone1", "dog", "slight_smile", "smile", "thumbsup", "thumbsup_tone1"]
        );
        assert_eq!(map.get("+1_tone1").unwrap().surrogates, "👍🏻");
        assert!(map.get("dog").unwrap().category.is_none());
    }

    #[test]
    fn output_bytes_ignore_upstream_ordering() {
        let reordered = json!({
            "nature": [{"names": ["dog"], "surrogates": "🐶"}],
            "people": [
                {
                    "names": ["+1", "thumbsup"],
                    "surrogates": "👍",
                    "diversityChildren": [
                        {"names": ["+1_tone1", "thumbsup_tone1"], "surrogates": "👍🏻"}
                    ]
                },
                {"names": ["slight_smile", "smile"], "surrogates": "🙂"}
            ]
        });
        let normalizer = Normalizer::default();
        let a = normalizer.normalize(&dataset(people())).unwrap();
        let b = normalizer.normalize(&dataset(reordered)).unwrap();
        assert_eq!(
            a.to_artifact(ArtifactLayout::Flat),
            b.to_artifact(ArtifactLayout::Flat)
        );
    }

    #[test]
    fn one_modified_entry_touches_only_its_own_line() {
        let mut modified = people();
        modified["nature"][0]["surrogates"] = json!("🐕");
        let normalizer = Normalizer::default();
        let before = normalizer
            .normalize(&dataset(people()))
            .unwrap()
            .to_artifact(ArtifactLayout::Flat);
        let after = normalizer
            .normalize(&dataset(modified))
            .unwrap()
            .to_artifact(ArtifactLayout::Flat);

        let before = String::from_utf8(before).unwrap();
        let after = String::from_utf8(after).unwrap();
        let differing: Vec<_> = before
            .lines()
            .zip(after.lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(before.lines().count(), after.lines().count());
        assert_eq!(differing, vec![("  \"dog\": \"🐶\",", "  \"dog\": \"🐕\",")]);
    }

    #[test]
    fn categorized_layout_records_category() {
        let map = Normalizer::new(ArtifactLayout::Categorized)
            .normalize(&dataset(people()))
            .unwrap();
        assert_eq!(map.get("dog").unwrap().category.as_deref(), Some("nature"));
        assert_eq!(map.get("thumbsup_tone1").unwrap().category.as_deref(), Some("people"));
    }

    #[test]
    fn missing_surrogates_is_a_schema_error() {
        let raw = dataset(json!({"people": [{"names": ["smile"]}]}));
        assert_eq!(
            Normalizer::default().normalize(&raw).unwrap_err(),
            SchemaError::MissingField {
                category: "people".into(),
                index: 0,
                field: "surrogates",
            }
        );
    }

    #[test]
    fn empty_or_blank_names_are_rejected() {
        for names in [json!([]), json!([""]), json!("smile"), json!([1])] {
            let raw = dataset(json!({"people": [{"names": names, "surrogates": "🙂"}]}));
            assert!(matches!(
                Normalizer::default().normalize(&raw),
                Err(SchemaError::MissingField { field: "names", .. })
            ));
        }
    }

    #[test]
    fn conflicting_duplicate_names_are_rejected() {
        let raw = dataset(json!({
            "people": [{"names": ["smile"], "surrogates": "🙂"}],
            "symbols": [{"names": ["smile"], "surrogates": "😄"}]
        }));
        assert!(matches!(
            Normalizer::default().normalize(&raw),
            Err(SchemaError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn non_object_entries_and_children_are_rejected() {
        let raw = dataset(json!({"people": ["smile"]}));
        assert!(matches!(
            Normalizer::default().normalize(&raw),
            Err(SchemaError::NotAnObject { index: 0, .. })
        ));

        let raw = dataset(json!({"people": [
            {"names": ["a"], "surrogates": "x", "diversityChildren": {"names": ["b"]}}
        ]}));
        assert!(matches!(
            Normalizer::default().normalize(&raw),
            Err(SchemaError::MissingField { field: "diversityChildren", .. })
        ));
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let raw = dataset(json!({"people": []}));
        assert_eq!(Normalizer::default().normalize(&raw).unwrap_err(), SchemaError::Empty);
    }
}
