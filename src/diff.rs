//! DiffGate: decides whether the freshly built artifact differs from the
//! committed one.
//!
//! The comparison is structural. Both sides go through the mapping loader and
//! are compared as maps, so key order, indentation or unicode escaping in the
//! committed file never count as a change. A committed file that is missing
//! or unreadable as a map always counts as changed, since the candidate has
//! to replace it.

use crate::artifact;
use crate::emoji::EmojiMap;
use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Changed,
    Unchanged,
}

/// Names that differ between the committed and the candidate map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl MapDiff {
    pub fn between(committed: &EmojiMap, candidate: &EmojiMap) -> Self {
        let mut diff = Self::default();
        for entry in candidate.iter() {
            match committed.get(&entry.name) {
                None => diff.added.push(entry.name.clone()),
                Some(old) if old != entry => diff.modified.push(entry.name.clone()),
                Some(_) => {}
            }
        }
        diff.removed = committed
            .names()
            .filter(|name| candidate.get(name).is_none())
            .map(str::to_string)
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Outcome of one comparison, carrying the candidate bytes to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub verdict: Verdict,
    pub candidate: Vec<u8>,
    pub summary: MapDiff,
    /// Entries in the candidate map.
    pub total: usize,
}

impl ChangeSet {
    pub fn is_changed(&self) -> bool {
        self.verdict == Verdict::Changed
    }

    pub fn sha256(&self) -> String {
        artifact::sha256_hex(&self.candidate)
    }
}

/// Compare candidate artifact bytes against the committed artifact, if any.
///
/// Fails only when the candidate itself does not load, which means the
/// serializer and the loader disagree.
pub fn compare(candidate: &[u8], committed: Option<&[u8]>) -> Result<ChangeSet, SchemaError> {
    let fresh = EmojiMap::from_artifact(candidate)?;
    let previous = committed.and_then(|bytes| EmojiMap::from_artifact(bytes).ok());

    let empty = EmojiMap::new();
    let summary = MapDiff::between(previous.as_ref().unwrap_or(&empty), &fresh);
    let verdict = if previous.is_some() && summary.is_empty() {
        Verdict::Unchanged
    } else {
        Verdict::Changed
    };

    Ok(ChangeSet {
        verdict,
        candidate: candidate.to_vec(),
        summary,
        total: fresh.len(),
    })
}
