use std::collections::HashMap;

use crate::model::MatchKind;

/// Fallback comparison key: trimmed, internal whitespace runs (including
/// newlines) collapsed to one space, Unicode lowercase. Punctuation is kept.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Outcome of adding a name to a [`NameIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    New,
    /// The exact name was already present; the earlier position is kept.
    DuplicateExact { first: usize },
    /// The exact name is new but its normalized form collides with an
    /// earlier name; normalized lookups keep the earlier position.
    NormalizedCollision { first: usize },
}

/// Name lookup over one table: exact first, then normalized.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    exact: HashMap<String, usize>,
    normalized: HashMap<String, usize>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, position: usize) -> Inserted {
        if let Some(&first) = self.exact.get(name) {
            return Inserted::DuplicateExact { first };
        }
        self.exact.insert(name.to_string(), position);

        let key = normalize_name(name);
        match self.normalized.get(&key) {
            Some(&first) => Inserted::NormalizedCollision { first },
            None => {
                self.normalized.insert(key, position);
                Inserted::New
            }
        }
    }

    pub fn exact(&self, name: &str) -> Option<usize> {
        self.exact.get(name).copied()
    }

    /// Exact match, else normalized match.
    pub fn lookup(&self, name: &str) -> Option<(usize, MatchKind)> {
        if let Some(position) = self.exact(name) {
            return Some((position, MatchKind::Exact));
        }
        self.normalized
            .get(&normalize_name(name))
            .map(|&position| (position, MatchKind::Normalized))
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
