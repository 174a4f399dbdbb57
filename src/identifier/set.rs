use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A set of identifier strings
///
/// Used for ignore lists and for membership checks against the full catalog.
/// [`union`](Self::union), [`intersection`](Self::intersection) and
/// [`difference`](Self::difference) return new sets and leave both operands
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierSet {
    items: HashSet<String>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, returns `false` if it was already present
    pub fn add(&mut self, value: impl Into<String>) -> bool {
        self.items.insert(value.into())
    }

    /// Adds every value of an iterator
    pub fn add_all<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items.extend(values.into_iter().map(Into::into));
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.contains(value)
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Values in arbitrary order
    pub fn values(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }

    /// Values in lexicographic order
    pub fn sorted_values(&self) -> Vec<String> {
        let mut values = self.values();
        values.sort_unstable();
        values
    }

    pub fn union(&self, other: &IdentifierSet) -> IdentifierSet {
        self.items.union(&other.items).cloned().collect()
    }

    pub fn intersection(&self, other: &IdentifierSet) -> IdentifierSet {
        self.items.intersection(&other.items).cloned().collect()
    }

    /// Items in `self` that are not in `other`
    pub fn difference(&self, other: &IdentifierSet) -> IdentifierSet {
        self.items.difference(&other.items).cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = IdentifierSet::new();
        set.add_all(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for IdentifierSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}
