//! Concepts: named groupings of fields that denote the same kind of value
//! across differently-shaped schemas.

use std::collections::HashMap;

use observability_deps::tracing::warn;

/// A single concept, e.g. `net.src.ip` mapping onto `id.orig_h` in one
/// schema and `source.ip` in another.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Concept {
    /// A human-readable description, surfaced by documentation tooling.
    pub description: String,
    /// The concrete (dotted) field names this concept maps to directly.
    pub fields: Vec<String>,
    /// Other concepts this concept also maps to, expanded transitively.
    pub concepts: Vec<String>,
}

impl Concept {
    /// Creates a new, empty concept with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            fields: Vec::new(),
            concepts: Vec::new(),
        }
    }

    /// Adds a concrete field mapping.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Adds a reference to another concept.
    #[must_use]
    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concepts.push(concept.into());
        self
    }
}

/// A named collection of [`Concept`]s, as assembled from one or more
/// taxonomy definitions.
#[derive(Clone, Debug, Default)]
pub struct Concepts(HashMap<String, Concept>);

impl Concepts {
    /// Creates an empty set of concepts.
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Defines (or redefines) a concept.
    pub fn insert(&mut self, name: impl Into<String>, concept: Concept) {
        self.0.insert(name.into(), concept);
    }

    /// Looks up a concept by name.
    pub fn get(&self, name: &str) -> Option<&Concept> {
        self.0.get(name)
    }

    /// Merges `other` into `self`. When both define a concept under the
    /// same name, `other`'s definition wins and a warning is logged — two
    /// taxonomy sources disagreeing about a concept's meaning is surprising
    /// enough to want in the logs, but not fatal to loading.
    pub fn merge(&mut self, other: Concepts) {
        for (name, concept) in other.0 {
            if self.0.contains_key(&name) {
                warn!(concept = %name, "duplicate concept definition, keeping the later one");
            }
            self.0.insert(name, concept);
        }
    }
}

impl FromIterator<(String, Concept)> for Concepts {
    fn from_iter<I: IntoIterator<Item = (String, Concept)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_later_definition() {
        let mut a = Concepts::new();
        a.insert("net.src.ip", Concept::new("a").with_field("id.orig_h"));
        let mut b = Concepts::new();
        b.insert("net.src.ip", Concept::new("b").with_field("source.ip"));
        a.merge(b);
        assert_eq!(a.get("net.src.ip").unwrap().description, "b");
    }
}
