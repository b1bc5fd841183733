use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub(crate) static EMPTY_VOCABULARY: CategoryVocabulary = CategoryVocabulary { values: Vec::new() };

/// Fixed mapping from category strings to integer codes.
///
/// Built once at fit time in sorted order; the code of a value is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryVocabulary {
    values: Vec<String>,
}

impl CategoryVocabulary {
    /// Sorted, deduplicated vocabulary of the observed values.
    pub fn from_observed<'a, I>(observed: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = observed.into_iter().collect();
        Self {
            values: distinct.into_iter().map(str::to_string).collect(),
        }
    }

    /// Vocabulary with exactly the given order, as stored in a bundle.
    pub fn from_ordered(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entry that unseen values are mapped onto.
    pub fn first(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn code_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|known| known == value)
    }

    pub(crate) fn has_duplicates(&self) -> bool {
        let distinct: BTreeSet<&String> = self.values.iter().collect();
        distinct.len() != self.values.len()
    }
}
