//! Label filters
//!
//! A filter is a conjunctive predicate over a container's labels, parsed
//! once from a `label=value,label=value,...` pattern at start-up.

use crate::container::Container;
use crate::error::BeaconError;

/// A predicate matching containers against a set of label criteria.
///
/// The empty filter matches every container. Matching is literal and
/// case-sensitive; whitespace is not trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pairs: Vec<(String, String)>,
}

impl Filter {
    /// Parse a filter from a `k=v,k=v,...` pattern. Empty patterns and
    /// empty tokens are accepted and match everything; a non-empty token
    /// without `=` is an [`BeaconError::InvalidFilter`].
    pub fn parse(pattern: &str) -> Result<Self, BeaconError> {
        let mut pairs = Vec::new();
        for token in pattern.split(',') {
            if token.is_empty() {
                continue;
            }
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| BeaconError::InvalidFilter(token.to_string()))?;
            pairs.push((key.to_string(), value.to_string()));
        }
        Ok(Filter { pairs })
    }

    /// True iff the container carries every label pair in the filter.
    pub fn matches(&self, container: &Container) -> bool {
        self.pairs
            .iter()
            .all(|(key, value)| container.labels.get(key) == Some(value))
    }

    /// True if this filter matches every container.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
