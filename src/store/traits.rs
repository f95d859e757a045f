//! Store capability flags

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreTrait {
    /// Duplicate elements merge before they are written
    IngestAggregation,
    /// Results are re-aggregated under the query's view
    QueryAggregation,
    PreAggregationFiltering,
    PostAggregationFiltering,
    Transformation,
    PostTransformationFiltering,
    /// Range scans over serialised vertices
    Ordered,
    Visibility,
    /// Elements are validated against the schema on the way in
    StoreValidation,
}

impl StoreTrait {
    pub const ALL: [StoreTrait; 9] = [
        StoreTrait::IngestAggregation,
        StoreTrait::QueryAggregation,
        StoreTrait::PreAggregationFiltering,
        StoreTrait::PostAggregationFiltering,
        StoreTrait::Transformation,
        StoreTrait::PostTransformationFiltering,
        StoreTrait::Ordered,
        StoreTrait::Visibility,
        StoreTrait::StoreValidation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StoreTrait::IngestAggregation => "INGEST_AGGREGATION",
            StoreTrait::QueryAggregation => "QUERY_AGGREGATION",
            StoreTrait::PreAggregationFiltering => "PRE_AGGREGATION_FILTERING",
            StoreTrait::PostAggregationFiltering => "POST_AGGREGATION_FILTERING",
            StoreTrait::Transformation => "TRANSFORMATION",
            StoreTrait::PostTransformationFiltering => "POST_TRANSFORMATION_FILTERING",
            StoreTrait::Ordered => "ORDERED",
            StoreTrait::Visibility => "VISIBILITY",
            StoreTrait::StoreValidation => "STORE_VALIDATION",
        }
    }
}

impl fmt::Display for StoreTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type TraitSet = BTreeSet<StoreTrait>;

/// Traits every member of `sets` declares
pub fn intersection<'a>(mut sets: impl Iterator<Item = &'a TraitSet>) -> TraitSet {
    let Some(first) = sets.next() else {
        return TraitSet::new();
    };
    sets.fold(first.clone(), |acc, set| acc.intersection(set).copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a: TraitSet = [StoreTrait::Ordered, StoreTrait::Visibility].into_iter().collect();
        let b: TraitSet = [StoreTrait::Visibility, StoreTrait::Transformation].into_iter().collect();
        let common = intersection([&a, &b].into_iter());
        assert_eq!(common, [StoreTrait::Visibility].into_iter().collect());
        assert!(intersection(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_string(&StoreTrait::PostAggregationFiltering).unwrap();
        assert_eq!(json, "\"POST_AGGREGATION_FILTERING\"");
        assert_eq!(StoreTrait::Ordered.to_string(), "ORDERED");
    }
}
