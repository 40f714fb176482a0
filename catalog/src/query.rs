//! The inputs and outputs of a candidate lookup.

use std::collections::HashMap;

use predicate::Expr;
use schema::Type;
use uuid::Uuid;

use crate::partition_info::PartitionInfo;

/// A candidate lookup request.
#[derive(Clone, Debug)]
pub struct Query {
    /// The query expression. `None` is treated as trivially true.
    pub expr: Expr,
    /// An identifier used only for logging/tracing correlation.
    pub id: Uuid,
}

impl Query {
    /// Creates a query with a fresh random id.
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            id: Uuid::new_v4(),
        }
    }
}

/// The candidate partitions for one schema, alongside the resolved and
/// pruned sub-expression the caller should hand to each partition's
/// per-partition evaluator.
#[derive(Clone, Debug)]
pub struct CandidateInfo {
    /// The candidate partitions, sorted by `max_import_time` descending,
    /// ties broken by `uuid` ascending.
    pub partitions: Vec<PartitionInfo>,
    /// The schema-bound expression every listed partition should be
    /// evaluated against.
    pub bound_expr: Expr,
}

/// The aggregated result of a [`crate::Catalog::candidates`] call: one
/// [`CandidateInfo`] per schema that had any synopses registered.
#[derive(Clone, Debug, Default)]
pub struct CatalogLookupResult {
    /// Candidates, keyed by schema.
    pub by_schema: HashMap<Type, CandidateInfo>,
}

impl CatalogLookupResult {
    /// An empty result, as returned by an empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The total number of candidate partitions across every schema.
    pub fn total_candidates(&self) -> usize {
        self.by_schema.values().map(|c| c.partitions.len()).sum()
    }
}
