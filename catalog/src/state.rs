//! [`CatalogState`]: the synchronous core the catalog actor wraps.
//!
//! Kept free of any `tokio`/channel concerns so the candidate-lookup
//! algorithm and the bookkeeping around it can be unit tested directly,
//! the way `ingester`'s `IngesterData` separates its data structures from
//! the RPC/actor layer that serves them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use observability_deps::tracing::debug;
use predicate::Expr;
use schema::{Type, TypeKind};
use snafu::ResultExt;
use synopsis::PartitionSynopsis;
use taxonomy::Concepts;
use uuid::Uuid;

use crate::error::{Error, InvalidArgumentSnafu, TaxonomyResolutionSnafu, UnsupportedVersionSnafu};
use crate::lookup::{lookup_impl, Universe};
use crate::partition_info::PartitionInfo;
use crate::query::{CandidateInfo, CatalogLookupResult, Query};

/// The catalog's in-memory index, independent of how it is scheduled.
#[derive(Debug)]
pub struct CatalogState {
    synopses_by_schema: HashMap<Type, Universe>,
    unprunable_fields: HashSet<String>,
    taxonomies: Concepts,
    min_supported_version: u32,
}

impl CatalogState {
    /// Creates an empty, not-yet-started state.
    pub fn new(taxonomies: Concepts, min_supported_version: u32) -> Self {
        Self {
            synopses_by_schema: HashMap::new(),
            unprunable_fields: HashSet::new(),
            taxonomies,
            min_supported_version,
        }
    }

    /// Bootstraps the catalog from its initial set of synopses, rejecting
    /// the whole batch if any of them predates `min_supported_version`.
    pub fn start(&mut self, synopses: Vec<(Uuid, Arc<PartitionSynopsis>)>) -> Result<(), Error> {
        let offending: Vec<Uuid> = synopses
            .iter()
            .filter(|(_, s)| s.version < self.min_supported_version)
            .map(|(uuid, _)| *uuid)
            .collect();
        if !offending.is_empty() {
            return UnsupportedVersionSnafu {
                uuids: offending,
                min_supported: self.min_supported_version,
            }
            .fail();
        }
        for (uuid, synopsis) in synopses {
            self.insert(uuid, synopsis);
        }
        debug!(schemas = self.synopses_by_schema.len(), "catalog started");
        Ok(())
    }

    /// Adds (or overwrites) synopses. Unlike [`CatalogState::start`], this
    /// does not re-check the version gate — the spec leaves per-merge
    /// gating as an open question and we resolve it as "gate once, at
    /// bootstrap, and trust the write path afterwards".
    pub fn merge(&mut self, synopses: Vec<(Uuid, Arc<PartitionSynopsis>)>) {
        for (uuid, synopsis) in synopses {
            self.insert(uuid, synopsis);
        }
    }

    /// Removes a partition by uuid.
    pub fn erase(&mut self, uuid: Uuid) -> Result<(), Error> {
        let found = self
            .synopses_by_schema
            .values_mut()
            .any(|m| m.shift_remove(&uuid).is_some());
        if found {
            Ok(())
        } else {
            Err(Error::LookupError { uuid })
        }
    }

    /// Atomically erases `old` and inserts `new`.
    pub fn replace(&mut self, old: Vec<Uuid>, new: Vec<(Uuid, Arc<PartitionSynopsis>)>) {
        for uuid in old {
            let _ = self.erase(uuid);
        }
        self.merge(new);
    }

    fn insert(&mut self, uuid: Uuid, synopsis: Arc<PartitionSynopsis>) {
        for (qrf, _) in synopsis.fields() {
            if matches!(qrf.ty.kind(), TypeKind::String | TypeKind::Enum(_)) {
                self.unprunable_fields.insert(qrf.field_name.clone());
            }
        }
        self.synopses_by_schema
            .entry(synopsis.schema.clone())
            .or_insert_with(Universe::new)
            .insert(uuid, synopsis);
    }

    /// Every synopsis the catalog currently holds.
    pub fn get_all(&self) -> Vec<(Uuid, Arc<PartitionSynopsis>)> {
        self.synopses_by_schema
            .values()
            .flat_map(|m| m.iter().map(|(uuid, s)| (*uuid, Arc::clone(s))))
            .collect()
    }

    /// Every synopsis whose partition is a candidate for `expr`, across all
    /// schemas.
    pub fn get_filtered(&self, expr: Expr) -> Result<Vec<(Uuid, Arc<PartitionSynopsis>)>, Error> {
        let normalized = predicate::normalize_and_validate(expr)
            .map_err(|source| Error::InvalidArgument { source })?;
        let mut out = Vec::new();
        for (schema, universe) in &self.synopses_by_schema {
            let resolved = taxonomy::resolve(&self.taxonomies, normalized.clone(), schema)
                .map_err(|source| Error::TaxonomyResolution {
                    schema: schema.name().to_string(),
                    source,
                })?;
            let pruned = predicate::prune(resolved, &self.unprunable_fields);
            let candidates = lookup_impl(&pruned, schema, universe)?;
            out.extend(
                candidates
                    .into_iter()
                    .map(|info| (info.uuid, Arc::clone(&universe[&info.uuid]))),
            );
        }
        Ok(out)
    }

    /// Looks up a single partition's info by uuid.
    pub fn get_by_uuid(&self, uuid: Uuid) -> Result<PartitionInfo, Error> {
        self.synopses_by_schema
            .values()
            .find_map(|m| m.get(&uuid).map(|s| PartitionInfo::from_synopsis(uuid, s)))
            .ok_or(Error::LookupError { uuid })
    }

    /// The central operation: resolves, prunes and evaluates `query` against
    /// every schema, returning per-schema candidate lists sorted by
    /// `max_import_time` descending (ties by `uuid` ascending).
    pub fn candidates(&self, query: Query) -> Result<CatalogLookupResult, Error> {
        let expr = if query.expr.is_none() {
            Expr::trivially_true()
        } else {
            query.expr
        };
        let normalized =
            predicate::normalize_and_validate(expr).map_err(|source| Error::InvalidArgument { source })?;

        let mut by_schema = HashMap::new();
        for (schema, universe) in &self.synopses_by_schema {
            let resolved = taxonomy::resolve(&self.taxonomies, normalized.clone(), schema)
                .map_err(|source| Error::TaxonomyResolution {
                    schema: schema.name().to_string(),
                    source,
                })?;
            let pruned = predicate::prune(resolved, &self.unprunable_fields);
            let mut partitions = lookup_impl(&pruned, schema, universe)?;
            partitions.sort_by(|a, b| {
                b.max_import_time
                    .cmp(&a.max_import_time)
                    .then_with(|| a.uuid.cmp(&b.uuid))
            });
            debug!(
                schema = schema.name(),
                query_id = %query.id,
                candidates = partitions.len(),
                total = universe.len(),
                "evaluated candidate lookup"
            );
            by_schema.insert(
                schema.clone(),
                CandidateInfo {
                    partitions,
                    bound_expr: pruned,
                },
            );
        }
        Ok(CatalogLookupResult { by_schema })
    }

    /// An estimate, in bytes, of the catalog's total heap footprint.
    pub fn memusage(&self) -> usize {
        self.synopses_by_schema
            .values()
            .flat_map(|m| m.values())
            .map(|s| s.memory_usage())
            .sum()
    }

    /// The fields the pruner must never generalize away. Exposed for tests
    /// and the streaming lookup, which memoizes its own resolve+prune pass.
    pub fn unprunable_fields(&self) -> &HashSet<String> {
        &self.unprunable_fields
    }

    /// The taxonomy this catalog resolves concepts against.
    pub fn taxonomies(&self) -> &Concepts {
        &self.taxonomies
    }

    /// Every schema currently registered.
    pub fn schemas(&self) -> impl Iterator<Item = &Type> {
        self.synopses_by_schema.keys()
    }
}
