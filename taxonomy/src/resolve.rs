//! Concept resolution: rewrites `Field` operands that name a concept into
//! the disjunction of concrete fields the concept maps to within a given
//! schema.

use std::collections::HashSet;

use schema::Type;
use snafu::Snafu;

use predicate::{Expr, Operand, Pred};

use crate::concept::Concepts;

/// A recursive concept expansion that never terminates naturally (a cycle
/// is broken before this triggers; this is a hard backstop).
const MAX_EXPANSION_DEPTH: usize = 20;

/// An error resolving a concept reference.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ResolveError {
    /// A concept's definition nests more than [`MAX_EXPANSION_DEPTH`] deep.
    #[snafu(display(
        "concept expansion exceeded the maximum depth of {limit}; check for a cyclic definition"
    ))]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}

/// Resolves every concept reference in `expr` against `schema`, replacing
/// each with the disjunction of concrete field predicates the concept maps
/// to that are actually present (with a compatible type) in that schema.
///
/// A `Field` operand that does not name a known concept passes through
/// unchanged, exactly as does a concept whose expansion yields no field
/// present in `schema` — the latter keeps the original, unresolved
/// predicate rather than silently dropping it, since an expression that
/// drops to `None` would make this schema look unconditionally excluded.
pub fn resolve(concepts: &Concepts, expr: Expr, schema: &Type) -> Result<Expr, ResolveError> {
    resolve_expr(concepts, expr, schema)
}

fn resolve_expr(concepts: &Concepts, expr: Expr, schema: &Type) -> Result<Expr, ResolveError> {
    Ok(match expr {
        Expr::Pred(pred) => resolve_pred(concepts, pred, schema)?,
        Expr::Conj(children) => Expr::Conj(resolve_all(concepts, children, schema)?),
        Expr::Disj(children) => Expr::Disj(resolve_all(concepts, children, schema)?),
        Expr::Neg(inner) => Expr::Neg(Box::new(resolve_expr(concepts, *inner, schema)?)),
        other => other,
    })
}

fn resolve_all(
    concepts: &Concepts,
    children: Vec<Expr>,
    schema: &Type,
) -> Result<Vec<Expr>, ResolveError> {
    children
        .into_iter()
        .map(|c| resolve_expr(concepts, c, schema))
        .collect()
}

fn resolve_pred(concepts: &Concepts, pred: Pred, schema: &Type) -> Result<Expr, ResolveError> {
    let field_name = match &pred.lhs {
        Operand::Field(name) => name.clone(),
        _ => return Ok(Expr::Pred(pred)),
    };
    if concepts.get(&field_name).is_none() {
        return Ok(Expr::Pred(pred));
    }

    let mut candidates = Vec::new();
    let mut visited = HashSet::new();
    expand(concepts, &field_name, &mut candidates, &mut visited, 0)?;

    let Some(literal) = pred.rhs.as_data() else {
        return Ok(Expr::Pred(pred));
    };
    let leaves = schema.leaves();
    let alternatives: Vec<Expr> = candidates
        .iter()
        .filter_map(|candidate| {
            leaves.iter().find_map(|(leaf_name, leaf_ty)| {
                let matches = schema::suffix_matches(candidate, schema.name(), leaf_name)
                    && predicate::compatible(leaf_ty, pred.op, literal);
                matches.then(|| {
                    Expr::Pred(Pred {
                        lhs: Operand::Field(leaf_name.clone()),
                        op: pred.op,
                        rhs: pred.rhs.clone(),
                    })
                })
            })
        })
        .collect();

    Ok(match alternatives.len() {
        0 => Expr::Pred(pred),
        1 => alternatives.into_iter().next().unwrap(),
        _ => Expr::Disj(alternatives),
    })
}

/// Collects, into `out`, every concrete field name reachable from `name`
/// via concept expansion. Field names that aren't themselves concepts are
/// terminal and are pushed as-is.
fn expand(
    concepts: &Concepts,
    name: &str,
    out: &mut Vec<String>,
    visited: &mut HashSet<String>,
    depth: usize,
) -> Result<(), ResolveError> {
    if depth >= MAX_EXPANSION_DEPTH {
        return DepthExceededSnafu {
            limit: MAX_EXPANSION_DEPTH,
        }
        .fail();
    }
    if !visited.insert(name.to_string()) {
        // Already expanding this concept further up the call chain: it's
        // part of a cycle. Stop without expanding it again.
        return Ok(());
    }
    let Some(concept) = concepts.get(name) else {
        out.push(name.to_string());
        return Ok(());
    };
    out.extend(concept.fields.iter().cloned());
    for sub in &concept.concepts {
        expand(concepts, sub, out, visited, depth + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use predicate::RelOp;
    use schema::{Data, RecordField, TypeKind};

    fn schema_with_ip_field(schema_name: &str, field_name: &str) -> Type {
        Type::named(
            TypeKind::Record(vec![RecordField::new(field_name, Type::new(TypeKind::Ip))]),
            schema_name,
        )
    }

    fn concept_field_eq(name: &str) -> Expr {
        Expr::pred(
            Operand::Field(name.into()),
            RelOp::Eq,
            Operand::Data(Data::Ip("10.0.0.1".parse().unwrap())),
        )
    }

    #[test]
    fn expands_concept_to_matching_schema_field() {
        let mut concepts = Concepts::new();
        concepts.insert(
            "net.src.ip",
            crate::concept::Concept::new("source ip").with_field("id.orig_h"),
        );
        let schema = schema_with_ip_field("conn", "id.orig_h");
        let resolved =
            resolve(&concepts, concept_field_eq("net.src.ip"), &schema).unwrap();
        assert_eq!(resolved, concept_field_eq("id.orig_h"));
    }

    #[test]
    fn unmatched_concept_falls_back_to_original_predicate() {
        let mut concepts = Concepts::new();
        concepts.insert(
            "net.src.ip",
            crate::concept::Concept::new("source ip").with_field("id.orig_h"),
        );
        let schema = schema_with_ip_field("http", "client.ip");
        let resolved =
            resolve(&concepts, concept_field_eq("net.src.ip"), &schema).unwrap();
        assert_eq!(resolved, concept_field_eq("net.src.ip"));
    }

    #[test]
    fn non_concept_field_passes_through() {
        let schema = schema_with_ip_field("conn", "id.orig_h");
        let concepts = Concepts::new();
        let resolved = resolve(&concepts, concept_field_eq("id.orig_h"), &schema).unwrap();
        assert_eq!(resolved, concept_field_eq("id.orig_h"));
    }

    #[test]
    fn cyclic_concepts_terminate() {
        let mut concepts = Concepts::new();
        concepts.insert("a", crate::concept::Concept::new("a").with_concept("b"));
        concepts.insert("b", crate::concept::Concept::new("b").with_concept("a"));
        let schema = schema_with_ip_field("conn", "id.orig_h");
        let resolved = resolve(&concepts, concept_field_eq("a"), &schema);
        assert!(resolved.is_ok());
    }

    #[test]
    fn transitive_concept_expansion() {
        let mut concepts = Concepts::new();
        concepts.insert(
            "net.src.ip",
            crate::concept::Concept::new("source ip").with_concept("zeek.orig"),
        );
        concepts.insert(
            "zeek.orig",
            crate::concept::Concept::new("zeek originator").with_field("id.orig_h"),
        );
        let schema = schema_with_ip_field("conn", "id.orig_h");
        let resolved =
            resolve(&concepts, concept_field_eq("net.src.ip"), &schema).unwrap();
        assert_eq!(resolved, concept_field_eq("id.orig_h"));
    }
}
