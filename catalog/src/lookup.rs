//! The recursive candidate evaluator: `lookup_impl` from the design, and
//! the field/type "search pass" it delegates to for leaf predicates.
//!
//! Every intermediate `Vec<PartitionInfo>` produced here is sorted by
//! `uuid` ascending, which is what lets [`eval_conj`]/[`eval_disj`]
//! intersect and union them with a single linear merge pass instead of a
//! hash-based set operation.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use predicate::{compatible, evaluate, Expr, MetaKind, Operand, Pred, RelOp};
use schema::{congruent, suffix_matches, Data, Qrf, Type, TypeKind};
use synopsis::{PartitionSynopsis, RangeSketch, Sketch};
use uuid::Uuid;

use crate::error::{Error, InternalInvariantSnafu};
use crate::partition_info::PartitionInfo;

/// The synopses registered for one schema, in the order the catalog last
/// saw them inserted.
pub type Universe = IndexMap<Uuid, Arc<PartitionSynopsis>>;

/// Evaluates `expr` (already normalized, resolved and pruned for `schema`)
/// against every synopsis in `synopses`, returning the candidate
/// partitions sorted by `uuid` ascending.
pub fn lookup_impl(expr: &Expr, schema: &Type, synopses: &Universe) -> Result<Vec<PartitionInfo>, Error> {
    match expr {
        Expr::Pred(pred) => eval_pred(pred, schema, synopses),
        Expr::Conj(children) => eval_conj(children, schema, synopses),
        Expr::Disj(children) => eval_disj(children, schema, synopses),
        // Sketches are one-sided: they can say "definitely absent" but
        // never "definitely present". Negating a maybe would turn a false
        // positive into a false negative, which soundness forbids, so a
        // negation conservatively keeps every partition.
        Expr::Neg(_) => Ok(all_partitions(synopses)),
        Expr::None => InternalInvariantSnafu {
            detail: "Expr::None reached the candidate evaluator; normalize_and_validate should have eliminated it",
        }
        .fail(),
    }
}

/// The full, `uuid`-sorted partition list for a schema's synopses.
pub fn all_partitions(synopses: &Universe) -> Vec<PartitionInfo> {
    let mut out: Vec<PartitionInfo> = synopses
        .iter()
        .map(|(uuid, synopsis)| PartitionInfo::from_synopsis(*uuid, synopsis))
        .collect();
    out.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    out
}

fn eval_conj(
    children: &[Expr],
    schema: &Type,
    synopses: &Universe,
) -> Result<Vec<PartitionInfo>, Error> {
    let mut iter = children.iter();
    let Some(first) = iter.next() else {
        // Normalization turns an empty conjunction into `trivially_true`,
        // so this is unreachable for a normalized expression; treat it the
        // same way regardless.
        return Ok(all_partitions(synopses));
    };
    let mut acc = lookup_impl(first, schema, synopses)?;
    for child in iter {
        if acc.is_empty() {
            return Ok(acc);
        }
        let next = lookup_impl(child, schema, synopses)?;
        acc = intersect_sorted(&acc, &next);
    }
    Ok(acc)
}

fn eval_disj(
    children: &[Expr],
    schema: &Type,
    synopses: &Universe,
) -> Result<Vec<PartitionInfo>, Error> {
    let full_len = synopses.len();
    let mut acc: Vec<PartitionInfo> = Vec::new();
    for child in children {
        let next = lookup_impl(child, schema, synopses)?;
        acc = union_sorted(&acc, &next);
        if acc.len() == full_len {
            // Every partition is already a candidate; further disjuncts
            // cannot add anything.
            break;
        }
    }
    Ok(acc)
}

fn intersect_sorted(a: &[PartitionInfo], b: &[PartitionInfo]) -> Vec<PartitionInfo> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].uuid.cmp(&b[j].uuid) {
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

fn union_sorted(a: &[PartitionInfo], b: &[PartitionInfo]) -> Vec<PartitionInfo> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].uuid.cmp(&b[j].uuid) {
            Ordering::Equal => {
                out.push(a[i].clone());
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                out.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j].clone());
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Whether `pred` is the `trivially_true` sentinel substituted for an
/// absent query. It is an opaque marker, not a real predicate over field
/// data: evaluating it via the ordinary type-extractor path would match it
/// against the (never-occurring) `none`-kind field and incorrectly exclude
/// every partition, so it is special-cased here instead.
fn is_trivially_true(pred: &Pred) -> bool {
    matches!(
        (&pred.lhs, pred.op, &pred.rhs),
        (Operand::TypeOf(ty), RelOp::Eq, Operand::Data(Data::Null)) if ty.kind() == &TypeKind::None
    )
}

fn eval_pred(pred: &Pred, schema: &Type, synopses: &Universe) -> Result<Vec<PartitionInfo>, Error> {
    if is_trivially_true(pred) {
        return Ok(all_partitions(synopses));
    }
    let (selector, op, data) = match (&pred.lhs, &pred.rhs) {
        (Operand::Data(d), selector) => (selector, pred.op, d),
        (selector, Operand::Data(d)) => (selector, pred.op, d),
        _ => {
            return InternalInvariantSnafu {
                detail: format!("predicate has no literal operand: {pred}"),
            }
            .fail()
        }
    };
    match selector {
        Operand::Meta(kind) => Ok(eval_meta(*kind, op, data, schema, synopses)),
        Operand::Field(key) => Ok(search(op, data, synopses, |qrf| {
            suffix_matches(key, &qrf.schema_name, &qrf.field_name) && compatible(&qrf.ty, op, data)
        })),
        Operand::TypeOf(ty) => Ok(search(op, data, synopses, |qrf| {
            if ty.is_nameless() {
                congruent(&qrf.ty, ty)
            } else {
                qrf.ty.name() == ty.name() && compatible(&qrf.ty, op, data)
            }
        })),
        Operand::Data(_) => InternalInvariantSnafu {
            detail: "both predicate operands are literals".to_string(),
        }
        .fail(),
    }
}

fn eval_meta(kind: MetaKind, op: RelOp, data: &Data, schema: &Type, synopses: &Universe) -> Vec<PartitionInfo> {
    match kind {
        MetaKind::Schema => {
            let mut out: Vec<PartitionInfo> = synopses
                .iter()
                .filter(|(_, synopsis)| {
                    synopsis
                        .fields()
                        .any(|(qrf, _)| evaluate(&Data::String(qrf.schema_name.clone()), op, data))
                })
                .map(|(uuid, synopsis)| PartitionInfo::from_synopsis(*uuid, synopsis))
                .collect();
            out.sort_by(|a, b| a.uuid.cmp(&b.uuid));
            out
        }
        MetaKind::SchemaId => {
            if evaluate(&Data::Unsigned(schema.fingerprint()), op, data) {
                all_partitions(synopses)
            } else {
                Vec::new()
            }
        }
        MetaKind::ImportTime => {
            let mut out: Vec<PartitionInfo> = synopses
                .iter()
                .filter(|(_, synopsis)| {
                    let mut interval = RangeSketch::new(Data::Time(synopsis.min_import_time));
                    interval.update(&Data::Time(synopsis.max_import_time));
                    !matches!(interval.lookup(op, data), Some(false))
                })
                .map(|(uuid, synopsis)| PartitionInfo::from_synopsis(*uuid, synopsis))
                .collect();
            out.sort_by(|a, b| a.uuid.cmp(&b.uuid));
            out
        }
        MetaKind::Internal => {
            let present = schema
                .attribute("internal")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(false);
            if evaluate(&Data::Bool(present), op, data) {
                all_partitions(synopses)
            } else {
                Vec::new()
            }
        }
    }
}

/// The shared field/type extractor search pass: scans every known field of
/// every synopsis, short-circuiting a partition in as soon as one matching
/// field's sketch can't rule the predicate out.
fn search(
    op: RelOp,
    data: &Data,
    synopses: &Universe,
    matches_field: impl Fn(&Qrf) -> bool,
) -> Vec<PartitionInfo> {
    let mut out = Vec::new();
    for (uuid, synopsis) in synopses {
        let mut included = false;
        for (qrf, sketch) in synopsis.fields() {
            if !matches_field(qrf) {
                continue;
            }
            let answer = match sketch {
                Some(sketch) => sketch.lookup(op, data),
                None => {
                    let normalized = qrf.ty.normalized();
                    match synopsis.type_sketch(&normalized) {
                        Some(sketch) => sketch.lookup(op, data),
                        // Sentinel with no fallback type synopsis: keep the
                        // partition, we simply have nothing to rule it out with.
                        None => Some(true),
                    }
                }
            };
            if !matches!(answer, Some(false)) {
                included = true;
                break;
            }
        }
        if included {
            out.push(PartitionInfo::from_synopsis(*uuid, synopsis));
        }
    }
    out.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use iox_time::Time;
    use predicate::RelOp;
    use schema::{RecordField, TypeKind};
    use synopsis::MembershipSketch;

    fn schema() -> Type {
        Type::named(
            TypeKind::Record(vec![
                RecordField::new("x", Type::new(TypeKind::Integer)),
                RecordField::new("y", Type::new(TypeKind::Integer)),
            ]),
            "conn",
        )
    }

    fn synopsis_with_field(field: &str, ty: Type, value: Data) -> (Uuid, Arc<PartitionSynopsis>) {
        let uuid = Uuid::new_v4();
        let mut synopsis = PartitionSynopsis::new(schema(), Time::from_timestamp_nanos(0));
        let qrf = Qrf::new("conn", field, ty);
        let mut sketch = MembershipSketch::new(4);
        sketch.insert(&value);
        synopsis.set_field_sketch(qrf, Some(Box::new(sketch)));
        (uuid, Arc::new(synopsis))
    }

    #[test]
    fn conjunction_short_circuits_to_empty() {
        let (u1, s1) = synopsis_with_field("x", Type::new(TypeKind::Integer), Data::Integer(1));
        let (u2, s2) = synopsis_with_field("y", Type::new(TypeKind::Integer), Data::Integer(2));
        let mut universe = Universe::new();
        universe.insert(u1, s1);
        universe.insert(u2, s2);

        let e = Expr::Conj(vec![
            Expr::pred(
                Operand::Field("x".into()),
                RelOp::Eq,
                Operand::Data(Data::Integer(1)),
            ),
            Expr::pred(
                Operand::Field("y".into()),
                RelOp::Eq,
                Operand::Data(Data::Integer(2)),
            ),
        ]);
        let got = lookup_impl(&e, &schema(), &universe).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn negation_returns_every_partition() {
        let (u1, s1) = synopsis_with_field("x", Type::new(TypeKind::Integer), Data::Integer(1));
        let mut universe = Universe::new();
        universe.insert(u1, s1);
        let e = Expr::Neg(Box::new(Expr::pred(
            Operand::Field("x".into()),
            RelOp::Eq,
            Operand::Data(Data::Integer(1)),
        )));
        let got = lookup_impl(&e, &schema(), &universe).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn trivially_true_sentinel_matches_every_partition() {
        let (u1, s1) = synopsis_with_field("x", Type::new(TypeKind::Integer), Data::Integer(1));
        let (u2, s2) = synopsis_with_field("y", Type::new(TypeKind::Integer), Data::Integer(2));
        let mut universe = Universe::new();
        universe.insert(u1, s1);
        universe.insert(u2, s2);
        let got = lookup_impl(&Expr::trivially_true(), &schema(), &universe).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn sentinel_field_without_type_fallback_is_conservative() {
        // A field known to the schema but never sketched is recorded as a
        // `None` sentinel, not omitted from `field_synopses` entirely; with
        // no type-level fallback either, it must stay a candidate.
        let uuid = Uuid::new_v4();
        let mut synopsis = PartitionSynopsis::new(schema(), Time::from_timestamp_nanos(0));
        synopsis.set_field_sketch(Qrf::new("conn", "x", Type::new(TypeKind::Integer)), None);
        let mut universe = Universe::new();
        universe.insert(uuid, Arc::new(synopsis));
        let e = Expr::pred(
            Operand::Field("x".into()),
            RelOp::Eq,
            Operand::Data(Data::Integer(1)),
        );
        let got = lookup_impl(&e, &schema(), &universe).unwrap();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn field_absent_from_synopsis_entirely_is_not_a_candidate() {
        let uuid = Uuid::new_v4();
        let synopsis = PartitionSynopsis::new(schema(), Time::from_timestamp_nanos(0));
        let mut universe = Universe::new();
        universe.insert(uuid, Arc::new(synopsis));
        let e = Expr::pred(
            Operand::Field("x".into()),
            RelOp::Eq,
            Operand::Data(Data::Integer(1)),
        );
        let got = lookup_impl(&e, &schema(), &universe).unwrap();
        assert!(got.is_empty());
    }
}
