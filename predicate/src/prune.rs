//! Partition pruning: rewrites a normalized expression so that repeated
//! lookups against the same literal collapse onto a single generalized
//! predicate, leaving one concrete occurrence so a sketch lookup can still
//! fire.

use std::collections::{HashMap, HashSet};

use schema::{Type, TypeKind};

use crate::expr::Expr;
use crate::operand::{Operand, Pred};
use crate::relop::RelOp;

/// Alternates [`prune_once`] and [`crate::hoist`] until a fixed point is
/// reached.
///
/// `unprunable` names fields (by dotted path) that must never be
/// generalized away, e.g. because they carry a particularly selective
/// sketch.
pub fn prune(expr: Expr, unprunable: &HashSet<String>) -> Expr {
    let mut current = expr;
    loop {
        let pruned = prune_once(current.clone(), unprunable);
        let hoisted = crate::hoist(pruned);
        if hoisted == current {
            return hoisted;
        }
        current = hoisted;
    }
}

fn prune_once(expr: Expr, unprunable: &HashSet<String>) -> Expr {
    match expr {
        Expr::Conj(children) => Expr::Conj(prune_children(children, unprunable)),
        Expr::Disj(children) => Expr::Disj(prune_children(children, unprunable)),
        Expr::Neg(inner) => Expr::Neg(Box::new(prune_once(*inner, unprunable))),
        other => other,
    }
}

/// The key identifying a group of predicates eligible for collapsing: same
/// operator applied to the same string literal.
type DedupKey = (OpKey, String);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct OpKey(u8);

fn op_key(op: RelOp) -> OpKey {
    OpKey(match op {
        RelOp::Eq => 0,
        RelOp::Ne => 1,
        RelOp::Lt => 2,
        RelOp::Le => 3,
        RelOp::Gt => 4,
        RelOp::Ge => 5,
        RelOp::In => 6,
        RelOp::NotIn => 7,
        RelOp::Ni => 8,
        RelOp::NotNi => 9,
        RelOp::Match => 10,
        RelOp::NotMatch => 11,
    })
}

/// Extracts the `(op, string literal)` key for a predicate eligible for
/// generalization, or `None` if it doesn't qualify.
fn prunable_key(pred: &Pred, unprunable: &HashSet<String>) -> Option<DedupKey> {
    let literal = match &pred.rhs {
        Operand::Data(schema::Data::String(s)) => s.clone(),
        _ => return None,
    };
    match &pred.lhs {
        Operand::Field(name) if !unprunable.contains(name) => Some((op_key(pred.op), literal)),
        Operand::TypeOf(ty) if ty.kind() == &TypeKind::String => Some((op_key(pred.op), literal)),
        _ => None,
    }
}

fn string_type_extractor(op: RelOp, literal: String) -> Expr {
    Expr::pred(
        Operand::TypeOf(Type::new(TypeKind::String)),
        op,
        Operand::Data(schema::Data::String(literal)),
    )
}

fn prune_children(children: Vec<Expr>, unprunable: &HashSet<String>) -> Vec<Expr> {
    // Maps each dedup key to whether a generalized `:string` replacement has
    // already been emitted for it.
    let mut generalized: HashMap<DedupKey, bool> = HashMap::new();
    let mut result = Vec::with_capacity(children.len());
    for child in children {
        let Expr::Pred(pred) = &child else {
            result.push(prune_once(child, unprunable));
            continue;
        };
        let Some(key) = prunable_key(pred, unprunable) else {
            result.push(child);
            continue;
        };
        match generalized.get(&key) {
            None => {
                // First occurrence: keep it verbatim so a concrete sketch
                // lookup still has a chance to fire.
                generalized.insert(key, false);
                result.push(child);
            }
            Some(false) => {
                // Second occurrence: emit the single generalized stand-in
                // for every further duplicate.
                result.push(string_type_extractor(pred.op, key.1.clone()));
                generalized.insert(key, true);
            }
            Some(true) => {
                // A generalized predicate for this key already covers the
                // duplicate; dropping it changes nothing.
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::Data;

    fn field_eq_str(name: &str, s: &str) -> Expr {
        Expr::pred(
            Operand::Field(name.into()),
            RelOp::Eq,
            Operand::Data(Data::String(s.into())),
        )
    }

    #[test]
    fn collapses_repeated_string_lookups_keeping_the_first() {
        let e = Expr::Disj(vec![
            field_eq_str("a.b.c", "x"),
            field_eq_str("d.e", "x"),
            field_eq_str("f.g.h", "x"),
        ]);
        let pruned = prune(e, &HashSet::new());
        assert_eq!(
            pruned,
            Expr::Disj(vec![
                field_eq_str("a.b.c", "x"),
                string_type_extractor(RelOp::Eq, "x".into()),
            ])
        );
    }

    #[test]
    fn unprunable_fields_are_left_alone() {
        let mut unprunable = HashSet::new();
        unprunable.insert("a.b.c".to_string());
        let e = Expr::Disj(vec![field_eq_str("a.b.c", "x"), field_eq_str("d.e", "x")]);
        let pruned = prune(e, &unprunable);
        assert_eq!(
            pruned,
            Expr::Disj(vec![field_eq_str("a.b.c", "x"), field_eq_str("d.e", "x")])
        );
    }

    #[test]
    fn is_idempotent() {
        let e = Expr::Disj(vec![
            field_eq_str("a", "x"),
            field_eq_str("b", "x"),
            field_eq_str("c", "x"),
        ]);
        let once = prune(e, &HashSet::new());
        let twice = prune(once.clone(), &HashSet::new());
        assert_eq!(once, twice);
    }

    #[test]
    fn distinct_literals_are_independent() {
        let e = Expr::Disj(vec![field_eq_str("a", "x"), field_eq_str("b", "y")]);
        let pruned = prune(e.clone(), &HashSet::new());
        assert_eq!(pruned, e);
    }
}
