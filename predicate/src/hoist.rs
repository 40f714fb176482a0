//! Hoisting: unwraps singleton connectives and removes exact-duplicate
//! children from a connective, the two simplifications needed for
//! [`crate::prune`]'s fixed-point loop to converge.

use crate::expr::Expr;

/// Recursively unwraps any `Conj`/`Disj` with a single child into that
/// child, and removes children that are structurally identical to one
/// already present (idempotence: `x && x == x`, `x || x == x`).
pub fn hoist(expr: Expr) -> Expr {
    match expr {
        Expr::Conj(children) => hoist_connective(children, true),
        Expr::Disj(children) => hoist_connective(children, false),
        Expr::Neg(inner) => Expr::Neg(Box::new(hoist(*inner))),
        other => other,
    }
}

fn hoist_connective(children: Vec<Expr>, is_conj: bool) -> Expr {
    let mut deduped: Vec<Expr> = Vec::with_capacity(children.len());
    for child in children {
        let child = hoist(child);
        if !deduped.contains(&child) {
            deduped.push(child);
        }
    }
    match deduped.len() {
        1 => deduped.into_iter().next().unwrap(),
        _ if is_conj => Expr::Conj(deduped),
        _ => Expr::Disj(deduped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::Operand;
    use crate::relop::RelOp;
    use schema::Data;

    fn field_eq(name: &str, v: i64) -> Expr {
        Expr::pred(
            Operand::Field(name.into()),
            RelOp::Eq,
            Operand::Data(Data::Integer(v)),
        )
    }

    #[test]
    fn unwraps_singleton_connective() {
        let e = Expr::Disj(vec![field_eq("a", 1)]);
        assert_eq!(hoist(e), field_eq("a", 1));
    }

    #[test]
    fn removes_exact_duplicates() {
        let e = Expr::Disj(vec![field_eq("a", 1), field_eq("a", 1), field_eq("b", 2)]);
        assert_eq!(hoist(e), Expr::Disj(vec![field_eq("a", 1), field_eq("b", 2)]));
    }

    #[test]
    fn leaves_distinct_children_alone() {
        let e = Expr::Conj(vec![field_eq("a", 1), field_eq("b", 2)]);
        assert_eq!(hoist(e.clone()), e);
    }
}
