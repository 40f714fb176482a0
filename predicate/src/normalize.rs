//! Normalization: puts an [`Expr`] into the canonical form the rest of the
//! crate (and the catalog) assumes.

use snafu::Snafu;

use schema::Data;

use crate::compat::compatible;
use crate::expr::Expr;
use crate::operand::{MetaKind, Operand, Pred};
use crate::relop::RelOp;

/// An expression that cannot be normalized because it is not well-formed.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum NormalizeError {
    /// A predicate had zero or two `Data` operands instead of exactly one.
    #[snafu(display("predicate must have exactly one literal operand: {pred}"))]
    NotOneDataOperand {
        /// The offending predicate, rendered for diagnostics.
        pred: String,
    },
    /// A predicate combined an operator with an operand it cannot apply to,
    /// e.g. comparing a schema name against a non-string literal.
    #[snafu(display("operator {op} is not valid for operand {operand}"))]
    IncompatibleOperand {
        /// The operator.
        op: RelOp,
        /// The non-data operand it was paired with, rendered for
        /// diagnostics.
        operand: String,
    },
}

/// Puts `expr` into canonical form: connectives are flattened and
/// deduplicated, `None` children are eliminated, negation is pushed down to
/// sit directly atop predicates, singleton connectives are unwrapped, and
/// each predicate's literal operand is canonicalized to the right-hand side
/// where the operator permits it.
///
/// Idempotent: `normalize_and_validate(normalize_and_validate(e)?) ==
/// normalize_and_validate(e)?`.
pub fn normalize_and_validate(expr: Expr) -> Result<Expr, NormalizeError> {
    let expr = push_negation(expr);
    let expr = flatten_and_validate(expr)?;
    Ok(crate::hoist(expr))
}

fn push_negation(expr: Expr) -> Expr {
    match expr {
        Expr::Neg(inner) => match *inner {
            Expr::Neg(grandchild) => push_negation(*grandchild),
            Expr::Conj(children) => Expr::Disj(
                children
                    .into_iter()
                    .map(|c| push_negation(Expr::Neg(Box::new(c))))
                    .collect(),
            ),
            Expr::Disj(children) => Expr::Conj(
                children
                    .into_iter()
                    .map(|c| push_negation(Expr::Neg(Box::new(c))))
                    .collect(),
            ),
            Expr::None => Expr::None,
            leaf @ Expr::Pred(_) => Expr::Neg(Box::new(leaf)),
        },
        Expr::Conj(children) => {
            Expr::Conj(children.into_iter().map(push_negation).collect())
        }
        Expr::Disj(children) => {
            Expr::Disj(children.into_iter().map(push_negation).collect())
        }
        other => other,
    }
}

fn flatten_and_validate(expr: Expr) -> Result<Expr, NormalizeError> {
    match expr {
        Expr::Pred(pred) => Ok(Expr::Pred(canonicalize_and_validate(pred)?)),
        Expr::Neg(inner) => Ok(Expr::Neg(Box::new(flatten_and_validate(*inner)?))),
        Expr::Conj(children) => flatten_connective(children, true),
        Expr::Disj(children) => flatten_connective(children, false),
        Expr::None => Ok(Expr::None),
    }
}

fn flatten_connective(children: Vec<Expr>, is_conj: bool) -> Result<Expr, NormalizeError> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        let child = flatten_and_validate(child)?;
        if child.is_none() {
            continue;
        }
        match (&child, is_conj) {
            (Expr::Conj(grandchildren), true) | (Expr::Disj(grandchildren), false) => {
                flat.extend(grandchildren.iter().cloned())
            }
            _ => flat.push(child),
        }
    }
    Ok(match flat.len() {
        // AND of nothing is vacuously true; OR of nothing is vacuously false.
        0 if is_conj => Expr::trivially_true(),
        0 => Expr::None,
        1 => flat.into_iter().next().unwrap(),
        _ if is_conj => Expr::Conj(flat),
        _ => Expr::Disj(flat),
    })
}

fn canonicalize_and_validate(pred: Pred) -> Result<Pred, NormalizeError> {
    let Pred { lhs, op, rhs } = pred;
    let (selector, op, data, data_on_right) = match (lhs.is_data(), rhs.is_data()) {
        (true, false) => (rhs, op, lhs, false),
        (false, true) => (lhs, op, rhs, true),
        _ => {
            return NotOneDataOperandSnafu {
                pred: format!("{lhs} {op} {rhs}"),
            }
            .fail()
        }
    };
    let data = data.as_data().expect("checked above").clone();
    let canonical = if data_on_right {
        Pred {
            lhs: selector,
            op,
            rhs: Operand::Data(data),
        }
    } else if let Some(flipped) = op.flip() {
        Pred {
            lhs: selector,
            op: flipped,
            rhs: Operand::Data(data),
        }
    } else {
        // `match`/`!match` cannot be flipped; the literal stays on the left
        // and the selector is validated as-is.
        Pred {
            lhs: Operand::Data(data),
            op,
            rhs: selector,
        }
    };
    let (selector, op, data) = match (&canonical.lhs, &canonical.rhs) {
        (sel, Operand::Data(d)) => (sel, canonical.op, d),
        (Operand::Data(d), sel) => (sel, canonical.op, d),
        _ => unreachable!("canonical form always has one literal operand"),
    };
    validate_selector(selector, op, data)?;
    Ok(canonical)
}

fn validate_selector(selector: &Operand, op: RelOp, data: &Data) -> Result<(), NormalizeError> {
    match selector {
        Operand::Field(_) => Ok(()),
        Operand::TypeOf(ty) => {
            if compatible(ty, op, data) {
                Ok(())
            } else {
                IncompatibleOperandSnafu {
                    op,
                    operand: selector.to_string(),
                }
                .fail()
            }
        }
        Operand::Meta(kind) => {
            let ok = match kind {
                MetaKind::Schema => {
                    matches!(op, RelOp::Eq | RelOp::Ne | RelOp::Match | RelOp::NotMatch)
                        && matches!(data, Data::String(_))
                }
                MetaKind::SchemaId => {
                    matches!(op, RelOp::Eq | RelOp::Ne)
                        && matches!(data, Data::Unsigned(_) | Data::Integer(_))
                }
                MetaKind::ImportTime => matches!(data, Data::Time(_)),
                MetaKind::Internal => {
                    matches!(op, RelOp::Eq | RelOp::Ne) && matches!(data, Data::Bool(_))
                }
            };
            if ok {
                Ok(())
            } else {
                IncompatibleOperandSnafu {
                    op,
                    operand: selector.to_string(),
                }
                .fail()
            }
        }
        Operand::Data(_) => unreachable!("selector is never a literal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{Type, TypeKind};

    fn field_eq(name: &str, v: i64) -> Expr {
        Expr::pred(
            Operand::Field(name.into()),
            RelOp::Eq,
            Operand::Data(Data::Integer(v)),
        )
    }

    #[test]
    fn flattens_nested_same_kind_connectives() {
        let e = Expr::Disj(vec![Expr::Disj(vec![field_eq("a", 1), field_eq("b", 2)])]);
        let got = normalize_and_validate(e).unwrap();
        assert_eq!(got, Expr::Disj(vec![field_eq("a", 1), field_eq("b", 2)]));
    }

    #[test]
    fn eliminates_none_children() {
        let e = Expr::Conj(vec![field_eq("a", 1), Expr::None]);
        let got = normalize_and_validate(e).unwrap();
        assert_eq!(got, field_eq("a", 1));
    }

    #[test]
    fn empty_conjunction_is_trivially_true() {
        let got = normalize_and_validate(Expr::Conj(vec![])).unwrap();
        assert!(got.is_trivially_true());
    }

    #[test]
    fn empty_disjunction_is_none() {
        let got = normalize_and_validate(Expr::Disj(vec![])).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn de_morgan_pushes_negation_to_predicates() {
        let e = Expr::Neg(Box::new(Expr::Conj(vec![field_eq("a", 1), field_eq("b", 2)])));
        let got = normalize_and_validate(e).unwrap();
        assert_eq!(
            got,
            Expr::Disj(vec![
                Expr::Neg(Box::new(field_eq("a", 1))),
                Expr::Neg(Box::new(field_eq("b", 2)))
            ])
        );
    }

    #[test]
    fn negated_predicate_is_not_folded_into_its_operator() {
        let e = Expr::Neg(Box::new(field_eq("a", 1)));
        let got = normalize_and_validate(e).unwrap();
        assert_eq!(got, Expr::Neg(Box::new(field_eq("a", 1))));
    }

    #[test]
    fn double_negation_cancels() {
        let e = Expr::Neg(Box::new(Expr::Neg(Box::new(field_eq("a", 1)))));
        assert_eq!(normalize_and_validate(e).unwrap(), field_eq("a", 1));
    }

    #[test]
    fn canonicalizes_data_to_the_right() {
        let e = Expr::pred(
            Operand::Data(Data::Integer(1)),
            RelOp::Lt,
            Operand::Field("a".into()),
        );
        let got = normalize_and_validate(e).unwrap();
        assert_eq!(got, field_eq_op("a", RelOp::Gt, 1));
    }

    fn field_eq_op(name: &str, op: RelOp, v: i64) -> Expr {
        Expr::pred(Operand::Field(name.into()), op, Operand::Data(Data::Integer(v)))
    }

    #[test]
    fn rejects_two_literal_operands() {
        let e = Expr::pred(
            Operand::Data(Data::Integer(1)),
            RelOp::Eq,
            Operand::Data(Data::Integer(1)),
        );
        assert!(normalize_and_validate(e).is_err());
    }

    #[test]
    fn rejects_incompatible_type_extractor() {
        let e = Expr::pred(
            Operand::TypeOf(Type::new(TypeKind::Bool)),
            RelOp::Lt,
            Operand::Data(Data::Bool(true)),
        );
        assert!(normalize_and_validate(e).is_err());
    }

    #[test]
    fn is_idempotent() {
        let e = Expr::Conj(vec![
            Expr::Disj(vec![field_eq("a", 1), field_eq("b", 1)]),
            Expr::Neg(Box::new(field_eq("c", 2))),
        ]);
        let once = normalize_and_validate(e).unwrap();
        let twice = normalize_and_validate(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}
