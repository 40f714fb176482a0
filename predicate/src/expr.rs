//! The expression tree: predicates combined with conjunction, disjunction
//! and negation.

use std::fmt;

use schema::{Data, Type, TypeKind};

use crate::operand::{Operand, Pred};
use crate::relop::RelOp;

/// A query expression.
///
/// Canonical (normalized) expressions never contain an empty `Conj`/`Disj`,
/// a singleton `Conj`/`Disj`, nested connectives of the same kind, or a
/// `None` nested inside a connective — see [`crate::normalize_and_validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A single relational predicate.
    Pred(Pred),
    /// The conjunction (logical AND) of its children.
    Conj(Vec<Expr>),
    /// The disjunction (logical OR) of its children.
    Disj(Vec<Expr>),
    /// The negation of its child.
    Neg(Box<Expr>),
    /// The absence of a query, or an expression that normalized to the
    /// unsatisfiable predicate.
    None,
}

impl Expr {
    /// Builds a leaf predicate.
    pub fn pred(lhs: Operand, op: RelOp, rhs: Operand) -> Self {
        Self::Pred(Pred { lhs, op, rhs })
    }

    /// The sentinel used in place of an absent query: a predicate that is
    /// true for every event, regardless of schema.
    ///
    /// Represented as `:none != <unit>`... in practice we use an equality of
    /// the schema name meta-extractor against itself's type, which is always
    /// satisfiable; callers should treat `trivially_true()` purely as an
    /// opaque marker and not attempt to evaluate it directly against data.
    pub fn trivially_true() -> Self {
        Self::pred(
            Operand::TypeOf(Type::new(TypeKind::None)),
            RelOp::Eq,
            Operand::Data(Data::Null),
        )
    }

    /// Whether this expression is the [`Expr::trivially_true`] sentinel.
    pub fn is_trivially_true(&self) -> bool {
        matches!(
            self,
            Self::Pred(Pred {
                lhs: Operand::TypeOf(ty),
                op: RelOp::Eq,
                rhs: Operand::Data(Data::Null),
            }) if ty.kind() == &TypeKind::None
        )
    }

    /// Whether this expression is the unsatisfiable sentinel.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Negates this expression, folding double negation.
    pub fn negated(self) -> Self {
        match self {
            Self::Neg(inner) => *inner,
            other => Self::Neg(Box::new(other)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pred(p) => write!(f, "{p}"),
            Self::Conj(children) => {
                write!(f, "(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Self::Disj(children) => {
                write!(f, "(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " || ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Self::Neg(inner) => write!(f, "!{inner}"),
            Self::None => write!(f, "<none>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trivially_true_round_trips() {
        let e = Expr::trivially_true();
        assert!(e.is_trivially_true());
    }

    #[test]
    fn negated_folds_double_negation() {
        let p = Expr::pred(
            Operand::Field("a".into()),
            RelOp::Eq,
            Operand::Data(Data::Integer(1)),
        );
        assert_eq!(p.clone().negated().negated(), p);
    }
}
