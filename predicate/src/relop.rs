//! Relational operators.

use std::fmt;

/// A relational operator appearing in a [`crate::Pred`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`: the left operand is an element of the right.
    In,
    /// `!in`
    NotIn,
    /// `ni`: the left operand contains the right as an element (the mirror
    /// of [`RelOp::In`]).
    Ni,
    /// `!ni`
    NotNi,
    /// `match`: the left operand matches the right operand as a regex.
    Match,
    /// `!match`
    NotMatch,
}

impl RelOp {
    /// Returns the logical negation of this operator.
    pub fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::Ni => Self::NotNi,
            Self::NotNi => Self::Ni,
            Self::Match => Self::NotMatch,
            Self::NotMatch => Self::Match,
        }
    }

    /// Returns the operator to use when the two operands of a predicate are
    /// swapped, or `None` if the operator has no side-independent meaning
    /// (`match`/`!match` always interpret their right operand as a pattern,
    /// so they cannot be flipped).
    pub fn flip(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Eq),
            Self::Ne => Some(Self::Ne),
            Self::Lt => Some(Self::Gt),
            Self::Gt => Some(Self::Lt),
            Self::Le => Some(Self::Ge),
            Self::Ge => Some(Self::Le),
            Self::In => Some(Self::Ni),
            Self::Ni => Some(Self::In),
            Self::NotIn => Some(Self::NotNi),
            Self::NotNi => Some(Self::NotIn),
            Self::Match | Self::NotMatch => None,
        }
    }

    /// Whether this operator expresses an ordering comparison.
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "!in",
            Self::Ni => "ni",
            Self::NotNi => "!ni",
            Self::Match => "match",
            Self::NotMatch => "!match",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negate_is_involutive() {
        for op in [
            RelOp::Eq,
            RelOp::Ne,
            RelOp::Lt,
            RelOp::Le,
            RelOp::Gt,
            RelOp::Ge,
            RelOp::In,
            RelOp::NotIn,
            RelOp::Ni,
            RelOp::NotNi,
            RelOp::Match,
            RelOp::NotMatch,
        ] {
            assert_eq!(op.negate().negate(), op);
        }
    }

    #[test]
    fn match_does_not_flip() {
        assert_eq!(RelOp::Match.flip(), None);
        assert_eq!(RelOp::NotMatch.flip(), None);
    }
}
