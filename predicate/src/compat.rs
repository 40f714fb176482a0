//! Type/operator/literal compatibility checks, and exact evaluation of
//! literal-vs-literal predicates (used for meta-extractors, where both
//! sides are known at normalization time).

use std::cmp::Ordering;
use std::net::IpAddr;

use schema::{Data, Type, TypeKind};

use crate::relop::RelOp;

/// Whether `op` applied between a leaf of type `ty` and the literal `data`
/// is a meaningful predicate.
///
/// This is a syntactic check performed before a field's type is known to be
/// resolvable (or, once resolved, before a sketch lookup is attempted) — it
/// rejects predicates that could never be satisfied for type reasons, such
/// as comparing a `bool` field with `<`.
pub fn compatible(ty: &Type, op: RelOp, data: &Data) -> bool {
    match ty.kind() {
        // The only predicate ever built over the nameless `none` type is
        // the `trivially_true` sentinel (`:none == null`); anything else
        // comparing against a field of this type is meaningless.
        TypeKind::None => matches!(op, RelOp::Eq | RelOp::Ne) && matches!(data, Data::Null),
        TypeKind::Bool => matches!(op, RelOp::Eq | RelOp::Ne) && matches!(data, Data::Bool(_)),
        TypeKind::Integer => {
            is_numeric_op(op) && matches!(data, Data::Integer(_) | Data::Unsigned(_))
        }
        TypeKind::Unsigned => {
            is_numeric_op(op) && matches!(data, Data::Integer(_) | Data::Unsigned(_))
        }
        TypeKind::Double => {
            is_numeric_op(op)
                && matches!(data, Data::Double(_) | Data::Integer(_) | Data::Unsigned(_))
        }
        TypeKind::Duration => is_numeric_op(op) && matches!(data, Data::Duration(_)),
        TypeKind::Time => is_numeric_op(op) && matches!(data, Data::Time(_)),
        TypeKind::String => match op {
            RelOp::Eq | RelOp::Ne | RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge => {
                matches!(data, Data::String(_))
            }
            RelOp::Match | RelOp::NotMatch => matches!(data, Data::String(_)),
            RelOp::In | RelOp::NotIn => matches!(data, Data::List(_) | Data::String(_)),
            RelOp::Ni | RelOp::NotNi => matches!(data, Data::String(_)),
        },
        TypeKind::Enum(_) => {
            matches!(op, RelOp::Eq | RelOp::Ne | RelOp::In | RelOp::NotIn)
                && matches!(data, Data::String(_))
        }
        TypeKind::Ip => match op {
            RelOp::Eq | RelOp::Ne => matches!(data, Data::Ip(_)),
            RelOp::In | RelOp::NotIn => matches!(data, Data::Subnet(_)),
            _ => false,
        },
        TypeKind::Subnet => match op {
            RelOp::Eq | RelOp::Ne => matches!(data, Data::Subnet(_)),
            RelOp::Ni | RelOp::NotNi => matches!(data, Data::Ip(_)),
            _ => false,
        },
        TypeKind::List(elem) => match op {
            RelOp::In | RelOp::NotIn => compatible(elem, RelOp::Eq, data),
            RelOp::Eq | RelOp::Ne => matches!(data, Data::List(_)),
            _ => false,
        },
        TypeKind::Map(_, _) => false,
        TypeKind::Record(_) => false,
        TypeKind::Alias(inner) => compatible(inner, op, data),
    }
}

fn is_numeric_op(op: RelOp) -> bool {
    matches!(
        op,
        RelOp::Eq | RelOp::Ne | RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge
    )
}

/// Attempts a total ordering between two literals of possibly-differing
/// numeric variants.
fn cmp_data(a: &Data, b: &Data) -> Option<Ordering> {
    match (a, b) {
        (Data::Null, Data::Null) => Some(Ordering::Equal),
        (Data::Bool(a), Data::Bool(b)) => Some(a.cmp(b)),
        (Data::Integer(a), Data::Integer(b)) => Some(a.cmp(b)),
        (Data::Unsigned(a), Data::Unsigned(b)) => Some(a.cmp(b)),
        (Data::Integer(a), Data::Unsigned(b)) => Some((*a).cmp(&(*b as i64))),
        (Data::Unsigned(a), Data::Integer(b)) => Some((*a as i64).cmp(b)),
        (Data::Double(a), Data::Double(b)) => a.partial_cmp(b),
        (Data::Double(a), Data::Integer(b)) => a.0.partial_cmp(&(*b as f64)),
        (Data::Double(a), Data::Unsigned(b)) => a.0.partial_cmp(&(*b as f64)),
        (Data::Integer(a), Data::Double(b)) => (*a as f64).partial_cmp(&b.0),
        (Data::Unsigned(a), Data::Double(b)) => (*a as f64).partial_cmp(&b.0),
        (Data::Duration(a), Data::Duration(b)) => Some(a.cmp(b)),
        (Data::Time(a), Data::Time(b)) => Some(a.cmp(b)),
        (Data::String(a), Data::String(b)) => Some(a.cmp(b)),
        (Data::Ip(a), Data::Ip(b)) => Some(cmp_ip(a, b)),
        (Data::Port(a), Data::Port(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn cmp_ip(a: &IpAddr, b: &IpAddr) -> Ordering {
    match (a, b) {
        (IpAddr::V4(a), IpAddr::V4(b)) => a.cmp(b),
        (IpAddr::V6(a), IpAddr::V6(b)) => a.cmp(b),
        (IpAddr::V4(_), IpAddr::V6(_)) => Ordering::Less,
        (IpAddr::V6(_), IpAddr::V4(_)) => Ordering::Greater,
    }
}

fn data_in_list(needle: &Data, list: &[Data]) -> bool {
    list.iter().any(|item| item == needle)
}

/// Evaluates a predicate whose both sides are known literals, e.g. a
/// meta-extractor predicate against a partition's own schema name or import
/// time. Returns `false` for operator/operand combinations that aren't
/// comparable (rather than failing), since an incomparable predicate is
/// simply never true.
pub fn evaluate(lhs: &Data, op: RelOp, rhs: &Data) -> bool {
    match op {
        RelOp::Eq => lhs == rhs,
        RelOp::Ne => lhs != rhs,
        RelOp::Lt => matches!(cmp_data(lhs, rhs), Some(Ordering::Less)),
        RelOp::Le => matches!(cmp_data(lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        RelOp::Gt => matches!(cmp_data(lhs, rhs), Some(Ordering::Greater)),
        RelOp::Ge => matches!(
            cmp_data(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        RelOp::In => match rhs {
            Data::List(items) => data_in_list(lhs, items),
            Data::Subnet(subnet) => match lhs {
                Data::Ip(ip) => subnet.contains(ip),
                _ => false,
            },
            _ => false,
        },
        RelOp::NotIn => !evaluate(lhs, RelOp::In, rhs),
        RelOp::Ni => evaluate(rhs, RelOp::In, lhs),
        RelOp::NotNi => !evaluate(rhs, RelOp::In, lhs),
        RelOp::Match | RelOp::NotMatch => {
            let (Data::String(s), Data::String(pattern)) = (lhs, rhs) else {
                return false;
            };
            let matched = regex::Regex::new(pattern)
                .map(|re| re.is_match(s))
                .unwrap_or(false);
            if op == RelOp::Match {
                matched
            } else {
                !matched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_unsigned_cross_compares() {
        assert!(evaluate(&Data::Integer(3), RelOp::Lt, &Data::Unsigned(4)));
    }

    #[test]
    fn subnet_in_is_mirrored_by_ni() {
        let subnet = Data::Subnet(schema::Subnet::new("10.0.0.0".parse().unwrap(), 8));
        let ip = Data::Ip("10.1.2.3".parse().unwrap());
        assert!(evaluate(&ip, RelOp::In, &subnet));
        assert!(evaluate(&subnet, RelOp::Ni, &ip));
    }

    #[test]
    fn compatible_accepts_the_trivially_true_sentinel_shape() {
        assert!(compatible(&Type::new(TypeKind::None), RelOp::Eq, &Data::Null));
    }

    #[test]
    fn compatible_rejects_ordering_on_bool() {
        assert!(!compatible(
            &Type::new(TypeKind::Bool),
            RelOp::Lt,
            &Data::Bool(true)
        ));
    }

    #[test]
    fn compatible_allows_ip_in_subnet() {
        let subnet = Data::Subnet(schema::Subnet::new("10.0.0.0".parse().unwrap(), 8));
        assert!(compatible(&Type::new(TypeKind::Ip), RelOp::In, &subnet));
    }

    #[test]
    fn match_evaluates_regex() {
        assert!(evaluate(
            &Data::String("hello.txt".into()),
            RelOp::Match,
            &Data::String(r"\.txt$".into())
        ));
    }
}
