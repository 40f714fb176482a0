//! Predicate operands.

use std::fmt;

use schema::{Data, Type};

/// The kind of catalog-managed metadata a [`Operand::Meta`] selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetaKind {
    /// The name of the partition's schema.
    Schema,
    /// The schema's fingerprint, exposed as an opaque unsigned integer.
    SchemaId,
    /// The partition's import time.
    ImportTime,
    /// The `internal` flag on a schema or partition.
    Internal,
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schema => "#schema",
            Self::SchemaId => "#schema_id",
            Self::ImportTime => "#import_time",
            Self::Internal => "#internal",
        };
        f.write_str(s)
    }
}

/// One side of a [`crate::Pred`].
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A literal value.
    Data(Data),
    /// A dotted field path, resolved against a schema's leaves at lookup
    /// time.
    Field(String),
    /// The (leaf) type of a field, used once a `Field` operand has been
    /// generalized away during pruning.
    TypeOf(Type),
    /// Catalog-managed metadata, not stored in the event itself.
    Meta(MetaKind),
}

impl Operand {
    /// Returns the literal value if this operand is [`Operand::Data`].
    pub fn as_data(&self) -> Option<&Data> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Whether this operand is a literal.
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(d) => write!(f, "{d:?}"),
            Self::Field(name) => f.write_str(name),
            Self::TypeOf(ty) => write!(f, ":{}", type_extractor_name(ty)),
            Self::Meta(kind) => write!(f, "{kind}"),
        }
    }
}

fn type_extractor_name(ty: &Type) -> &'static str {
    use schema::TypeKind::*;
    match ty.kind() {
        None => "none",
        Bool => "bool",
        Integer => "int",
        Unsigned => "uint",
        Double => "double",
        Duration => "duration",
        Time => "time",
        String => "string",
        Ip => "ip",
        Subnet => "subnet",
        Enum(_) => "string",
        List(_) => "list",
        Map(_, _) => "map",
        Record(_) => "record",
        Alias(_) => "alias",
    }
}

/// A single relational predicate: `lhs op rhs`, exactly one side of which is
/// [`Operand::Data`].
#[derive(Clone, Debug, PartialEq)]
pub struct Pred {
    /// The left-hand operand.
    pub lhs: Operand,
    /// The relational operator.
    pub op: crate::RelOp,
    /// The right-hand operand.
    pub rhs: Operand,
}

impl fmt::Display for Pred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}
