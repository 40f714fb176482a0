//! The type system: a tagged schema node carrying an optional name and
//! string attributes, with cheap `Clone` via reference counting.

use std::{
    collections::BTreeMap,
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A single field of a [`TypeKind::Record`], in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordField {
    /// The field's own (unqualified) name.
    pub name: String,
    /// The field's type.
    pub ty: Type,
}

impl RecordField {
    /// Creates a new record field.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The structural content of a [`Type`], independent of its name and
/// attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The unsatisfiable/absent type.
    None,
    /// A boolean.
    Bool,
    /// A signed integer.
    Integer,
    /// An unsigned integer.
    Unsigned,
    /// A floating point number.
    Double,
    /// A duration.
    Duration,
    /// A point in time.
    Time,
    /// A UTF-8 string.
    String,
    /// An IP address.
    Ip,
    /// An IP subnet.
    Subnet,
    /// An enumeration, given by its ordered variant names.
    Enum(Vec<String>),
    /// A homogeneous list.
    List(Type),
    /// An associative map.
    Map(Type, Type),
    /// A record, i.e. an ordered set of named fields.
    Record(Vec<RecordField>),
    /// A named alias for another type.
    Alias(Type),
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct TypeData {
    kind: TypeKind,
    name: String,
    attributes: BTreeMap<String, String>,
}

/// A tagged schema node.
///
/// `Type` is a thin, reference-counted handle so that cloning a type -
/// which happens constantly while walking expressions and schemas - never
/// copies the underlying structure.
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Type {
    /// Creates a nameless, attribute-less type of the given structural kind.
    pub fn new(kind: TypeKind) -> Self {
        Self(Arc::new(TypeData {
            kind,
            name: String::new(),
            attributes: BTreeMap::new(),
        }))
    }

    /// Creates a named type of the given structural kind.
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        Self(Arc::new(TypeData {
            kind,
            name: name.into(),
            attributes: BTreeMap::new(),
        }))
    }

    /// Returns a copy of this type with an added (or replaced) attribute.
    #[must_use]
    pub fn with_attribute(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut data = (*self.0).clone_data();
        data.attributes.insert(key.into(), value.into());
        Self(Arc::new(data))
    }

    /// The type's structural kind.
    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    /// The type's name, or the empty string if nameless.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Whether this type carries no name (the "nameless" type referenced by
    /// `TypeExtractor` resolution).
    pub fn is_nameless(&self) -> bool {
        self.0.name.is_empty()
    }

    /// Looks up a string attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.0.attributes.get(key).map(String::as_str)
    }

    /// Returns the record fields if this is a [`TypeKind::Record`] (or an
    /// alias thereof), else `None`.
    pub fn as_record(&self) -> Option<&[RecordField]> {
        match self.kind() {
            TypeKind::Record(fields) => Some(fields),
            TypeKind::Alias(inner) => inner.as_record(),
            _ => None,
        }
    }

    /// Returns a version of this type with every name and attribute
    /// stripped, recursively, and aliases unwrapped. Two types are
    /// [`congruent`] iff their normalized forms are equal.
    pub fn normalized(&self) -> Type {
        match self.kind() {
            TypeKind::Alias(inner) => inner.normalized(),
            TypeKind::List(inner) => Type::new(TypeKind::List(inner.normalized())),
            TypeKind::Map(k, v) => Type::new(TypeKind::Map(k.normalized(), v.normalized())),
            TypeKind::Record(fields) => Type::new(TypeKind::Record(
                fields
                    .iter()
                    .map(|f| RecordField::new(f.name.clone(), f.ty.normalized()))
                    .collect(),
            )),
            other => Type::new(other.clone()),
        }
    }

    /// A stable hash of this type's full content (name, attributes, and
    /// structure), used to test schema identity without string comparison.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }

    /// Depth-first iteration over the leaves of a record type:
    /// `(dotted qualified name, leaf type)` pairs. Non-record types yield a
    /// single leaf with an empty qualified name.
    pub fn leaves(&self) -> Vec<(String, Type)> {
        let mut out = Vec::new();
        self.collect_leaves(String::new(), &mut out);
        out
    }

    fn collect_leaves(&self, prefix: String, out: &mut Vec<(String, Type)>) {
        match self.kind() {
            TypeKind::Record(fields) => {
                for field in fields {
                    let qualified = if prefix.is_empty() {
                        field.name.clone()
                    } else {
                        format!("{prefix}.{}", field.name)
                    };
                    field.ty.collect_leaves(qualified, out);
                }
            }
            TypeKind::Alias(inner) => inner.collect_leaves(prefix, out),
            _ => out.push((prefix, self.clone())),
        }
    }
}

impl TypeData {
    fn clone_data(&self) -> TypeData {
        TypeData {
            kind: self.kind.clone(),
            name: self.name.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// Two types are congruent iff they are structurally equal, ignoring names
/// and attributes at every level.
pub fn congruent(a: &Type, b: &Type) -> bool {
    a.normalized() == b.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congruent_ignores_names_and_attributes() {
        let a = Type::named(TypeKind::String, "ip_string").with_attribute("index", "hash");
        let b = Type::new(TypeKind::String);
        assert!(congruent(&a, &b));
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_is_stable_and_name_sensitive() {
        let a = Type::named(TypeKind::String, "foo");
        let b = Type::named(TypeKind::String, "foo");
        let c = Type::named(TypeKind::String, "bar");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn leaves_are_depth_first_and_qualified() {
        let inner = Type::named(
            TypeKind::Record(vec![
                RecordField::new("ip", Type::new(TypeKind::Ip)),
                RecordField::new("port", Type::new(TypeKind::Unsigned)),
            ]),
            "endpoint",
        );
        let top = Type::named(
            TypeKind::Record(vec![
                RecordField::new("src", inner.clone()),
                RecordField::new("ts", Type::new(TypeKind::Time)),
            ]),
            "connection",
        );
        let leaves = top.leaves();
        let names: Vec<_> = leaves.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["src.ip", "src.port", "ts"]);
    }

    #[test]
    fn alias_is_transparent_to_leaves_and_normalization() {
        let aliased = Type::named(TypeKind::Alias(Type::new(TypeKind::String)), "hostname");
        assert!(congruent(&aliased, &Type::new(TypeKind::String)));
        assert_eq!(aliased.leaves().len(), 1);
    }
}
