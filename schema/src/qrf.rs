//! Qualified record fields: the stable key under which a [`crate::Type`]'s
//! leaves are tracked in a synopsis.

use crate::Type;

/// Identifies a leaf field within a schema by its dotted path.
///
/// Used both as the sketch key inside a partition synopsis and as the
/// target of suffix matching when resolving a `FieldExtractor`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Qrf {
    /// The name of the schema (record type) this field belongs to.
    pub schema_name: String,
    /// The field's dotted path within the schema, e.g. `"src.ip"`.
    pub field_name: String,
    /// The field's leaf type.
    pub ty: Type,
}

impl Qrf {
    /// Creates a new qualified record field.
    pub fn new(schema_name: impl Into<String>, field_name: impl Into<String>, ty: Type) -> Self {
        Self {
            schema_name: schema_name.into(),
            field_name: field_name.into(),
            ty,
        }
    }
}
