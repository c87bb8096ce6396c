//! Tuple schemas: ordered `(Type, optional name)` pairs.

use crate::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
};
use types::Type;

/// One schema position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdItem {
    pub ty: Type,
    pub name: Option<String>,
}

impl fmt::Display for TdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name.as_deref().unwrap_or("null"), self.ty)
    }
}

/// Schema of a tuple. Always holds at least one field.
///
/// Equality and hashing only look at the type sequence; names are labels and
/// may be absent or repeated.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<TdItem>", into = "Vec<TdItem>")]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Build a schema from parallel type and name sequences.
    pub fn try_new(types: Vec<Type>, names: Vec<Option<String>>) -> DbResult<Self> {
        if types.len() != names.len() {
            return Err(DbError::InvalidSchema(format!(
                "{} types but {} names",
                types.len(),
                names.len()
            )));
        }
        let items = types
            .into_iter()
            .zip(names)
            .map(|(ty, name)| TdItem { ty, name })
            .collect();
        Self::from_items(items)
    }

    /// Build a schema whose fields are all unnamed.
    pub fn from_types(types: Vec<Type>) -> DbResult<Self> {
        let names = vec![None; types.len()];
        Self::try_new(types, names)
    }

    pub fn from_items(items: Vec<TdItem>) -> DbResult<Self> {
        if items.is_empty() {
            return Err(DbError::InvalidSchema(
                "schema must contain at least one field".into(),
            ));
        }
        Ok(Self { items })
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, index: usize) -> DbResult<Type> {
        self.item(index).map(|item| item.ty)
    }

    pub fn field_name(&self, index: usize) -> DbResult<Option<&str>> {
        self.item(index).map(|item| item.name.as_deref())
    }

    /// Position of the first field carrying `name`.
    ///
    /// Unnamed fields never match, and looking up `None` always fails.
    pub fn field_index<'a>(&self, name: impl Into<Option<&'a str>>) -> DbResult<usize> {
        let name = name
            .into()
            .ok_or_else(|| DbError::FieldNotFound("null".into()))?;
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
            .ok_or_else(|| DbError::FieldNotFound(name.to_owned()))
    }

    /// Record length in bytes: the sum of every field's type length.
    pub fn byte_size(&self) -> usize {
        self.items.iter().map(|item| item.ty.len()).sum()
    }

    /// Concatenate `a`'s fields followed by `b`'s.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let items = a.items.iter().chain(&b.items).cloned().collect();
        TupleDesc { items }
    }

    pub fn items(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.items.iter().map(|item| item.ty)
    }

    fn item(&self, index: usize) -> DbResult<&TdItem> {
        self.items.get(index).ok_or(DbError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len() && self.types().eq(other.types())
    }
}

impl Eq for TupleDesc {}

impl Hash for TupleDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for ty in self.types() {
            ty.hash(state);
        }
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, item) in self.items.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<TdItem>> for TupleDesc {
    type Error = DbError;

    fn try_from(items: Vec<TdItem>) -> DbResult<Self> {
        Self::from_items(items)
    }
}

impl From<TupleDesc> for Vec<TdItem> {
    fn from(desc: TupleDesc) -> Self {
        desc.items
    }
}
