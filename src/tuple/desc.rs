//! Tuple descriptors (table schemas).

use std::fmt;

use super::Type;

/// One column of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TdItem {
    pub field_type: Type,
    pub name: Option<String>,
}

/// Schema of a table: an ordered list of typed, optionally named columns.
///
/// Two descriptors are equal when their types and names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Create a schema with named columns.
    ///
    /// # Panics
    /// Panics if `types` is empty or `names.len() != types.len()`.
    pub fn new(types: Vec<Type>, names: Vec<String>) -> Self {
        assert!(!types.is_empty(), "a schema needs at least one column");
        assert_eq!(types.len(), names.len(), "one name per column");
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, name)| TdItem {
                field_type,
                name: Some(name),
            })
            .collect();
        Self { items }
    }

    /// Create a schema with anonymous columns.
    ///
    /// # Panics
    /// Panics if `types` is empty.
    pub fn with_types(types: Vec<Type>) -> Self {
        assert!(!types.is_empty(), "a schema needs at least one column");
        let items = types
            .into_iter()
            .map(|field_type| TdItem {
                field_type,
                name: None,
            })
            .collect();
        Self { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> Option<Type> {
        self.items.get(i).map(|item| item.field_type)
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items.get(i).and_then(|item| item.name.as_deref())
    }

    /// Index of the first column with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
    }

    /// Width in bytes of one encoded tuple of this schema.
    pub fn byte_size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        self.items.iter().map(|item| item.field_type)
    }

    pub fn items(&self) -> &[TdItem] {
        &self.items
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &item.name {
                Some(name) => write!(f, "{}({})", item.field_type, name)?,
                None => write!(f, "{}", item.field_type)?,
            }
        }
        Ok(())
    }
}
