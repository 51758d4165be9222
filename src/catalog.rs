//! Catalog - the registry of tables.
//!
//! The [`Catalog`] maps table ids to their heap files and schemas, and
//! table names to ids. The buffer pool consults it to find the file behind
//! a page on every cache miss.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::common::{Error, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::{TupleDesc, Type};

/// One registered table.
#[derive(Debug, Clone)]
struct Table {
    file: Arc<HeapFile>,
    name: String,
    primary_key: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<TableId, Table>,
    by_name: HashMap<String, TableId>,
}

/// Registry of the tables a buffer pool can serve.
///
/// # Thread Safety
/// Lookups take a shared lock and registrations an exclusive one, so the
/// catalog can be shared behind an `Arc` with the pool.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`.
    ///
    /// A table already registered with the same name or the same id is
    /// replaced.
    pub fn add_table(&self, file: Arc<HeapFile>, name: impl Into<String>, primary_key: Option<String>) {
        let name = name.into();
        let table_id = file.id();
        let mut tables = self.tables.write();

        if let Some(old) = tables.by_name.insert(name.clone(), table_id) {
            if old != table_id {
                tables.by_id.remove(&old);
            }
        }
        if let Some(old) = tables.by_id.insert(
            table_id,
            Table {
                file,
                name: name.clone(),
                primary_key,
            },
        ) {
            if old.name != name {
                tables.by_name.remove(&old.name);
            }
        }
        debug!(%table_id, %name, "table registered");
    }

    /// Heap file and schema of a table.
    ///
    /// # Errors
    /// `Error::TableNotFound` for an unknown id.
    pub fn resolve_table(&self, table_id: TableId) -> Result<(Arc<HeapFile>, Arc<TupleDesc>)> {
        let file = self.heap_file(table_id)?;
        let desc = Arc::clone(file.tuple_desc());
        Ok((file, desc))
    }

    /// Id of the table registered under `name`.
    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::TableNameNotFound(name.to_string()))
    }

    pub fn heap_file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.with_table(table_id, |table| Arc::clone(&table.file))
    }

    pub fn tuple_desc(&self, table_id: TableId) -> Result<Arc<TupleDesc>> {
        self.with_table(table_id, |table| Arc::clone(table.file.tuple_desc()))
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.with_table(table_id, |table| table.name.clone())
    }

    /// Name of the primary key column, if the table declared one.
    pub fn primary_key(&self, table_id: TableId) -> Result<Option<String>> {
        self.with_table(table_id, |table| table.primary_key.clone())
    }

    /// Ids of every registered table, in no particular order.
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().by_id.keys().copied().collect()
    }

    /// Forget every table.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }

    /// Register every table described in a catalog file.
    ///
    /// Each non-blank line reads `name (field type [pk], field type, ...)`
    /// with types `int` or `string`. Table `name` is stored in `name.dat`
    /// next to the catalog file, which is created if missing.
    ///
    /// Returns the ids of the loaded tables in file order.
    ///
    /// # Errors
    /// `Error::Schema` for a malformed line, unknown type or unknown
    /// annotation, and I/O errors from reading the catalog or opening a
    /// table file. Tables on earlier lines stay registered.
    pub fn load_schema<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TableId>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let base = fs::canonicalize(path)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut loaded = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = parse_entry(line).map_err(|reason| Error::Schema {
                line: idx + 1,
                reason,
            })?;

            let file = HeapFile::open_or_create(base.join(format!("{}.dat", entry.name)), entry.desc)?;
            let table_id = file.id();
            info!(%table_id, name = %entry.name, schema = %file.tuple_desc(), "added table");
            self.add_table(Arc::new(file), entry.name, entry.primary_key);
            loaded.push(table_id);
        }
        Ok(loaded)
    }

    fn with_table<T>(&self, table_id: TableId, f: impl FnOnce(&Table) -> T) -> Result<T> {
        self.tables
            .read()
            .by_id
            .get(&table_id)
            .map(f)
            .ok_or(Error::TableNotFound(table_id))
    }
}

/// One parsed line of a catalog file.
struct SchemaEntry {
    name: String,
    desc: TupleDesc,
    primary_key: Option<String>,
}

fn parse_entry(line: &str) -> std::result::Result<SchemaEntry, String> {
    let (name, rest) = line
        .split_once('(')
        .ok_or_else(|| "expected '(' after the table name".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err("missing table name".to_string());
    }
    let (fields, _) = rest
        .split_once(')')
        .ok_or_else(|| "missing closing ')'".to_string())?;

    let mut types = Vec::new();
    let mut names = Vec::new();
    let mut primary_key = None;
    for field in fields.split(',') {
        let words: Vec<&str> = field.split_whitespace().collect();
        match words.as_slice() {
            [field_name, type_name, annotation @ ..] if annotation.len() <= 1 => {
                let field_type = Type::from_name(type_name)
                    .ok_or_else(|| format!("unknown type '{}'", type_name))?;
                if let Some(&annotation) = annotation.first() {
                    if annotation != "pk" {
                        return Err(format!("unknown annotation '{}'", annotation));
                    }
                    primary_key = Some(field_name.to_string());
                }
                types.push(field_type);
                names.push(field_name.to_string());
            }
            _ => return Err(format!("expected 'name type [pk]', got '{}'", field.trim())),
        }
    }

    Ok(SchemaEntry {
        name: name.to_string(),
        desc: TupleDesc::new(types, names),
        primary_key,
    })
}
