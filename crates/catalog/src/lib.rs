use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use ahash::RandomState;
use common::{Config, DbError, DbResult, TableId, TdItem, TupleDesc};
use hashbrown::HashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use storage::HeapFile;
use types::Type;

type Map<K, V> = HashMap<K, V, RandomState>;

/// Registry of the tables known to the engine: name, schema and backing file.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    tables: Map<TableId, TableMeta>,
    table_name_index: Map<String, TableId>,
}

/// Metadata describing a registered table.
#[derive(Clone, Debug)]
pub struct TableMeta {
    pub id: TableId,
    pub name: String,
    pub file: Arc<HeapFile>,
    pub primary_key: Option<String>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` under `name`. An existing table with the same name or
    /// the same id is replaced.
    pub fn add_table(
        &mut self,
        file: Arc<HeapFile>,
        name: &str,
        primary_key: Option<String>,
    ) -> TableId {
        let id = file.id();
        if let Some(previous) = self.table_name_index.remove(name) {
            self.tables.remove(&previous);
        }
        if let Some(previous) = self.tables.remove(&id) {
            self.table_name_index.remove(&previous.name);
        }
        debug!("registered table '{name}' as {}", id.0);
        self.table_name_index.insert(name.to_string(), id);
        self.tables.insert(
            id,
            TableMeta {
                id,
                name: name.to_string(),
                file,
                primary_key,
            },
        );
        id
    }

    pub fn table_id(&self, name: &str) -> DbResult<TableId> {
        self.table_name_index
            .get(name)
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    /// Returns an immutable reference to a table by identifier.
    pub fn table_by_id(&self, id: TableId) -> DbResult<&TableMeta> {
        self.tables
            .get(&id)
            .ok_or_else(|| DbError::Catalog(format!("unknown table id {}", id.0)))
    }

    pub fn tuple_desc(&self, id: TableId) -> DbResult<Arc<TupleDesc>> {
        Ok(self.table_by_id(id)?.file.tuple_desc().clone())
    }

    pub fn file(&self, id: TableId) -> DbResult<Arc<HeapFile>> {
        Ok(self.table_by_id(id)?.file.clone())
    }

    pub fn table_name(&self, id: TableId) -> DbResult<&str> {
        Ok(&self.table_by_id(id)?.name)
    }

    pub fn primary_key(&self, id: TableId) -> DbResult<Option<&str>> {
        Ok(self.table_by_id(id)?.primary_key.as_deref())
    }

    /// Identifiers of every registered table, in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<_> = self.tables.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Immutable iterator over all tables.
    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.values()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.table_name_index.clear();
    }

    /// Load table definitions from a JSON schema document.
    ///
    /// Relative data file paths are resolved against `config.data_dir`. Missing
    /// files are created empty.
    pub fn load_schema(&mut self, path: &Path, config: &Config) -> DbResult<Vec<TableId>> {
        let data = fs::read_to_string(path)?;
        let schema: SchemaFile = serde_json::from_str(&data)
            .map_err(|err| DbError::Catalog(format!("invalid schema file: {err}")))?;

        let mut ids = Vec::with_capacity(schema.tables.len());
        for table in schema.tables {
            let desc = Arc::new(table.tuple_desc()?);
            if let Some(pk) = &table.primary_key {
                desc.field_index(pk.as_str()).map_err(|_| {
                    DbError::Catalog(format!(
                        "primary key '{pk}' is not a column of '{}'",
                        table.name
                    ))
                })?;
            }
            let file_path = config.data_dir.join(table.data_file());
            let file = if file_path.exists() {
                HeapFile::open(&file_path, desc, config.page_size)?
            } else {
                HeapFile::create(&file_path, desc, config.page_size)?
            };
            ids.push(self.add_table(Arc::new(file), &table.name, table.primary_key));
        }
        info!("loaded {} tables from {}", ids.len(), path.display());
        Ok(ids)
    }

    /// Persist every table definition as pretty JSON.
    pub fn save_schema(&self, path: &Path) -> DbResult<()> {
        let mut tables: Vec<TableDef> = self
            .tables()
            .map(|meta| TableDef {
                name: meta.name.clone(),
                file: Some(meta.file.path().to_path_buf()),
                columns: meta
                    .file
                    .tuple_desc()
                    .items()
                    .map(|item| ColumnDef {
                        name: item.name.clone(),
                        ty: item.ty,
                    })
                    .collect(),
                primary_key: meta.primary_key.clone(),
            })
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        let data = serde_json::to_string_pretty(&SchemaFile { tables })
            .map_err(|err| DbError::Catalog(format!("serialize failed: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }
}

/// On-disk schema document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaFile {
    pub tables: Vec<TableDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub columns: Vec<ColumnDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl TableDef {
    fn data_file(&self) -> PathBuf {
        self.file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.dat", self.name)))
    }

    fn tuple_desc(&self) -> DbResult<TupleDesc> {
        let items = self
            .columns
            .iter()
            .map(|col| TdItem {
                ty: col.ty,
                name: col.name.clone(),
            })
            .collect();
        TupleDesc::from_items(items)
            .map_err(|err| DbError::Catalog(format!("table '{}': {err}", self.name)))
    }
}

/// Describes one column of a table definition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: Type,
}
