//! Fixture persistence for the memory store

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::format::Format;
use crate::value::{AttributeValue, Attributes, RecordKey};

use super::{JoinRow, MemoryStore, ModelDefinition, Schema};

/// Schema plus stored rows, as written to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub models: Vec<ModelDefinition>,

    /// Rows per class name
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Attributes>>,

    /// Join rows per join table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub joins: BTreeMap<String, Vec<JoinRow>>,
}

impl MemoryStore {
    /// Build a store holding the fixture's rows; the journal starts empty
    pub fn from_fixture(fixture: Fixture) -> StoreResult<Self> {
        let schema = Schema::from_models(fixture.models)?;
        let mut store = MemoryStore::new(schema)?;

        for (class_name, rows) in fixture.records {
            for row in rows {
                store.restore_row(&class_name, row)?;
            }
        }
        for (join_table, rows) in fixture.joins {
            store.tables.joins.entry(join_table).or_default().extend(rows);
        }
        Ok(store)
    }

    pub fn to_fixture(&self) -> Fixture {
        let records = self
            .tables
            .rows
            .iter()
            .map(|(class_name, table)| (class_name.clone(), table.values().cloned().collect()))
            .collect();
        let joins = self
            .tables
            .joins
            .iter()
            .map(|(join_table, rows)| (join_table.clone(), rows.iter().cloned().collect()))
            .collect();

        Fixture {
            models: self.schema.models().cloned().collect(),
            records,
            joins,
        }
    }

    /// Load a fixture file; the format comes from the path suffix
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path).map_err(storage)?;
        let body = fs::read_to_string(path)
            .map_err(|e| StoreError::Storage(format!("{}: {}", path.display(), e)))?;
        let fixture: Fixture = format.decode_value(&body).map_err(storage)?;

        let store = Self::from_fixture(fixture)?;
        info!("Loaded fixture {}", path.display());
        Ok(store)
    }

    /// Write the current state as a fixture file
    pub fn dump(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let format = Format::from_path(path).map_err(storage)?;
        let body = format.encode_value(&self.to_fixture()).map_err(storage)?;
        fs::write(path, body).map_err(|e| StoreError::Storage(format!("{}: {}", path.display(), e)))?;

        info!("Wrote fixture {}", path.display());
        Ok(())
    }

    /// Put a stored row back as-is, without validation or journaling
    fn restore_row(&mut self, class_name: &str, mut row: Attributes) -> StoreResult<()> {
        let model = self.schema.get(class_name)?;
        if let Some(column) = row.keys().find(|c| !model.has_column(c)) {
            return Err(StoreError::UnknownAttribute {
                class_name: class_name.to_string(),
                attribute: column.clone(),
            });
        }

        let value = row
            .get(&model.primary_key)
            .filter(|v| !v.is_blank())
            .ok_or_else(|| StoreError::Storage(format!("{} row without {}", class_name, model.primary_key)))?;
        let key = RecordKey::from_value(value)?;
        Self::check_key_kind(model, &key)?;

        for (column, value) in row.iter_mut() {
            *value = model.cast(column, value)?;
        }
        for column in model.column_names() {
            row.entry(column.to_string()).or_insert(AttributeValue::Null);
        }

        let table = self.tables.rows.entry(class_name.to_string()).or_default();
        if table.contains_key(&key) {
            return Err(StoreError::Constraint(format!("duplicate key {} {}", class_name, key)));
        }
        table.insert(key.clone(), row);
        self.bump_sequence(class_name, &key);
        Ok(())
    }
}

fn storage(error: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(error.to_string())
}
