//! In-memory record store with snapshot transactions
//!
//! Rows live in per-class tables keyed by primary key, `has_and_belongs_to_many`
//! pairs live in join tables. Every write is recorded in a journal so callers
//! can observe the order in which records were persisted. `begin` pushes a
//! snapshot of all tables; `rollback` restores it.

mod fixture;
mod record;
mod schema;

pub use fixture::Fixture;
pub use record::MemoryRecord;
pub use schema::{KeyKind, ModelDefinition, Schema};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{Persistable, RecordStore, Related, Transactional};
use crate::relationships::{AssociationDescriptor, AssociationKind};
use crate::value::{AttributeValue, Attributes, RecordKey};

use record::PendingLink;

/// Kind of write recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Insert,
    Update,
    /// Join row added for a `has_and_belongs_to_many` association
    Link,
}

/// One write, in the order it hit the tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub operation: WriteOperation,
    pub class_name: String,
    pub key: RecordKey,
}

/// Row of a join table, stored with its two sides in sorted order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JoinRow {
    pub left_class: String,
    pub left_key: RecordKey,
    pub right_class: String,
    pub right_key: RecordKey,
}

impl JoinRow {
    pub fn new(class_a: &str, key_a: &RecordKey, class_b: &str, key_b: &RecordKey) -> Self {
        let a = (class_a, key_a);
        let b = (class_b, key_b);
        let ((left_class, left_key), (right_class, right_key)) = if a <= b { (a, b) } else { (b, a) };
        Self {
            left_class: left_class.to_string(),
            left_key: left_key.clone(),
            right_class: right_class.to_string(),
            right_key: right_key.clone(),
        }
    }

    /// The side opposite to `(class_name, key)`, if this row contains it
    pub fn other_side(&self, class_name: &str, key: &RecordKey) -> Option<(&str, &RecordKey)> {
        if self.left_class == class_name && &self.left_key == key {
            Some((&self.right_class, &self.right_key))
        } else if self.right_class == class_name && &self.right_key == key {
            Some((&self.left_class, &self.left_key))
        } else {
            None
        }
    }
}

/// Everything a transaction snapshot has to restore
#[derive(Debug, Clone, Default)]
struct Tables {
    rows: BTreeMap<String, BTreeMap<RecordKey, Attributes>>,
    joins: BTreeMap<String, BTreeSet<JoinRow>>,
    sequences: BTreeMap<String, i64>,
    journal: Vec<JournalEntry>,
}

/// In-memory [`RecordStore`]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    schema: Schema,
    tables: Tables,
    snapshots: Vec<Tables>,
}

impl MemoryStore {
    pub fn new(schema: Schema) -> StoreResult<Self> {
        schema.validate()?;
        Ok(Self {
            schema,
            tables: Tables::default(),
            snapshots: Vec::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create and save a record from `attributes`
    pub fn insert(&mut self, class_name: &str, attributes: Attributes) -> StoreResult<MemoryRecord> {
        let mut record = self.instantiate(class_name)?;
        self.assign_attributes(&mut record, &attributes)?;
        self.save(&mut record)?;
        Ok(record)
    }

    /// Stored record by key
    pub fn get(&self, class_name: &str, key: &RecordKey) -> Option<MemoryRecord> {
        self.tables
            .rows
            .get(class_name)
            .and_then(|table| table.get(key))
            .map(|row| MemoryRecord::persisted(class_name, key.clone(), row.clone()))
    }

    /// All stored records of `class_name`, ordered by key
    pub fn all(&self, class_name: &str) -> StoreResult<Vec<MemoryRecord>> {
        self.schema.get(class_name)?;
        Ok(self.records_where(class_name, |_| true))
    }

    pub fn count(&self, class_name: &str) -> usize {
        self.tables.rows.get(class_name).map_or(0, BTreeMap::len)
    }

    pub fn join_rows(&self, join_table: &str) -> Vec<JoinRow> {
        self.tables
            .joins
            .get(join_table)
            .map(|rows| rows.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Writes since creation or the last [`MemoryStore::clear_journal`]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.tables.journal
    }

    pub fn clear_journal(&mut self) {
        self.tables.journal.clear();
    }

    fn records_where<F>(&self, class_name: &str, predicate: F) -> Vec<MemoryRecord>
    where
        F: Fn(&Attributes) -> bool,
    {
        self.tables
            .rows
            .get(class_name)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, row)| predicate(row))
                    .map(|(key, row)| MemoryRecord::persisted(class_name, key.clone(), row.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keys of `class_name` rows whose `column` references `key`
    fn referencing(&self, class_name: &str, column: &str, key: &RecordKey) -> Vec<RecordKey> {
        self.tables
            .rows
            .get(class_name)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, row)| references(row, column, key))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn next_key(&self, model: &ModelDefinition) -> RecordKey {
        match model.key_kind {
            KeyKind::Integer => {
                let current = self.tables.sequences.get(&model.class_name).copied().unwrap_or(0);
                RecordKey::Integer(current + 1)
            }
            KeyKind::Uuid => RecordKey::Uuid(Uuid::new_v4()),
        }
    }

    fn bump_sequence(&mut self, class_name: &str, key: &RecordKey) {
        if let Some(id) = key.as_i64() {
            let sequence = self.tables.sequences.entry(class_name.to_string()).or_insert(0);
            *sequence = (*sequence).max(id);
        }
    }

    fn write_attribute(
        &mut self,
        class_name: &str,
        key: &RecordKey,
        column: &str,
        value: AttributeValue,
    ) -> StoreResult<()> {
        let row = self
            .tables
            .rows
            .get_mut(class_name)
            .and_then(|table| table.get_mut(key))
            .ok_or_else(|| StoreError::Storage(format!("{} {} is not stored", class_name, key)))?;
        row.insert(column.to_string(), value);
        self.record_write(WriteOperation::Update, class_name, key);
        Ok(())
    }

    fn record_write(&mut self, operation: WriteOperation, class_name: &str, key: &RecordKey) {
        trace!("{:?} {} {}", operation, class_name, key);
        self.tables.journal.push(JournalEntry {
            operation,
            class_name: class_name.to_string(),
            key: key.clone(),
        });
    }

    /// Write one association pair between two persisted records
    fn apply_link(
        &mut self,
        owner_class: &str,
        owner_key: &RecordKey,
        descriptor: &AssociationDescriptor,
        related_class: &str,
        related_key: &RecordKey,
    ) -> StoreResult<()> {
        match descriptor.kind {
            AssociationKind::BelongsTo => {
                let foreign_key = foreign_key(descriptor)?;
                self.write_attribute(owner_class, owner_key, foreign_key, related_key.to_value())?;
                if let Some(foreign_type) = &descriptor.foreign_type {
                    self.write_attribute(owner_class, owner_key, foreign_type, related_class.into())?;
                }
            }
            AssociationKind::HasOne => {
                let foreign_key = foreign_key(descriptor)?;
                let previous: Vec<RecordKey> = self
                    .referencing(related_class, foreign_key, owner_key)
                    .into_iter()
                    .filter(|key| key != related_key)
                    .collect();
                for key in previous {
                    self.write_attribute(related_class, &key, foreign_key, AttributeValue::Null)?;
                }
                self.write_attribute(related_class, related_key, foreign_key, owner_key.to_value())?;
            }
            AssociationKind::HasMany => {
                let foreign_key = foreign_key(descriptor)?;
                self.write_attribute(related_class, related_key, foreign_key, owner_key.to_value())?;
            }
            AssociationKind::HasAndBelongsToMany => {
                let join_table = descriptor.join_table.as_deref().ok_or_else(|| {
                    StoreError::Configuration(format!("{} has no join table", descriptor.name))
                })?;
                let row = JoinRow::new(owner_class, owner_key, related_class, related_key);
                let inserted = self
                    .tables
                    .joins
                    .entry(join_table.to_string())
                    .or_default()
                    .insert(row);
                if inserted {
                    self.record_write(WriteOperation::Link, owner_class, owner_key);
                }
            }
        }

        debug!(
            "Linked {} {} -[{}]-> {} {}",
            owner_class, owner_key, descriptor.name, related_class, related_key
        );
        Ok(())
    }

    /// Required columns and unique constraints for a row about to be written
    fn validate_row(&self, model: &ModelDefinition, key: &RecordKey, row: &Attributes) -> StoreResult<()> {
        for column in &model.required {
            if row.get(column).map_or(true, AttributeValue::is_blank) {
                return Err(StoreError::Validation {
                    class_name: model.class_name.clone(),
                    message: format!("{} can't be blank", column),
                });
            }
        }

        let Some(table) = self.tables.rows.get(&model.class_name) else {
            return Ok(());
        };
        for columns in &model.unique {
            let values: Vec<&AttributeValue> = columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&AttributeValue::Null))
                .collect();
            if values.iter().all(|v| v.is_null()) {
                continue;
            }

            let clash = table.iter().find(|(other_key, other)| {
                *other_key != key
                    && columns
                        .iter()
                        .zip(&values)
                        .all(|(c, v)| values_match(other.get(c).unwrap_or(&AttributeValue::Null), v))
            });
            if let Some((other_key, _)) = clash {
                return Err(StoreError::Constraint(format!(
                    "{} ({}) already taken by {} {}",
                    model.class_name,
                    columns.join(", "),
                    model.class_name,
                    other_key
                )));
            }
        }
        Ok(())
    }

    fn check_key_kind(model: &ModelDefinition, key: &RecordKey) -> StoreResult<()> {
        match (model.key_kind, key) {
            (KeyKind::Integer, RecordKey::Integer(_)) | (KeyKind::Uuid, RecordKey::Uuid(_)) => Ok(()),
            _ => Err(StoreError::InvalidKey(format!(
                "{} keys are {:?}, got '{}'",
                model.class_name, model.key_kind, key
            ))),
        }
    }

    fn check_target(descriptor: &AssociationDescriptor, related: &MemoryRecord) -> StoreResult<()> {
        match &descriptor.class_name {
            Some(expected) if expected != related.class_name() => Err(StoreError::Configuration(format!(
                "{} expects {}, got {}",
                descriptor.name,
                expected,
                related.class_name()
            ))),
            _ => Ok(()),
        }
    }
}

fn foreign_key(descriptor: &AssociationDescriptor) -> StoreResult<&str> {
    descriptor.foreign_key.as_deref().ok_or_else(|| {
        StoreError::Configuration(format!("{} has no foreign key", descriptor.name))
    })
}

fn references(row: &Attributes, column: &str, key: &RecordKey) -> bool {
    row.get(column)
        .filter(|value| !value.is_blank())
        .and_then(|value| RecordKey::from_value(value).ok())
        .map_or(false, |k| &k == key)
}

/// Equality with integers and floats compared numerically
fn values_match(stored: &AttributeValue, wanted: &AttributeValue) -> bool {
    match (stored, wanted) {
        (AttributeValue::Integer(i), AttributeValue::Float(f))
        | (AttributeValue::Float(f), AttributeValue::Integer(i)) => *i as f64 == *f,
        _ => stored == wanted,
    }
}

impl RecordStore for MemoryStore {
    type Record = MemoryRecord;

    fn primary_key_name(&self, class_name: &str) -> StoreResult<String> {
        Ok(self.schema.get(class_name)?.primary_key.clone())
    }

    fn describe_association(&self, class_name: &str, name: &str) -> StoreResult<AssociationDescriptor> {
        self.schema.association(class_name, name).cloned()
    }

    fn fetch_related(&self, record: &MemoryRecord, name: &str) -> StoreResult<Related<MemoryRecord>> {
        let descriptor = self.schema.association(record.class_name(), name)?;

        match descriptor.kind {
            AssociationKind::BelongsTo => {
                let foreign_key = foreign_key(descriptor)?;
                let Some(value) = record.get(foreign_key).filter(|v| !v.is_blank()) else {
                    return Ok(Related::One(None));
                };
                let target = match (&descriptor.class_name, &descriptor.foreign_type) {
                    (Some(class_name), _) => class_name.clone(),
                    (None, Some(foreign_type)) => match record.get(foreign_type).and_then(AttributeValue::as_str) {
                        Some(class_name) if !class_name.trim().is_empty() => class_name.to_string(),
                        _ => return Ok(Related::One(None)),
                    },
                    (None, None) => return Err(StoreError::Configuration(format!("{} has no target class", name))),
                };
                self.schema.get(&target)?;

                let key = RecordKey::from_value(value)?;
                Ok(Related::One(self.get(&target, &key)))
            }
            AssociationKind::HasOne | AssociationKind::HasMany => {
                let target = descriptor.class_name.as_deref().unwrap_or_default();
                let Some(owner_key) = record.key() else {
                    return Ok(Related::Many(Vec::new()));
                };
                let foreign_key = foreign_key(descriptor)?;
                // has_one returns every match; duplicates surface as a cardinality error
                let related = self.records_where(target, |row| references(row, foreign_key, owner_key));
                Ok(Related::Many(related))
            }
            AssociationKind::HasAndBelongsToMany => {
                let target = descriptor.class_name.as_deref().unwrap_or_default();
                let Some(owner_key) = record.key() else {
                    return Ok(Related::Many(Vec::new()));
                };
                let join_table = descriptor.join_table.as_deref().unwrap_or_default();
                let related = self
                    .tables
                    .joins
                    .get(join_table)
                    .into_iter()
                    .flatten()
                    .filter_map(|row| row.other_side(record.class_name(), owner_key))
                    .filter(|(class_name, _)| *class_name == target)
                    .filter_map(|(class_name, key)| self.get(class_name, key))
                    .collect();
                Ok(Related::Many(related))
            }
        }
    }

    fn natural_key(&self, class_name: &str) -> StoreResult<Option<Vec<String>>> {
        Ok(self.schema.get(class_name)?.natural_key.clone())
    }

    fn find(&self, class_name: &str, id: &AttributeValue) -> StoreResult<Option<MemoryRecord>> {
        self.schema.get(class_name)?;
        match RecordKey::from_value(id) {
            Ok(key) => Ok(self.get(class_name, &key)),
            Err(_) => Ok(None),
        }
    }

    fn find_by(&self, class_name: &str, criteria: &Attributes) -> StoreResult<Vec<MemoryRecord>> {
        let model = self.schema.get(class_name)?;
        if let Some(column) = criteria.keys().find(|c| !model.has_column(c)) {
            return Err(StoreError::UnknownAttribute {
                class_name: class_name.to_string(),
                attribute: column.clone(),
            });
        }

        let criteria = criteria
            .iter()
            .map(|(column, value)| model.cast(column, value).map(|value| (column.as_str(), value)))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(self.records_where(class_name, |row| {
            criteria
                .iter()
                .all(|(column, wanted)| values_match(row.get(*column).unwrap_or(&AttributeValue::Null), wanted))
        }))
    }

    fn instantiate(&self, class_name: &str) -> StoreResult<MemoryRecord> {
        let model = self.schema.get(class_name)?;
        let attributes = model
            .column_names()
            .map(|column| (column.to_string(), AttributeValue::Null))
            .collect();
        Ok(MemoryRecord::new(class_name, attributes))
    }

    fn assign_attributes(&self, record: &mut MemoryRecord, attributes: &Attributes) -> StoreResult<()> {
        let model = self.schema.get(record.class_name())?;

        for (column, value) in attributes {
            if !model.has_column(column) {
                return Err(StoreError::UnknownAttribute {
                    class_name: model.class_name.clone(),
                    attribute: column.clone(),
                });
            }
            if *column == model.primary_key {
                match record.key() {
                    Some(key) => {
                        if RecordKey::from_value(value).ok().as_ref() != Some(key) {
                            return Err(StoreError::InvalidKey(format!(
                                "cannot change the key of {} {} to '{}'",
                                model.class_name, key, value
                            )));
                        }
                    }
                    // Text that cannot be a key leaves a new record unkeyed
                    None if !value.is_blank() && RecordKey::from_value(value).is_err() => {
                        debug!("Ignoring unusable {} '{}' for new {}", column, value, model.class_name);
                        record.set(column, AttributeValue::Null);
                        continue;
                    }
                    None => {}
                }
            }
            record.set(column, model.cast(column, value)?);
        }
        Ok(())
    }

    fn assign_association(&self, record: &mut MemoryRecord, name: &str, related: &MemoryRecord) -> StoreResult<()> {
        let descriptor = self.schema.association(record.class_name(), name)?;
        Self::check_target(descriptor, related)?;
        let related_key = related
            .key()
            .cloned()
            .ok_or_else(|| StoreError::NotPersisted(related.class_name().to_string()))?;

        match descriptor.kind {
            AssociationKind::BelongsTo => {
                record.set(foreign_key(descriptor)?, related_key.to_value());
                if let Some(foreign_type) = &descriptor.foreign_type {
                    record.set(foreign_type, related.class_name().into());
                }
            }
            _ => record.queue_link(PendingLink {
                association: name.to_string(),
                class_name: related.class_name().to_string(),
                key: related_key,
            }),
        }
        Ok(())
    }

    fn save(&mut self, record: &mut MemoryRecord) -> StoreResult<()> {
        let model = self.schema.get(record.class_name())?.clone();
        let inserting = record.is_new_record();

        let key = match record.key().cloned() {
            Some(key) => key,
            None => match record.get(&model.primary_key).filter(|v| !v.is_blank()) {
                Some(value) => {
                    let key = RecordKey::from_value(value)?;
                    Self::check_key_kind(&model, &key)?;
                    if self.get(&model.class_name, &key).is_some() {
                        return Err(StoreError::Constraint(format!(
                            "duplicate key {} {}",
                            model.class_name, key
                        )));
                    }
                    key
                }
                None => self.next_key(&model),
            },
        };

        let mut row = record.attributes();
        row.insert(model.primary_key.clone(), key.to_value());
        self.validate_row(&model, &key, &row)?;

        self.tables
            .rows
            .entry(model.class_name.clone())
            .or_default()
            .insert(key.clone(), row);
        if inserting {
            self.bump_sequence(&model.class_name, &key);
            self.record_write(WriteOperation::Insert, &model.class_name, &key);
        } else {
            self.record_write(WriteOperation::Update, &model.class_name, &key);
        }

        record.set(&model.primary_key, key.to_value());
        record.mark_persisted(key.clone());
        debug!("Saved {} {}", model.class_name, key);

        for link in record.take_pending() {
            let descriptor = self.schema.association(&model.class_name, &link.association)?.clone();
            self.apply_link(&model.class_name, &key, &descriptor, &link.class_name, &link.key)?;
        }
        Ok(())
    }

    fn link(&mut self, owner: &MemoryRecord, name: &str, related: &MemoryRecord) -> StoreResult<()> {
        let descriptor = self.schema.association(owner.class_name(), name)?.clone();
        Self::check_target(&descriptor, related)?;
        let owner_key = owner
            .key()
            .ok_or_else(|| StoreError::NotPersisted(owner.class_name().to_string()))?;
        let related_key = related
            .key()
            .ok_or_else(|| StoreError::NotPersisted(related.class_name().to_string()))?;

        self.apply_link(owner.class_name(), owner_key, &descriptor, related.class_name(), related_key)
    }
}

impl Transactional for MemoryStore {
    fn begin(&mut self) -> StoreResult<()> {
        self.snapshots.push(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshots
            .pop()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction("commit without an open transaction".to_string()))
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self
            .snapshots
            .pop()
            .ok_or_else(|| StoreError::Transaction("rollback without an open transaction".to_string()))?;
        self.tables = snapshot;
        Ok(())
    }

    fn depth(&self) -> usize {
        self.snapshots.len()
    }
}
