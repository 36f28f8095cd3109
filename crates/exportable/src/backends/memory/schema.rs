//! Model definitions and the schema registry of the memory store

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::relationships::{AssociationDescriptor, AssociationKind};
use crate::value::AttributeValue;

/// Primary key generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Auto-incrementing integer
    #[default]
    Integer,
    /// Random v4 UUID
    Uuid,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Definition of one persistable type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub class_name: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    #[serde(default)]
    pub key_kind: KeyKind,

    /// Columns other than the primary key
    #[serde(default)]
    pub columns: Vec<String>,

    /// Columns holding dates; RFC 3339 text assigned to them is parsed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_columns: Vec<String>,

    #[serde(default)]
    pub associations: Vec<AssociationDescriptor>,

    /// Attributes that identify an existing record when no identifier is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_key: Option<Vec<String>>,

    /// Columns that must not be blank on save
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Column sets whose values must be unique across rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<Vec<String>>,
}

impl ModelDefinition {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            primary_key: default_primary_key(),
            key_kind: KeyKind::Integer,
            columns: Vec::new(),
            date_columns: Vec::new(),
            associations: Vec::new(),
            natural_key: None,
            required: Vec::new(),
            unique: Vec::new(),
        }
    }

    pub fn with_primary_key(mut self, primary_key: &str, key_kind: KeyKind) -> Self {
        self.primary_key = primary_key.to_string();
        self.key_kind = key_kind;
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.add_column(column.into());
        }
        self
    }

    /// Declare date columns
    pub fn with_date_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            self.add_column(column.clone());
            if !self.is_date_column(&column) {
                self.date_columns.push(column);
            }
        }
        self
    }

    /// Add an association; a `belongs_to` also declares its key columns
    pub fn with_association(mut self, descriptor: AssociationDescriptor) -> Self {
        self.associations.push(descriptor);
        self.normalize();
        self
    }

    pub fn with_natural_key<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.natural_key = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_required<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_unique<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == self.primary_key || self.columns.iter().any(|c| c == name)
    }

    /// Primary key followed by the declared columns
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_key.as_str()).chain(self.columns.iter().map(String::as_str))
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDescriptor> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn is_date_column(&self, name: &str) -> bool {
        self.date_columns.iter().any(|c| c == name)
    }

    /// Convert a value to the stored kind of `column`
    pub fn cast(&self, column: &str, value: &AttributeValue) -> StoreResult<AttributeValue> {
        if !self.is_date_column(column) {
            return Ok(value.clone());
        }
        match value {
            AttributeValue::Null | AttributeValue::Date(_) => Ok(value.clone()),
            blank if blank.is_blank() => Ok(AttributeValue::Null),
            other => other.to_date().map(AttributeValue::Date).ok_or_else(|| StoreError::Validation {
                class_name: self.class_name.clone(),
                message: format!("{} is not a date: '{}'", column, other),
            }),
        }
    }

    fn add_column(&mut self, column: String) {
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }

    /// Declare the key columns of every `belongs_to`
    fn normalize(&mut self) {
        let keys: Vec<String> = self
            .associations
            .iter()
            .filter(|a| a.kind == AssociationKind::BelongsTo)
            .flat_map(|a| [a.foreign_key.clone(), a.foreign_type.clone()])
            .flatten()
            .collect();
        for key in keys {
            self.add_column(key);
        }
    }
}

/// Registry of model definitions by class name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    models: BTreeMap<String, ModelDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a schema from definitions
    pub fn from_models<I>(models: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = ModelDefinition>,
    {
        let mut schema = Self::new();
        for model in models {
            schema.register(model)?;
        }
        schema.validate()?;
        Ok(schema)
    }

    /// Register a model definition
    pub fn register(&mut self, mut model: ModelDefinition) -> StoreResult<()> {
        for association in &model.associations {
            association.validate()?;
        }
        if self.models.contains_key(&model.class_name) {
            return Err(StoreError::Configuration(format!(
                "Model '{}' is already registered",
                model.class_name
            )));
        }

        model.normalize();
        self.models.insert(model.class_name.clone(), model);
        Ok(())
    }

    /// Resolve a class name
    pub fn get(&self, class_name: &str) -> StoreResult<&ModelDefinition> {
        self.models
            .get(class_name)
            .ok_or_else(|| StoreError::UnknownClass(class_name.to_string()))
    }

    pub fn association(&self, class_name: &str, name: &str) -> StoreResult<&AssociationDescriptor> {
        self.get(class_name)?
            .association(name)
            .ok_or_else(|| StoreError::UnknownAssociation {
                class_name: class_name.to_string(),
                association: name.to_string(),
            })
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.values()
    }

    /// Check that associations point at registered classes and columns
    pub fn validate(&self) -> StoreResult<()> {
        for model in self.models.values() {
            for column in model
                .required
                .iter()
                .chain(model.unique.iter().flatten())
                .chain(model.date_columns.iter())
            {
                if !model.has_column(column) {
                    return Err(StoreError::Configuration(format!(
                        "{} constrains unknown column '{}'",
                        model.class_name, column
                    )));
                }
            }
            for column in model.natural_key.iter().flatten() {
                if !model.has_column(column) {
                    return Err(StoreError::Configuration(format!(
                        "{} natural key uses unknown column '{}'",
                        model.class_name, column
                    )));
                }
            }

            for association in &model.associations {
                let Some(target) = association.class_name.as_deref() else {
                    continue;
                };
                let target_model = self.get(target).map_err(|_| {
                    StoreError::Configuration(format!(
                        "{}.{} points at unknown class '{}'",
                        model.class_name, association.name, target
                    ))
                })?;

                if let Some(inverse) = &association.inverse {
                    if target_model.association(inverse).is_none() {
                        return Err(StoreError::Configuration(format!(
                            "{}.{} declares inverse '{}' missing on {}",
                            model.class_name, association.name, inverse, target
                        )));
                    }
                }

                if matches!(association.kind, AssociationKind::HasOne | AssociationKind::HasMany) {
                    let foreign_key = association.foreign_key.as_deref().unwrap_or_default();
                    if !target_model.has_column(foreign_key) {
                        return Err(StoreError::Configuration(format!(
                            "{}.{} uses foreign key '{}' missing on {}",
                            model.class_name, association.name, foreign_key, target
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
