//! Association Metadata - read-only descriptors of relationships between record types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Defines the kind of relationship between record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Many-to-one relationship, foreign key on this side (belongsTo)
    BelongsTo,
    /// One-to-one relationship, foreign key on the related side (hasOne)
    HasOne,
    /// One-to-many relationship, foreign key on the related side (hasMany)
    HasMany,
    /// Many-to-many relationship through a join table
    HasAndBelongsToMany,
}

impl AssociationKind {
    /// Returns true if this association holds a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::HasAndBelongsToMany)
    }

    /// Returns true if the foreign key lives on the owning record itself
    pub fn is_owning(self) -> bool {
        matches!(self, Self::BelongsTo)
    }

    /// Returns true if this association requires a join table
    pub fn requires_join_table(self) -> bool {
        matches!(self, Self::HasAndBelongsToMany)
    }

    /// Canonical wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongs_to",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
            Self::HasAndBelongsToMany => "has_and_belongs_to_many",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One relationship on one record type
///
/// Supplied by the persistence layer; the exporter and importer only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Name of the association on the owning type
    pub name: String,

    pub kind: AssociationKind,

    /// Related type; `None` for a polymorphic `belongs_to`, whose target type
    /// is read from the `foreign_type` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Name of the back-reference on the related type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,

    /// Foreign key attribute; on this type for `belongs_to`, on the related
    /// type for `has_one`/`has_many`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    /// Attribute holding the target type of a polymorphic `belongs_to`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_type: Option<String>,

    /// Join table for `has_and_belongs_to_many`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<String>,
}

impl AssociationDescriptor {
    fn new(kind: AssociationKind, name: &str, class_name: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            class_name: class_name.map(str::to_string),
            inverse: None,
            foreign_key: None,
            foreign_type: None,
            join_table: None,
        }
    }

    /// `belongs_to` association; the foreign key defaults to `<name>_id`
    pub fn belongs_to(name: &str, class_name: &str) -> Self {
        Self::new(AssociationKind::BelongsTo, name, Some(class_name))
            .with_foreign_key(&format!("{}_id", name))
    }

    /// Polymorphic `belongs_to`, keyed by `<name>_id` and `<name>_type`
    pub fn belongs_to_polymorphic(name: &str) -> Self {
        let mut descriptor = Self::new(AssociationKind::BelongsTo, name, None)
            .with_foreign_key(&format!("{}_id", name));
        descriptor.foreign_type = Some(format!("{}_type", name));
        descriptor
    }

    /// `has_one` association; the foreign key on the related type must be set
    /// with [`with_foreign_key`](Self::with_foreign_key)
    pub fn has_one(name: &str, class_name: &str) -> Self {
        Self::new(AssociationKind::HasOne, name, Some(class_name))
    }

    /// `has_many` association; the foreign key on the related type must be set
    /// with [`with_foreign_key`](Self::with_foreign_key)
    pub fn has_many(name: &str, class_name: &str) -> Self {
        Self::new(AssociationKind::HasMany, name, Some(class_name))
    }

    /// Many-to-many association through `join_table`
    pub fn has_and_belongs_to_many(name: &str, class_name: &str, join_table: &str) -> Self {
        let mut descriptor = Self::new(AssociationKind::HasAndBelongsToMany, name, Some(class_name));
        descriptor.join_table = Some(join_table.to_string());
        descriptor
    }

    /// Set the foreign key attribute
    pub fn with_foreign_key(mut self, foreign_key: &str) -> Self {
        self.foreign_key = Some(foreign_key.to_string());
        self
    }

    /// Set the inverse association name
    pub fn with_inverse(mut self, inverse: &str) -> Self {
        self.inverse = Some(inverse.to_string());
        self
    }

    pub fn is_polymorphic(&self) -> bool {
        self.foreign_type.is_some()
    }

    /// Validate the descriptor for consistency
    pub fn validate(&self) -> StoreResult<()> {
        if self.name.is_empty() {
            return Err(StoreError::Configuration(
                "Association name cannot be empty".to_string(),
            ));
        }

        match self.kind {
            AssociationKind::BelongsTo => {
                if self.foreign_key.is_none() {
                    return Err(StoreError::Configuration(format!(
                        "belongs_to association '{}' requires a foreign key",
                        self.name
                    )));
                }
            }
            AssociationKind::HasOne | AssociationKind::HasMany => {
                if self.foreign_key.is_none() {
                    return Err(StoreError::Configuration(format!(
                        "{} association '{}' requires the foreign key on the related type",
                        self.kind, self.name
                    )));
                }
            }
            AssociationKind::HasAndBelongsToMany => {
                if self.join_table.is_none() {
                    return Err(StoreError::Configuration(format!(
                        "Association '{}' of kind {} requires a join table",
                        self.name, self.kind
                    )));
                }
            }
        }

        if self.is_polymorphic() && self.kind != AssociationKind::BelongsTo {
            return Err(StoreError::Configuration(format!(
                "Only belongs_to associations can be polymorphic, '{}' is {}",
                self.name, self.kind
            )));
        }

        if self.class_name.is_none() && !self.is_polymorphic() {
            return Err(StoreError::Configuration(format!(
                "Association '{}' has no related class",
                self.name
            )));
        }

        Ok(())
    }
}
