//! Persistence Seam - the narrow interface a store must provide
//!
//! The exporter and importer never query or write storage directly; every
//! read and write goes through [`RecordStore`], and the import boundary goes
//! through [`Transactional`].

use std::fmt::Debug;

use crate::error::{StoreError, StoreResult};
use crate::relationships::AssociationDescriptor;
use crate::value::{AttributeValue, Attributes};

/// A record handle as seen by the export/import core
pub trait Persistable: Clone + Debug {
    /// Type name, resolvable back to a persistable type on import
    fn class_name(&self) -> &str;

    /// Current attribute values
    fn attributes(&self) -> Attributes;

    /// True until the record has been saved once
    fn is_new_record(&self) -> bool;
}

/// Records reached through one association
#[derive(Debug, Clone, PartialEq)]
pub enum Related<R> {
    One(Option<R>),
    Many(Vec<R>),
}

impl<R> Related<R> {
    /// Records as a collection, whatever the shape returned by the store
    pub fn into_many(self) -> Vec<R> {
        match self {
            Related::One(record) => record.into_iter().collect(),
            Related::Many(records) => records,
        }
    }

    /// Records as a single optional record; fails when there are several
    pub fn into_one(self, class_name: &str, association: &str) -> StoreResult<Option<R>> {
        match self {
            Related::One(record) => Ok(record),
            Related::Many(mut records) => match records.len() {
                0 | 1 => Ok(records.pop()),
                count => Err(StoreError::Cardinality {
                    class_name: class_name.to_string(),
                    association: association.to_string(),
                    count,
                }),
            },
        }
    }
}

/// Querying and saving primitives of the underlying persistence engine
pub trait RecordStore {
    type Record: Persistable;

    /// Identifier attribute name for `class_name`
    fn primary_key_name(&self, class_name: &str) -> StoreResult<String> {
        self.instantiate(class_name)?;
        Ok("id".to_string())
    }

    /// Describe the association `name` on `class_name`
    fn describe_association(&self, class_name: &str, name: &str) -> StoreResult<AssociationDescriptor>;

    /// Fetch the records currently reachable through `name` from `record`
    fn fetch_related(&self, record: &Self::Record, name: &str) -> StoreResult<Related<Self::Record>>;

    /// Natural-key attributes declared for `class_name`, if any
    fn natural_key(&self, _class_name: &str) -> StoreResult<Option<Vec<String>>> {
        Ok(None)
    }

    /// Find a persisted record by identifier
    fn find(&self, class_name: &str, id: &AttributeValue) -> StoreResult<Option<Self::Record>>;

    /// Find persisted records whose values for exactly the given attributes match
    fn find_by(&self, class_name: &str, criteria: &Attributes) -> StoreResult<Vec<Self::Record>>;

    /// New, unsaved record of `class_name`; fails for unknown types
    fn instantiate(&self, class_name: &str) -> StoreResult<Self::Record>;

    /// Overwrite the given attributes on `record`
    fn assign_attributes(&self, record: &mut Self::Record, attributes: &Attributes) -> StoreResult<()>;

    /// Point the association `name` of `record` at `related`.
    ///
    /// The change becomes durable when `record` is saved.
    fn assign_association(
        &self,
        record: &mut Self::Record,
        name: &str,
        related: &Self::Record,
    ) -> StoreResult<()>;

    /// Insert or update `record`
    fn save(&mut self, record: &mut Self::Record) -> StoreResult<()>;

    /// Attach the persisted `related` record to the association `name` of the
    /// persisted `owner`, writing immediately
    fn link(&mut self, owner: &Self::Record, name: &str, related: &Self::Record) -> StoreResult<()>;
}

/// Explicit transaction boundary of a store
///
/// `begin` may be nested; each `commit` or `rollback` closes the innermost
/// open scope.
pub trait Transactional {
    fn begin(&mut self) -> StoreResult<()>;

    fn commit(&mut self) -> StoreResult<()>;

    fn rollback(&mut self) -> StoreResult<()>;

    /// Number of currently open scopes
    fn depth(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_into_many() {
        assert_eq!(Related::One(Some(1)).into_many(), vec![1]);
        assert_eq!(Related::<i32>::One(None).into_many(), Vec::<i32>::new());
        assert_eq!(Related::Many(vec![1, 2]).into_many(), vec![1, 2]);
    }

    #[test]
    fn test_related_into_one() {
        assert_eq!(Related::Many(vec![3]).into_one("Order", "customer").unwrap(), Some(3));
        assert_eq!(Related::<i32>::Many(vec![]).into_one("Order", "customer").unwrap(), None);

        let err = Related::Many(vec![1, 2]).into_one("Order", "customer").unwrap_err();
        assert_eq!(
            err,
            StoreError::Cardinality {
                class_name: "Order".to_string(),
                association: "customer".to_string(),
                count: 2
            }
        );
    }
}
