//! Association Serializer - one association on one record

use tracing::debug;

use crate::document::{AssociationContent, AssociationDocument};
use crate::error::ExportResult;
use crate::model::{Persistable, RecordStore};
use crate::relationships::Includes;

use super::Exporter;

pub(crate) struct AssociationSerializer<'e, 's, S: RecordStore> {
    exporter: &'e Exporter<'s, S>,
    record: &'e S::Record,
    name: &'e str,
}

impl<'e, 's, S: RecordStore> AssociationSerializer<'e, 's, S> {
    pub(crate) fn new(exporter: &'e Exporter<'s, S>, record: &'e S::Record, name: &'e str) -> Self {
        Self { exporter, record, name }
    }

    /// Describe the association, fetch its records live and serialize them
    /// with the next level of includes
    pub(crate) fn serialize(&self, next_includes: Option<&Includes>) -> ExportResult<AssociationDocument> {
        let store = self.exporter.store();
        let class_name = self.record.class_name();
        let descriptor = store.describe_association(class_name, self.name)?;
        let related = store.fetch_related(self.record, self.name)?;

        let none = Includes::none();
        let includes = next_includes.unwrap_or(&none);

        let content = if descriptor.kind.is_collection() {
            let records = related.into_many();
            debug!("{}.{}: {} related record(s)", class_name, self.name, records.len());
            Some(AssociationContent::Many(
                self.exporter.serialize_collection(&records, includes)?,
            ))
        } else {
            match related.into_one(class_name, self.name)? {
                Some(record) => Some(AssociationContent::One(Box::new(
                    self.exporter.serialize_record(&record, includes)?,
                ))),
                None => {
                    debug!("{}.{}: no related record", class_name, self.name);
                    None
                }
            }
        };

        // Foreign keys of has_one/has_many live on the related side
        let owning = descriptor.kind.is_owning();
        Ok(AssociationDocument {
            name: descriptor.name,
            inverse: descriptor.inverse,
            foreign_key: descriptor.foreign_key.filter(|_| owning),
            foreign_type: descriptor.foreign_type.filter(|_| owning),
            kind: descriptor.kind,
            content,
        })
    }
}
