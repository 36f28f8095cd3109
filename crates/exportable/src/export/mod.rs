//! Export - serialize a record (or collection) and its included associations
//! into a [`Document`]
//!
//! Export only reads: it never mutates the source records and reads related
//! records live from the store.
//!
//! ```rust,ignore
//! let config = ExportConfig::new().with_includes(Includes::map([("items", "product")]));
//! let document = Exporter::new(&store, config).export_record(&order)?;
//! ```

mod association;

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::ExportConfig;
use crate::document::{Document, DocumentNode};
use crate::error::{ExportError, ExportResult};
use crate::format::Format;
use crate::model::{Persistable, RecordStore};
use crate::relationships::Includes;

use association::AssociationSerializer;

/// What to export: one record or a homogeneous collection
#[derive(Debug, Clone, Copy)]
pub enum ExportInput<'a, R> {
    Record(&'a R),
    Collection(&'a [R]),
}

impl<'a, R: Persistable> ExportInput<'a, R> {
    pub fn record(record: &'a R) -> Self {
        ExportInput::Record(record)
    }

    pub fn collection(records: &'a [R]) -> Self {
        ExportInput::Collection(records)
    }

    /// Reject inputs that are not a record or a homogeneous collection of records
    fn validate(&self) -> ExportResult<()> {
        match self {
            ExportInput::Record(record) => {
                if record.class_name().is_empty() {
                    return Err(ExportError::InvalidInput(
                        "You need to provide a persistable record as argument.".to_string(),
                    ));
                }
            }
            ExportInput::Collection(records) => {
                let Some(first) = records.first() else {
                    return Ok(());
                };
                if first.class_name().is_empty() {
                    return Err(ExportError::InvalidInput(
                        "You need to provide persistable records as argument.".to_string(),
                    ));
                }
                if let Some(other) = records.iter().find(|r| r.class_name() != first.class_name()) {
                    return Err(ExportError::InvalidInput(format!(
                        "Collection mixes record types '{}' and '{}'",
                        first.class_name(),
                        other.class_name()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Document Serializer
pub struct Exporter<'s, S: RecordStore> {
    store: &'s S,
    config: ExportConfig,
}

impl<'s, S: RecordStore> Exporter<'s, S> {
    pub fn new(store: &'s S, config: ExportConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Serialize `input` into a document tree
    pub fn export(&self, input: ExportInput<'_, S::Record>) -> ExportResult<Document> {
        input.validate()?;

        let includes = &self.config.includes;
        let document = match input {
            ExportInput::Record(record) => Document::One(self.serialize_record(record, includes)?),
            ExportInput::Collection(records) => Document::Many(self.serialize_collection(records, includes)?),
        };

        info!("Exported {} record(s)", document.nodes().len());
        Ok(document)
    }

    /// Export a single record
    pub fn export_record(&self, record: &S::Record) -> ExportResult<Document> {
        self.export(ExportInput::Record(record))
    }

    /// Export each record of a collection, in iteration order
    pub fn export_collection(&self, records: &[S::Record]) -> ExportResult<Document> {
        self.export(ExportInput::Collection(records))
    }

    /// Export and encode in `format`
    pub fn export_to_string(&self, input: ExportInput<'_, S::Record>, format: Format) -> ExportResult<String> {
        let document = self.export(input)?;
        Ok(format.encode(&document)?)
    }

    /// Export and write to `path`, in the configured format or the one named
    /// by the path suffix
    pub fn export_to_file(&self, input: ExportInput<'_, S::Record>, path: impl AsRef<Path>) -> ExportResult<Format> {
        let path = path.as_ref();
        let format = match self.config.format {
            Some(format) => format,
            None => Format::from_path(path)?,
        };

        let encoded = self.export_to_string(input, format)?;
        fs::write(path, encoded)?;
        info!("Wrote {} export to {}", format, path.display());
        Ok(format)
    }

    /// Download filename for a record export: `<class>_<id>.<ext>`
    pub fn default_filename(&self, record: &S::Record, format: Format) -> ExportResult<String> {
        let class_name = record.class_name();
        let id_name = self.store.primary_key_name(class_name)?;
        let id = record
            .attributes()
            .get(&id_name)
            .filter(|id| !id.is_blank())
            .map(|id| id.to_string())
            .unwrap_or_else(|| "new".to_string());

        Ok(format!(
            "{}_{}.{}",
            class_name.to_lowercase(),
            id,
            format.extension()
        ))
    }

    pub(crate) fn serialize_collection(
        &self,
        records: &[S::Record],
        includes: &Includes,
    ) -> ExportResult<Vec<DocumentNode>> {
        records
            .iter()
            .map(|record| self.serialize_record(record, includes))
            .collect()
    }

    /// Serialize one record and the associations `includes` selects for it
    pub(crate) fn serialize_record(&self, record: &S::Record, includes: &Includes) -> ExportResult<DocumentNode> {
        let class_name = record.class_name();
        let mut attributes = record.attributes();
        debug!("Serializing {} with {} attribute(s)", class_name, attributes.len());

        let mut associations = Vec::new();
        for entry in includes.resolve() {
            let serializer = AssociationSerializer::new(self, record, &entry.name);
            associations.push(serializer.serialize(entry.nested.as_ref())?);
        }

        if self.config.strip_ids {
            let id_name = self.store.primary_key_name(class_name)?;
            attributes.remove(&id_name);

            for association in associations.iter().filter(|a| a.kind.is_owning()) {
                for key in [&association.foreign_key, &association.foreign_type].into_iter().flatten() {
                    attributes.remove(key);
                }
            }
        }

        Ok(DocumentNode {
            class_name: class_name.to_string(),
            attributes,
            associations,
        })
    }

    pub(crate) fn store(&self) -> &S {
        self.store
    }
}
