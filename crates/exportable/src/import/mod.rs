//! Import - reconstruct a record graph from a [`Document`]
//!
//! The whole import runs in one transaction. Per node: match or create the
//! record, assign attributes, wire the back-reference to the parent, import
//! `belongs_to` targets, save, then import the owned associations.

mod matcher;

pub use matcher::{DefaultMatcher, Matcher};

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::ImportConfig;
use crate::document::{AssociationContent, AssociationDocument, Document, DocumentNode};
use crate::error::{ImportError, ImportResult};
use crate::format::Format;
use crate::model::{Persistable, RecordStore, Transactional};
use crate::transaction::with_transaction;
use crate::value::{AttributeValue, Attributes};

/// Where the document to import comes from
#[derive(Debug, Clone)]
pub enum ImportSource {
    /// Encoded text in a known format
    Text { body: String, format: Format },
    /// A file; the format is taken from the suffix when not given
    File { path: PathBuf, format: Option<Format> },
    /// An already decoded document
    Document(Document),
}

impl ImportSource {
    pub fn json(body: impl Into<String>) -> Self {
        ImportSource::Text {
            body: body.into(),
            format: Format::Json,
        }
    }

    pub fn yaml(body: impl Into<String>) -> Self {
        ImportSource::Text {
            body: body.into(),
            format: Format::Yaml,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        ImportSource::File {
            path: path.into(),
            format: None,
        }
    }

    pub fn file_with_format(path: impl Into<PathBuf>, format: Format) -> Self {
        ImportSource::File {
            path: path.into(),
            format: Some(format),
        }
    }

    /// Decode the source into a document
    pub fn load(self) -> ImportResult<Document> {
        match self {
            ImportSource::Document(document) => Ok(document),
            ImportSource::Text { body, format } => Ok(format.decode(&body)?),
            ImportSource::File { path, format } => {
                if path.as_os_str().is_empty() {
                    return Err(ImportError::MissingParameter("File"));
                }
                let format = match format {
                    Some(format) => format,
                    None if path.extension().is_none() => {
                        return Err(ImportError::MissingParameter("Format"));
                    }
                    None => Format::from_path(&path)?,
                };
                if !path.is_file() {
                    return Err(ImportError::FileNotFound(path));
                }

                debug!("Reading {} import from {}", format, path.display());
                let body = fs::read_to_string(&path)?;
                Ok(format.decode(&body)?)
            }
        }
    }
}

impl From<Document> for ImportSource {
    fn from(document: Document) -> Self {
        ImportSource::Document(document)
    }
}

/// Document Reconstructor
#[derive(Debug, Clone)]
pub struct Importer {
    document: Document,
    config: ImportConfig,
}

impl Importer {
    /// Decode `source`; decoding errors surface here, before any store access
    pub fn new(source: ImportSource, config: ImportConfig) -> ImportResult<Self> {
        let document = source.load()?;
        Ok(Self { document, config })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import with the default matcher
    pub fn import<S>(&self, store: &mut S) -> ImportResult<Vec<S::Record>>
    where
        S: RecordStore + Transactional,
    {
        let matcher = DefaultMatcher::from(&self.config);
        self.import_with(store, &matcher)
    }

    /// Import inside one transaction; returns the top-level records in
    /// document order
    pub fn import_with<S, M>(&self, store: &mut S, matcher: &M) -> ImportResult<Vec<S::Record>>
    where
        S: RecordStore + Transactional,
        M: Matcher<S>,
    {
        let nodes = self.document.nodes();
        let records = with_transaction(store, |store| {
            let reconstructor = Reconstructor {
                config: &self.config,
                matcher,
            };
            nodes
                .iter()
                .map(|node| reconstructor.process_node(store, node, None))
                .collect::<ImportResult<Vec<_>>>()
        })?;

        info!("Imported {} top-level record(s)", records.len());
        Ok(records)
    }
}

/// Parent context of a node reached through an owned association
struct ParentLink<'p, R> {
    record: &'p R,
    association: &'p AssociationDocument,
}

struct Reconstructor<'a, M> {
    config: &'a ImportConfig,
    matcher: &'a M,
}

impl<'a, M> Reconstructor<'a, M> {
    fn process_node<S>(
        &self,
        store: &mut S,
        node: &DocumentNode,
        parent: Option<ParentLink<'_, S::Record>>,
    ) -> ImportResult<S::Record>
    where
        S: RecordStore,
        M: Matcher<S>,
    {
        let mut record = self.matcher.match_node(store, node)?;
        debug!(
            "Processing {} ({})",
            node.class_name,
            if record.is_new_record() { "new" } else { "existing" }
        );

        if record.is_new_record() || self.config.allow_update {
            let attributes = self.assignable_attributes(store, node)?;
            store.assign_attributes(&mut record, &attributes)?;
        }

        if let Some(link) = &parent {
            if let Some(inverse) = &link.association.inverse {
                store.assign_association(&mut record, inverse, link.record)?;
            }
        }

        for association in node.owning_associations() {
            let Some(target_node) = single_content(association)? else {
                continue;
            };
            let target = self.process_node(store, target_node, None)?;
            store.assign_association(&mut record, &association.name, &target)?;
        }

        store.save(&mut record).map_err(|source| ImportError::Save {
            class_name: node.class_name.clone(),
            details: format!("{:?}", record),
            source,
        })?;

        // Without an inverse the child can only be attached from the parent side
        if let Some(link) = &parent {
            if link.association.inverse.is_none() {
                store.link(link.record, &link.association.name, &record)?;
            }
        }

        for association in node.owned_associations() {
            for child in association.nodes() {
                let link = ParentLink {
                    record: &record,
                    association,
                };
                self.process_node(store, child, Some(link))?;
            }
        }

        Ok(record)
    }

    fn assignable_attributes<S: RecordStore>(&self, store: &S, node: &DocumentNode) -> ImportResult<Attributes> {
        let mut attributes = node.attributes.clone();
        let id_name = store.primary_key_name(&node.class_name)?;
        let blank_id = attributes.get(&id_name).map_or(false, AttributeValue::is_blank);
        if self.config.ignore_ids || blank_id {
            attributes.remove(&id_name);
        }
        Ok(attributes)
    }
}

/// The single target node of a `belongs_to` document
fn single_content(association: &AssociationDocument) -> ImportResult<Option<&DocumentNode>> {
    match &association.content {
        None => Ok(None),
        Some(AssociationContent::One(node)) => Ok(Some(node)),
        Some(AssociationContent::Many(_)) => Err(ImportError::InvalidDocument(format!(
            "belongs_to association '{}' must contain a single node",
            association.name
        ))),
    }
}
