//! # elif-exportable
//!
//! Association-aware export and import of record graphs.
//!
//! A record (or a collection of records) is serialized together with the
//! associations selected by an include specification into a JSON or YAML
//! [`Document`]. Importing a document rebuilds the graph inside a single
//! transaction, matching existing records by identifier or natural key and
//! saving every `belongs_to` target before the record that references it.
//!
//! ## Features
//!
//! - **Include specifications**: names, lists and nested maps, any depth
//! - **Id stripping**: drop primary and foreign keys to import as copies
//! - **Update or create**: existing records are only updated when allowed
//! - **Atomic import**: any failure rolls the whole import back
//! - **Pluggable storage**: everything goes through [`RecordStore`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use elif_exportable::{ExportConfig, ExportInput, Exporter, Format, ImportConfig, ImportSource, Importer, Includes};
//!
//! let config = ExportConfig::new().with_includes(Includes::map([("items", "product")]));
//! let yaml = Exporter::new(&store, config).export_to_string(ExportInput::record(&order), Format::Yaml)?;
//!
//! let importer = Importer::new(ImportSource::yaml(yaml), ImportConfig::new().allow_update())?;
//! let records = importer.import(&mut store)?;
//! ```

pub mod backends;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod format;
pub mod import;
pub mod model;
pub mod relationships;
pub mod transaction;
pub mod value;

pub use backends::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use export::*;
pub use format::*;
pub use import::*;
pub use model::*;
pub use relationships::*;
pub use transaction::*;
pub use value::*;
