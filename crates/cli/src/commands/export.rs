use std::path::PathBuf;

use anyhow::{Context, Result};
use elif_exportable::{
    AttributeValue, ExportConfig, ExportInput, Exporter, Format, Includes, MemoryRecord, MemoryStore, RecordStore,
};
use tracing::info;

pub struct ExportArgs {
    pub store: PathBuf,
    pub class_name: String,
    pub id: Option<String>,
    pub include: Option<Includes>,
    pub format: Option<Format>,
    pub strip_ids: bool,
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    /// Environment defaults overridden by flags
    fn config(&self) -> Result<ExportConfig> {
        let mut config = ExportConfig::from_env().context("Invalid export configuration")?;
        if let Some(includes) = &self.include {
            config = config.with_includes(includes.clone());
        }
        if self.strip_ids {
            config = config.strip_ids();
        }
        if let Some(format) = self.format {
            config = config.with_format(format);
        }
        Ok(config)
    }
}

enum Selection {
    One(MemoryRecord),
    All(Vec<MemoryRecord>),
}

impl Selection {
    fn load(store: &MemoryStore, class_name: &str, id: Option<&str>) -> Result<Self> {
        match id {
            Some(id) => {
                let record = store
                    .find(class_name, &AttributeValue::from(id))?
                    .with_context(|| format!("{} {} not found", class_name, id))?;
                Ok(Selection::One(record))
            }
            None => Ok(Selection::All(store.all(class_name)?)),
        }
    }

    fn input(&self) -> ExportInput<'_, MemoryRecord> {
        match self {
            Selection::One(record) => ExportInput::record(record),
            Selection::All(records) => ExportInput::collection(records),
        }
    }

    fn len(&self) -> usize {
        match self {
            Selection::One(_) => 1,
            Selection::All(records) => records.len(),
        }
    }
}

pub fn run(args: ExportArgs) -> Result<()> {
    let store = MemoryStore::load(&args.store)
        .with_context(|| format!("Failed to load store {}", args.store.display()))?;
    let exporter = Exporter::new(&store, args.config()?);
    let selection = Selection::load(&store, &args.class_name, args.id.as_deref())?;

    let Some(output) = &args.output else {
        let format = exporter.config().format.unwrap_or_default();
        let encoded = exporter.export_to_string(selection.input(), format)?;
        println!("{}", encoded.trim_end());
        return Ok(());
    };

    let path = if output.is_dir() {
        let format = exporter.config().format.unwrap_or_default();
        let filename = match &selection {
            Selection::One(record) => exporter.default_filename(record, format)?,
            Selection::All(_) => format!("{}.{}", args.class_name.to_lowercase(), format.extension()),
        };
        output.join(filename)
    } else {
        output.clone()
    };

    let format = exporter
        .export_to_file(selection.input(), &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Exported {} {} record(s)", selection.len(), args.class_name);
    println!("Exported {} record(s) to {} ({})", selection.len(), path.display(), format.mime_type());
    Ok(())
}
