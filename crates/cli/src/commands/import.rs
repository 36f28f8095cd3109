use std::path::PathBuf;

use anyhow::{Context, Result};
use elif_exportable::{Format, ImportConfig, ImportSource, Importer, MemoryStore, NaturalKeyPolicy};
use tracing::info;

pub struct ImportArgs {
    pub store: PathBuf,
    pub file: PathBuf,
    pub format: Option<Format>,
    pub allow_update: bool,
    pub ignore_ids: bool,
    pub first_natural_match: bool,
}

impl ImportArgs {
    /// Environment defaults overridden by flags
    fn config(&self) -> Result<ImportConfig> {
        let mut config = ImportConfig::from_env().context("Invalid import configuration")?;
        if self.allow_update {
            config = config.allow_update();
        }
        if self.ignore_ids {
            config = config.ignore_ids();
        }
        if self.first_natural_match {
            config = config.with_natural_key_policy(NaturalKeyPolicy::First);
        }
        Ok(config)
    }

    fn source(&self) -> ImportSource {
        match self.format {
            Some(format) => ImportSource::file_with_format(&self.file, format),
            None => ImportSource::file(&self.file),
        }
    }
}

/// Import into the fixture store; the fixture is rewritten only when the
/// whole import succeeds
pub fn run(args: ImportArgs) -> Result<()> {
    let mut store = MemoryStore::load(&args.store)
        .with_context(|| format!("Failed to load store {}", args.store.display()))?;

    let importer = Importer::new(args.source(), args.config()?)?;
    let records = importer.import(&mut store)?;
    let writes = store.journal().len();

    store
        .dump(&args.store)
        .with_context(|| format!("Failed to save store {}", args.store.display()))?;

    info!("Import of {} finished with {} write(s)", args.file.display(), writes);
    println!(
        "Imported {} record(s) with {} write(s) into {}",
        records.len(),
        writes,
        args.store.display()
    );
    Ok(())
}
