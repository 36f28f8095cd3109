mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use elif_exportable::{Format, Includes};

use commands::{export, import};

#[derive(Parser)]
#[command(name = "exportable")]
#[command(about = "Export and import record graphs as JSON or YAML documents")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export records and their included associations
    Export {
        /// Fixture file holding the store
        #[arg(long)]
        store: PathBuf,

        /// Class of the records to export
        #[arg(long = "class")]
        class_name: String,

        /// Identifier of the record to export
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,

        /// Export every record of the class
        #[arg(long)]
        all: bool,

        /// Include specification, e.g. `items` or `{items: product}`
        #[arg(long, value_parser = parse_includes)]
        include: Option<Includes>,

        /// Output format (json or yaml)
        #[arg(long)]
        format: Option<Format>,

        /// Remove identifiers and belongs_to foreign keys
        #[arg(long)]
        strip_ids: bool,

        /// Output file or directory; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import a document into the store
    Import {
        /// Fixture file holding the store
        #[arg(long)]
        store: PathBuf,

        /// Document to import
        #[arg(long)]
        file: PathBuf,

        /// Document format; detected from the file suffix when omitted
        #[arg(long)]
        format: Option<Format>,

        /// Overwrite attributes of matched records
        #[arg(long)]
        allow_update: bool,

        /// Ignore identifiers in the document
        #[arg(long)]
        ignore_ids: bool,

        /// Take the first natural-key match instead of failing on ambiguity
        #[arg(long)]
        first_natural_match: bool,
    },
}

fn parse_includes(spec: &str) -> Result<Includes, String> {
    spec.parse()
        .map_err(|e| format!("invalid include specification: {}", e))
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.json_logs) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::Export {
            store,
            class_name,
            id,
            all: _,
            include,
            format,
            strip_ids,
            output,
        } => export::run(export::ExportArgs {
            store,
            class_name,
            id,
            include,
            format,
            strip_ids,
            output,
        }),
        Commands::Import {
            store,
            file,
            format,
            allow_update,
            ignore_ids,
            first_natural_match,
        } => import::run(import::ImportArgs {
            store,
            file,
            format,
            allow_update,
            ignore_ids,
            first_natural_match,
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
