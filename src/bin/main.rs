//! Cubewright CLI - build and serve cubes from the command line
//!
//! Usage:
//!   cubewright build <manifest.json> [--db <file>] [--no-materialise]
//!   cubewright export --db <file> --revision <id> [--format csv] [--lang en]
//!   cubewright preview --db <file> --revision <id> [--page 1]
//!
//! The manifest is a JSON document holding the dataset (columns,
//! dimensions, measure, revisions) and the id of the end revision to
//! build. Uploaded files are read from the configured file store.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use uuid::Uuid;

use cubewright::builder::controller::CubeBuilder;
use cubewright::config::Settings;
use cubewright::engine::{DuckDbEngine, SqlEngine};
use cubewright::filestore::{FileStore, LocalFileStore};
use cubewright::locale::Locale;
use cubewright::model::Dataset;
use cubewright::output::{self, OutputFormat, SelectOptions, ViewCursor};

#[derive(Parser)]
#[command(name = "cubewright")]
#[command(about = "Cubewright - build multilingual cubes from dataset revisions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the cube for a revision described by a manifest
    Build {
        /// Path to the dataset manifest (JSON)
        manifest: PathBuf,

        /// Database file (defaults to the configured backend)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Skip view materialisation
        #[arg(long)]
        no_materialise: bool,
    },

    /// Export a built cube
    Export {
        /// Database file holding the cube
        #[arg(long)]
        db: PathBuf,

        /// Revision id (the cube's schema name)
        #[arg(long)]
        revision: Uuid,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: FormatArg,

        /// Language
        #[arg(long, default_value = "en")]
        lang: LangArg,

        /// Output file (defaults to <revision>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print one preview page of a built cube
    Preview {
        /// Database file holding the cube
        #[arg(long)]
        db: PathBuf,

        /// Revision id (the cube's schema name)
        #[arg(long)]
        revision: Uuid,

        /// Language
        #[arg(long, default_value = "en")]
        lang: LangArg,

        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Rows per page (defaults to the configured preview page size)
        #[arg(long)]
        page_size: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Parquet,
    Xlsx,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Parquet => OutputFormat::Parquet,
            FormatArg::Xlsx => OutputFormat::Excel,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LangArg {
    En,
    Cy,
}

impl From<LangArg> for Locale {
    fn from(arg: LangArg) -> Self {
        match arg {
            LangArg::En => Locale::En,
            LangArg::Cy => Locale::Cy,
        }
    }
}

/// The build manifest: a dataset plus the revision to build.
#[derive(Deserialize)]
struct BuildManifest {
    dataset: Dataset,
    end_revision_id: Uuid,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;

    match cli.command {
        Commands::Build {
            manifest,
            db,
            no_materialise,
        } => {
            let manifest: BuildManifest = serde_json::from_str(&fs::read_to_string(&manifest)?)?;
            let engine = open_engine(db, &settings)?;
            let store: Arc<dyn FileStore> =
                Arc::new(LocalFileStore::new(settings.file_store.resolved_root()?));

            let mut build_settings = settings.build.clone();
            if no_materialise {
                build_settings.materialise_views = false;
            }
            let materialise = build_settings.materialise_views;
            let builder = CubeBuilder::new(engine, store, build_settings);

            let dataset = Arc::new(manifest.dataset);
            let outcome = builder
                .build_cube(dataset.clone(), manifest.end_revision_id)
                .await?;
            println!(
                "build {} -> schema {} ({:?})",
                outcome.build_id, outcome.schema, outcome.state
            );
            if let Some(tasks) = &outcome.tasks {
                println!(
                    "dimension update tasks: {} (measure: {})",
                    tasks.dimensions.len(),
                    tasks.measure.is_some()
                );
            }
            if materialise {
                builder
                    .materialise(dataset, manifest.end_revision_id)
                    .await?;
                println!("materialised");
            }
            Ok(())
        }

        Commands::Export {
            db,
            revision,
            format,
            lang,
            output,
        } => {
            let engine = open_engine(Some(db), &settings)?;
            let format: OutputFormat = format.into();
            let locale: Locale = lang.into();
            let schema = revision.to_string();
            let path = output
                .unwrap_or_else(|| PathBuf::from(format!("{revision}.{}", format.extension())));

            let options = SelectOptions::default();
            match format {
                OutputFormat::Parquet => {
                    let path = path.to_string_lossy().into_owned();
                    output::export_parquet(&engine, &schema, locale, &path).await?;
                }
                _ => {
                    let base =
                        output::resolve_view_query(&engine, &schema, locale, &options).await?;
                    let mut cursor =
                        ViewCursor::new(engine.clone(), base, settings.output.export_page_size);
                    let file = fs::File::create(&path)?;
                    match format {
                        OutputFormat::Csv => {
                            output::csv::write_csv(&mut cursor, file).await?;
                        }
                        OutputFormat::Json => {
                            output::json::write_json(&mut cursor, file).await?;
                        }
                        OutputFormat::Excel => {
                            output::xlsx::write_workbook(&mut cursor, file).await?;
                        }
                        OutputFormat::Parquet => unreachable!("handled above"),
                    }
                }
            }
            println!("wrote {}", path.display());
            Ok(())
        }

        Commands::Preview {
            db,
            revision,
            lang,
            page,
            page_size,
        } => {
            let engine = open_engine(Some(db), &settings)?;
            let page = output::preview::preview(
                &engine,
                &revision.to_string(),
                lang.into(),
                &SelectOptions::default(),
                page,
                page_size.unwrap_or(settings.output.preview_page_size),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
    }
}

fn open_engine(
    db: Option<PathBuf>,
    settings: &Settings,
) -> Result<Arc<dyn SqlEngine>, Box<dyn std::error::Error>> {
    let engine = match db {
        Some(path) => DuckDbEngine::open(path)?,
        None => {
            let conn = settings.backend.resolved_connection_string()?;
            if conn == ":memory:" {
                DuckDbEngine::open_in_memory()?
            } else {
                DuckDbEngine::open(conn)?
            }
        }
    };
    Ok(Arc::new(engine))
}
