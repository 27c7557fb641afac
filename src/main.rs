// src/main.rs
mod analysis;
mod config;
mod extractors;
mod fetch;
mod pipelines;
mod records;
mod run_log;
mod storage;
mod transform;
mod utils;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use config::{JobConfig, Source, SqlTarget};
use pipelines::csv_load::{CollectionTarget, CsvLoadOptions};
use pipelines::gdp::GdpOptions;
use pipelines::market_cap::MarketCapOptions;
use records::ColumnSpec;
use storage::{DocumentStore, SqlDatabase};
use utils::{AppError, LogSeparator, ProgressLog};

const BANKS_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";
const GDP_URL: &str =
    "https://web.archive.org/web/20230902185326/https://en.wikipedia.org/wiki/List_of_countries_by_GDP_%28nominal%29";

/// Small ETL jobs: scrape or read tabular data, convert it and load it into CSV, SQLite or a document store
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug-level diagnostics (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Largest banks by market capitalization, with GBP/EUR/INR columns
    MarketCap(MarketCapArgs),
    /// Countries by nominal GDP in billions of USD
    Gdp(GdpArgs),
    /// Merge CSV/JSON/XML height and weight files into one metric CSV
    Measurements(MeasurementsArgs),
    /// Load a local CSV file into a SQLite table
    CsvToDb(CsvToDbArgs),
    /// Run SQL statements against a SQLite database
    Query(QueryArgs),
    /// Record the start of an automation run
    RunStart(RunStartArgs),
    /// Record the end of an automation run
    RunFinish(RunFinishArgs),
    /// Insert one document per CSV record into a collection
    CsvToDocs(CsvToDocsArgs),
    /// Summarize a collection and store the summary
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct MarketCapArgs {
    /// Page URL or local HTML file
    #[arg(long, env = "BANKS_SOURCE", default_value = BANKS_URL)]
    source: Source,

    /// `id` of the heading anchor that precedes the table
    #[arg(long, env = "BANKS_HEADING_ID", default_value = "By_market_capitalization")]
    heading_id: String,

    #[arg(long, env = "BANKS_RATES", default_value = "exchange_rate.csv")]
    rates: PathBuf,

    /// Comma-separated currency codes
    #[arg(long, env = "BANKS_CURRENCIES", default_value = "GBP,EUR,INR", value_delimiter = ',')]
    currencies: Vec<String>,

    /// Comma-separated columns to keep, in order (empty keeps all)
    #[arg(long, env = "BANKS_COLUMNS", default_value = "Bank name,MC_USD_Billion")]
    columns: ColumnSpec,

    #[arg(long, env = "BANKS_CSV", default_value = "./Largest_banks_data.csv")]
    csv: PathBuf,

    #[arg(long, env = "BANKS_DB", default_value = "Banks.db")]
    db: PathBuf,

    #[arg(long, env = "BANKS_TABLE", default_value = "Largest_banks")]
    table: String,

    #[arg(long, env = "BANKS_LOG", default_value = "code_log.txt")]
    log: PathBuf,

    /// Statements to run after loading (repeatable)
    #[arg(long = "query")]
    queries: Vec<String>,
}

#[derive(Args, Debug)]
struct GdpArgs {
    #[arg(long, env = "GDP_SOURCE", default_value = GDP_URL)]
    source: Source,

    /// Zero-based index of the table body holding the data
    #[arg(long, env = "GDP_BODY_INDEX", default_value_t = 2)]
    body_index: usize,

    #[arg(long, env = "GDP_COLUMNS", default_value = "Country,GDP_USD_billions")]
    columns: ColumnSpec,

    #[arg(long, env = "GDP_CSV", default_value = "./Countries_by_GDP.csv")]
    csv: PathBuf,

    #[arg(long, env = "GDP_DB", default_value = "World_Economies.db")]
    db: PathBuf,

    #[arg(long, env = "GDP_TABLE", default_value = "Countries_by_GDP")]
    table: String,

    #[arg(long, env = "GDP_LOG", default_value = "./etl_project_log.txt")]
    log: PathBuf,

    #[arg(long = "query")]
    queries: Vec<String>,
}

#[derive(Args, Debug)]
struct MeasurementsArgs {
    /// Directory holding the source files
    #[arg(long, env = "MEASUREMENTS_DIR", default_value = ".")]
    dir: PathBuf,

    #[arg(long, env = "MEASUREMENTS_COLUMNS", default_value = "name,height,weight")]
    columns: ColumnSpec,

    #[arg(long, env = "MEASUREMENTS_OUTPUT", default_value = "transformed_data.csv")]
    output: PathBuf,

    #[arg(long, env = "MEASUREMENTS_LOG", default_value = "log_file.txt")]
    log: PathBuf,
}

#[derive(Args, Debug)]
struct CsvToDbArgs {
    /// CSV file to load
    input: PathBuf,

    /// Column names for a headerless file, comma separated
    #[arg(long, value_delimiter = ',')]
    headers: Option<Vec<String>>,

    #[arg(long, env = "CSV_DB", default_value = "STAFF.db")]
    db: PathBuf,

    #[arg(long, env = "CSV_TABLE", default_value = "INSTRUCTOR")]
    table: String,

    /// Append to the table instead of replacing it
    #[arg(long)]
    append: bool,

    #[arg(long, env = "CSV_LOG", default_value = "load_log.txt")]
    log: PathBuf,

    #[arg(long = "query")]
    queries: Vec<String>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long, env = "QUERY_DB", default_value = "STAFF.db")]
    db: PathBuf,

    /// SQL statements, run in order
    #[arg(required = true)]
    statements: Vec<String>,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Document store file
    #[arg(long, env = "DOC_STORE", default_value = "documents.db")]
    store: PathBuf,
}

#[derive(Args, Debug)]
struct RunStartArgs {
    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, env = "RUN_COLLECTION", default_value = "bitacora")]
    collection: String,

    /// Name of the automation being logged
    #[arg(long, env = "RUN_NAME", default_value = "Bitacora_NoSQL")]
    name: String,
}

#[derive(Args, Debug)]
struct RunFinishArgs {
    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, env = "RUN_COLLECTION", default_value = "bitacora")]
    collection: String,

    /// Id printed by `run-start`
    id: String,

    /// Mark the run as failed
    #[arg(long)]
    failed: bool,
}

#[derive(Args, Debug)]
struct CsvToDocsArgs {
    #[command(flatten)]
    store: StoreArgs,

    input: PathBuf,

    #[arg(long, env = "DOCS_COLLECTION", default_value = "usuarios")]
    collection: String,

    #[arg(long, env = "DOCS_LOG", default_value = "load_log.txt")]
    log: PathBuf,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    store: StoreArgs,

    #[arg(long, env = "ANALYZE_SOURCE", default_value = "usuarios")]
    collection: String,

    #[arg(long, env = "ANALYZE_TARGET", default_value = "analisis_usuarios")]
    target: String,

    /// Fields to count documents by
    #[arg(long, value_delimiter = ',', default_value = "Ciudad,Tipo_Pago")]
    count_by: Vec<String>,

    /// Fields to total `sum_field` by
    #[arg(long, value_delimiter = ',', default_value = "Producto")]
    sum_by: Vec<String>,

    #[arg(long, default_value = "Total")]
    sum_field: String,

    /// Field whose largest total is reported
    #[arg(long, default_value = "Ciudad")]
    top_by: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    utils::logging::setup_logging(cli.verbose);
    tracing::debug!("Parsed arguments: {:?}", cli);

    match cli.command {
        Command::MarketCap(args) => {
            let config = JobConfig {
                source: args.source,
                csv_output: Some(args.csv),
                sql: Some(SqlTarget {
                    path: args.db,
                    table: args.table.clone(),
                }),
                columns: args.columns,
                log: ProgressLog::new(args.log, LogSeparator::Colon),
            };
            let queries = if args.queries.is_empty() {
                vec![
                    format!("SELECT * FROM {}", args.table),
                    format!("SELECT AVG(MC_GBP_Billion) FROM {}", args.table),
                    format!("SELECT [Bank name] FROM {} LIMIT 5", args.table),
                ]
            } else {
                args.queries
            };
            let options = MarketCapOptions {
                heading_id: args.heading_id,
                rates_path: args.rates,
                currencies: args.currencies,
                queries,
            };
            let records = pipelines::market_cap::run(&config, &options).await?;
            tracing::info!("Market capitalization job finished with {} banks", records.len());
        }
        Command::Gdp(args) => {
            let config = JobConfig {
                source: args.source,
                csv_output: Some(args.csv),
                sql: Some(SqlTarget {
                    path: args.db,
                    table: args.table.clone(),
                }),
                columns: args.columns,
                log: ProgressLog::new(args.log, LogSeparator::Colon),
            };
            let queries = if args.queries.is_empty() {
                vec![format!("SELECT * FROM {} WHERE GDP_USD_billions >= 100", args.table)]
            } else {
                args.queries
            };
            let options = GdpOptions {
                rows: extractors::LinkedRowOptions {
                    body_index: args.body_index,
                    ..Default::default()
                },
                queries,
            };
            let records = pipelines::gdp::run(&config, &options).await?;
            tracing::info!("GDP job finished with {} countries", records.len());
        }
        Command::Measurements(args) => {
            let config = JobConfig {
                source: Source::Path(args.dir),
                csv_output: Some(args.output),
                sql: None,
                columns: args.columns,
                log: ProgressLog::new(args.log, LogSeparator::Comma),
            };
            let records = pipelines::measurements::run(&config)?;
            tracing::info!("Measurements job wrote {} records", records.len());
        }
        Command::CsvToDb(args) => {
            let config = JobConfig {
                source: Source::Path(args.input),
                csv_output: None,
                sql: Some(SqlTarget {
                    path: args.db,
                    table: args.table,
                }),
                columns: ColumnSpec::all(),
                log: ProgressLog::new(args.log, LogSeparator::Colon),
            };
            let options = CsvLoadOptions {
                headers: args.headers,
                append: args.append,
                queries: args.queries,
            };
            pipelines::csv_load::csv_to_db(&config, &options)?;
        }
        Command::Query(args) => {
            let db = SqlDatabase::open(&args.db)?;
            pipelines::run_queries(&db, &args.statements)?;
            db.close()?;
        }
        Command::RunStart(args) => {
            let store = DocumentStore::open(&args.store.store)?;
            let id = run_log::start_run(&store, &args.collection, &args.name)?;
            store.close()?;
            println!("{}", id);
        }
        Command::RunFinish(args) => {
            let store = DocumentStore::open(&args.store.store)?;
            let run = run_log::finish_run(&store, &args.collection, &args.id, !args.failed)?;
            store.close()?;
            println!(
                "{} finished: {:?} in {:.3}s",
                run.name,
                run.status,
                run.duration_seconds.unwrap_or_default()
            );
        }
        Command::CsvToDocs(args) => {
            let config = JobConfig {
                source: Source::Path(args.input),
                csv_output: None,
                sql: None,
                columns: ColumnSpec::all(),
                log: ProgressLog::new(args.log, LogSeparator::Colon),
            };
            let target = CollectionTarget {
                path: args.store.store,
                collection: args.collection,
            };
            let load = pipelines::csv_load::csv_to_docs(&config, &target)?;
            println!(
                "Read {} records; {} now holds {} documents",
                load.records_read, target.collection, load.collection_size
            );
        }
        Command::Analyze(args) => {
            let store = DocumentStore::open(&args.store.store)?;
            let plan = analysis::AnalysisPlan {
                count_by: args.count_by,
                sum_by: args.sum_by,
                sum_field: args.sum_field,
                top_by: args.top_by.filter(|field| !field.is_empty()),
            };
            let (id, summary) = analysis::run_analysis(&store, &args.collection, &args.target, &plan)?;
            store.close()?;

            let rendered = serde_json::to_string_pretty(&summary)
                .map_err(|e| utils::error::StorageError::SerializationError(e.to_string()))?;
            println!("{}\nStored as {} in {}", rendered, id, args.target);
        }
    }

    Ok(())
}
