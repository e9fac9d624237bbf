//! CLI argument definitions for funddb.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `database init-schema` | Create tables and indexes |
//! | `fund import` | Upsert funds from TSV files |
//! | `fund list` / `add` / `modify` / `delete` | Maintain the fund registry |
//! | `price fetch-latest` | Fetch latest quotes and store them |
//! | `price fetch-test` | Fetch latest quotes and print them |
//! | `price list` | Print stored prices of a fund |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--dbfile` | `$FUNDDB_HOME/fund.duckdb` | Database file (`FUNDDB_DBFILE`) |
//! | `--showsql` | `false` | Log every SQL statement |
//! | `--verbose` | `false` | Debug logging |
//! | `--timeout-ms` | `30000` | Per-fund fetch timeout (`FUNDDB_TIMEOUT_MS`) |
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "funddb",
    author,
    version,
    about = "Fund price database",
    long_about = "funddb keeps a local history of investment fund prices. Funds are \
registered with a fetch identifier (scheme:code) naming the provider to ask for \
their latest quote.\n\
\n\
Supported schemes: ammufg, fidelity, tokiomarineam, pictet."
)]
pub struct Cli {
    /// Database file. Defaults to fund.duckdb under $FUNDDB_HOME or ~/.funddb.
    #[arg(long, global = true, env = "FUNDDB_DBFILE")]
    pub dbfile: Option<PathBuf>,

    /// Log every SQL statement.
    #[arg(long, global = true, default_value_t = false)]
    pub showsql: bool,

    /// Enable debug logging.
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    /// Per-fund fetch timeout in milliseconds.
    #[arg(long, global = true, env = "FUNDDB_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for terminal display.
    Table,
    /// Single JSON object output.
    Json,
    /// Newline-delimited JSON (one record per line).
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Operate the database.
    Database(DatabaseArgs),

    /// Operate funds.
    Fund(FundArgs),

    /// Operate prices.
    Price(PriceArgs),
}

#[derive(Debug, Args)]
pub struct DatabaseArgs {
    #[command(subcommand)]
    pub command: DatabaseCommand,
}

#[derive(Debug, Subcommand)]
pub enum DatabaseCommand {
    /// Create tables and indexes. Safe to run more than once.
    InitSchema,
}

#[derive(Debug, Args)]
pub struct FundArgs {
    #[command(subcommand)]
    pub command: FundCommand,
}

#[derive(Debug, Subcommand)]
pub enum FundCommand {
    /// Import funds from TSV files (id, name, url, fetch_id).
    ///
    /// Lines starting with '#' are ignored. Existing funds are updated.
    /// All files are imported in one transaction.
    ///
    /// # Examples
    ///
    ///   funddb fund import funds.tsv
    Import(FundImportArgs),

    /// List registered funds.
    List,

    /// Register a fund.
    Add(FundAddArgs),

    /// Change a registered fund.
    Modify(FundModifyArgs),

    /// Delete funds together with their prices.
    Delete(FundDeleteArgs),
}

#[derive(Debug, Args)]
pub struct FundImportArgs {
    /// TSV files to import.
    #[arg(required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FundAddArgs {
    pub id: String,
    pub name: String,
    pub url: String,

    /// Fetch identifier, e.g. ammufg:253425.
    #[arg(long)]
    pub fetch_id: Option<String>,
}

#[derive(Debug, Args)]
pub struct FundModifyArgs {
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    /// New fetch identifier.
    #[arg(long, conflicts_with = "clear_fetch_id")]
    pub fetch_id: Option<String>,

    /// Remove the fetch identifier so the fund is no longer synchronized.
    #[arg(long, default_value_t = false)]
    pub clear_fetch_id: bool,
}

#[derive(Debug, Args)]
pub struct FundDeleteArgs {
    /// Fund ids. Nothing is deleted unless every id exists.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PriceArgs {
    #[command(subcommand)]
    pub command: PriceCommand,
}

#[derive(Debug, Subcommand)]
pub enum PriceCommand {
    /// Fetch the latest price of funds and store it.
    ///
    /// Without ids every registered fund is fetched. Funds without a fetch
    /// identifier are skipped.
    ///
    /// # Examples
    ///
    ///   funddb price fetch-latest
    ///   funddb price fetch-latest 253425 0331109C --abort-on-fetch-error
    FetchLatest(FetchLatestArgs),

    /// Fetch the latest price of funds and print it without storing.
    FetchTest(FetchTestArgs),

    /// Print stored prices of a fund, newest first.
    List(PriceListArgs),
}

#[derive(Debug, Args)]
pub struct FetchLatestArgs {
    /// Restrict the run to these fund ids.
    pub ids: Vec<String>,

    /// Stop and roll back on the first fund whose fetch fails.
    #[arg(long, default_value_t = false)]
    pub abort_on_fetch_error: bool,

    /// Number of funds loaded per window.
    #[arg(long, default_value_t = funddb_core::sync::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(Debug, Args)]
pub struct FetchTestArgs {
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PriceListArgs {
    pub id: String,

    /// Maximum number of prices to print.
    #[arg(long)]
    pub limit: Option<usize>,
}
