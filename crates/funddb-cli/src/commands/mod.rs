mod database;
mod fund;
mod price;

use std::fmt::{Display, Formatter};
use std::time::Duration;

use funddb_core::{Warehouse, WarehouseConfig};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Names of the commands leading to the one being run, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPath {
    segments: Vec<&'static str>,
}

impl CommandPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, name: &'static str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name);
        Self { segments }
    }

    pub fn segments(&self) -> &[&'static str] {
        &self.segments
    }
}

impl Display for CommandPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments().join(" "))
    }
}

/// Result of a command, rendered by [`crate::output`].
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub path: CommandPath,
    /// Record fields shown by the table format, in order.
    pub columns: &'static [&'static str],
    pub records: Vec<Value>,
    pub summary: Option<Value>,
}

impl CommandOutput {
    pub fn new(path: CommandPath, columns: &'static [&'static str]) -> Self {
        Self {
            path,
            columns,
            records: Vec::new(),
            summary: None,
        }
    }

    pub fn with_records<T: Serialize>(mut self, records: &[T]) -> Result<Self, CliError> {
        self.records = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn with_summary<T: Serialize>(mut self, summary: &T) -> Result<Self, CliError> {
        self.summary = Some(serde_json::to_value(summary)?);
        Ok(self)
    }
}

/// Settings shared by every command.
pub struct AppContext {
    pub warehouse: Warehouse,
    pub timeout: Duration,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = match &cli.dbfile {
            Some(path) => WarehouseConfig::at(path),
            None => WarehouseConfig::default(),
        }
        .with_show_sql(cli.showsql);
        tracing::debug!(db_path = %config.db_path.display(), "opening database");

        Ok(Self {
            warehouse: Warehouse::open(config)?,
            timeout: Duration::from_millis(cli.timeout_ms),
        })
    }
}

pub async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<CommandOutput, CliError> {
    let app = AppContext::from_cli(cli)?;
    let path = CommandPath::root();

    match &cli.command {
        Command::Database(args) => database::run(&args.command, &app, path.child("database")),
        Command::Fund(args) => fund::run(&args.command, &app, path.child("fund")),
        Command::Price(args) => price::run(&args.command, &app, path.child("price"), cancel).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;

    use super::*;

    async fn run_args(db: &std::path::Path, args: &[&str]) -> Result<CommandOutput, CliError> {
        let mut argv = vec!["funddb", "--dbfile"];
        argv.push(db.to_str().expect("utf-8 path"));
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("valid arguments");
        run(&cli, &CancellationToken::new()).await
    }

    #[test]
    fn path_joins_segments_with_spaces() {
        let path = CommandPath::root().child("fund").child("import");

        assert_eq!(path.segments(), ["fund", "import"]);
        assert_eq!(path.to_string(), "fund import");
        assert_eq!(CommandPath::root().to_string(), "");
    }

    #[tokio::test]
    async fn fund_commands_share_one_database_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("fund.duckdb");

        let schema = run_args(&db, &["database", "init-schema"]).await.expect("schema");
        assert_eq!(schema.path.to_string(), "database init-schema");
        assert!(!schema.records.is_empty());

        run_args(
            &db,
            &["fund", "add", "253425", "eMAXIS Slim", "https://example.com", "--fetch-id", "ammufg:253425"],
        )
        .await
        .expect("add");
        let modified = run_args(&db, &["fund", "modify", "253425", "--clear-fetch-id"])
            .await
            .expect("modify");
        assert_eq!(modified.records[0]["fetch_id"], Value::Null);

        let prices = run_args(&db, &["price", "list", "253425"]).await.expect("prices");
        assert_eq!(prices.summary, Some(json!({"fund_id": "253425", "name": "eMAXIS Slim", "prices": 0})));

        let deleted = run_args(&db, &["fund", "delete", "253425"]).await.expect("delete");
        assert_eq!(deleted.records, vec![json!({"id": "253425", "prices_deleted": 0})]);
        let listed = run_args(&db, &["fund", "list"]).await.expect("list");
        assert!(listed.records.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unknown_fund_keeps_the_others() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("fund.duckdb");
        run_args(&db, &["database", "init-schema"]).await.expect("schema");
        run_args(&db, &["fund", "add", "a", "A", "https://a"]).await.expect("add");

        let error = run_args(&db, &["fund", "delete", "a", "missing"])
            .await
            .expect_err("must fail");

        assert_eq!(error.exit_code(), 4);
        let listed = run_args(&db, &["fund", "list"]).await.expect("list");
        assert_eq!(listed.records.len(), 1);
    }
}
