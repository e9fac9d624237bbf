//! # funddb warehouse
//!
//! DuckDB storage for the fund registry and its price history.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `funds` | Registered funds and their fetch identifiers |
//! | `prices` | One valuation per fund and calendar date |
//! | `schema_migrations` | Applied schema versions |
//!
//! All writes go through a [`Session`], which wraps one transaction:
//!
//! ```rust,no_run
//! use funddb_warehouse::{FundRecord, Warehouse, WarehouseConfig, WarehouseError};
//!
//! let warehouse = Warehouse::open(WarehouseConfig::at("fund.duckdb"))?;
//! warehouse.initialize()?;
//! warehouse.transaction(|session| {
//!     session.upsert_fund(&FundRecord::new(
//!         "253425",
//!         "eMAXIS Slim All Country",
//!         "https://emaxis.am.mufg.jp/fund/253425.html",
//!         Some(String::from("ammufg:253425")),
//!     ))
//! })?;
//! # Ok::<(), WarehouseError>(())
//! ```

pub mod duckdb;
pub mod migrations;
pub mod records;
pub mod session;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};
pub use records::{FundChanges, FundRecord, PriceRecord, UpsertOutcome};
pub use session::Session;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    /// A write touched a different number of rows than it must.
    #[error("expected {expected} row {operation} on {table}, but {actual} rows affected")]
    InvariantViolation {
        table: &'static str,
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl WarehouseError {
    pub(crate) const fn invariant(table: &'static str, operation: &'static str, actual: usize) -> Self {
        Self::InvariantViolation {
            table,
            operation,
            expected: 1,
            actual,
        }
    }
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
    /// Log every SQL statement under the `funddb::sql` target.
    pub show_sql: bool,
}

impl WarehouseConfig {
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn with_show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            db_path: resolve_funddb_home().join("fund.duckdb"),
            max_pool_size: 2,
            show_sql: false,
        }
    }
}

/// Handle to the fund database.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with the specified configuration.
    ///
    /// The schema is not touched; call [`Warehouse::initialize`] once per
    /// database file.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        Ok(Self { config, manager })
    }

    /// Create tables and indexes. Returns the migrations applied by this call.
    pub fn initialize(&self) -> Result<Vec<&'static str>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let applied = migrations::apply_migrations(&connection)?;
        tracing::info!(
            db_path = %self.db_path().display(),
            applied = applied.len(),
            "schema initialized"
        );
        Ok(applied)
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Start a transaction.
    pub fn begin(&self) -> Result<Session, WarehouseError> {
        Session::begin(self.manager.acquire()?, self.config.show_sql)
    }

    /// Run `operation` inside one transaction, committing only when it
    /// returns `Ok`.
    pub fn transaction<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        E: From<WarehouseError>,
        F: FnOnce(&Session) -> Result<T, E>,
    {
        let session = self.begin()?;
        let result = operation(&session);
        session.finish(result)
    }
}

/// Resolve the funddb home directory from environment or default.
fn resolve_funddb_home() -> PathBuf {
    if let Some(path) = env::var_os("FUNDDB_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".funddb");
    }

    PathBuf::from(".funddb")
}
