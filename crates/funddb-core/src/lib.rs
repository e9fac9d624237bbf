//! # funddb core
//!
//! Quote sources and price synchronization for the funddb fund database.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (MUFG, Fidelity, Tokio Marine, Pictet) |
//! | [`data_source`] | `QuoteSource` trait and classified source errors |
//! | [`domain`] | Quote, market clock, fetch identifier |
//! | [`error`] | Validation errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`import`] | Fund registry import from TSV files |
//! | [`registry`] | Dispatch of fetch identifiers to adapters |
//! | [`source`] | Provider identifiers |
//! | [`sync`] | Batched, transactional price synchronization |
//!
//! ## Flow
//!
//! ```text
//! funds (warehouse)
//!     │  windows of `batch_size`, ordered by id
//!     ▼
//! AdapterRegistry ── scheme ──▶ QuoteSource ──▶ HttpClient
//!     │
//!     ▼ Quote
//! Session::upsert_price (insert / update / unchanged)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use funddb_core::{AdapterRegistry, SyncConfig, SyncEngine, Warehouse, WarehouseConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let warehouse = Warehouse::open(WarehouseConfig::at("fund.duckdb"))?;
//! warehouse.initialize()?;
//!
//! let engine = SyncEngine::new(Arc::new(AdapterRegistry::default()), SyncConfig::default());
//! let report = engine
//!     .fetch_latest(&warehouse, &[], &CancellationToken::new())
//!     .await?;
//! println!("{} prices inserted", report.inserted);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod import;
pub mod registry;
pub mod source;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use adapters::{
    AmmufgAdapter, CacheBuster, CodeType, FidelityAdapter, PictetAdapter, TokiomarineamAdapter,
};

pub use data_source::{QuoteFuture, QuoteSource, SourceError, SourceErrorKind};

pub use domain::{FetchId, MarketClock, Quote, DEFAULT_CLOSE_HOUR, TOKYO_OFFSET};

pub use error::ValidationError;

pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use import::{import_files, parse_funds, ImportError, ImportReport};

pub use registry::{AdapterRegistry, AdapterRegistryBuilder, FetchContext};

pub use source::ProviderId;

pub use sync::{
    FetchErrorPolicy, FetchFailure, PreviewQuote, SyncConfig, SyncEngine, SyncError, SyncReport,
};

// Warehouse (re-exported from funddb-warehouse)
pub use funddb_warehouse::{
    FundChanges, FundRecord, PriceRecord, Session, UpsertOutcome, Warehouse, WarehouseConfig,
    WarehouseError,
};
