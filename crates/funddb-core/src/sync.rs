//! Batched synchronization of the fund registry with provider quotes.
//!
//! A run walks the registry in fixed-size windows ordered by fund id,
//! fetches one quote per fund through the [`AdapterRegistry`] and reconciles
//! it with the stored price for that fund and date. The whole run is one
//! transaction.

use std::sync::Arc;
use std::time::Duration;

use funddb_warehouse::{FundRecord, Session, UpsertOutcome, Warehouse, WarehouseError};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::data_source::{SourceError, SourceErrorKind};
use crate::registry::{AdapterRegistry, FetchContext};
use crate::{Quote, ValidationError};

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What a run does when fetching one fund's quote fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorPolicy {
    /// Log the failure and continue with the next fund.
    #[default]
    Skip,
    /// Stop the run and roll back everything written so far.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub fetch_timeout: Duration,
    pub on_fetch_error: FetchErrorPolicy,
}

impl SyncConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_fetch_error_policy(mut self, policy: FetchErrorPolicy) -> Self {
        self.on_fetch_error = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        if self.fetch_timeout.is_zero() {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            on_fetch_error: FetchErrorPolicy::default(),
        }
    }
}

/// A fund whose quote could not be fetched during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub fund_id: String,
    pub fetch_id: String,
    pub code: &'static str,
    pub message: String,
}

/// Counters of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Funds matched by the filter.
    pub targets: usize,
    /// Offsets of the windows that were loaded.
    pub windows: Vec<usize>,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Funds without a fetch identifier.
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FetchFailure>,
}

impl SyncReport {
    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            targets = self.targets,
            windows = self.windows.len(),
            inserted = self.inserted,
            updated = self.updated,
            unchanged = self.unchanged,
            skipped = self.skipped,
            failed = self.failed,
            "price sync finished"
        );
    }
}

/// A quote fetched without being stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewQuote {
    pub fund_id: String,
    pub fetch_id: String,
    pub date: String,
    #[serde(flatten)]
    pub quote: Quote,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("price sync cancelled")]
    Cancelled,

    #[error("failed to fetch {fetch_id} for fund {fund_id}: {source}")]
    Fetch {
        fund_id: String,
        fetch_id: String,
        #[source]
        source: SourceError,
    },

    #[error("no funds found for id: {fund_id}")]
    UnknownFund { fund_id: String },
}

/// Runs price synchronization against one warehouse.
pub struct SyncEngine {
    registry: Arc<AdapterRegistry>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(registry: Arc<AdapterRegistry>, config: SyncConfig) -> Self {
        Self { registry, config }
    }

    /// Fetch the latest quote of every targeted fund and store it.
    ///
    /// `fund_ids` restricts the run to those funds; ids that are not
    /// registered are ignored. An empty slice targets the whole registry.
    /// Nothing is committed unless the run completes.
    pub async fn fetch_latest(
        &self,
        warehouse: &Warehouse,
        fund_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        self.config.validate()?;
        let session = warehouse.begin()?;
        let result = self.run(&session, fund_ids, cancel).await;
        session.finish(result)
    }

    async fn run(
        &self,
        session: &Session,
        fund_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let ctx = FetchContext::new(cancel.clone(), self.config.fetch_timeout);
        let batch_size = self.config.batch_size;

        let mut report = SyncReport {
            targets: session.count_funds(fund_ids)?,
            ..SyncReport::default()
        };
        tracing::debug!(targets = report.targets, batch_size, "price sync started");

        let mut offset = 0;
        while offset < report.targets {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let page = session.fund_page(fund_ids, batch_size, offset)?;
            if page.is_empty() {
                break;
            }
            tracing::debug!(offset, funds = page.len(), "fund window loaded");
            report.windows.push(offset);

            for fund in &page {
                self.sync_fund(session, fund, &ctx, &mut report).await?;
            }
            offset += batch_size;
        }

        report.log_summary();
        Ok(report)
    }

    async fn sync_fund(
        &self,
        session: &Session,
        fund: &FundRecord,
        ctx: &FetchContext,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let Some(fetch_id) = fetch_id_of(fund) else {
            tracing::debug!(fund_id = %fund.id, "no fetch id, skipped");
            report.skipped += 1;
            return Ok(());
        };

        let quote = match self.registry.fetch(fetch_id, ctx).await {
            Ok(quote) => quote,
            Err(error) => return self.handle_fetch_error(fund, fetch_id, error, report),
        };

        let outcome = session.upsert_price(&quote.to_price_record(&fund.id))?;
        tracing::info!(
            fund_id = %fund.id,
            fetch_id,
            date = %quote.date(),
            price = quote.price,
            outcome = %outcome,
            "price stored"
        );
        report.record(outcome);
        Ok(())
    }

    fn handle_fetch_error(
        &self,
        fund: &FundRecord,
        fetch_id: &str,
        error: SourceError,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        if error.kind() == SourceErrorKind::Cancelled {
            return Err(SyncError::Cancelled);
        }

        match self.config.on_fetch_error {
            FetchErrorPolicy::Abort => Err(SyncError::Fetch {
                fund_id: fund.id.clone(),
                fetch_id: fetch_id.to_owned(),
                source: error,
            }),
            FetchErrorPolicy::Skip => {
                tracing::warn!(
                    fund_id = %fund.id,
                    fetch_id,
                    code = error.code(),
                    error = error.message(),
                    "failed to fetch price, skipped"
                );
                report.failed += 1;
                report.failures.push(FetchFailure {
                    fund_id: fund.id.clone(),
                    fetch_id: fetch_id.to_owned(),
                    code: error.code(),
                    message: error.message().to_owned(),
                });
                Ok(())
            }
        }
    }

    /// Fetch quotes for `fund_ids` without writing anything.
    ///
    /// Unlike [`fetch_latest`](Self::fetch_latest), an unknown fund or any
    /// failed fetch ends the call with an error.
    pub async fn preview(
        &self,
        warehouse: &Warehouse,
        fund_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PreviewQuote>, SyncError> {
        self.config.validate()?;
        let funds = warehouse.transaction(|session| {
            fund_ids
                .iter()
                .map(|id| {
                    session.get_fund(id)?.ok_or_else(|| SyncError::UnknownFund {
                        fund_id: id.clone(),
                    })
                })
                .collect::<Result<Vec<_>, SyncError>>()
        })?;

        let ctx = FetchContext::new(cancel.clone(), self.config.fetch_timeout);
        let mut quotes = Vec::with_capacity(funds.len());
        for fund in funds {
            let fetch_id = fund.fetch_id.clone().unwrap_or_default();
            let quote = match self.registry.fetch(&fetch_id, &ctx).await {
                Ok(quote) => quote,
                Err(error) if error.kind() == SourceErrorKind::Cancelled => {
                    return Err(SyncError::Cancelled);
                }
                Err(source) => {
                    return Err(SyncError::Fetch {
                        fund_id: fund.id,
                        fetch_id,
                        source,
                    });
                }
            };
            quotes.push(PreviewQuote {
                date: quote.date_key(),
                fund_id: fund.id,
                fetch_id,
                quote,
            });
        }
        Ok(quotes)
    }
}

fn fetch_id_of(fund: &FundRecord) -> Option<&str> {
    fund.fetch_id
        .as_deref()
        .map(str::trim)
        .filter(|fetch_id| !fetch_id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingHttpClient;
    use funddb_warehouse::WarehouseConfig;

    const MUFG_LATEST: &str = r#"{
        "result": {"status": 200, "retcount": 1},
        "errors": {"count": 0},
        "datasets": [{"base_date": "20240624", "cancellation_price": 17203, "netassets": 34666889549}]
    }"#;

    fn warehouse(dir: &tempfile::TempDir) -> Warehouse {
        let warehouse =
            Warehouse::open(WarehouseConfig::at(dir.path().join("fund.duckdb"))).expect("open");
        warehouse.initialize().expect("schema");
        warehouse
    }

    fn engine(client: Arc<RecordingHttpClient>, config: SyncConfig) -> SyncEngine {
        let registry = AdapterRegistry::builder().with_http_client(client).build();
        SyncEngine::new(Arc::new(registry), config)
    }

    fn add_fund(warehouse: &Warehouse, id: &str, fetch_id: Option<&str>) {
        let fund = FundRecord::new(
            id,
            format!("fund {id}"),
            format!("https://funds.test/{id}"),
            fetch_id.map(str::to_owned),
        );
        warehouse
            .transaction(|session| session.insert_fund(&fund))
            .expect("insert fund");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = SyncConfig::default().with_batch_size(0);
        assert_eq!(config.validate(), Err(ValidationError::InvalidBatchSize));
    }

    #[tokio::test]
    async fn stores_quote_under_the_fund_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let warehouse = warehouse(&dir);
        add_fund(&warehouse, "emaxis-slim-allcountry", Some("ammufg:253425"));
        let engine = engine(Arc::new(RecordingHttpClient::ok(MUFG_LATEST)), SyncConfig::default());

        let report = engine
            .fetch_latest(&warehouse, &[], &CancellationToken::new())
            .await
            .expect("sync");

        assert_eq!(report.inserted, 1);
        let price = warehouse
            .transaction(|session| session.get_price("emaxis-slim-allcountry", "2024-06-24"))
            .expect("read")
            .expect("row");
        assert_eq!(price.value, 17203);
        assert_eq!(price.net_assets, Some(34_666_889_549));
    }

    #[tokio::test]
    async fn blank_fetch_id_is_skipped_without_requests() {
        let dir = tempfile::tempdir().expect("tempdir");
        let warehouse = warehouse(&dir);
        add_fund(&warehouse, "A", None);
        let client = Arc::new(RecordingHttpClient::ok(MUFG_LATEST));
        let engine = engine(client.clone(), SyncConfig::default());

        let report = engine
            .fetch_latest(&warehouse, &[], &CancellationToken::new())
            .await
            .expect("sync");

        assert_eq!(report.skipped, 1);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn preview_does_not_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let warehouse = warehouse(&dir);
        add_fund(&warehouse, "253425", Some("ammufg:253425"));
        let engine = engine(Arc::new(RecordingHttpClient::ok(MUFG_LATEST)), SyncConfig::default());

        let quotes = engine
            .preview(&warehouse, &[String::from("253425")], &CancellationToken::new())
            .await
            .expect("preview");

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].date, "2024-06-24");
        assert_eq!(quotes[0].quote.price, 17203);
        let stored = warehouse
            .transaction(|session| session.count_prices("253425"))
            .expect("count");
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn preview_rejects_unknown_fund() {
        let dir = tempfile::tempdir().expect("tempdir");
        let warehouse = warehouse(&dir);
        let engine = engine(Arc::new(RecordingHttpClient::ok(MUFG_LATEST)), SyncConfig::default());

        let error = engine
            .preview(&warehouse, &[String::from("nope")], &CancellationToken::new())
            .await
            .expect_err("must fail");

        assert!(matches!(error, SyncError::UnknownFund { fund_id } if fund_id == "nope"));
    }
}
