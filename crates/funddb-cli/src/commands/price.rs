use std::sync::Arc;

use funddb_core::{
    AdapterRegistry, FetchErrorPolicy, SyncConfig, SyncEngine, SyncReport, WarehouseError,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cli::{FetchLatestArgs, FetchTestArgs, PriceCommand, PriceListArgs};
use crate::error::CliError;

use super::{AppContext, CommandOutput, CommandPath};

#[derive(Debug, Serialize)]
struct PriceListSummary<'a> {
    fund_id: &'a str,
    name: &'a str,
    prices: usize,
}

/// Counters of a sync run; failures are listed as records.
#[derive(Debug, Serialize)]
struct FetchSummary<'a> {
    targets: usize,
    windows: &'a [usize],
    inserted: usize,
    updated: usize,
    unchanged: usize,
    skipped: usize,
    failed: usize,
}

impl<'a> From<&'a SyncReport> for FetchSummary<'a> {
    fn from(report: &'a SyncReport) -> Self {
        Self {
            targets: report.targets,
            windows: &report.windows,
            inserted: report.inserted,
            updated: report.updated,
            unchanged: report.unchanged,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

pub async fn run(
    command: &PriceCommand,
    app: &AppContext,
    path: CommandPath,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CliError> {
    match command {
        PriceCommand::FetchLatest(args) => {
            fetch_latest(args, app, path.child("fetch-latest"), cancel).await
        }
        PriceCommand::FetchTest(args) => fetch_test(args, app, path.child("fetch-test"), cancel).await,
        PriceCommand::List(args) => list(args, app, path.child("list")),
    }
}

fn engine(app: &AppContext, config: SyncConfig) -> SyncEngine {
    let timeout_ms = u64::try_from(app.timeout.as_millis()).unwrap_or(u64::MAX);
    let registry = AdapterRegistry::builder()
        .with_request_timeout_ms(timeout_ms)
        .build();
    SyncEngine::new(Arc::new(registry), config.with_fetch_timeout(app.timeout))
}

async fn fetch_latest(
    args: &FetchLatestArgs,
    app: &AppContext,
    path: CommandPath,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, funds = args.ids.len(), "running");
    let policy = if args.abort_on_fetch_error {
        FetchErrorPolicy::Abort
    } else {
        FetchErrorPolicy::Skip
    };
    let config = SyncConfig::default()
        .with_batch_size(args.batch_size)
        .with_fetch_error_policy(policy);

    let report = engine(app, config)
        .fetch_latest(&app.warehouse, &args.ids, cancel)
        .await?;

    CommandOutput::new(path, &["fund_id", "fetch_id", "code", "message"])
        .with_records(&report.failures)?
        .with_summary(&FetchSummary::from(&report))
}

async fn fetch_test(
    args: &FetchTestArgs,
    app: &AppContext,
    path: CommandPath,
    cancel: &CancellationToken,
) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, funds = args.ids.len(), "running");
    let quotes = engine(app, SyncConfig::default())
        .preview(&app.warehouse, &args.ids, cancel)
        .await?;

    CommandOutput::new(path, &["fund_id", "fetch_id", "date", "price", "net_assets"])
        .with_records(&quotes)
}

fn list(args: &PriceListArgs, app: &AppContext, path: CommandPath) -> Result<CommandOutput, CliError> {
    tracing::debug!(command = %path, fund_id = %args.id, "running");
    let (fund, prices) = app.warehouse.transaction(|session| {
        let fund = session
            .get_fund(&args.id)?
            .ok_or_else(|| WarehouseError::NotFound(format!("no funds for id: {}", args.id)))?;
        let prices = session.list_prices(&fund.id, args.limit)?;
        Ok::<_, WarehouseError>((fund, prices))
    })?;

    let summary = PriceListSummary {
        fund_id: &fund.id,
        name: &fund.name,
        prices: prices.len(),
    };
    CommandOutput::new(path, &["date", "value", "net_assets"])
        .with_records(&prices)?
        .with_summary(&summary)
}
