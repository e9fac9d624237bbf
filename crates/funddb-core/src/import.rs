//! Fund registry import from tab separated files.
//!
//! Each line is `id <TAB> name <TAB> url [<TAB> fetch_id]`. Lines starting
//! with `#` are comments. Fields are trimmed and an empty fetch id is stored
//! as absent.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use funddb_warehouse::{FundRecord, UpsertOutcome, Warehouse, WarehouseError};
use serde::Serialize;
use thiserror::Error;

const MIN_FIELDS: usize = 3;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("{origin}:{line}: few fields, require 3 at least but found {found}")]
    TooFewFields {
        origin: String,
        line: u64,
        found: usize,
    },

    #[error("{origin}:{line}: fund id cannot be empty")]
    EmptyFundId { origin: String, line: u64 },

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Funds written by one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub files: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Parse fund rows from `reader`. `origin` names the input in errors.
pub fn parse_funds<R: Read>(reader: R, origin: &str) -> Result<Vec<FundRecord>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut funds = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| ImportError::Csv {
            origin: origin.to_owned(),
            source,
        })?;
        funds.push(fund_from_record(&record, origin)?);
    }
    Ok(funds)
}

fn fund_from_record(record: &StringRecord, origin: &str) -> Result<FundRecord, ImportError> {
    let line = record.position().map_or(0, |position| position.line());
    if record.len() < MIN_FIELDS {
        return Err(ImportError::TooFewFields {
            origin: origin.to_owned(),
            line,
            found: record.len(),
        });
    }

    let id = &record[0];
    if id.is_empty() {
        return Err(ImportError::EmptyFundId {
            origin: origin.to_owned(),
            line,
        });
    }
    let fetch_id = record.get(3).map(str::to_owned);
    Ok(FundRecord::new(id, &record[1], &record[2], fetch_id))
}

pub fn read_fund_file(path: &Path) -> Result<Vec<FundRecord>, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_funds(file, &path.display().to_string())
}

/// Upsert every fund of every file in one transaction.
///
/// All files are parsed before the transaction starts, so a malformed file
/// leaves the registry untouched.
pub fn import_files(warehouse: &Warehouse, paths: &[PathBuf]) -> Result<ImportReport, ImportError> {
    let mut funds = Vec::new();
    for path in paths {
        let parsed = read_fund_file(path)?;
        tracing::debug!(path = %path.display(), funds = parsed.len(), "fund file parsed");
        funds.extend(parsed);
    }

    let mut report = ImportReport {
        files: paths.len(),
        ..ImportReport::default()
    };
    warehouse.transaction(|session| {
        for fund in &funds {
            match session.upsert_fund(fund)? {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::Updated | UpsertOutcome::Unchanged => report.updated += 1,
            }
        }
        Ok::<_, ImportError>(())
    })?;

    tracing::info!(
        files = report.files,
        inserted = report.inserted,
        updated = report.updated,
        "funds imported"
    );
    Ok(report)
}
