use std::fmt::{Display, Formatter};

use ::duckdb::Row;
use serde::Serialize;

/// A registered fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundRecord {
    /// Primary key chosen by the user (e.g. `253425`).
    pub id: String,
    /// Display name, unique across funds.
    pub name: String,
    /// Information page, unique across funds.
    pub url: String,
    /// `scheme:code` identifier used to fetch quotes. `None` keeps the fund
    /// out of price synchronization.
    pub fetch_id: Option<String>,
}

impl FundRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        fetch_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            fetch_id: fetch_id.filter(|value| !value.trim().is_empty()),
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, ::duckdb::Error> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            fetch_id: row.get(3)?,
        })
    }
}

/// Partial update applied by `Session::modify_fund`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FundChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    /// `Some(None)` clears the fetch identifier.
    pub fetch_id: Option<Option<String>>,
}

impl FundChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.fetch_id.is_none()
    }

    pub(crate) fn apply(&self, fund: &mut FundRecord) {
        if let Some(name) = &self.name {
            fund.name.clone_from(name);
        }
        if let Some(url) = &self.url {
            fund.url.clone_from(url);
        }
        if let Some(fetch_id) = &self.fetch_id {
            fund.fetch_id = fetch_id.clone().filter(|value| !value.trim().is_empty());
        }
    }
}

/// One stored valuation of a fund, keyed by `(fund_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRecord {
    pub fund_id: String,
    /// Calendar date formatted as `YYYY-MM-DD`.
    pub date: String,
    pub value: i64,
    pub net_assets: Option<i64>,
}

impl PriceRecord {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, ::duckdb::Error> {
        Ok(Self {
            fund_id: row.get(0)?,
            date: row.get(1)?,
            value: row.get(2)?,
            net_assets: row.get(3)?,
        })
    }

    /// Whether storing `incoming` over `self` would change anything.
    ///
    /// A missing net assets figure on `incoming` never counts as a change.
    pub fn differs_from(&self, incoming: &PriceRecord) -> bool {
        if self.value != incoming.value {
            return true;
        }
        match incoming.net_assets {
            Some(net_assets) => self.net_assets != Some(net_assets),
            None => false,
        }
    }
}

/// Result of an upsert against a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

impl Display for UpsertOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
