use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;

use super::{decode_json, fetch_body, parse_date};
use crate::data_source::{QuoteFuture, QuoteSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{MarketClock, ProviderId, Quote, ValidationError};

const BASE_URL: &str = "https://developer.am.mufg.jp/fund_information_latest";

/// Which MUFG identifier a code is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeType {
    Fund,
    AssociationFund,
    Isin,
}

impl CodeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fund => "fund_cd",
            Self::AssociationFund => "association_fund_cd",
            Self::Isin => "isin_cd",
        }
    }

    /// Split an optional `type:` prefix off `code`. Bare codes are fund codes.
    pub fn split(code: &str) -> Result<(Self, &str), ValidationError> {
        match code.split_once(':') {
            Some((code_type, rest)) => Ok((code_type.parse()?, rest)),
            None => Ok((Self::Fund, code)),
        }
    }
}

impl Display for CodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fund_cd" => Ok(Self::Fund),
            "association_fund_cd" => Ok(Self::AssociationFund),
            "isin_cd" => Ok(Self::Isin),
            other => Err(ValidationError::InvalidCodeType {
                value: other.to_owned(),
            }),
        }
    }
}

/// MUFG Asset Management fund information API.
///
/// Codes are `fund_cd` values, or any identifier prefixed with its type:
/// `association_fund_cd:0331418A`, `isin_cd:JP90C000H1T1`.
#[derive(Clone)]
pub struct AmmufgAdapter {
    http_client: Arc<dyn HttpClient>,
    clock: MarketClock,
    timeout_ms: u64,
}

impl AmmufgAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            clock: MarketClock::tokyo(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_clock(mut self, clock: MarketClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn endpoint(code_type: CodeType, code: &str) -> String {
        format!("{BASE_URL}/{code_type}/{}", urlencoding::encode(code))
    }
}

impl QuoteSource for AmmufgAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Ammufg
    }

    fn latest<'a>(&'a self, code: &'a str) -> QuoteFuture<'a> {
        Box::pin(async move {
            let (code_type, code) = CodeType::split(code).map_err(SourceError::invalid_identifier)?;
            if code.trim().is_empty() {
                return Err(SourceError::invalid_identifier(
                    ValidationError::InvalidFetchId {
                        value: format!("ammufg:{code_type}:"),
                    },
                ));
            }

            let request =
                HttpRequest::get(Self::endpoint(code_type, code)).with_timeout_ms(self.timeout_ms);
            let body = fetch_body(self.http_client.as_ref(), self.id(), request).await?;
            let info: FundInformation = decode_json(self.id(), &body)?;
            let dataset = info.into_dataset()?;

            let date = parse_date(
                self.id(),
                "base_date",
                &dataset.base_date,
                format_description!("[year][month][day]"),
            )?;
            Ok(Quote::new(
                self.clock.close_of(date),
                dataset.cancellation_price,
                dataset.netassets,
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct FundInformation {
    #[serde(default)]
    result: ResultHeader,
    #[serde(default)]
    errors: ErrorSummary,
    #[serde(default)]
    datasets: Vec<Dataset>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResultHeader {
    errcd: String,
    errmsg: String,
    retcount: i64,
    status: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorSummary {
    count: i64,
    error_list: Vec<ErrorEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorEntry {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Dataset {
    base_date: String,
    cancellation_price: i64,
    #[serde(default)]
    netassets: Option<i64>,
}

impl FundInformation {
    fn into_dataset(self) -> Result<Dataset, SourceError> {
        if self.result.status != 200 || self.errors.count != 0 {
            return Err(SourceError::business(self.failure_message()));
        }
        self.datasets
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::parse("ammufg: no datasets available in API response"))
    }

    fn failure_message(&self) -> String {
        if !self.result.errmsg.is_empty() {
            return format!("{} (code: {})", self.result.errmsg, self.result.errcd);
        }
        if !self.errors.error_list.is_empty() {
            return self
                .errors
                .error_list
                .iter()
                .map(|entry| format!("{} (code: {})", entry.message, entry.code))
                .collect::<Vec<_>>()
                .join(", ");
        }
        format!(
            "failed something status:{} retcount:{} errors.count:{}",
            self.result.status, self.result.retcount, self.errors.count
        )
    }
}
