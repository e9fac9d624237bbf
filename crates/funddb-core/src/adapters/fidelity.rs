use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::macros::format_description;

use super::{decode_json, fetch_body, parse_date};
use crate::data_source::{QuoteFuture, QuoteSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{MarketClock, ProviderId, Quote};

const BASE_URL: &str = "https://www.fidelity.co.jp/api/ce/fdh/FundData.json";

/// Fidelity Japan fund data API. The response is a map keyed by fund code.
#[derive(Clone)]
pub struct FidelityAdapter {
    http_client: Arc<dyn HttpClient>,
    clock: MarketClock,
    timeout_ms: u64,
}

impl FidelityAdapter {
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

    fn endpoint(code: &str) -> String {
        format!("{BASE_URL}?id={}&country=jp", urlencoding::encode(code))
    }

    fn normalize(&self, code: &str, data: FundData) -> Result<Quote, SourceError> {
        let date = parse_date(
            self.id(),
            "PriceData.Nav.Date",
            &data.price_data.nav.date,
            format_description!("[year]-[month]-[day]"),
        )?;
        let price = integer_field("PriceData.SellingPrice", &data.price_data.selling_price)?
            .ok_or_else(|| {
                SourceError::parse(format!("fidelity: fund data {code} has no SellingPrice"))
            })?;
        let net_assets = integer_field(
            "HeadFundFacts.TotalNetAsset",
            &data.head_fund_facts.total_net_asset,
        )?;

        Ok(Quote::new(self.clock.close_of(date), price, net_assets))
    }
}

impl QuoteSource for FidelityAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Fidelity
    }

    fn latest<'a>(&'a self, code: &'a str) -> QuoteFuture<'a> {
        Box::pin(async move {
            let request = HttpRequest::get(Self::endpoint(code)).with_timeout_ms(self.timeout_ms);
            let body = fetch_body(self.http_client.as_ref(), self.id(), request).await?;
            let mut funds: HashMap<String, FundData> = decode_json(self.id(), &body)?;
            let data = funds
                .remove(code)
                .ok_or_else(|| SourceError::not_found(format!("fund data {code} not found")))?;
            self.normalize(code, data)
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FundData {
    #[serde(default)]
    head_fund_facts: HeadFundFacts,
    price_data: PriceData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HeadFundFacts {
    #[serde(default)]
    total_net_asset: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PriceData {
    nav: Nav,
    #[serde(default)]
    selling_price: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Nav {
    date: String,
}

/// Read an integral amount sent either as a JSON number or a decimal string.
///
/// `null` and blank strings are absent values. Fractions must be zero.
fn integer_field(field: &str, value: &Value) -> Result<Option<i64>, SourceError> {
    let invalid = || SourceError::parse(format!("fidelity: invalid {field}: {value}"));
    match value {
        Value::Null => Ok(None),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Ok(Some(integer)),
            None => parse_decimal(&number.to_string()).map(Some).ok_or_else(invalid),
        },
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => parse_decimal(text).map(Some).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn parse_decimal(text: &str) -> Option<i64> {
    let cleaned = text.trim().replace(',', "");
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if !fraction.chars().all(|ch| ch == '0') {
        return None;
    }
    whole.parse().ok()
}
