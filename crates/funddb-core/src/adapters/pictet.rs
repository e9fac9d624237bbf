use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use time::{Date, Month};

use super::fetch_body;
use crate::data_source::{QuoteFuture, QuoteSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::{MarketClock, ProviderId, Quote};

const BASE_URL: &str = "https://www.pictet.co.jp/fund";
const SUMMARY_VALUE: &str = ".cmp-funds__fund-summary .cmp-fund__fund-summary-value";

const LABEL_DATE: &str = "基本情報";
const LABEL_PRICE: &str = "基準価額";
const LABEL_NET_ASSETS: &str = "純資産総額";
const MILLION: i64 = 1_000_000;

/// Pictet Japan fund pages. The quote is scraped from the summary box.
#[derive(Clone)]
pub struct PictetAdapter {
    http_client: Arc<dyn HttpClient>,
    clock: MarketClock,
    timeout_ms: u64,
}

impl PictetAdapter {
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
}

impl QuoteSource for PictetAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Pictet
    }

    fn latest<'a>(&'a self, code: &'a str) -> QuoteFuture<'a> {
        Box::pin(async move {
            let url = format!("{BASE_URL}/{}.html", urlencoding::encode(code));
            let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
            let body = fetch_body(self.http_client.as_ref(), self.id(), request).await?;
            parse_summary(&body, self.clock)
        })
    }
}

/// Extract the quote from a fund page.
///
/// Every value sits in an element whose previous sibling element holds its
/// label. All missing or malformed fields are reported in one error.
fn parse_summary(html: &str, clock: MarketClock) -> Result<Quote, SourceError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(SUMMARY_VALUE)
        .map_err(|error| SourceError::internal(format!("pictet: invalid selector: {error}")))?;

    let mut date = None;
    let mut price = None;
    let mut net_assets = None;
    let mut problems = Vec::new();

    for value in document.select(&selector) {
        let Some(label) = previous_element(value) else {
            continue;
        };
        let label = element_text(label);
        let text = element_text(value);

        match label.as_str() {
            LABEL_DATE => match parse_base_date(&text) {
                Some(parsed) => date = Some(parsed),
                None => problems.push(format!("invalid date {text:?}")),
            },
            LABEL_PRICE => match parse_amount(&text, "円") {
                Some(parsed) => price = Some(parsed),
                None => problems.push(format!("invalid price {text:?}")),
            },
            LABEL_NET_ASSETS => {
                match parse_amount(&text, "百万円").and_then(|millions| millions.checked_mul(MILLION)) {
                    Some(parsed) => net_assets = Some(parsed),
                    None => problems.push(format!("invalid net assets {text:?}")),
                }
            }
            _ => {}
        }
    }

    if date.is_none() {
        problems.push(String::from("not found date"));
    }
    if price.is_none() {
        problems.push(String::from("not found price"));
    }
    if net_assets.is_none() {
        problems.push(String::from("not found net assets"));
    }

    match (date, price, net_assets) {
        (Some(date), Some(price), Some(net_assets)) if problems.is_empty() => {
            Ok(Quote::new(clock.close_of(date), price, Some(net_assets)))
        }
        _ => Err(SourceError::missing_fields(&problems)),
    }
}

fn previous_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.prev_siblings().find_map(ElementRef::wrap)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// `基準日: 2024年06月24日`
fn parse_base_date(text: &str) -> Option<Date> {
    let rest = text.trim();
    let rest = rest
        .strip_prefix("基準日")
        .unwrap_or(rest)
        .trim_start_matches(|ch: char| ch == ':' || ch == '：' || ch.is_whitespace());

    let (year, rest) = rest.split_once('年')?;
    let (month, rest) = rest.split_once('月')?;
    let (day, _) = rest.split_once('日')?;

    let month = Month::try_from(month.trim().parse::<u8>().ok()?).ok()?;
    Date::from_calendar_date(year.trim().parse().ok()?, month, day.trim().parse().ok()?).ok()
}

/// Leading integer of `text` followed by `unit`, ignoring digit group commas.
fn parse_amount(text: &str, unit: &str) -> Option<i64> {
    let cleaned = text.replace(',', "");
    let (number, _) = cleaned.split_once(unit)?;
    number.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::test_support::{block_on, RecordingHttpClient};
    use time::macros::{date, datetime};

    fn page(items: &[(&str, &str)]) -> String {
        let rows = items
            .iter()
            .map(|(label, value)| {
                format!(
                    "<div class=\"cmp-fund__fund-summary-item\">\
                     <p class=\"cmp-fund__fund-summary-label\">{label}</p>\n\
                     <p class=\"cmp-fund__fund-summary-value\">{value}</p></div>"
                )
            })
            .collect::<String>();
        format!(
            "<html><body><section class=\"cmp-funds__fund-summary\">{rows}</section></body></html>"
        )
    }

    #[test]
    fn scrapes_date_price_and_net_assets() {
        let html = page(&[
            (LABEL_DATE, "基準日: 2024年06月24日"),
            (LABEL_PRICE, " 12,345円 "),
            ("前日比", "+12円"),
            (LABEL_NET_ASSETS, "98,765百万円"),
        ]);
        let client = Arc::new(RecordingHttpClient::ok(html));
        let adapter = PictetAdapter::new(client.clone());

        let quote = block_on(adapter.latest("gloin")).expect("quote");

        assert_eq!(quote.as_of, datetime!(2024-06-24 18:00 +9));
        assert_eq!(quote.price, 12_345);
        assert_eq!(quote.net_assets, Some(98_765_000_000));
        assert_eq!(
            client.recorded_urls(),
            vec!["https://www.pictet.co.jp/fund/gloin.html"]
        );
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let html = page(&[(LABEL_PRICE, "12,345円")]);

        let error = parse_summary(&html, MarketClock::tokyo()).expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::MissingFields);
        assert!(error.message().contains("not found date"));
        assert!(error.message().contains("not found net assets"));
        assert!(!error.message().contains("not found price"));
    }

    #[test]
    fn malformed_value_is_reported_with_missing_ones() {
        let html = page(&[
            (LABEL_DATE, "基準日: 2024年06月24日"),
            (LABEL_PRICE, "算出中"),
        ]);

        let error = parse_summary(&html, MarketClock::tokyo()).expect_err("must fail");

        assert!(error.message().contains("invalid price \"算出中\""));
        assert!(error.message().contains("not found price"));
        assert!(error.message().contains("not found net assets"));
    }

    #[test]
    fn net_assets_beyond_the_integer_range_are_invalid() {
        let html = page(&[
            (LABEL_DATE, "基準日: 2024年06月24日"),
            (LABEL_PRICE, "12,345円"),
            (LABEL_NET_ASSETS, "99,999,999,999,999百万円"),
        ]);

        let error = parse_summary(&html, MarketClock::tokyo()).expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::MissingFields);
        assert!(error
            .message()
            .contains("invalid net assets \"99,999,999,999,999百万円\""));
        assert!(error.message().contains("not found net assets"));
    }

    #[test]
    fn values_outside_the_summary_are_ignored() {
        let html = "<div><p>基準価額</p><p class=\"cmp-fund__fund-summary-value\">1円</p></div>";

        let error = parse_summary(html, MarketClock::tokyo()).expect_err("must fail");

        assert!(error.message().contains("not found price"));
    }

    #[test]
    fn japanese_dates_parse() {
        assert_eq!(parse_base_date("基準日: 2006年01月02日"), Some(date!(2006 - 01 - 02)));
        assert_eq!(parse_base_date("基準日：2024年6月24日"), Some(date!(2024 - 06 - 24)));
        assert_eq!(parse_base_date("2024年13月01日"), None);
        assert_eq!(parse_base_date("2024/06/24"), None);
    }
}
