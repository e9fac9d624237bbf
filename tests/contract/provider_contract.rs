use std::sync::Arc;

use funddb_core::{
    AmmufgAdapter, FidelityAdapter, MarketClock, PictetAdapter, ProviderId, QuoteSource,
    SourceErrorKind, TokiomarineamAdapter,
};
use funddb_tests::CannedHttpClient;
use time::macros::date;

const AMMUFG_BODY: &str = r#"{
    "result": {"status": 200, "retcount": 1},
    "errors": {"count": 0, "error_list": []},
    "datasets": [{"base_date": "20240624", "cancellation_price": 17203, "netassets": 34666889549}]
}"#;

const FIDELITY_BODY: &str = r#"{
    "0331109C": {
        "HeadFundFacts": {"TotalNetAsset": 61234567890},
        "PriceData": {"Nav": {"Date": "2024-06-24"}, "SellingPrice": "24512"}
    }
}"#;

const TOKIOMARINEAM_BODY: &str = r#"{"Dt": "2024/06/24", "Nav": 17203, "Asset": 34666889549}"#;

const PICTET_BODY: &str = r#"<html><body>
<div class="cmp-funds__fund-summary">
  <div><h3>基本情報</h3><p class="cmp-fund__fund-summary-value">基準日: 2024年06月24日</p></div>
  <div><h3>基準価額</h3><p class="cmp-fund__fund-summary-value">12,345円</p></div>
  <div><h3>純資産総額</h3><p class="cmp-fund__fund-summary-value">98,765百万円</p></div>
</div>
</body></html>"#;

struct ProviderCase {
    id: ProviderId,
    code: &'static str,
    body: &'static str,
    url: &'static str,
    price: i64,
    net_assets: Option<i64>,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Ammufg,
            code: "253425",
            body: AMMUFG_BODY,
            url: "https://developer.am.mufg.jp/fund_information_latest/fund_cd/253425",
            price: 17203,
            net_assets: Some(34_666_889_549),
        },
        ProviderCase {
            id: ProviderId::Fidelity,
            code: "0331109C",
            body: FIDELITY_BODY,
            url: "https://www.fidelity.co.jp/api/ce/fdh/FundData.json?id=0331109C&country=jp",
            price: 24512,
            net_assets: Some(61_234_567_890),
        },
        ProviderCase {
            id: ProviderId::Tokiomarineam,
            code: "635132",
            body: TOKIOMARINEAM_BODY,
            url: "https://api.tokiomarineam.co.jp/hp/funds?FundId=635132",
            price: 17203,
            net_assets: Some(34_666_889_549),
        },
        ProviderCase {
            id: ProviderId::Pictet,
            code: "gloin",
            body: PICTET_BODY,
            url: "https://www.pictet.co.jp/fund/gloin.html",
            price: 12345,
            net_assets: Some(98_765_000_000),
        },
    ]
}

fn adapter(id: ProviderId, client: Arc<CannedHttpClient>, clock: MarketClock) -> Arc<dyn QuoteSource> {
    match id {
        ProviderId::Ammufg => Arc::new(AmmufgAdapter::new(client).with_clock(clock)),
        ProviderId::Fidelity => Arc::new(FidelityAdapter::new(client).with_clock(clock)),
        ProviderId::Tokiomarineam => Arc::new(TokiomarineamAdapter::new(client).with_clock(clock)),
        ProviderId::Pictet => Arc::new(PictetAdapter::new(client).with_clock(clock)),
    }
}

#[tokio::test]
async fn every_provider_normalizes_to_the_same_quote_shape() {
    for case in provider_cases() {
        let client = Arc::new(CannedHttpClient::new(200, case.body));
        let source = adapter(case.id, client.clone(), MarketClock::tokyo());
        assert_eq!(source.id(), case.id);

        let quote = source
            .latest(case.code)
            .await
            .unwrap_or_else(|error| panic!("provider '{}' failed: {error}", case.id));

        assert_eq!(quote.date(), date!(2024 - 06 - 24), "provider '{}': date", case.id);
        assert_eq!(quote.date_key(), "2024-06-24", "provider '{}': date key", case.id);
        assert_eq!(quote.as_of.hour(), 18, "provider '{}': close hour", case.id);
        assert_eq!(quote.as_of.offset().whole_hours(), 9, "provider '{}': offset", case.id);
        assert_eq!(quote.price, case.price, "provider '{}': price", case.id);
        assert_eq!(quote.net_assets, case.net_assets, "provider '{}': net assets", case.id);
        assert_eq!(client.urls(), vec![case.url], "provider '{}': url", case.id);
    }
}

#[tokio::test]
async fn close_hour_never_moves_the_trading_date() {
    for hour in [0, 9, 15, 18, 23] {
        let clock = MarketClock::tokyo().with_close_hour(hour).expect("valid hour");
        for case in provider_cases() {
            let source = adapter(case.id, Arc::new(CannedHttpClient::new(200, case.body)), clock);

            let quote = source.latest(case.code).await.expect("quote");

            assert_eq!(
                quote.date_key(),
                "2024-06-24",
                "provider '{}' at {hour}:00",
                case.id
            );
        }
    }
}

#[tokio::test]
async fn error_status_is_a_transport_error_for_all_providers() {
    for case in provider_cases() {
        let source = adapter(
            case.id,
            Arc::new(CannedHttpClient::new(500, "internal error")),
            MarketClock::tokyo(),
        );

        let error = source.latest(case.code).await.expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::Transport, "provider '{}'", case.id);
        assert_eq!(error.status(), Some(500), "provider '{}'", case.id);
    }
}

#[tokio::test]
async fn garbage_payload_is_never_a_quote() {
    for case in provider_cases() {
        let source = adapter(
            case.id,
            Arc::new(CannedHttpClient::new(200, "<html>maintenance</html>")),
            MarketClock::tokyo(),
        );

        let error = source.latest(case.code).await.expect_err("must fail");

        assert!(
            matches!(
                error.kind(),
                SourceErrorKind::Parse | SourceErrorKind::MissingFields
            ),
            "provider '{}': {:?}",
            case.id,
            error.kind()
        );
    }
}

#[tokio::test]
async fn ammufg_empty_datasets_is_a_parse_error() {
    // Given: a success envelope without datasets
    let client = Arc::new(CannedHttpClient::new(
        200,
        r#"{"result": {"status": 200, "retcount": 0}, "errors": {"count": 0}, "datasets": []}"#,
    ));
    let source = AmmufgAdapter::new(client);

    // When: the latest quote is requested
    let error = source.latest("253425").await.expect_err("must fail");

    // Then: the missing dataset is reported as a parse error
    assert_eq!(error.kind(), SourceErrorKind::Parse);
    assert_eq!(error.code(), "source.parse");
}

#[tokio::test]
async fn pictet_reports_every_missing_field_in_one_error() {
    // Given: a page with only the price
    let client = Arc::new(CannedHttpClient::new(
        200,
        r#"<div class="cmp-funds__fund-summary">
             <span>基準価額</span><span class="cmp-fund__fund-summary-value">12,345円</span>
           </div>"#,
    ));
    let source = PictetAdapter::new(client);

    // When: the page is scraped
    let error = source.latest("gloin").await.expect_err("must fail");

    // Then: date and net assets are both named
    assert_eq!(error.kind(), SourceErrorKind::MissingFields);
    assert!(error.message().contains("date"), "{}", error.message());
    assert!(error.message().contains("net assets"), "{}", error.message());
}
