//! Behavior-driven tests for fetch identifier dispatch.

use std::sync::Arc;
use std::time::Duration;

use funddb_core::{AdapterRegistry, CacheBuster, FetchContext, ProviderId, SourceErrorKind};
use funddb_tests::CannedHttpClient;
use tokio_util::sync::CancellationToken;

fn all_providers() -> CannedHttpClient {
    CannedHttpClient::default()
        .route(
            "https://developer.am.mufg.jp/",
            r#"{"result": {"status": 200}, "errors": {"count": 0},
                "datasets": [{"base_date": "20240624", "cancellation_price": 17203, "netassets": 34666889549}]}"#,
        )
        .route(
            "https://www.fidelity.co.jp/",
            r#"{"0331109C": {"PriceData": {"Nav": {"Date": "2024-06-24"}, "SellingPrice": 24512}}}"#,
        )
        .route(
            "https://api.tokiomarineam.co.jp/",
            r#"{"Dt": "2024/06/24", "Nav": 17203, "Asset": 34666889549}"#,
        )
        .route(
            "https://www.pictet.co.jp/",
            r#"<div class="cmp-funds__fund-summary">
                 <b>基本情報</b><i class="cmp-fund__fund-summary-value">基準日: 2024年06月24日</i>
                 <b>基準価額</b><i class="cmp-fund__fund-summary-value">12,345円</i>
                 <b>純資産総額</b><i class="cmp-fund__fund-summary-value">98,765百万円</i>
               </div>"#,
        )
}

fn context() -> FetchContext {
    FetchContext::new(CancellationToken::new(), Duration::from_secs(5))
}

#[tokio::test]
async fn when_each_scheme_is_fetched_one_shared_client_serves_all_adapters() {
    // Given: a registry built around one HTTP client
    let client = Arc::new(all_providers());
    let registry = AdapterRegistry::builder()
        .with_http_client(client.clone())
        .build();

    // When: one identifier per scheme is fetched
    let mut prices = Vec::new();
    for fetch_id in [
        "ammufg:253425",
        "fidelity:0331109C",
        "tokiomarineam:635132",
        "pictet:gloin",
    ] {
        let quote = registry.fetch(fetch_id, &context()).await.expect(fetch_id);
        assert_eq!(quote.date_key(), "2024-06-24", "{fetch_id}");
        prices.push(quote.price);
    }

    // Then: every request went through the shared client
    assert_eq!(prices, vec![17203, 24512, 17203, 12345]);
    assert_eq!(client.urls().len(), 4);
    assert_eq!(registry.providers(), ProviderId::ALL.to_vec());
}

#[tokio::test]
async fn when_the_code_carries_a_code_type_only_the_first_colon_selects_the_scheme() {
    // Given: the default registry
    let client = Arc::new(all_providers());
    let registry = AdapterRegistry::builder()
        .with_http_client(client.clone())
        .build();

    // When: an ISIN-typed ammufg identifier is fetched
    registry
        .fetch("ammufg:isin_cd:JP90C000H1T1", &context())
        .await
        .expect("quote");

    // Then: the code type selects the path segment
    assert_eq!(
        client.urls(),
        vec!["https://developer.am.mufg.jp/fund_information_latest/isin_cd/JP90C000H1T1"]
    );
}

#[tokio::test]
async fn when_a_cache_buster_is_configured_tokiomarineam_requests_carry_it() {
    // Given: a fixed cache buster
    let client = Arc::new(all_providers());
    let registry = AdapterRegistry::builder()
        .with_http_client(client.clone())
        .with_cache_buster(CacheBuster::Fixed(String::from("1719216000000")))
        .build();

    // When: a tokiomarineam fund is fetched
    registry
        .fetch("tokiomarineam:635132", &context())
        .await
        .expect("quote");

    // Then: the parameter is appended
    assert_eq!(
        client.urls(),
        vec!["https://api.tokiomarineam.co.jp/hp/funds?FundId=635132&_=1719216000000"]
    );
}

#[tokio::test]
async fn when_the_identifier_is_malformed_no_request_is_made() {
    // Given: the default registry
    let client = Arc::new(all_providers());
    let registry = AdapterRegistry::builder()
        .with_http_client(client.clone())
        .build();

    // When: identifiers without a usable scheme are fetched
    let missing_separator = registry.fetch("253425", &context()).await.expect_err("separator");
    let unknown_scheme = registry.fetch("nomura:123", &context()).await.expect_err("scheme");

    // Then: each is classified and nothing hits the network
    assert_eq!(missing_separator.kind(), SourceErrorKind::InvalidIdentifier);
    assert!(missing_separator
        .message()
        .contains("required format \"{scheme}:{code}\""));
    assert_eq!(unknown_scheme.kind(), SourceErrorKind::UnknownScheme);
    assert!(client.urls().is_empty());
}

#[tokio::test]
async fn when_fidelity_lacks_the_requested_key_it_is_not_found() {
    // Given: a fidelity response for a different fund
    let client = Arc::new(all_providers());
    let registry = AdapterRegistry::builder().with_http_client(client).build();

    // When: another code is fetched
    let error = registry
        .fetch("fidelity:9999999X", &context())
        .await
        .expect_err("must fail");

    // Then: the key is reported missing
    assert_eq!(error.kind(), SourceErrorKind::NotFound);
    assert_eq!(error.code(), "source.not_found");
}
