//! Provider adapters.
//!
//! | Scheme | Source | Date format |
//! |--------|--------|-------------|
//! | `ammufg` | MUFG fund information API (JSON) | `YYYYMMDD` |
//! | `fidelity` | Fidelity Japan fund data API (JSON) | `YYYY-MM-DD` |
//! | `tokiomarineam` | Tokio Marine fund API (JSON) | `YYYY/MM/DD` |
//! | `pictet` | Pictet Japan fund page (HTML) | `基準日: YYYY年MM月DD日` |

mod ammufg;
mod fidelity;
mod pictet;
mod tokiomarineam;

pub use ammufg::{AmmufgAdapter, CodeType};
pub use fidelity::FidelityAdapter;
pub use pictet::PictetAdapter;
pub use tokiomarineam::{CacheBuster, TokiomarineamAdapter};

use serde::de::DeserializeOwned;
use time::parsing::Parsable;
use time::Date;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::ProviderId;

const ERROR_BODY_SNIPPET: usize = 512;

/// GET `request` and return the body of a 2xx response.
///
/// Other statuses are logged together with the start of the body.
async fn fetch_body(
    client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<String, SourceError> {
    let url = request.url.clone();
    let response = client.execute(request).await.map_err(|error| {
        if error.timed_out() {
            SourceError::transport(format!("{provider} request timed out: {}", error.message()))
        } else {
            SourceError::transport(format!("{provider} transport error: {}", error.message()))
        }
    })?;

    if !response.is_success() {
        tracing::info!(
            provider = %provider,
            status = response.status,
            url = %url,
            body = response.body_snippet(ERROR_BODY_SNIPPET),
            "error response"
        );
        return Err(SourceError::http_status(&url, response.status));
    }

    Ok(response.body)
}

fn decode_json<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|error| SourceError::parse(format!("{provider}: failed to parse JSON: {error}")))
}

fn parse_date(
    provider: ProviderId,
    field: &str,
    value: &str,
    format: &(impl Parsable + ?Sized),
) -> Result<Date, SourceError> {
    Date::parse(value.trim(), format).map_err(|error| {
        SourceError::parse(format!("{provider}: invalid date {field}={value:?}: {error}"))
    })
}
