use funddb_warehouse::PriceRecord;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Latest valuation of a fund as reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// End of the trading day the quote belongs to, in the provider's offset.
    #[serde(with = "time::serde::rfc3339")]
    pub as_of: OffsetDateTime,
    /// Price per unit (yen per 10,000 units for Japanese funds).
    pub price: i64,
    /// Total net assets in yen, when the provider reports it.
    pub net_assets: Option<i64>,
}

impl Quote {
    pub const fn new(as_of: OffsetDateTime, price: i64, net_assets: Option<i64>) -> Self {
        Self {
            as_of,
            price,
            net_assets,
        }
    }

    /// Calendar date of the quote in the provider's offset.
    pub fn date(&self) -> Date {
        self.as_of.date()
    }

    /// `YYYY-MM-DD`, the form used as the price table key.
    pub fn date_key(&self) -> String {
        self.date().to_string()
    }

    pub fn to_price_record(&self, fund_id: &str) -> PriceRecord {
        PriceRecord {
            fund_id: fund_id.to_owned(),
            date: self.date_key(),
            value: self.price,
            net_assets: self.net_assets,
        }
    }
}
