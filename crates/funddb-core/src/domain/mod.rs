//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Quote`] | One valuation reported by a provider |
//! | [`MarketClock`] | Fixed-offset end-of-day instant for a trading date |
//! | [`FetchId`] | Validated `scheme:code` fetch identifier |
//!
//! Provider dates carry no time of day. They are anchored to the market
//! close in Tokyo time (+09:00) so the calendar date survives any
//! conversion back to UTC:
//!
//! ```rust
//! use funddb_core::MarketClock;
//! use time::macros::date;
//!
//! let as_of = MarketClock::tokyo().close_of(date!(2024 - 06 - 24));
//! assert_eq!(as_of.date(), date!(2024 - 06 - 24));
//! assert_eq!(as_of.hour(), 18);
//! ```

mod clock;
mod fetch_id;
mod quote;

pub use clock::{MarketClock, DEFAULT_CLOSE_HOUR, TOKYO_OFFSET};
pub use fetch_id::FetchId;
pub use quote::Quote;
