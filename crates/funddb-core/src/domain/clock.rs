use time::macros::{offset, time};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::ValidationError;

/// Japan Standard Time. Japan has no daylight saving time.
pub const TOKYO_OFFSET: UtcOffset = offset!(+9);

pub const DEFAULT_CLOSE_HOUR: u8 = 18;

/// Maps a provider's calendar date to the instant its quote is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketClock {
    offset: UtcOffset,
    close: Time,
}

impl MarketClock {
    pub const fn tokyo() -> Self {
        Self {
            offset: TOKYO_OFFSET,
            close: time!(18:00),
        }
    }

    pub fn with_close_hour(self, hour: u8) -> Result<Self, ValidationError> {
        let close =
            Time::from_hms(hour, 0, 0).map_err(|_| ValidationError::InvalidCloseHour { hour })?;
        Ok(Self { close, ..self })
    }

    pub const fn offset(self) -> UtcOffset {
        self.offset
    }

    pub const fn close_hour(self) -> u8 {
        self.close.hour()
    }

    pub fn close_of(self, date: Date) -> OffsetDateTime {
        PrimitiveDateTime::new(date, self.close).assume_offset(self.offset)
    }
}

impl Default for MarketClock {
    fn default() -> Self {
        Self::tokyo()
    }
}
