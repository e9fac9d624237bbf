use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{ProviderId, ValidationError};

/// `scheme:code` identifier telling which provider to ask for a fund's quote.
///
/// Only the first `:` separates the scheme; the code may contain more colons
/// (`ammufg:isin_cd:JP90C000H1T1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FetchId {
    raw: String,
    split: usize,
}

impl FetchId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidFetchId {
            value: input.to_owned(),
        };

        let split = trimmed.find(':').ok_or_else(invalid)?;
        if split == 0 || split + 1 == trimmed.len() {
            return Err(invalid());
        }

        Ok(Self {
            raw: trimmed.to_owned(),
            split,
        })
    }

    pub fn scheme(&self) -> &str {
        &self.raw[..self.split]
    }

    pub fn code(&self) -> &str {
        &self.raw[self.split + 1..]
    }

    pub fn provider(&self) -> Result<ProviderId, ValidationError> {
        self.scheme().parse()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Display for FetchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for FetchId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FetchId> for String {
    fn from(value: FetchId) -> Self {
        value.raw
    }
}
