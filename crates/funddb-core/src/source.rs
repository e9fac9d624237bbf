use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Quote providers, named by the scheme part of a fetch identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Ammufg,
    Fidelity,
    Tokiomarineam,
    Pictet,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [
        Self::Ammufg,
        Self::Fidelity,
        Self::Tokiomarineam,
        Self::Pictet,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ammufg => "ammufg",
            Self::Fidelity => "fidelity",
            Self::Tokiomarineam => "tokiomarineam",
            Self::Pictet => "pictet",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ammufg" => Ok(Self::Ammufg),
            "fidelity" => Ok(Self::Fidelity),
            "tokiomarineam" => Ok(Self::Tokiomarineam),
            "pictet" => Ok(Self::Pictet),
            other => Err(ValidationError::UnknownScheme {
                value: other.to_owned(),
            }),
        }
    }
}
