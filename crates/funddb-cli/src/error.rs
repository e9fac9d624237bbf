use funddb_core::{ImportError, SourceError, SyncError, ValidationError, WarehouseError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<SyncError> for CliError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Warehouse(error) => Self::Warehouse(error),
            SyncError::Validation(error) => Self::Validation(error),
            SyncError::Cancelled => Self::Cancelled,
            SyncError::UnknownFund { fund_id } => {
                Self::Command(format!("no funds found for id: {fund_id}"))
            }
            SyncError::Fetch {
                fund_id,
                fetch_id,
                source,
            } => {
                tracing::error!(%fund_id, %fetch_id, code = source.code(), "fetch failed");
                Self::Source(source)
            }
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Source(_) => 3,
            Self::Warehouse(_) => 4,
            Self::Import(ImportError::Io { .. }) => 10,
            Self::Import(ImportError::Warehouse(_)) => 4,
            Self::Import(_) => 2,
            Self::Cancelled => 130,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_errors_keep_their_category() {
        let fetch = CliError::from(SyncError::Fetch {
            fund_id: String::from("253425"),
            fetch_id: String::from("ammufg:253425"),
            source: SourceError::timeout(30_000),
        });
        let cancelled = CliError::from(SyncError::Cancelled);
        let unknown = CliError::from(SyncError::UnknownFund {
            fund_id: String::from("nope"),
        });

        assert_eq!(fetch.exit_code(), 3);
        assert_eq!(cancelled.exit_code(), 130);
        assert_eq!(unknown.exit_code(), 2);
        assert_eq!(unknown.to_string(), "command error: no funds found for id: nope");
    }
}
