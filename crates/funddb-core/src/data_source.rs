use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{ProviderId, Quote, ValidationError};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    /// Network failure or non-2xx response.
    Transport,
    /// Payload could not be decoded or lacks a required value.
    Parse,
    /// Provider answered but reported a failure of its own.
    Business,
    /// Scraped page lacks one or more fields.
    MissingFields,
    NotFound,
    InvalidIdentifier,
    UnknownScheme,
    Timeout,
    Cancelled,
    Internal,
}

/// Structured error returned by quote sources and the adapter registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    status: Option<u16>,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Transport, message)
    }

    pub fn http_status(url: &str, status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(
                SourceErrorKind::Transport,
                format!("failed HTTP with {status} for: {url:?}"),
            )
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Parse, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Business, message)
    }

    /// One error naming every missing or malformed field.
    pub fn missing_fields(problems: &[String]) -> Self {
        Self::new(SourceErrorKind::MissingFields, problems.join("; "))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message)
    }

    pub fn invalid_identifier(error: ValidationError) -> Self {
        Self::new(SourceErrorKind::InvalidIdentifier, error.to_string())
    }

    pub fn unknown_scheme(scheme: &str) -> Self {
        Self::new(
            SourceErrorKind::UnknownScheme,
            format!("unknown scheme: {scheme}"),
        )
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self::new(
            SourceErrorKind::UnknownScheme,
            format!("source adapter '{provider}' is not registered"),
        )
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            SourceErrorKind::Timeout,
            format!("fetch timed out after {timeout_ms}ms"),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(SourceErrorKind::Cancelled, "fetch cancelled")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Business => "source.business",
            SourceErrorKind::MissingFields => "source.missing_fields",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::InvalidIdentifier => "source.invalid_identifier",
            SourceErrorKind::UnknownScheme => "source.unknown_scheme",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Cancelled => "source.cancelled",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

pub type QuoteFuture<'a> = Pin<Box<dyn Future<Output = Result<Quote, SourceError>> + Send + 'a>>;

/// Quote source contract implemented by every provider adapter.
pub trait QuoteSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch the latest quote for a provider-specific `code`.
    fn latest<'a>(&'a self, code: &'a str) -> QuoteFuture<'a>;
}
