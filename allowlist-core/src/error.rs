//! Error types for the allowlist.
//!
//! Two layers, both built with `thiserror`:
//!
//! - [`FetchError`] describes why a single upstream fetch failed.
//! - [`AllowlistError`] is what public constructors and helpers return. Upstream
//!   failures are sorted into the two kinds callers act on: the upstream being
//!   unavailable, or the upstream answering with the wrong shape.

use thiserror::Error;

/// Result type alias using `AllowlistError`.
pub type Result<T> = std::result::Result<T, AllowlistError>;

/// Classification of upstream failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure, timeout, or non-success status.
    UpstreamUnavailable,
    /// The response arrived but did not carry a list of domains.
    UpstreamMalformedResponse,
}

/// Failure of a single allowlist fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request did not complete within the timeout.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed
        seconds: u64,
    },

    /// Connection, TLS, or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The JSON body has no `domains` key.
    #[error("response is missing the \"domains\" field")]
    MissingDomains,

    /// The body is not JSON, or `domains` is not a list of strings.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl FetchError {
    /// Returns the kind this failure is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout { .. } | FetchError::Transport(_) | FetchError::Status { .. } => {
                ErrorKind::UpstreamUnavailable
            }
            FetchError::MissingDomains | FetchError::InvalidBody(_) => {
                ErrorKind::UpstreamMalformedResponse
            }
        }
    }

    /// Returns true if a later attempt may succeed without any change upstream.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::UpstreamUnavailable
    }
}

/// Main error type for allowlist operations.
#[derive(Debug, Error)]
pub enum AllowlistError {
    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The allowlist source could not be reached or refused the request.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(FetchError),

    /// The allowlist source answered with an unexpected shape.
    #[error("Upstream returned a malformed response: {0}")]
    UpstreamMalformedResponse(FetchError),

    // ═══════════════════════════════════════════════════════════════════════════
    // LOCAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AllowlistError {
    /// Returns the upstream kind, if this is an upstream failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AllowlistError::UpstreamUnavailable(_) => Some(ErrorKind::UpstreamUnavailable),
            AllowlistError::UpstreamMalformedResponse(_) => {
                Some(ErrorKind::UpstreamMalformedResponse)
            }
            AllowlistError::ConfigError(_) => None,
        }
    }

    /// Returns the underlying fetch failure, if any.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            AllowlistError::UpstreamUnavailable(e) | AllowlistError::UpstreamMalformedResponse(e) => {
                Some(e)
            }
            AllowlistError::ConfigError(_) => None,
        }
    }

    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AllowlistError::UpstreamUnavailable(_))
    }
}

impl From<FetchError> for AllowlistError {
    fn from(err: FetchError) -> Self {
        match err.kind() {
            ErrorKind::UpstreamUnavailable => AllowlistError::UpstreamUnavailable(err),
            ErrorKind::UpstreamMalformedResponse => AllowlistError::UpstreamMalformedResponse(err),
        }
    }
}
