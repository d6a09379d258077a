use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error kind that represents failures reported by the [`crate::Client`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ErrorKind {
    /// No error occurred.
    NoError,
    /// Initialization of the internal [`reqwest::Client`] failed.
    HttpClientInitFailure,
    /// The configured flag service URL is empty or cannot be parsed.
    InvalidUrl,
    /// An `UNLEASH_*` environment variable holds a value that cannot be parsed.
    InvalidEnvironmentConfig,
    /// Unexpected HTTP response was received (non-success status code).
    UnexpectedHttpResponse = 100,
    /// The HTTP request timed out.
    HttpRequestTimeout = 101,
    /// The HTTP request failed (most likely, due to a local network issue).
    HttpRequestFailure = 102,
    /// The HTTP response body could not be decoded as a feature flag list.
    InvalidHttpResponseContent = 103,
    /// A strategy constraint uses an operator that is not supported.
    UnknownConstraintOperator = 200,
    /// A variant declares a payload type that is not supported.
    UnknownVariantPayloadType = 201,
    /// A variant payload could not be decoded according to its declared type.
    InvalidVariantPayload = 202,
}

impl ErrorKind {
    pub(crate) fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Error struct that holds the [`ErrorKind`] and message of the reported failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientError {
    /// Error kind that represents failures reported by the [`crate::Client`].
    pub kind: ErrorKind,
    /// The text representation of the failure.
    pub message: String,
}

impl ClientError {
    pub(crate) fn new(kind: ErrorKind, message: String) -> Self {
        Self { message, kind }
    }

    /// Returns `true` when the failure happened while retrieving the flags
    /// (network error, unexpected status, undecodable body). Only these
    /// failures are answered from the failover cache.
    pub fn is_failover_eligible(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnexpectedHttpResponse
                | ErrorKind::HttpRequestTimeout
                | ErrorKind::HttpRequestFailure
                | ErrorKind::InvalidHttpResponseContent
        )
    }

    /// Returns `true` when the failure is caused by flag data or client setup that
    /// cannot be fixed by retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnknownConstraintOperator
                | ErrorKind::UnknownVariantPayloadType
                | ErrorKind::InvalidVariantPayload
                | ErrorKind::InvalidUrl
                | ErrorKind::InvalidEnvironmentConfig
                | ErrorKind::HttpClientInitFailure
        )
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for ClientError {}
