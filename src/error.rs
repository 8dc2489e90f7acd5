//! Error taxonomy shared by the token lifecycle, the Spotify clients and the
//! HTTP glue.
//!
//! Parameter validation has no variant here: time ranges and limits are
//! coerced to their defaults instead of being rejected (see
//! [`crate::utils::validate_time_range`] and [`crate::utils::validate_limit`]).

use reqwest::StatusCode;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The session holds no usable token. Recover by starting the
    /// authorization flow again.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The authorization server rejected a code or a refresh token, or could
    /// not be reached. `status` is `None` when no HTTP response was received.
    #[error("Token exchange failed: {message}")]
    AuthExchange {
        status: Option<u16>,
        message: String,
    },

    /// The Data API answered with a non-success status, or could not be
    /// reached. `retry_after` carries the provider's `Retry-After` seconds.
    #[error("Spotify API error: {message}")]
    DataApi {
        status: Option<u16>,
        message: String,
        retry_after: Option<u64>,
    },

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The local web server could not be started.
    #[error("Server error: {0}")]
    Server(String),
}

impl Error {
    pub(crate) fn auth_exchange(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Error::AuthExchange {
            status: status.map(|s| s.as_u16()),
            message: message.into(),
        }
    }

    pub(crate) fn data_api(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Error::DataApi {
            status: status.map(|s| s.as_u16()),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Maps a transport failure of the token endpoint.
    pub(crate) fn from_auth_transport(err: reqwest::Error) -> Self {
        Error::auth_exchange(err.status(), transport_message(&err))
    }

    /// Maps a transport failure of the Data API.
    pub(crate) fn from_data_transport(err: reqwest::Error) -> Self {
        Error::data_api(err.status(), transport_message(&err))
    }

    /// Whether retrying later, with backoff, may succeed.
    ///
    /// Rate limiting, server errors and requests that never got a response
    /// are transient. Everything else needs a different request or a new
    /// authorization.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::DataApi { status: None, .. } | Error::AuthExchange { status: None, .. } => true,
            Error::DataApi {
                status: Some(status),
                ..
            }
            | Error::AuthExchange {
                status: Some(status),
                ..
            } => *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500,
            _ => false,
        }
    }

    /// Whether the caller should send the user through authorization again.
    ///
    /// Only an explicit rejection (`400 invalid_grant`, `401 invalid_client`)
    /// of a code or refresh token counts. A rate-limited or failing token
    /// endpoint leaves the grant usable.
    pub fn requires_authorization(&self) -> bool {
        match self {
            Error::NotAuthenticated => true,
            Error::AuthExchange {
                status: Some(status),
                ..
            } => {
                *status == StatusCode::BAD_REQUEST.as_u16()
                    || *status == StatusCode::UNAUTHORIZED.as_u16()
            }
            _ => false,
        }
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}
