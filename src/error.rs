//! Error taxonomy shared by every network-facing part of the crate.
//!
//! The request executor only ever produces [`Error::Transport`],
//! [`Error::Decoding`] or a status-derived variant (see [`Error::from_status`]).
//! Services add domain meaning on top, e.g. a 404 on the profile endpoint
//! becomes [`Error::ProfileNotFound`].

use thiserror::Error;

use crate::auth::StoreError;

/// Convenience alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the data-access layer can report.
#[derive(Debug, Error)]
pub enum Error {
    /// No response was received (DNS, TLS, timeout, connection reset).
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// A non-2xx status that has no more specific bucket.
    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// 400 from the server, or a request that could not be built locally.
    #[error("Invalid request")]
    InvalidRequest,

    /// 401 from the server.
    #[error("Authorization required")]
    Unauthorized,

    /// 403 or 404 from the server.
    #[error("Resource not found (HTTP {0})")]
    NotFound(u16),

    /// 5xx from the server.
    #[error("Server error: HTTP {0}")]
    ServerError(u16),

    /// The status was fine but the body did not match the expected shape.
    ///
    /// `body` is kept for diagnostics and is deliberately left out of the
    /// `Display` output.
    #[error("Failed to decode response: {source}")]
    Decoding {
        /// Underlying JSON error.
        source: serde_json::Error,
        /// Raw response body as received.
        body: String,
    },

    /// The same operation (e.g. the same authorization code) is already in flight.
    #[error("Duplicate request")]
    DuplicateRequest,

    /// No bearer token is stored.
    #[error("Authorization token missing")]
    MissingCredential,

    /// The call was superseded by a newer one and its result discarded.
    #[error("Request cancelled")]
    Cancelled,

    /// A like mutation is already in flight.
    #[error("Another like request is in progress")]
    Busy,

    /// The photo id is not part of the loaded feed.
    #[error("Photo {0} is not in the feed")]
    PhotoNotFound(String),

    /// 404 on the profile endpoint.
    #[error("Profile not found")]
    ProfileNotFound,

    /// 404 on the avatar endpoint.
    #[error("Avatar not found")]
    AvatarNotFound,

    /// The profile payload decoded but carried no username.
    #[error("Invalid profile data")]
    InvalidProfileData,

    /// The avatar payload decoded but the URL is empty or malformed.
    #[error("Invalid avatar URL: {0:?}")]
    InvalidAvatarUrl(String),

    /// A configured base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Reading or writing the credential store failed.
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Bucket a non-2xx status code into the closest variant.
    pub const fn from_status(code: u16) -> Self {
        match code {
            400 => Self::InvalidRequest,
            401 => Self::Unauthorized,
            403 | 404 => Self::NotFound(code),
            500..=599 => Self::ServerError(code),
            _ => Self::HttpStatus(code),
        }
    }

    /// The HTTP status behind this error, if there was one.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus(code) | Self::NotFound(code) | Self::ServerError(code) => Some(*code),
            Self::InvalidRequest => Some(400),
            Self::Unauthorized => Some(401),
            Self::ProfileNotFound | Self::AvatarNotFound => Some(404),
            _ => None,
        }
    }

    /// Whether the failure came from talking to the network or the server.
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::HttpStatus(_)
                | Self::InvalidRequest
                | Self::Unauthorized
                | Self::NotFound(_)
                | Self::ServerError(_)
        )
    }

    /// Whether the user has to sign in (again) to recover.
    pub const fn is_auth_error(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MissingCredential)
    }

    /// Whether simply retrying the same call may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ServerError(_))
    }

    /// Short hint the presentation layer can show next to the message.
    pub const fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Transport(_) => "Check your internet connection and try again",
            Self::ServerError(_) => "The server is having trouble, try again later",
            Self::InvalidRequest | Self::HttpStatus(_) | Self::NotFound(_) => {
                "Check the request and try again"
            }
            Self::Unauthorized | Self::MissingCredential => "Sign in again",
            Self::DuplicateRequest | Self::Busy => "Wait for the previous request to finish",
            Self::Decoding { .. } => "Try refreshing the data",
            Self::ProfileNotFound
            | Self::AvatarNotFound
            | Self::InvalidProfileData
            | Self::InvalidAvatarUrl(_) => "Try refreshing your profile",
            _ => "Try again",
        }
    }
}
