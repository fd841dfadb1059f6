use std::fmt;

use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("token endpoint responded {status} : {description}")]
    Protocol {
        status: StatusCode,
        description: String,
    },
    #[error("request failed : {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token acquisition failed : {0}")]
    MalformedResponse(#[from] TokenReaderError),
    #[error("authorization cancelled : {0}")]
    Cancelled(CancelReason),
    #[error("authorization host failed : {0}")]
    Host(String),
    #[error("invalid url : {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid authorization header : {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
    #[error("invalid request part : {0}")]
    Http(#[from] http::Error),
    #[error("could not encode query or form : {0}")]
    Serialize(#[from] serde_urlencoded::ser::Error),
    #[error("could not encode json body : {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration : {0}")]
    Config(String),
    #[error("client has no flow configuration, it can only sign requests")]
    NotConfigured,
    #[error("no oauth_token has been granted yet")]
    MissingToken,
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}

/// Why the interactive authorization step ended without a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The resource owner closed or denied the authorization page.
    Dismissed,
    /// The configured authorization deadline elapsed.
    DeadlineElapsed,
    /// The caller's cancel future resolved.
    Aborted,
    /// The host dropped the listener without notifying it.
    HostDisconnected,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CancelReason::Dismissed => "dismissed by the user",
            CancelReason::DeadlineElapsed => "deadline elapsed",
            CancelReason::Aborted => "aborted by the caller",
            CancelReason::HostDisconnected => "host dropped the listener",
        };
        f.write_str(reason)
    }
}

impl Error {
    /// Returns true when the flow ended through [`Error::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}
