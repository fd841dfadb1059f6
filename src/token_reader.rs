use std::{collections::HashMap, future::Future};

use async_trait::async_trait;
use http::StatusCode;
use reqwest::Response;
use serde::Deserialize;
use tracing::warn;

use crate::encoding::string_qs;
use crate::{Error, Result, TokenReaderError, TokenReaderResult};

const OAUTH_TOKEN_KEY: &str = "oauth_token";

const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";

const OAUTH_PROBLEM_KEY: &str = "oauth_problem";

const NO_DESCRIPTION: &str = "no error description";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

/// Add parse_oauth_token feature to reqwest::Response.
// this trait is sealed
#[async_trait(?Send)]
pub trait TokenReader: private::Sealed {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait(?Send)]
impl TokenReader for Response {
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        let status = self.status();
        let text = self.text().await?;
        if !is_granted(status) {
            let description = read_error_description(&text);
            warn!(%status, %description, "token endpoint refused the request");
            return Err(Error::Protocol {
                status,
                description,
            });
        }
        Ok(read_oauth_token(text)?)
    }
}

/// Add parse_oauth_token feature to Future of reqwest::Response.
// this trait is also sealed
#[async_trait(?Send)]
pub trait TokenReaderFuture: private::SealedWrapper {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait(?Send)]
impl<T, E> TokenReaderFuture for T
where
    T: Future<Output = std::result::Result<Response, E>>,
    E: Into<Error> + 'static,
{
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        match self.await {
            Ok(resp) => Ok(resp.parse_oauth_token().await?),
            Err(err) => Err(err.into()),
        }
    }
}

fn is_granted(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

pub(crate) fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = string_qs(&text);
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Extract the server-reported error out of a refused token response.
///
/// Tries a JSON `{"error": ..}` body, then a form-encoded `oauth_problem`,
/// then falls back to the raw text.
pub(crate) fn read_error_description(text: &str) -> String {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(text) {
        match (body.error, body.error_description) {
            (Some(error), Some(description)) => return format!("{}: {}", error, description),
            (Some(error), None) => return error,
            (None, Some(description)) => return description,
            (None, None) => {}
        }
    }
    if let Some(problem) = string_qs(text).remove(OAUTH_PROBLEM_KEY) {
        return problem;
    }
    match text.trim() {
        "" => NO_DESCRIPTION.to_string(),
        raw => raw.to_string(),
    }
}

mod private {
    use std::future::Future;

    use reqwest::Response;

    use crate::Error;

    pub trait Sealed {}
    impl Sealed for Response {}
    pub trait SealedWrapper {}
    impl<T, E> SealedWrapper for T
    where
        T: Future<Output = Result<Response, E>>,
        E: Into<Error>,
    {
    }
}
