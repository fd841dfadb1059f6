use reqwest::{Client as ReqwestClient, IntoUrl, Method};
use tracing::info;

use crate::{AuthState, Credentials, FlowConfig, HmacSha1, RequestBuilder, Result, Signer};

/// Turn a `reqwest::Client` into an [`OAuthClient`].
pub trait OAuthClientProvider {
    /// Start a new authorization attempt for `config`.
    fn oauth1(self, config: FlowConfig) -> Result<OAuthClient>
    where
        Self: Sized;

    /// Sign requests with previously exported credentials.
    fn oauth1_restored(self, credentials: Credentials) -> OAuthClient
    where
        Self: Sized;
}

impl OAuthClientProvider for ReqwestClient {
    fn oauth1(self, config: FlowConfig) -> Result<OAuthClient> {
        OAuthClient::new_with_client(config, self)
    }

    fn oauth1_restored(self, credentials: Credentials) -> OAuthClient {
        OAuthClient::restore_with_client(credentials, self)
    }
}

/// Owns the credential state of one identity and signs requests with it.
#[derive(Debug)]
pub struct OAuthClient<S = HmacSha1> {
    pub(crate) http: ReqwestClient,
    pub(crate) signer: S,
    pub(crate) config: Option<FlowConfig>,
    pub(crate) credentials: Credentials,
    pub(crate) state: AuthState,
}

impl OAuthClient<HmacSha1> {
    /// Constructs a new `OAuthClient` for the flow described by `config`.
    ///
    /// This method calls reqwest::Client::new() internally.
    pub fn new(config: FlowConfig) -> Result<Self> {
        Self::new_with_client(config, ReqwestClient::new())
    }

    /// Constructs a new `OAuthClient` with specifying inner `reqwest::Client`.
    pub fn new_with_client(config: FlowConfig, http: ReqwestClient) -> Result<Self> {
        config.validate()?;
        let credentials = Credentials::new(
            config.consumer_key.clone(),
            config.consumer_secret.clone(),
            config.parameters.clone(),
        );
        Ok(OAuthClient {
            http,
            signer: HmacSha1::new(),
            config: Some(config),
            credentials,
            state: AuthState::Unauthorized,
        })
    }

    /// Rebuild a client from exported credentials.
    ///
    /// The credentials are taken as they are; the client can sign requests
    /// right away but carries no flow configuration.
    pub fn restore(credentials: Credentials) -> Self {
        Self::restore_with_client(credentials, ReqwestClient::new())
    }

    pub fn restore_with_client(credentials: Credentials, http: ReqwestClient) -> Self {
        let state = if credentials.token().is_some() {
            AuthState::Authorized
        } else {
            AuthState::Unauthorized
        };
        OAuthClient {
            http,
            signer: HmacSha1::new(),
            config: None,
            credentials,
            state,
        }
    }
}

impl<S> OAuthClient<S> {
    /// Replace the signing primitives.
    pub fn with_signer<T: Signer>(self, signer: T) -> OAuthClient<T> {
        OAuthClient {
            http: self.http,
            signer,
            config: self.config,
            credentials: self.credentials,
            state: self.state,
        }
    }

    /// Snapshot of the credential state, detached from this client.
    pub fn export_state(&self) -> Credentials {
        self.credentials.clone()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn config(&self) -> Option<&FlowConfig> {
        self.config.as_ref()
    }

    pub(crate) fn transition(&mut self, next: AuthState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "authorization state changed");
            self.state = next;
        }
    }
}

impl<S: Signer> OAuthClient<S> {
    /// Convenience method to make a `GET` request to a URL.
    ///
    /// # Errors
    ///
    /// Sending fails whenever supplied `Url` cannot be parsed.
    pub fn get<U: IntoUrl>(&mut self, url: U) -> RequestBuilder<'_, S> {
        self.request(Method::GET, url)
    }

    /// Convenience method to make a `POST` request to a URL.
    ///
    /// # Errors
    ///
    /// Sending fails whenever supplied `Url` cannot be parsed.
    pub fn post<U: IntoUrl>(&mut self, url: U) -> RequestBuilder<'_, S> {
        self.request(Method::POST, url)
    }

    /// Convenience method to make a `PUT` request to a URL.
    pub fn put<U: IntoUrl>(&mut self, url: U) -> RequestBuilder<'_, S> {
        self.request(Method::PUT, url)
    }

    /// Convenience method to make a `PATCH` request to a URL.
    pub fn patch<U: IntoUrl>(&mut self, url: U) -> RequestBuilder<'_, S> {
        self.request(Method::PATCH, url)
    }

    /// Convenience method to make a `DELETE` request to a URL.
    pub fn delete<U: IntoUrl>(&mut self, url: U) -> RequestBuilder<'_, S> {
        self.request(Method::DELETE, url)
    }

    /// Convenience method to make a `HEAD` request to a URL.
    pub fn head<U: IntoUrl>(&mut self, url: U) -> RequestBuilder<'_, S> {
        self.request(Method::HEAD, url)
    }

    /// Start building a signed request with the `Method` and `Url`.
    ///
    /// Returns a `RequestBuilder`, which will allow setting the query,
    /// headers and request body before sending.
    pub fn request<U: IntoUrl>(&mut self, method: Method, url: U) -> RequestBuilder<'_, S> {
        let url = url.into_url().map_err(Into::into);
        RequestBuilder::new(self, method, url)
    }
}
