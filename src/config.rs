use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Everything needed to run the three-legged flow for one consumer.
///
/// `callback_url` is sent as `oauth_callback` when the resource owner is
/// sent to `authorize_url`. `parameters` are merged over the default OAuth
/// parameters when a client is built from this configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub request_token_url: Url,
    pub authorize_url: Url,
    pub access_token_url: Url,
    pub callback_url: Url,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub authorization_timeout_ms: Option<u64>,
}

impl FlowConfig {
    pub fn new<K, S>(
        consumer_key: K,
        consumer_secret: S,
        request_token_url: &str,
        authorize_url: &str,
        access_token_url: &str,
        callback_url: &str,
    ) -> Result<Self>
    where
        K: Into<String>,
        S: Into<String>,
    {
        Ok(FlowConfig {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            request_token_url: Url::parse(request_token_url)?,
            authorize_url: Url::parse(authorize_url)?,
            access_token_url: Url::parse(access_token_url)?,
            callback_url: Url::parse(callback_url)?,
            parameters: BTreeMap::new(),
            authorization_timeout_ms: None,
        })
    }

    /// Add an extra OAuth parameter; it overrides the default of the same name.
    pub fn parameter<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Give up waiting for the resource owner after `timeout`.
    pub fn authorization_timeout(self, timeout: Duration) -> Self {
        FlowConfig {
            authorization_timeout_ms: Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)),
            ..self
        }
    }

    pub fn authorization_deadline(&self) -> Option<Duration> {
        self.authorization_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.consumer_key.trim().is_empty() {
            return Err(Error::Config("consumer_key must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("request_token_url", &self.request_token_url.as_str())
            .field("authorize_url", &self.authorize_url.as_str())
            .field("access_token_url", &self.access_token_url.as_str())
            .field("callback_url", &self.callback_url.as_str())
            .field("parameters", &self.parameters)
            .field("authorization_timeout_ms", &self.authorization_timeout_ms)
            .finish()
    }
}
