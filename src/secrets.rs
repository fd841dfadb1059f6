use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signer::HMAC_SHA1;
use crate::{
    TokenResponse, OAUTH_CONSUMER_KEY, OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY, OAUTH_VERSION_KEY,
};

const OAUTH_VERSION: &str = "1.0";

/// Credential state of one client: the OAuth parameters plus both secrets.
///
/// This is the only shape that is exported and restored. Serialized as
/// `{ "parameters": {..}, "consumerSecret": "..", "tokenSecret": ".." }`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    parameters: BTreeMap<String, String>,
    consumer_secret: String,
    #[serde(default)]
    token_secret: String,
}

impl Credentials {
    /// Default parameters for `consumer_key`, with `extra` merged on top.
    pub fn new<K, S, I>(consumer_key: K, consumer_secret: S, extra: I) -> Self
    where
        K: Into<String>,
        S: Into<String>,
        I: IntoIterator<Item = (String, String)>,
    {
        let mut parameters = BTreeMap::new();
        parameters.insert(OAUTH_CONSUMER_KEY.to_string(), consumer_key.into());
        parameters.insert(OAUTH_SIGNATURE_METHOD_KEY.to_string(), HMAC_SHA1.to_string());
        parameters.insert(OAUTH_VERSION_KEY.to_string(), OAUTH_VERSION.to_string());
        parameters.extend(extra);
        Credentials {
            parameters,
            consumer_secret: consumer_secret.into(),
            token_secret: String::new(),
        }
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn consumer_key(&self) -> &str {
        self.parameters
            .get(OAUTH_CONSUMER_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn token(&self) -> Option<&str> {
        self.parameters.get(OAUTH_TOKEN_KEY).map(String::as_str)
    }

    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }

    /// Replace token and token secret from one token response.
    pub fn grant(&mut self, response: &TokenResponse) {
        self.parameters
            .insert(OAUTH_TOKEN_KEY.to_string(), response.oauth_token.clone());
        self.token_secret = response.oauth_token_secret.clone();
    }

    /// Record the per-request timestamp, nonce and signature.
    pub(crate) fn stamp(&mut self, timestamp: String, nonce: String, signature: String) {
        self.parameters
            .insert(OAUTH_TIMESTAMP_KEY.to_string(), timestamp);
        self.parameters.insert(OAUTH_NONCE_KEY.to_string(), nonce);
        self.parameters
            .insert(OAUTH_SIGNATURE_KEY.to_string(), signature);
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("parameters", &self.parameters)
            .field("consumer_secret", &"[REDACTED]")
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}
