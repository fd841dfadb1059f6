/*!
oauth1-flow: three-legged OAuth 1.0a on top of [reqwest](https://crates.io/crates/reqwest).

# Overview

An [`OAuthClient`] owns the credential state of one identity. It runs the
request token / user authorization / access token exchange, shows the
authorization page through an [`AuthorizationHost`] supplied by the
application, and afterwards signs arbitrary requests with HMAC-SHA1
(RFC 5849).

# How to use

## Basic usecase 1 - authorizing and calling the API

```no_run
use oauth1_flow::{AuthorizationHost, FlowConfig, OAuthClientProvider};

# async fn run(host: impl AuthorizationHost) -> oauth1_flow::Result<()> {
// prepare the flow
let config = FlowConfig::new(
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    "https://api.example.com/oauth/request_token",
    "https://api.example.com/oauth/authorize",
    "https://api.example.com/oauth/access_token",
    "https://app.example.com/callback",
)?
.authorization_timeout(std::time::Duration::from_secs(300));

let mut client = reqwest::Client::new().oauth1(config)?;

// request token, user authorization and access token
client.authorize(&host).await?;

// every request is signed with the granted token
let resp = client
    .get("https://api.example.com/1.1/account/verify_credentials.json")
    .query(&[("include_email", "true")])
    .send()
    .await?;

// keep the credentials for later
let saved = serde_json::to_string(&client.export_state())?;
# let _ = (resp, saved);
# Ok(())
# }
```

## Basic usecase 2 - restoring saved credentials

```no_run
use oauth1_flow::{Credentials, OAuthClient};

# async fn run(saved: &str) -> oauth1_flow::Result<()> {
let credentials: Credentials = serde_json::from_str(saved)?;
let mut client = OAuthClient::restore(credentials);

let resp = client
    .post("https://api.example.com/1.1/statuses/update.json")
    .query(&[("status", "Hello, world!")])
    .send()
    .await?;
# let _ = resp;
# Ok(())
# }
```
*/
mod authorize;
mod client;
mod config;
pub mod encoding;
mod error;
mod host;
mod request;
mod secrets;
pub mod seq;
mod signer;
mod token_reader;

// exposed to external program
pub use authorize::AuthState;
pub use client::{OAuthClient, OAuthClientProvider};
pub use config::FlowConfig;
pub use encoding::{percent_encode, qs_string, string_qs};
pub use error::{CancelReason, Error, Result, TokenReaderError, TokenReaderResult};
pub use host::{AuthorizationHost, Listeners, Notice, SurfaceId};
pub use request::{OAuthRequest, Prepared, RequestBuilder};
pub use secrets::Credentials;
pub use signer::{HmacSha1, Signer, HMAC_SHA1};
pub use token_reader::{TokenReader, TokenReaderFuture, TokenResponse};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
pub(crate) const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
pub(crate) const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub(crate) const OAUTH_TOKEN_KEY: &str = "oauth_token";
