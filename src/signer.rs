use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::Method;
use sha1::Sha1;
use url::Url;
use uuid::Uuid;

use crate::encoding::percent_encode;
use crate::{OAUTH_SIGNATURE_KEY, REALM_KEY};

type HmacSha1Mac = Hmac<Sha1>;

/// Signature method name sent as `oauth_signature_method`.
pub const HMAC_SHA1: &str = "HMAC-SHA1";

/// Signing primitives the client relies on.
///
/// The client never computes a timestamp, a nonce or a signature on its own;
/// swap the implementation to pin those values (e.g. in tests).
pub trait Signer {
    fn timestamp(&self) -> String;

    fn nonce(&self) -> String;

    /// Builds the signature base string (RFC 5849 section 3.4.1).
    ///
    /// Query pairs already present on `url` participate together with
    /// `params`; repeated keys are all signed. `realm` and `oauth_signature`
    /// never are.
    fn base_string(&self, method: &Method, url: &Url, params: &[(String, String)]) -> String {
        let mut pairs = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .chain(params.iter().cloned())
            .filter(|(k, _)| k != REALM_KEY && k != OAUTH_SIGNATURE_KEY)
            .map(|(k, v)| (percent_encode(&k).into_owned(), percent_encode(&v).into_owned()))
            .collect::<Vec<(String, String)>>();
        pairs.sort();

        let normalized = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<String>>()
            .join("&");

        let mut endpoint = url.clone();
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        format!(
            "{}&{}&{}",
            percent_encode(&method.as_str().to_ascii_uppercase()),
            percent_encode(endpoint.as_str()),
            percent_encode(&normalized)
        )
    }

    fn signature(&self, consumer_secret: &str, token_secret: &str, base_string: &str) -> String;
}

/// HMAC-SHA1 signer with wall-clock timestamps and uuid nonces.
#[derive(Debug, Clone, Default)]
pub struct HmacSha1 {
    timestamp: Option<u64>,
    nonce: Option<String>,
}

impl HmacSha1 {
    pub fn new() -> Self {
        Default::default()
    }

    /// Pin the `oauth_timestamp` value.
    pub fn fixed_timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        HmacSha1 {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// Pin the `oauth_nonce` value.
    pub fn fixed_nonce<T>(self, nonce: T) -> Self
    where
        T: Into<String>,
    {
        HmacSha1 {
            nonce: Some(nonce.into()),
            ..self
        }
    }
}

impl Signer for HmacSha1 {
    fn timestamp(&self) -> String {
        self.timestamp
            .map(|t| t.to_string())
            .unwrap_or_else(|| Utc::now().timestamp().to_string())
    }

    fn nonce(&self) -> String {
        self.nonce
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
    }

    fn signature(&self, consumer_secret: &str, token_secret: &str, base_string: &str) -> String {
        let key = format!(
            "{}&{}",
            percent_encode(consumer_secret),
            percent_encode(token_secret)
        );
        let mut mac = HmacSha1Mac::new_from_slice(key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(base_string.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}
