use std::{collections::BTreeMap, convert::TryFrom, time::Duration};

use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use reqwest::{
    header::HeaderMap, header::HeaderName, header::HeaderValue, Body, Response, Url,
};
use serde::Serialize;
use tracing::debug;

use crate::encoding::{percent_encode, to_pairs};
use crate::{
    Error, OAuthClient, Result, Signer, OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY,
    OAUTH_TIMESTAMP_KEY,
};

const OAUTH_SCHEME: &str = "OAuth";

/// A request to be signed and sent by an [`OAuthClient`].
///
/// `query` participates in the signature and is appended to the URL.
/// `oauth_parameters` are signed and sent in the `Authorization` header for
/// this request only. The body is never signed.
#[derive(Debug)]
pub struct OAuthRequest {
    pub method: Method,
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub oauth_parameters: BTreeMap<String, String>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub timeout: Option<Duration>,
}

impl OAuthRequest {
    pub fn new(method: Method, url: Url) -> Self {
        OAuthRequest {
            method,
            url,
            query: Vec::new(),
            oauth_parameters: BTreeMap::new(),
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// Outcome of signing a request, before it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// Target URL, query included.
    pub url: Url,
    /// Value of the `Authorization` header.
    pub authorization: String,
    /// The string the signature was computed over.
    pub base_string: String,
}

impl<S: Signer> OAuthClient<S> {
    /// Sign `request` with a fresh timestamp and nonce.
    ///
    /// Timestamp, nonce and signature are recorded in the credential state.
    pub fn prepare(&mut self, request: &OAuthRequest) -> Prepared {
        let timestamp = self.signer.timestamp();
        let nonce = self.signer.nonce();

        let mut oauth = self.credentials.parameters().clone();
        oauth.remove(OAUTH_SIGNATURE_KEY);
        oauth.insert(OAUTH_TIMESTAMP_KEY.to_string(), timestamp.clone());
        oauth.insert(OAUTH_NONCE_KEY.to_string(), nonce.clone());
        oauth.extend(request.oauth_parameters.clone());

        let signing = oauth
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(request.query.iter().cloned())
            .collect::<Vec<(String, String)>>();
        let base_string = self
            .signer
            .base_string(&request.method, &request.url, &signing);

        let signature = self.signer.signature(
            self.credentials.consumer_secret(),
            self.credentials.token_secret(),
            &base_string,
        );
        self.credentials
            .stamp(timestamp, nonce, signature.clone());
        oauth.insert(OAUTH_SIGNATURE_KEY.to_string(), signature);

        let mut url = request.url.clone();
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        debug!(method = %request.method, url = %request.url, "request signed");

        Prepared {
            url,
            authorization: authorization_header(&oauth),
            base_string,
        }
    }

    /// Sign `request` and send it.
    ///
    /// The response is returned as the transport produced it; the status
    /// code is not inspected.
    pub async fn send(&mut self, request: OAuthRequest) -> Result<Response> {
        let prepared = self.prepare(&request);
        let authorization = HeaderValue::from_str(&prepared.authorization)?;

        let mut builder = self
            .http
            .request(request.method, prepared.url)
            .header(AUTHORIZATION, authorization)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.send().await?)
    }
}

fn authorization_header(oauth: &BTreeMap<String, String>) -> String {
    let fields = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<String>>()
        .join(", ");
    format!("{} {}", OAUTH_SCHEME, fields)
}

pub struct RequestBuilder<'c, S> {
    client: &'c mut OAuthClient<S>,
    request: Result<OAuthRequest>,
}

impl<'c, S: Signer> RequestBuilder<'c, S> {
    pub(crate) fn new(client: &'c mut OAuthClient<S>, method: Method, url: Result<Url>) -> Self {
        RequestBuilder {
            client,
            request: url.map(|url| OAuthRequest::new(method, url)),
        }
    }

    // ------------------------------------------------------------------------
    // Finish building the request and send it to server with OAuth signature

    /// Constructs the Request and sends it to the target URL, returning a
    /// future Response.
    ///
    /// # Errors
    ///
    /// This method fails if the request could not be built, or if there was
    /// an error while sending it.
    pub async fn send(self) -> Result<Response> {
        let request = self.request?;
        self.client.send(request).await
    }

    /// Sign the request without sending it.
    pub fn prepare(self) -> Result<Prepared> {
        let request = self.request?;
        Ok(self.client.prepare(&request))
    }

    // ------------------------------------------------------------------------
    // Signed parts

    /// Modify the query string of the URL.
    ///
    /// The pairs are appended; calling `.query([("foo", "a"), ("foo", "b")])`
    /// gives `"foo=a&foo=b"`. They take part in the signature.
    ///
    /// # Errors
    /// Sending fails if `query` cannot be serialized into a query string.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        self.map(|mut request| {
            request.query.extend(to_pairs(query)?);
            Ok(request)
        })
    }

    /// Add an OAuth parameter (e.g. `oauth_verifier`) for this request only.
    pub fn oauth_parameter<K, V>(self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.map(|mut request| {
            request.oauth_parameters.insert(key.into(), value.into());
            Ok(request)
        })
    }

    // ------------------------------------------------------------------------
    // Unsigned parts

    /// Send a form body. The form is not part of the signature.
    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> Self {
        self.map(|mut request| {
            let body = serde_urlencoded::to_string(form)?;
            request.headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            request.body = Some(body.into());
            Ok(request)
        })
    }

    /// Send a JSON body.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        self.map(|mut request| {
            let body = serde_json::to_vec(json)?;
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = Some(body.into());
            Ok(request)
        })
    }

    /// Set the request body.
    pub fn body<T: Into<Body>>(self, body: T) -> Self {
        self.map(|mut request| {
            request.body = Some(body.into());
            Ok(request)
        })
    }

    /// Add a `Header` to this Request.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|mut request| {
            let key = HeaderName::try_from(key).map_err(|e| Error::Http(e.into()))?;
            let value = HeaderValue::try_from(value).map_err(|e| Error::Http(e.into()))?;
            request.headers.append(key, value);
            Ok(request)
        })
    }

    /// Add a set of Headers to the existing ones on this Request.
    ///
    /// The headers will be merged in to any already set.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map(|mut request| {
            request.headers.extend(headers);
            Ok(request)
        })
    }

    /// Enables a request timeout.
    ///
    /// The timeout is applied from the when the request starts connecting
    /// until the response body has finished.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|mut request| {
            request.timeout = Some(timeout);
            Ok(request)
        })
    }

    fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(OAuthRequest) -> Result<OAuthRequest>,
    {
        RequestBuilder {
            request: self.request.and_then(f),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{FlowConfig, HmacSha1, OAuthClient, TokenResponse};

    use super::*;

    fn extract(auth_header: &str, key: &str) -> Option<String> {
        let content = auth_header.strip_prefix("OAuth ").unwrap();
        content
            .split(", ")
            .map(|item| item.splitn(2, '=').collect::<Vec<&str>>())
            .filter(|v| v.len() == 2)
            .find(|v| v[0] == key)
            .map(|v| {
                percent_encoding::percent_decode_str(v[1].trim_matches('"'))
                    .decode_utf8_lossy()
                    .to_string()
            })
    }

    fn twitter_client() -> OAuthClient {
        let config = FlowConfig::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "https://api.twitter.com/oauth/request_token",
            "https://api.twitter.com/oauth/authorize",
            "https://api.twitter.com/oauth/access_token",
            "https://app.example.com/callback",
        )
        .unwrap();
        let mut client = OAuthClient::new(config).unwrap();
        client.credentials.grant(&TokenResponse {
            oauth_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            oauth_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
            remain: Default::default(),
        });
        client
    }

    #[test]
    fn sign_post_query() {
        // https://developer.twitter.com/en/docs/authentication/oauth-1-0a/creating-a-signature
        let mut client = twitter_client().with_signer(
            HmacSha1::new()
                .fixed_timestamp(1_318_622_958u64)
                .fixed_nonce("kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg"),
        );
        let prepared = client
            .post("https://api.twitter.com/1.1/statuses/update.json")
            .query(&[
                ("include_entities", "true"),
                (
                    "status",
                    "Hello Ladies + Gentlemen, a signed OAuth request!",
                ),
            ])
            .prepare()
            .unwrap();

        assert_eq!(
            extract(&prepared.authorization, "oauth_signature").unwrap(),
            "hCtSmYh+iHYCEqBWrE7C7hYmtUk="
        );
        assert_eq!(
            prepared.url.query(),
            Some("include_entities=true&status=Hello+Ladies+%2B+Gentlemen%2C+a+signed+OAuth+request%21")
        );
        assert_eq!(
            client.credentials().parameters()["oauth_signature"],
            "hCtSmYh+iHYCEqBWrE7C7hYmtUk="
        );
        assert_eq!(client.credentials().parameters()["oauth_timestamp"], "1318622958");
    }

    #[test]
    fn query_is_signed_but_not_in_header() {
        let mut client = twitter_client();
        let prepared = client
            .get("https://api.example.com/x")
            .query(&[("a", "b")])
            .prepare()
            .unwrap();
        assert!(prepared.base_string.contains("a%3Db"));
        assert!(!prepared.base_string.contains("oauth_signature%3D"));
        assert_eq!(extract(&prepared.authorization, "a"), None);
        assert!(extract(&prepared.authorization, "oauth_signature").is_some());
        assert_eq!(prepared.url.as_str(), "https://api.example.com/x?a=b");
    }

    #[test]
    fn repeated_query_keys_are_all_signed() {
        let mut client = twitter_client();
        let prepared = client
            .get("https://api.example.com/x")
            .query(&[("foo", "a"), ("foo", "b")])
            .prepare()
            .unwrap();
        assert_eq!(prepared.url.query(), Some("foo=a&foo=b"));
        assert!(prepared.base_string.contains("foo%3Da%26foo%3Db"));
    }

    #[test]
    fn body_is_not_signed() {
        let mut client = twitter_client().with_signer(HmacSha1::new().fixed_timestamp(1u64).fixed_nonce("n"));
        let bare = client.post("https://api.example.com/x").prepare().unwrap();
        let with_form = client
            .post("https://api.example.com/x")
            .form(&[("c", "d")])
            .prepare()
            .unwrap();
        assert_eq!(bare.base_string, with_form.base_string);
        assert_eq!(bare.authorization, with_form.authorization);
    }

    #[test]
    fn repeated_signing_uses_fresh_nonce() {
        let mut client = twitter_client();
        let first = client.get("https://api.example.com/x").query(&[("a", "b")]).prepare().unwrap();
        let second = client.get("https://api.example.com/x").query(&[("a", "b")]).prepare().unwrap();
        assert_ne!(
            extract(&first.authorization, "oauth_nonce"),
            extract(&second.authorization, "oauth_nonce")
        );
        assert_ne!(
            extract(&first.authorization, "oauth_signature"),
            extract(&second.authorization, "oauth_signature")
        );
        assert!(!second.base_string.contains("oauth_signature%3D"));
    }

    #[test]
    fn per_request_oauth_parameter_is_not_persisted() {
        let mut client = twitter_client();
        let prepared = client
            .post("https://api.twitter.com/oauth/access_token")
            .oauth_parameter("oauth_verifier", "V1")
            .prepare()
            .unwrap();
        assert_eq!(extract(&prepared.authorization, "oauth_verifier").unwrap(), "V1");
        assert!(prepared.base_string.contains("oauth_verifier%3DV1"));
        assert!(!client.credentials().parameters().contains_key("oauth_verifier"));
    }

    #[test]
    fn header_lists_credential_parameters() {
        let mut client = twitter_client();
        let prepared = client.get("https://api.example.com/x").prepare().unwrap();
        for key in &[
            "oauth_consumer_key",
            "oauth_nonce",
            "oauth_signature",
            "oauth_signature_method",
            "oauth_timestamp",
            "oauth_token",
            "oauth_version",
        ] {
            assert!(extract(&prepared.authorization, key).is_some(), "{} missing", key);
        }
    }

    #[test]
    fn invalid_url_surfaces_on_send() {
        let mut client = twitter_client();
        let result = client.get("not a url").prepare();
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn invalid_header_surfaces_on_send() {
        let mut client = twitter_client();
        let result = client
            .get("https://api.example.com/x")
            .header("bad header", "v")
            .prepare();
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
