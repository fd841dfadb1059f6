//! Signed requests with previously granted credentials.

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oauth1_flow::{Credentials, OAuthClient, OAuthClientProvider, TokenResponse};

fn authorized_credentials() -> Credentials {
    let mut credentials = Credentials::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44", Vec::new());
    credentials.grant(&TokenResponse {
        oauth_token: "nnch734d00sl2jdk".to_string(),
        oauth_token_secret: "pfkkdhi9sl3r4s00".to_string(),
        remain: Default::default(),
    });
    credentials
}

fn field<'a>(authorization: &'a str, key: &str) -> Option<&'a str> {
    authorization
        .strip_prefix("OAuth ")?
        .split(", ")
        .filter_map(|item| item.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.trim_matches('"'))
}

#[tokio::test]
async fn get_carries_signature_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("file", "vacation.jpg"))
        .and(query_param("size", "original"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = reqwest::Client::new().oauth1_restored(authorized_credentials());
    let resp = client
        .get(format!("{}/photos", server.uri()))
        .query(&[("file", "vacation.jpg"), ("size", "original")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(field(&authorization, "oauth_token"), Some("nnch734d00sl2jdk"));
    assert_eq!(field(&authorization, "oauth_signature_method"), Some("HMAC-SHA1"));
    assert_eq!(field(&authorization, "oauth_version"), Some("1.0"));
    assert_eq!(field(&authorization, "file"), None);

    let parameters = client.credentials().parameters();
    assert_eq!(
        field(&authorization, "oauth_nonce"),
        parameters.get("oauth_nonce").map(String::as_str)
    );
    assert!(parameters.contains_key("oauth_signature"));
}

#[tokio::test]
async fn status_is_not_interpreted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/statuses/update.json"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("status=hello"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = OAuthClient::restore(authorized_credentials());
    let resp = client
        .post(format!("{}/statuses/update.json", server.uri()))
        .form(&[("status", "hello")])
        .header("x-trace", "abc")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    assert_eq!(resp.text().await.unwrap(), "forbidden");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].headers.get("x-trace").unwrap(), "abc");
}
