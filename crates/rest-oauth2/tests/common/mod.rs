//! Shared helpers for driving the router in integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use rest_oauth2::{Config, MemoryStore, OAuthServer, StaticDirectory};

pub const REDIRECT_URI: &str = "https://client.example.com/cb";
pub const IDENTITY_HEADER: &str = "x-remote-user";
pub const ADMIN: &str = "admin";

pub fn build_test_server(config: Config) -> OAuthServer {
    let users = StaticDirectory::parse("admin:admin,alice,bob");
    OAuthServer::new(config, Arc::new(MemoryStore::new()), Arc::new(users)).unwrap()
}

pub fn build_test_router() -> Router {
    build_test_server(Config::for_testing()).router()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn location(response: &Response<Body>) -> Url {
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    Url::parse(location).unwrap()
}

pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}

pub fn fragment_param(url: &Url, key: &str) -> Option<String> {
    url::form_urlencoded::parse(url.fragment()?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// JSON request to the API as a session user.
pub fn api_request(method: &str, uri: &str, user: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri).header(IDENTITY_HEADER, user);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Register a client as the admin and optionally approve it.
/// Returns `(client_id, secret)`.
pub async fn register_client(app: &Router, client_type: &str, approve: bool) -> (String, Option<String>) {
    let response = send(
        app,
        api_request(
            "POST",
            "/oauth2/clients",
            ADMIN,
            Some(json!({
                "name": "Integration Test Client",
                "description": "Client used by the integration tests",
                "type": client_type,
                "redirect_uris": [REDIRECT_URI],
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let client = body_json(response).await;
    let id = client["id"].as_str().unwrap().to_owned();
    let secret = client["secret"].as_str().map(str::to_owned);

    if approve {
        let response =
            send(app, api_request("POST", &format!("/oauth2/clients/{id}/approve"), ADMIN, None))
                .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    (id, secret)
}

/// Authorization endpoint URI with the given parameters.
pub fn authorize_uri(params: &[(&str, &str)]) -> String {
    let mut all = vec![("action", "oauth2_authorize")];
    all.extend_from_slice(params);
    format!("/oauth2/login?{}", serde_urlencoded::to_string(&all).unwrap())
}

pub fn get_as(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user) = user {
        builder = builder.header(IDENTITY_HEADER, user);
    }
    builder.body(Body::empty()).unwrap()
}

/// Load the approval page and pull the anti-forgery token out of it.
pub async fn fetch_nonce(app: &Router, uri: &str, user: &str) -> String {
    let response = send(app, get_as(uri, Some(user))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    let marker = r#"name="_wpnonce" value=""#;
    let start = html.find(marker).unwrap() + marker.len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].to_owned()
}

/// Submit the approval form.
pub async fn decide(app: &Router, uri: &str, user: &str, nonce: &str, action: &str) -> Response<Body> {
    let form = serde_urlencoded::to_string([("_wpnonce", nonce), ("wp-submit", action)]).unwrap();
    send(
        app,
        Request::post(uri)
            .header(IDENTITY_HEADER, user)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap(),
    )
    .await
}

/// Run the approval flow for `response_type=code` and return the code.
pub async fn obtain_code(app: &Router, client_id: &str, extra: &[(&str, &str)]) -> String {
    let mut params = vec![("response_type", "code"), ("client_id", client_id)];
    params.extend_from_slice(extra);
    let uri = authorize_uri(&params);

    let nonce = fetch_nonce(app, &uri, "alice").await;
    let response = decide(app, &uri, "alice", &nonce, "authorize").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    query_param(&location(&response), "code").unwrap()
}

pub fn token_request(params: &[(&str, &str)], basic: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::post("/oauth2/access_token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some((id, secret)) = basic {
        let encoded = STANDARD.encode(format!("{id}:{secret}"));
        builder = builder.header(header::AUTHORIZATION, format!("Basic {encoded}"));
    }
    builder.body(Body::from(serde_urlencoded::to_string(params).unwrap())).unwrap()
}
