//! End-to-end tests of the authorization and token endpoints over HTTP.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use rest_oauth2::Config;
use rest_oauth2::pkce;

// ─── Authorization code flow ─────────────────────────────────────────────────

#[tokio::test]
async fn test_full_code_flow() {
    let app = build_test_router();
    let (client_id, secret) = register_client(&app, "private", true).await;
    let secret = secret.unwrap();

    // 1. Anonymous user is sent to log in, with the request replayed afterwards
    let uri = authorize_uri(&[
        ("response_type", "code"),
        ("client_id", &client_id),
        ("redirect_uri", REDIRECT_URI),
        ("state", "xyz"),
    ]);
    let response = send(&app, get_as(&uri, None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let login = location(&response);
    assert_eq!(login.path(), "/login");
    let redirect_to = query_param(&login, "redirect_to").unwrap();
    assert!(redirect_to.starts_with("http://as.test/oauth2/login?action=oauth2_authorize"));
    assert!(redirect_to.contains(&client_id));

    // 2. Logged-in user sees the approval form
    let nonce = fetch_nonce(&app, &uri, "alice").await;

    // 3. Approve: redirect back with code and state
    let response = decide(&app, &uri, "alice", &nonce, "authorize").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let callback = location(&response);
    assert!(callback.as_str().starts_with(REDIRECT_URI));
    assert_eq!(query_param(&callback, "state").as_deref(), Some("xyz"));
    let code = query_param(&callback, "code").unwrap();
    assert_eq!(code.len(), 12);

    // 4. Exchange the code
    let response = send(
        &app,
        token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &client_id),
                ("client_secret", &secret),
                ("code", &code),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
    assert_eq!(response.headers().get(header::PRAGMA).unwrap(), "no-cache");
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    let access_token = body["access_token"].as_str().unwrap().to_owned();

    // 5. The token authenticates alice
    let response = send(&app, bearer_request("GET", "/oauth2/tokens", &access_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = body_json(response).await;
    assert_eq!(tokens.as_array().unwrap().len(), 1);
    assert_eq!(tokens[0]["client_id"], client_id.as_str());
    assert_eq!(tokens[0]["app"]["name"], "Integration Test Client");
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let code = obtain_code(&app, &client_id, &[]).await;
    let params = [("grant_type", "authorization_code"), ("client_id", &client_id), ("code", &code)];

    let first = send(&app, token_request(&params, None)).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(&app, token_request(&params, None)).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(second).await["code"], "invalid_code");
}

#[tokio::test]
async fn test_state_omitted_when_absent() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[("response_type", "code"), ("client_id", &client_id)]);

    let nonce = fetch_nonce(&app, &uri, "alice").await;
    let response = decide(&app, &uri, "alice", &nonce, "authorize").await;
    let callback = location(&response);
    assert!(query_param(&callback, "code").is_some());
    assert!(query_param(&callback, "state").is_none());
}

#[tokio::test]
async fn test_cancel_redirects_with_access_denied() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[("response_type", "code"), ("client_id", &client_id), ("state", "s1")]);

    let nonce = fetch_nonce(&app, &uri, "alice").await;
    let response = decide(&app, &uri, "alice", &nonce, "cancel").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let callback = location(&response);
    assert_eq!(query_param(&callback, "error").as_deref(), Some("access_denied"));
    assert_eq!(query_param(&callback, "state").as_deref(), Some("s1"));
    assert!(query_param(&callback, "code").is_none());
}

#[tokio::test]
async fn test_invalid_form_action() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[("response_type", "code"), ("client_id", &client_id)]);

    let nonce = fetch_nonce(&app, &uri, "alice").await;
    let response = decide(&app, &uri, "alice", &nonce, "maybe").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("invalid_action"));
}

#[tokio::test]
async fn test_nonce_bound_to_identity() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[("response_type", "code"), ("client_id", &client_id)]);

    let nonce = fetch_nonce(&app, &uri, "alice").await;
    let response = decide(&app, &uri, "bob", &nonce, "authorize").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("invalid_nonce"));
}

// ─── Implicit flow ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_implicit_token_only_in_fragment() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[
        ("response_type", "token"),
        ("client_id", &client_id),
        ("state", "abc"),
    ]);

    let nonce = fetch_nonce(&app, &uri, "alice").await;
    let response = decide(&app, &uri, "alice", &nonce, "authorize").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let callback = location(&response);

    assert!(callback.query().is_none());
    let token = fragment_param(&callback, "access_token").unwrap();
    assert_eq!(fragment_param(&callback, "token_type").as_deref(), Some("bearer"));
    assert_eq!(fragment_param(&callback, "state").as_deref(), Some("abc"));

    let response = send(&app, bearer_request("GET", "/oauth2/tokens", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_implicit_cancel_uses_fragment() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[("response_type", "token"), ("client_id", &client_id)]);

    let nonce = fetch_nonce(&app, &uri, "alice").await;
    let response = decide(&app, &uri, "alice", &nonce, "cancel").await;
    let callback = location(&response);
    assert!(callback.query().is_none());
    assert_eq!(fragment_param(&callback, "error").as_deref(), Some("access_denied"));
}

// ─── Request validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_authorization_request_errors() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let (draft_id, _) = register_client(&app, "public", false).await;

    let cases: Vec<(Vec<(&str, &str)>, &str)> = vec![
        (vec![("client_id", &client_id)], "invalid_response_type"),
        (vec![("response_type", "id_token"), ("client_id", &client_id)], "invalid_response_type"),
        (vec![("response_type", "code")], "missing_client_id"),
        (vec![("response_type", "code"), ("client_id", "nosuchclient")], "invalid_client_id"),
        (vec![("response_type", "code"), ("client_id", &draft_id)], "unapproved_client"),
        (
            vec![
                ("response_type", "code"),
                ("client_id", &client_id),
                ("redirect_uri", "https://evil.example.com/cb"),
            ],
            "invalid_redirect_uri",
        ),
        (
            vec![
                ("response_type", "code"),
                ("client_id", &client_id),
                ("redirect_uri", "https://client.example.com/cb/extra"),
            ],
            "invalid_redirect_uri",
        ),
    ];

    for (params, expected) in cases {
        let response = send(&app, get_as(&authorize_uri(&params), Some("alice"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{expected}");
        assert!(body_text(response).await.contains(expected), "{expected}");
    }
}

#[tokio::test]
async fn test_redirect_uri_query_is_ignored_for_matching() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let redirect = format!("{REDIRECT_URI}?tab=2");
    let code_uri = authorize_uri(&[
        ("response_type", "code"),
        ("client_id", &client_id),
        ("redirect_uri", &redirect),
    ]);

    let nonce = fetch_nonce(&app, &code_uri, "alice").await;
    let response = decide(&app, &code_uri, "alice", &nonce, "authorize").await;
    let callback = location(&response);
    assert_eq!(query_param(&callback, "tab").as_deref(), Some("2"));
    assert!(query_param(&callback, "code").is_some());
}

#[tokio::test]
async fn test_missing_action_is_rejected() {
    let app = build_test_router();
    let response = send(&app, get_as("/oauth2/login?response_type=code&client_id=x", Some("alice"))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── PKCE ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pkce_s256_flow() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let (verifier, challenge) = pkce::generate_pair(None, 64).unwrap();

    let code = obtain_code(
        &app,
        &client_id,
        &[("code_challenge", &challenge), ("code_challenge_method", "s256")],
    )
    .await;
    let response = send(
        &app,
        token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &client_id),
                ("code", &code),
                ("code_verifier", &verifier),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pkce_verifier_mismatch() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let (_, challenge) = pkce::generate_pair(None, 64).unwrap();

    let code = obtain_code(
        &app,
        &client_id,
        &[("code_challenge", &challenge), ("code_challenge_method", "S256")],
    )
    .await;
    let wrong = "w".repeat(64);
    let response = send(
        &app,
        token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &client_id),
                ("code", &code),
                ("code_verifier", &wrong),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_code_verifier");
}

#[tokio::test]
async fn test_invalid_challenge_redirects_with_error() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let short = "a".repeat(42);
    let uri = authorize_uri(&[
        ("response_type", "code"),
        ("client_id", &client_id),
        ("state", "st"),
        ("code_challenge", &short),
    ]);

    let response = send(&app, get_as(&uri, Some("alice"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let callback = location(&response);
    assert_eq!(query_param(&callback, "error").as_deref(), Some("invalid_request"));
    assert!(query_param(&callback, "error_description").is_some());
    assert_eq!(query_param(&callback, "state").as_deref(), Some("st"));
}

#[tokio::test]
async fn test_unsupported_challenge_method() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let challenge = "a".repeat(43);
    let uri = authorize_uri(&[
        ("response_type", "code"),
        ("client_id", &client_id),
        ("code_challenge", &challenge),
        ("code_challenge_method", "sha1"),
    ]);

    let response = send(&app, get_as(&uri, Some("alice"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(query_param(&location(&response), "error").as_deref(), Some("invalid_request"));
}

#[tokio::test]
async fn test_forced_pkce_requires_challenge() {
    let config = Config { force_pkce: true, ..Config::for_testing() };
    let app = build_test_server(config).router();
    let (client_id, _) = register_client(&app, "public", true).await;
    let uri = authorize_uri(&[("response_type", "code"), ("client_id", &client_id)]);

    let response = send(&app, get_as(&uri, Some("alice"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(query_param(&location(&response), "error").as_deref(), Some("invalid_request"));
}

// ─── Token endpoint ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_confidential_client_secret_enforcement() {
    let app = build_test_router();
    let (client_id, secret) = register_client(&app, "private", true).await;
    let secret = secret.unwrap();
    let code = obtain_code(&app, &client_id, &[]).await;

    let response = send(
        &app,
        token_request(
            &[("grant_type", "authorization_code"), ("client_id", &client_id), ("code", &code)],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "secret_required");

    let response = send(
        &app,
        token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &client_id),
                ("client_secret", "not-the-secret"),
                ("code", &code),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "invalid_secret");

    // Basic credentials, and the code survived the failed attempts
    let response = send(
        &app,
        token_request(
            &[("grant_type", "authorization_code"), ("code", &code)],
            Some((&client_id, &secret)),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_endpoint_errors() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;

    let response = send(
        &app,
        token_request(&[("grant_type", "password"), ("client_id", &client_id), ("code", "x")], None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "unsupported_grant_type");
    assert_eq!(body["error"], "unsupported_grant_type");
    assert_eq!(body["data"]["status"], 400);

    let response =
        send(&app, token_request(&[("grant_type", "authorization_code"), ("code", "x")], None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_request");

    let response = send(
        &app,
        token_request(
            &[("grant_type", "authorization_code"), ("client_id", "nosuchclient"), ("code", "x")],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_client");

    let response = send(
        &app,
        token_request(
            &[("grant_type", "authorization_code"), ("client_id", &client_id), ("code", "nosuchcode")],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_token_redirect_uri_must_match_authorization() {
    let app = build_test_router();
    let (client_id, _) = register_client(&app, "public", true).await;

    let code = obtain_code(&app, &client_id, &[("redirect_uri", REDIRECT_URI)]).await;
    let response = send(
        &app,
        token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &client_id),
                ("code", &code),
                ("redirect_uri", "https://evil.example/steal"),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "redirect_uri_mismatch");
    assert_eq!(body["error"], "invalid_grant");

    // The rejected exchange consumed the code.
    let params = [("grant_type", "authorization_code"), ("client_id", &client_id), ("code", &code)];
    let response = send(&app, token_request(&params, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let code = obtain_code(&app, &client_id, &[("redirect_uri", REDIRECT_URI)]).await;
    let response = send(
        &app,
        token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", &client_id),
                ("code", &code),
                ("redirect_uri", REDIRECT_URI),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_endpoint_rejects_non_form_bodies_as_json() {
    let app = build_test_router();

    let response = send(
        &app,
        Request::post("/oauth2/access_token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"grant_type":"authorization_code"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["error"], "invalid_request");

    let response =
        send(&app, Request::post("/oauth2/access_token").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_request");

    let response = send(&app, token_request(&[], None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_request");
}

// ─── Discovery ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_index_advertises_oauth2() {
    let app = build_test_router();
    let response = send(&app, get_as("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let oauth2 = &body["authentication"]["oauth2"];
    assert_eq!(
        oauth2["endpoints"]["authorization"],
        "http://as.test/oauth2/login?action=oauth2_authorize"
    );
    assert_eq!(oauth2["endpoints"]["token"], "http://as.test/oauth2/access_token");
    assert_eq!(oauth2["grant_types"], serde_json::json!(["authorization_code", "implicit"]));
}

#[tokio::test]
async fn test_authorize_alias_redirects() {
    let app = build_test_router();
    let response = send(&app, get_as("/oauth2/authorize?client_id=abc&response_type=code", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let target = location(&response);
    assert_eq!(target.path(), "/oauth2/login");
    assert_eq!(query_param(&target, "action").as_deref(), Some("oauth2_authorize"));
    assert_eq!(query_param(&target, "client_id").as_deref(), Some("abc"));

    let body = body_json(response).await;
    assert_eq!(body["url"].as_str(), Some(target.as_str()));
}

#[tokio::test]
async fn test_health() {
    let app = build_test_router();
    let response = send(&app, get_as("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
