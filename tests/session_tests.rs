// SPDX-License-Identifier: MIT

//! Session cookie handling and the 401 mapping for the protected API.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{identity, MockIdentityProvider};
use eventgate::config::Config;
use eventgate::middleware::session::create_session_jwt;
use eventgate::routes::create_router;
use eventgate::services::{BackendClient, CallPolicy, ProfileReconciler};
use eventgate::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for oneshot

fn test_state(provider: Arc<MockIdentityProvider>) -> Arc<AppState> {
    let config = Config::default();
    // Unreachable backend: these tests never get far enough to call it.
    let backend = BackendClient::new(
        "http://127.0.0.1:1",
        CallPolicy {
            timeout: Duration::from_millis(100),
            max_retries: 0,
            initial_backoff: Duration::from_millis(10),
        },
    );
    let reconciler = ProfileReconciler::new(backend.clone(), provider.clone());
    Arc::new(AppState {
        config,
        backend,
        identity: provider,
        reconciler,
    })
}

fn session_jwt(state: &AppState, user_id: &str) -> String {
    create_session_jwt(user_id, "provider-token", &state.config.session_signing_key).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let app = create_router(test_state(provider));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn me_without_session_is_401() {
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let app = create_router(test_state(provider));

    let response = app
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_garbage_cookie_is_401() {
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let app = create_router(test_state(provider));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, "eventgate_session=not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_valid_session_reports_onboarding_state() {
    // Identity with no role from any source: reconciliation is a no-op.
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let state = test_state(provider);
    let jwt = session_jwt(&state, "u1");
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("eventgate_session={}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["needs_onboarding"], true);
    assert!(json["profile"].is_null());
    assert!(json["destination"].is_null());
}

#[tokio::test]
async fn bearer_header_is_accepted_in_place_of_cookie() {
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let state = test_state(provider);
    let jwt = session_jwt(&state, "u1");
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", jwt))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_sets_session_cookie_and_reports_onboarding() {
    // Provider authenticates; identity has no role, so reconciliation ends
    // at the onboarding gate without touching the backend.
    let provider = Arc::new(
        MockIdentityProvider::new(identity("u1", &[])).with_session("u1", "provider-token"),
    );
    let app = create_router(test_state(provider));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie is set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("eventgate_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let json = body_json(response).await;
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["needs_onboarding"], true);
    assert!(json["profile"].is_null());
    assert!(json["destination"].is_null());
}

#[tokio::test]
async fn login_cookie_is_accepted_by_the_protected_api() {
    let provider = Arc::new(
        MockIdentityProvider::new(identity("u1", &[])).with_session("u1", "provider-token"),
    );
    let state = test_state(provider);

    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_failure_relays_provider_status_and_body() {
    let provider_body = r#"{"error":"invalid_credentials"}"#;
    let provider = Arc::new(
        MockIdentityProvider::new(identity("u1", &[])).with_auth_failure(401, provider_body),
    );
    let app = create_router(test_state(provider));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email":"a@b.com","password":"wrong"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), provider_body);
}

#[tokio::test]
async fn signup_with_role_provisions_and_sets_cookie() {
    let provider = Arc::new(
        MockIdentityProvider::new(identity("u2", &[])).with_session("u2", "provider-token"),
    );

    // First-time reconciliation for the chosen role ends in create-user.
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/api/v1/users"))
        .respond_with(wiremock::ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = BackendClient::new(
        server.uri(),
        CallPolicy {
            timeout: Duration::from_millis(200),
            max_retries: 0,
            initial_backoff: Duration::from_millis(10),
        },
    );
    let reconciler = ProfileReconciler::new(backend.clone(), provider.clone());
    let state = Arc::new(AppState {
        config: Config::default(),
        backend,
        identity: provider.clone(),
        reconciler,
    });
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"a@b.com","password":"pw","role":"organizer"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie is set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("eventgate_session="));

    let json = body_json(response).await;
    assert_eq!(json["user_id"], "u2");
    assert_eq!(json["needs_onboarding"], false);
    assert_eq!(json["profile"]["role"], "organizer");
    assert_eq!(json["destination"], "/organizer");
    assert_eq!(provider.grant_count(), 1);
}

#[tokio::test]
async fn signup_rejects_admin_role_before_calling_provider() {
    // Provider would succeed; the role check must fire first.
    let provider = Arc::new(
        MockIdentityProvider::new(identity("u1", &[])).with_session("u1", "provider-token"),
    );
    let app = create_router(test_state(provider));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"email":"a@b.com","password":"pw","role":"admin"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn onboarding_rejects_admin_role() {
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let state = test_state(provider);
    let jwt = session_jwt(&state, "u1");
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/onboarding")
                .header(header::COOKIE, format!("eventgate_session={}", jwt))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"role":"admin"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn onboarding_rejects_unknown_role() {
    let provider = Arc::new(MockIdentityProvider::new(identity("u1", &[])));
    let state = test_state(provider);
    let jwt = session_jwt(&state, "u1");
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/onboarding")
                .header(header::COOKIE, format!("eventgate_session={}", jwt))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"role":"superuser"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ticket_validation_requires_staff_role() {
    // Organizer identity trying to validate a ticket: 403.
    let mut id = identity("u1", &["role:organizer"]);
    id.server_metadata = serde_json::json!({
        "appUserId": eventgate::models::profile::derive_app_user_id("u1"),
        "role": "organizer",
    });
    id.client_read_only_metadata = id.server_metadata.clone();
    let provider = Arc::new(MockIdentityProvider::new(id));

    // The reconciliation inside the handler calls create-user, so this test
    // needs a live backend stub.
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/api/v1/users"))
        .respond_with(wiremock::ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let backend = BackendClient::new(
        server.uri(),
        CallPolicy {
            timeout: Duration::from_millis(200),
            max_retries: 0,
            initial_backoff: Duration::from_millis(10),
        },
    );
    let reconciler = ProfileReconciler::new(backend.clone(), provider.clone());
    let state = Arc::new(AppState {
        config: Config::default(),
        backend,
        identity: provider,
        reconciler,
    });

    let jwt = session_jwt(&state, "u1");
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/ticket-validations")
                .header(header::COOKIE, format!("eventgate_session={}", jwt))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"ticketId":"t-1","eventId":"ev-1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
