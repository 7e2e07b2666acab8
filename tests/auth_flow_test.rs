//! End-to-end tests for register, login, logout, and profile handling
//! against a mock backend.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reelclient::auth::store::{KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER};
use reelclient::{ApiClient, ApiError, Config, Session, SessionStore};

fn client_for(base_url: &str) -> (TempDir, Arc<Session>, ApiClient) {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(Session::open(SessionStore::new(dir.path())).unwrap());
    let config = Config {
        api_url: base_url.to_string(),
        ..Default::default()
    };
    let client = ApiClient::new(&config, Arc::clone(&session)).unwrap();
    (dir, session, client)
}

fn auth_body(access: &str, refresh: &str, email: &str) -> Value {
    json!({
        "tokens": {"access": access, "refresh": refresh},
        "user": {"email": email}
    })
}

#[tokio::test]
async fn login_persists_tokens_and_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .and(body_json(json!({
            "email": "user@example.com",
            "password": "secret123"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_body("A1", "R1", "user@example.com")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, session, client) = client_for(&server.uri());
    let user = client.login("user@example.com", "secret123").await.unwrap();

    assert_eq!(user.email.as_deref(), Some("user@example.com"));
    assert!(client.is_authenticated());
    let store = session.store();
    assert_eq!(store.read(KEY_ACCESS_TOKEN).unwrap().as_deref(), Some("A1"));
    assert_eq!(store.read(KEY_REFRESH_TOKEN).unwrap().as_deref(), Some("R1"));
    assert!(store.contains(KEY_USER));
}

#[tokio::test]
async fn login_failure_surfaces_remote_payload_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let (_dir, _session, client) = client_for(&server.uri());
    let err = client
        .login("user@example.com", "wrong")
        .await
        .unwrap_err();

    // Rejected credentials are not an expired session: the payload comes
    // through untouched, 401 included.
    let api_err = err.downcast_ref::<ApiError>().unwrap();
    let ApiError::Remote { status, payload } = api_err else {
        panic!("expected Remote, got {api_err:?}");
    };
    assert_eq!(*status, 401);
    assert_eq!(
        payload["detail"],
        "No active account found with the given credentials"
    );
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn register_derives_username_from_email_when_absent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register/"))
        .and(body_partial_json(json!({
            "email": "newuser@example.com",
            "username": "newuser",
            "password2": "secret123"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_body("A1", "R1", "newuser@example.com")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, _session, client) = client_for(&server.uri());
    let user = client
        .register("newuser@example.com", "secret123", None)
        .await
        .unwrap();

    assert_eq!(user.email.as_deref(), Some("newuser@example.com"));
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn register_validation_errors_pass_through_field_keyed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "email": ["user with this email already exists."]
        })))
        .mount(&server)
        .await;

    let (_dir, _session, client) = client_for(&server.uri());
    let err = client
        .register("taken@example.com", "secret123", Some("taken"))
        .await
        .unwrap_err();

    let api_err = err.downcast_ref::<ApiError>().unwrap();
    let fields = api_err.field_errors().expect("field-keyed payload");
    assert_eq!(fields["email"][0], "user with this email already exists.");
}

#[tokio::test]
async fn logout_notifies_backend_and_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_body("A1", "R1", "u@e.com")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout/"))
        .and(body_json(json!({ "refresh_token": "R1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, session, client) = client_for(&server.uri());
    client.login("u@e.com", "pw").await.unwrap();
    client.logout().await.unwrap();

    assert!(!client.is_authenticated());
    let store = session.store();
    assert!(!store.contains(KEY_ACCESS_TOKEN));
    assert!(!store.contains(KEY_REFRESH_TOKEN));
    assert!(!store.contains(KEY_USER));
}

#[tokio::test]
async fn logout_clears_session_even_when_backend_unreachable() {
    // Nothing is listening here, so the remote notification fails at the
    // network level.
    let (_dir, session, client) = client_for("http://127.0.0.1:1");
    session
        .establish(
            reelclient::TokenPair {
                access: "A1".into(),
                refresh: "R1".into(),
            },
            reelclient::UserProfile::default(),
        )
        .unwrap();
    assert!(client.is_authenticated());

    client.logout().await.unwrap();

    assert!(!client.is_authenticated());
    assert!(!session.store().contains(KEY_ACCESS_TOKEN));
}

#[tokio::test]
async fn profile_update_replaces_stored_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_body("A1", "R1", "u@e.com")),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/profile/"))
        .and(body_partial_json(json!({ "username": "renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "u@e.com",
            "username": "renamed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, session, client) = client_for(&server.uri());
    client.login("u@e.com", "pw").await.unwrap();

    let updated = client
        .update_profile(&json!({ "username": "renamed" }))
        .await
        .unwrap();

    assert_eq!(updated.username.as_deref(), Some("renamed"));
    assert_eq!(session.user().unwrap().username.as_deref(), Some("renamed"));
    let stored: Value =
        serde_json::from_str(&session.store().read(KEY_USER).unwrap().unwrap()).unwrap();
    assert_eq!(stored["username"], "renamed");
}

#[tokio::test]
async fn session_survives_client_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_body("A1", "R1", "u@e.com")),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    {
        let session = Arc::new(Session::open(SessionStore::new(dir.path())).unwrap());
        let config = Config {
            api_url: server.uri(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, session).unwrap();
        client.login("u@e.com", "pw").await.unwrap();
    }

    // A new client over the same store picks the session back up.
    let session = Arc::new(Session::open(SessionStore::new(dir.path())).unwrap());
    let config = Config {
        api_url: server.uri(),
        ..Default::default()
    };
    let client = ApiClient::new(&config, session).unwrap();
    assert!(client.is_authenticated());
}
