use api_client::{ApiClient, RegisterRequest};
use auth::{login, logout, register, AuthError, Route, TokenStore};
use mocks::{album_server, POST};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn login_persists_session() {
    let server = album_server().await;
    let mock = mocks::expect_login(&server, "acc", "ref").await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::file_only(dir.path().join("tokens.json"));
    let client = ApiClient::with_base_url(server.base_url());

    let (session, route) = login(&client, &store, "ann", "secret").await.unwrap();
    assert_eq!(route, Route::Albums);
    assert_eq!(session.bearer().unwrap(), "acc");
    assert_eq!(session.refresh_token(), Some("ref"));
    mock.assert_async().await;

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, session);
    assert_eq!(reloaded.username(), Some("ann"));

    assert_eq!(logout(&store).unwrap(), Route::Login);
    assert!(!store.load().unwrap().is_logged_in());
}

#[tokio::test]
async fn login_without_token_pair_is_rejected() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts/login/");
            then.status(200).json_body(json!({"access": "acc", "detail": "partial"}));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::file_only(dir.path().join("tokens.json"));
    let client = ApiClient::with_base_url(server.base_url());

    let err = login(&client, &store, "ann", "secret").await.unwrap_err();
    assert_eq!(err, AuthError::Rejected("partial".into()));
    assert!(!store.file().path().exists());
}

#[tokio::test]
async fn login_failure_surfaces_server_detail() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts/login/");
            then.status(401)
                .json_body(json!({"detail": "No active account found with the given credentials"}));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let store = TokenStore::file_only(dir.path().join("tokens.json"));
    let client = ApiClient::with_base_url(server.base_url());

    match login(&client, &store, "ann", "wrong").await {
        Err(AuthError::Rejected(detail)) => assert!(detail.starts_with("No active account")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn register_checks_password_confirmation_locally() {
    let server = album_server().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts/register/");
            then.status(201);
        })
        .await;
    let client = ApiClient::with_base_url(server.base_url());

    let mismatch = RegisterRequest { username: "ann", password1: "a", password2: "b" };
    assert_eq!(register(&client, &mismatch).await, Err(AuthError::PasswordMismatch));
    mock.assert_hits_async(0).await;

    let form = RegisterRequest { username: "ann", password1: "a", password2: "a" };
    assert_eq!(register(&client, &form).await, Ok(Route::Login));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn register_requires_created_status() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts/register/");
            then.status(200);
        })
        .await;
    let client = ApiClient::with_base_url(server.base_url());
    let form = RegisterRequest { username: "ann", password1: "a", password2: "a" };
    assert!(matches!(register(&client, &form).await, Err(AuthError::Rejected(_))));
}
