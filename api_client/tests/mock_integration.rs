use api_client::{ApiClient, ApiClientError, LoginRequest, MediaKind, MemberAction, RegisterRequest};
use mocks::{album_json, album_server, media_json, GET, POST, TOKEN};
use serde_json::json;

#[tokio::test]
async fn test_list_albums_and_files() {
    let server = album_server().await;
    let albums = mocks::expect_user_albums(&server, &[album_json(1, "Sea", true), album_json(2, "Family", false)]).await;
    let files = mocks::expect_album_files(
        &server,
        1,
        &[media_json(&server, 10, "a.jpg"), media_json(&server, 11, "b.mp4")],
    )
    .await;

    let client = ApiClient::with_base_url(server.base_url());
    let listed = client.list_albums(TOKEN).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].name, "Family");

    let media = client.list_album_files(TOKEN, 1).await.unwrap();
    assert_eq!(media.len(), 2);
    assert_eq!(media[1].kind(), MediaKind::Video);
    albums.assert_async().await;
    files.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_is_distinct() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/accounts/user_albums/");
            then.status(401).json_body(json!({"detail": "Given token not valid"}));
        })
        .await;

    let client = ApiClient::with_base_url(server.base_url());
    let err = client.list_albums("expired").await.unwrap_err();
    assert_eq!(err, ApiClientError::Unauthorized);
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_login_and_register() {
    let server = album_server().await;
    let login = mocks::expect_login(&server, "acc", "ref").await;
    let register = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/register/")
                .json_body(json!({"username": "ann", "password1": "pw", "password2": "pw"}));
            then.status(201);
        })
        .await;

    let client = ApiClient::with_base_url(server.base_url());
    let tokens = client
        .login(&LoginRequest { username: "ann", password: "pw" })
        .await
        .unwrap();
    assert_eq!(tokens.access.as_deref(), Some("acc"));
    assert_eq!(tokens.refresh.as_deref(), Some("ref"));

    let status = client
        .register(&RegisterRequest { username: "ann", password1: "pw", password2: "pw" })
        .await
        .unwrap();
    assert_eq!(status, 201);
    login.assert_async().await;
    register.assert_async().await;
}

#[tokio::test]
async fn test_delete_reports_status() {
    let server = album_server().await;
    mocks::expect_delete(&server, 1, 5, 200).await;
    mocks::expect_delete(&server, 1, 6, 404).await;

    let client = ApiClient::with_base_url(server.base_url());
    assert_eq!(client.delete_file(TOKEN, 1, 5).await.unwrap(), 200);
    match client.delete_file(TOKEN, 1, 6).await {
        Err(ApiClientError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tags_and_generation() {
    let server = album_server().await;
    let mut plain = mocks::expect_tags(&server, 7, false, &[]).await;

    let client = ApiClient::with_base_url(server.base_url());
    assert!(client.file_tags(TOKEN, 7, false).await.unwrap().is_empty());
    plain.assert_async().await;
    plain.delete_async().await;

    let generated = mocks::expect_tags(&server, 7, true, &["sea", "sky"]).await;
    let tags = client.file_tags(TOKEN, 7, true).await.unwrap();
    assert_eq!(tags, vec!["sea".to_string(), "sky".to_string()]);
    generated.assert_async().await;
}

#[tokio::test]
async fn test_upload_sends_multipart_form() {
    let server = album_server().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/upload-to-album/")
                .header("authorization", format!("Bearer {}", TOKEN))
                .body_contains("name=\"album_id\"")
                .body_contains("video")
                .body_contains("clip.mp4");
            then.status(201);
        })
        .await;

    let client = ApiClient::with_base_url(server.base_url());
    client
        .upload_bytes(TOKEN, 3, b"movie".to_vec(), "clip.mp4")
        .await
        .unwrap();
    upload.assert_async().await;
}

#[tokio::test]
async fn test_upload_reads_file_from_disk() {
    let server = album_server().await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/upload-to-album/")
                .body_contains("beach.JPG")
                .body_contains("photo");
            then.status(201);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beach.JPG");
    std::fs::write(&path, b"jpeg").unwrap();

    let client = ApiClient::with_base_url(server.base_url());
    client.upload_to_album(TOKEN, 3, &path).await.unwrap();
    upload.assert_async().await;

    let missing = client
        .upload_to_album(TOKEN, 3, &dir.path().join("absent.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(missing, ApiClientError::Io(_)));
    upload.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_members_and_downloads() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/accounts/albums/4/members/");
            then.status(200).json_body(json!({"members": ["ann", "bob"]}));
        })
        .await;
    let update = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/group-albums/4/members/")
                .json_body(json!({"action": "remove", "members": ["bob"]}));
            then.status(200);
        })
        .await;
    mocks::expect_archive(&server, POST, "/accounts/download_selected_photos/", b"PK\x03\x04").await;

    let client = ApiClient::with_base_url(server.base_url());
    assert_eq!(client.album_members(TOKEN, 4).await.unwrap(), vec!["ann", "bob"]);
    client
        .update_members(TOKEN, 4, MemberAction::Remove, &["bob".to_string()])
        .await
        .unwrap();
    update.assert_async().await;

    let archive = client.download_selected(TOKEN, &[1, 2]).await.unwrap();
    assert_eq!(archive, b"PK\x03\x04");
}
