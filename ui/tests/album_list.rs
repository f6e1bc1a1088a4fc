use auth::{Route, Session};
use mocks::{album_json, album_server, MockServer, GET, POST, TOKEN, USER};
use serde_json::json;
use tempfile::tempdir;
use ui::{run_until_idle, AlbumListView, BlobStore, ImageLoader, Notice, ViewContext};

fn context(server: &MockServer) -> ViewContext {
    ViewContext::new(
        api_client::ApiClient::with_base_url(server.base_url()),
        ImageLoader::new(BlobStore::new()).upgrade_insecure(false),
        Session::new(TOKEN, "refresh", USER),
    )
}

#[tokio::test]
async fn test_load_albums() {
    let server = album_server().await;
    mocks::expect_user_albums(&server, &[album_json(1, "Sea", true), album_json(2, "Family", false)]).await;

    let mut view = AlbumListView::new(context(&server));
    let cmd = view.load();
    run_until_idle(&mut view, cmd).await;
    let names: Vec<&str> = view.albums().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Sea", "Family"]);
    assert_eq!(view.open(2), Route::Album(2));
}

#[tokio::test]
async fn test_create_private_reloads() {
    let server = album_server().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/albums/create/")
                .json_body(json!({"name": "Trip"}));
            then.status(201);
        })
        .await;
    let list = mocks::expect_user_albums(&server, &[album_json(3, "Trip", true)]).await;

    let mut view = AlbumListView::new(context(&server));
    let cmd = view.create_private("  Trip ");
    run_until_idle(&mut view, cmd).await;
    assert_eq!(view.take_notices(), vec![Notice::AlbumCreated("Trip".into())]);
    assert_eq!(view.albums().len(), 1);
    create.assert_async().await;
    list.assert_async().await;
}

#[tokio::test]
async fn test_create_group_sends_members() {
    let server = album_server().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/group-albums/create/")
                .json_body(json!({"name": "Friends", "members": ["bob", "eve"]}));
            then.status(201);
        })
        .await;
    mocks::expect_user_albums(&server, &[album_json(4, "Friends", false)]).await;

    let mut view = AlbumListView::new(context(&server));
    view.add_member("bob");
    view.add_member("eve");
    view.add_member("bob");
    let cmd = view.create_group("Friends");
    run_until_idle(&mut view, cmd).await;
    assert!(view.member_draft().is_empty());
    create.assert_async().await;
}

#[tokio::test]
async fn test_download_album_archive() {
    let server = album_server().await;
    mocks::expect_archive(&server, GET, "/accounts/albums/7/download/", b"PK\x03\x04").await;
    let dir = tempdir().unwrap();

    let mut view = AlbumListView::new(context(&server));
    let cmd = view.download_album(7, dir.path().to_path_buf());
    run_until_idle(&mut view, cmd).await;

    let saved = dir.path().join("album_7.zip");
    assert_eq!(std::fs::read(&saved).unwrap(), b"PK\x03\x04");
    assert_eq!(view.take_notices(), vec![Notice::ArchiveSaved(saved)]);
}

#[tokio::test]
async fn test_member_management() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/accounts/albums/4/members/");
            then.status(200).json_body(json!(["ann", "bob"]));
        })
        .await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/accounts/group-albums/4/members/")
                .json_body(json!({"action": "add", "members": ["bob"]}));
            then.status(200);
        })
        .await;

    let mut view = AlbumListView::new(context(&server));
    let cmd = view.add_members(4, &["bob".to_string(), " ".to_string(), "bob".to_string()]);
    run_until_idle(&mut view, cmd).await;
    add.assert_async().await;
    assert_eq!(view.take_notices(), vec![Notice::MembersUpdated]);
    assert_eq!(view.members_of(4), Some(&["ann".to_string(), "bob".to_string()][..]));
}

#[tokio::test]
async fn test_failed_member_update() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts/group-albums/4/members/");
            then.status(403).body("not an owner");
        })
        .await;

    let mut view = AlbumListView::new(context(&server));
    let cmd = view.remove_members(4, &["bob".to_string()]);
    run_until_idle(&mut view, cmd).await;
    assert_eq!(view.take_notices(), vec![Notice::MembersUpdateFailed]);
    assert_eq!(view.route(), None);
}

#[tokio::test]
async fn test_expired_session_redirects_when_enabled() {
    let server = album_server().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/accounts/user_albums/");
            then.status(401);
        })
        .await;

    let mut view = AlbumListView::new(context(&server).redirect_on_unauthorized(true));
    let cmd = view.load();
    run_until_idle(&mut view, cmd).await;
    assert_eq!(view.route(), Some(Route::Login));
}
