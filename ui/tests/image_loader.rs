use api_client::MediaFile;
use auth::Session;
use mocks::{album_server, media_json, MockServer, TOKEN, USER};
use ui::{BlobStore, ImageLoader, ImageLoaderError};

fn media(server: &MockServer, id: i64, name: &str) -> MediaFile {
    serde_json::from_value(media_json(server, id, name)).unwrap()
}

fn loader() -> ImageLoader {
    ImageLoader::new(BlobStore::new()).upgrade_insecure(false)
}

fn session() -> Session {
    Session::new(TOKEN, "refresh", USER)
}

#[tokio::test]
async fn test_preview_uses_preview_path() {
    let server = album_server().await;
    let mock = mocks::expect_preview(&server, "a.jpg", 200).await;
    let loader = loader();

    let handle = loader.load_preview(&media(&server, 1, "a.jpg"), &session()).await.unwrap();
    let blob = loader.blobs().get(&handle).unwrap();
    assert_eq!(blob.bytes, b"preview:a.jpg");
    assert_eq!(blob.content_type.as_deref(), Some("image/jpeg"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_every_call_refetches() {
    let server = album_server().await;
    let mock = mocks::expect_asset(&server, "a.jpg", 200).await;
    let loader = loader();
    let item = media(&server, 1, "a.jpg");

    let first = loader.load_full(&item, &session()).await.unwrap();
    let second = loader.load_full(&item, &session()).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(loader.blobs().live_count(), 2);
    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_status_errors() {
    let server = album_server().await;
    mocks::expect_asset(&server, "gone.jpg", 404).await;
    mocks::expect_asset(&server, "locked.jpg", 401).await;
    mocks::expect_asset(&server, "broken.jpg", 500).await;
    let loader = loader();

    let err = loader.load_full(&media(&server, 1, "gone.jpg"), &session()).await.unwrap_err();
    assert_eq!(err, ImageLoaderError::NotFound);
    let err = loader.load_full(&media(&server, 2, "locked.jpg"), &session()).await.unwrap_err();
    assert!(err.is_unauthorized());
    let err = loader.load_full(&media(&server, 3, "broken.jpg"), &session()).await.unwrap_err();
    assert!(matches!(err, ImageLoaderError::Fetch(_)));
    assert_eq!(loader.blobs().live_count(), 0);
}

#[tokio::test]
async fn test_video_failure_is_silent() {
    let server = album_server().await;
    mocks::expect_asset(&server, "clip.mp4", 200).await;
    mocks::expect_asset(&server, "lost.mp4", 404).await;
    let loader = loader();

    assert!(loader.load_video(&media(&server, 1, "clip.mp4"), &session()).await.is_some());
    assert!(loader.load_video(&media(&server, 2, "lost.mp4"), &session()).await.is_none());
    assert_eq!(loader.blobs().live_count(), 1);
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = album_server().await;
    let mock = mocks::expect_asset(&server, "a.jpg", 200).await;
    let err = loader()
        .load_full(&media(&server, 1, "a.jpg"), &Session::anonymous())
        .await
        .unwrap_err();
    assert_eq!(err, ImageLoaderError::AuthMissing);
    mock.assert_hits_async(0).await;
}
