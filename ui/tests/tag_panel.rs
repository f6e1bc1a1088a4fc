use auth::Session;
use mocks::{album_server, MockServer, TOKEN, USER};
use ui::tag_panel::{TagMessage, TagState};
use ui::{run_until_idle, BlobStore, ImageLoader, TagPanel, View, ViewContext};

fn context(server: &MockServer) -> ViewContext {
    ViewContext::new(
        api_client::ApiClient::with_base_url(server.base_url()),
        ImageLoader::new(BlobStore::new()).upgrade_insecure(false),
        Session::new(TOKEN, "refresh", USER),
    )
}

#[tokio::test]
async fn test_answer_for_previous_file_is_dropped() {
    let server = album_server().await;
    mocks::expect_tags(&server, 1, false, &["old"]).await;
    mocks::expect_tags(&server, 2, false, &["new"]).await;

    let mut panel = TagPanel::new(context(&server));
    let first = panel.select(1);
    let second = panel.select(2);
    run_until_idle(&mut panel, ui::Command::batch([first, second])).await;
    assert_eq!(panel.file_id(), Some(2));
    assert_eq!(panel.tags(), ["new"]);

    let _ = panel.update(TagMessage::Fetched {
        generation: 1,
        result: Ok(vec!["old".to_string()]),
    });
    assert_eq!(panel.tags(), ["new"]);
}

#[tokio::test]
async fn test_cleared_panel_ignores_late_fetch() {
    let server = album_server().await;
    mocks::expect_tags(&server, 3, false, &["sea"]).await;

    let mut panel = TagPanel::new(context(&server));
    let cmd = panel.select(3);
    panel.clear();
    run_until_idle(&mut panel, cmd).await;
    assert_eq!(panel.file_id(), None);
    assert_eq!(panel.state(), &TagState::Idle);
}
