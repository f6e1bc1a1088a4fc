use httpmock::Mock;
use serde_json::{json, Value};

pub use httpmock::Method::{self, DELETE, GET, POST};
pub use httpmock::MockServer;

/// Bearer token every fixture expects.
pub const TOKEN: &str = "test-token";
/// Username used for metadata lookups.
pub const USER: &str = "user_8";

fn bearer() -> String {
    format!("Bearer {}", TOKEN)
}

/// Start a mock album server.
pub async fn album_server() -> MockServer {
    MockServer::start_async().await
}

/// JSON for a media file whose asset lives on `server` under `/media/<name>`.
pub fn media_json(server: &MockServer, id: i64, name: &str) -> Value {
    let lower = name.to_ascii_lowercase();
    let file_type = if lower.ends_with(".mp4") || lower.ends_with(".mov") {
        "video"
    } else {
        "photo"
    };
    json!({
        "id": id,
        "file": server.url(format!("/media/{}", name)),
        "file_type": file_type,
        "uploaded_at": "2024-03-01T10:00:00Z"
    })
}

pub fn album_json(id: i64, name: &str, is_private: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "created_at": "2024-02-01T08:30:00Z",
        "is_private": is_private
    })
}

/// Expect a GET for the file list of `album_id`.
pub async fn expect_album_files<'a>(server: &'a MockServer, album_id: i64, files: &[Value]) -> Mock<'a> {
    let body = Value::Array(files.to_vec());
    let path = format!("/accounts/albums/{}/files/", album_id);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path).header("authorization", bearer());
            then.status(200).json_body(body);
        })
        .await
}

/// Expect a GET for the preview rendition of `/media/<name>`.
pub async fn expect_preview<'a>(server: &'a MockServer, name: &str, status: u16) -> Mock<'a> {
    let path = format!("/media/{}/preview", name);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path).header("authorization", bearer());
            then.status(status)
                .header("content-type", "image/jpeg")
                .body(format!("preview:{}", name));
        })
        .await
}

/// Expect a GET for the original asset `/media/<name>`.
pub async fn expect_asset<'a>(server: &'a MockServer, name: &str, status: u16) -> Mock<'a> {
    let path = format!("/media/{}", name);
    let content_type = if name.ends_with(".mp4") { "video/mp4" } else { "image/jpeg" };
    server
        .mock_async(|when, then| {
            when.method(GET).path(path).header("authorization", bearer());
            then.status(status)
                .header("content-type", content_type)
                .body(format!("full:{}", name));
        })
        .await
}

/// Expect a GET for the metadata document of `/media/<name>`.
pub async fn expect_metadata<'a>(server: &'a MockServer, name: &str, body: Value) -> Mock<'a> {
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    let path = format!("/metadata/{}/metadata/{}.json", USER, stem);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path).header("authorization", bearer());
            then.status(200).json_body(body);
        })
        .await
}

/// Expect a tag lookup for `file_id`. With `generate` the request must
/// carry `generate=true`.
pub async fn expect_tags<'a>(server: &'a MockServer, file_id: i64, generate: bool, tags: &[&str]) -> Mock<'a> {
    let path = format!("/accounts/file/tags/{}/", file_id);
    let body = json!({ "tags": tags });
    server
        .mock_async(|when, then| {
            let when = when.method(GET).path(path).header("authorization", bearer());
            if generate {
                when.query_param("generate", "true");
            }
            then.status(200).json_body(body);
        })
        .await
}

/// Expect a tag search returning `files`.
pub async fn expect_tag_search<'a>(server: &'a MockServer, tag: &str, files: &[Value]) -> Mock<'a> {
    let tag = tag.to_string();
    let body = Value::Array(files.to_vec());
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/accounts/images-by-tag/")
                .query_param("tag", tag)
                .header("authorization", bearer());
            then.status(200).json_body(body);
        })
        .await
}

pub async fn expect_delete<'a>(server: &'a MockServer, album_id: i64, file_id: i64, status: u16) -> Mock<'a> {
    let path = format!("/accounts/album/{}/delete-file/{}/", album_id, file_id);
    server
        .mock_async(|when, then| {
            when.method(DELETE).path(path).header("authorization", bearer());
            then.status(status);
        })
        .await
}

pub async fn expect_user_albums<'a>(server: &'a MockServer, albums: &[Value]) -> Mock<'a> {
    let body = Value::Array(albums.to_vec());
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/accounts/user_albums/")
                .header("authorization", bearer());
            then.status(200).json_body(body);
        })
        .await
}

/// Expect a successful login returning the given token pair.
pub async fn expect_login<'a>(server: &'a MockServer, access: &str, refresh: &str) -> Mock<'a> {
    let body = json!({ "access": access, "refresh": refresh });
    server
        .mock_async(|when, then| {
            when.method(POST).path("/accounts/login/");
            then.status(200).json_body(body);
        })
        .await
}

/// Expect a POST to `path` answering with a binary archive.
pub async fn expect_archive<'a>(server: &'a MockServer, method: Method, path: &str, bytes: &'static [u8]) -> Mock<'a> {
    let path = path.to_string();
    server
        .mock_async(|when, then| {
            when.method(method).path(path).header("authorization", bearer());
            then.status(200)
                .header("content-type", "application/zip")
                .body(bytes);
        })
        .await
}
