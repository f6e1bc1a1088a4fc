//! API client for the album service.

use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api2.geliusihe.ru";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MediaFile {
    pub id: i64,
    /// Fully qualified URL of the original asset.
    pub file: String,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by file-extension suffix.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".mp4") || lower.ends_with(".mov") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    /// Value of the `file_type` form field expected by the upload endpoint.
    pub fn upload_type(self) -> &'static str {
        match self {
            MediaKind::Image => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl MediaFile {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_name(&self.file)
    }

    /// Last path segment of the asset URL.
    pub fn file_name(&self) -> &str {
        let path = self.file.split(|c| c == '?' || c == '#').next().unwrap_or(&self.file);
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Name of the extracted metadata document for this asset.
    pub fn metadata_file_name(&self) -> String {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => format!("{}.json", &name[..idx]),
            _ => format!("{}.json", name),
        }
    }
}

/// EXIF-shaped metadata document extracted server-side.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Metadata {
    #[serde(rename = "Make", default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(rename = "Model", default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "DateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(rename = "Software", default, skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    #[serde(rename = "GPSInfo", default, skip_serializing_if = "Option::is_none")]
    pub gps_info: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    /// GPS descriptor as free text, whatever shape the server stored it in.
    pub fn gps_descriptor(&self) -> Option<String> {
        match self.gps_info.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoginResponse {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password1: &'a str,
    pub password2: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MembersResponse {
    List(Vec<String>),
    Wrapped { members: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiClientError {
    #[error("Request Error: {0}")]
    Request(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Decode Error: {0}")]
    Decode(String),
    #[error("IO Error: {0}")]
    Io(String),
}

impl ApiClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiClientError::Unauthorized)
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create a new client with a custom API base URL.
    pub fn with_base_url(base_url: String) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: String, client: reqwest::Client) -> Self {
        ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header(AUTHORIZATION, format!("Bearer {}", token))
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ApiClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiClientError::Request(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiClientError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiClientError::Decode(e.to_string()))
    }

    async fn bytes(response: Response) -> Result<Vec<u8>, ApiClientError> {
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ApiClientError::Request(e.to_string()))
    }

    /// Exchange credentials for a token pair. Non-success statuses are
    /// reported as `Status` so the caller can show the server's detail.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, request)))]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse, ApiClientError> {
        let response = self
            .client
            .post(self.url("/accounts/login/"))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiClientError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Self::json(response).await
    }

    /// Register a new account and return the HTTP status code.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, request)))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<u16, ApiClientError> {
        let response = self
            .client
            .post(self.url("/accounts/register/"))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiClientError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(status.as_u16())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn list_albums(&self, token: &str) -> Result<Vec<Album>, ApiClientError> {
        let builder = self.authorized(self.client.get(self.url("/accounts/user_albums/")), token);
        let response = Self::send(builder).await?;
        Self::json(response).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn create_album(&self, token: &str, name: &str) -> Result<(), ApiClientError> {
        #[derive(Serialize)]
        struct CreateAlbum<'a> {
            name: &'a str,
        }

        let builder = self
            .authorized(self.client.post(self.url("/accounts/albums/create/")), token)
            .json(&CreateAlbum { name });
        Self::send(builder).await?;
        tracing::info!(name, "album created");
        Ok(())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn create_group_album(
        &self,
        token: &str,
        name: &str,
        members: &[String],
    ) -> Result<(), ApiClientError> {
        #[derive(Serialize)]
        struct CreateGroupAlbum<'a> {
            name: &'a str,
            members: &'a [String],
        }

        let builder = self
            .authorized(self.client.post(self.url("/accounts/group-albums/create/")), token)
            .json(&CreateGroupAlbum { name, members });
        Self::send(builder).await?;
        tracing::info!(name, members = members.len(), "group album created");
        Ok(())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn list_album_files(&self, token: &str, album_id: i64) -> Result<Vec<MediaFile>, ApiClientError> {
        let url = self.url(&format!("/accounts/albums/{}/files/", album_id));
        let response = Self::send(self.authorized(self.client.get(url), token)).await?;
        Self::json(response).await
    }

    /// Upload a file from disk into an album.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn upload_to_album(&self, token: &str, album_id: i64, path: &Path) -> Result<(), ApiClientError> {
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| ApiClientError::Io("Invalid file name".into()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiClientError::Io(e.to_string()))?;
        self.upload_bytes(token, album_id, bytes, &file_name).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token, bytes)))]
    pub async fn upload_bytes(
        &self,
        token: &str,
        album_id: i64,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<(), ApiClientError> {
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("file_type", MediaKind::from_name(file_name).upload_type())
            .text("album_id", album_id.to_string());
        let builder = self
            .authorized(self.client.post(self.url("/accounts/upload-to-album/")), token)
            .multipart(form);
        Self::send(builder).await?;
        tracing::info!(album_id, file_name, "uploaded");
        Ok(())
    }

    /// Delete a file from an album and return the HTTP status code.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn delete_file(&self, token: &str, album_id: i64, file_id: i64) -> Result<u16, ApiClientError> {
        let url = self.url(&format!("/accounts/album/{}/delete-file/{}/", album_id, file_id));
        let response = Self::send(self.authorized(self.client.delete(url), token)).await?;
        Ok(response.status().as_u16())
    }

    /// Download a whole album as a binary archive.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn download_album(&self, token: &str, album_id: i64) -> Result<Vec<u8>, ApiClientError> {
        let url = self.url(&format!("/accounts/albums/{}/download/", album_id));
        let response = Self::send(self.authorized(self.client.get(url), token)).await?;
        Self::bytes(response).await
    }

    /// Download a set of files as a binary archive.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn download_selected(&self, token: &str, ids: &[i64]) -> Result<Vec<u8>, ApiClientError> {
        #[derive(Serialize)]
        struct DownloadSelected<'a> {
            photo_ids: &'a [i64],
        }

        let builder = self
            .authorized(self.client.post(self.url("/accounts/download_selected_photos/")), token)
            .json(&DownloadSelected { photo_ids: ids });
        let response = Self::send(builder).await?;
        Self::bytes(response).await
    }

    /// Fetch tags for a file, optionally asking the server to generate them.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn file_tags(&self, token: &str, file_id: i64, generate: bool) -> Result<Vec<String>, ApiClientError> {
        let mut builder = self.client.get(self.url(&format!("/accounts/file/tags/{}/", file_id)));
        if generate {
            builder = builder.query(&[("generate", "true")]);
        }
        let response = Self::send(self.authorized(builder, token)).await?;
        let tags: TagsResponse = Self::json(response).await?;
        Ok(tags.tags.unwrap_or_default())
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn media_by_tag(&self, token: &str, tag: &str) -> Result<Vec<MediaFile>, ApiClientError> {
        let builder = self
            .client
            .get(self.url("/accounts/images-by-tag/"))
            .query(&[("tag", tag)]);
        let response = Self::send(self.authorized(builder, token)).await?;
        Self::json(response).await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn album_members(&self, token: &str, album_id: i64) -> Result<Vec<String>, ApiClientError> {
        let url = self.url(&format!("/accounts/albums/{}/members/", album_id));
        let response = Self::send(self.authorized(self.client.get(url), token)).await?;
        let members: MembersResponse = Self::json(response).await?;
        Ok(match members {
            MembersResponse::List(list) => list,
            MembersResponse::Wrapped { members } => members,
        })
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token)))]
    pub async fn update_members(
        &self,
        token: &str,
        album_id: i64,
        action: MemberAction,
        members: &[String],
    ) -> Result<(), ApiClientError> {
        #[derive(Serialize)]
        struct UpdateMembers<'a> {
            action: MemberAction,
            members: &'a [String],
        }

        let url = self.url(&format!("/accounts/group-albums/{}/members/", album_id));
        let builder = self
            .authorized(self.client.post(url), token)
            .json(&UpdateMembers { action, members });
        Self::send(builder).await?;
        Ok(())
    }

    /// Fetch the metadata document extracted for `file`.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, token, file)))]
    pub async fn metadata(&self, token: &str, user: &str, file: &MediaFile) -> Result<Metadata, ApiClientError> {
        let url = self.url(&format!("/metadata/{}/metadata/{}", user, file.metadata_file_name()));
        let response = Self::send(self.authorized(self.client.get(url), token)).await?;
        Self::json(response).await
    }
}
