//! Authenticated asset loading for album views.

use crate::blob::{BlobHandle, BlobStore};
use api_client::MediaFile;
use auth::Session;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Instant;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageLoaderError {
    #[error("no access token available")]
    AuthMissing,
    #[error("asset not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
}

impl ImageLoaderError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ImageLoaderError::Unauthorized)
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ImageLoaderError::Timeout
        } else {
            ImageLoaderError::Network(e.to_string())
        }
    }
}

/// Fetches asset bytes with the session's bearer token and stores them as
/// local blobs. Nothing is cached; every call goes to the network.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    client: reqwest::Client,
    blobs: BlobStore,
    upgrade_insecure: bool,
}

impl ImageLoader {
    pub fn new(blobs: BlobStore) -> Self {
        Self::with_client(reqwest::Client::new(), blobs)
    }

    pub fn with_client(client: reqwest::Client, blobs: BlobStore) -> Self {
        Self {
            client,
            blobs,
            upgrade_insecure: true,
        }
    }

    /// Toggle the `http` to `https` upgrade applied before every fetch.
    pub fn upgrade_insecure(mut self, enabled: bool) -> Self {
        self.upgrade_insecure = enabled;
        self
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn normalize_url(&self, raw: &str) -> String {
        if !self.upgrade_insecure {
            return raw.to_string();
        }
        match Url::parse(raw) {
            Ok(mut url) if url.scheme() == "http" => match url.set_scheme("https") {
                Ok(()) => url.to_string(),
                Err(()) => raw.to_string(),
            },
            _ => raw.to_string(),
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, media, session)))]
    pub async fn load_preview(&self, media: &MediaFile, session: &Session) -> Result<BlobHandle, ImageLoaderError> {
        let url = format!("{}/preview", media.file.trim_end_matches('/'));
        self.fetch(media.id, &url, session, "preview").await
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, media, session)))]
    pub async fn load_full(&self, media: &MediaFile, session: &Session) -> Result<BlobHandle, ImageLoaderError> {
        self.fetch(media.id, &media.file, session, "full").await
    }

    /// Video failures are not surfaced to the user; the caller only learns
    /// that nothing could be loaded.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, media, session)))]
    pub async fn load_video(&self, media: &MediaFile, session: &Session) -> Option<BlobHandle> {
        match self.fetch(media.id, &media.file, session, "video").await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Failed to load video {}: {}", media.id, e);
                None
            }
        }
    }

    async fn fetch(&self, id: i64, raw_url: &str, session: &Session, rendition: &str) -> Result<BlobHandle, ImageLoaderError> {
        let token = session.bearer().map_err(|_| ImageLoaderError::AuthMissing)?;
        let start = Instant::now();
        let url = self.normalize_url(raw_url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(ImageLoaderError::from_reqwest)?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ImageLoaderError::NotFound),
            StatusCode::UNAUTHORIZED => return Err(ImageLoaderError::Unauthorized),
            s => return Err(ImageLoaderError::Fetch(format!("HTTP {} for {}", s.as_u16(), url))),
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(ImageLoaderError::from_reqwest)?;
        let handle = self.blobs.create(bytes.to_vec(), content_type);

        tracing::debug!("load_time_ms" = %start.elapsed().as_millis(), "id" = id, "rendition" = rendition);
        Ok(handle)
    }
}
