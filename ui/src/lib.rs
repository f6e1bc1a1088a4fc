//! Headless album views for the Albumz client.
//!
//! Each view owns its state and reacts to messages through
//! [`runtime::View::update`]; network work is returned as a
//! [`runtime::Command`] and driven by [`runtime::run_until_idle`].

pub mod album_content;
pub mod album_list;
pub mod blob;
pub mod download;
pub mod geolocation;
pub mod image_loader;
pub mod runtime;
pub mod search;
pub mod tag_panel;

pub use album_content::{AlbumContentView, ContentItem, PreviewState, Viewer, ViewerContent};
pub use album_list::AlbumListView;
pub use blob::{BlobHandle, BlobStore, HandleKind, HandleRegistry};
pub use geolocation::{extract_geolocation, Coordinates};
pub use image_loader::{ImageLoader, ImageLoaderError};
pub use runtime::{run_until_idle, Command, View};
pub use search::{FilterCriterion, FilterState};
pub use tag_panel::TagPanel;

use api_client::ApiClient;
use auth::{Route, Session};
use std::fmt;
use std::path::PathBuf;

/// A user-facing message, shown where a browser front-end would raise an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    UploadSucceeded,
    UploadFailed,
    PhotoDeleted,
    DeleteFailed,
    ArchiveSaved(PathBuf),
    DownloadFailed,
    ImageLoadFailed,
    AlbumNameEmpty,
    GroupMembersEmpty,
    AlbumCreated(String),
    AlbumCreateFailed,
    MembersUpdated,
    MembersUpdateFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::UploadSucceeded => write!(f, "Upload successful"),
            Notice::UploadFailed => write!(f, "Upload failed"),
            Notice::PhotoDeleted => write!(f, "Photo deleted"),
            Notice::DeleteFailed => write!(f, "Failed to delete photo"),
            Notice::ArchiveSaved(path) => write!(f, "Saved {}", path.display()),
            Notice::DownloadFailed => write!(f, "Download failed"),
            Notice::ImageLoadFailed => write!(f, "Failed to load image"),
            Notice::AlbumNameEmpty => write!(f, "Album name cannot be empty"),
            Notice::GroupMembersEmpty => write!(f, "Add at least one member to a group album"),
            Notice::AlbumCreated(name) => write!(f, "Album '{}' created", name),
            Notice::AlbumCreateFailed => write!(f, "Failed to create album"),
            Notice::MembersUpdated => write!(f, "Members updated"),
            Notice::MembersUpdateFailed => write!(f, "Failed to update members"),
        }
    }
}

/// Everything a view needs to talk to the service.
#[derive(Debug, Clone)]
pub struct ViewContext {
    pub client: ApiClient,
    pub loader: ImageLoader,
    pub session: Session,
    pub redirect_on_unauthorized: bool,
}

impl ViewContext {
    pub fn new(client: ApiClient, loader: ImageLoader, session: Session) -> Self {
        ViewContext {
            client,
            loader,
            session,
            redirect_on_unauthorized: false,
        }
    }

    pub fn redirect_on_unauthorized(mut self, enabled: bool) -> Self {
        self.redirect_on_unauthorized = enabled;
        self
    }

    pub fn blobs(&self) -> &BlobStore {
        self.loader.blobs()
    }

    /// Owned bearer token for a command, or `None` after logging why not.
    pub(crate) fn token(&self, action: &str) -> Option<String> {
        match self.session.bearer() {
            Ok(token) => Some(token.to_string()),
            Err(e) => {
                tracing::error!("{} aborted: {}", action, e);
                None
            }
        }
    }

    /// Route to follow after a failure, per the 401 policy.
    pub(crate) fn route_for(&self, unauthorized: bool) -> Option<Route> {
        if unauthorized && self.redirect_on_unauthorized {
            tracing::warn!("Session expired, redirecting to {}", Route::Login);
            Some(Route::Login)
        } else {
            None
        }
    }
}
