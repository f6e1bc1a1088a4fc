//! The contents of one album: previews, the viewer, selection and filters.

use crate::blob::{BlobHandle, HandleKind, HandleRegistry};
use crate::download::{save_archive, DownloadError, SELECTED_ARCHIVE_NAME};
use crate::geolocation::{extract_geolocation, Coordinates};
use crate::image_loader::{ImageLoader, ImageLoaderError};
use crate::runtime::{Command, View};
use crate::search::{matches_camera, FilterCriterion, FilterState};
use crate::tag_panel::{TagMessage, TagPanel};
use crate::{Notice, ViewContext};
use api_client::{ApiClientError, MediaFile, MediaKind, Metadata};
use auth::{Route, Session};
use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    Ready(BlobHandle),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentItem {
    pub media: MediaFile,
    pub preview: PreviewState,
}

impl ContentItem {
    pub fn id(&self) -> i64 {
        self.media.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerContent {
    Loading,
    Image(BlobHandle),
    Video(BlobHandle),
}

/// The item currently open in the modal.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub media: MediaFile,
    pub content: ViewerContent,
    pub metadata: Option<Metadata>,
    pub coordinates: Option<Coordinates>,
}

impl Viewer {
    pub fn handle(&self) -> Option<&BlobHandle> {
        match &self.content {
            ViewerContent::Image(h) | ViewerContent::Video(h) => Some(h),
            ViewerContent::Loading => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Listing,
    Previewing,
    Loaded,
    Failed(String),
}

type PreviewResults = Vec<(MediaFile, Result<BlobHandle, ImageLoaderError>)>;

#[derive(Debug)]
pub enum Message {
    FilesLoaded {
        generation: u64,
        result: Result<Vec<MediaFile>, ApiClientError>,
    },
    PreviewsSettled {
        generation: u64,
        results: PreviewResults,
    },
    FullLoaded {
        generation: u64,
        result: Result<BlobHandle, ImageLoaderError>,
    },
    VideoLoaded {
        generation: u64,
        handle: Option<BlobHandle>,
    },
    MetadataLoaded {
        generation: u64,
        result: Result<Metadata, ApiClientError>,
    },
    Tags(TagMessage),
    Deleted {
        id: i64,
        result: Result<u16, ApiClientError>,
    },
    Uploaded(Result<(), ApiClientError>),
    SelectedDownloaded(Result<PathBuf, DownloadError>),
    TagHits {
        generation: u64,
        criterion: FilterCriterion,
        result: Result<Vec<MediaFile>, ApiClientError>,
    },
    FilterPreviewsSettled {
        generation: u64,
        criterion: FilterCriterion,
        hits: HashSet<i64>,
        results: PreviewResults,
    },
    CameraMatched {
        generation: u64,
        criterion: FilterCriterion,
        ids: HashSet<i64>,
    },
}

fn load_previews(loader: ImageLoader, session: Session, files: Vec<MediaFile>) -> impl std::future::Future<Output = PreviewResults> {
    join_all(files.into_iter().map(move |media| {
        let loader = loader.clone();
        let session = session.clone();
        async move {
            let result = loader.load_preview(&media, &session).await;
            if let Err(e) = &result {
                tracing::warn!("Preview for {} failed: {}", media.id, e);
            }
            (media, result)
        }
    }))
}

pub struct AlbumContentView {
    ctx: ViewContext,
    album_id: i64,
    items: Vec<ContentItem>,
    load_state: LoadState,
    album_generation: u64,
    open_generation: u64,
    filter_generation: u64,
    viewer: Option<Viewer>,
    selection: BTreeSet<i64>,
    filter: FilterState,
    handles: HandleRegistry,
    tags: TagPanel,
    notices: Vec<Notice>,
    route: Option<Route>,
}

impl AlbumContentView {
    pub fn new(ctx: ViewContext, album_id: i64) -> Self {
        let handles = HandleRegistry::new(ctx.blobs().clone());
        let tags = TagPanel::new(ctx.clone());
        AlbumContentView {
            ctx,
            album_id,
            items: Vec::new(),
            load_state: LoadState::Idle,
            album_generation: 0,
            open_generation: 0,
            filter_generation: 0,
            viewer: None,
            selection: BTreeSet::new(),
            filter: FilterState::None,
            handles,
            tags,
            notices: Vec::new(),
            route: None,
        }
    }

    pub fn album_id(&self) -> i64 {
        self.album_id
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// What the grid shows: the filtered list when a filter is settled,
    /// the whole album otherwise.
    pub fn visible_items(&self) -> &[ContentItem] {
        match &self.filter {
            FilterState::None | FilterState::Filtering { .. } => self.items.as_slice(),
            FilterState::Active { items, .. } => items.as_slice(),
            FilterState::Empty { .. } => &[],
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn viewer(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<i64> {
        &self.selection
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn tag_panel(&self) -> &TagPanel {
        &self.tags
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn route(&self) -> Option<Route> {
        self.route.or_else(|| self.tags.route())
    }

    fn fail(&mut self, unauthorized: bool) {
        if let Some(route) = self.ctx.route_for(unauthorized) {
            self.route = Some(route);
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn load_album(&mut self) -> Command<Message> {
        self.album_generation += 1;
        let Some(token) = self.ctx.token("Album load") else {
            return Command::none();
        };
        let generation = self.album_generation;
        let album_id = self.album_id;
        let client = self.ctx.client.clone();
        self.load_state = LoadState::Listing;
        tracing::info!("Loading album {}", album_id);
        Command::perform(
            async move { client.list_album_files(&token, album_id).await },
            move |result| Message::FilesLoaded { generation, result },
        )
    }

    fn files_loaded(&mut self, generation: u64, result: Result<Vec<MediaFile>, ApiClientError>) -> Command<Message> {
        if generation != self.album_generation {
            tracing::debug!("Dropping stale file list for album {}", self.album_id);
            return Command::none();
        }
        match result {
            Ok(files) => {
                self.load_state = LoadState::Previewing;
                let previews = load_previews(self.ctx.loader.clone(), self.ctx.session.clone(), files);
                Command::perform(previews, move |results| Message::PreviewsSettled { generation, results })
            }
            Err(e) => {
                tracing::error!("Failed to fetch files for album {}: {}", self.album_id, e);
                self.load_state = LoadState::Failed(e.to_string());
                self.fail(e.is_unauthorized());
                Command::none()
            }
        }
    }

    fn previews_settled(&mut self, generation: u64, results: PreviewResults) {
        if generation != self.album_generation {
            tracing::debug!("Dropping {} stale previews for album {}", results.len(), self.album_id);
            for (_, result) in results {
                if let Ok(handle) = result {
                    self.handles.discard(&handle);
                }
            }
            return;
        }

        let ids: HashSet<i64> = results.iter().map(|(media, _)| media.id).collect();
        self.handles.retain(HandleKind::Preview, |id| ids.contains(&id));
        let mut unauthorized = false;
        self.items = results
            .into_iter()
            .map(|(media, result)| {
                let preview = match result {
                    Ok(handle) => {
                        self.handles.supersede(media.id, HandleKind::Preview, handle.clone());
                        PreviewState::Ready(handle)
                    }
                    Err(e) => {
                        unauthorized |= e.is_unauthorized();
                        self.handles.release(media.id, HandleKind::Preview);
                        PreviewState::Failed(e.to_string())
                    }
                };
                ContentItem { media, preview }
            })
            .collect();

        self.selection.retain(|id| ids.contains(id));
        if let Some(open) = self.viewer.as_ref().map(|v| v.media.id) {
            if !ids.contains(&open) {
                self.close_modal();
            }
        }
        self.reset_filter();
        self.load_state = LoadState::Loaded;
        self.fail(unauthorized);
        tracing::info!("Album {} loaded with {} items", self.album_id, self.items.len());
    }

    /// Open `id` in the viewer, replacing whatever was open.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn open_item(&mut self, id: i64) -> Command<Message> {
        let Some(media) = self.items.iter().find(|item| item.id() == id).map(|item| item.media.clone()) else {
            tracing::warn!("Item {} is not in album {}", id, self.album_id);
            return Command::none();
        };
        self.close_modal();
        self.open_generation += 1;
        let generation = self.open_generation;
        self.viewer = Some(Viewer {
            media: media.clone(),
            content: ViewerContent::Loading,
            metadata: None,
            coordinates: None,
        });

        let loader = self.ctx.loader.clone();
        let session = self.ctx.session.clone();
        let asset = match media.kind() {
            MediaKind::Video => {
                let media = media.clone();
                Command::perform(
                    async move { loader.load_video(&media, &session).await },
                    move |handle| Message::VideoLoaded { generation, handle },
                )
            }
            MediaKind::Image => {
                let media = media.clone();
                Command::perform(
                    async move { loader.load_full(&media, &session).await },
                    move |result| Message::FullLoaded { generation, result },
                )
            }
        };

        let metadata = match (self.ctx.token("Metadata fetch"), self.ctx.session.username()) {
            (Some(token), Some(user)) => {
                let client = self.ctx.client.clone();
                let user = user.to_string();
                Command::perform(
                    async move { client.metadata(&token, &user, &media).await },
                    move |result| Message::MetadataLoaded { generation, result },
                )
            }
            _ => {
                tracing::warn!("Skipping metadata for {}: no user in session", id);
                Command::none()
            }
        };

        let tags = self.tags.select(id).map(Message::Tags);
        Command::batch([asset, metadata, tags])
    }

    /// Release the full-view handle and close the viewer. Does nothing when
    /// no item is open.
    pub fn close_modal(&mut self) {
        let Some(viewer) = self.viewer.take() else {
            return;
        };
        self.open_generation += 1;
        self.handles.release(viewer.media.id, HandleKind::Full);
        self.tags.clear();
    }

    fn asset_loaded(&mut self, generation: u64, handle: Option<BlobHandle>, video: bool) {
        if generation != self.open_generation {
            if let Some(handle) = handle {
                self.handles.discard(&handle);
            }
            return;
        }
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        match handle {
            Some(handle) => {
                self.handles.supersede(viewer.media.id, HandleKind::Full, handle.clone());
                viewer.content = if video {
                    ViewerContent::Video(handle)
                } else {
                    ViewerContent::Image(handle)
                };
            }
            None => {
                self.close_modal();
            }
        }
    }

    fn metadata_loaded(&mut self, generation: u64, result: Result<Metadata, ApiClientError>) {
        if generation != self.open_generation {
            return;
        }
        match result {
            Ok(metadata) => {
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.coordinates = extract_geolocation(&metadata);
                    viewer.metadata = Some(metadata);
                }
            }
            Err(e) => {
                tracing::warn!("Metadata fetch failed: {}", e);
                self.fail(e.is_unauthorized());
            }
        }
    }

    pub fn generate_tags(&mut self) -> Command<Message> {
        self.tags.generate().map(Message::Tags)
    }

    pub fn toggle_select(&mut self, id: i64) {
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn download_selected(&mut self, dest_dir: PathBuf) -> Command<Message> {
        if self.selection.is_empty() {
            return Command::none();
        }
        let Some(token) = self.ctx.token("Download") else {
            return Command::none();
        };
        let ids: Vec<i64> = self.selection.iter().copied().collect();
        let client = self.ctx.client.clone();
        tracing::info!("Downloading {} selected items", ids.len());
        Command::perform(
            async move {
                let bytes = client.download_selected(&token, &ids).await?;
                save_archive(&dest_dir, SELECTED_ARCHIVE_NAME, &bytes).await
            },
            Message::SelectedDownloaded,
        )
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn delete_photo(&mut self, id: i64) -> Command<Message> {
        let Some(token) = self.ctx.token("Delete") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        let album_id = self.album_id;
        tracing::info!("Deleting file {} from album {}", id, album_id);
        Command::perform(
            async move { client.delete_file(&token, album_id, id).await },
            move |result| Message::Deleted { id, result },
        )
    }

    fn deleted(&mut self, id: i64, result: Result<u16, ApiClientError>) -> Command<Message> {
        match result {
            Ok(200) => {
                self.notices.push(Notice::PhotoDeleted);
                if self.viewer.as_ref().map(|v| v.media.id) == Some(id) {
                    self.close_modal();
                }
                self.selection.remove(&id);
                self.load_album()
            }
            Ok(status) => {
                tracing::error!("Delete of {} answered HTTP {}", id, status);
                self.notices.push(Notice::DeleteFailed);
                Command::none()
            }
            Err(e) => {
                tracing::error!("Delete of {} failed: {}", id, e);
                self.notices.push(Notice::DeleteFailed);
                self.fail(e.is_unauthorized());
                Command::none()
            }
        }
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn upload(&mut self, path: PathBuf) -> Command<Message> {
        let Some(token) = self.ctx.token("Upload") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        let album_id = self.album_id;
        tracing::info!("Uploading {} to album {}", path.display(), album_id);
        Command::perform(
            async move { client.upload_to_album(&token, album_id, &path).await },
            Message::Uploaded,
        )
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn apply_tag_filter(&mut self, tag: &str) -> Command<Message> {
        let tag = tag.trim();
        if tag.is_empty() {
            self.clear_filter();
            return Command::none();
        }
        let criterion = FilterCriterion::Tag(tag.to_string());
        let Some(generation) = self.start_filter(criterion.clone()) else {
            return Command::none();
        };
        let Some(token) = self.ctx.token("Tag search") else {
            self.reset_filter();
            return Command::none();
        };
        let client = self.ctx.client.clone();
        let tag = tag.to_string();
        Command::perform(
            async move { client.media_by_tag(&token, &tag).await },
            move |result| Message::TagHits { generation, criterion, result },
        )
    }

    fn tag_hits(
        &mut self,
        generation: u64,
        criterion: FilterCriterion,
        result: Result<Vec<MediaFile>, ApiClientError>,
    ) -> Command<Message> {
        if generation != self.filter_generation {
            return Command::none();
        }
        match result {
            Ok(hits) => {
                let hits: HashSet<i64> = hits.into_iter().map(|m| m.id).collect();
                // Hits reuse the grid previews; only failed ones are fetched again.
                let retry: Vec<MediaFile> = self
                    .items
                    .iter()
                    .filter(|item| hits.contains(&item.id()) && matches!(item.preview, PreviewState::Failed(_)))
                    .map(|item| item.media.clone())
                    .collect();
                if retry.is_empty() {
                    self.settle_tag_filter(criterion, &hits);
                    return Command::none();
                }
                let previews = load_previews(self.ctx.loader.clone(), self.ctx.session.clone(), retry);
                Command::perform(previews, move |results| Message::FilterPreviewsSettled {
                    generation,
                    criterion,
                    hits,
                    results,
                })
            }
            Err(e) => {
                tracing::error!("Tag search for {} failed: {}", criterion, e);
                self.reset_filter();
                self.fail(e.is_unauthorized());
                Command::none()
            }
        }
    }

    fn filter_previews_settled(
        &mut self,
        generation: u64,
        criterion: FilterCriterion,
        hits: HashSet<i64>,
        results: PreviewResults,
    ) {
        if generation != self.filter_generation {
            for (_, result) in results {
                if let Ok(handle) = result {
                    self.handles.discard(&handle);
                }
            }
            return;
        }
        for (media, result) in results {
            let Ok(handle) = result else {
                continue;
            };
            match self.items.iter_mut().find(|item| item.id() == media.id) {
                Some(item) => {
                    self.handles.supersede(media.id, HandleKind::Preview, handle.clone());
                    item.preview = PreviewState::Ready(handle);
                }
                None => self.handles.discard(&handle),
            }
        }
        self.settle_tag_filter(criterion, &hits);
    }

    fn settle_tag_filter(&mut self, criterion: FilterCriterion, hits: &HashSet<i64>) {
        let items = self.items.iter().filter(|item| hits.contains(&item.id())).cloned().collect();
        self.filter = FilterState::settle(criterion, items);
    }

    /// Keep items whose camera make and model match the non-empty inputs.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub fn apply_camera_filter(&mut self, make: &str, model: &str) -> Command<Message> {
        let Some(criterion) = FilterCriterion::camera(make, model) else {
            self.clear_filter();
            return Command::none();
        };
        let Some(generation) = self.start_filter(criterion.clone()) else {
            return Command::none();
        };
        let user = self.ctx.session.username().map(str::to_string);
        let (Some(token), Some(user)) = (self.ctx.token("Camera filter"), user) else {
            self.reset_filter();
            return Command::none();
        };
        let (make, model) = match &criterion {
            FilterCriterion::Camera { make, model } => (make.clone(), model.clone()),
            FilterCriterion::Tag(_) => (None, None),
        };
        let client = self.ctx.client.clone();
        let files: Vec<MediaFile> = self.items.iter().map(|item| item.media.clone()).collect();
        let lookups = join_all(files.into_iter().map(move |media| {
            let client = client.clone();
            let token = token.clone();
            let user = user.clone();
            let make = make.clone();
            let model = model.clone();
            async move {
                match client.metadata(&token, &user, &media).await {
                    Ok(metadata) if matches_camera(&metadata, make.as_deref(), model.as_deref()) => Some(media.id),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::warn!("Metadata for {} unavailable: {}", media.id, e);
                        None
                    }
                }
            }
        }));
        Command::perform(lookups, move |matched| Message::CameraMatched {
            generation,
            criterion,
            ids: matched.into_iter().flatten().collect(),
        })
    }

    fn camera_matched(&mut self, generation: u64, criterion: FilterCriterion, ids: HashSet<i64>) {
        if generation != self.filter_generation {
            return;
        }
        let items = self.items.iter().filter(|item| ids.contains(&item.id())).cloned().collect();
        self.filter = FilterState::settle(criterion, items);
    }

    fn start_filter(&mut self, criterion: FilterCriterion) -> Option<u64> {
        self.reset_filter();
        if self.items.is_empty() {
            self.filter = FilterState::settle(criterion, Vec::new());
            return None;
        }
        tracing::info!("Filtering album {} by {}", self.album_id, criterion);
        let generation = self.filter_generation;
        self.filter = FilterState::Filtering { criterion, generation };
        Some(generation)
    }

    fn reset_filter(&mut self) {
        self.filter_generation += 1;
        self.filter = FilterState::None;
    }

    pub fn clear_filter(&mut self) {
        self.reset_filter();
    }
}

impl View for AlbumContentView {
    type Message = Message;

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::FilesLoaded { generation, result } => return self.files_loaded(generation, result),
            Message::PreviewsSettled { generation, results } => self.previews_settled(generation, results),
            Message::FullLoaded { generation, result } => match result {
                Ok(handle) => self.asset_loaded(generation, Some(handle), false),
                Err(e) if generation == self.open_generation => {
                    tracing::error!("Error fetching image: {}", e);
                    self.notices.push(Notice::ImageLoadFailed);
                    self.fail(e.is_unauthorized());
                    self.close_modal();
                }
                Err(_) => {}
            },
            Message::VideoLoaded { generation, handle } => {
                if handle.is_none() && generation == self.open_generation {
                    tracing::error!("Failed to load video");
                }
                self.asset_loaded(generation, handle, true);
            }
            Message::MetadataLoaded { generation, result } => self.metadata_loaded(generation, result),
            Message::Tags(message) => return self.tags.update(message).map(Message::Tags),
            Message::Deleted { id, result } => return self.deleted(id, result),
            Message::Uploaded(result) => match result {
                Ok(()) => {
                    self.notices.push(Notice::UploadSucceeded);
                    return self.load_album();
                }
                Err(e) => {
                    tracing::error!("Error uploading the file: {}", e);
                    self.notices.push(Notice::UploadFailed);
                    self.fail(e.is_unauthorized());
                }
            },
            Message::SelectedDownloaded(result) => match result {
                Ok(path) => self.notices.push(Notice::ArchiveSaved(path)),
                Err(e) => {
                    tracing::error!("Download of selected items failed: {}", e);
                    self.notices.push(Notice::DownloadFailed);
                    self.fail(e.is_unauthorized());
                }
            },
            Message::TagHits {
                generation,
                criterion,
                result,
            } => return self.tag_hits(generation, criterion, result),
            Message::FilterPreviewsSettled {
                generation,
                criterion,
                hits,
                results,
            } => self.filter_previews_settled(generation, criterion, hits, results),
            Message::CameraMatched {
                generation,
                criterion,
                ids,
            } => self.camera_matched(generation, criterion, ids),
        }
        Command::none()
    }
}
