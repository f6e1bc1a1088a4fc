//! The user's albums, album creation and group membership.

use crate::download::{album_archive_name, save_archive, DownloadError};
use crate::runtime::{Command, View};
use crate::{Notice, ViewContext};
use api_client::{Album, ApiClientError, MemberAction};
use auth::Route;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
pub enum Message {
    AlbumsLoaded {
        generation: u64,
        result: Result<Vec<Album>, ApiClientError>,
    },
    Created {
        name: String,
        result: Result<(), ApiClientError>,
    },
    GroupCreated {
        name: String,
        result: Result<(), ApiClientError>,
    },
    ArchiveSaved(Result<PathBuf, DownloadError>),
    MembersLoaded {
        album_id: i64,
        result: Result<Vec<String>, ApiClientError>,
    },
    MembersUpdated {
        album_id: i64,
        result: Result<(), ApiClientError>,
    },
}

pub struct AlbumListView {
    ctx: ViewContext,
    albums: Vec<Album>,
    state: ListState,
    generation: u64,
    member_draft: Vec<String>,
    members: BTreeMap<i64, Vec<String>>,
    notices: Vec<Notice>,
    route: Option<Route>,
}

impl AlbumListView {
    pub fn new(ctx: ViewContext) -> Self {
        AlbumListView {
            ctx,
            albums: Vec::new(),
            state: ListState::Idle,
            generation: 0,
            member_draft: Vec::new(),
            members: BTreeMap::new(),
            notices: Vec::new(),
            route: None,
        }
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn member_draft(&self) -> &[String] {
        &self.member_draft
    }

    pub fn members_of(&self, album_id: i64) -> Option<&[String]> {
        self.members.get(&album_id).map(Vec::as_slice)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn route(&self) -> Option<Route> {
        self.route
    }

    fn fail(&mut self, e: &ApiClientError) {
        if let Some(route) = self.ctx.route_for(e.is_unauthorized()) {
            self.route = Some(route);
        }
    }

    pub fn load(&mut self) -> Command<Message> {
        self.generation += 1;
        let Some(token) = self.ctx.token("Album list") else {
            return Command::none();
        };
        let generation = self.generation;
        let client = self.ctx.client.clone();
        self.state = ListState::Loading;
        Command::perform(
            async move { client.list_albums(&token).await },
            move |result| Message::AlbumsLoaded { generation, result },
        )
    }

    pub fn create_private(&mut self, name: &str) -> Command<Message> {
        let name = name.trim().to_string();
        if name.is_empty() {
            self.notices.push(Notice::AlbumNameEmpty);
            return Command::none();
        }
        let Some(token) = self.ctx.token("Album creation") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        Command::perform(
            {
                let name = name.clone();
                async move { client.create_album(&token, &name).await }
            },
            move |result| Message::Created { name, result },
        )
    }

    /// Queue a member for the next group album. Blank and repeated names
    /// are ignored.
    pub fn add_member(&mut self, username: &str) -> bool {
        let username = username.trim();
        if username.is_empty() || self.member_draft.iter().any(|m| m == username) {
            return false;
        }
        self.member_draft.push(username.to_string());
        true
    }

    pub fn create_group(&mut self, name: &str) -> Command<Message> {
        let name = name.trim().to_string();
        if name.is_empty() {
            self.notices.push(Notice::AlbumNameEmpty);
            return Command::none();
        }
        if self.member_draft.is_empty() {
            self.notices.push(Notice::GroupMembersEmpty);
            return Command::none();
        }
        let Some(token) = self.ctx.token("Group album creation") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        let members = self.member_draft.clone();
        Command::perform(
            {
                let name = name.clone();
                async move { client.create_group_album(&token, &name, &members).await }
            },
            move |result| Message::GroupCreated { name, result },
        )
    }

    pub fn open(&mut self, album_id: i64) -> Route {
        let route = Route::Album(album_id);
        self.route = Some(route);
        route
    }

    pub fn download_album(&mut self, album_id: i64, dest_dir: PathBuf) -> Command<Message> {
        let Some(token) = self.ctx.token("Album download") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        tracing::info!("Downloading album {}", album_id);
        Command::perform(
            async move {
                let bytes = client.download_album(&token, album_id).await?;
                save_archive(&dest_dir, &album_archive_name(album_id), &bytes).await
            },
            Message::ArchiveSaved,
        )
    }

    pub fn members(&mut self, album_id: i64) -> Command<Message> {
        let Some(token) = self.ctx.token("Member list") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        Command::perform(
            async move { client.album_members(&token, album_id).await },
            move |result| Message::MembersLoaded { album_id, result },
        )
    }

    pub fn add_members(&mut self, album_id: i64, usernames: &[String]) -> Command<Message> {
        self.update_members(album_id, MemberAction::Add, usernames)
    }

    pub fn remove_members(&mut self, album_id: i64, usernames: &[String]) -> Command<Message> {
        self.update_members(album_id, MemberAction::Remove, usernames)
    }

    fn update_members(&mut self, album_id: i64, action: MemberAction, usernames: &[String]) -> Command<Message> {
        let mut members: Vec<String> = Vec::new();
        for name in usernames.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            if !members.iter().any(|m| m == name) {
                members.push(name.to_string());
            }
        }
        if members.is_empty() {
            return Command::none();
        }
        let Some(token) = self.ctx.token("Member update") else {
            return Command::none();
        };
        let client = self.ctx.client.clone();
        tracing::info!("{:?} {} member(s) for album {}", action, members.len(), album_id);
        Command::perform(
            async move { client.update_members(&token, album_id, action, &members).await },
            move |result| Message::MembersUpdated { album_id, result },
        )
    }
}

impl View for AlbumListView {
    type Message = Message;

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::AlbumsLoaded { generation, .. } if generation != self.generation => {}
            Message::AlbumsLoaded { result, .. } => match result {
                Ok(albums) => {
                    tracing::info!("Loaded {} albums", albums.len());
                    self.albums = albums;
                    self.state = ListState::Loaded;
                }
                Err(e) => {
                    tracing::error!("Failed to load albums: {}", e);
                    self.state = ListState::Failed(e.to_string());
                    self.fail(&e);
                }
            },
            Message::Created { name, result } => match result {
                Ok(()) => {
                    self.notices.push(Notice::AlbumCreated(name));
                    return self.load();
                }
                Err(e) => {
                    tracing::error!("Failed to create album {}: {}", name, e);
                    self.notices.push(Notice::AlbumCreateFailed);
                    self.fail(&e);
                }
            },
            Message::GroupCreated { name, result } => match result {
                Ok(()) => {
                    self.member_draft.clear();
                    self.notices.push(Notice::AlbumCreated(name));
                    return self.load();
                }
                Err(e) => {
                    tracing::error!("Failed to create group album {}: {}", name, e);
                    self.notices.push(Notice::AlbumCreateFailed);
                    self.fail(&e);
                }
            },
            Message::ArchiveSaved(result) => match result {
                Ok(path) => self.notices.push(Notice::ArchiveSaved(path)),
                Err(e) => {
                    tracing::error!("Album download failed: {}", e);
                    self.notices.push(Notice::DownloadFailed);
                    if let DownloadError::Api(api) = &e {
                        self.fail(api);
                    }
                }
            },
            Message::MembersLoaded { album_id, result } => match result {
                Ok(members) => {
                    self.members.insert(album_id, members);
                }
                Err(e) => {
                    tracing::error!("Failed to load members of album {}: {}", album_id, e);
                    self.fail(&e);
                }
            },
            Message::MembersUpdated { album_id, result } => match result {
                Ok(()) => {
                    self.notices.push(Notice::MembersUpdated);
                    return self.members(album_id);
                }
                Err(e) => {
                    tracing::error!("Failed to update members of album {}: {}", album_id, e);
                    self.notices.push(Notice::MembersUpdateFailed);
                    self.fail(&e);
                }
            },
        }
        Command::none()
    }
}
