//! Tags for the item open in the viewer.

use crate::runtime::{Command, View};
use crate::ViewContext;
use api_client::ApiClientError;
use auth::Route;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<String>),
    Generating,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum TagMessage {
    Fetched {
        generation: u64,
        result: Result<Vec<String>, ApiClientError>,
    },
    Generated {
        generation: u64,
        result: Result<Vec<String>, ApiClientError>,
    },
}

#[derive(Debug, Clone)]
pub struct TagPanel {
    ctx: ViewContext,
    file_id: Option<i64>,
    generation: u64,
    state: TagState,
    route: Option<Route>,
}

impl TagPanel {
    pub fn new(ctx: ViewContext) -> Self {
        TagPanel {
            ctx,
            file_id: None,
            generation: 0,
            state: TagState::Idle,
            route: None,
        }
    }

    pub fn file_id(&self) -> Option<i64> {
        self.file_id
    }

    pub fn state(&self) -> &TagState {
        &self.state
    }

    pub fn tags(&self) -> &[String] {
        match &self.state {
            TagState::Loaded(tags) => tags,
            _ => &[],
        }
    }

    /// Generation is offered only once the fetch came back with no tags.
    pub fn can_generate(&self) -> bool {
        matches!(&self.state, TagState::Loaded(tags) if tags.is_empty())
    }

    pub fn route(&self) -> Option<Route> {
        self.route
    }

    /// Show tags for `file_id`. Answers for a previous file are dropped.
    pub fn select(&mut self, file_id: i64) -> Command<TagMessage> {
        self.generation += 1;
        self.file_id = Some(file_id);
        self.state = TagState::Idle;
        let Some(token) = self.ctx.token("Tag fetch") else {
            return Command::none();
        };
        self.state = TagState::Loading;
        let generation = self.generation;
        let client = self.ctx.client.clone();
        Command::perform(
            async move { client.file_tags(&token, file_id, false).await },
            move |result| TagMessage::Fetched { generation, result },
        )
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.file_id = None;
        self.state = TagState::Idle;
    }

    pub fn generate(&mut self) -> Command<TagMessage> {
        let Some(file_id) = self.file_id else {
            return Command::none();
        };
        if !self.can_generate() {
            return Command::none();
        }
        let Some(token) = self.ctx.token("Tag generation") else {
            return Command::none();
        };
        self.state = TagState::Generating;
        let generation = self.generation;
        let client = self.ctx.client.clone();
        tracing::info!("Generating tags for file {}", file_id);
        Command::perform(
            async move { client.file_tags(&token, file_id, true).await },
            move |result| TagMessage::Generated { generation, result },
        )
    }

    fn settle(&mut self, result: Result<Vec<String>, ApiClientError>, action: &str) {
        match result {
            Ok(tags) => self.state = TagState::Loaded(tags),
            Err(e) => {
                tracing::error!("Tag {} failed for file {:?}: {}", action, self.file_id, e);
                if let Some(route) = self.ctx.route_for(e.is_unauthorized()) {
                    self.route = Some(route);
                }
                self.state = TagState::Failed(e.to_string());
            }
        }
    }
}

impl View for TagPanel {
    type Message = TagMessage;

    fn update(&mut self, message: TagMessage) -> Command<TagMessage> {
        match message {
            TagMessage::Fetched { generation, result } | TagMessage::Generated { generation, result }
                if generation != self.generation =>
            {
                tracing::debug!("Dropping stale tag result ({} ok)", result.is_ok());
            }
            TagMessage::Fetched { result, .. } => self.settle(result, "fetch"),
            TagMessage::Generated { result, .. } => self.settle(result, "generation"),
        }
        Command::none()
    }
}
