//! The clip source seam used by the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use bestof_models::Clip;

use crate::error::TwitchResult;

/// Helix caps `first` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

/// What a clip request is scoped to. Helix accepts exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipScope {
    Game(String),
    Broadcaster(String),
}

/// Creation-time window for clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl TimeWindow {
    /// The `days` days ending now.
    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    pub fn ending_at(ended_at: DateTime<Utc>, days: u32) -> Self {
        Self {
            started_at: ended_at - Duration::days(i64::from(days)),
            ended_at,
        }
    }
}

/// A clip request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipQuery {
    pub scope: ClipScope,
    pub window: TimeWindow,
    pub page_size: u32,
    /// Upper bound on clips collected before the term filter
    pub max_clips: usize,
    /// Case-insensitive title filter
    pub term: Option<String>,
}

impl ClipQuery {
    /// Clips of the last 7 days, 100 per page.
    pub fn new(scope: ClipScope) -> Self {
        Self {
            scope,
            window: TimeWindow::last_days(7),
            page_size: MAX_PAGE_SIZE,
            max_clips: 500,
            term: None,
        }
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_max_clips(mut self, max_clips: usize) -> Self {
        self.max_clips = max_clips;
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.term = (!term.trim().is_empty()).then_some(term);
        self
    }
}

/// A live-stream request: streams of one game whose title mentions any term.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamQuery {
    pub game_id: String,
    pub page_size: u32,
    pub terms: Vec<String>,
    /// Stop after this many matching streams
    pub max_matches: usize,
}

impl StreamQuery {
    pub fn new(game_id: impl Into<String>, terms: Vec<String>) -> Self {
        Self {
            game_id: game_id.into(),
            page_size: MAX_PAGE_SIZE,
            terms,
            max_matches: 10,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_max_matches(mut self, max_matches: usize) -> Self {
        self.max_matches = max_matches;
        self
    }

    /// Terms found in `title`, compared case-insensitively.
    pub fn matched_terms(&self, title: &str) -> Vec<String> {
        let title = title.to_lowercase();
        self.terms
            .iter()
            .map(|term| term.to_lowercase())
            .filter(|term| !term.is_empty() && title.contains(term.as_str()))
            .collect()
    }

    pub fn matches(&self, title: &str) -> bool {
        !self.matched_terms(title).is_empty()
    }

    /// A stream is kept when its title matches and the broadcaster's display
    /// name is plain ASCII.
    pub fn accepts(&self, user_name: &str, title: &str) -> bool {
        !user_name.is_empty() && user_name.is_ascii() && self.matches(title)
    }
}

/// A live stream that matched a [`StreamQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStream {
    pub user_name: String,
    pub user_login: String,
    pub title: String,
    pub matched_terms: Vec<String>,
}

/// Fetches clips and live streams from the platform.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Clips matching `query`, in the order the platform returned them.
    async fn fetch_clips(&self, query: &ClipQuery) -> TwitchResult<Vec<Clip>>;

    /// Live streams accepted by `query`, at most `query.max_matches`.
    async fn fetch_live_streams(&self, query: &StreamQuery) -> TwitchResult<Vec<LiveStream>>;

    /// Broadcaster id for a display name or login.
    ///
    /// Fails with `NotFound` when no such user exists.
    async fn resolve_broadcaster_id(&self, name: &str) -> TwitchResult<String>;

    /// Drop cached credentials so the next call authenticates again.
    async fn reconnect(&self);
}

/// Strip non-ASCII characters from a broadcaster name before lookup.
pub fn sanitize_broadcaster_name(name: &str) -> String {
    name.chars().filter(char::is_ascii).collect::<String>().trim().to_string()
}
