//! Pages, chapters and per-page load state

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chapter identifier as handed out by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterId(pub u64);

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chapter {}", self.0)
    }
}

/// Page descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    /// 0-based, unique within its chapter
    pub index: usize,
    pub url: String,
}

impl Page {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
        }
    }
}

/// Role of a mounted page set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChapterContext {
    Current,
    Previous,
    Next,
}

impl ChapterContext {
    pub fn is_current(self) -> bool {
        self == ChapterContext::Current
    }

    pub fn is_previous(self) -> bool {
        self == ChapterContext::Previous
    }

    pub fn is_next(self) -> bool {
        self == ChapterContext::Next
    }
}

/// Tag distinguishing one explicit retry from another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RetryKey(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadStatus {
    Unloaded,
    Loaded,
    Error,
}

/// Load state of one page image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoadState {
    url: String,
    status: LoadStatus,
    retry_key: Option<RetryKey>,
}

impl PageLoadState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LoadStatus::Unloaded,
            retry_key: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }

    pub fn error(&self) -> bool {
        self.status == LoadStatus::Error
    }

    pub fn retry_key(&self) -> Option<RetryKey> {
        self.retry_key
    }

    /// Key the rendering layer uses for the image element; changes on retry
    /// so the element is re-created.
    pub fn render_key(&self) -> String {
        match self.retry_key {
            Some(RetryKey(key)) => format!("r{key}-{}", self.url),
            None => self.url.clone(),
        }
    }

    /// Image source; retries bust the HTTP cache
    pub fn src(&self) -> String {
        match self.retry_key {
            Some(RetryKey(key)) => {
                let separator = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{separator}retry={key}", self.url)
            }
            None => self.url.clone(),
        }
    }
}

/// Outcome reported back to the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

/// Load/error acknowledgement for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadAck {
    pub chapter_id: ChapterId,
    pub page_index: usize,
    pub outcome: LoadOutcome,
}

/// Load states of one chapter context
#[derive(Debug, Clone)]
pub struct PageLoadStates {
    chapter_id: ChapterId,
    states: Vec<PageLoadState>,
    next_retry: u64,
}

impl PageLoadStates {
    pub fn new(chapter_id: ChapterId, pages: &[Page]) -> Self {
        Self {
            chapter_id,
            states: pages.iter().map(|p| PageLoadState::new(p.url.clone())).collect(),
            next_retry: 1,
        }
    }

    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, page_index: usize) -> Option<&PageLoadState> {
        self.states.get(page_index)
    }

    /// The image fired its load event.
    ///
    /// `key` is the retry key the element was rendered with; events from an
    /// element rendered before the latest retry are stale and ignored.
    pub fn mark_loaded(&mut self, page_index: usize, key: Option<RetryKey>) -> Option<LoadAck> {
        self.transition(page_index, key, LoadStatus::Loaded)
    }

    /// The image fired its error event
    pub fn mark_error(&mut self, page_index: usize, key: Option<RetryKey>) -> Option<LoadAck> {
        self.transition(page_index, key, LoadStatus::Error)
    }

    /// Explicit retry of a failed page. Pages not in the error state are
    /// left alone.
    pub fn retry(&mut self, page_index: usize) -> Option<RetryKey> {
        let state = self.states.get_mut(page_index)?;
        if state.status != LoadStatus::Error {
            return None;
        }

        let key = RetryKey(self.next_retry);
        self.next_retry += 1;
        state.status = LoadStatus::Unloaded;
        state.retry_key = Some(key);
        tracing::debug!(
            "{} page {}: retry {:?}",
            self.chapter_id,
            page_index,
            key
        );
        Some(key)
    }

    fn transition(
        &mut self,
        page_index: usize,
        key: Option<RetryKey>,
        status: LoadStatus,
    ) -> Option<LoadAck> {
        let state = self.states.get_mut(page_index)?;
        if state.retry_key != key {
            tracing::trace!(
                "{} page {}: stale load event {:?} (current {:?})",
                self.chapter_id,
                page_index,
                key,
                state.retry_key
            );
            return None;
        }
        if state.status != LoadStatus::Unloaded {
            return None;
        }

        state.status = status;
        let outcome = match status {
            LoadStatus::Error => {
                tracing::warn!("{} page {}: image failed to load", self.chapter_id, page_index);
                LoadOutcome::Failed
            }
            _ => LoadOutcome::Loaded,
        };

        Some(LoadAck {
            chapter_id: self.chapter_id,
            page_index,
            outcome,
        })
    }
}
