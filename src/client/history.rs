//! History and viewport seams for the client router.
//!
//! The router drives navigation through these traits. `MemoryHistory` and
//! `MemoryViewport` are in-process implementations for headless clients
//! and tests; a host embedding the router supplies its own.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

/// State stored with each history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    /// Scroll position saved when leaving the entry.
    pub scroll: Option<(f64, f64)>,
    /// Caller-owned state kept across replace navigations.
    pub custom: Option<serde_json::Value>,
}

/// Emitted when the active entry changes through `go`.
#[derive(Debug, Clone, PartialEq)]
pub struct PopState {
    pub state: HistoryState,
}

pub trait History: Send + Sync {
    fn location(&self) -> Url;

    fn state(&self) -> HistoryState;

    fn push_state(&self, state: HistoryState, url: &Url);

    fn replace_state(&self, state: HistoryState, url: &Url);

    /// Move `delta` entries; emits a popstate when the entry changes.
    fn go(&self, delta: isize);
}

pub trait Viewport: Send + Sync {
    fn scroll_position(&self) -> (f64, f64);

    fn scroll_to(&self, x: f64, y: f64);
}

struct Entries {
    stack: Vec<(Url, HistoryState)>,
    index: usize,
}

/// Session history held in memory.
pub struct MemoryHistory {
    entries: Mutex<Entries>,
    popstate: mpsc::UnboundedSender<PopState>,
}

impl MemoryHistory {
    /// History with one entry at `initial`, plus the popstate stream.
    pub fn new(initial: Url) -> (Self, mpsc::UnboundedReceiver<PopState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let history = Self {
            entries: Mutex::new(Entries {
                stack: vec![(initial, HistoryState::default())],
                index: 0,
            }),
            popstate: tx,
        };
        (history, rx)
    }

    pub fn len(&self) -> usize {
        self.with_entries(|entries| entries.stack.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self) -> usize {
        self.with_entries(|entries| entries.index)
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut Entries) -> T) -> T {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut entries)
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Url {
        self.with_entries(|entries| entries.stack[entries.index].0.clone())
    }

    fn state(&self) -> HistoryState {
        self.with_entries(|entries| entries.stack[entries.index].1.clone())
    }

    fn push_state(&self, state: HistoryState, url: &Url) {
        self.with_entries(|entries| {
            let next = entries.index + 1;
            entries.stack.truncate(next);
            entries.stack.push((url.clone(), state));
            entries.index = next;
        });
    }

    fn replace_state(&self, state: HistoryState, url: &Url) {
        self.with_entries(|entries| {
            let index = entries.index;
            entries.stack[index] = (url.clone(), state);
        });
    }

    fn go(&self, delta: isize) {
        let state = self.with_entries(|entries| {
            let target = entries.index as isize + delta;
            if delta == 0 || target < 0 || target as usize >= entries.stack.len() {
                return None;
            }
            entries.index = target as usize;
            Some(entries.stack[entries.index].1.clone())
        });
        if let Some(state) = state {
            let _ = self.popstate.send(PopState { state });
        }
    }
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistory")
            .field("location", &self.location().as_str())
            .field("index", &self.index())
            .finish()
    }
}

/// Scroll position held in memory.
#[derive(Debug, Default)]
pub struct MemoryViewport {
    position: Mutex<(f64, f64)>,
}

impl MemoryViewport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Viewport for MemoryViewport {
    fn scroll_position(&self) -> (f64, f64) {
        self.position.lock().map(|p| *p).unwrap_or_default()
    }

    fn scroll_to(&self, x: f64, y: f64) {
        if let Ok(mut position) = self.position.lock() {
            *position = (x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("http://localhost/").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_push_truncates_forward_entries() {
        let (history, _rx) = MemoryHistory::new(url("/"));
        history.push_state(HistoryState::default(), &url("/a"));
        history.push_state(HistoryState::default(), &url("/b"));
        history.go(-2);
        history.push_state(HistoryState::default(), &url("/c"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.location().path(), "/c");
    }

    #[tokio::test]
    async fn test_go_emits_popstate() {
        let (history, mut rx) = MemoryHistory::new(url("/"));
        history.replace_state(
            HistoryState {
                scroll: Some((0.0, 120.0)),
                custom: None,
            },
            &url("/"),
        );
        history.push_state(HistoryState::default(), &url("/a"));

        history.go(-1);
        assert_eq!(history.location().path(), "/");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.state.scroll, Some((0.0, 120.0)));

        history.go(-1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_viewport() {
        let viewport = MemoryViewport::new();
        viewport.scroll_to(3.0, 4.0);
        assert_eq!(viewport.scroll_position(), (3.0, 4.0));
    }
}
