//! Client router runtime.
//!
//! # Responsibilities
//! - Hold the committed route and elements map
//! - Fetch, merge and commit on navigation; keep the old route on failure
//! - Drive history entries and scroll restoration
//! - Track static paths and held slot ids from successful fetches
//!
//! # Design Decisions
//! - Snapshots are swapped whole (`ArcSwap`); readers never see a route
//!   paired with another route's elements
//! - Each navigation takes a sequence number; a result is committed only
//!   if no newer navigation started meanwhile
//! - Bookkeeping advances only from successfully resolved maps

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use url::Url;

use crate::client::fetch::{fetch_elements, merge_pending, FetchCache, MergeCache};
use crate::client::history::{History, HistoryState, PopState, Viewport};
use crate::client::transport::{ElementsTransport, FetchError};
use crate::elements::{
    encode_route_path, route_slot_id, Elements, Node, HAS404_ID, IS_STATIC_ID, ROUTE_ID,
};
use crate::render::html::{render_node, render_route};
use crate::render::RenderError;
use crate::routing::route_config::NOT_FOUND_PATH;

/// Where the router is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteProps {
    pub path: String,
    /// Without the leading `?`.
    pub query: String,
    /// Without the leading `#`.
    pub hash: String,
}

impl RouteProps {
    pub fn from_url(url: &Url) -> Self {
        Self {
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
            hash: url.fragment().unwrap_or_default().to_string(),
        }
    }

    pub fn to_url(&self, base: &Url) -> Result<Url, FetchError> {
        let mut href = self.path.clone();
        if !self.query.is_empty() {
            href.push('?');
            href.push_str(&self.query);
        }
        if !self.hash.is_empty() {
            href.push('#');
            href.push_str(&self.hash);
        }
        base.join(&href)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", href, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Push,
    Replace,
}

/// How the next commit touches history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushRef {
    /// `None` leaves history alone (popstate, reload).
    pub mode: Option<HistoryMode>,
    /// Carry the current entry's custom state into the new entry.
    pub preserve_state: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterState {
    pub route: RouteProps,
    pub push_ref: PushRef,
}

/// What the UI reads.
#[derive(Debug, Clone)]
pub struct RouterSnapshot {
    pub state: RouterState,
    pub elements: Arc<Elements>,
    /// Last navigation failure; cleared by the next successful commit.
    pub error: Option<FetchError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeRouteOptions {
    pub should_scroll: bool,
    /// `Some(false)` forces a fetch even for known static paths.
    pub skip_refetch: Option<bool>,
    pub push_ref: PushRef,
}

pub struct ClientRouter {
    transport: Arc<dyn ElementsTransport>,
    history: Arc<dyn History>,
    viewport: Arc<dyn Viewport>,
    fetch_cache: FetchCache,
    merge_cache: MergeCache,
    snapshot: ArcSwap<RouterSnapshot>,
    static_paths: Mutex<HashSet<String>>,
    cached_ids: Mutex<BTreeSet<String>>,
    navigation: AtomicU64,
}

impl ClientRouter {
    /// Mount the router over the elements map the document was rendered with.
    pub fn new(
        initial: Elements,
        transport: Arc<dyn ElementsTransport>,
        history: Arc<dyn History>,
        viewport: Arc<dyn Viewport>,
    ) -> Self {
        let route = RouteProps::from_url(&history.location());
        let router = Self {
            transport,
            history,
            viewport,
            fetch_cache: FetchCache::new(),
            merge_cache: MergeCache::new(),
            snapshot: ArcSwap::from_pointee(RouterSnapshot {
                state: RouterState {
                    route,
                    push_ref: PushRef::default(),
                },
                elements: Arc::new(initial),
                error: None,
            }),
            static_paths: Mutex::new(HashSet::new()),
            cached_ids: Mutex::new(BTreeSet::new()),
            navigation: AtomicU64::new(0),
        };
        router.record_metadata(&router.snapshot.load().elements);
        router
    }

    pub fn snapshot(&self) -> Arc<RouterSnapshot> {
        self.snapshot.load_full()
    }

    pub fn route(&self) -> RouteProps {
        self.snapshot.load().state.route.clone()
    }

    pub fn elements(&self) -> Arc<Elements> {
        self.snapshot.load().elements.clone()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.snapshot.load().error.clone()
    }

    pub fn is_static_path(&self, path: &str) -> bool {
        lock(&self.static_paths).contains(path)
    }

    /// Slot ids sent as the skip set on the next fetch.
    pub fn cached_ids(&self) -> Vec<String> {
        lock(&self.cached_ids).iter().cloned().collect()
    }

    pub fn fetch_cache(&self) -> &FetchCache {
        &self.fetch_cache
    }

    pub async fn push(&self, href: &str) -> Result<(), FetchError> {
        let route = self.resolve(href)?;
        self.save_scroll();
        self.change_route(
            route,
            ChangeRouteOptions {
                should_scroll: true,
                skip_refetch: None,
                push_ref: PushRef {
                    mode: Some(HistoryMode::Push),
                    preserve_state: false,
                },
            },
        )
        .await
    }

    pub async fn replace(&self, href: &str) -> Result<(), FetchError> {
        let route = self.resolve(href)?;
        self.change_route(
            route,
            ChangeRouteOptions {
                should_scroll: true,
                skip_refetch: None,
                push_ref: PushRef {
                    mode: Some(HistoryMode::Replace),
                    preserve_state: true,
                },
            },
        )
        .await
    }

    /// Refetch the current route, bypassing every cache.
    pub async fn reload(&self) -> Result<(), FetchError> {
        self.fetch_cache.invalidate();
        self.change_route(
            self.route(),
            ChangeRouteOptions {
                should_scroll: false,
                skip_refetch: Some(false),
                push_ref: PushRef::default(),
            },
        )
        .await
    }

    /// The resulting popstate is handled by [`ClientRouter::listen`].
    pub fn back(&self) {
        self.history.go(-1);
    }

    pub fn forward(&self) {
        self.history.go(1);
    }

    pub async fn change_route(
        &self,
        route: RouteProps,
        options: ChangeRouteOptions,
    ) -> Result<(), FetchError> {
        self.navigate(route, options, None).await
    }

    /// Re-derive the route from the location after a history traversal.
    pub async fn on_popstate(&self, event: PopState) -> Result<(), FetchError> {
        let route = RouteProps::from_url(&self.history.location());
        self.navigate(
            route,
            ChangeRouteOptions {
                should_scroll: true,
                skip_refetch: None,
                push_ref: PushRef::default(),
            },
            event.state.scroll,
        )
        .await
    }

    /// Handle popstate events until the history is dropped.
    pub async fn listen(self: Arc<Self>, mut popstate: mpsc::UnboundedReceiver<PopState>) {
        while let Some(event) = popstate.recv().await {
            if let Err(e) = self.on_popstate(event).await {
                tracing::warn!(error = %e, "Navigation after popstate failed");
            }
        }
        tracing::debug!("Popstate stream closed");
    }

    /// Drop the pending fetch; nothing in flight will be committed.
    pub fn on_page_hide(&self) {
        self.navigation.fetch_add(1, Ordering::SeqCst);
        self.fetch_cache.invalidate();
    }

    /// Current UI, or the error element if the last navigation failed.
    pub fn render_html(&self) -> Result<String, RenderError> {
        let snapshot = self.snapshot.load();
        if let Some(error) = &snapshot.error {
            return render_node(&snapshot.elements, &error_node(error));
        }
        let path = snapshot.state.route.path.as_str();
        let has_route = snapshot.elements.contains_key(&route_slot_id(path));
        let has_404 = snapshot
            .elements
            .get(HAS404_ID)
            .and_then(|value| value.as_flag())
            .unwrap_or(false);
        let path = if !has_route && has_404 { NOT_FOUND_PATH } else { path };
        render_route(&snapshot.elements, path)
    }

    async fn navigate(
        &self,
        route: RouteProps,
        options: ChangeRouteOptions,
        restore_scroll: Option<(f64, f64)>,
    ) -> Result<(), FetchError> {
        let navigation = self.navigation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.snapshot.load_full();
        let same_document = route.path == current.state.route.path
            && route.query == current.state.route.query;
        let skip_refetch = options
            .skip_refetch
            .unwrap_or_else(|| same_document || self.is_static_path(&route.path));

        let elements = if skip_refetch {
            tracing::debug!(path = %route.path, "Navigating without fetch");
            current.elements.clone()
        } else {
            let path_key = match encode_route_path(&route.path) {
                Ok(key) => key,
                Err(e) => return Err(self.fail(&current, e.into())),
            };
            let pending = fetch_elements(
                &path_key,
                &route.query,
                self.cached_ids(),
                &self.transport,
                &self.fetch_cache,
            );
            let merged = merge_pending(
                futures_util::future::ready(Ok(current.elements.clone())),
                pending,
                &self.merge_cache,
            )
            .await;

            if self.navigation.load(Ordering::SeqCst) != navigation {
                tracing::debug!(path = %route.path, "Dropping superseded navigation");
                return Ok(());
            }
            match merged {
                Ok(merged) => {
                    self.record_metadata(&merged);
                    merged
                }
                Err(e) => {
                    self.fetch_cache.forget(&path_key, &route.query);
                    return Err(self.fail(&current, e));
                }
            }
        };

        self.commit(route, elements, options, restore_scroll)
    }

    fn commit(
        &self,
        route: RouteProps,
        elements: Arc<Elements>,
        options: ChangeRouteOptions,
        restore_scroll: Option<(f64, f64)>,
    ) -> Result<(), FetchError> {
        if let Some(mode) = options.push_ref.mode {
            let url = route.to_url(&self.history.location())?;
            let custom = if options.push_ref.preserve_state {
                self.history.state().custom
            } else {
                None
            };
            let state = HistoryState {
                scroll: None,
                custom,
            };
            match mode {
                HistoryMode::Push => self.history.push_state(state, &url),
                HistoryMode::Replace => self.history.replace_state(state, &url),
            }
        }

        tracing::debug!(path = %route.path, query = %route.query, "Route committed");
        self.snapshot.store(Arc::new(RouterSnapshot {
            state: RouterState {
                route,
                push_ref: options.push_ref,
            },
            elements,
            error: None,
        }));

        if options.should_scroll {
            let (x, y) = restore_scroll.unwrap_or((0.0, 0.0));
            self.viewport.scroll_to(x, y);
        }
        Ok(())
    }

    /// Keep the current route and elements; surface `error`.
    fn fail(&self, current: &RouterSnapshot, error: FetchError) -> FetchError {
        self.snapshot.store(Arc::new(RouterSnapshot {
            state: current.state.clone(),
            elements: current.elements.clone(),
            error: Some(error.clone()),
        }));
        error
    }

    fn record_metadata(&self, elements: &Elements) {
        let route = elements.get(ROUTE_ID).and_then(|value| value.as_route());
        let is_static = elements
            .get(IS_STATIC_ID)
            .and_then(|value| value.as_flag())
            .unwrap_or(false);
        if let (Some(route), true) = (route, is_static) {
            lock(&self.static_paths).insert(route.path().to_string());
        }

        let ids = elements
            .keys()
            .filter(|id| !matches!(id.as_str(), ROUTE_ID | IS_STATIC_ID | HAS404_ID))
            .cloned()
            .collect();
        *lock(&self.cached_ids) = ids;
    }

    fn save_scroll(&self) {
        let mut state = self.history.state();
        state.scroll = Some(self.viewport.scroll_position());
        self.history.replace_state(state, &self.history.location());
    }

    fn resolve(&self, href: &str) -> Result<RouteProps, FetchError> {
        let url = self
            .history
            .location()
            .join(href)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", href, e)))?;
        Ok(RouteProps::from_url(&url))
    }
}

impl std::fmt::Debug for ClientRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRouter")
            .field("route", &self.route())
            .field("fetch_cache", &self.fetch_cache)
            .finish()
    }
}

fn error_node(error: &FetchError) -> Node {
    Node::element("div")
        .attr("role", "alert")
        .attr("data-pagetree-error", "")
        .child(Node::text(error.to_string()))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
