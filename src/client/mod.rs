//! Client router runtime.
//!
//! # Data Flow
//! ```text
//! push / replace / popstate / reload
//!     → router.rs (sequence number, static-path shortcut)
//!     → fetch.rs (shared fetch per (path, params), skip set attached)
//!     → transport.rs (component request → elements map)
//!     → fetch.rs (merge over the running map, strip `_value`)
//!     → router.rs (commit snapshot, history entry, scroll)
//! ```
//!
//! # Design Decisions
//! - History, viewport and transport are traits; the runtime has no
//!   ambient globals
//! - Caches live on the router instance

pub mod fetch;
pub mod history;
pub mod router;
pub mod transport;

pub use fetch::{fetch_elements, merge_elements, merge_pending, FetchCache, MergeCache, SharedElements};
pub use history::{History, HistoryState, MemoryHistory, MemoryViewport, PopState, Viewport};
pub use router::{
    ChangeRouteOptions, ClientRouter, HistoryMode, PushRef, RouteProps, RouterSnapshot, RouterState,
};
pub use transport::{ElementsTransport, FetchError, FetchRequest, HttpTransport};
