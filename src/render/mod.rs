//! Rendering subsystem.
//!
//! # Data Flow
//! ```text
//! ComponentProps
//!     → component.rs (page / layout / root render functions)
//!     → Node trees stored under slot ids (elements map)
//!
//! Elements map
//!     → Renderer::render_elements (codec bytes for component requests)
//!     → Renderer::render_html (full document for first paint)
//!     → Renderer::render_shell (client-only fallback)
//! ```
//!
//! # Design Decisions
//! - Render steps return `Result<Node, RenderError>`; callers pick the
//!   fallback instead of a catch-and-rerender boundary
//! - The codec and HTML writer sit behind the `Renderer` trait so hosts
//!   can plug their own

pub mod component;
pub mod html;
pub mod template;

pub use component::{Component, ComponentProps};
pub use html::HtmlRenderer;
pub use template::{TemplateError, TemplateLoader};

use axum::body::Bytes;
use thiserror::Error;

use crate::elements::{CodecError, Elements};

/// Errors raised while producing or writing UI trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("No page found for {0}")]
    NotFound(String),

    #[error("Missing slot: {0}")]
    MissingSlot(String),

    #[error("Slot nesting exceeds {0} levels")]
    TooDeep(usize),

    /// Failure raised by a component's own render function.
    #[error("{0}")]
    Component(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Rendering primitives used by the request and build handlers.
pub trait Renderer: Send + Sync {
    /// Content type of `render_elements` output.
    fn content_type(&self) -> &'static str;

    /// Serialize an elements map for the wire.
    fn render_elements(&self, elements: &Elements) -> Result<Bytes, RenderError>;

    /// Render the complete document for `path` from its elements map.
    fn render_html(&self, elements: &Elements, path: &str) -> Result<String, RenderError>;

    /// Minimal document that lets the client fetch and render on its own.
    fn render_shell(&self) -> String;
}
