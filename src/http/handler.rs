//! Request handling for component and document requests.
//!
//! # Responsibilities
//! - Component requests: encoded route path → serialized elements map
//! - Document requests: pathname → full HTML, client-only fallback,
//!   not-found document, or nothing
//!
//! # Design Decisions
//! - Unknown paths fall back to the `/404` route when one exists
//! - Document requests ignore the skip header; first paint needs every slot
//! - Render failures propagate as errors; the HTTP layer turns them into 500s

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::elements::{encode_route_path, EncodingError, EntriesError, EntriesManager};
use crate::render::{RenderError, Renderer};
use crate::routing::route_config::{RouteConfigError, NOT_FOUND_PATH};

/// Errors raised while answering a request.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Entries(#[from] EntriesError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Config(#[from] RouteConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl HandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Encoding(_) | HandlerError::Entries(EntriesError::Encoding(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The two request shapes the handler answers.
#[derive(Debug, Clone, Copy)]
pub enum HandlerInput<'a> {
    /// Fetch the elements map of an encoded route path.
    Component {
        route_path: &'a str,
        query: Option<&'a str>,
        headers: &'a HeaderMap,
    },
    /// First paint of a document.
    Custom {
        pathname: &'a str,
        query: Option<&'a str>,
    },
}

/// What the caller should send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutput {
    Elements(Bytes),
    Html { status: StatusCode, body: String },
    /// Server rendering is disabled; emit a shell and let the client fetch.
    Fallback,
}

/// Answers live requests against one site.
#[derive(Clone)]
pub struct RequestHandler {
    entries: EntriesManager,
    renderer: Arc<dyn Renderer>,
}

impl RequestHandler {
    pub fn new(entries: EntriesManager, renderer: Arc<dyn Renderer>) -> Self {
        Self { entries, renderer }
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn entries(&self) -> &EntriesManager {
        &self.entries
    }

    /// `Ok(None)` means no route and no not-found route: the caller decides.
    pub fn handle(&self, input: HandlerInput<'_>) -> Result<Option<HandlerOutput>, HandlerError> {
        match input {
            HandlerInput::Component {
                route_path,
                query,
                headers,
            } => self.handle_component(route_path, query, headers),
            HandlerInput::Custom { pathname, query } => self.handle_document(pathname, query),
        }
    }

    fn handle_component(
        &self,
        route_path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Option<HandlerOutput>, HandlerError> {
        let mut elements = self.entries.get_entries(route_path, query, headers)?;
        if elements.is_none() && self.entries.routes().has_404()? {
            tracing::debug!(route_path = %route_path, "Serving not-found elements");
            elements = self
                .entries
                .get_entries(&encode_route_path(NOT_FOUND_PATH)?, None, headers)?;
        }
        match elements {
            Some(elements) => Ok(Some(HandlerOutput::Elements(
                self.renderer.render_elements(&elements)?,
            ))),
            None => Ok(None),
        }
    }

    fn handle_document(
        &self,
        pathname: &str,
        query: Option<&str>,
    ) -> Result<Option<HandlerOutput>, HandlerError> {
        let routes = self.entries.routes();
        let (path, query, status) = match routes.get_config_item_by_path(pathname)? {
            Some(_) => (pathname, query, StatusCode::OK),
            None => {
                tracing::warn!(pathname = %pathname, "No route matched");
                if !routes.has_404()? {
                    return Ok(None);
                }
                (NOT_FOUND_PATH, None, StatusCode::NOT_FOUND)
            }
        };

        if routes
            .get_config_item_by_path(path)?
            .is_some_and(|config| config.no_ssr)
        {
            return Ok(Some(HandlerOutput::Fallback));
        }

        let Some(elements) =
            self.entries
                .get_entries(&encode_route_path(path)?, query, &HeaderMap::new())?
        else {
            return Ok(None);
        };
        let body = self.renderer.render_html(&elements, path)?;
        Ok(Some(HandlerOutput::Html { status, body }))
    }
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("entries", &self.entries)
            .finish()
    }
}
