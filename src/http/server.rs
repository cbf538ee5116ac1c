//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the elements and document handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener and stop on the shutdown signal
//! - Record request metrics

use std::time::{Duration, Instant};

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::elements::{decode_file_path, ELEMENTS_FILE_EXTENSION};
use crate::http::handler::{HandlerError, HandlerInput, RequestHandler};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::{not_found, output_response};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub handler: RequestHandler,
}

/// HTTP server for one site.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// `routes_dir` is the URL prefix component requests are served under.
    pub fn new(handler: RequestHandler, config: &ServerConfig, routes_dir: &str) -> Self {
        let router = Self::build_router(AppState { handler }, config, routes_dir);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, config: &ServerConfig, routes_dir: &str) -> Router {
        let elements_route = format!("/{}/{{*key}}", routes_dir.trim_matches('/'));
        Router::new()
            .route(&elements_route, get(elements_handler))
            .fallback(get(document_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request.request_id().unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(set_request_id_layer())
    }

    /// The router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Component request: `/<routes_dir>/<encoded route path>.txt`.
async fn elements_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let result = decode_file_path(&key, ELEMENTS_FILE_EXTENSION)
        .map_err(HandlerError::from)
        .and_then(|route_path| {
            state.handler.handle(HandlerInput::Component {
                route_path: &route_path,
                query: uri.query(),
                headers: &headers,
            })
        });

    let renderer = state.handler.renderer();
    let response = match result {
        Ok(Some(output)) => output_response(output, renderer.content_type(), || {
            renderer.render_shell()
        }),
        Ok(None) => {
            tracing::debug!(key = %key, "No route for component request");
            not_found()
        }
        Err(e) => e.into_response(),
    };
    metrics::record_request("elements", response.status().as_u16(), start);
    response
}

/// Document request for any other path.
async fn document_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let start = Instant::now();
    let result = state.handler.handle(HandlerInput::Custom {
        pathname: uri.path(),
        query: uri.query(),
    });

    let renderer = state.handler.renderer();
    let response = match result {
        Ok(Some(output)) => output_response(output, renderer.content_type(), || {
            renderer.render_shell()
        }),
        Ok(None) => not_found(),
        Err(e) => e.into_response(),
    };
    metrics::record_request("document", response.status().as_u16(), start);
    response
}
