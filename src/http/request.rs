//! Request identification.
//!
//! # Responsibilities
//! - Give every request an `x-request-id` (kept when the client sent one)
//! - Expose the id to handlers through request extensions
//! - Echo the id on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - UUID v4; no coordination between instances needed

use axum::http::{HeaderName, Request};
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Outermost layer: assigns the id unless the client already sent one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Copies the request's id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Read the id back from a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.extensions()
            .get::<RequestId>()
            .and_then(|id| id.header_value().to_str().ok())
    }
}
