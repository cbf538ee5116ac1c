//! Response construction.
//!
//! # Responsibilities
//! - Turn handler output into HTTP responses with the right content type
//! - Map handler errors to status codes
//!
//! # Design Decisions
//! - Malformed route paths are 400, render failures 500, misses 404
//! - Error bodies are the error message as plain text

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::http::handler::{HandlerError, HandlerOutput};

/// Build the response for one handler result.
pub fn output_response(output: HandlerOutput, content_type: &str, shell: impl FnOnce() -> String) -> Response {
    match output {
        HandlerOutput::Elements(body) => {
            ([(header::CONTENT_TYPE, content_type.to_string())], body).into_response()
        }
        HandlerOutput::Html { status, body } => (status, Html(body)).into_response(),
        HandlerOutput::Fallback => Html(shell()).into_response(),
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::EncodingError;
    use crate::render::RenderError;

    #[test]
    fn test_error_status() {
        let response = HandlerError::Encoding(EncodingError::MissingPrefix("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = HandlerError::Render(RenderError::Component("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_fallback_uses_shell() {
        let response = output_response(HandlerOutput::Fallback, "application/json", || {
            "<html>shell</html>".to_string()
        });
        assert_eq!(response.status(), StatusCode::OK);
    }
}
