//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (add request ID)
//!     → handler.rs (component request → elements map,
//!                   document request → HTML / shell / 404)
//!     → response.rs (content type, error → status)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{HandlerError, HandlerInput, HandlerOutput, RequestHandler};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
