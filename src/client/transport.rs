//! Transport for component requests.
//!
//! The router never talks to the network directly; it goes through an
//! [`ElementsTransport`] so tests and embedders can substitute their own.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

use crate::elements::{
    encode_file_path, CodecError, Elements, ElementsCodec, EncodingError,
    ELEMENTS_FILE_EXTENSION, SKIP_HEADER,
};

/// Errors raised while fetching an elements map.
///
/// Cloneable so one failed fetch can be observed by every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server responded with status {0}")]
    Status(u16),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// One component request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Encoded route path (e.g. `R/about`).
    pub route_key: String,
    /// Query string without the leading `?`; empty for none.
    pub query: String,
    /// Slot ids the client already holds.
    pub skip: Vec<String>,
}

pub trait ElementsTransport: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Elements, FetchError>>;
}

/// Fetches elements maps from a running server (or a static build).
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    routes_dir: String,
    codec: Arc<dyn ElementsCodec>,
}

impl HttpTransport {
    pub fn new(base: Url, routes_dir: impl Into<String>, codec: Arc<dyn ElementsCodec>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            routes_dir: routes_dir.into().trim_matches('/').to_string(),
            codec,
        }
    }

    /// `{base}/{routes_dir}/{encoded file path}?{query}`
    pub fn request_url(&self, request: &FetchRequest) -> Result<Url, FetchError> {
        let file = encode_file_path(&request.route_key, ELEMENTS_FILE_EXTENSION);
        let mut url = self
            .base
            .join(&format!("/{}/{}", self.routes_dir, file))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if !request.query.is_empty() {
            url.set_query(Some(&request.query));
        }
        Ok(url)
    }
}

impl ElementsTransport for HttpTransport {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Elements, FetchError>> {
        let this = self.clone();
        Box::pin(async move {
            let url = this.request_url(&request)?;
            let skip = serde_json::to_string(&request.skip)
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            tracing::debug!(url = %url, skipped = request.skip.len(), "Fetching elements");
            let response = this
                .client
                .get(url)
                .header(SKIP_HEADER, skip)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;
            Ok(this.codec.decode(&body)?)
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base", &self.base.as_str())
            .field("routes_dir", &self.routes_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::JsonCodec;

    fn transport() -> HttpTransport {
        HttpTransport::new(
            Url::parse("http://localhost:3000/").unwrap(),
            "_elements",
            Arc::new(JsonCodec),
        )
    }

    #[test]
    fn test_request_url() {
        let request = FetchRequest {
            route_key: "R/blog/1".into(),
            query: "page=2".into(),
            skip: Vec::new(),
        };
        assert_eq!(
            transport().request_url(&request).unwrap().as_str(),
            "http://localhost:3000/_elements/R/blog/1.txt?page=2"
        );

        let root = FetchRequest {
            route_key: "R/_root".into(),
            query: String::new(),
            skip: Vec::new(),
        };
        assert_eq!(
            transport().request_url(&root).unwrap().as_str(),
            "http://localhost:3000/_elements/R/_root.txt"
        );
    }
}
