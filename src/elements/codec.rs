//! Wire codec for elements maps.

use axum::body::Bytes;
use thiserror::Error;

use crate::elements::Elements;

/// Errors raised while encoding or decoding an elements map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Failed to encode elements: {0}")]
    Encode(String),

    #[error("Failed to decode elements: {0}")]
    Decode(String),
}

/// Serializes a tree of slots to bytes and back into the same tree.
pub trait ElementsCodec: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn encode(&self, elements: &Elements) -> Result<Bytes, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Elements, CodecError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ElementsCodec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, elements: &Elements) -> Result<Bytes, CodecError> {
        serde_json::to_vec(elements)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Elements, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Node, RouteMeta, SlotValue};

    #[test]
    fn test_json_codec_preserves_tree() {
        let mut elements = Elements::new();
        elements.insert(
            "root".into(),
            SlotValue::Node(Node::element("div").attr("class", "app").child(Node::Children)),
        );
        elements.insert("ROUTE".into(), SlotValue::Route(RouteMeta("/".into(), String::new())));
        elements.insert("IS_STATIC".into(), SlotValue::Flag(true));

        let codec = JsonCodec;
        let bytes = codec.encode(&elements).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), elements);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(JsonCodec.decode(b"not json"), Err(CodecError::Decode(_))));
    }
}
