//! Elements map subsystem.
//!
//! # Data Flow
//! ```text
//! Component request (encoded route path, query, headers)
//!     → encoding.rs (decode route path)
//!     → entries.rs (route config lookup, skip set, route handler)
//!     → node.rs (slot values + reserved metadata ids)
//!     → codec.rs (bytes on the wire / build artifact)
//! ```
//!
//! # Design Decisions
//! - Elements maps are rebuilt per request and never mutated after return
//! - Reserved ids are constants shared by server and client
//! - The codec is pluggable; JSON is the default

pub mod codec;
pub mod encoding;
pub mod entries;
pub mod node;

pub use codec::{CodecError, ElementsCodec, JsonCodec};
pub use encoding::{
    decode_file_path, decode_route_path, encode_file_path, encode_route_path, EncodingError,
    ELEMENTS_FILE_EXTENSION, ROUTE_PATH_PREFIX,
};
pub use entries::{EntriesError, EntriesManager, HandledRoute, RouteHandler};
pub use node::{
    route_slot_id, Elements, Node, RouteMeta, SlotValue, HAS404_ID, IS_STATIC_ID,
    RETURN_VALUE_ID, ROOT_ID, ROUTE_ID, ROUTE_SLOT_ID_PREFIX, SKIP_HEADER,
};
