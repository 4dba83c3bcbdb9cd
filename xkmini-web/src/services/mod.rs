//! Services behind the HTTP handlers

pub mod comic_lookup;
pub mod upstream_client;

pub use comic_lookup::{
    clamp_id, parse_requested_id, ComicLookup, LookupError, Navigation, RequestedId,
};
pub use upstream_client::{ComicSource, UpstreamClient, UpstreamError};
