//! Image payload helpers: media-type allow-list, base64 encoding, path handling.

pub mod encode;
pub mod media_type;
pub mod path_mime;

pub use encode::{EncodedPayload, MAX_SOURCE_BYTES, encode};
pub use media_type::{MediaType, classify_media_type, sniff_media_type};
