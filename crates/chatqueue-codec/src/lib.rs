//! # ChatQueue Codec
//!
//! Converts between binary image data and the portable data-URL
//! representation queue entries persist. Every operation degrades to
//! `None`/empty instead of failing: callers always have a well-defined
//! "attachment unavailable" path and a single corrupt item never aborts
//! a batch.

pub mod attachment;
pub mod data_url;

pub use attachment::{
    attachment_from_bytes, attachment_from_file, attachment_to_file, collect_image_attachments,
    normalize_attachment,
};
pub use data_url::{decode_data_url, encode_data_url, is_image_mime, sniff_image_mime};
