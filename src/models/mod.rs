//! Wire-level data models for the image upload service.
//!
//! Nothing here is persisted: an [`image::ImageRecord`] is re-derived from
//! the upload directory on every read, and [`response::ApiResponse`] is the
//! uniform JSON envelope every non-binary endpoint returns.

pub mod image;
pub mod response;
