//! Data models for DailyPicTrack entities.
//!
//! - `Image`: one uploaded photo log entry with its documentation and tags
//! - `ImagesResponse`: the `GET /images/my-images` envelope

pub mod image;

pub use image::{Image, ImagesResponse};
