//! Core library for DailyPicTrack, a personal photo log client.
//!
//! This crate contains the session handling and API pipeline plus the
//! presentation logic a front end needs:
//!
//! - `auth`: the token store and session inspector
//! - `api`: HTTP client with bearer-token and 401 interception
//! - `models`: API data types
//! - `navigation`: routes and a navigator driven by session events
//! - `forms`, `upload`, `gallery`, `dashboard`: view-level logic
//! - `config`: persisted configuration and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod forms;
pub mod gallery;
pub mod models;
pub mod navigation;
pub mod upload;
pub mod utils;

pub use api::{ApiClient, ApiError, ClientConfig, SessionEvent};
pub use auth::{Identity, SessionInspector, SessionState, TokenStore};
pub use config::Config;
pub use navigation::{Navigator, Route};
