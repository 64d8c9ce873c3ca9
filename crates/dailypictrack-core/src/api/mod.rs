//! REST API client module for the DailyPicTrack service.
//!
//! Every request goes through `ApiClient`, which attaches the stored
//! session token as a bearer header and tears the session down when the
//! server answers 401. Teardown is announced as a `SessionEvent` rather
//! than by navigating directly.

pub mod client;
pub mod error;
pub mod events;

pub use client::{ApiClient, ClientConfig, LOGIN_PATH};
pub use error::{ApiError, Result};
pub use events::{SessionEvent, SessionEvents};
