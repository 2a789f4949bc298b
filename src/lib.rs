//! Client for the kennel breeder-management REST API.
//!
//! [`api`] holds the request layer (URL handling, sanitizing, verb wrappers,
//! fallbacks for optional endpoints), [`domain`] the typed per-resource
//! calls, [`store`] the client-side state built on top of them and
//! [`storage`] the local key-value store behind the session and the offline
//! customer copy.

pub mod api;
pub mod config;
pub mod domain;
pub mod logging;
pub mod session;
pub mod storage;
pub mod store;

pub use api::{ApiClient, ApiError, ApiResponse};
pub use config::Config;
pub use session::Session;
