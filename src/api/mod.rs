//! Access layer for the kennel REST API.
//!
//! - `url`: endpoint normalization
//! - `missing`: endpoints known to answer 404
//! - `sanitize`: strips joined/computed fields from write payloads
//! - `client`: GET/POST/PUT/DELETE/upload wrappers returning [`ApiResponse`]
//! - `interceptor`: static fallbacks for optional endpoints

pub mod client;
pub mod interceptor;
pub mod missing;
pub mod notify;
pub mod sanitize;
pub mod transport;
pub mod types;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiClient, ApiClientBuilder};
pub use interceptor::{FallbackTable, FallbackTransport};
pub use missing::MissingEndpoints;
pub use notify::{LogNotifier, Notifier, RecordingNotifier, Severity};
pub use sanitize::{sanitize_api_data, NON_SCHEMA_FIELDS};
pub use transport::{FilePart, HttpRequest, HttpResponse, Method, MultipartForm, Transport};
pub use types::{ApiError, ApiResponse, DataSource};
pub use self::url::format_api_url;
