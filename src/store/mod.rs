//! Client-side state shared across commands: auth, cached collections and
//! conversations.

pub mod auth;
pub mod collection;
pub mod dogs;
pub mod leads;
pub mod messages;
pub mod poller;

pub use auth::{AuthState, AuthStore, User};
pub use collection::CollectionStore;
pub use dogs::DogStore;
pub use leads::LeadStore;
pub use messages::MessageStore;
pub use poller::{MessagePoller, PollEvent, DEFAULT_POLL_INTERVAL};
