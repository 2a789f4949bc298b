//! Typed wrappers over the REST collections.

pub mod customers;
pub mod dogs;
pub mod heats;
pub mod leads;
pub mod litters;
pub mod messages;
pub mod photos;
pub mod puppies;
pub mod resource;
pub mod soft;

pub use customers::{Customer, CustomerApi, SyncReport, SyncWorker};
pub use dogs::Dog;
pub use heats::Heat;
pub use leads::{Lead, LeadStatus};
pub use litters::Litter;
pub use messages::{Conversation, Message, NewConversation};
pub use photos::{EntityType, Photo, PhotoMeta, PhotoUpload};
pub use puppies::Puppy;
pub use resource::Resource;
