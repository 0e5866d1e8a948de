//! rigsync-api: Async client for the production REST API and push channel.

pub mod client;
pub mod error;
pub mod push;
pub mod transport;
pub mod types;

pub use client::RestClient;
pub use error::Error;
pub use push::{PushChannel, PushMessage, ReconnectConfig};
pub use transport::TransportConfig;
pub use types::{ConflictBody, EntityRecord, NoteEntryRecord, PushAction, PushFrame, UpdateResponse};
