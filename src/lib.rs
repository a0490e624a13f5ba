//! Datatag: Fire-and-forget Analytics Beacon
//!
//! Sends analytics events to a collection endpoint as GET requests, tagging each
//! one with a persistent client id, a rolling session id, optional user and Braze
//! ids, and an optional A/B experiment id.

pub mod cli;
pub mod client_id;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod identifier;
pub mod logging;
pub mod platform;
pub mod session;
pub mod store;
pub mod transport;

pub use config::{ConfigLoader, Environment, HttpConfig, TaggingConfig};
pub use dispatcher::DataTaggingManager;
pub use error::{ConfigError, StorageError, TaggingError, TransportError};
pub use event::AnalyticsEvent;
pub use platform::{Clock, Platform, RandomSource};
pub use store::{IdentityStore, KeyValueStore, MemoryStore, SledStore};
pub use transport::{HttpTransport, Transport};
