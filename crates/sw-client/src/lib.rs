pub mod backend;
pub mod batch;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod progress;
pub mod queue;
pub mod readiness;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{GenBackend, HttpBackend, SubmitRequest};
pub use config::ClientConfig;
pub use controller::QueueController;
pub use error::{QueueError, RemoteError};
pub use events::{AppEvent, EventSender};
