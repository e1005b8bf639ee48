//! Async client for the process-mining computation backend.
//!
//! The backend runs discovery tasks asynchronously: a task endpoint is
//! polled on a fixed period and answers with a status plus an optional
//! preliminary or final document. [`TaskPoller`] owns that loop and exposes
//! the task lifecycle as a [`TaskState`] machine; [`document_poller`] wires
//! it to the DFM discovery endpoint with fail-closed document validation
//! from `flowscope-core`.

pub mod api;
pub mod error;
pub mod poller;

// Re-export commonly used types
pub use api::{request_url, DfmQuery};
pub use error::ClientError;
pub use poller::{
    document_poller, transition, PollEvent, TaskPoller, TaskResponse, TaskState, TaskStatus,
    DEFAULT_POLL_PERIOD,
};
