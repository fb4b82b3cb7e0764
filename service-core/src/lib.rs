//! service-core: shared infrastructure for the store workspace.
pub mod config;
pub mod error;
pub mod jobs;
pub mod observability;

pub use axum;
pub use mongodb;
pub use serde;
pub use serde_json;
pub use tracing;
