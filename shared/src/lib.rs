//! Shared types for the Tabletop workspace
//!
//! Common types used by tabletop-server and tabletop-client: error codes,
//! order/menu/table models, projection views, bus topics, messages and the
//! wire frame codec.

pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod projection;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, PublishError, Publisher, Topics};
