//! Order domain types shared by server and clients

pub mod status;
pub mod types;

pub use status::{OrderStatus, TRANSITIONS, UnknownStatus};
pub use types::*;
