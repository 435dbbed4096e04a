//! Data models
//!
//! Shared between tabletop-server and clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY, snowflake-generated).

pub mod assignment;
pub mod dining_table;
pub mod menu;
pub mod staff;

// Re-exports
pub use assignment::*;
pub use dining_table::*;
pub use menu::*;
pub use staff::*;
