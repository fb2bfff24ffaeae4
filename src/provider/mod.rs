//! Reference page providers.
//!
//! - [`sqlite`]: pages a local entity table through sqlx
//! - [`rest`]: pages a remote entity collection over HTTP

pub mod rest;
pub mod sqlite;

pub use rest::RestPageProvider;
pub use sqlite::{customer_columns, open_in_memory, seed_customers, Column, SqlitePageProvider};
