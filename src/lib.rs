//! Infinite-scroll list engine for virtualized grids.
//!
//! A list is a growing, ordered collection of records fetched one page at a
//! time from a [`PageProvider`](list::PageProvider). The engine decides when
//! to fetch, keeps header/footer sentinel rows in place, detects the end of
//! data, sorts in place once everything is loaded and can persist its whole
//! state in a session-scoped cache so navigating away and back restores the
//! same rows and scroll position.
//!
//! ```no_run
//! use std::sync::Arc;
//! use infinilist::config::Config;
//! use infinilist::context::ListContext;
//! use infinilist::list::InfiniteList;
//! use infinilist::provider::{open_in_memory, seed_customers, SqlitePageProvider};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pool = open_in_memory().await?;
//! seed_customers(&pool, 100).await?;
//! let provider = Arc::new(SqlitePageProvider::customers(pool)?);
//!
//! let context = ListContext::from_config(Config::default());
//! let list = InfiniteList::mount(&context, context.options("customers"), provider, "/customers");
//! if let Some(load) = list.load_more_items() {
//!     load.await?;
//! }
//! assert_eq!(list.len(), 20);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod list;
pub mod provider;
pub mod util;
