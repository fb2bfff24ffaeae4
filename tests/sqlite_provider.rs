//! End-to-end paging of a seeded SQLite table through a mounted list.
//!
//! Each test opens its own in-memory database.

use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;

use infinilist::config::Config;
use infinilist::context::ListContext;
use infinilist::list::{DisplayType, InfiniteList, ListHandle, ListOptions, SortOutcome};
use infinilist::provider::{open_in_memory, seed_customers, SqlitePageProvider};

async fn customers_list(rows: usize, options: ListOptions) -> InfiniteList {
    let pool = open_in_memory().await.unwrap();
    seed_customers(&pool, rows).await.unwrap();
    let provider = Arc::new(SqlitePageProvider::customers(pool).unwrap());
    let context = ListContext::from_config(Config::default());
    InfiniteList::mount(&context, options, provider, "/customers")
}

fn options() -> ListOptions {
    ListOptions {
        page_size: 20,
        has_header: true,
        has_footer: true,
        ..ListOptions::default()
    }
}

fn first_id(list: &InfiniteList) -> Option<i64> {
    list.get_item(1)
        .and_then(|item| item.get("id").and_then(Value::as_i64))
}

#[tokio::test]
async fn test_table_pages_to_completion() {
    let list = customers_list(45, options()).await;

    list.load_more_items().unwrap().await.unwrap();
    assert_eq!(list.records(), Some(45));
    assert_eq!(list.layouts().map(|l| l.len()), Some(6));

    while let Some(load) = list.load_more_items() {
        load.await.unwrap();
    }

    assert!(list.is_loaded());
    assert_eq!(list.page(), 3);
    assert_eq!(list.records(), Some(45));
    assert_eq!(list.len(), 47);
    assert!(list.get_item(46).unwrap().is_footer());
}

#[tokio::test]
async fn test_partial_sort_refetches_in_database_order() {
    let list = customers_list(45, options()).await;
    list.load_more_items().unwrap().await.unwrap();
    assert_eq!(first_id(&list), Some(1));

    let outcome = list.sort("id", DisplayType::Number, -1).unwrap();
    assert_eq!(outcome, SortOutcome::Refetch);

    list.load_more_items().unwrap().await.unwrap();
    assert_eq!(first_id(&list), Some(45));
    assert_eq!(list.len(), 21);
}

#[tokio::test]
async fn test_full_sort_reorders_locally() {
    let list = customers_list(15, options()).await;
    list.load_more_items().unwrap().await.unwrap();
    assert!(list.is_loaded());

    let outcome = list.sort("id", DisplayType::Number, -1).unwrap();

    assert_eq!(outcome, SortOutcome::InPlace);
    assert_eq!(first_id(&list), Some(15));
    assert!(list.get_item(0).unwrap().is_header());
    assert!(list.get_item(16).unwrap().is_footer());
}
