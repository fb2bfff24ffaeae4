use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::list::{DisplayType, Item, LayoutDescriptor, Page, PageProvider, PageRequest, ProviderError};

/// Rows per INSERT statement when seeding.
const SEED_BATCH: usize = 100;

// ============================================================================
// Columns
// ============================================================================

/// One exposed column of an entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub label: String,
    pub display_type: DisplayType,
    pub width: Option<u16>,
}

impl Column {
    pub fn new(name: impl Into<String>, label: impl Into<String>, display_type: DisplayType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            display_type,
            width: None,
        }
    }

    pub fn with_width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    fn layout(&self) -> LayoutDescriptor {
        let layout = LayoutDescriptor::new(&self.name, &self.label).with_type(self.display_type);
        match self.width {
            Some(width) => layout.with_width(width),
            None => layout,
        }
    }
}

/// Table and column names are interpolated into SQL, so only plain
/// identifiers are accepted.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// Provider
// ============================================================================

/// Pages an entity table with `LIMIT`/`OFFSET`.
///
/// The order index selects a column by 1-based position in `columns`; a
/// negative index sorts that column descending. Zero, `None` or an index past
/// the last column falls back to insertion order. Page 1 also carries the
/// total row count and the column layouts.
#[derive(Debug, Clone)]
pub struct SqlitePageProvider {
    pool: SqlitePool,
    table: String,
    columns: Vec<Column>,
}

impl SqlitePageProvider {
    pub fn new(
        pool: SqlitePool,
        table: impl Into<String>,
        columns: Vec<Column>,
    ) -> Result<Self, ProviderError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(ProviderError::Other(format!("invalid table name '{table}'")));
        }
        if columns.is_empty() {
            return Err(ProviderError::Other(format!("table '{table}' exposes no columns")));
        }
        if let Some(bad) = columns.iter().find(|c| !is_identifier(&c.name)) {
            return Err(ProviderError::Other(format!("invalid column name '{}'", bad.name)));
        }
        Ok(Self {
            pool,
            table,
            columns,
        })
    }

    /// Provider over the table created by [`seed_customers`].
    pub fn customers(pool: SqlitePool) -> Result<Self, ProviderError> {
        Self::new(pool, "customers", customer_columns())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn order_clause(&self, order_index: Option<i32>) -> String {
        let Some(index) = order_index.filter(|i| *i != 0) else {
            return " ORDER BY rowid".to_string();
        };
        let position = index.unsigned_abs() as usize;
        match self.columns.get(position - 1) {
            Some(column) => {
                let direction = if index < 0 { "DESC" } else { "ASC" };
                format!(
                    " ORDER BY \"{}\" {direction}, rowid {direction}",
                    column.name
                )
            }
            None => {
                tracing::debug!(order_index = index, table = %self.table, "Order index out of range, using insertion order");
                " ORDER BY rowid".to_string()
            }
        }
    }

    fn select_sql(&self, order_index: Option<i32>) -> String {
        let pairs = self
            .columns
            .iter()
            .map(|c| format!("'{0}', \"{0}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT json_object({pairs}) FROM \"{}\"{} LIMIT ? OFFSET ?",
            self.table,
            self.order_clause(order_index)
        )
    }

    async fn count(&self) -> Result<u64, ProviderError> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM \"{}\"", self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl PageProvider for SqlitePageProvider {
    async fn load_items(&self, request: PageRequest) -> Result<Page, ProviderError> {
        let sql = self.select_sql(request.order_index);
        let offset = i64::try_from(request.offset())
            .map_err(|_| ProviderError::Other(format!("page {} out of range", request.page)))?;

        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(i64::from(request.page_size))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(|(json,)| serde_json::from_str::<Map<String, Value>>(&json).map(Item::from_fields))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            table = %self.table,
            page = request.page,
            rows = items.len(),
            "Loaded rows from SQLite"
        );

        let mut page = Page::new(items);
        if request.page == 1 {
            page = page
                .with_records(self.count().await?)
                .with_layouts(self.columns.iter().map(Column::layout).collect());
        }
        Ok(page)
    }
}

// ============================================================================
// Demo Data
// ============================================================================

const FIRST_NAMES: [&str; 12] = [
    "Ada", "Bruno", "Chiara", "Dmitri", "Elif", "Farah", "Gustav", "Hana", "Ines", "Jonas", "Keiko",
    "Luca",
];
const LAST_NAMES: [&str; 10] = [
    "Almeida", "Brandt", "Costa", "Dubois", "Eriksen", "Fischer", "Greco", "Horvat", "Ivanova",
    "Jensen",
];
const CITIES: [&str; 8] = [
    "Lisbon", "Berlin", "Milan", "Lyon", "Oslo", "Vienna", "Zagreb", "Aarhus",
];

/// Columns of the demo `customers` table.
pub fn customer_columns() -> Vec<Column> {
    vec![
        Column::new("id", "#", DisplayType::Number).with_width(6),
        Column::new("name", "Name", DisplayType::Text).with_width(22),
        Column::new("city", "City", DisplayType::Text).with_width(10),
        Column::new("balance", "Balance", DisplayType::Money).with_width(12),
        Column::new("joined", "Joined", DisplayType::Date).with_width(12),
        Column::new("active", "Active", DisplayType::Boolean).with_width(8),
    ]
}

/// Open a private in-memory database.
///
/// Every SQLite `:memory:` connection is its own database, so the pool is
/// pinned to a single connection that is never recycled.
pub async fn open_in_memory() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Create the `customers` table and fill it with `count` deterministic rows.
pub async fn seed_customers(pool: &SqlitePool, count: usize) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            city TEXT NOT NULL,
            balance REAL NOT NULL,
            joined TEXT NOT NULL,
            active INTEGER NOT NULL
        )
    "#,
    )
    .execute(pool)
    .await?;

    let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let mut tx = pool.begin().await?;

    for start in (0..count).step_by(SEED_BATCH) {
        let end = (start + SEED_BATCH).min(count);
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO customers (id, name, city, balance, joined, active) ");
        builder.push_values(start..end, |mut b, i| {
            let name = format!(
                "{} {}",
                FIRST_NAMES[i % FIRST_NAMES.len()],
                LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()]
            );
            let balance = ((i * 7919) % 100_000) as f64 / 100.0 - 250.0;
            let joined = epoch
                .checked_add_days(Days::new(((i * 37) % 1500) as u64))
                .unwrap_or(epoch)
                .format("%Y-%m-%d")
                .to_string();
            b.push_bind(i as i64 + 1)
                .push_bind(name)
                .push_bind(CITIES[(i * 5) % CITIES.len()])
                .push_bind(balance)
                .push_bind(joined)
                .push_bind(i % 3 != 0);
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::info!(rows = count, "Seeded customers table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn provider(rows: usize) -> SqlitePageProvider {
        let pool = open_in_memory().await.unwrap();
        seed_customers(&pool, rows).await.unwrap();
        SqlitePageProvider::customers(pool).unwrap()
    }

    fn request(page: u32, page_size: u32, order_index: Option<i32>) -> PageRequest {
        PageRequest {
            page,
            page_size,
            order_index,
        }
    }

    fn ids(page: &Page) -> Vec<i64> {
        page.items
            .iter()
            .filter_map(|item| item.get("id").and_then(Value::as_i64))
            .collect()
    }

    #[tokio::test]
    async fn test_first_page_carries_count_and_layouts() {
        let provider = provider(45).await;
        let page = provider.load_items(request(1, 20, None)).await.unwrap();

        assert_eq!(page.items.len(), 20);
        assert_eq!(page.records, Some(45));
        let layouts = page.layouts.as_ref().unwrap();
        assert_eq!(layouts.len(), 6);
        assert_eq!(layouts[3].display_type, DisplayType::Money);
        assert_eq!(&ids(&page)[..3], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_later_pages_omit_metadata() {
        let provider = provider(45).await;
        let page = provider.load_items(request(2, 20, None)).await.unwrap();

        assert_eq!(ids(&page).first(), Some(&21));
        assert!(page.records.is_none());
        assert!(page.layouts.is_none());
    }

    #[tokio::test]
    async fn test_last_page_is_short() {
        let provider = provider(45).await;
        let page = provider.load_items(request(3, 20, None)).await.unwrap();
        assert_eq!(page.items.len(), 5);

        let past_end = provider.load_items(request(4, 20, None)).await.unwrap();
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn test_negative_order_index_sorts_descending() {
        let provider = provider(30).await;
        let page = provider.load_items(request(1, 5, Some(-1))).await.unwrap();
        assert_eq!(ids(&page), vec![30, 29, 28, 27, 26]);
    }

    #[tokio::test]
    async fn test_order_index_selects_column() {
        let provider = provider(30).await;
        let page = provider.load_items(request(1, 30, Some(2))).await.unwrap();

        let names: Vec<&str> = page
            .items
            .iter()
            .filter_map(|item| item.get("name").and_then(Value::as_str))
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_out_of_range_order_index_uses_insertion_order() {
        let provider = provider(10).await;
        let page = provider.load_items(request(1, 3, Some(42))).await.unwrap();
        assert_eq!(ids(&page), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_row_fields_decoded() {
        let provider = provider(1).await;
        let page = provider.load_items(request(1, 20, None)).await.unwrap();
        let row = &page.items[0];

        assert_eq!(row.get("id"), Some(&json!(1)));
        assert_eq!(row.get("name"), Some(&json!("Ada Almeida")));
        assert_eq!(row.get("joined"), Some(&json!("2020-01-01")));
        assert_eq!(row.get("active"), Some(&json!(0)));
        assert!(!row.is_sentinel());
    }

    #[tokio::test]
    async fn test_invalid_identifiers_rejected() {
        let pool = open_in_memory().await.unwrap();
        let bad_table = SqlitePageProvider::new(pool.clone(), "customers; DROP", customer_columns());
        assert!(matches!(bad_table, Err(ProviderError::Other(_))));

        let bad_column = SqlitePageProvider::new(
            pool.clone(),
            "customers",
            vec![Column::new("name\"", "Name", DisplayType::Text)],
        );
        assert!(matches!(bad_column, Err(ProviderError::Other(_))));

        let no_columns = SqlitePageProvider::new(pool, "customers", Vec::new());
        assert!(matches!(no_columns, Err(ProviderError::Other(_))));
    }

    #[tokio::test]
    async fn test_missing_table_is_database_error() {
        let pool = open_in_memory().await.unwrap();
        let provider = SqlitePageProvider::customers(pool).unwrap();
        let result = provider.load_items(request(1, 20, None)).await;
        assert!(matches!(result, Err(ProviderError::Database(_))));
    }
}
