//! SQLite storage implementation.
//!
//! A file-based storage backend using SQLite. Good for:
//! - Local development
//! - Single-machine crawls
//! - Testing with persistent data
//!
//! Selector and text lists are stored as JSON text columns. Ids are UUID
//! strings and timestamps RFC 3339 strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{ParserError, Result};
use crate::traits::store::{ContentStore, RecordStore, SchemaStore};
use crate::types::{
    ContentId, NewParsedContent, NewWorkItem, PageSchema, ParsedContent, RecordId, RecordStatus,
    SchemaId, StatusCounts, WorkItem,
};

fn db_err(e: sqlx::Error) -> ParserError {
    ParserError::storage(e)
}

/// SQLite-backed schema, record and content store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite://quake-parser.db?mode=rwc` - File-based, create if missing
    /// - `sqlite::memory:` - Use [`SqliteStore::in_memory`] instead
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Every connection to `:memory:` opens a separate database, so the pool
    /// holds exactly one connection and never recycles it.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS page_schemas (
                id TEXT PRIMARY KEY,
                domain TEXT NOT NULL UNIQUE,
                main_text_selectors TEXT NOT NULL DEFAULT '[]',
                date_selector TEXT,
                is_valid INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS search_results (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                site_filter TEXT,
                status TEXT NOT NULL,
                html_storage_path TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_search_results_status ON search_results(status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS parsed_content (
                id TEXT PRIMARY KEY,
                search_result_id TEXT NOT NULL,
                url TEXT NOT NULL,
                main_text TEXT NOT NULL,
                date TEXT,
                schema_id TEXT NOT NULL,
                parsed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_parsed_content_record ON parsed_content(search_result_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| ParserError::storage(format!("Invalid id {}: {}", raw, e)))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| ParserError::storage(format!("Invalid date: {}", e)))?
        .with_timezone(&Utc))
}

fn parse_list(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| ParserError::storage(format!("Invalid list JSON: {}", e)))
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct SchemaRow {
    id: String,
    domain: String,
    main_text_selectors: String,
    date_selector: Option<String>,
    is_valid: bool,
    created_at: String,
    updated_at: String,
}

impl SchemaRow {
    fn into_schema(self) -> Result<PageSchema> {
        Ok(PageSchema {
            domain: self.domain,
            main_text_selectors: parse_list(&self.main_text_selectors)?,
            date_selector: self.date_selector,
            is_valid: self.is_valid,
            id: Some(SchemaId(parse_uuid(&self.id)?)),
            created_at: Some(parse_time(&self.created_at)?),
            updated_at: Some(parse_time(&self.updated_at)?),
        })
    }
}

#[derive(Debug, FromRow)]
struct WorkItemRow {
    id: String,
    query: String,
    link: String,
    title: String,
    site_filter: Option<String>,
    status: String,
    html_storage_path: Option<String>,
}

impl WorkItemRow {
    fn into_item(self) -> Result<WorkItem> {
        Ok(WorkItem {
            id: RecordId(parse_uuid(&self.id)?),
            query: self.query,
            link: self.link,
            title: self.title,
            site_filter: self.site_filter,
            status: self.status.parse().map_err(ParserError::storage)?,
            html_storage_path: self.html_storage_path,
        })
    }
}

#[derive(Debug, FromRow)]
struct ContentRow {
    id: String,
    search_result_id: String,
    url: String,
    main_text: String,
    date: Option<String>,
    schema_id: String,
    parsed_at: String,
}

impl ContentRow {
    fn into_content(self) -> Result<ParsedContent> {
        Ok(ParsedContent {
            id: ContentId(parse_uuid(&self.id)?),
            search_result_id: RecordId(parse_uuid(&self.search_result_id)?),
            url: self.url,
            main_text: parse_list(&self.main_text)?,
            date: self.date,
            schema_id: SchemaId(parse_uuid(&self.schema_id)?),
            parsed_at: parse_time(&self.parsed_at)?,
        })
    }
}

const WORK_ITEM_COLUMNS: &str = "id, query, link, title, site_filter, status, html_storage_path";

#[async_trait]
impl SchemaStore for SqliteStore {
    async fn get_by_domain(&self, domain: &str) -> Result<Option<PageSchema>> {
        let row = sqlx::query_as::<_, SchemaRow>(
            "SELECT id, domain, main_text_selectors, date_selector, is_valid, created_at, updated_at FROM page_schemas WHERE domain = ?",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SchemaRow::into_schema).transpose()
    }

    async fn upsert(&self, schema: &PageSchema) -> Result<SchemaId> {
        let selectors = serde_json::to_string(&schema.main_text_selectors)?;
        let now = Utc::now().to_rfc3339();

        // A single statement, so concurrent writers of one domain cannot
        // create two rows.
        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO page_schemas (id, domain, main_text_selectors, date_selector, is_valid, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(domain) DO UPDATE SET
                main_text_selectors = excluded.main_text_selectors,
                date_selector = excluded.date_selector,
                is_valid = excluded.is_valid,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(SchemaId::new().to_string())
        .bind(&schema.domain)
        .bind(&selectors)
        .bind(&schema.date_selector)
        .bind(schema.is_valid)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(SchemaId(parse_uuid(&id)?))
    }

    async fn delete(&self, id: SchemaId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM page_schemas WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_items(&self, items: &[NewWorkItem]) -> Result<Vec<RecordId>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut ids = Vec::new();

        for item in items {
            let id = RecordId::new();
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO search_results (id, query, link, title, site_filter, status, html_storage_path)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id.to_string())
            .bind(&item.query)
            .bind(&item.link)
            .bind(&item.title)
            .bind(&item.site_filter)
            .bind(item.status.as_str())
            .bind(&item.html_storage_path)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() > 0 {
                ids.push(id);
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn get_item(&self, id: RecordId) -> Result<Option<WorkItem>> {
        let row = sqlx::query_as::<_, WorkItemRow>(&format!(
            "SELECT {} FROM search_results WHERE id = ?",
            WORK_ITEM_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(WorkItemRow::into_item).transpose()
    }

    async fn link_exists(&self, link: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM search_results WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(found.is_some())
    }

    async fn list_by_status(
        &self,
        status: RecordStatus,
        limit: Option<usize>,
    ) -> Result<Vec<WorkItem>> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map(|n| n as i64).unwrap_or(-1);

        let rows = sqlx::query_as::<_, WorkItemRow>(&format!(
            "SELECT {} FROM search_results WHERE status = ? ORDER BY rowid LIMIT ?",
            WORK_ITEM_COLUMNS
        ))
        .bind(status.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(WorkItemRow::into_item).collect()
    }

    async fn update_status(&self, id: RecordId, status: RecordStatus) -> Result<Option<WorkItem>> {
        let row = sqlx::query_as::<_, WorkItemRow>(&format!(
            "UPDATE search_results SET status = ? WHERE id = ? RETURNING {}",
            WORK_ITEM_COLUMNS
        ))
        .bind(status.as_str())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(WorkItemRow::into_item).transpose()
    }

    async fn mark_downloaded(
        &self,
        id: RecordId,
        html_storage_path: &str,
    ) -> Result<Option<WorkItem>> {
        let row = sqlx::query_as::<_, WorkItemRow>(&format!(
            "UPDATE search_results SET status = ?, html_storage_path = ? WHERE id = ? RETURNING {}",
            WORK_ITEM_COLUMNS
        ))
        .bind(RecordStatus::Downloaded.as_str())
        .bind(html_storage_path)
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(WorkItemRow::into_item).transpose()
    }

    async fn count_by_status(&self) -> Result<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM search_results GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            let status: RecordStatus = status.parse().map_err(ParserError::storage)?;
            counts.add(status, n as usize);
        }
        Ok(counts)
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn insert_content(&self, content: &NewParsedContent) -> Result<ContentId> {
        let id = ContentId::new();
        let main_text = serde_json::to_string(&content.main_text)?;

        sqlx::query(
            r#"
            INSERT INTO parsed_content (id, search_result_id, url, main_text, date, schema_id, parsed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(content.search_result_id.to_string())
        .bind(&content.url)
        .bind(&main_text)
        .bind(&content.date)
        .bind(content.schema_id.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    async fn content_for_record(&self, id: RecordId) -> Result<Vec<ParsedContent>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            "SELECT id, search_result_id, url, main_text, date, schema_id, parsed_at FROM parsed_content WHERE search_result_id = ? ORDER BY rowid",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(ContentRow::into_content).collect()
    }
}
