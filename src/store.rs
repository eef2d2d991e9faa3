use std::{path::Path, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Connection, SqliteConnection,
};

use crate::model::database::DbPage;

pub const BY_NAME: &str = "by_name";

pub const BY_ID: &str = "by_id";

const CREATE_BY_NAME: &str =
    "CREATE TABLE IF NOT EXISTS by_name (key TEXT PRIMARY KEY NOT NULL, value BLOB NOT NULL) WITHOUT ROWID";
const CREATE_BY_ID: &str =
    "CREATE TABLE IF NOT EXISTS by_id (key TEXT PRIMARY KEY NOT NULL, value BLOB NOT NULL) WITHOUT ROWID";

const GET_BY_NAME: &str = "SELECT value FROM by_name WHERE key = ?1";
const GET_BY_ID: &str = "SELECT value FROM by_id WHERE key = ?1";

const PUT_BY_NAME: &str = "INSERT INTO by_name (key, value) VALUES (?1, ?2) \
                           ON CONFLICT (key) DO UPDATE SET value = excluded.value";
const CLAIM_BY_ID: &str = "INSERT INTO by_id (key, value) VALUES (?1, ?2) ON CONFLICT (key) DO NOTHING";

const BUCKET_EXISTS: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("could not encode or decode page: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("could not create database file: {0}")]
    Io(#[from] std::io::Error),

    #[error("bucket '{0}' does not exist")]
    MissingBucket(&'static str),

    #[error("page name '{0}' belongs to another page")]
    NameTaken(String),

    #[error("page id already belongs to another page")]
    IdTaken,

    #[error("id bucket holds a name that is not valid UTF-8")]
    CorruptName,
}

#[derive(Clone, Debug)]
pub struct PageStore {
    pool: SqlitePool,
}

impl PageStore {
    /// `open_timeout` bounds the startup migration only. Requests wait up to
    /// `busy_timeout` for the write lock.
    pub async fn open(
        path: &Path,
        open_timeout: Duration,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        create_private(path).await?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let mut conn =
            SqliteConnection::connect_with(&options.clone().busy_timeout(open_timeout)).await?;
        migrate(&mut conn).await?;
        conn.close().await?;

        let pool = SqlitePoolOptions::new()
            .acquire_timeout(busy_timeout)
            .connect_with(options.busy_timeout(busy_timeout))
            .await?;

        let store = PageStore { pool };
        store.check_buckets().await?;

        tracing::info!(path = %path.display(), "opened page store");
        Ok(store)
    }

    async fn check_buckets(&self) -> Result<(), StoreError> {
        for bucket in [BY_NAME, BY_ID] {
            let found: Option<String> = sqlx::query_scalar(BUCKET_EXISTS)
                .bind(bucket)
                .fetch_optional(&self.pool)
                .await?;

            if found.is_none() {
                return Err(StoreError::MissingBucket(bucket));
            }
        }

        Ok(())
    }

    // never rebinds a name to another id, or an id to another name
    pub async fn put(&self, page: &DbPage) -> Result<(), StoreError> {
        let value = serde_json::to_vec(page)?;

        let mut tx = self.pool.begin().await?;

        // write before reading, so the transaction holds the write lock
        // from its first statement
        sqlx::query(CLAIM_BY_ID)
            .bind(&page.id)
            .bind(page.name.as_bytes())
            .execute(&mut *tx)
            .await?;

        let owner = fetch(&mut tx, GET_BY_ID, &page.id).await?;
        if owner.as_deref() != Some(page.name.as_bytes()) {
            return Err(StoreError::IdTaken);
        }

        if let Some(existing) = fetch(&mut tx, GET_BY_NAME, &page.name).await? {
            let existing: DbPage = serde_json::from_slice(&existing)?;
            if existing.id != page.id {
                return Err(StoreError::NameTaken(page.name.clone()));
            }
        }

        sqlx::query(PUT_BY_NAME)
            .bind(&page.name)
            .bind(value)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(name = %page.name, "stored page");
        Ok(())
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<DbPage>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        read_page(&mut conn, name).await
    }

    // both hops read the same snapshot
    pub async fn get_by_id(&self, id: &str) -> Result<Option<DbPage>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(name) = fetch(&mut tx, GET_BY_ID, id).await? else {
            return Ok(None);
        };
        let name = String::from_utf8(name).map_err(|_| StoreError::CorruptName)?;

        let page = read_page(&mut tx, &name).await?;
        tx.commit().await?;
        Ok(page)
    }
}

async fn migrate(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let mut tx = conn.begin().await?;
    sqlx::query(CREATE_BY_NAME).execute(&mut *tx).await?;
    sqlx::query(CREATE_BY_ID).execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(())
}

async fn read_page(conn: &mut SqliteConnection, name: &str) -> Result<Option<DbPage>, StoreError> {
    match fetch(conn, GET_BY_NAME, name).await? {
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        None => Ok(None),
    }
}

async fn fetch(
    conn: &mut SqliteConnection,
    query: &'static str,
    key: &str,
) -> Result<Option<Vec<u8>>, StoreError> {
    Ok(sqlx::query_scalar(query)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?)
}

async fn create_private(path: &Path) -> Result<(), StoreError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(());
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await?;

    Ok(())
}

#[cfg(test)]
impl PageStore {
    pub(crate) async fn open_temp() -> (tempfile::TempDir, PageStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = PageStore::open(
            &dir.path().join("publish.db"),
            Duration::from_secs(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        (dir, store)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
