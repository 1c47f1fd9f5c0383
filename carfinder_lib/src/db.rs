//! SQLite store of persisted listings. Its primary key is the dedup set.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::listing::NormalizedListing;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a test-and-insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The identifier was new and the row was written.
    Inserted,
    /// A row with this identifier already existed; nothing was written.
    Ignored,
}

pub struct Db {
    conn: Connection,
}

const SCHEMA_VERSION: i32 = 1;

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Creates the tables if missing and stamps the schema version.
    pub fn init(&self) -> Result<(), DbError> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        if version < SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }

    /// Inserts `listing` unless its identifier is already stored. The check
    /// and the write are one statement, so concurrent runs cannot both win.
    pub fn insert_if_new(&self, listing: &NormalizedListing) -> Result<InsertOutcome, DbError> {
        insert_row(&self.conn, listing)
    }

    /// Like [`Db::insert_if_new`], but a newly inserted row stays uncommitted
    /// until `on_insert` succeeds. An error from `on_insert` rolls it back.
    pub fn insert_if_new_with<E, F>(
        &mut self,
        listing: &NormalizedListing,
        on_insert: F,
    ) -> Result<InsertOutcome, E>
    where
        E: From<DbError>,
        F: FnOnce() -> Result<(), E>,
    {
        let tx = self.conn.transaction().map_err(DbError::from)?;
        let outcome = insert_row(&tx, listing)?;
        if outcome == InsertOutcome::Inserted {
            on_insert()?;
        }
        tx.commit().map_err(DbError::from)?;
        Ok(outcome)
    }

    pub fn contains(&self, id: &str) -> Result<bool, DbError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM listings WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn listing_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<NormalizedListing>, DbError> {
        self.conn
            .query_row(
                "SELECT id, title, price, location, posted_at, region, url, inserted_at
                 FROM listings WHERE id = ?1",
                params![id],
                |row| {
                    Ok(NormalizedListing {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        price: row.get(2)?,
                        location: row.get(3)?,
                        posted_at: row.get(4)?,
                        region: row.get(5)?,
                        url: row.get(6)?,
                        inserted_at: row.get(7)?,
                    })
                },
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, DbError> {
        self.conn
            .query_row(
                "SELECT value FROM ingest_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(DbError::from)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO ingest_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

fn insert_row(conn: &Connection, listing: &NormalizedListing) -> Result<InsertOutcome, DbError> {
    let changed = conn.execute(
        "INSERT INTO listings (id, title, url, price, location, posted_at, region, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO NOTHING",
        params![
            listing.id,
            listing.title,
            listing.url,
            listing.price,
            listing.location,
            listing.posted_at,
            listing.region,
            listing.inserted_at,
        ],
    )?;
    Ok(if changed == 1 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::Ignored
    })
}
