//! SQLite-backed record table and liked-id set.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ChangeSet, LikedSet, LocalCatalogStore, StoreError};
use crate::catalog::{Ingredient, Record, RecordId, Step};

const RECORD_COLUMNS: &str =
    "id, title, ingredients, steps, owner_id, meal_type, food_type, photo_url, created_at, liked";

/// SQLite store holding both the `records` and `liked_records` tables on
/// one connection.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                ingredients TEXT NOT NULL DEFAULT '[]',
                steps TEXT NOT NULL DEFAULT '[]',
                owner_id TEXT,
                meal_type TEXT,
                food_type TEXT,
                photo_url TEXT,
                created_at TEXT,
                liked INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_records_meal_type ON records(meal_type);
            CREATE INDEX IF NOT EXISTS idx_records_food_type ON records(food_type);

            -- Ids liked by the current user, independent of records
            CREATE TABLE IF NOT EXISTS liked_records (
                record_id INTEGER PRIMARY KEY,
                liked_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<(Record, String, String)> {
        let record = Record {
            id: row.get(0)?,
            title: row.get(1)?,
            ingredients: Vec::new(),
            steps: Vec::new(),
            owner_id: row.get(4)?,
            meal_type: row.get(5)?,
            food_type: row.get(6)?,
            photo_url: row.get(7)?,
            created_at: row.get(8)?,
            liked: row.get::<_, i64>(9)? != 0,
        };
        Ok((record, row.get(2)?, row.get(3)?))
    }

    fn decode_lists(
        (mut record, ingredients, steps): (Record, String, String),
    ) -> Result<Record, StoreError> {
        record.ingredients = serde_json::from_str::<Vec<Ingredient>>(&ingredients)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        record.steps = serde_json::from_str::<Vec<Step>>(&steps)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(record)
    }

    fn encode_lists(record: &Record) -> Result<(String, String), StoreError> {
        let ingredients = serde_json::to_string(&record.ingredients)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let steps = serde_json::to_string(&record.steps)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok((ingredients, steps))
    }

    fn insert_one(conn: &Connection, record: &Record) -> Result<(), StoreError> {
        let (ingredients, steps) = Self::encode_lists(record)?;
        conn.execute(
            &format!("INSERT INTO records ({RECORD_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                record.id,
                &record.title,
                &ingredients,
                &steps,
                &record.owner_id,
                &record.meal_type,
                &record.food_type,
                &record.photo_url,
                &record.created_at,
                record.liked as i64,
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Duplicate(record.id)
            }
            other => db(other),
        })?;
        Ok(())
    }

    fn update_one(conn: &Connection, record: &Record) -> Result<(), StoreError> {
        let (ingredients, steps) = Self::encode_lists(record)?;
        let rows = conn
            .execute(
                "UPDATE records SET title = ?, ingredients = ?, steps = ?, owner_id = ?,
                    meal_type = ?, food_type = ?, photo_url = ?, created_at = ?, liked = ?
                 WHERE id = ?",
                params![
                    &record.title,
                    &ingredients,
                    &steps,
                    &record.owner_id,
                    &record.meal_type,
                    &record.food_type,
                    &record.photo_url,
                    &record.created_at,
                    record.liked as i64,
                    record.id,
                ],
            )
            .map_err(db)?;
        if rows == 0 {
            return Err(StoreError::NotFound(record.id));
        }
        Ok(())
    }

    fn delete_ids(conn: &Connection, ids: &[RecordId]) -> Result<(), StoreError> {
        let mut stmt = conn
            .prepare("DELETE FROM records WHERE id = ?")
            .map_err(db)?;
        for id in ids {
            stmt.execute(params![id]).map_err(db)?;
        }
        Ok(())
    }
}

fn db(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl LocalCatalogStore for SqliteCatalogStore {
    fn all_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id FROM records ORDER BY id")
            .map_err(db)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db)?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(db)?);
        }
        Ok(ids)
    }

    fn get_all(&self) -> Result<Vec<Record>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM records ORDER BY id"))
            .map_err(db)?;
        let rows = stmt.query_map([], Self::row_to_record).map_err(db)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode_lists(row.map_err(db)?)?);
        }
        Ok(records)
    }

    fn bulk_insert(&self, records: &[Record]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db)?;
        for record in records {
            Self::insert_one(&tx, record)?;
        }
        tx.commit().map_err(db)
    }

    fn bulk_update(&self, records: &[Record]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db)?;
        for record in records {
            Self::update_one(&tx, record)?;
        }
        tx.commit().map_err(db)
    }

    fn bulk_delete_by_ids(&self, ids: &[RecordId]) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db)?;
        Self::delete_ids(&tx, ids)?;
        tx.commit().map_err(db)
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?"),
                params![id],
                Self::row_to_record,
            )
            .optional()
            .map_err(db)?;
        row.map(Self::decode_lists).transpose()
    }

    fn put(&self, record: &Record) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db)?;
        Self::delete_ids(&tx, &[record.id])?;
        Self::insert_one(&tx, record)?;
        tx.commit().map_err(db)
    }

    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db)?;
        // Dropping `tx` on any early return rolls everything back.
        Self::delete_ids(&tx, &changes.delete)?;
        for record in &changes.update {
            Self::update_one(&tx, record)?;
        }
        for record in &changes.insert {
            Self::insert_one(&tx, record)?;
        }
        tx.commit().map_err(db)
    }
}

impl LikedSet for SqliteCatalogStore {
    fn contains(&self, id: RecordId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM liked_records WHERE record_id = ?",
                params![id],
                |_| Ok(true),
            )
            .optional()
            .map_err(db)?;
        Ok(found.unwrap_or(false))
    }

    fn add(&self, id: RecordId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO liked_records (record_id, liked_at) VALUES (?, ?)",
            params![id, Utc::now().to_rfc3339()],
        )
        .map_err(db)?;
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM liked_records WHERE record_id = ?", params![id])
            .map_err(db)?;
        Ok(())
    }

    fn all_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT record_id FROM liked_records ORDER BY record_id")
            .map_err(db)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db)?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(db)?);
        }
        Ok(ids)
    }
}
