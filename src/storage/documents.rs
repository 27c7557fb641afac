// src/storage/documents.rs
//! JSON document collections kept in a single SQLite file.
//!
//! Each document is a JSON object stored as text, keyed by a generated
//! `_id`. Collections are a column, not separate tables, so new collections
//! need no schema change.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value as JsonValue};

use crate::utils::error::StorageError;

/// Field name under which a document's id is returned.
pub const ID_FIELD: &str = "_id";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL,
        body TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
";

pub struct DocumentStore {
    conn: Connection,
    label: String,
}

impl DocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = Self::initialize(Connection::open(path)?, path.display().to_string())?;
        tracing::info!("Opened document store {}", store.label);
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::initialize(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn initialize(conn: Connection, label: String) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, label })
    }

    /// Stores one JSON object and returns its generated id.
    pub fn insert_one(&self, collection: &str, document: &JsonValue) -> Result<String, StorageError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO documents (id, collection, body) VALUES (?1, ?2, ?3)",
            params![id, collection, encode(document)?],
        )?;
        tracing::debug!("Inserted document {} into {}", id, collection);
        Ok(id)
    }

    /// Stores every document in one transaction; either all are inserted or none.
    pub fn insert_many(&self, collection: &str, documents: &[JsonValue]) -> Result<Vec<String>, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(documents.len());
        {
            let mut stmt = tx.prepare("INSERT INTO documents (id, collection, body) VALUES (?1, ?2, ?3)")?;
            for document in documents {
                let id = uuid::Uuid::new_v4().to_string();
                stmt.execute(params![id, collection, encode(document)?])?;
                ids.push(id);
            }
        }
        tx.commit()?;

        tracing::info!("Inserted {} documents into {}", ids.len(), collection);
        Ok(ids)
    }

    pub fn find_one(&self, collection: &str, id: &str) -> Result<Option<JsonValue>, StorageError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| decode(id, &body)).transpose()
    }

    /// Every document of `collection`, in insertion order.
    pub fn find_all(&self, collection: &str) -> Result<Vec<JsonValue>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            documents.push(decode(&id, &body)?);
        }
        Ok(documents)
    }

    /// Sets `fields` on the document, overwriting existing keys. Returns
    /// `false` when no document has that id.
    pub fn update_one(&self, collection: &str, id: &str, fields: &Map<String, JsonValue>) -> Result<bool, StorageError> {
        let Some(JsonValue::Object(mut document)) = self.find_one(collection, id)? else {
            return Ok(false);
        };

        document.remove(ID_FIELD);
        for (key, value) in fields {
            if key != ID_FIELD {
                document.insert(key.clone(), value.clone());
            }
        }

        let changed = self.conn.execute(
            "UPDATE documents SET body = ?1 WHERE collection = ?2 AND id = ?3",
            params![encode(&JsonValue::Object(document))?, collection, id],
        )?;
        tracing::debug!("Updated document {} in {}", id, collection);
        Ok(changed > 0)
    }

    pub fn count_documents(&self, collection: &str) -> Result<u64, StorageError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn close(self) -> Result<(), StorageError> {
        let label = self.label;
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
        tracing::info!("Closed document store {}", label);
        Ok(())
    }
}

fn encode(document: &JsonValue) -> Result<String, StorageError> {
    let object = document
        .as_object()
        .ok_or_else(|| StorageError::SerializationError("documents must be JSON objects".to_string()))?;

    let mut stored = object.clone();
    stored.remove(ID_FIELD);
    serde_json::to_string(&stored).map_err(|e| StorageError::SerializationError(e.to_string()))
}

fn decode(id: &str, body: &str) -> Result<JsonValue, StorageError> {
    let stored: Map<String, JsonValue> =
        serde_json::from_str(body).map_err(|e| StorageError::SerializationError(e.to_string()))?;

    let mut document = Map::with_capacity(stored.len() + 1);
    document.insert(ID_FIELD.to_string(), JsonValue::String(id.to_string()));
    document.extend(stored);
    Ok(JsonValue::Object(document))
}
