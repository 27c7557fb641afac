// src/run_log.rs
//! Start/finish bookkeeping for runs of an external automation, one document per run.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::storage::DocumentStore;
use crate::utils::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Starting,
    #[serde(rename = "OK")]
    Ok,
    Failed,
}

/// Stored shape of a run document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub name: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub status: RunStatus,
    pub duration_seconds: Option<f64>,
}

impl RunLog {
    pub fn starting(name: &str, now: DateTime<Local>) -> Self {
        Self {
            name: name.to_string(),
            start_time: now.to_rfc3339(),
            end_time: None,
            status: RunStatus::Starting,
            duration_seconds: None,
        }
    }
}

/// Inserts a `Starting` document for `name` and returns its id.
pub fn start_run(store: &DocumentStore, collection: &str, name: &str) -> Result<String, StorageError> {
    let run = RunLog::starting(name, Local::now());
    let document = serde_json::to_value(&run).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let id = store.insert_one(collection, &document)?;
    tracing::info!("Run '{}' started at {} (id {})", name, run.start_time, id);
    Ok(id)
}

/// Marks run `id` as finished now, recording status and elapsed seconds.
pub fn finish_run(store: &DocumentStore, collection: &str, id: &str, succeeded: bool) -> Result<RunLog, StorageError> {
    finish_run_at(store, collection, id, succeeded, Local::now())
}

fn finish_run_at(
    store: &DocumentStore,
    collection: &str,
    id: &str,
    succeeded: bool,
    now: DateTime<Local>,
) -> Result<RunLog, StorageError> {
    let not_found = || StorageError::DocumentNotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    };

    let document = store.find_one(collection, id)?.ok_or_else(not_found)?;
    let mut run: RunLog =
        serde_json::from_value(document).map_err(|e| StorageError::SerializationError(e.to_string()))?;

    let started: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(&run.start_time)
        .map_err(|e| StorageError::SerializationError(format!("bad start_time {:?}: {}", run.start_time, e)))?;
    let duration = now.signed_duration_since(started).num_milliseconds() as f64 / 1000.0;

    run.end_time = Some(now.to_rfc3339());
    run.duration_seconds = Some(duration);
    run.status = if succeeded { RunStatus::Ok } else { RunStatus::Failed };

    let mut fields = Map::new();
    fields.insert("end_time".to_string(), json!(run.end_time));
    fields.insert("duration_seconds".to_string(), json!(run.duration_seconds));
    fields.insert("status".to_string(), json!(run.status));

    if !store.update_one(collection, id, &fields)? {
        return Err(not_found());
    }
    tracing::info!("Run '{}' finished as {:?} after {:.3}s", run.name, run.status, duration);
    Ok(run)
}
