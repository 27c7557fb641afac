// src/analysis.rs
//! Group-by summaries over a document collection.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::storage::DocumentStore;
use crate::utils::error::StorageError;

/// What to summarize. Field names refer to top-level document keys.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPlan {
    /// One count table per field.
    pub count_by: Vec<String>,
    /// One total table per key field, summing `sum_field`.
    pub sum_by: Vec<String>,
    pub sum_field: String,
    /// Key field whose single largest `sum_field` total is reported.
    pub top_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key: JsonValue,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: JsonValue,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub analyzed_at: String,
    pub total_records: u64,
    pub counts: IndexMap<String, Vec<GroupCount>>,
    pub totals: IndexMap<String, Vec<GroupTotal>>,
    pub top: Option<GroupTotal>,
}

fn group_key(document: &JsonValue, field: &str) -> JsonValue {
    document.get(field).cloned().unwrap_or(JsonValue::Null)
}

/// Documents per distinct value of `field`, largest group first.
/// Documents lacking the field are grouped under `null`.
pub fn count_by(documents: &[JsonValue], field: &str) -> Vec<GroupCount> {
    let mut groups: IndexMap<String, GroupCount> = IndexMap::new();
    for document in documents {
        let key = group_key(document, field);
        groups
            .entry(key.to_string())
            .or_insert_with(|| GroupCount { key, count: 0 })
            .count += 1;
    }

    let mut counts: Vec<GroupCount> = groups.into_values().collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Sum of numeric `value_field` per distinct `key_field`, largest first.
/// Non-numeric or missing values add nothing.
pub fn sum_by(documents: &[JsonValue], key_field: &str, value_field: &str) -> Vec<GroupTotal> {
    let mut groups: IndexMap<String, GroupTotal> = IndexMap::new();
    for document in documents {
        let key = group_key(document, key_field);
        let amount = document.get(value_field).and_then(JsonValue::as_f64).unwrap_or(0.0);
        groups
            .entry(key.to_string())
            .or_insert_with(|| GroupTotal { key, total: 0.0 })
            .total += amount;
    }

    let mut totals: Vec<GroupTotal> = groups.into_values().collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

pub fn analyze(documents: &[JsonValue], plan: &AnalysisPlan) -> CollectionSummary {
    let counts = plan
        .count_by
        .iter()
        .map(|field| (field.clone(), count_by(documents, field)))
        .collect();
    let totals = plan
        .sum_by
        .iter()
        .map(|field| (field.clone(), sum_by(documents, field, &plan.sum_field)))
        .collect();
    let top = plan
        .top_by
        .as_ref()
        .and_then(|field| sum_by(documents, field, &plan.sum_field).into_iter().next());

    CollectionSummary {
        analyzed_at: chrono::Local::now().to_rfc3339(),
        total_records: documents.len() as u64,
        counts,
        totals,
        top,
    }
}

/// Summarizes `source` and stores the summary as one document in `target`.
pub fn run_analysis(
    store: &DocumentStore,
    source: &str,
    target: &str,
    plan: &AnalysisPlan,
) -> Result<(String, CollectionSummary), StorageError> {
    let documents = store.find_all(source)?;
    tracing::info!("Analyzing {} documents from {}", documents.len(), source);

    let summary = analyze(&documents, plan);
    let document = serde_json::to_value(&summary).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    let id = store.insert_one(target, &document)?;

    tracing::info!("Stored analysis of {} as {} in {}", source, id, target);
    Ok((id, summary))
}
