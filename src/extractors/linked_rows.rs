// src/extractors/linked_rows.rs
use crate::extractors::document::{clean_text, Document};
use crate::records::{RecordSet, Value};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

static TBODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tbody").expect("Failed to compile TBODY_SELECTOR")
});

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr").expect("Failed to compile ROW_SELECTOR")
});

static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td").expect("Failed to compile CELL_SELECTOR")
});

static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a").expect("Failed to compile LINK_SELECTOR")
});

/// Where to look in a page whose target table has no usable heading anchor.
#[derive(Debug, Clone)]
pub struct LinkedRowOptions {
    /// Zero-based index of the `<tbody>` among all bodies in the page.
    pub body_index: usize,
    /// Zero-based `<td>` index holding the value.
    pub value_cell: usize,
    /// Rows whose value cell contains this text carry no data.
    pub placeholder: String,
    pub name_column: String,
    pub value_column: String,
}

impl Default for LinkedRowOptions {
    fn default() -> Self {
        Self {
            body_index: 2,
            value_cell: 2,
            placeholder: "—".to_string(),
            name_column: "Country".to_string(),
            value_column: "GDP_USD_millions".to_string(),
        }
    }
}

/// Collects `(link text, value text)` pairs from the rows of one table body.
///
/// A row is kept when its first cell holds a link and its value cell is not a
/// placeholder. The value is the first text node directly inside the value
/// cell, so footnote markup after the number is left out.
pub fn extract_linked_rows(document: &Document, options: &LinkedRowOptions) -> Result<RecordSet, ExtractError> {
    let body = document
        .html()
        .select(&TBODY_SELECTOR)
        .nth(options.body_index)
        .ok_or_else(|| ExtractError::NotFound(format!("no table body at index {}", options.body_index)))?;

    let mut records = RecordSet::new(vec![options.name_column.clone(), options.value_column.clone()]);

    for (row_index, row) in body.select(&ROW_SELECTOR).enumerate() {
        let cells: Vec<ElementRef> = row.select(&CELL_SELECTOR).collect();
        let Some(first) = cells.first() else {
            continue; // header rows only have <th>
        };
        let Some(link) = first.select(&LINK_SELECTOR).next() else {
            continue;
        };

        let value_cell = cells.get(options.value_cell).ok_or_else(|| {
            ExtractError::MalformedTable(format!(
                "row {} has {} cells, value expected in cell {}",
                row_index + 1,
                cells.len(),
                options.value_cell
            ))
        })?;
        if value_cell.text().any(|t| t.contains(options.placeholder.as_str())) {
            continue;
        }

        let value = first_text_node(*value_cell).unwrap_or_default();
        records.push_row(vec![Value::Text(clean_text(link)), Value::Text(value)])?;
    }

    tracing::debug!("Collected {} linked rows from body {}", records.len(), options.body_index);
    Ok(records)
}

fn first_text_node(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .find_map(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
}
