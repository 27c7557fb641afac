// src/extractors/table.rs

// --- Imports ---
use crate::extractors::document::{clean_text, enclosing_heading, Document};
use crate::records::{ColumnSpec, Record, RecordSet, Value};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

// --- Constants ---
/// Output name of the normalized market capitalization column.
pub const MC_USD_BILLION: &str = "MC_USD_Billion";

// Upper bound for colspan/rowspan attributes; anything larger is treated as malformed markup
const MAX_SPAN: usize = 1_000;

// Wiki footnote markers glued to header text: "[1]", "[a]", "[n 2]", "[note 3]"
static FOOTNOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:\d{1,3}|[a-z]|(?:n|note) ?\d{1,3})\]").expect("Failed to compile FOOTNOTE_RE")
});

// --- Data Structures ---
/// Grid of cell texts taken from an HTML `<table>`, spans already expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

struct RawCell {
    text: String,
    colspan: usize,
    rowspan: usize,
}

impl Table {
    /// Reads the rows that belong to `table` itself (rows of nested tables are skipped).
    pub fn from_element(table: ElementRef<'_>) -> Self {
        let raw_rows: Vec<Vec<RawCell>> = table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                el.value().name() == "tr"
                    && owning_table(*el).map_or(false, |owner| owner.id() == table.id())
            })
            .map(|row| {
                row.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(|cell| RawCell {
                        text: clean_text(cell),
                        colspan: span_attr(cell, "colspan"),
                        rowspan: span_attr(cell, "rowspan"),
                    })
                    .collect()
            })
            .collect();

        Self {
            rows: expand_spans(raw_rows),
        }
    }
}

fn owning_table(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

fn span_attr(cell: ElementRef<'_>, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

/// Copies every spanning cell into each grid slot it covers.
fn expand_spans(raw_rows: Vec<Vec<RawCell>>) -> Vec<Vec<String>> {
    // Per column: text still owed to the rows below, and how many rows are left
    let mut carried: Vec<Option<(String, usize)>> = Vec::new();
    let mut rows = Vec::with_capacity(raw_rows.len());

    for cells in raw_rows {
        let mut row = Vec::new();
        let mut cells = cells.into_iter();
        let mut col = 0;

        loop {
            if let Some(slot) = carried.get_mut(col) {
                if let Some((text, left)) = slot.take() {
                    row.push(text.clone());
                    if left > 1 {
                        *slot = Some((text, left - 1));
                    }
                    col += 1;
                    continue;
                }
            }

            let Some(cell) = cells.next() else { break };
            for _ in 0..cell.colspan {
                if cell.rowspan > 1 {
                    if carried.len() <= col {
                        carried.resize(col + 1, None);
                    }
                    carried[col] = Some((cell.text.clone(), cell.rowspan - 1));
                }
                row.push(cell.text.clone());
                col += 1;
            }
        }

        rows.push(row);
    }

    rows
}

// --- Operations ---

/// Finds the first table following the section heading that encloses `heading_id`.
pub fn locate(document: &Document, heading_id: &str) -> Result<Table, ExtractError> {
    let anchor = document
        .find_by_id(heading_id)
        .ok_or_else(|| ExtractError::NotFound(format!("no element with id '{}'", heading_id)))?;

    let heading = enclosing_heading(anchor).ok_or_else(|| {
        ExtractError::MalformedDocument(format!(
            "element '{}' is not inside a section heading",
            heading_id
        ))
    })?;
    tracing::debug!("Found <{}> heading for '{}'", heading.value().name(), heading_id);

    let table = document.next_element_named(heading, "table").ok_or_else(|| {
        ExtractError::NotFound(format!("no table after heading '{}'", heading_id))
    })?;

    let table = Table::from_element(table);
    tracing::debug!("Located table with {} rows after '{}'", table.rows.len(), heading_id);
    Ok(table)
}

/// Turns the header row plus data rows into records, in row order.
pub fn to_records(table: Table) -> Result<RecordSet, ExtractError> {
    let mut rows = table.rows.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| ExtractError::MalformedTable("table has no header row".to_string()))?;

    let columns = unique_headers(
        header
            .iter()
            .map(|h| FOOTNOTE_RE.replace_all(h, "").trim().to_string())
            .collect(),
    );

    let mut records = RecordSet::new(columns);
    for row in rows {
        records.push_row(row.into_iter().map(Value::Text).collect())?;
    }
    Ok(records)
}

/// Suffixes repeated header names with `.1`, `.2`, ... so every column keeps its cells.
/// A header spanning two columns yields `Name` and `Name.1`.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.clone();
        let mut suffix = 1;
        while columns.contains(&name) {
            name = format!("{}.{}", header, suffix);
            suffix += 1;
        }
        columns.push(name);
    }
    columns
}

/// Matches the market capitalization column under either capitalization seen in the wild.
pub fn market_cap_column(name: &str) -> bool {
    name.contains("Market cap") || name.contains("Market Cap")
}

/// Strips thousands separators and surrounding whitespace, then parses as `f64`.
pub fn parse_localized_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").trim().parse::<f64>().ok()
}

/// Parses the single column picked by `matcher` into floats and renames it to `canonical`.
///
/// The whole operation fails on the first unparseable cell; no partial result
/// is returned. Cells that are already numeric pass through unchanged.
pub fn normalize_numeric_column<F>(
    mut records: RecordSet,
    matcher: F,
    canonical: &str,
) -> Result<RecordSet, ExtractError>
where
    F: Fn(&str) -> bool,
{
    let matched: Vec<&String> = records.columns.iter().filter(|c| matcher(c)).collect();
    let column = match matched.as_slice() {
        [] => {
            return Err(ExtractError::NotFound(format!(
                "no numeric column among [{}]",
                records.columns.join(", ")
            )))
        }
        [only] => (*only).clone(),
        many => {
            return Err(ExtractError::AmbiguousColumn(
                many.iter().map(|c| c.to_string()).collect(),
            ))
        }
    };

    for (index, record) in records.records.iter_mut().enumerate() {
        let value = record
            .get_mut(&column)
            .ok_or_else(|| ExtractError::MalformedTable(format!("row {} lacks '{}'", index + 1, column)))?;

        let parsed = match &*value {
            Value::Text(raw) => parse_localized_number(raw).ok_or_else(|| {
                ExtractError::InvalidNumericValue {
                    column: column.clone(),
                    row: index + 1,
                    value: raw.clone(),
                }
            })?,
            Value::Integer(i) => *i as f64,
            Value::Number(n) => *n,
        };
        *value = Value::Number(parsed);
    }

    records.rename_column(&column, canonical);
    tracing::debug!("Normalized column '{}' as '{}' over {} records", column, canonical, records.len());
    Ok(records)
}

/// Restricts every record to the columns in `spec`, in that order.
pub fn project(records: RecordSet, spec: &ColumnSpec) -> Result<RecordSet, ExtractError> {
    if spec.is_empty() {
        return Ok(records);
    }

    if let Some(missing) = spec.names().iter().find(|name| !records.has_column(name)) {
        return Err(ExtractError::UnknownColumn(missing.clone()));
    }

    let mut projected = RecordSet::new(spec.names().to_vec());
    projected.records.reserve(records.len());
    for mut record in records.records {
        let mut row = Record::with_capacity(spec.names().len());
        for name in spec.names() {
            let value = record
                .swap_remove(name)
                .ok_or_else(|| ExtractError::UnknownColumn(name.clone()))?;
            row.insert(name.clone(), value);
        }
        projected.records.push(row);
    }
    Ok(projected)
}

/// `locate` + `to_records` over raw HTML.
pub fn extract_table(html_content: &str, heading_id: &str) -> Result<RecordSet, ExtractError> {
    let document = Document::parse(html_content);
    to_records(locate(&document, heading_id)?)
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn bank_page(rows: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
            <html><body>
            <h2><span class="mw-headline" id="By_market_capitalization">By market capitalization</span></h2>
            <p>The list below ranks banks.</p>
            <table class="wikitable">
              <tbody>
                <tr><th>Rank</th><th>Bank Name</th><th>Market Cap (US$ billion)</th></tr>
                {}
              </tbody>
            </table>
            <h2><span id="By_total_assets">By total assets</span></h2>
            <table><tr><th>Rank</th><th>Assets</th></tr><tr><td>1</td><td>9</td></tr></table>
            </body></html>"#,
            rows
        )
    }

    fn scenario_records(rows: &str) -> Result<RecordSet, ExtractError> {
        let records = extract_table(&bank_page(rows), "By_market_capitalization")?;
        normalize_numeric_column(records, market_cap_column, MC_USD_BILLION)
    }

    #[test]
    fn test_scenario_a_single_bank() {
        let records = scenario_records("<tr><td>1</td><td>Bank X</td><td>1,234.56</td></tr>").unwrap();

        assert_eq!(records.columns, vec!["Rank", "Bank Name", MC_USD_BILLION]);
        assert_eq!(records.len(), 1);
        let record = &records.records[0];
        assert_eq!(record["Rank"], Value::from("1"));
        assert_eq!(record["Bank Name"], Value::from("Bank X"));
        assert_eq!(record[MC_USD_BILLION], Value::Number(1234.56));
    }

    #[test]
    fn test_scenario_b_bad_number_aborts() {
        let err = scenario_records(
            "<tr><td>1</td><td>Bank X</td><td>432.92</td></tr>\
             <tr><td>2</td><td>Bank Y</td><td>abc</td></tr>",
        )
        .unwrap_err();

        assert_eq!(
            err,
            ExtractError::InvalidNumericValue {
                column: "Market Cap (US$ billion)".to_string(),
                row: 2,
                value: "abc".to_string(),
            }
        );
    }

    #[test]
    fn test_scenario_c_missing_heading() {
        let document = Document::parse(&bank_page(""));
        let err = locate(&document, "By_revenue").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_scenario_d_two_market_cap_columns() {
        let mut records = RecordSet::new(vec![
            "Bank".into(),
            "Market Cap 2022".into(),
            "Market Cap 2023".into(),
        ]);
        records.push_row(vec!["X".into(), "1".into(), "2".into()]).unwrap();

        let err = normalize_numeric_column(records, market_cap_column, MC_USD_BILLION).unwrap_err();
        assert_eq!(
            err,
            ExtractError::AmbiguousColumn(vec!["Market Cap 2022".into(), "Market Cap 2023".into()])
        );
    }

    #[test]
    fn test_scenario_e_project_unknown_column() {
        let records = scenario_records("<tr><td>1</td><td>Bank X</td><td>1</td></tr>").unwrap();
        let spec = ColumnSpec::new(["Rank", "Missing"]);
        assert_eq!(
            project(records, &spec).unwrap_err(),
            ExtractError::UnknownColumn("Missing".to_string())
        );
    }

    #[test]
    fn test_record_count_excludes_header() {
        let rows: String = (1..=10)
            .map(|i| format!("<tr><td>{i}</td><td>Bank {i}</td><td> {i},000.5 </td></tr>"))
            .collect();
        let records = scenario_records(&rows).unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records.records[9][MC_USD_BILLION], Value::Number(10000.5));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = scenario_records(
            "<tr><td>1</td><td>Bank X</td><td>1,234.5</td></tr>\
             <tr><td>2</td><td>Bank Y</td><td>1234.5</td></tr>",
        )
        .unwrap();
        assert_eq!(once.records[0][MC_USD_BILLION], once.records[1][MC_USD_BILLION]);

        let twice = normalize_numeric_column(once.clone(), |c| c == MC_USD_BILLION, MC_USD_BILLION).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_matching_column() {
        let mut records = RecordSet::new(vec!["Rank".into()]);
        records.push_row(vec!["1".into()]).unwrap();
        let err = normalize_numeric_column(records, market_cap_column, MC_USD_BILLION).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_project_reorders_and_full_projection_is_identity() {
        let records = scenario_records("<tr><td>1</td><td>Bank X</td><td>7</td></tr>").unwrap();

        let all = ColumnSpec::new(records.columns.clone());
        assert_eq!(project(records.clone(), &all).unwrap(), records);
        assert_eq!(project(records.clone(), &ColumnSpec::all()).unwrap(), records);

        let subset = project(records, &ColumnSpec::new([MC_USD_BILLION, "Bank Name"])).unwrap();
        assert_eq!(subset.columns, vec![MC_USD_BILLION, "Bank Name"]);
        let keys: Vec<&String> = subset.records[0].keys().collect();
        assert_eq!(keys, vec![MC_USD_BILLION, "Bank Name"]);
    }

    #[test]
    fn test_heading_without_section_is_malformed() {
        let html = r#"<body><div id="orphan">x</div><table><tr><td>1</td></tr></table></body>"#;
        let err = locate(&Document::parse(html), "orphan").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDocument(_)));
    }

    #[test]
    fn test_heading_without_following_table() {
        let html = r#"<body><table><tr><td>1</td></tr></table><h3 id="x"><span id="last">Last</span></h3><p>end</p></body>"#;
        let err = locate(&Document::parse(html), "last").unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let err = extract_table(
            &bank_page("<tr><td>1</td><td>Bank X</td></tr>"),
            "By_market_capitalization",
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::MalformedTable(_)));
    }

    #[test]
    fn test_header_footnotes_are_dropped() {
        let html = r#"<h2><span id="s">S</span></h2>
            <table><tr><th>Bank name</th><th>Market cap (US$ billion)<sup>[1]</sup></th></tr>
            <tr><td>A</td><td>3</td></tr></table>"#;
        let records = extract_table(html, "s").unwrap();
        assert_eq!(records.columns, vec!["Bank name", "Market cap (US$ billion)"]);
    }

    #[test]
    fn test_spans_are_expanded() {
        let html = r#"<h2 id="h"><span id="s">S</span></h2>
            <table>
              <tr><th colspan="2">Name</th><th>Value</th></tr>
              <tr><td rowspan="2">A</td><td>a1</td><td>1</td></tr>
              <tr><td>a2</td><td>2</td></tr>
            </table>"#;
        let table = locate(&Document::parse(html), "s").unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec!["Name", "Name", "Value"],
                vec!["A", "a1", "1"],
                vec!["A", "a2", "2"],
            ]
        );
    }

    #[test]
    fn test_spanned_header_keeps_every_cell() {
        let html = r#"<h2><span id="s">S</span></h2>
            <table>
              <tr><th colspan="2">Name</th><th>Market cap</th></tr>
              <tr><td>Alpha</td><td>Beta</td><td>1,000</td></tr>
            </table>"#;
        let records = extract_table(html, "s").unwrap();
        assert_eq!(records.columns, vec!["Name", "Name.1", "Market cap"]);
        assert_eq!(records.records[0]["Name"], Value::Text("Alpha".into()));
        assert_eq!(records.records[0]["Name.1"], Value::Text("Beta".into()));

        let records = normalize_numeric_column(records, market_cap_column, MC_USD_BILLION).unwrap();
        assert_eq!(records.records[0].len(), 3);
    }

    #[test]
    fn test_unique_headers_suffixes_repeats() {
        let headers = vec!["A".to_string(), "A".to_string(), "B".to_string(), "A".to_string()];
        assert_eq!(unique_headers(headers), vec!["A", "A.1", "B", "A.2"]);
    }

    #[test]
    fn test_bracketed_header_text_is_kept() {
        let html = r#"<h2><span id="s">S</span></h2>
            <table><tr><th>Bank</th><th>Assets [US$ billion]</th><th>Market cap[a][n 2]</th></tr>
            <tr><td>A</td><td>3</td><td>4</td></tr></table>"#;
        let records = extract_table(html, "s").unwrap();
        assert_eq!(records.columns, vec!["Bank", "Assets [US$ billion]", "Market cap"]);
    }

    #[test]
    fn test_nested_table_rows_are_ignored() {
        let html = r#"<h2><span id="s">S</span></h2>
            <table>
              <tr><th>Bank</th><th>Market cap</th></tr>
              <tr><td>A<table><tr><td>inner</td></tr></table></td><td>5</td></tr>
            </table>"#;
        let records = extract_table(html, "s").unwrap();
        assert_eq!(records.len(), 1);
    }
}
