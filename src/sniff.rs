//! Format sniffing for opaque source text.
//!
//! Source files arrive with no format guarantee: the publisher has shipped
//! the same dataset as JSON, line-delimited JSON, JSON wrapped in page
//! chrome, and plain delimited text at different times. [`sniff`] runs an
//! ordered cascade of parsing strategies and returns the first table any of
//! them produces; only when every strategy is exhausted does it fail, and
//! then with the per-strategy errors plus a bounded input preview so an
//! operator can see what actually arrived.

use anyhow::{Result, anyhow, bail};
use log::debug;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::{
    data::{Value, json_to_cell},
    table::Table,
};

/// Maximum number of input characters echoed back in diagnostics.
pub const PREVIEW_LIMIT: usize = 2000;

const SAMPLE_LINES: usize = 20;
const GUARD_MIN_COMMAS: usize = 3;
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b'|', b';'];

/// How the final, delimited-text strategy behaves for a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimitedMode {
    /// Try auto-detected, comma, tab, pipe, and semicolon delimiters in
    /// order; first consistent multi-column parse wins.
    DelimiterCandidates,
    /// Parse as comma-separated only when sampled lines share one uniform
    /// comma count of at least three. Guards against treating
    /// structured-looking text as CSV.
    GuardedComma,
}

#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("{}", render_failure(.attempts, .preview))]
pub struct UnparseableFormat {
    pub attempts: Vec<StrategyFailure>,
    pub preview: String,
}

fn render_failure(attempts: &[StrategyFailure], preview: &str) -> String {
    let mut message = String::from("no parsing strategy produced a table");
    for attempt in attempts {
        message.push_str(&format!("\n  {}: {}", attempt.strategy, attempt.message));
    }
    message.push_str(&format!("\ninput preview: {preview}"));
    message
}

/// First `PREVIEW_LIMIT` characters with newlines escaped, for diagnostics.
pub fn input_preview(text: &str) -> String {
    text.chars()
        .take(PREVIEW_LIMIT)
        .collect::<String>()
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// Turns unknown-format text into a table, or fails with every strategy's
/// error once the cascade is exhausted.
pub fn sniff(text: &str, mode: DelimitedMode) -> Result<Table, UnparseableFormat> {
    let delimited: (&'static str, fn(&str) -> Result<Table>) = match mode {
        DelimitedMode::DelimiterCandidates => ("delimited text", parse_delimiter_candidates),
        DelimitedMode::GuardedComma => ("guarded csv", parse_guarded_comma),
    };
    let strategies: [(&'static str, fn(&str) -> Result<Table>); 4] = [
        ("json document", parse_json_document),
        ("json lines", parse_json_lines),
        ("embedded fragment", parse_embedded_fragment),
        delimited,
    ];

    let mut attempts = Vec::with_capacity(strategies.len());
    for (name, parse) in strategies {
        match parse(text) {
            Ok(table) => {
                debug!(
                    "Strategy '{}' produced {} row(s) across {} column(s)",
                    name,
                    table.len(),
                    table.columns().len()
                );
                return Ok(table);
            }
            Err(err) => {
                debug!("Strategy '{}' failed: {err:#}", name);
                attempts.push(StrategyFailure {
                    strategy: name,
                    message: format!("{err:#}"),
                });
            }
        }
    }
    Err(UnparseableFormat {
        attempts,
        preview: input_preview(text),
    })
}

fn parse_json_document(text: &str) -> Result<Table> {
    let document: JsonValue = serde_json::from_str(text)?;
    table_from_json(&document)
}

fn parse_json_lines(text: &str) -> Result<Table> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() <= 1 {
        bail!("input is not multi-line");
    }
    let mut objects = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        match serde_json::from_str::<JsonValue>(line)? {
            JsonValue::Object(map) => objects.push(map),
            other => bail!("line {} is not a JSON object: {other}", idx + 1),
        }
    }
    Ok(table_from_objects(&objects))
}

fn parse_embedded_fragment(text: &str) -> Result<Table> {
    let fragment = extract_balanced_fragment(text)
        .ok_or_else(|| anyhow!("no balanced {{...}} or [...] span found"))?;
    let document: JsonValue = serde_json::from_str(fragment)?;
    table_from_json(&document)
}

fn parse_delimiter_candidates(text: &str) -> Result<Table> {
    let mut candidates = Vec::new();
    if let Some(detected) = detect_delimiter(text) {
        candidates.push(detected);
    }
    for delimiter in DELIMITER_CANDIDATES {
        if !candidates.contains(&delimiter) {
            candidates.push(delimiter);
        }
    }
    let mut errors = Vec::new();
    for delimiter in candidates {
        match parse_delimited(text, delimiter) {
            Ok(table) => return Ok(table),
            Err(err) => errors.push(format!("'{}': {err:#}", printable_delimiter(delimiter))),
        }
    }
    bail!("no candidate delimiter parsed cleanly ({})", errors.join("; "))
}

fn parse_guarded_comma(text: &str) -> Result<Table> {
    let comma_counts: Vec<usize> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SAMPLE_LINES)
        .map(|line| line.matches(',').count())
        .collect();
    let Some(first) = comma_counts.first().copied() else {
        bail!("input has no non-blank lines to sample");
    };
    if first < GUARD_MIN_COMMAS {
        bail!("sampled lines carry {first} comma(s); need at least {GUARD_MIN_COMMAS}");
    }
    if comma_counts.iter().any(|count| *count != first) {
        bail!("comma counts are not uniform across sampled lines: {comma_counts:?}");
    }
    parse_delimited(text, b',')
}

/// Zips a JSON document into a table following one set of rules for every
/// shape the publisher has been observed to emit.
fn table_from_json(document: &JsonValue) -> Result<Table> {
    match document {
        JsonValue::Array(elements) => {
            let mut objects = Vec::with_capacity(elements.len());
            for (idx, element) in elements.iter().enumerate() {
                match element {
                    JsonValue::Object(map) => objects.push(map.clone()),
                    other => bail!("array element {idx} is not an object: {other}"),
                }
            }
            Ok(table_from_objects(&objects))
        }
        JsonValue::Object(map) => Ok(table_from_object(map)),
        other => bail!("top-level JSON value is not an object or array: {other}"),
    }
}

fn table_from_objects(objects: &[Map<String, JsonValue>]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for object in objects {
        for key in object.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    let mut table = Table::new(columns);
    for object in objects {
        let row = table
            .columns()
            .iter()
            .map(|column| object.get(column).and_then(json_to_cell))
            .collect();
        table.push_row(row);
    }
    table
}

fn table_from_object(map: &Map<String, JsonValue>) -> Table {
    let row_count = map
        .values()
        .filter_map(|value| value.as_array().map(Vec::len))
        .max();
    let columns: Vec<String> = map.keys().cloned().collect();
    let mut table = Table::new(columns);
    match row_count {
        // Parallel arrays, zipped by index. Shorter arrays pad with null;
        // scalar keys repeat on every row.
        Some(rows) => {
            for idx in 0..rows {
                let row = map
                    .values()
                    .map(|value| match value {
                        JsonValue::Array(items) => items.get(idx).and_then(json_to_cell),
                        scalar => json_to_cell(scalar),
                    })
                    .collect();
                table.push_row(row);
            }
        }
        None => {
            let row = map.values().map(json_to_cell).collect();
            table.push_row(row);
        }
    }
    table
}

/// Re-normalizes a table whose `data` column holds serialized records, the
/// shape produced by sniffing an API envelope like `{"data": [...]}`.
/// Returns the input unchanged when there is nothing to expand.
pub fn expand_embedded_rows(table: Table) -> Table {
    let Some(data_idx) = table.column_index("data") else {
        return table;
    };
    let mut objects = Vec::new();
    for row in table.rows() {
        let Some(Value::String(cell)) = row.get(data_idx).and_then(|c| c.as_ref()) else {
            continue;
        };
        match serde_json::from_str::<JsonValue>(cell) {
            Ok(JsonValue::Object(map)) => objects.push(map),
            Ok(JsonValue::Array(items)) => {
                objects.extend(items.into_iter().filter_map(|item| match item {
                    JsonValue::Object(map) => Some(map),
                    _ => None,
                }));
            }
            _ => continue,
        }
    }
    if objects.is_empty() {
        return table;
    }
    debug!("Expanded {} embedded row(s) from 'data' column", objects.len());
    table_from_objects(&objects)
}

/// Finds the first balanced top-level `{...}` or `[...]` span, skipping
/// over string literals and escapes so braces inside quoted text do not
/// throw off the depth count.
fn extract_balanced_fragment(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| matches!(*b, b'{' | b'['))?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match *byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .double_quote(true)
        .flexible(false)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.len() < 2 {
        bail!(
            "only {} column(s) detected with delimiter '{}'",
            headers.len(),
            printable_delimiter(delimiter)
        );
    }
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(Value::String(field.to_string()))
                }
            })
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

/// Picks the candidate delimiter occurring most often in the first
/// non-blank line, if any occurs at all.
fn detect_delimiter(text: &str) -> Option<u8> {
    let line = text.lines().find(|line| !line.trim().is_empty())?;
    DELIMITER_CANDIDATES
        .into_iter()
        .map(|delimiter| (delimiter, line.matches(delimiter as char).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(delimiter, _)| delimiter)
}

fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
