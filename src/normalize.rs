//! Schema normalization: reconciling a sniffed table's column names and
//! cell types with the canonical vocabulary the aggregation engine expects.
//!
//! Alias resolution is driven by static tables so new source naming
//! variants are an additive change, never a new conditional.

use log::debug;
use thiserror::Error;

use crate::{
    data::{Value, coerce_float, coerce_year},
    table::Table,
};

/// Canonical column name paired with its accepted source aliases, matched
/// case-insensitively in declared order.
pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

pub const TIME_SERIES_ALIASES: AliasTable = &[
    ("series_id", &["seriesid", "series", "series id"]),
    ("year", &["yr"]),
    ("period", &["periodid"]),
    ("value", &["val", "amount"]),
];

pub const POPULATION_ALIASES: AliasTable = &[
    ("year", &["yr"]),
    ("population", &["pop", "population_count", "pop_count", "value"]),
];

/// Everything `normalize` needs to know about one source's target shape.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeSpec {
    pub aliases: AliasTable,
    pub required: &'static [&'static str],
    pub numeric: &'static [&'static str],
    pub year_column: &'static str,
}

pub const TIME_SERIES_SPEC: NormalizeSpec = NormalizeSpec {
    aliases: TIME_SERIES_ALIASES,
    required: &["series_id", "year", "period", "value"],
    numeric: &["value"],
    year_column: "year",
};

pub const POPULATION_SPEC: NormalizeSpec = NormalizeSpec {
    aliases: POPULATION_ALIASES,
    required: &["year", "population"],
    numeric: &["population"],
    year_column: "year",
};

/// Categorical row filter: keep rows whose column equals `value`,
/// case-insensitively, after trimming.
#[derive(Debug, Clone)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Error)]
#[error(
    "missing required column(s) [{}] after alias resolution; resolved columns: [{}]",
    .missing.join(", "),
    .resolved.join(", ")
)]
pub struct MissingRequiredColumn {
    pub missing: Vec<String>,
    pub resolved: Vec<String>,
}

/// Canonicalizes column names, trims textual cells, applies the optional
/// categorical filter, and coerces declared numeric/year columns.
/// Coercion failures null the cell; only an unresolved required column is
/// fatal. Idempotent on its own output.
pub fn normalize(
    mut table: Table,
    spec: &NormalizeSpec,
    filter: Option<&RowFilter>,
) -> Result<Table, MissingRequiredColumn> {
    trim_column_names(&mut table);
    resolve_aliases(&mut table, spec.aliases);
    trim_string_cells(&mut table);

    if let Some(filter) = filter {
        apply_row_filter(&mut table, filter);
    }

    let numeric_indices: Vec<usize> = spec
        .numeric
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    let year_index = table.column_index(spec.year_column);
    table.map_cells(|idx, cell| {
        let cell = cell?;
        if Some(idx) == year_index {
            coerce_year(&cell)
        } else if numeric_indices.contains(&idx) {
            coerce_float(&cell)
        } else {
            Some(cell)
        }
    });

    let missing: Vec<String> = spec
        .required
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(table)
    } else {
        Err(MissingRequiredColumn {
            missing,
            resolved: table.columns().to_vec(),
        })
    }
}

fn trim_column_names(table: &mut Table) {
    for idx in 0..table.columns().len() {
        let name = table.columns()[idx].trim().to_string();
        if name != table.columns()[idx] {
            table.rename_column(idx, name);
        }
    }
}

fn resolve_aliases(table: &mut Table, aliases: AliasTable) {
    for (target, accepted) in aliases {
        if table.column_index(target).is_some() {
            continue;
        }
        // The target's own name doubles as the first alias so case
        // variants like `Year` or `PERIOD` still resolve. Aliases are
        // tried in declared order, so when several columns could supply
        // the target the earlier alias wins, not the earlier column.
        let found = std::iter::once(target)
            .chain(accepted.iter())
            .find_map(|alias| {
                table
                    .columns()
                    .iter()
                    .position(|column| column.eq_ignore_ascii_case(alias))
            });
        if let Some(idx) = found {
            debug!("Resolved column '{}' via alias '{}'", target, table.columns()[idx]);
            table.rename_column(idx, target.to_string());
        }
    }
}

fn trim_string_cells(table: &mut Table) {
    table.map_cells(|_, cell| match cell {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.len() == s.len() {
                Some(Value::String(s))
            } else {
                Some(Value::String(trimmed.to_string()))
            }
        }
        other => other,
    });
}

fn apply_row_filter(table: &mut Table, filter: &RowFilter) {
    let Some(idx) = table.column_index(&filter.column) else {
        // The pipeline only builds a filter from columns it has seen, so a
        // missing column means a different source shape; keep everything.
        return;
    };
    let wanted = filter.value.trim();
    table.retain_rows(|row| {
        row.get(idx)
            .and_then(|cell| cell.as_ref())
            .and_then(Value::as_str)
            .is_some_and(|cell| cell.trim().eq_ignore_ascii_case(wanted))
    });
}

/// Picks the nation filter matching whichever region column the population
/// source actually carries.
pub fn nation_filter(table: &Table) -> Option<RowFilter> {
    if table.column_index("Nation").is_some() {
        Some(RowFilter {
            column: "Nation".to_string(),
            value: "united states".to_string(),
        })
    } else if table.column_index("Nation ID").is_some() {
        Some(RowFilter {
            column: "Nation ID".to_string(),
            value: "01000US".to_string(),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts_table() -> Table {
        let mut table = Table::new(vec![
            "  SeriesID ".to_string(),
            "Yr".to_string(),
            "PERIOD".to_string(),
            "Val".to_string(),
        ]);
        table.push_row(vec![
            Some(Value::String("PRS30006032   ".to_string())),
            Some(Value::String("2015".to_string())),
            Some(Value::String(" Q01".to_string())),
            Some(Value::String("3.2".to_string())),
        ]);
        table.push_row(vec![
            Some(Value::String("PRS30006032".to_string())),
            Some(Value::String("n/a".to_string())),
            Some(Value::String("Q02".to_string())),
            Some(Value::String("bad".to_string())),
        ]);
        table
    }

    #[test]
    fn aliases_resolve_case_insensitively_and_cells_are_trimmed() {
        let table = normalize(ts_table(), &TIME_SERIES_SPEC, None).unwrap();
        assert_eq!(table.columns(), ["series_id", "year", "period", "value"]);
        assert_eq!(
            table.cell(0, 0),
            Some(&Value::String("PRS30006032".to_string()))
        );
        assert_eq!(table.cell(0, 2), Some(&Value::String("Q01".to_string())));
    }

    #[test]
    fn coercion_failures_null_cells_instead_of_failing() {
        let table = normalize(ts_table(), &TIME_SERIES_SPEC, None).unwrap();
        assert_eq!(table.cell(0, 1), Some(&Value::Integer(2015)));
        assert_eq!(table.cell(0, 3), Some(&Value::Float(3.2)));
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(table.cell(1, 3), None);
    }

    #[test]
    fn earlier_alias_outranks_earlier_column() {
        // `amount` comes after `val` in the declared aliases, so `Val`
        // must become `value` even though `Amount` appears first.
        let mut table = Table::new(vec![
            "series_id".to_string(),
            "year".to_string(),
            "period".to_string(),
            "Amount".to_string(),
            "Val".to_string(),
        ]);
        table.push_row(vec![
            Some(Value::String("PRS30006032".to_string())),
            Some(Value::String("2015".to_string())),
            Some(Value::String("Q01".to_string())),
            Some(Value::String("999".to_string())),
            Some(Value::String("3.2".to_string())),
        ]);
        let table = normalize(table, &TIME_SERIES_SPEC, None).unwrap();
        assert_eq!(
            table.columns(),
            ["series_id", "year", "period", "Amount", "value"]
        );
        assert_eq!(table.cell(0, 4), Some(&Value::Float(3.2)));
        assert_eq!(
            table.cell(0, 3),
            Some(&Value::String("999".to_string()))
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(ts_table(), &TIME_SERIES_SPEC, None).unwrap();
        let twice = normalize(once.clone(), &TIME_SERIES_SPEC, None).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_required_column_lists_resolved_columns() {
        let mut table = Table::new(vec!["year".to_string(), "headcount".to_string()]);
        table.push_row(vec![
            Some(Value::String("2013".to_string())),
            Some(Value::String("100".to_string())),
        ]);
        let err = normalize(table, &POPULATION_SPEC, None).unwrap_err();
        assert_eq!(err.missing, ["population"]);
        assert_eq!(err.resolved, ["year", "headcount"]);
        assert!(err.to_string().contains("headcount"));
    }

    #[test]
    fn nation_filter_restricts_to_one_region() {
        let mut table = Table::new(vec![
            "Nation".to_string(),
            "Year".to_string(),
            "Population".to_string(),
        ]);
        table.push_row(vec![
            Some(Value::String("United States ".to_string())),
            Some(Value::String("2013".to_string())),
            Some(Value::Integer(100)),
        ]);
        table.push_row(vec![
            Some(Value::String("Canada".to_string())),
            Some(Value::String("2013".to_string())),
            Some(Value::Integer(35)),
        ]);
        let filter = nation_filter(&table).unwrap();
        assert_eq!(filter.column, "Nation");
        let table = normalize(table, &POPULATION_SPEC, Some(&filter)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 2), Some(&Value::Integer(100)));
    }

    #[test]
    fn nation_id_filter_is_used_when_nation_is_absent() {
        let mut table = Table::new(vec![
            "Nation ID".to_string(),
            "Year".to_string(),
            "Population".to_string(),
        ]);
        table.push_row(vec![
            Some(Value::String("01000us".to_string())),
            Some(Value::String("2013".to_string())),
            Some(Value::Integer(100)),
        ]);
        let filter = nation_filter(&table).unwrap();
        assert_eq!(filter.column, "Nation ID");
        let table = normalize(table, &POPULATION_SPEC, Some(&filter)).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn population_alias_resolves_capitalized_headers() {
        let mut table = Table::new(vec!["Year".to_string(), "Population".to_string()]);
        table.push_row(vec![
            Some(Value::String("2013".to_string())),
            Some(Value::Integer(316_000_000)),
        ]);
        let table = normalize(table, &POPULATION_SPEC, None).unwrap();
        assert_eq!(table.columns(), ["year", "population"]);
        assert_eq!(table.cell(0, 0), Some(&Value::Integer(2013)));
    }
}
