//! Three-way reconciliation of a new contact batch against the stored table.
//!
//! Every output row is classified exactly once:
//! - new: key present only in the new batch
//! - unchanged: key present only in the stored table
//! - updated: key present in both; fixed columns keep their stored values,
//!   update columns take the freshly fetched ones
//!
//! Joins are explicit hash joins on the merge-key tuple. The buckets are cut
//! from an outer join by null-side inference and from an inner join for the
//! overlap, then cleaned back to the stored table's column order.

use serde::Deserialize;

use super::table::{concat, inner_join, outer_join, Table, TableError};

/// Column roles driving a reconciliation, loaded from the tool config.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Join keys identifying the same logical contact, typically `[EMAIL]`.
    pub merge_columns: Vec<String>,
    /// Columns that keep their stored value when a key matches.
    #[serde(default)]
    pub fixed_columns: Vec<String>,
    /// Columns overwritten from the new batch when a key matches.
    #[serde(default)]
    pub update_columns: Vec<String>,
    /// Optional ordering column for the final table.
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Sort direction; the default is descending.
    #[serde(default)]
    pub ascending: bool,
}

const SUFFIX_NEW: &str = "_new";
const SUFFIX_OLD: &str = "_old";

/// Merge `new_rows` into `original_rows` per the configured column roles.
///
/// `original_rows` must already carry the canonical schema (it is either the
/// product of a previous reconciliation or a freshly seeded header); a
/// missing expected column is fatal for the run. The returned table has the
/// stored column order, one row per distinct merge key, sorted by
/// `sort_by` when configured.
pub fn reconcile(
    new_rows: &Table,
    original_rows: &Table,
    config: &MergeConfig,
) -> Result<Table, TableError> {
    let suffixes = (SUFFIX_NEW, SUFFIX_OLD);
    let strip_pattern = [SUFFIX_NEW, SUFFIX_OLD].join("|");

    // An update column that is also a merge column would fight the join key.
    let update_columns: Vec<String> = config
        .update_columns
        .iter()
        .filter(|col| {
            let conflicts = config.merge_columns.contains(col);
            if conflicts {
                log::debug!("update column {} is a merge column, ignoring it", col);
            }
            !conflicts
        })
        .cloned()
        .collect();

    let original_columns = original_rows.columns().to_vec();

    let merged = outer_join(new_rows, original_rows, &config.merge_columns, suffixes)?;
    let update_pool = inner_join(new_rows, original_rows, &config.merge_columns, suffixes)?;

    let tracked: Vec<String> = config
        .fixed_columns
        .iter()
        .chain(update_columns.iter())
        .cloned()
        .collect();
    let old_tracked: Vec<String> = tracked.iter().map(|c| format!("{c}{SUFFIX_OLD}")).collect();
    let new_tracked: Vec<String> = tracked.iter().map(|c| format!("{c}{SUFFIX_NEW}")).collect();

    // New: nothing on the stored side of the outer join.
    let new_data = rows_where_all_none(&merged, &old_tracked)?;
    let drop = columns_with_suffix(&new_data, SUFFIX_OLD);
    let new_data = new_data.clean_columns(&drop, &strip_pattern, Some(&original_columns))?;

    // Unchanged: no fresh data for this key this run.
    let no_change_data = rows_where_all_none(&merged, &new_tracked)?;
    let drop = columns_with_suffix(&no_change_data, SUFFIX_NEW);
    let no_change_data = no_change_data.clean_columns(&drop, &strip_pattern, Some(&original_columns))?;

    // Updated: stored values win everywhere except the update columns.
    let mut drop: Vec<String> = update_columns
        .iter()
        .map(|c| format!("{c}{SUFFIX_OLD}"))
        .collect();
    for column in columns_with_suffix(&update_pool, SUFFIX_NEW) {
        let base = &column[..column.len() - SUFFIX_NEW.len()];
        if !update_columns.iter().any(|c| c == base) {
            drop.push(column);
        }
    }
    let update_data = update_pool.clean_columns(&drop, &strip_pattern, Some(&original_columns))?;

    let mut updated = concat(vec![new_data, no_change_data, update_data])?;
    if let Some(ref sort_by) = config.sort_by {
        updated.sort_by_column(sort_by, config.ascending)?;
    }
    Ok(updated)
}

/// Rows where every listed column is a join non-match.
fn rows_where_all_none(table: &Table, columns: &[String]) -> Result<Table, TableError> {
    let indices = columns
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| TableError::MissingColumn(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rows = table
        .rows()
        .iter()
        .filter(|row| indices.iter().all(|&i| row[i].is_none()))
        .cloned()
        .collect();
    Table::with_rows(table.columns().to_vec(), rows)
}

fn columns_with_suffix(table: &Table, suffix: &str) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| c.ends_with(suffix))
        .cloned()
        .collect()
}
