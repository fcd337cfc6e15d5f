//! Left join of a tabular record set onto boundary features.
//!
//! Every boundary feature survives, in order. Tabular columns other than the
//! key are appended after the boundary fields; features without a matching
//! row get [`Value::Missing`] in each of them.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use gridmerge_boundary::{Feature, FeatureSet};
use gridmerge_shared::{GridMergeError, Result, Table, Value};

/// Suffix for a boundary field that collides with a tabular column.
const LEFT_SUFFIX: &str = "_x";
/// Suffix for a tabular column that collides with a boundary field.
const RIGHT_SUFFIX: &str = "_y";

/// Output of a left join.
#[derive(Debug, Clone)]
pub struct JoinResult {
    /// The joined feature set (same length as the boundary input).
    pub features: FeatureSet,
    /// Features that found a tabular row.
    pub matched: usize,
    /// Tabular rows ignored because an earlier row had the same key.
    pub duplicate_keys: usize,
}

/// Read the boundary file at `boundary_path` and left-join `table` onto it by `on`.
#[instrument(skip(table), fields(boundary = %boundary_path.display(), rows = table.len()))]
pub fn merge_boundaries(table: &Table, boundary_path: &Path, on: &str) -> Result<JoinResult> {
    let boundaries = gridmerge_boundary::read_feature_set(boundary_path)?;
    left_join(boundaries, table, on)
}

/// Left-join `table` onto `left` using the column `on`, present in both.
///
/// If `on` is missing from either side the join fails instead of producing an
/// all-missing result.
pub fn left_join(left: FeatureSet, table: &Table, on: &str) -> Result<JoinResult> {
    let left_key = left.field_index(on).ok_or_else(|| {
        GridMergeError::validation(format!(
            "join key '{on}' not found in boundary fields {:?}",
            left.fields
        ))
    })?;
    let right_key = table.column_index(on).ok_or_else(|| {
        GridMergeError::validation(format!(
            "join key '{on}' not found in tabular columns {:?}",
            table.columns
        ))
    })?;

    let right_columns: Vec<usize> = (0..table.columns.len())
        .filter(|&i| i != right_key)
        .collect();

    let (left_fields, right_fields) = joined_field_names(&left.fields, table, &right_columns, on);

    // First row wins for repeated keys.
    let mut index: HashMap<String, usize> = HashMap::with_capacity(table.len());
    let mut duplicate_keys = 0;
    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(key) = row[right_key].join_key() else {
            continue;
        };
        if index.contains_key(&key) {
            duplicate_keys += 1;
        } else {
            index.insert(key, row_idx);
        }
    }
    if duplicate_keys > 0 {
        warn!(
            duplicate_keys,
            key = on,
            "tabular data has repeated join keys, keeping the first row for each"
        );
    }

    let mut matched = 0;
    let features: Vec<Feature> = left
        .features
        .into_iter()
        .map(|mut feature| {
            let row = feature.attributes[left_key]
                .join_key()
                .and_then(|k| index.get(&k))
                .map(|&i| &table.rows[i]);

            match row {
                Some(row) => {
                    matched += 1;
                    feature
                        .attributes
                        .extend(right_columns.iter().map(|&c| row[c].clone()));
                }
                None => feature
                    .attributes
                    .extend(right_columns.iter().map(|_| Value::Missing)),
            }
            feature
        })
        .collect();

    let total = features.len();
    info!(features = total, matched, unmatched = total - matched, "left join complete");

    let mut fields = left_fields;
    fields.extend(right_fields);

    Ok(JoinResult {
        features: FeatureSet {
            fields,
            features,
            projection: left.projection,
        },
        matched,
        duplicate_keys,
    })
}

/// Output names for the boundary fields and the appended tabular columns.
fn joined_field_names(
    left_fields: &[String],
    table: &Table,
    right_columns: &[usize],
    on: &str,
) -> (Vec<String>, Vec<String>) {
    let right_names: Vec<&String> = right_columns.iter().map(|&c| &table.columns[c]).collect();

    let left_out = left_fields
        .iter()
        .map(|f| {
            if f != on && right_names.contains(&f) {
                format!("{f}{LEFT_SUFFIX}")
            } else {
                f.clone()
            }
        })
        .collect();

    let right_out = right_names
        .iter()
        .map(|&name| {
            if left_fields.iter().any(|f| f == name && f != on) {
                debug!(column = %name, "column present on both sides, suffixing");
                format!("{name}{RIGHT_SUFFIX}")
            } else {
                name.clone()
            }
        })
        .collect();

    (left_out, right_out)
}
