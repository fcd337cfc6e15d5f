//! dBASE attribute table mapping between [`Value`] and `FieldValue`.

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use tracing::warn;

use gridmerge_shared::{GridMergeError, Result, Value};

use crate::FeatureSet;

/// dBASE field names hold at most 10 characters.
const MAX_FIELD_NAME_LEN: usize = 10;
/// Character fields hold at most 254 bytes.
const MAX_CHARACTER_LEN: usize = 254;
/// Default width of numeric fields, sign and decimal point included.
const NUMERIC_WIDTH: usize = 24;
/// Widest field a dBASE header can describe.
const MAX_FIELD_WIDTH: usize = u8::MAX as usize;
const MAX_DECIMALS: usize = 15;

/// Convert one dBASE field value.
pub(crate) fn to_value(field: &FieldValue) -> Value {
    match field {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            let trimmed = s.trim_end();
            if trimmed.is_empty() {
                Value::Missing
            } else {
                Value::Text(trimmed.to_string())
            }
        }
        FieldValue::Numeric(Some(n)) => Value::Number(*n),
        FieldValue::Float(Some(f)) => Value::Number(f64::from(*f)),
        FieldValue::Double(d) | FieldValue::Currency(d) => Value::Number(*d),
        FieldValue::Integer(i) => Value::Number(f64::from(*i)),
        FieldValue::Logical(Some(b)) => Value::Bool(*b),
        FieldValue::Date(Some(date)) => Value::Text(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        _ => Value::Missing,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Numeric { width: u8, decimals: u8 },
    Logical,
    Character { length: u8 },
}

#[derive(Debug, Clone)]
struct FieldPlan {
    name: String,
    kind: FieldKind,
}

/// Field names and types chosen for writing a [`FeatureSet`].
#[derive(Debug, Clone)]
pub(crate) struct TableLayout {
    fields: Vec<FieldPlan>,
}

impl TableLayout {
    /// Pick a dBASE name and type for every attribute field.
    pub(crate) fn plan(set: &FeatureSet) -> Result<Self> {
        let names = field_names(&set.fields);
        let fields = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let values: Vec<&Value> = set
                    .features
                    .iter()
                    .map(|f| &f.attributes[idx])
                    .filter(|v| !v.is_missing())
                    .collect();
                let kind = infer_kind(&values).ok_or_else(|| {
                    GridMergeError::Shapefile(format!(
                        "field '{}' holds numbers too wide for a dBASE numeric field",
                        set.fields[idx]
                    ))
                })?;
                Ok(FieldPlan { name, kind })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn builder(&self) -> Result<TableWriterBuilder> {
        let mut builder = TableWriterBuilder::new();
        for field in &self.fields {
            let name = FieldName::try_from(field.name.as_str()).map_err(|e| {
                GridMergeError::Shapefile(format!("invalid field name '{}': {e:?}", field.name))
            })?;
            builder = match field.kind {
                FieldKind::Numeric { width, decimals } => {
                    builder.add_numeric_field(name, width, decimals)
                }
                FieldKind::Logical => builder.add_logical_field(name),
                FieldKind::Character { length } => builder.add_character_field(name, length),
            };
        }
        Ok(builder)
    }

    /// Build the record for one feature's attributes.
    pub(crate) fn record(&self, attributes: &[Value]) -> Record {
        let mut record = Record::default();
        for (field, value) in self.fields.iter().zip(attributes) {
            let field_value = match field.kind {
                FieldKind::Numeric { .. } => FieldValue::Numeric(match value {
                    Value::Number(n) => Some(*n),
                    _ => None,
                }),
                FieldKind::Logical => FieldValue::Logical(match value {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                }),
                FieldKind::Character { .. } => FieldValue::Character(match value {
                    Value::Missing => None,
                    other => Some(truncate(other.to_string(), MAX_CHARACTER_LEN)),
                }),
            };
            record.insert(field.name.clone(), field_value);
        }
        record
    }
}

/// Pick a field type for the non-missing values of one column.
///
/// Returns `None` when a number's integer part exceeds the widest numeric
/// field, since dBASE would silently cut it.
fn infer_kind(values: &[&Value]) -> Option<FieldKind> {
    if !values.is_empty() && values.iter().all(|v| matches!(v, Value::Number(_))) {
        let int_digits = values
            .iter()
            .filter_map(|v| match v {
                Value::Number(n) if n.is_finite() => Some(integer_width(*n)),
                _ => None,
            })
            .max()
            .unwrap_or(1);
        if int_digits > MAX_FIELD_WIDTH {
            return None;
        }
        // Leave room for the decimal point.
        let decimals = NUMERIC_WIDTH
            .saturating_sub(int_digits + 1)
            .min(MAX_DECIMALS);
        return Some(FieldKind::Numeric {
            width: int_digits.max(NUMERIC_WIDTH) as u8,
            decimals: decimals as u8,
        });
    }

    if !values.is_empty() && values.iter().all(|v| matches!(v, Value::Bool(_))) {
        return Some(FieldKind::Logical);
    }

    let longest = values
        .iter()
        .map(|v| v.to_string().len())
        .max()
        .unwrap_or(1);
    Some(FieldKind::Character {
        length: longest.clamp(1, MAX_CHARACTER_LEN) as u8,
    })
}

/// Characters needed for the integer part, sign included.
fn integer_width(n: f64) -> usize {
    let digits = n.abs().trunc().to_string().len();
    if n < 0.0 { digits + 1 } else { digits }
}

/// Truncate names to the dBASE limit, suffixing digits to keep them unique.
fn field_names(fields: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let mut name: String = field.chars().take(MAX_FIELD_NAME_LEN).collect();
        if name.len() < field.len() {
            warn!(field = %field, truncated = %name, "field name truncated to 10 characters");
        }

        let mut n = 1;
        while out.contains(&name) {
            let suffix = n.to_string();
            let stem: String = field
                .chars()
                .take(MAX_FIELD_NAME_LEN - suffix.len())
                .collect();
            name = format!("{stem}{suffix}");
            n += 1;
        }
        out.push(name);
    }
    out
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated_and_unique() {
        let names = field_names(&[
            "ZipSubregion".into(),
            "ZipSubregionName".into(),
            "SRCO2EQA".into(),
        ]);
        assert_eq!(names, vec!["ZipSubregi", "ZipSubreg1", "SRCO2EQA"]);
    }

    #[test]
    fn numeric_decimals_shrink_for_large_values() {
        let small = Value::Number(10.5);
        let large = Value::Number(48_123_456_789.0);
        assert_eq!(
            infer_kind(&[&small]),
            Some(FieldKind::Numeric { width: 24, decimals: 15 })
        );
        assert_eq!(
            infer_kind(&[&small, &large]),
            Some(FieldKind::Numeric { width: 24, decimals: 12 })
        );
    }

    #[test]
    fn numeric_width_grows_past_default() {
        let huge = Value::Number(1.5e25);
        assert_eq!(
            infer_kind(&[&huge]),
            Some(FieldKind::Numeric { width: 26, decimals: 0 })
        );
        let negative = Value::Number(-1.0e23);
        assert_eq!(
            infer_kind(&[&negative]),
            Some(FieldKind::Numeric { width: 25, decimals: 0 })
        );
    }

    #[test]
    fn numbers_beyond_field_limit_are_rejected() {
        let too_wide = Value::Number(1.0e300);
        assert_eq!(infer_kind(&[&too_wide]), None);

        let set = FeatureSet {
            fields: vec!["BIG".into()],
            features: vec![crate::Feature {
                shape: crate::Shape::Point(crate::Point::new(0.0, 0.0)),
                attributes: vec![too_wide],
            }],
            projection: None,
        };
        let err = TableLayout::plan(&set).unwrap_err();
        assert!(matches!(err, GridMergeError::Shapefile(ref msg) if msg.contains("BIG")));
    }

    #[test]
    fn mixed_values_become_character() {
        let a = Value::Text("AKGD".into());
        let b = Value::Number(7.0);
        assert_eq!(infer_kind(&[&a, &b]), Some(FieldKind::Character { length: 4 }));
        assert_eq!(infer_kind(&[]), Some(FieldKind::Character { length: 1 }));
    }

    #[test]
    fn character_values_trim_padding() {
        let v = to_value(&FieldValue::Character(Some("AKGD      ".into())));
        assert_eq!(v, Value::Text("AKGD".into()));
        assert!(to_value(&FieldValue::Numeric(None)).is_missing());
        assert_eq!(to_value(&FieldValue::Integer(3)), Value::Number(3.0));
    }
}
