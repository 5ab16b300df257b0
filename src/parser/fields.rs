//! Line-shape helpers shared by every scheduler parser.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::OutputError;

/// Split `line` on `delimiter` and require exactly `expected` fields.
pub fn split_fields<'a>(
    line: &'a str,
    delimiter: char,
    expected: usize,
) -> Result<Vec<&'a str>, OutputError> {
    let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
    if fields.len() != expected {
        return Err(OutputError::FieldCount {
            expected,
            actual: fields.len(),
            line: line.to_string(),
        });
    }
    Ok(fields)
}

/// Whitespace-split `line` and require between `min` and `max` columns.
pub fn split_columns(line: &str, min: usize, max: usize) -> Result<Vec<&str>, OutputError> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < min || columns.len() > max {
        return Err(OutputError::ColumnCount {
            min,
            max,
            actual: columns.len(),
            line: line.to_string(),
        });
    }
    Ok(columns)
}

/// Zip a whitespace-tokenized header line with the value line beneath it.
pub fn zip_header(header: &str, values: &str) -> Result<BTreeMap<String, String>, OutputError> {
    let keys: Vec<&str> = header.split_whitespace().collect();
    let vals: Vec<&str> = values.split_whitespace().collect();
    if keys.len() != vals.len() {
        return Err(OutputError::TokenCount {
            keys: keys.len(),
            values: vals.len(),
        });
    }
    Ok(keys
        .into_iter()
        .zip(vals)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}

/// `Key=Value` segments of one whitespace-separated line. Only the first `=`
/// splits; segments without one are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    line: String,
    values: BTreeMap<String, String>,
}

impl KeyValues {
    pub fn parse(line: &str) -> Self {
        let values = line
            .split_whitespace()
            .filter_map(|segment| segment.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            line: line.to_string(),
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, OutputError> {
        self.get(key).ok_or_else(|| OutputError::MissingKey {
            key: key.to_string(),
            line: self.line.clone(),
        })
    }

    /// A required key whose value must parse as `T`.
    pub fn require_parsed<T: FromStr>(&self, key: &str) -> Result<T, OutputError> {
        let raw = self.require(key)?;
        parse_value(key, raw)
    }
}

/// Parse a field, reporting the field name and raw text on failure.
pub fn parse_value<T: FromStr>(field: &str, raw: &str) -> Result<T, OutputError> {
    raw.trim().parse().map_err(|_| OutputError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Collapse runs of whitespace to one space and trim the ends.
pub fn squash_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Non-empty lines of an output stream.
pub fn content_lines(lines: &[String]) -> impl Iterator<Item = &str> {
    lines.iter().map(String::as_str).filter(|l| !l.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_count_must_match() {
        let fields = split_fields("debug| n[1-2] |4|all", '|', 4).unwrap();
        assert_eq!(fields, vec!["debug", "n[1-2]", "4", "all"]);

        let err = split_fields("debug|n1|4", '|', 4).unwrap_err();
        assert_eq!(
            err,
            OutputError::FieldCount {
                expected: 4,
                actual: 3,
                line: "debug|n1|4".to_string(),
            }
        );
        assert!(split_fields("a|b|c|d|e", '|', 4).is_err());
    }

    #[test]
    fn header_zip_requires_equal_token_counts() {
        let map = zip_header("PARTITION AVAIL  TIMELIMIT", "debug*  up  infinite").unwrap();
        assert_eq!(map["AVAIL"], "up");
        assert_eq!(map["PARTITION"], "debug*");

        let err = zip_header("A B C", "1 2").unwrap_err();
        assert_eq!(err, OutputError::TokenCount { keys: 3, values: 2 });
    }

    #[test]
    fn key_values_split_on_first_equals() {
        let kv = KeyValues::parse("NodeName=n1 Arch=x86_64 Reason=a=b  Flag");
        assert_eq!(kv.get("NodeName"), Some("n1"));
        assert_eq!(kv.get("Reason"), Some("a=b"));
        assert_eq!(kv.get("Flag"), None);

        let err = kv.require("CPUTot").unwrap_err();
        assert!(matches!(err, OutputError::MissingKey { ref key, .. } if key == "CPUTot"));
    }

    #[test]
    fn parsed_values_report_field() {
        let kv = KeyValues::parse("CPUTot=four");
        let err = kv.require_parsed::<u32>("CPUTot").unwrap_err();
        assert_eq!(
            err,
            OutputError::InvalidValue {
                field: "CPUTot".to_string(),
                value: "four".to_string(),
            }
        );
    }

    #[test]
    fn columns_within_bounds() {
        assert_eq!(split_columns("a  b\tc", 2, 3).unwrap(), vec!["a", "b", "c"]);
        assert!(matches!(
            split_columns("a", 2, 3),
            Err(OutputError::ColumnCount { actual: 1, .. })
        ));
    }

    #[test]
    fn squash_collapses_runs() {
        assert_eq!(squash_whitespace("  Slurmctld(primary)  at  host1 is UP "), "Slurmctld(primary) at host1 is UP");
    }
}
