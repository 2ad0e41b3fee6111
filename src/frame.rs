use serde_json::{Map, Value};

/// Uniform tabular result produced by every fetch operation.
///
/// Rows are ordered field-to-value mappings straight from the wire; the
/// column set is the union of keys seen, in first-seen order. No typing or
/// coercion happens here — values stay as the JSON the API returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame from raw records, computing the column union.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Self {
        let mut frame = Self::new();
        for record in records {
            frame.push(record);
        }
        frame
    }

    /// Append one record, registering any columns not seen before.
    pub fn push(&mut self, record: Map<String, Value>) {
        for key in record.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(record);
    }

    /// Append all rows of another frame, merging its column set.
    pub fn append(&mut self, other: Frame) {
        for record in other.rows {
            self.push(record);
        }
    }

    /// Add a constant-valued column to every row. Used by extractors to tag
    /// rows with foreign-key context (`repo_name`, `pr_number`) that the raw
    /// endpoint does not include.
    pub fn tag(&mut self, column: &str, value: Value) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
        for row in &mut self.rows {
            row.insert(column.to_string(), value.clone());
        }
    }

    /// Register a column without touching any rows. Lets a reader preserve
    /// the declared column set of a zero-row artifact.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Collect a column's string values, skipping rows where it is absent
    /// or not a string.
    pub fn strings(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Group one integer column's values by another string column, preserving
    /// first-seen group order. This is how PR numbers are fanned out per repo
    /// for the reviews step.
    pub fn group_u64_by(&self, key_column: &str, value_column: &str) -> Vec<(String, Vec<u64>)> {
        let mut groups: Vec<(String, Vec<u64>)> = Vec::new();
        for row in &self.rows {
            let (Some(key), Some(value)) = (
                row.get(key_column).and_then(Value::as_str),
                row.get(value_column).and_then(Value::as_u64),
            ) else {
                continue;
            };
            match groups.iter_mut().find(|(k, _)| k == key) {
                Some((_, values)) => values.push(value),
                None => groups.push((key.to_string(), vec![value])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_columns_are_union_in_first_seen_order() {
        let frame = Frame::from_records(vec![
            record(json!({"a": 1, "b": 2})),
            record(json!({"b": 3, "c": 4})),
        ]);
        assert_eq!(frame.columns(), ["a", "b", "c"]);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_tag_adds_constant_column() {
        let mut frame = Frame::from_records(vec![
            record(json!({"number": 1})),
            record(json!({"number": 2})),
        ]);
        frame.tag("repo_name", json!("acme/platform"));
        assert!(frame.has_column("repo_name"));
        assert_eq!(
            frame.strings("repo_name"),
            vec!["acme/platform", "acme/platform"]
        );
    }

    #[test]
    fn test_append_merges_column_sets() {
        let mut left = Frame::from_records(vec![record(json!({"a": 1}))]);
        let right = Frame::from_records(vec![record(json!({"b": 2}))]);
        left.append(right);
        assert_eq!(left.columns(), ["a", "b"]);
        assert_eq!(left.len(), 2);
    }

    #[test]
    fn test_group_u64_by_preserves_group_order() {
        let frame = Frame::from_records(vec![
            record(json!({"repo_name": "a/x", "number": 1})),
            record(json!({"repo_name": "b/y", "number": 7})),
            record(json!({"repo_name": "a/x", "number": 2})),
        ]);
        let groups = frame.group_u64_by("repo_name", "number");
        assert_eq!(
            groups,
            vec![
                ("a/x".to_string(), vec![1, 2]),
                ("b/y".to_string(), vec![7]),
            ]
        );
    }

    #[test]
    fn test_empty_frame_has_no_columns() {
        let frame = Frame::new();
        assert!(frame.is_empty());
        assert!(frame.columns().is_empty());
        assert!(frame.strings("anything").is_empty());
    }
}
