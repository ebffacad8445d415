//! Flattening of fetched records into one rectangular table.

use serde::Serialize;
use serde_json::Value;

use crate::error::RcsbError;
use crate::fetch::FetchResponse;

/// Row-labelled table. `Value::Null` marks a cell the record did not carry.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlatTable {
    pub row_labels: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl FlatTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn get(&self, row_label: &str, column: &str) -> Option<&Value> {
        let row = self.row_labels.iter().position(|label| label == row_label)?;
        let column = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Tab separated rendering with a leading `id` column; nulls become `NA`.
    pub fn to_tsv(&self) -> String {
        let mut out = String::from("id");
        for column in &self.columns {
            out.push('\t');
            out.push_str(column);
        }
        out.push('\n');
        for (label, row) in self.row_labels.iter().zip(&self.rows) {
            out.push_str(label);
            for cell in row {
                out.push('\t');
                out.push_str(&cell_text(cell));
            }
            out.push('\n');
        }
        out
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NA".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Flattens every record of `response` into one row, labelled by its requested id.
pub fn return_data_as_dataframe(response: &FetchResponse) -> Result<FlatTable, RcsbError> {
    if response.records.len() != response.ids.len() {
        return Err(RcsbError::MalformedResponse(format!(
            "{} records for {} ids",
            response.records.len(),
            response.ids.len()
        )));
    }

    let mut columns: Vec<String> = Vec::new();
    let mut flattened = Vec::with_capacity(response.records.len());
    for record in &response.records {
        let mut cells = Vec::new();
        flatten_value(&record.data, None, &mut cells);
        for (path, _) in &cells {
            if !columns.contains(path) {
                columns.push(path.clone());
            }
        }
        flattened.push(cells);
    }

    let rows: Vec<Vec<Value>> = flattened
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .map(|column| {
                    cells
                        .iter()
                        .find(|(path, _)| path == column)
                        .map(|(_, value)| value.clone())
                        .unwrap_or(Value::Null)
                })
                .collect()
        })
        .collect();

    let mut table = FlatTable {
        row_labels: response.ids.clone(),
        columns,
        rows,
    };
    strip_common_prefix(&mut table.columns);
    drop_id_echo(&mut table);
    Ok(table)
}

fn join_path(prefix: Option<&str>, segment: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{segment}"),
        None => segment.to_string(),
    }
}

fn flatten_value(value: &Value, prefix: Option<&str>, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                if let Some(prefix) = prefix {
                    out.push((prefix.to_string(), Value::Null));
                }
            }
            for (key, child) in map {
                let path = join_path(prefix, key);
                flatten_value(child, Some(&path), out);
            }
        }
        Value::Array(items) if items.len() == 1 => flatten_value(&items[0], prefix, out),
        Value::Array(items) if items.is_empty() => {
            if let Some(prefix) = prefix {
                out.push((prefix.to_string(), Value::Null));
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let path = join_path(prefix, &(index + 1).to_string());
                flatten_value(item, Some(&path), out);
            }
        }
        scalar => out.push((prefix.unwrap_or("value").to_string(), scalar.clone())),
    }
}

/// Removes the first path segment when every column starts with the same one.
fn strip_common_prefix(columns: &mut [String]) {
    let Some(first) = columns.first() else {
        return;
    };
    let Some((head, _)) = first.split_once('.') else {
        return;
    };
    let head = format!("{head}.");
    if columns.iter().all(|column| column.starts_with(&head)) {
        for column in columns.iter_mut() {
            *column = column[head.len()..].to_string();
        }
    }
}

fn drop_id_echo(table: &mut FlatTable) {
    if table.columns.is_empty() {
        return;
    }
    let echoes = table
        .rows
        .iter()
        .zip(&table.row_labels)
        .all(|(row, label)| row[0].as_str() == Some(label.as_str()));
    if echoes && !table.rows.is_empty() {
        table.columns.remove(0);
        for row in &mut table.rows {
            row.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fetch::{DataType, FetchedRecord};

    fn response(records: Vec<(&str, Value)>) -> FetchResponse {
        FetchResponse {
            data_type: DataType::Entry,
            ids: records.iter().map(|(id, _)| id.to_string()).collect(),
            records: records
                .into_iter()
                .map(|(id, data)| FetchedRecord {
                    id: id.to_string(),
                    data,
                })
                .collect(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn nested_records_share_one_schema() {
        let table = return_data_as_dataframe(&response(vec![
            (
                "4HHB",
                json!({"rcsb_id": "4HHB", "exptl": [{"method": "X-RAY DIFFRACTION"}], "cell": {"length_a": 63.15}}),
            ),
            ("1A3N", json!({"rcsb_id": "1A3N", "exptl": [{"method": "X-RAY DIFFRACTION"}]})),
        ]))
        .unwrap();

        assert_eq!(table.row_labels, vec!["4HHB", "1A3N"]);
        assert_eq!(table.columns, vec!["exptl.method", "cell.length_a"]);
        assert_eq!(table.get("1A3N", "cell.length_a"), Some(&Value::Null));
        assert_eq!(table.get("4HHB", "exptl.method"), Some(&json!("X-RAY DIFFRACTION")));
    }

    #[test]
    fn longer_arrays_get_one_based_indices() {
        let table = return_data_as_dataframe(&response(vec![(
            "4HHB",
            json!({"exptl": [{"method": "A"}, {"method": "B"}], "struct": {"title": "T"}}),
        )]))
        .unwrap();
        assert_eq!(
            table.columns,
            vec!["exptl.1.method", "exptl.2.method", "struct.title"]
        );
    }

    #[test]
    fn shared_leading_segment_is_stripped() {
        let table = return_data_as_dataframe(&response(vec![
            ("4HHB", json!({"cell": {"length_a": 1.0, "length_b": 2.0}})),
            ("1A3N", json!({"cell": {"length_a": 3.0}})),
        ]))
        .unwrap();
        assert_eq!(table.columns, vec!["length_a", "length_b"]);
        assert_eq!(table.column("length_b").unwrap(), vec![&json!(2.0), &Value::Null]);
    }

    #[test]
    fn tsv_marks_missing_cells() {
        let table = return_data_as_dataframe(&response(vec![
            ("4HHB", json!({"struct": {"title": "HEMOGLOBIN"}, "exptl": {"method": "X"}})),
            ("1A3N", json!({"exptl": {"method": "Y"}})),
        ]))
        .unwrap();
        assert_eq!(
            table.to_tsv(),
            "id\tstruct.title\texptl.method\n4HHB\tHEMOGLOBIN\tX\n1A3N\tNA\tY\n"
        );
    }
}
