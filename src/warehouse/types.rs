//! Wire types for the BigQuery `jobs.query` / `jobs.getQueryResults` REST API.
//!
//! Only the fields the job reads are modelled. Cell values arrive as strings
//! (or null) regardless of column type; typed parsing happens in `rows`.

use serde::{Deserialize, Serialize};

/// Body of a `jobs.query` request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub parameter_mode: String,
    pub query_parameters: Vec<QueryParameterJson>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameterJson {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterValue {
    pub value: String,
}

/// One page of query results
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_complete: Option<bool>,
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Option<Vec<TableRow>>,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableField>,
}

#[derive(Debug, Deserialize)]
pub struct TableField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TableRow {
    pub f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

impl TableCell {
    /// Cell as an optional string; nested values are kept as JSON text
    pub fn into_value(self) -> Option<String> {
        match self.v {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

/// Error envelope returned alongside non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Engine-agnostic tabular result: column names plus stringly cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_query_response() {
        let body = r#"{
            "kind": "bigquery#queryResponse",
            "jobComplete": true,
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "schema": {"fields": [{"name": "os", "type": "STRING"}, {"name": "count", "type": "INTEGER"}]},
            "rows": [{"f": [{"v": "Darwin-19.6.0"}, {"v": "12"}]}, {"f": [{"v": null}, {"v": "3"}]}],
            "totalRows": "2"
        }"#;

        let response: QueryResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.job_complete, Some(true));
        assert_eq!(response.job_reference.unwrap().job_id, "job_1");
        assert_eq!(response.schema.unwrap().fields.len(), 2);

        let rows = response.rows.unwrap();
        let cells: Vec<Option<String>> = rows
            .into_iter()
            .next()
            .unwrap()
            .f
            .into_iter()
            .map(TableCell::into_value)
            .collect();
        assert_eq!(cells, vec![Some("Darwin-19.6.0".to_string()), Some("12".to_string())]);
        assert!(response.page_token.is_none());
    }

    #[test]
    fn test_serialize_query_request() {
        let request = QueryRequest {
            query: "SELECT 1".to_string(),
            use_legacy_sql: false,
            parameter_mode: "NAMED".to_string(),
            query_parameters: vec![QueryParameterJson {
                name: "date_from".to_string(),
                parameter_type: ParameterType {
                    kind: "DATE".to_string(),
                },
                parameter_value: ParameterValue {
                    value: "2024-01-01".to_string(),
                },
            }],
            timeout_ms: 1000,
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["useLegacySql"], false);
        assert_eq!(json["parameterMode"], "NAMED");
        assert_eq!(json["queryParameters"][0]["parameterType"]["type"], "DATE");
        assert_eq!(json["queryParameters"][0]["parameterValue"]["value"], "2024-01-01");
    }
}
