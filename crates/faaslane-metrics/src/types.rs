//! Wire types for the metrics query API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An instant-query request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Evaluation timestamp; the server's current time when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            time: None,
        }
    }
}

/// Top-level query response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: QueryData,
    #[serde(default, rename = "errorType", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result payload: a result type plus an ordered list of results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(default, rename = "resultType")]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<QueryResult>,
}

/// One series in a query result.
///
/// `value` is the two-element `[timestamp, "value"]` pair; the second
/// element is a string-encoded float.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_time() {
        let body = serde_json::to_string(&QueryRequest::new("up")).unwrap();
        assert_eq!(body, r#"{"query":"up"}"#);
    }

    #[test]
    fn request_includes_time_when_set() {
        let mut req = QueryRequest::new("up");
        req.time = Some("1730000000".to_string());
        let body = serde_json::to_string(&req).unwrap();
        assert!(body.contains(r#""time":"1730000000""#));
    }

    #[test]
    fn response_parses_upstream_shape() {
        let raw = r#"{
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {
                        "metric": {"function": "resize", "node": "n1"},
                        "value": [1730000000.781, "9.25"]
                    }
                ]
            }
        }"#;
        let resp: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.status, "success");
        assert_eq!(resp.data.result_type, "vector");
        assert_eq!(resp.data.result[0].metric["function"], "resize");
        assert_eq!(resp.data.result[0].value.1, "9.25");
    }

    #[test]
    fn error_response_parses() {
        let raw = r#"{"status":"error","errorType":"bad_data","error":"parse error","data":{}}"#;
        let resp: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.status, "error");
        assert_eq!(resp.error_type.as_deref(), Some("bad_data"));
        assert!(resp.data.result.is_empty());
    }
}
