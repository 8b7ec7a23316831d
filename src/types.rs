//! Shared data types for query results and statistics.

use serde::{Deserialize, Serialize};

/// One result record from the query engine: column name to scalar value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Latest value resolved for one requested metric or alarm name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    /// Scalar value of the most recent sample, `null` when the engine row
    /// carried no value column.
    pub value: Option<serde_json::Value>,

    /// Device-local timestamp of the most recent sample.
    pub localtime: Option<serde_json::Value>,
}

/// Read-only snapshot of throttle occupancy and configuration.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Queries admitted within the trailing window
    pub queries_in_window: usize,

    /// Admission ceiling per window
    pub max_per_window: usize,

    /// Window length in seconds
    pub window_secs: u64,

    /// Default cache TTL in seconds
    pub default_ttl_secs: u64,

    /// Whether a query client handle has been constructed
    pub client_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_reading_roundtrip() {
        let reading = MetricReading {
            value: Some(serde_json::json!(48.2)),
            localtime: Some(serde_json::json!("2024-05-01T12:00:00Z")),
        };

        let bytes = serde_json::to_vec(&reading).unwrap();
        let back: MetricReading = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_metric_reading_null_fields() {
        let reading: MetricReading =
            serde_json::from_str(r#"{"value": null, "localtime": null}"#).unwrap();
        assert_eq!(reading.value, None);
        assert_eq!(reading.localtime, None);
    }
}
