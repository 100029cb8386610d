//! JSON export of recorder summaries.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialise any recorder summary (or a map of them) to pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiscreteRecord;
    use std::collections::BTreeMap;

    #[test]
    fn test_summary_export() {
        let mut record = DiscreteRecord::new();
        record.record(1.0);
        record.record(2.0);

        let mut report = BTreeMap::new();
        report.insert("waiting", record.summary());

        let json = to_json(&report).unwrap();
        assert!(json.contains("\"waiting\""));
        assert!(json.contains("\"count\": 2"));
    }
}
