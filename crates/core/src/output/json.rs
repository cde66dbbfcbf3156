use crate::models::ScanReport;
use super::FormatError;

/// Serialize a ScanReport to pretty-printed JSON
pub fn to_json(report: &ScanReport) -> Result<String, FormatError> {
    serde_json::to_string_pretty(report).map_err(FormatError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample_report;

    #[test]
    fn test_to_json() {
        let json = to_json(&sample_report()).unwrap();
        assert!(json.contains("\"root\""));
        assert!(json.contains("\"cumulative\""));
        assert!(json.contains("\"kind\": \"source\""));
        assert!(!json.contains("\"resolved\""));
    }
}
