use crate::models::ScanReport;
use super::FormatError;

/// Serialize a ScanReport to YAML
pub fn to_yaml(report: &ScanReport) -> Result<String, FormatError> {
    serde_yaml::to_string(report).map_err(FormatError::from)
}
