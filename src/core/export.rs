//! Record export: the user-triggered save of a completed verification
//!
//! Records are written as pretty JSON to the artifact directory; loading
//! back re-validates every digest so tampering is caught before display.

use crate::types::{KycError, KycRecord};

/// Save a record to a JSON file in `dir`, returning the path written
pub fn save_record(record: &KycRecord, dir: &str) -> Result<String, KycError> {
    let filename = format!("{}/{}.json", dir, record.id);

    let json = serde_json::to_string_pretty(record)
        .map_err(|e| KycError::Serialize(e.to_string()))?;

    std::fs::create_dir_all(dir).map_err(|e| KycError::Storage(e.to_string()))?;

    std::fs::write(&filename, json).map_err(|e| KycError::Storage(e.to_string()))?;

    Ok(filename)
}

/// Load a record from a JSON file
pub fn load_record(path: &str) -> Result<KycRecord, KycError> {
    let json = std::fs::read_to_string(path).map_err(|e| KycError::Storage(e.to_string()))?;

    serde_json::from_str(&json).map_err(|e| KycError::Serialize(e.to_string()))
}

/// Load a record and verify every artifact digest
pub fn load_and_validate_record(path: &str) -> Result<KycRecord, KycError> {
    let record = load_record(path)?;
    record.validate()?;
    Ok(record)
}

// =============================================================================
// TESTS
// =============================================================================
