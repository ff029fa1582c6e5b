use serde::{Deserialize, Serialize};

// ==================================================================================================
// Echo Payloads
// ==================================================================================================

/// Label carried by every canonical record
pub const CANONICAL_LABEL: &str = "XXXXXXXXXXXXXXXXXXXX";

/// Structured record sent to and echoed back by the service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    pub index: i32,
    pub ratio: f32,
    pub magnitude: f64,
    pub label: String,
}

impl TestData {
    pub fn new(index: i32, ratio: f32, magnitude: f64, label: impl Into<String>) -> Self {
        Self {
            index,
            ratio,
            magnitude,
            label: label.into(),
        }
    }

    /// The record used by every benchmark payload
    pub fn canonical() -> Self {
        Self::new(1, 12.6, 1e40, CANONICAL_LABEL)
    }
}

/// Ordered sequence of records for the array copy benchmark
pub type TestDataArray = Vec<TestData>;

/// Build an array of `len` canonical records
pub fn canonical_array(len: usize) -> TestDataArray {
    (0..len).map(|_| TestData::canonical()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_record() {
        let data = TestData::canonical();
        assert_eq!(data.index, 1);
        assert!((data.ratio - 12.6).abs() < f32::EPSILON);
        assert_eq!(data.magnitude, 1e40);
        assert_eq!(data.label.len(), 20);
    }

    #[test]
    fn test_canonical_array_sizes() {
        assert!(canonical_array(0).is_empty());
        let array = canonical_array(4);
        assert_eq!(array.len(), 4);
        assert!(array.iter().all(|d| *d == TestData::canonical()));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(TestData::canonical()).unwrap();
        assert_eq!(json["index"], 1);
        assert_eq!(json["label"], CANONICAL_LABEL);
        assert!(json.get("magnitude").is_some());
    }
}
