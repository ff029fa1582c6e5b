// Data models for echo payloads

pub mod echo;

pub use echo::{canonical_array, TestData, TestDataArray};
