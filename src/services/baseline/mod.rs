//! Baseline: the pristine effective view of the client's data archives.

pub mod extractor;
pub mod load_order;
pub mod manifest;
pub mod resolver;

pub use extractor::{extract_baseline, ExtractIssue, ExtractReport};
pub use manifest::BaselineManifest;

#[cfg(test)]
#[path = "tests/baseline_tests.rs"]
mod tests;
