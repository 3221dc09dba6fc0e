//! Library crate for upload-scan-rs exposing reusable modules.
pub mod error;
pub mod executor;
pub mod paths;
pub mod report;
pub mod scanner;
pub mod targets;
pub mod types;
