// Survey administration module
pub mod survey;

// Batch, gate, retry and extraction utilities
pub mod workflow_utils;
