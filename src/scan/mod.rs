//! Asynchronous chunk scanning

pub mod snapshot;
pub mod service;

pub use snapshot::{scan_snapshot, ChunkSnapshot, ChunkSource};
pub use service::{ScanRequest, ScanResult, ScanService};
