//! Logging setup shared by the `gtfs-merge` binary and the test suites.

pub mod tracing;
