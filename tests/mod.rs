//! Integration test modules for adgraph-collector.
//!
//! This module organizes all integration tests that verify
//! end-to-end behavior of the collection pipeline.

mod method_tests;
