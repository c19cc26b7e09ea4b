//! Crate-wide test suites for dora-graph.
