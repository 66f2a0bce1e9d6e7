//! Testing utilities for the spill tier.
//!
//! [`MockHost`] stands in for the host server: it keeps "live" keys in a
//! table, serves serialize/TTL-probe calls from it, and records every
//! materialize call so tests can assert on the exact payload and TTL the
//! engine handed back.

mod mock;

pub use mock::{MaterializeCall, MockHost};

#[cfg(test)]
mod engine_tests;
