//! Small, dependency-light value types shared by the eviction manager crate.
//!
//! Kept as a separate crate so the parsing and arithmetic for resource
//! quantities can be unit-tested and reused without pulling in the rest
//! of the eviction manager's dependency graph.

mod quantity;

pub use quantity::{Quantity, QuantityParseError};
