//! Umbrella crate for hexcomp.
//!
//! This crate is intentionally small: it re-exports the engine and protocol crates
//! so downstream code can depend on a single crate name (`hexcomp`).

pub use hexcomp_engine as engine;
pub use hexcomp_protocol as protocol;
