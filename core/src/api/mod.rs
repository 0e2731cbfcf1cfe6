//! Intent surface consumed by the presentation layer.
//!
//! Versioned modules (currently `v1`) group the user intents so hosts can
//! stay stable while the core evolves.

pub mod v1;
