//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm plus SHA-256-derived stream seeds.
//! CRITICAL: all randomness in the seeder MUST go through this module.
//! One `RngManager` per company-run, passed explicitly to every generator.

mod xorshift;

pub use xorshift::{stable_seed, RngManager};
