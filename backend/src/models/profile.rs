//! Warehouse activity profiles
//!
//! Derived once per warehouse per run and immutable afterwards: a size class
//! with an activity weight, plus the subset of products the warehouse
//! actively trades. Every downstream generator takes volume and product
//! selection from this profile.

use crate::models::product::Product;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size class of a warehouse, sampled from a scale-dependent distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// Activity weight multiplier applied to all volume targets.
    pub fn weight(&self) -> f64 {
        match self {
            SizeClass::Small => 0.7,
            SizeClass::Medium => 1.0,
            SizeClass::Large => 1.6,
        }
    }

    /// Fraction of the full catalog considered active at this size.
    pub fn active_share(&self) -> f64 {
        match self {
            SizeClass::Small => 0.35,
            SizeClass::Medium => 0.55,
            SizeClass::Large => 0.75,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
        };
        f.write_str(s)
    }
}

/// Per-warehouse activity profile for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseProfile {
    pub size: SizeClass,
    pub weight: f64,
    /// Random subset of the catalog this warehouse actively trades.
    pub active_products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_are_ordered() {
        assert!(SizeClass::Small.weight() < SizeClass::Medium.weight());
        assert!(SizeClass::Medium.weight() < SizeClass::Large.weight());
    }

    #[test]
    fn test_active_shares_are_ordered() {
        assert!(SizeClass::Small.active_share() < SizeClass::Medium.active_share());
        assert!(SizeClass::Medium.active_share() < SizeClass::Large.active_share());
    }
}
