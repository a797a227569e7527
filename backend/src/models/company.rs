//! Company and warehouse value objects
//!
//! These are pre-built by master-data provisioning (outside this crate) and
//! consumed read-only by the simulation. A company owns its warehouses and a
//! map of per-warehouse storage locations keyed by role
//! (`GOOD::<slug>` / `TRANSIT::<slug>` / `DAMAGED::<slug>`).
//!
//! # Critical Invariants
//!
//! 1. Location maps are ordered (BTreeMap) so iteration order, and therefore
//!    every RNG-driven location choice, is deterministic.
//! 2. A company is never mutated during a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical role of a storage location inside a warehouse base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationRole {
    /// Sellable stock
    Good,
    /// Stock moving between good locations
    Transit,
    /// Damaged / written-off stock
    Damaged,
}

impl LocationRole {
    /// Key prefix used in the company location map.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            LocationRole::Good => "GOOD",
            LocationRole::Transit => "TRANSIT",
            LocationRole::Damaged => "DAMAGED",
        }
    }
}

/// A physical warehouse with its operation (picking) type identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: i64,
    pub name: String,
    pub code: String,
    pub view_location_id: i64,
    pub stock_location_id: i64,
    pub picking_type_in_id: i64,
    pub picking_type_internal_id: i64,
    pub picking_type_out_id: i64,
}

/// One country/company scope for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company_id: i64,
    pub name: String,
    /// ISO-3166 alpha-2, lowercase (e.g. "rw")
    pub country_code: String,
    /// Default customer partner for outbound operations
    pub customer_id: i64,
    pub warehouses: Vec<Warehouse>,
    /// locations[warehouse_code]["GOOD|TRANSIT|DAMAGED::<base_slug>"] = location id
    pub locations: BTreeMap<String, BTreeMap<String, i64>>,
}

impl Company {
    /// All location ids of the given role at a warehouse, in key order.
    pub fn locations_for(&self, warehouse_code: &str, role: LocationRole) -> Vec<i64> {
        let prefix = format!("{}::", role.key_prefix());
        self.locations
            .get(warehouse_code)
            .map(|locs| {
                locs.iter()
                    .filter(|(k, _)| k.starts_with(&prefix))
                    .map(|(_, id)| *id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company_with_locations() -> Company {
        let mut wh_locs = BTreeMap::new();
        wh_locs.insert("GOOD::zone-a".to_string(), 101);
        wh_locs.insert("GOOD::zone-b".to_string(), 102);
        wh_locs.insert("TRANSIT::dock".to_string(), 201);
        wh_locs.insert("DAMAGED::bin".to_string(), 301);
        let mut locations = BTreeMap::new();
        locations.insert("WH1".to_string(), wh_locs);
        Company {
            company_id: 1,
            name: "Rwanda".to_string(),
            country_code: "rw".to_string(),
            customer_id: 5,
            warehouses: vec![],
            locations,
        }
    }

    #[test]
    fn test_locations_for_filters_by_role() {
        let company = company_with_locations();
        assert_eq!(company.locations_for("WH1", LocationRole::Good), vec![101, 102]);
        assert_eq!(company.locations_for("WH1", LocationRole::Transit), vec![201]);
        assert_eq!(company.locations_for("WH1", LocationRole::Damaged), vec![301]);
    }

    #[test]
    fn test_locations_for_unknown_warehouse_is_empty() {
        let company = company_with_locations();
        assert!(company.locations_for("NOPE", LocationRole::Good).is_empty());
    }
}
