//! Warehouse activity profile generation
//!
//! Samples a size class per warehouse from a scale-dependent distribution,
//! maps size to an activity weight, and draws the active-SKU subset. Profiles
//! are computed once at context build time and immutable for the whole run.

use crate::models::company::Company;
use crate::models::product::Product;
use crate::models::profile::{SizeClass, WarehouseProfile};
use crate::orchestrator::Scale;
use crate::rng::RngManager;
use std::collections::BTreeMap;

/// Every warehouse trades at least this many SKUs, however small it is.
pub const MIN_ACTIVE_PRODUCTS: usize = 12;

/// Size-class distribution for a deployment scale.
fn size_distribution(scale: Scale) -> &'static [(SizeClass, f64)] {
    match scale {
        Scale::Small => &[(SizeClass::Small, 0.9), (SizeClass::Medium, 0.1)],
        Scale::Medium => &[
            (SizeClass::Small, 0.35),
            (SizeClass::Medium, 0.5),
            (SizeClass::Large, 0.15),
        ],
        Scale::Large => &[(SizeClass::Medium, 0.45), (SizeClass::Large, 0.55)],
    }
}

/// Sample a size class and its weight for one warehouse.
pub fn sample_warehouse_size(scale: Scale, rng: &mut RngManager) -> (SizeClass, f64) {
    let size = *rng.weighted_choice(size_distribution(scale));
    (size, size.weight())
}

/// Build the per-warehouse profiles for a company run.
///
/// The active subset size is the larger of [`MIN_ACTIVE_PRODUCTS`] and the
/// size-dependent share of the catalog, never exceeding the catalog itself.
pub fn generate_warehouse_profiles(
    company: &Company,
    products: &[Product],
    scale: Scale,
    rng: &mut RngManager,
) -> BTreeMap<String, WarehouseProfile> {
    let mut profiles = BTreeMap::new();
    for wh in &company.warehouses {
        let (size, weight) = sample_warehouse_size(scale, rng);
        let active_n = ((products.len() as f64 * size.active_share()) as usize)
            .max(MIN_ACTIVE_PRODUCTS)
            .min(products.len());
        let active_products = rng.sample(products, active_n);
        profiles.insert(
            wh.code.clone(),
            WarehouseProfile {
                size,
                weight,
                active_products,
            },
        );
    }
    profiles
}
