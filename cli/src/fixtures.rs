//! Demo master data
//!
//! Builds the companies, warehouses, locations, products, and vendors a demo
//! run operates on, and registers their remote-side records with an
//! [`InMemoryGateway`]. Identifiers are offset per country so two companies
//! never share an id.

use inventory_seeder_core_rs::gateway::InventoryGateway;
use inventory_seeder_core_rs::{Category, Company, InMemoryGateway, Product, Warehouse};
use serde_json::json;
use std::collections::BTreeMap;

/// Everything one company-run needs.
pub struct CompanyFixture {
    pub company: Company,
    pub products: Vec<Product>,
    pub vendor_ids_by_category: BTreeMap<Category, Vec<i64>>,
}

fn country_name(code: &str) -> String {
    match code {
        "rw" => "Rwanda".to_string(),
        "ke" => "Kenya".to_string(),
        "ug" => "Uganda".to_string(),
        other => other.to_uppercase(),
    }
}

fn build_products(base: i64) -> Vec<Product> {
    let catalog: &[(Category, &str, &str)] = &[
        (Category::Seeds, "Maize Seed 10kg", "kg"),
        (Category::Seeds, "Bean Seed 5kg", "kg"),
        (Category::Seeds, "Sorghum Seed 10kg", "kg"),
        (Category::Fertilizer, "NPK 17-17-17 50kg", "kg"),
        (Category::Fertilizer, "Urea 50kg", "kg"),
        (Category::Fertilizer, "DAP 50kg", "kg"),
        (Category::Pesticides, "Insecticide 1L", "L"),
        (Category::Pesticides, "Fungicide 1L", "L"),
        (Category::Pesticides, "Herbicide 5L", "L"),
        (Category::Tools, "Hand Hoe", "Units"),
        (Category::Tools, "Panga", "Units"),
        (Category::Tools, "Knapsack Sprayer", "Units"),
        (Category::SpareParts, "Sprayer Nozzle Kit", "Units"),
        (Category::SpareParts, "Pump Diaphragm", "Units"),
        (Category::SpareParts, "Hose Clamp Pack", "Units"),
        (Category::Packaging, "Woven Sack 90kg", "Units"),
        (Category::Packaging, "Poly Bag 5kg (100)", "Units"),
        (Category::Packaging, "Carton Box Large", "Units"),
    ];
    catalog
        .iter()
        .enumerate()
        .map(|(i, (category, name, uom))| {
            let n = i as i64;
            Product {
                product_tmpl_id: base + 400 + n,
                product_id: base + 500 + n,
                default_code: format!("SKU-{:05}", base / 100 + n),
                name: (*name).to_string(),
                category: *category,
                uom_id: if *uom == "Units" { 1 } else { 2 },
                uom_name: (*uom).to_string(),
            }
        })
        .collect()
}

fn build_warehouses(base: i64, country: &str) -> Vec<Warehouse> {
    (0..2)
        .map(|i| {
            let wb = base + 100 + i * 20;
            Warehouse {
                warehouse_id: wb,
                name: format!("{} Warehouse {}", country_name(country), i + 1),
                code: format!("{}WH{}", country.to_uppercase(), i + 1),
                view_location_id: wb + 1,
                stock_location_id: wb + 2,
                picking_type_in_id: wb + 3,
                picking_type_internal_id: wb + 4,
                picking_type_out_id: wb + 5,
            }
        })
        .collect()
}

fn build_locations(warehouses: &[Warehouse]) -> BTreeMap<String, BTreeMap<String, i64>> {
    let mut locations = BTreeMap::new();
    for wh in warehouses {
        let base = wh.warehouse_id;
        let mut locs = BTreeMap::new();
        locs.insert("GOOD::zone-a".to_string(), base + 6);
        locs.insert("GOOD::zone-b".to_string(), base + 7);
        locs.insert("TRANSIT::dock".to_string(), base + 8);
        locs.insert("DAMAGED::bin".to_string(), base + 9);
        locations.insert(wh.code.clone(), locs);
    }
    locations
}

fn default_prices(category: Category) -> (f64, f64) {
    // (list, standard)
    match category {
        Category::Seeds => (28.0, 19.0),
        Category::Fertilizer => (42.0, 31.0),
        Category::Pesticides => (15.0, 9.5),
        Category::Tools => (12.0, 7.0),
        Category::SpareParts => (6.5, 3.8),
        Category::Packaging => (1.8, 0.9),
    }
}

/// Build one country's fixture and register its remote records.
pub fn build_company_fixture(
    gateway: &mut InMemoryGateway,
    country_code: &str,
    index: usize,
) -> CompanyFixture {
    let base = (index as i64 + 1) * 100_000;
    let warehouses = build_warehouses(base, country_code);
    let locations = build_locations(&warehouses);
    let products = build_products(base);

    for wh in &warehouses {
        gateway.register_warehouse(wh);
    }
    for product in &products {
        let (list, standard) = default_prices(product.category);
        gateway
            .create(
                "product.product",
                json!({
                    "id_hint": product.product_id,
                    "name": product.name,
                    "default_code": product.default_code,
                    "list_price": list,
                    "standard_price": standard,
                }),
                None,
            )
            .expect("in-memory create cannot fail");
    }

    let customer_id = gateway
        .create(
            "res.partner",
            json!({
                "name": format!("{} Agro Retail", country_name(country_code)),
                "customer_rank": 1,
            }),
            None,
        )
        .expect("in-memory create cannot fail");

    let mut vendor_ids_by_category = BTreeMap::new();
    for category in Category::ALL {
        let mut ids = Vec::new();
        for v in 1..=2 {
            let id = gateway
                .create(
                    "res.partner",
                    json!({
                        "name": format!("{} Supplier {} {}", category.label(), country_code.to_uppercase(), v),
                        "supplier_rank": 1,
                    }),
                    None,
                )
                .expect("in-memory create cannot fail");
            ids.push(id);
        }
        vendor_ids_by_category.insert(category, ids);
    }

    let company = Company {
        company_id: base + 1,
        name: country_name(country_code),
        country_code: country_code.to_string(),
        customer_id,
        warehouses,
        locations,
    };

    CompanyFixture {
        company,
        products,
        vendor_ids_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_ids_do_not_collide_across_countries() {
        let mut gw = InMemoryGateway::new();
        let a = build_company_fixture(&mut gw, "rw", 0);
        let b = build_company_fixture(&mut gw, "ke", 1);
        assert_ne!(a.company.company_id, b.company.company_id);
        let a_ids: Vec<i64> = a.products.iter().map(|p| p.product_id).collect();
        assert!(b.products.iter().all(|p| !a_ids.contains(&p.product_id)));
    }

    #[test]
    fn test_fixture_covers_all_categories() {
        let mut gw = InMemoryGateway::new();
        let fixture = build_company_fixture(&mut gw, "rw", 0);
        for category in Category::ALL {
            assert!(fixture.products.iter().any(|p| p.category == category));
            assert!(!fixture.vendor_ids_by_category[&category].is_empty());
        }
    }

    #[test]
    fn test_every_warehouse_has_all_roles() {
        let mut gw = InMemoryGateway::new();
        let fixture = build_company_fixture(&mut gw, "ug", 2);
        use inventory_seeder_core_rs::LocationRole;
        for wh in &fixture.company.warehouses {
            for role in [LocationRole::Good, LocationRole::Transit, LocationRole::Damaged] {
                assert!(!fixture.company.locations_for(&wh.code, role).is_empty());
            }
        }
    }
}
