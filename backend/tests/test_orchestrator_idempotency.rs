//! Tests for the idempotent picking orchestration.
//!
//! CRITICAL: re-running with the same dataset key must find every picking it
//! created before, replay it into the ledger, and create nothing new.

use chrono::NaiveDate;
use inventory_seeder_core_rs::gateway::memory::ValidateFollowup;
use inventory_seeder_core_rs::generators::PickingHost;
use inventory_seeder_core_rs::models::movement::MovementLine;
use inventory_seeder_core_rs::orchestrator::{PickingRequest, SubmitOutcome};
use inventory_seeder_core_rs::{
    Category, Company, InMemoryGateway, InventoryGateway, MovementEngine, MovementKind, Product,
    RngManager, RunConfig, Scale, SeedMode, SimulationContext, Warehouse,
};
use inventory_seeder_core_rs::core::calendar::HorizonCalendar;
use inventory_seeder_core_rs::gateway::DoneQuantityField;
use std::collections::BTreeMap;

fn warehouse() -> Warehouse {
    Warehouse {
        warehouse_id: 30,
        name: "Kigali Central".to_string(),
        code: "WH1".to_string(),
        view_location_id: 9,
        stock_location_id: 10,
        picking_type_in_id: 11,
        picking_type_internal_id: 12,
        picking_type_out_id: 13,
    }
}

fn company() -> Company {
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
        warehouses: vec![warehouse()],
        locations,
    }
}

fn products() -> Vec<Product> {
    (0..18)
        .map(|i| Product {
            product_tmpl_id: 400 + i,
            product_id: 500 + i,
            default_code: format!("SKU{:03}", i),
            name: format!("Product {}", i),
            category: Category::ALL[i as usize % Category::ALL.len()],
            uom_id: 1,
            uom_name: "Units".to_string(),
        })
        .collect()
}

fn vendors() -> BTreeMap<Category, Vec<i64>> {
    Category::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, vec![900 + i as i64]))
        .collect()
}

fn config(days: usize) -> RunConfig {
    RunConfig {
        days,
        scale: Scale::Small,
        dataset_key: "idem".to_string(),
        mode: SeedMode::Movements,
        dry_run: false,
        end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
    }
}

fn context(engine_company: &Company) -> SimulationContext {
    SimulationContext::new(
        engine_company.clone(),
        HorizonCalendar::ending_at(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(), 30),
        RngManager::new(7),
        BTreeMap::new(),
        vendors(),
    )
}

fn outbound_request(qty: f64) -> PickingRequest {
    let product = products().remove(0);
    PickingRequest {
        warehouse_code: "WH1".to_string(),
        warehouse_id: 30,
        kind: MovementKind::Outbound,
        day: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
        picking_type_id: 13,
        partner_id: Some(5),
        src_loc: 101,
        dst_loc: 2,
        lines: vec![MovementLine::new(product, qty)],
        note: String::new(),
    }
}

fn created_counts(counts: &BTreeMap<String, u64>) -> u64 {
    counts
        .iter()
        .filter(|(k, _)| !k.contains(':'))
        .map(|(_, v)| v)
        .sum()
}

fn existing_counts(counts: &BTreeMap<String, u64>) -> u64 {
    counts
        .iter()
        .filter(|(k, _)| k.ends_with(":existing"))
        .map(|(_, v)| v)
        .sum()
}

#[test]
fn test_second_run_creates_nothing_new() {
    let mut engine = MovementEngine::new(InMemoryGateway::new(), "idem", false);
    let ctx1 = engine
        .seed_movements(&company(), &products(), &vendors(), &config(30))
        .unwrap();
    let created_first = created_counts(&ctx1.picking_counts);
    assert!(created_first > 0, "first run must create pickings");

    let mut ledger1: Vec<(i64, i64, f64)> = engine.ledger.entries().collect();
    ledger1.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let gateway = engine.into_gateway();
    let picking_count = gateway.count("stock.picking");
    assert!(picking_count > 0);

    let mut engine2 = MovementEngine::new(gateway, "idem", false);
    let ctx2 = engine2
        .seed_movements(&company(), &products(), &vendors(), &config(30))
        .unwrap();

    assert_eq!(created_counts(&ctx2.picking_counts), 0, "rerun created pickings");
    assert_eq!(
        existing_counts(&ctx2.picking_counts),
        created_first,
        "every created picking must be found again"
    );
    assert_eq!(
        engine2.gateway_mut().count("stock.picking"),
        picking_count,
        "rerun must not add records"
    );

    // Replaying must rebuild the same ledger state.
    let mut ledger2: Vec<(i64, i64, f64)> = engine2.ledger.entries().collect();
    ledger2.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    for ((loc1, prod1, qty1), (loc2, prod2, qty2)) in ledger1.iter().zip(ledger2.iter()) {
        assert_eq!((loc1, prod1), (loc2, prod2));
        assert!((qty1 - qty2).abs() < 1e-6, "ledger diverged at ({loc1},{prod1})");
    }
    assert_eq!(ledger1.len(), ledger2.len());
}

#[test]
fn test_outbound_capped_at_availability() {
    let mut engine = MovementEngine::new(InMemoryGateway::new(), "cap", false);
    engine.gateway_mut().authenticate().unwrap();
    engine.ledger.add(101, 500, 30.0);

    let mut ctx = context(&company());
    let outcome = engine.submit_picking(&mut ctx, outbound_request(100.0)).unwrap();
    assert_eq!(outcome, SubmitOutcome::Created);

    assert_eq!(ctx.move_rows.len(), 1);
    assert_eq!(ctx.move_rows[0].qty_requested, 100.0);
    assert_eq!(ctx.move_rows[0].qty_done, 30.0);
    assert_eq!(engine.ledger.get(101, 500), 0.0, "source must be drained, not negative");
    assert_eq!(engine.ledger.get(2, 500), 30.0);
}

#[test]
fn test_outbound_with_no_stock_is_skipped() {
    let mut engine = MovementEngine::new(InMemoryGateway::new(), "skip", false);
    let mut ctx = context(&company());

    let outcome = engine.submit_picking(&mut ctx, outbound_request(50.0)).unwrap();
    assert_eq!(outcome, SubmitOutcome::SkippedNoQty);
    assert_eq!(ctx.picking_counts["OUT:skipped_no_qty"], 1);
    assert!(ctx.move_rows.is_empty());
    assert_eq!(engine.gateway_mut().count("stock.picking"), 0);
}

#[test]
fn test_failed_operation_leaves_ledger_untouched() {
    // No supported done-quantity field: the fulfillment step fails after the
    // picking is created, and the ledger must not move.
    let gateway = InMemoryGateway::new().with_done_field(None);
    let mut engine = MovementEngine::new(gateway, "fail", false);
    engine.ledger.add(101, 500, 80.0);

    let mut ctx = context(&company());
    let mut req = outbound_request(10.0);
    req.kind = MovementKind::Internal;
    req.dst_loc = 201;
    let outcome = engine.submit_picking(&mut ctx, req).unwrap();

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(ctx.picking_counts["INT:failed"], 1);
    assert!(ctx.move_rows.is_empty());
    assert_eq!(engine.ledger.get(101, 500), 80.0);
    assert_eq!(engine.ledger.get(201, 500), 0.0);
}

#[test]
fn test_unsupported_done_field_is_fatal_for_a_run() {
    let gateway = InMemoryGateway::new().with_done_field(None);
    let mut engine = MovementEngine::new(gateway, "fatal", false);
    let result = engine.seed_movements(&company(), &products(), &vendors(), &config(30));
    assert!(result.is_err(), "capability probe failure must abort the run");
}

#[test]
fn test_dry_run_never_writes_to_the_gateway() {
    let mut engine = MovementEngine::new(InMemoryGateway::new(), "dry", true);
    let ctx = engine
        .seed_movements(&company(), &products(), &vendors(), &config(30))
        .unwrap();
    assert!(created_counts(&ctx.picking_counts) > 0);
    assert!(!ctx.move_rows.is_empty());

    let gateway = engine.into_gateway();
    assert_eq!(gateway.count("stock.picking"), 0);
    assert_eq!(gateway.count("stock.move"), 0);
    // Only the seeded base locations exist.
    assert_eq!(gateway.count("stock.location"), 2);
}

#[test]
fn test_backorder_wizard_is_cancelled() {
    let gateway = InMemoryGateway::new().with_validate_followup(ValidateFollowup::Backorder);
    let mut engine = MovementEngine::new(gateway, "wiz", false);
    engine.ledger.add(101, 500, 30.0);

    let mut ctx = context(&company());
    let outcome = engine.submit_picking(&mut ctx, outbound_request(100.0)).unwrap();
    assert_eq!(outcome, SubmitOutcome::Created);

    let log = &engine.gateway_mut().workflow_log;
    assert!(log.iter().any(|(model, method, _)| {
        model == "stock.backorder.confirmation" && method == "process_cancel_backorder"
    }));
}

#[test]
fn test_qty_done_field_variant_is_honored() {
    let gateway = InMemoryGateway::new().with_done_field(Some(DoneQuantityField::QtyDone));
    let mut engine = MovementEngine::new(gateway, "legacy", false);
    engine.ledger.add(101, 500, 40.0);

    let mut ctx = context(&company());
    let outcome = engine.submit_picking(&mut ctx, outbound_request(25.0)).unwrap();
    assert_eq!(outcome, SubmitOutcome::Created);

    let lines = engine.gateway_mut().records("stock.move.line").to_vec();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].get("qty_done").and_then(|v| v.as_f64()), Some(25.0));
    assert!(lines[0].get("quantity").is_none());
}
