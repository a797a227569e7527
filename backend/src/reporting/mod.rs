//! Run reporting
//!
//! End-of-run artifacts: CSV exports of the generated picking/move rows and
//! an aggregate summary with outcome counters, the highest-volume outbound
//! SKUs, and the products closest to running out. Days of cover divides
//! ending on-hand stock by the average daily outbound rate over the trailing
//! 30 days of the horizon, so a long quiet tail shows up as high cover even
//! when mid-horizon demand was heavy.

use crate::ledger::StockLedger;
use crate::models::movement::{MoveRow, PickingRow};
use crate::models::product::Product;
use crate::models::SimulationContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// Trailing window used for the outbound rate estimate.
const COVER_WINDOW_DAYS: usize = 30;
/// How many entries the ranked summary lists carry.
const SUMMARY_TOP_N: usize = 10;

/// Days-of-cover estimate for one SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverEntry {
    pub sku: String,
    pub product_name: String,
    pub ending_stock: f64,
    /// Average outbound units per day over the trailing window
    pub daily_rate: f64,
    pub days_of_cover: f64,
}

/// Aggregate result of one company-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub company: String,
    /// Outcome counters, e.g. "OUT", "OUT:existing", "IN:failed"
    pub picking_counts: BTreeMap<String, u64>,
    /// Highest-volume outbound SKUs, descending
    pub top_outbound_skus: Vec<(String, f64)>,
    /// SKUs closest to running out, ascending by cover
    pub lowest_days_of_cover: Vec<CoverEntry>,
    /// Paths of the written CSV artifacts, when any were written.
    pub pickings_csv: Option<String>,
    pub moves_csv: Option<String>,
}

/// Build the summary from a finished context and the final ledger state.
pub fn summarize(ctx: &SimulationContext, products: &[Product], ledger: &StockLedger) -> RunSummary {
    let mut top: Vec<(String, f64)> = ctx
        .outbound_qty_by_sku
        .iter()
        .map(|(sku, qty)| (sku.clone(), *qty))
        .collect();
    top.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(SUMMARY_TOP_N);

    RunSummary {
        run_id: Uuid::new_v4(),
        company: ctx.company.name.clone(),
        picking_counts: ctx.picking_counts.clone(),
        top_outbound_skus: top,
        lowest_days_of_cover: lowest_days_of_cover(ctx, products, ledger),
        pickings_csv: None,
        moves_csv: None,
    }
}

fn lowest_days_of_cover(
    ctx: &SimulationContext,
    products: &[Product],
    ledger: &StockLedger,
) -> Vec<CoverEntry> {
    let window = ctx.calendar.last_window(COVER_WINDOW_DAYS);
    let window_start = match window.first() {
        Some(&d) => d,
        None => return Vec::new(),
    };
    let window_len = window.len() as f64;

    // Outbound units per SKU inside the trailing window. Row dates carry a
    // time suffix; the date prefix is enough to bucket them.
    let start_prefix = window_start.format("%Y-%m-%d").to_string();
    let mut window_outbound: BTreeMap<&str, f64> = BTreeMap::new();
    for row in &ctx.move_rows {
        if row.kind != "OUT" {
            continue;
        }
        let date_prefix = &row.scheduled_date[..start_prefix.len().min(row.scheduled_date.len())];
        if date_prefix < start_prefix.as_str() {
            continue;
        }
        *window_outbound.entry(row.product.as_str()).or_insert(0.0) += row.qty_done;
    }

    let ending = ledger.ending_stock_by_product();
    let mut entries: Vec<CoverEntry> = Vec::new();
    for product in products {
        let Some(&total) = window_outbound.get(product.default_code.as_str()) else {
            continue;
        };
        let daily_rate = total / window_len;
        if daily_rate <= 0.0 {
            continue;
        }
        let stock = ending.get(&product.product_id).copied().unwrap_or(0.0);
        entries.push(CoverEntry {
            sku: product.default_code.clone(),
            product_name: product.name.clone(),
            ending_stock: stock,
            daily_rate,
            days_of_cover: stock / daily_rate,
        });
    }
    entries.sort_by(|a, b| {
        a.days_of_cover
            .total_cmp(&b.days_of_cover)
            .then_with(|| a.sku.cmp(&b.sku))
    });
    entries.truncate(SUMMARY_TOP_N);
    entries
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_csv_line<W: Write>(out: &mut W, fields: &[String]) -> io::Result<()> {
    writeln!(out, "{}", fields.join(","))
}

/// Write the picking header rows to `path`, overwriting any existing file.
pub fn write_pickings_csv(path: &Path, rows: &[PickingRow]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_csv_line(
        &mut out,
        &[
            "origin", "company", "warehouse", "kind", "scheduled_date",
            "source_location_id", "dest_location_id", "lines", "note",
        ]
        .map(str::to_string),
    )?;
    for row in rows {
        write_csv_line(
            &mut out,
            &[
                csv_field(&row.origin),
                csv_field(&row.company),
                csv_field(&row.warehouse),
                row.kind.clone(),
                row.scheduled_date.clone(),
                row.source_location_id.to_string(),
                row.dest_location_id.to_string(),
                row.lines.to_string(),
                csv_field(&row.note),
            ],
        )?;
    }
    out.flush()
}

/// Write the move line rows to `path`, overwriting any existing file.
pub fn write_moves_csv(path: &Path, rows: &[MoveRow]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_csv_line(
        &mut out,
        &[
            "origin", "company", "warehouse", "kind", "scheduled_date", "product",
            "product_name", "category", "qty_requested", "qty_done", "uom",
            "source_location_id", "dest_location_id", "note",
        ]
        .map(str::to_string),
    )?;
    for row in rows {
        write_csv_line(
            &mut out,
            &[
                csv_field(&row.origin),
                csv_field(&row.company),
                csv_field(&row.warehouse),
                row.kind.clone(),
                row.scheduled_date.clone(),
                csv_field(&row.product),
                csv_field(&row.product_name),
                row.category.label().to_string(),
                format!("{:.2}", row.qty_requested),
                format!("{:.2}", row.qty_done),
                csv_field(&row.uom),
                row.source_location_id.to_string(),
                row.dest_location_id.to_string(),
                csv_field(&row.note),
            ],
        )?;
    }
    out.flush()
}
