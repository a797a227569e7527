//! Inventory seeder CLI
//!
//! Runs the simulation against an in-memory gateway populated with demo
//! master data, one company per requested country, and writes the report
//! CSVs plus a JSON summary per company.

mod fixtures;

use chrono::NaiveDate;
use inventory_seeder_core_rs::reporting::{summarize, write_moves_csv, write_pickings_csv};
use inventory_seeder_core_rs::{
    InMemoryGateway, MovementEngine, OrderSeeder, RunConfig, Scale, SeedMode,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
inventory-seeder - generate synthetic warehouse movement history

USAGE:
    inventory-seeder [OPTIONS]

OPTIONS:
    --days <N>           Horizon length in days (default: 180)
    --scale <SCALE>      small | medium | large (default: small)
    --countries <LIST>   Comma-separated country codes (default: rw,ug,ke)
    --dataset-key <KEY>  Idempotency key for origin references (default: demo)
    --mode <MODE>        movements | orders | split:<movement-days>
                         (default: movements)
    --end-date <DATE>    Last simulated day, YYYY-MM-DD (default: today)
    --out-dir <DIR>      Report output directory (default: out)
    --dry-run            Simulate without any gateway writes
    -h, --help           Show this help
";

struct CliArgs {
    days: usize,
    scale: Scale,
    countries: Vec<String>,
    dataset_key: String,
    mode: SeedMode,
    end_date: NaiveDate,
    out_dir: PathBuf,
    dry_run: bool,
}

fn parse_args() -> Result<CliArgs, String> {
    let mut days = 180usize;
    let mut scale = Scale::Small;
    let mut countries = vec!["rw".to_string(), "ug".to_string(), "ke".to_string()];
    let mut dataset_key = "demo".to_string();
    let mut mode = SeedMode::Movements;
    let mut end_date = chrono::Local::now().date_naive();
    let mut out_dir = PathBuf::from("out");
    let mut dry_run = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg.as_str() {
            "--days" => {
                days = value("--days")?
                    .parse()
                    .map_err(|_| "--days must be a positive integer".to_string())?;
            }
            "--scale" => {
                scale = value("--scale")?.parse().map_err(|e| format!("{e}"))?;
            }
            "--countries" => {
                countries = value("--countries")?
                    .split(',')
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect();
            }
            "--dataset-key" => {
                dataset_key = value("--dataset-key")?;
            }
            "--mode" => {
                let raw = value("--mode")?;
                mode = match raw.as_str() {
                    "movements" => SeedMode::Movements,
                    "orders" => SeedMode::Orders,
                    other => match other.strip_prefix("split:") {
                        Some(n) => SeedMode::Split {
                            movement_days: n
                                .parse()
                                .map_err(|_| "split mode needs a day count, e.g. split:120".to_string())?,
                        },
                        None => {
                            return Err(format!(
                                "--mode must be movements|orders|split:<days>, got `{other}`"
                            ))
                        }
                    },
                };
            }
            "--end-date" => {
                let raw = value("--end-date")?;
                end_date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| format!("--end-date must be YYYY-MM-DD, got `{raw}`"))?;
            }
            "--out-dir" => {
                out_dir = PathBuf::from(value("--out-dir")?);
            }
            "--dry-run" => dry_run = true,
            "-h" | "--help" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument `{other}` (try --help)")),
        }
    }
    if countries.is_empty() {
        return Err("--countries must name at least one country".to_string());
    }
    Ok(CliArgs {
        days,
        scale,
        countries,
        dataset_key,
        mode,
        end_date,
        out_dir,
        dry_run,
    })
}

fn run(args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Catch bad horizon/split bounds once, before any company runs.
    RunConfig {
        days: args.days,
        scale: args.scale,
        dataset_key: args.dataset_key.clone(),
        mode: args.mode,
        dry_run: args.dry_run,
        end_date: args.end_date,
    }
    .validate()?;
    std::fs::create_dir_all(&args.out_dir)?;

    for (index, country) in args.countries.iter().enumerate() {
        let mut gateway = InMemoryGateway::new();
        let fixture = fixtures::build_company_fixture(&mut gateway, country, index);
        let mut engine = MovementEngine::new(gateway, args.dataset_key.clone(), args.dry_run);

        info!(
            company = %fixture.company.name,
            mode = ?args.mode,
            days = args.days,
            dry_run = args.dry_run,
            "starting company run"
        );

        let (movement_cfg, order_cfg) = split_configs(args);
        if let Some(cfg) = movement_cfg {
            let ctx = engine.seed_movements(
                &fixture.company,
                &fixture.products,
                &fixture.vendor_ids_by_category,
                &cfg,
            )?;
            let mut summary = summarize(&ctx, &fixture.products, &engine.ledger);
            let pickings_path = args.out_dir.join(format!("{country}_pickings.csv"));
            let moves_path = args.out_dir.join(format!("{country}_moves.csv"));
            write_pickings_csv(&pickings_path, &ctx.picking_rows)?;
            write_moves_csv(&moves_path, &ctx.move_rows)?;
            summary.pickings_csv = Some(pickings_path.display().to_string());
            summary.moves_csv = Some(moves_path.display().to_string());
            std::fs::write(
                args.out_dir.join(format!("{country}_summary.json")),
                serde_json::to_string_pretty(&summary)?,
            )?;
            info!(
                company = %fixture.company.name,
                pickings = ctx.picking_rows.len(),
                moves = ctx.move_rows.len(),
                out = %pickings_path.display(),
                "movement run complete"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        if let Some(cfg) = order_cfg {
            let mut seeder = OrderSeeder::new(&mut engine, &fixture.company.name);
            let stats = seeder.seed_orders(
                &fixture.company,
                &fixture.products,
                &fixture.vendor_ids_by_category,
                &cfg,
            )?;
            std::fs::write(
                args.out_dir.join(format!("{country}_orders.json")),
                serde_json::to_string_pretty(&stats)?,
            )?;
            info!(
                company = %fixture.company.name,
                purchase_orders = stats.po_count,
                sales_orders = stats.so_count,
                "order run complete"
            );
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        for event in &engine.anomalies {
            info!(
                company = %event.company,
                kind = %event.kind,
                date = %event.date,
                detail = %event.detail,
                "anomaly"
            );
        }
    }
    Ok(())
}

/// Resolve the run mode into per-phase configurations. In split mode the
/// movement phase covers the oldest `movement_days` and the order phase the
/// remainder, ending at the requested end date.
fn split_configs(args: &CliArgs) -> (Option<RunConfig>, Option<RunConfig>) {
    let base = RunConfig {
        days: args.days,
        scale: args.scale,
        dataset_key: args.dataset_key.clone(),
        mode: args.mode,
        dry_run: args.dry_run,
        end_date: args.end_date,
    };
    match args.mode {
        SeedMode::Movements => (Some(base), None),
        SeedMode::Orders => (None, Some(base)),
        SeedMode::Split { movement_days } => {
            let order_days = args.days.saturating_sub(movement_days);
            let movement_end = args.end_date - chrono::Duration::days(order_days as i64);
            let movement_cfg = RunConfig {
                days: movement_days,
                mode: SeedMode::Movements,
                end_date: movement_end,
                ..base.clone()
            };
            let order_cfg = RunConfig {
                days: order_days,
                mode: SeedMode::Orders,
                ..base
            };
            (Some(movement_cfg), Some(order_cfg))
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
