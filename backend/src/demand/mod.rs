//! Seasonality and demand model
//!
//! Pure functions mapping (country, category, date) to demand/activity
//! multipliers. Deterministic given their inputs, except for the explicit
//! noise term in [`demand_intensity`], which takes the caller's RNG so runs
//! stay reproducible.
//!
//! The seasonal component is a piecewise pulse (linear ramp → plateau →
//! linear decay) anchored to a category-specific lag after each national
//! planting season start. Both the current and the prior year's seasons are
//! considered so pulses spanning a year boundary are not lost.

use crate::models::movement::MovementKind;
use crate::models::product::Category;
use crate::rng::RngManager;
use chrono::{Datelike, NaiveDate, Weekday};

/// A named planting/harvest season, anchored at a month/day each year.
#[derive(Debug, Clone, Copy)]
pub struct SeasonDef {
    pub name: &'static str,
    pub start_month: u32,
    pub start_day: u32,
}

/// Seasonal response curve for one product category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryCurve {
    /// Days between season start and the category's demand onset
    pub lag_days: i64,
    pub amplitude: f64,
    pub ramp_days: i64,
    pub peak_days: i64,
    pub decay_days: i64,
}

/// Approximate national season patterns. Countries outside this table get no
/// seasonal lift (multiplier 1.0).
fn country_seasons(country_code: &str) -> &'static [SeasonDef] {
    match country_code.to_ascii_lowercase().as_str() {
        "rw" => &[
            SeasonDef { name: "A", start_month: 2, start_day: 10 },
            SeasonDef { name: "B", start_month: 9, start_day: 10 },
        ],
        "ke" => &[
            SeasonDef { name: "Long", start_month: 3, start_day: 15 },
            SeasonDef { name: "Short", start_month: 10, start_day: 10 },
        ],
        "ug" => &[
            SeasonDef { name: "1", start_month: 3, start_day: 15 },
            SeasonDef { name: "2", start_month: 9, start_day: 10 },
        ],
        _ => &[],
    }
}

/// Seasonal response curve per category.
pub fn category_curve(category: Category) -> CategoryCurve {
    match category {
        Category::Seeds => CategoryCurve { lag_days: 0, amplitude: 2.2, ramp_days: 14, peak_days: 28, decay_days: 14 },
        Category::Fertilizer => CategoryCurve { lag_days: 18, amplitude: 1.6, ramp_days: 14, peak_days: 28, decay_days: 14 },
        Category::Pesticides => CategoryCurve { lag_days: 35, amplitude: 1.2, ramp_days: 10, peak_days: 28, decay_days: 10 },
        Category::Tools => CategoryCurve { lag_days: 7, amplitude: 0.35, ramp_days: 10, peak_days: 35, decay_days: 10 },
        Category::SpareParts => CategoryCurve { lag_days: 7, amplitude: 0.30, ramp_days: 10, peak_days: 35, decay_days: 10 },
        Category::Packaging => CategoryCurve { lag_days: 75, amplitude: 0.9, ramp_days: 14, peak_days: 28, decay_days: 14 },
    }
}

/// Pulse value in [0, 1] for a given offset from the (lag-adjusted) season start.
fn piecewise_pulse(days_since_start: i64, curve: &CategoryCurve) -> f64 {
    if days_since_start < 0 {
        return 0.0;
    }
    if days_since_start <= curve.ramp_days {
        return (days_since_start as f64 / curve.ramp_days.max(1) as f64).max(0.0);
    }
    if days_since_start <= curve.ramp_days + curve.peak_days {
        return 1.0;
    }
    if days_since_start <= curve.ramp_days + curve.peak_days + curve.decay_days {
        let t = days_since_start - (curve.ramp_days + curve.peak_days);
        return (1.0 - t as f64 / curve.decay_days.max(1) as f64).max(0.0);
    }
    0.0
}

fn season_start_for_year(season: &SeasonDef, year: i32) -> NaiveDate {
    // Anchors are fixed month/day pairs that exist in every year.
    NaiveDate::from_ymd_opt(year, season.start_month, season.start_day)
        .expect("season anchor is a valid calendar date")
}

/// Seasonal multiplier in `[1.0, 1.0 + amplitude * 1.25]`.
///
/// Sums the pulse over each national season for the current and prior year,
/// caps the total at 1.25, and applies the category amplitude on top of a
/// base of 1.0.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use inventory_seeder_core_rs::demand::seasonal_multiplier;
/// use inventory_seeder_core_rs::Category;
///
/// // Mid-season A in Rwanda: seeds demand is well above base.
/// let day = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
/// assert!(seasonal_multiplier("rw", Category::Seeds, day) > 2.0);
/// ```
pub fn seasonal_multiplier(country_code: &str, category: Category, day: NaiveDate) -> f64 {
    let curve = category_curve(category);
    let mut pulses = 0.0;
    for season in country_seasons(country_code) {
        for year in [day.year(), day.year() - 1] {
            let start = season_start_for_year(season, year);
            let offset = (day - start).num_days() - curve.lag_days;
            pulses += piecewise_pulse(offset, &curve);
        }
    }
    1.0 + curve.amplitude * pulses.min(1.25)
}

/// Fixed per-weekday operational scaling for each movement kind.
///
/// Outbound collapses on Sunday and softens on Saturday; inbound receiving is
/// reduced on the weekend; internal rebalancing is boosted mid-week; damage
/// is flat.
pub fn weekday_multiplier(kind: MovementKind, day: NaiveDate) -> f64 {
    let wd = day.weekday();
    match kind {
        MovementKind::Outbound => match wd {
            Weekday::Sun => 0.15,
            Weekday::Sat => 0.65,
            _ => 1.0,
        },
        MovementKind::Inbound => match wd {
            Weekday::Sat | Weekday::Sun => 0.25,
            _ => 1.0,
        },
        MovementKind::Internal => match wd {
            Weekday::Tue | Weekday::Wed | Weekday::Thu => 1.2,
            Weekday::Sun => 0.4,
            _ => 0.9,
        },
        MovementKind::Damage => 1.0,
    }
}

/// Seasonal × outbound-weekday multiplier with ±10% uniform noise so adjacent
/// weeks do not look identical.
pub fn demand_intensity(
    country_code: &str,
    category: Category,
    day: NaiveDate,
    rng: &mut RngManager,
) -> f64 {
    let base = seasonal_multiplier(country_code, category, day)
        * weekday_multiplier(MovementKind::Outbound, day);
    base * (0.9 + 0.2 * rng.next_f64())
}

/// Lightly bounded normal sample: clamped to `[0, mean + 4σ]` so outliers do
/// not dominate generated quantities.
pub fn bounded_normal(mean: f64, stdev: f64, rng: &mut RngManager) -> f64 {
    rng.gauss(mean, stdev).clamp(0.0, mean + 4.0 * stdev)
}
