//! Tests for the seasonality and demand model.

use chrono::NaiveDate;
use inventory_seeder_core_rs::demand::{
    category_curve, demand_intensity, seasonal_multiplier, weekday_multiplier,
};
use inventory_seeder_core_rs::{Category, MovementKind, RngManager};
use proptest::prelude::*;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn test_seeds_peak_during_rwanda_season_a() {
    // Season A starts Feb 10; seeds have no lag, 14-day ramp, 28-day peak.
    let peak = seasonal_multiplier("rw", Category::Seeds, d(2025, 3, 5));
    let off = seasonal_multiplier("rw", Category::Seeds, d(2025, 7, 20));
    assert!(peak > 3.0, "mid-season seeds multiplier was {peak}");
    assert_eq!(off, 1.0, "off-season must fall back to base demand");
}

#[test]
fn test_fertilizer_lags_behind_seeds() {
    // 18 days after season start: seeds are at peak, fertilizer still ramping.
    let day = d(2025, 2, 28);
    let seeds = seasonal_multiplier("rw", Category::Seeds, day);
    let fertilizer = seasonal_multiplier("rw", Category::Fertilizer, day);
    let seeds_norm = (seeds - 1.0) / category_curve(Category::Seeds).amplitude;
    let fert_norm = (fertilizer - 1.0) / category_curve(Category::Fertilizer).amplitude;
    assert!(
        seeds_norm > fert_norm,
        "seeds pulse {seeds_norm} should lead fertilizer pulse {fert_norm}"
    );
}

#[test]
fn test_unknown_country_has_no_seasonal_lift() {
    let mut day = d(2025, 1, 1);
    while day < d(2026, 1, 1) {
        assert_eq!(seasonal_multiplier("fr", Category::Seeds, day), 1.0);
        day = day.succ_opt().unwrap();
    }
}

#[test]
fn test_outbound_collapses_on_sunday() {
    let sunday = d(2025, 6, 1);
    let monday = d(2025, 6, 2);
    assert_eq!(weekday_multiplier(MovementKind::Outbound, sunday), 0.15);
    assert_eq!(weekday_multiplier(MovementKind::Outbound, monday), 1.0);
    assert_eq!(weekday_multiplier(MovementKind::Damage, sunday), 1.0);
}

#[test]
fn test_demand_intensity_is_deterministic_per_seed() {
    let day = d(2025, 3, 5);
    let mut a = RngManager::new(42);
    let mut b = RngManager::new(42);
    for _ in 0..100 {
        assert_eq!(
            demand_intensity("rw", Category::Seeds, day, &mut a),
            demand_intensity("rw", Category::Seeds, day, &mut b)
        );
    }
}

proptest! {
    #[test]
    fn prop_seasonal_multiplier_bounded(
        year in 2023i32..2027,
        ordinal in 1u32..=365,
        cat_idx in 0usize..6,
        country_idx in 0usize..3,
    ) {
        let day = NaiveDate::from_yo_opt(year, ordinal).unwrap();
        let category = Category::ALL[cat_idx];
        let country = ["rw", "ke", "ug"][country_idx];
        let m = seasonal_multiplier(country, category, day);
        let amp = category_curve(category).amplitude;
        prop_assert!(m >= 1.0 - 1e-9);
        prop_assert!(m <= 1.0 + amp * 1.25 + 1e-9);
    }

    #[test]
    fn prop_demand_intensity_within_noise_band(
        seed in 1u64..u64::MAX,
        ordinal in 1u32..=365,
        cat_idx in 0usize..6,
    ) {
        let day = NaiveDate::from_yo_opt(2025, ordinal).unwrap();
        let category = Category::ALL[cat_idx];
        let base = seasonal_multiplier("ke", category, day)
            * weekday_multiplier(MovementKind::Outbound, day);
        let mut rng = RngManager::new(seed);
        let v = demand_intensity("ke", category, day, &mut rng);
        prop_assert!(v >= base * 0.9 - 1e-9);
        prop_assert!(v <= base * 1.1 + 1e-9);
    }
}
