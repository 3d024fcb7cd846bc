//! Blood alcohol concentration estimation engine.
//!
//! This module implements the Widmark-based estimate:
//! - Each event contributes `grams / (mass_kg * r * 10)` once absorbed
//! - Absorption: half the dose immediately, the rest linearly over 30 minutes
//! - Constant elimination of 0.015 per hour since the first event
//!
//! Everything here is a pure function of its arguments. The evaluation
//! instant is always passed in explicitly.

use crate::{BacEstimate, ConsumptionEvent, DistributionCategory, Profile, Trend};
use chrono::{DateTime, Duration, Utc};

/// Concentration eliminated per hour
pub const ELIMINATION_RATE_PER_HOUR: f64 = 0.015;

/// Time for one event to be fully absorbed
pub const ABSORPTION_MINUTES: i64 = 30;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

fn absorption_window() -> Duration {
    Duration::minutes(ABSORPTION_MINUTES)
}

/// Instant at which an event's alcohol is fully absorbed
///
/// Saturates at the latest representable instant.
pub fn absorption_complete_at(event: &ConsumptionEvent) -> DateTime<Utc> {
    event
        .occurred_at
        .checked_add_signed(absorption_window())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Estimate the concentration at `at_time`
///
/// ## Algorithm
///
/// 1. Incomplete profile or no events → all-zero result
/// 2. Sum each event's absorbed contribution at `at_time`
/// 3. Subtract elimination accrued since the earliest event
/// 4. Clamp at zero and round to 3 decimals
/// 5. Derive trend, time to zero and the peak along the curve
///
/// Events may be supplied in any order. Events after `at_time` contribute
/// nothing.
pub fn estimate(
    events: &[ConsumptionEvent],
    mass_kg: Option<f64>,
    category: Option<DistributionCategory>,
    at_time: DateTime<Utc>,
) -> BacEstimate {
    let profile = Profile { mass_kg, category };
    let Some((mass_kg, category)) = profile.resolved() else {
        return BacEstimate::not_configured();
    };

    if events.is_empty() {
        return BacEstimate::zero(true);
    }

    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.occurred_at);

    let widmark_r = category.widmark_factor();
    let first_time = sorted[0].occurred_at;

    let concentration = round3(raw_concentration(
        &sorted, first_time, mass_kg, widmark_r, at_time,
    ));

    // Completion of the latest event that has started absorbing
    let last_completion = sorted
        .iter()
        .filter(|e| e.occurred_at <= at_time)
        .map(absorption_complete_at)
        .max();

    let trend = if concentration == 0.0 {
        Trend::Zero
    } else if last_completion.is_some_and(|done| at_time < done) {
        Trend::Rising
    } else {
        Trend::Declining
    };

    let peak_concentration = match last_completion {
        Some(peak_time) => {
            let absorbed: Vec<ConsumptionEvent> = sorted
                .iter()
                .filter(|e| e.occurred_at <= peak_time)
                .copied()
                .collect();
            round3(raw_concentration(
                &absorbed, first_time, mass_kg, widmark_r, peak_time,
            ))
        }
        None => 0.0,
    };

    tracing::trace!(
        "Estimated {:.3} (peak {:.3}, {:?}) from {} events at {}",
        concentration,
        peak_concentration,
        trend,
        sorted.len(),
        at_time
    );

    BacEstimate {
        concentration,
        peak_concentration,
        minutes_to_zero: minutes_to_zero(concentration),
        trend,
        is_configured: true,
    }
}

/// Highest concentration reached over a day's events
///
/// Evaluates [`estimate`] at every event's absorption-completion instant,
/// restricted to the events at or before that instant, and keeps the
/// running maximum.
pub fn peak_over_day(
    events: &[ConsumptionEvent],
    mass_kg: Option<f64>,
    category: Option<DistributionCategory>,
) -> f64 {
    let profile = Profile { mass_kg, category };
    if events.is_empty() || !profile.is_configured() {
        return 0.0;
    }

    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.occurred_at);

    let mut max_concentration: f64 = 0.0;
    for event in &sorted {
        let check_time = absorption_complete_at(event);
        let window: Vec<ConsumptionEvent> = sorted
            .iter()
            .filter(|e| e.occurred_at <= check_time)
            .copied()
            .collect();
        let result = estimate(&window, mass_kg, category, check_time);
        max_concentration = max_concentration.max(result.concentration);
    }

    round3(max_concentration)
}

/// Concentration increment of one event once fully absorbed
fn full_contribution(event: &ConsumptionEvent, mass_kg: f64, widmark_r: f64) -> f64 {
    event.alcohol_grams / (mass_kg * widmark_r * 10.0)
}

/// Fraction of an event absorbed at `at_time`
fn absorbed_fraction(event: &ConsumptionEvent, at_time: DateTime<Utc>) -> f64 {
    if at_time < event.occurred_at {
        return 0.0;
    }
    if at_time >= absorption_complete_at(event) {
        return 1.0;
    }

    let elapsed = (at_time - event.occurred_at).num_milliseconds() as f64;
    let window = absorption_window().num_milliseconds() as f64;
    0.5 + 0.5 * (elapsed / window)
}

/// Unrounded, clamped concentration of `events` at `at_time`
fn raw_concentration(
    events: &[ConsumptionEvent],
    first_time: DateTime<Utc>,
    mass_kg: f64,
    widmark_r: f64,
    at_time: DateTime<Utc>,
) -> f64 {
    let total_contribution: f64 = events
        .iter()
        .map(|e| full_contribution(e, mass_kg, widmark_r) * absorbed_fraction(e, at_time))
        .sum();

    let hours_elapsed =
        ((at_time - first_time).num_milliseconds() as f64 / MILLIS_PER_HOUR).max(0.0);
    let elimination = ELIMINATION_RATE_PER_HOUR * hours_elapsed;

    (total_contribution - elimination).max(0.0)
}

fn minutes_to_zero(concentration: f64) -> u32 {
    if concentration <= 0.0 {
        return 0;
    }
    (concentration / ELIMINATION_RATE_PER_HOUR * 60.0).ceil() as u32
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MASS: Option<f64> = Some(70.0);
    const CAT: Option<DistributionCategory> = Some(DistributionCategory::C);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap()
    }

    fn beer_at(offset_minutes: i64) -> ConsumptionEvent {
        ConsumptionEvent::new(13.0, t0() + Duration::minutes(offset_minutes))
    }

    fn full_beer() -> f64 {
        13.0 / (70.0 * 0.615 * 10.0)
    }

    #[test]
    fn test_incomplete_profile_is_not_configured() {
        let events = vec![beer_at(0)];
        for (mass, cat) in [
            (None, CAT),
            (MASS, None),
            (None, None),
            (Some(0.0), CAT),
        ] {
            let result = estimate(&events, mass, cat, t0());
            assert_eq!(result, BacEstimate::not_configured());
            assert_eq!(result.trend, Trend::Zero);
        }
    }

    #[test]
    fn test_empty_events_with_profile() {
        let result = estimate(&[], MASS, CAT, t0());
        assert!(result.is_configured);
        assert_eq!(result.concentration, 0.0);
        assert_eq!(result.peak_concentration, 0.0);
        assert_eq!(result.minutes_to_zero, 0);
        assert_eq!(result.trend, Trend::Zero);
    }

    #[test]
    fn test_single_drink_at_drink_time() {
        let result = estimate(&[beer_at(0)], MASS, CAT, t0());

        assert_eq!(result.concentration, round3(full_beer() * 0.5));
        assert_eq!(result.concentration, 0.015);
        assert_eq!(result.trend, Trend::Rising);
        assert!(result.minutes_to_zero > 0);
    }

    #[test]
    fn test_single_drink_after_absorption() {
        let result = estimate(&[beer_at(0)], MASS, CAT, t0() + Duration::minutes(30));

        assert_eq!(result.concentration, 0.023);
        assert_eq!(result.trend, Trend::Declining);
        assert_eq!(
            result.minutes_to_zero,
            (0.023 / ELIMINATION_RATE_PER_HOUR * 60.0).ceil() as u32
        );
    }

    #[test]
    fn test_single_drink_fully_eliminated() {
        let result = estimate(&[beer_at(0)], MASS, CAT, t0() + Duration::hours(3));

        assert_eq!(result.concentration, 0.0);
        assert_eq!(result.trend, Trend::Zero);
        assert_eq!(result.minutes_to_zero, 0);
        assert!(result.is_configured);
    }

    #[test]
    fn test_partial_absorption_midway() {
        let at = t0() + Duration::minutes(15);
        let result = estimate(&[beer_at(0)], MASS, CAT, at);

        let expected = full_beer() * 0.75 - ELIMINATION_RATE_PER_HOUR * 0.25;
        assert_eq!(result.concentration, round3(expected));
        assert_eq!(result.trend, Trend::Rising);
    }

    #[test]
    fn test_peak_subtracts_elimination_from_first_drink() {
        let events = vec![beer_at(0), beer_at(60)];
        let at = t0() + Duration::minutes(90);
        let result = estimate(&events, MASS, CAT, at);

        let expected = round3(2.0 * full_beer() - ELIMINATION_RATE_PER_HOUR * 1.5);
        assert_eq!(result.peak_concentration, expected);
        assert_eq!(result.concentration, expected);
        assert_eq!(result.trend, Trend::Declining);
    }

    #[test]
    fn test_peak_uses_absorption_of_drinks_after_evaluation() {
        // Second beer is not started at T+10 but is 10 minutes into
        // absorption when the first completes at T+30
        let events = vec![beer_at(0), beer_at(20)];
        let result = estimate(&events, MASS, CAT, t0() + Duration::minutes(10));

        let expected_now = full_beer() * (0.5 + 0.5 / 3.0) - ELIMINATION_RATE_PER_HOUR / 6.0;
        assert_eq!(result.concentration, round3(expected_now));
        assert_eq!(result.trend, Trend::Rising);

        let expected_peak =
            full_beer() + full_beer() * (0.5 + 0.5 / 3.0) - ELIMINATION_RATE_PER_HOUR * 0.5;
        assert_eq!(result.peak_concentration, round3(expected_peak));
        assert_eq!(result.peak_concentration, 0.043);
    }

    #[test]
    fn test_latest_representable_instant_does_not_overflow() {
        let end = DateTime::<Utc>::MAX_UTC;
        let events = vec![
            ConsumptionEvent::new(13.0, end),
            ConsumptionEvent::new(13.0, end - Duration::minutes(10)),
        ];

        assert_eq!(absorption_complete_at(&events[0]), end);

        let result = estimate(&events[..1], MASS, CAT, end);
        assert_eq!(result.concentration, round3(full_beer()));
        assert_eq!(result.trend, Trend::Declining);

        let both = estimate(&events, MASS, CAT, end);
        assert!(both.concentration > result.concentration);
        assert!(peak_over_day(&events, MASS, CAT) > 0.0);
    }

    #[test]
    fn test_future_events_contribute_nothing() {
        let events = vec![beer_at(0), beer_at(120)];
        let at = t0() + Duration::minutes(30);

        let with_future = estimate(&events, MASS, CAT, at);
        let without = estimate(&[beer_at(0)], MASS, CAT, at);

        assert_eq!(with_future.concentration, without.concentration);
        assert_eq!(with_future.trend, without.trend);
    }

    #[test]
    fn test_evaluation_before_every_event_is_zero() {
        let events = vec![beer_at(60), beer_at(90)];
        let result = estimate(&events, MASS, CAT, t0());

        assert!(result.is_configured);
        assert_eq!(result.concentration, 0.0);
        assert_eq!(result.peak_concentration, 0.0);
        assert_eq!(result.trend, Trend::Zero);
    }

    #[test]
    fn test_order_independent() {
        let at = t0() + Duration::minutes(75);
        let forward = vec![beer_at(0), beer_at(20), beer_at(60)];
        let mut reversed = forward.clone();
        reversed.reverse();
        let shuffled = vec![forward[1], forward[2], forward[0]];

        let expected = estimate(&forward, MASS, CAT, at);
        assert_eq!(estimate(&reversed, MASS, CAT, at), expected);
        assert_eq!(estimate(&shuffled, MASS, CAT, at), expected);
    }

    #[test]
    fn test_idempotent() {
        let events = vec![beer_at(0), beer_at(45)];
        let at = t0() + Duration::minutes(50);
        assert_eq!(
            estimate(&events, MASS, CAT, at),
            estimate(&events, MASS, CAT, at)
        );
    }

    #[test]
    fn test_does_not_mutate_input() {
        let events = vec![beer_at(60), beer_at(0)];
        let before = events.clone();
        let _ = estimate(&events, MASS, CAT, t0() + Duration::hours(2));
        assert_eq!(events, before);
    }

    #[test]
    fn test_monotonic_after_absorption() {
        let events = vec![beer_at(0), beer_at(10), beer_at(40)];
        let mut previous = f64::INFINITY;
        for minute in (70..400).step_by(7) {
            let result = estimate(&events, MASS, CAT, t0() + Duration::minutes(minute));
            assert!(result.concentration <= previous);
            assert!(result.concentration >= 0.0);
            previous = result.concentration;
        }
    }

    #[test]
    fn test_never_negative() {
        let events = vec![
            ConsumptionEvent::new(0.0, t0()),
            ConsumptionEvent::new(7.1, t0() + Duration::minutes(5)),
        ];
        for minute in (-120..2000).step_by(37) {
            let result = estimate(&events, Some(120.0), Some(DistributionCategory::A), t0() + Duration::minutes(minute));
            assert!(result.concentration >= 0.0);
            assert!(result.peak_concentration >= 0.0);
        }
    }

    #[test]
    fn test_heavier_category_factor_lowers_estimate() {
        let at = t0() + Duration::minutes(30);
        let a = estimate(&[beer_at(0)], MASS, Some(DistributionCategory::A), at);
        let b = estimate(&[beer_at(0)], MASS, Some(DistributionCategory::B), at);
        assert!(b.concentration > a.concentration);
    }

    #[test]
    fn test_peak_over_day_empty() {
        assert_eq!(peak_over_day(&[], MASS, CAT), 0.0);
        assert_eq!(peak_over_day(&[beer_at(0)], None, CAT), 0.0);
    }

    #[test]
    fn test_peak_over_day_single_drink() {
        let peak = peak_over_day(&[beer_at(0)], MASS, CAT);
        assert_eq!(peak, round3(full_beer() - ELIMINATION_RATE_PER_HOUR * 0.5));
    }

    #[test]
    fn test_peak_over_day_takes_running_maximum() {
        // Late single drink after the first has worn off
        let events = vec![beer_at(0), beer_at(20), beer_at(600)];
        let peak = peak_over_day(&events, MASS, CAT);

        let first_session = estimate(&events[..2], MASS, CAT, t0() + Duration::minutes(50));
        assert_eq!(peak, first_session.concentration);
        assert!(peak > round3(full_beer() - ELIMINATION_RATE_PER_HOUR * 0.5));
    }

    #[test]
    fn test_peak_over_day_order_independent() {
        let events = vec![beer_at(90), beer_at(0), beer_at(30)];
        let mut sorted = events.clone();
        sorted.sort_by_key(|e| e.occurred_at);
        assert_eq!(
            peak_over_day(&events, MASS, CAT),
            peak_over_day(&sorted, MASS, CAT)
        );
    }
}
