//! Drink history windows and per-day statistics.
//!
//! This module turns the raw drink log into what the views consume:
//! the recent window fed to the live estimate, and per-day peaks for
//! the statistics screen.

use crate::engine::peak_over_day;
use crate::{catalog, ConsumptionEvent, DrinkEntry, Error, Profile, Result};
use chrono::{DateTime, Duration, NaiveDate, Offset, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Load drinks from the last `days` days, newest first
pub fn load_recent_entries(
    log_path: &Path,
    now: DateTime<Utc>,
    days: i64,
) -> Result<Vec<DrinkEntry>> {
    let window = Duration::try_days(days)
        .filter(|w| *w >= Duration::zero())
        .ok_or_else(|| Error::Other(format!("History window of {} days is out of range", days)))?;
    let cutoff = now
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let all = crate::log::read_entries(log_path)?;
    let entries = crate::log::entries_in_range(&all, cutoff, DateTime::<Utc>::MAX_UTC);

    tracing::info!(
        "Loaded {} drinks from last {} days",
        entries.len(),
        days
    );
    Ok(entries)
}

/// Events strictly newer than `now - lookback`
///
/// The live view only feeds this window to the engine; older drinks
/// cannot still be in the blood.
pub fn events_since(
    entries: &[DrinkEntry],
    now: DateTime<Utc>,
    lookback: Duration,
) -> Vec<ConsumptionEvent> {
    let cutoff = now
        .checked_sub_signed(lookback)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    entries
        .iter()
        .filter(|e| e.occurred_at > cutoff)
        .map(DrinkEntry::to_event)
        .collect()
}

/// Bucket entries by local calendar date in `tz`
pub fn group_by_day<Tz: TimeZone>(
    entries: &[DrinkEntry],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<DrinkEntry>> {
    let mut days: BTreeMap<NaiveDate, Vec<DrinkEntry>> = BTreeMap::new();
    for entry in entries {
        days.entry(local_date(entry.occurred_at, tz))
            .or_default()
            .push(entry.clone());
    }
    days
}

/// Calendar date of `instant` in `tz`, falling back to the UTC date when
/// the local time is past chrono's range
fn local_date<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    let utc = instant.naive_utc();
    let offset = tz.offset_from_utc_datetime(&utc).fix().local_minus_utc();
    utc.checked_add_signed(Duration::seconds(i64::from(offset)))
        .unwrap_or(utc)
        .date()
}

/// One calendar day of drinking
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub count: usize,
    pub calories: u32,
    /// Highest estimated concentration that day; 0 without a profile
    pub peak_concentration: f64,
}

/// Per-day count, calories and peak, oldest day first
pub fn daily_summaries<Tz: TimeZone>(
    entries: &[DrinkEntry],
    profile: &Profile,
    tz: &Tz,
) -> Vec<DailySummary> {
    group_by_day(entries, tz)
        .into_iter()
        .map(|(date, day)| {
            let events: Vec<ConsumptionEvent> = day.iter().map(DrinkEntry::to_event).collect();
            DailySummary {
                date,
                count: day.len(),
                calories: day.iter().map(|e| catalog::calories(e.drink_type)).sum(),
                peak_concentration: peak_over_day(&events, profile.mass_kg, profile.category),
            }
        })
        .collect()
}

/// Aggregate over a reporting period (e.g. a month)
#[derive(Clone, Debug, Serialize, PartialEq, Default)]
pub struct PeriodSummary {
    pub drink_count: usize,
    pub total_calories: u32,
    pub drinking_days: usize,
    pub highest_peak: f64,
    /// Mean of daily peaks over drinking days, rounded to 3 decimals
    pub average_peak: f64,
}

impl PeriodSummary {
    pub fn compute<Tz: TimeZone>(entries: &[DrinkEntry], profile: &Profile, tz: &Tz) -> Self {
        let days = daily_summaries(entries, profile, tz);
        let drinking_days = days.len();

        let mut summary = PeriodSummary {
            drink_count: entries.len(),
            total_calories: days.iter().map(|d| d.calories).sum(),
            drinking_days,
            ..Default::default()
        };

        if !profile.is_configured() || drinking_days == 0 {
            return summary;
        }

        let total_peak: f64 = days.iter().map(|d| d.peak_concentration).sum();
        summary.highest_peak = days
            .iter()
            .map(|d| d.peak_concentration)
            .fold(0.0, f64::max);
        summary.average_peak = (total_peak / drinking_days as f64 * 1000.0).round() / 1000.0;

        tracing::debug!(
            "Period summary: {} drinks over {} days, highest peak {:.3}",
            summary.drink_count,
            drinking_days,
            summary.highest_peak
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{DrinkSink, JsonlLog};
    use crate::{DistributionCategory, DrinkType};
    use chrono::FixedOffset;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, hour, minute, 0).unwrap()
    }

    fn profile() -> Profile {
        Profile::new(70.0, DistributionCategory::C)
    }

    #[test]
    fn test_load_recent_entries_window_and_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("drinks.jsonl");
        let now = at(20, 12, 0);

        let mut log = JsonlLog::new(&log_path);
        log.append(&DrinkEntry::new(DrinkType::Beer, now - Duration::days(3))).unwrap();
        log.append(&DrinkEntry::new(DrinkType::Wine, now - Duration::days(1))).unwrap();
        log.append(&DrinkEntry::new(DrinkType::Other, now - Duration::days(10))).unwrap();

        let entries = load_recent_entries(&log_path, now, 7).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].drink_type, DrinkType::Wine);
        assert_eq!(entries[1].drink_type, DrinkType::Beer);
    }

    #[test]
    fn test_load_recent_entries_rejects_out_of_range_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("drinks.jsonl");
        let now = at(20, 12, 0);

        let result = load_recent_entries(&log_path, now, i64::MAX);
        assert!(matches!(result, Err(Error::Other(_))));
        assert!(load_recent_entries(&log_path, now, -1).is_err());

        // Large but representable windows reach back to the first drink
        JsonlLog::new(&log_path)
            .append(&DrinkEntry::new(DrinkType::Beer, now - Duration::days(400)))
            .unwrap();
        assert_eq!(load_recent_entries(&log_path, now, 100_000_000).unwrap().len(), 1);
    }

    #[test]
    fn test_summaries_for_drink_at_end_of_time() {
        let last = DateTime::<Utc>::MAX_UTC - Duration::minutes(5);
        let entries = vec![DrinkEntry::new(DrinkType::Beer, last)];

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let days = daily_summaries(&entries, &profile(), &plus_two);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, last.date_naive());
        assert!(days[0].peak_concentration > 0.0);

        let events = events_since(&entries, last, Duration::days(365_000_000));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_events_since_excludes_old_drinks() {
        let now = at(20, 12, 0);
        let entries = vec![
            DrinkEntry::new(DrinkType::Beer, now - Duration::hours(24)),
            DrinkEntry::new(DrinkType::Wine, now - Duration::hours(2)),
        ];

        let events = events_since(&entries, now, Duration::hours(24));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alcohol_grams, 14.2);
    }

    #[test]
    fn test_group_by_day_uses_local_date() {
        // 23:30 UTC is already the next day at UTC+2
        let entries = vec![
            DrinkEntry::new(DrinkType::Beer, at(3, 23, 30)),
            DrinkEntry::new(DrinkType::Beer, at(3, 10, 0)),
        ];

        let utc_days = group_by_day(&entries, &Utc);
        assert_eq!(utc_days.len(), 1);

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local_days = group_by_day(&entries, &plus_two);
        assert_eq!(local_days.len(), 2);
        assert!(local_days.contains_key(&NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()));
    }

    #[test]
    fn test_daily_summaries() {
        let entries = vec![
            DrinkEntry::new(DrinkType::Beer, at(1, 20, 0)),
            DrinkEntry::new(DrinkType::Beer, at(1, 21, 0)),
            DrinkEntry::new(DrinkType::Wine, at(2, 19, 0)),
        ];

        let days = daily_summaries(&entries, &profile(), &Utc);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].count, 2);
        assert_eq!(days[0].calories, 300);
        assert!(days[0].peak_concentration > days[1].peak_concentration);

        let without_profile = daily_summaries(&entries, &Profile::default(), &Utc);
        assert!(without_profile.iter().all(|d| d.peak_concentration == 0.0));
    }

    #[test]
    fn test_period_summary() {
        let entries = vec![
            DrinkEntry::new(DrinkType::Beer, at(1, 20, 0)),
            DrinkEntry::new(DrinkType::Beer, at(1, 21, 0)),
            DrinkEntry::new(DrinkType::Wine, at(2, 19, 0)),
        ];

        let summary = PeriodSummary::compute(&entries, &profile(), &Utc);
        let days = daily_summaries(&entries, &profile(), &Utc);

        assert_eq!(summary.drink_count, 3);
        assert_eq!(summary.drinking_days, 2);
        assert_eq!(summary.total_calories, 425);
        assert_eq!(summary.highest_peak, days[0].peak_concentration);
        let mean = (days[0].peak_concentration + days[1].peak_concentration) / 2.0;
        assert_eq!(summary.average_peak, (mean * 1000.0).round() / 1000.0);
    }

    #[test]
    fn test_period_summary_empty_and_unconfigured() {
        assert_eq!(
            PeriodSummary::compute(&[], &profile(), &Utc),
            PeriodSummary::default()
        );

        let entries = vec![DrinkEntry::new(DrinkType::Beer, at(1, 20, 0))];
        let summary = PeriodSummary::compute(&entries, &Profile::default(), &Utc);
        assert_eq!(summary.drink_count, 1);
        assert_eq!(summary.highest_peak, 0.0);
        assert_eq!(summary.average_peak, 0.0);
    }
}
