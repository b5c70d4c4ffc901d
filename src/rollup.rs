use crate::error::Result;
use crate::models::{BillingRate, CircuitDayCost};
use crate::repositories::rollups::HourlyEnergy;
use crate::repositories::{RateRepository, RollupRepository};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use tracing::{error, info};

/// Most specific bucket wins when windows overlap; the off-peak window is
/// allowed to span the whole day as the catch-all.
const RATE_PRIORITY: [&str; 3] = ["on_peak", "super_off_peak", "off_peak"];

/// The most recently completed hour window `[h-1, h)` relative to `now`.
pub fn hour_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let ts = now.timestamp();
    let hour_end = now - Duration::seconds(ts.rem_euclid(3600))
        - Duration::nanoseconds(now.timestamp_subsec_nanos() as i64);
    (hour_end - Duration::hours(1), hour_end)
}

/// The most recently completed day relative to `now`.
pub fn previous_day(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() - Duration::days(1)
}

/// June through October bills as summer; everything else as winter.
pub fn season_for(day: NaiveDate) -> &'static str {
    if (6..=10).contains(&day.month()) {
        "summer"
    } else {
        "winter"
    }
}

fn window_contains(start: NaiveTime, end: NaiveTime, t: NaiveTime) -> bool {
    if start == end {
        // Degenerate window covers the whole day.
        true
    } else if start < end {
        t >= start && t < end
    } else {
        // Wraps midnight.
        t >= start || t < end
    }
}

/// Pick the billing rate for an hour-of-day in the given season, most
/// specific bucket first. None when no active window matches.
pub fn classify_rate<'a>(
    rates: &'a [BillingRate],
    season: &str,
    t: NaiveTime,
) -> Option<&'a BillingRate> {
    RATE_PRIORITY.iter().find_map(|rate_type| {
        rates.iter().find(|r| {
            r.is_active
                && r.rate_type == *rate_type
                && (r.season == "all" || r.season == season)
                && window_contains(r.start_time, r.end_time, t)
        })
    })
}

/// Fold a day's hourly buckets into per-circuit time-of-use cost records.
/// Hours no rate window covers still count their energy (as off-peak) at
/// zero cost, so bucket kWh always sums to the hourly total.
pub fn accumulate_costs(
    hourly: &[HourlyEnergy],
    rates: &[BillingRate],
    day: NaiveDate,
) -> Vec<CircuitDayCost> {
    let season = season_for(day);
    let mut by_circuit: BTreeMap<i64, CircuitDayCost> = BTreeMap::new();

    for bucket in hourly {
        let entry = by_circuit
            .entry(bucket.circuit_id)
            .or_insert_with(|| CircuitDayCost {
                circuit_id: bucket.circuit_id,
                ..Default::default()
            });

        let kwh = bucket.total_energy_kwh;
        match classify_rate(rates, season, bucket.hour_start.time()) {
            Some(rate) if rate.rate_type == "on_peak" => {
                entry.on_peak_kwh += kwh;
                entry.on_peak_cost += kwh * rate.rate_per_kwh;
            }
            Some(rate) if rate.rate_type == "super_off_peak" => {
                entry.super_off_peak_kwh += kwh;
                entry.super_off_peak_cost += kwh * rate.rate_per_kwh;
            }
            Some(rate) => {
                entry.off_peak_kwh += kwh;
                entry.off_peak_cost += kwh * rate.rate_per_kwh;
            }
            None => {
                entry.off_peak_kwh += kwh;
            }
        }
    }

    by_circuit.into_values().collect()
}

/// Periodic aggregation: raw readings → hourly → daily → cost, each step
/// idempotent and independently retried. Runs on its own cadence, decoupled
/// from the poll loop; a failed step is recomputed on the next scheduled run
/// because its window is already closed.
pub struct RollupEngine {
    rollups: RollupRepository,
    rates: RateRepository,
    sample_interval_secs: f64,
    interval_secs: u64,
}

impl RollupEngine {
    pub fn new(
        rollups: RollupRepository,
        rates: RateRepository,
        sample_interval_secs: u64,
        interval_secs: u64,
    ) -> Self {
        Self {
            rollups,
            rates,
            sample_interval_secs: sample_interval_secs as f64,
            interval_secs,
        }
    }

    pub async fn run(self) {
        let interval = std::time::Duration::from_secs(self.interval_secs);
        loop {
            self.run_once(Utc::now()).await;
            tokio::time::sleep(interval).await;
        }
    }

    /// One scheduled pass. A failing step never blocks the others.
    pub async fn run_once(&self, now: DateTime<Utc>) {
        let (hour_start, hour_end) = hour_window(now);
        match self
            .rollups
            .rollup_hour(hour_start, hour_end, self.sample_interval_secs)
            .await
        {
            Ok(circuits) => info!(%hour_start, circuits, "hourly rollup complete"),
            Err(e) => error!(%hour_start, "hourly rollup failed: {e}"),
        }

        let day = previous_day(now);
        match self.rollups.rollup_day(day).await {
            Ok(circuits) => info!(%day, circuits, "daily rollup complete"),
            Err(e) => error!(%day, "daily rollup failed: {e}"),
        }

        match self.rollup_costs(day).await {
            Ok(circuits) => info!(%day, circuits, "cost rollup complete"),
            Err(e) => error!(%day, "cost rollup failed: {e}"),
        }
    }

    async fn rollup_costs(&self, day: NaiveDate) -> Result<usize> {
        let hourly = self.rollups.hourly_for_day(day).await?;
        if hourly.is_empty() {
            return Ok(0);
        }

        let rates = self.rates.active_rates().await?;
        let costs = accumulate_costs(&hourly, &rates, day);
        self.rollups.upsert_day_costs(day, &costs).await?;
        Ok(costs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn rate(rate_type: &str, season: &str, start: (u32, u32), end: (u32, u32), per_kwh: f64) -> BillingRate {
        BillingRate {
            id: 0,
            rate_name: format!("{season} {rate_type}"),
            rate_type: rate_type.to_string(),
            season: season.to_string(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            rate_per_kwh: per_kwh,
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            is_active: true,
        }
    }

    fn bucket(circuit_id: i64, hour: u32, kwh: f64) -> HourlyEnergy {
        HourlyEnergy {
            circuit_id,
            hour_start: Utc.with_ymd_and_hms(2024, 7, 15, hour, 0, 0).unwrap(),
            total_energy_kwh: kwh,
        }
    }

    #[test]
    fn hour_window_is_the_last_completed_hour() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 10, 34, 56).unwrap();
        let (start, end) = hour_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 7, 15, 9, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 7, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn hour_window_on_the_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 10, 0, 0).unwrap();
        let (start, end) = hour_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 7, 15, 9, 0, 0).unwrap());
        assert_eq!(end, now);
    }

    #[test]
    fn previous_day_crosses_month_boundaries() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(previous_day(now), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn seasons_split_at_june_and_november() {
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()), "winter");
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()), "summer");
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2024, 10, 31).unwrap()), "summer");
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()), "winter");
    }

    #[test]
    fn classify_prefers_specific_windows_over_the_catch_all() {
        let rates = vec![
            rate("on_peak", "summer", (16, 0), (21, 0), 0.45),
            rate("super_off_peak", "summer", (0, 0), (6, 0), 0.25),
            rate("off_peak", "summer", (0, 0), (0, 0), 0.38),
        ];

        let pick = |h| classify_rate(&rates, "summer", NaiveTime::from_hms_opt(h, 0, 0).unwrap());
        assert_eq!(pick(17).unwrap().rate_type, "on_peak");
        assert_eq!(pick(3).unwrap().rate_type, "super_off_peak");
        assert_eq!(pick(12).unwrap().rate_type, "off_peak");
        // Window ends are exclusive.
        assert_eq!(pick(21).unwrap().rate_type, "off_peak");
        assert_eq!(pick(6).unwrap().rate_type, "off_peak");
    }

    #[test]
    fn classify_handles_midnight_wrapping_windows() {
        let rates = vec![rate("super_off_peak", "all", (22, 0), (6, 0), 0.20)];

        let pick = |h| classify_rate(&rates, "winter", NaiveTime::from_hms_opt(h, 0, 0).unwrap());
        assert!(pick(23).is_some());
        assert!(pick(2).is_some());
        assert!(pick(12).is_none());
    }

    #[test]
    fn classify_respects_season_and_active_flag() {
        let mut inactive = rate("on_peak", "all", (0, 0), (0, 0), 0.99);
        inactive.is_active = false;
        let rates = vec![inactive, rate("off_peak", "winter", (0, 0), (0, 0), 0.30)];

        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert!(classify_rate(&rates, "summer", noon).is_none());
        assert_eq!(classify_rate(&rates, "winter", noon).unwrap().rate_type, "off_peak");
    }

    #[test]
    fn accumulate_costs_buckets_by_time_of_use() {
        let rates = vec![
            rate("on_peak", "summer", (16, 0), (21, 0), 0.50),
            rate("super_off_peak", "summer", (0, 0), (6, 0), 0.20),
            rate("off_peak", "summer", (0, 0), (0, 0), 0.30),
        ];
        // July 15th: 03:00 super off-peak, 12:00 off-peak, 18:00 on-peak.
        let hourly = vec![bucket(1, 3, 2.0), bucket(1, 12, 1.0), bucket(1, 18, 4.0)];

        let costs = accumulate_costs(&hourly, &rates, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(costs.len(), 1);
        let c = &costs[0];
        assert_eq!(c.super_off_peak_kwh, 2.0);
        assert_eq!(c.off_peak_kwh, 1.0);
        assert_eq!(c.on_peak_kwh, 4.0);
        assert!((c.super_off_peak_cost - 0.4).abs() < 1e-9);
        assert!((c.off_peak_cost - 0.3).abs() < 1e-9);
        assert!((c.on_peak_cost - 2.0).abs() < 1e-9);
        assert!((c.total_cost() - 2.7).abs() < 1e-9);
    }

    #[test]
    fn accumulate_costs_never_loses_energy() {
        // No rates at all: every hour lands in the off-peak bucket at zero cost.
        let hourly = vec![bucket(1, 0, 1.5), bucket(1, 7, 2.5), bucket(2, 7, 3.0)];

        let costs = accumulate_costs(&hourly, &[], NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[0].circuit_id, 1);
        assert_eq!(costs[0].off_peak_kwh, 4.0);
        assert_eq!(costs[0].total_cost(), 0.0);
        assert_eq!(costs[1].circuit_id, 2);
        assert_eq!(costs[1].off_peak_kwh, 3.0);
    }
}
