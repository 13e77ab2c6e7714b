use crate::models::{
    ForwardCurve, ForwardCurveRow, ForwardPrices, GenForecastRow, HourlyObs, Period, SimConfig,
};
use crate::valuation::safe_div;
use std::collections::BTreeMap;

/// Calendar hours per month, non-leap-year convention.
pub fn month_hours(month: u32) -> f64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 744.0,
        4 | 6 | 9 | 11 => 720.0,
        2 => 672.0,
        _ => 0.0,
    }
}

#[derive(Debug, Default)]
struct MonthStats {
    values: Vec<f64>,
    peak_sum: f64,
    off_sum: f64,
}

impl MonthStats {
    fn mean(&self) -> f64 {
        safe_div(self.values.iter().sum(), self.values.len() as f64)
    }

    /// Sample std; 0.0 with fewer than two observations.
    fn std(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.max(0.0).sqrt()
    }

    fn shares(&self) -> (f64, f64) {
        let total = self.peak_sum + self.off_sum;
        (safe_div(self.peak_sum, total), safe_div(self.off_sum, total))
    }
}

/// Project monthly expected generation forward from historical statistics.
///
/// Expected MWh scales the historical mean hourly generation by the calendar
/// hours in the month; std scales by sqrt(hours). Peak/off-peak MWh follow
/// the historical generation share for that month, defaulting to 50/50 for a
/// month absent from history. All outputs are floored at zero.
pub fn forecast_generation(history: &[HourlyObs], config: &SimConfig) -> Vec<GenForecastRow> {
    let mut by_month: BTreeMap<u32, MonthStats> = BTreeMap::new();
    for obs in history {
        let stats = by_month.entry(obs.month()).or_default();
        if let Some(g) = obs.gen {
            stats.values.push(g);
            match obs.period {
                Period::Peak => stats.peak_sum += g,
                Period::OffPeak => stats.off_sum += g,
            }
        }
    }

    let mut rows = Vec::with_capacity((config.forecast_years * 12).max(0) as usize);
    for year in config.forecast_start_year..config.forecast_end_year() {
        for month in 1..=12 {
            let hours = month_hours(month);
            let (mean, std, peak_pct, off_pct) = match by_month.get(&month) {
                Some(stats) => {
                    let (p, o) = stats.shares();
                    (stats.mean(), stats.std(), p, o)
                }
                None => (0.0, 0.0, 0.5, 0.5),
            };
            let expected_mwh = (mean * hours).max(0.0);
            rows.push(GenForecastRow {
                year,
                month,
                expected_mwh,
                std_mwh: (std * hours.sqrt()).max(0.0),
                peak_mwh: (expected_mwh * peak_pct).max(0.0),
                off_mwh: (expected_mwh * off_pct).max(0.0),
                peak_pct,
                off_pct,
            });
        }
    }
    rows
}

/// Filter the multi-market forward table down to one market and the forecast
/// window, keyed for (year, month) lookup.
pub fn select_forwards(rows: &[ForwardCurveRow], market: &str, config: &SimConfig) -> ForwardCurve {
    let mut curve = ForwardCurve::default();
    for row in rows {
        if !row.market.eq_ignore_ascii_case(market) {
            continue;
        }
        if row.year < config.forecast_start_year || row.year >= config.forecast_end_year() {
            continue;
        }
        curve.insert(
            row.year,
            row.month,
            ForwardPrices {
                peak: row.peak,
                off: row.off_peak,
            },
        );
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn obs_at(ts: chrono::NaiveDateTime, gen: f64, config: &SimConfig) -> HourlyObs {
        HourlyObs {
            timestamp: ts,
            gen: Some(gen),
            rt_hub: Some(40.0),
            da_hub: Some(39.0),
            rt_basis: None,
            da_basis: None,
            period: config.period_of(&ts),
        }
    }

    fn january_history(gen: impl Fn(usize) -> f64, config: &SimConfig) -> Vec<HourlyObs> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..24 * 31)
            .map(|i| obs_at(start + Duration::hours(i as i64), gen(i), config))
            .collect()
    }

    #[test]
    fn test_month_hours_table() {
        assert_eq!(month_hours(1), 744.0);
        assert_eq!(month_hours(2), 672.0);
        assert_eq!(month_hours(9), 720.0);
        let total: f64 = (1..=12).map(month_hours).sum();
        assert_eq!(total, 8760.0);
    }

    #[test]
    fn test_constant_generation_forecast() {
        let config = SimConfig::default();
        let history = january_history(|_| 10.0, &config);
        let rows = forecast_generation(&history, &config);

        assert_eq!(rows.len(), 60);
        assert_eq!(rows[0].year, 2026);
        assert_eq!(rows[0].month, 1);

        // January: mean 10 MW over 744 hours, zero dispersion
        assert!((rows[0].expected_mwh - 7440.0).abs() < 1e-9);
        assert_eq!(rows[0].std_mwh, 0.0);
        assert!((rows[0].peak_mwh + rows[0].off_mwh - rows[0].expected_mwh).abs() < 1e-9);
        assert!((rows[0].peak_pct + rows[0].off_pct - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_months_absent_from_history_default_to_even_split() {
        let config = SimConfig::default();
        let history = january_history(|_| 10.0, &config);
        let rows = forecast_generation(&history, &config);

        let june = rows.iter().find(|r| r.year == 2026 && r.month == 6).unwrap();
        assert_eq!(june.expected_mwh, 0.0);
        assert_eq!(june.peak_pct, 0.5);
        assert_eq!(june.off_pct, 0.5);
    }

    #[test]
    fn test_rows_are_chronological() {
        let config = SimConfig::default();
        let history = january_history(|_| 10.0, &config);
        let rows = forecast_generation(&history, &config);

        for pair in rows.windows(2) {
            assert!((pair[0].year, pair[0].month) < (pair[1].year, pair[1].month));
        }
    }

    #[test]
    fn test_forward_selection_filters_market_and_window() {
        let config = SimConfig::default();
        let rows = vec![
            ForwardCurveRow {
                market: "ercot".into(),
                year: 2026,
                month: 1,
                peak: 55.0,
                off_peak: 32.0,
            },
            ForwardCurveRow {
                market: "MISO".into(),
                year: 2026,
                month: 1,
                peak: 41.0,
                off_peak: 28.0,
            },
            // outside the five-year window
            ForwardCurveRow {
                market: "ERCOT".into(),
                year: 2031,
                month: 1,
                peak: 60.0,
                off_peak: 35.0,
            },
        ];
        let curve = select_forwards(&rows, "ERCOT", &config);

        assert_eq!(curve.len(), 1);
        assert_eq!(curve.get(2026, 1).unwrap().peak, 55.0);
        assert!(curve.get(2031, 1).is_none());
    }
}
