use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable run configuration, passed explicitly into each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Conservative price level, e.g. 75 means "exceeded 75% of the time".
    pub p_level: u32,
    pub n_sims: usize,
    pub seed: u64,
    /// Zero out volume when the simulated node price goes negative.
    pub negative_price_rule: bool,
    pub forecast_start_year: i32,
    pub forecast_years: i32,
    pub wacc_annual: f64,
    /// Trailing window for the regime-detection rolling std, in hours.
    pub rolling_std_hours: usize,
    /// Minimum observations before the rolling std is defined.
    pub rolling_min_periods: usize,
    /// Congestion stress scaler applied to bootstrapped basis draws.
    pub basis_stress_alpha: f64,
    /// Peak window in hour-beginning terms, inclusive on both ends.
    pub peak_hour_start: u32,
    pub peak_hour_end: u32,
    /// Peak weekdays as days-from-Monday (0 = Mon .. 6 = Sun).
    pub peak_days: Vec<u32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            p_level: 75,
            n_sims: 3000,
            seed: 504,
            negative_price_rule: false,
            forecast_start_year: 2026,
            forecast_years: 5,
            wacc_annual: 0.05,
            rolling_std_hours: 24 * 30,
            rolling_min_periods: 24,
            basis_stress_alpha: 0.3,
            peak_hour_start: 7,
            peak_hour_end: 22,
            peak_days: vec![0, 1, 2, 3, 4],
        }
    }
}

impl SimConfig {
    pub fn is_peak(&self, timestamp: &NaiveDateTime) -> bool {
        let dow = timestamp.weekday().num_days_from_monday();
        self.peak_days.contains(&dow)
            && timestamp.hour() >= self.peak_hour_start
            && timestamp.hour() <= self.peak_hour_end
    }

    pub fn period_of(&self, timestamp: &NaiveDateTime) -> Period {
        if self.is_peak(timestamp) {
            Period::Peak
        } else {
            Period::OffPeak
        }
    }

    pub fn forecast_end_year(&self) -> i32 {
        self.forecast_start_year + self.forecast_years
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    Peak,
    OffPeak,
}

impl Period {
    pub const BOTH: [Period; 2] = [Period::Peak, Period::OffPeak];

    pub fn label(self) -> &'static str {
        match self {
            Period::Peak => "Peak",
            Period::OffPeak => "Off-Peak",
        }
    }
}

/// Hourly volatility regime from the rolling-std classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolRegime {
    High,
    Low,
}

/// Settlement product being priced: RT/DA settlement at hub or busbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Product {
    RtHub,
    RtBus,
    DaHub,
    DaBus,
}

impl Product {
    pub const ALL: [Product; 4] =
        [Product::RtHub, Product::RtBus, Product::DaHub, Product::DaBus];

    pub fn is_rt(self) -> bool {
        matches!(self, Product::RtHub | Product::RtBus)
    }

    pub fn settles_at_hub(self) -> bool {
        matches!(self, Product::RtHub | Product::DaHub)
    }

    pub fn label(self) -> &'static str {
        match self {
            Product::RtHub => "RT_HUB",
            Product::RtBus => "RT_BUS",
            Product::DaHub => "DA_HUB",
            Product::DaBus => "DA_BUS",
        }
    }
}

/// One hour of settled history for an asset. Prices are optional because
/// column coverage varies by market; basis is only defined where both the
/// node and hub prices settled.
#[derive(Debug, Clone)]
pub struct HourlyObs {
    /// Hour-beginning timestamp (HE 1 maps to 00:00).
    pub timestamp: NaiveDateTime,
    pub gen: Option<f64>,
    pub rt_hub: Option<f64>,
    pub da_hub: Option<f64>,
    pub rt_basis: Option<f64>,
    pub da_basis: Option<f64>,
    pub period: Period,
}

impl HourlyObs {
    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }
}

/// Composite key for historical buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub month: u32,
    pub period: Period,
}

impl BucketKey {
    pub fn new(month: u32, period: Period) -> Self {
        Self { month, period }
    }
}

/// Historical series for one (month, period) bucket. Built once per asset,
/// then consumed read-only by the simulator.
#[derive(Debug, Clone, Default)]
pub struct HistBucket {
    pub gen: Vec<f64>,
    pub rt_hub: Vec<f64>,
    pub da_hub: Vec<f64>,
    pub rt_basis: Vec<f64>,
    pub da_basis: Vec<f64>,
    pub rt_hub_high: Vec<f64>,
    pub rt_hub_low: Vec<f64>,
}

impl HistBucket {
    pub fn hub_series(&self, is_rt: bool) -> &[f64] {
        if is_rt {
            &self.rt_hub
        } else {
            &self.da_hub
        }
    }

    pub fn basis_series(&self, is_rt: bool) -> &[f64] {
        if is_rt {
            &self.rt_basis
        } else {
            &self.da_basis
        }
    }
}

/// BTreeMap keeps bucket iteration deterministic across runs.
pub type BucketMap = BTreeMap<BucketKey, HistBucket>;

/// Historical mean basis per bucket, used by the component decomposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasisMeans {
    pub rt: f64,
    pub da: f64,
}

impl BasisMeans {
    pub fn for_product(&self, product: Product) -> f64 {
        if product.is_rt() {
            self.rt
        } else {
            self.da
        }
    }
}

/// Monthly generation forecast, chronological over the horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenForecastRow {
    pub year: i32,
    pub month: u32,
    pub expected_mwh: f64,
    pub std_mwh: f64,
    pub peak_mwh: f64,
    pub off_mwh: f64,
    pub peak_pct: f64,
    pub off_pct: f64,
}

/// One row of the externally supplied multi-market forward curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardCurveRow {
    pub market: String,
    pub year: i32,
    pub month: u32,
    pub peak: f64,
    pub off_peak: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForwardPrices {
    pub peak: f64,
    pub off: f64,
}

/// Forward hub prices for one market, keyed by (year, month). A lookup miss
/// is a valid outcome; the simulator treats it as a 0.0 forward.
#[derive(Debug, Clone, Default)]
pub struct ForwardCurve {
    prices: BTreeMap<(i32, u32), ForwardPrices>,
}

impl ForwardCurve {
    pub fn insert(&mut self, year: i32, month: u32, prices: ForwardPrices) {
        self.prices.insert((year, month), prices);
    }

    pub fn get(&self, year: i32, month: u32) -> Option<ForwardPrices> {
        self.prices.get(&(year, month)).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Per-asset, per-product price decomposition summary row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceDecomposition {
    pub asset: String,
    pub market: String,
    pub product: String,
    pub hub_component: f64,
    pub basis_component: f64,
    pub risk_adj: f64,
    pub neg_adj: f64,
    pub p_level_price: f64,
}

/// Merchant-vs-fixed discounted cash flow comparison for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvComparison {
    pub asset: String,
    pub market: String,
    pub merchant_p50_price: f64,
    pub fixed_p_level_price: f64,
    pub merchant_p50_npv: f64,
    pub fixed_p_level_npv: f64,
    pub delta_pct: f64,
}
