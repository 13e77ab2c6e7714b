use crate::models::{
    BucketKey, BucketMap, ForwardCurve, GenForecastRow, HistBucket, Period, Product, SimConfig,
};
use crate::valuation::{mean_or_zero, safe_div};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Floor for the hub price magnitude inside the congestion stress factor.
const STRESS_EPS: f64 = 1e-6;

/// Congestion stress transform: inflate a bootstrapped basis draw when it is
/// large relative to the simulated hub price.
pub fn stress_basis(basis: f64, hub_price: f64, alpha: f64) -> f64 {
    let csf = safe_div(basis.abs(), hub_price.abs().max(STRESS_EPS));
    basis * (1.0 + alpha * csf)
}

/// Occurrences of the silent fallbacks flagged in the design review, counted
/// so validation runs can see them.
#[derive(Debug, Default)]
struct FallbackCounters {
    forward_misses: usize,
    regime_fallbacks: usize,
    empty_series_draws: usize,
}

/// Regime-aware bootstrap simulator for merchant $/MWh prices.
///
/// Holds read-only views of one asset's bucketized history, generation
/// forecast and forward curve; each `simulate` call owns its own seeded
/// generator and is fully reproducible.
pub struct MonteCarloSimulator<'a> {
    config: &'a SimConfig,
    buckets: &'a BucketMap,
    forecast: &'a [GenForecastRow],
    forwards: &'a ForwardCurve,
    p_high: f64,
}

impl<'a> MonteCarloSimulator<'a> {
    pub fn new(
        config: &'a SimConfig,
        buckets: &'a BucketMap,
        forecast: &'a [GenForecastRow],
        forwards: &'a ForwardCurve,
        p_high: f64,
    ) -> Self {
        Self {
            config,
            buckets,
            forecast,
            forwards,
            p_high,
        }
    }

    /// Run `n_sims` trials and return one generation-weighted average price
    /// per trial, in trial order.
    pub fn simulate(
        &self,
        product: Product,
        negative_rule: bool,
        seed: u64,
        n_sims: usize,
    ) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counters = FallbackCounters::default();

        counters.forward_misses = self
            .forecast
            .iter()
            .filter(|r| self.forwards.get(r.year, r.month).is_none())
            .count();

        let mut out = Vec::with_capacity(n_sims);
        for _ in 0..n_sims {
            out.push(self.run_trial(product, negative_rule, &mut rng, &mut counters));
        }

        if counters.forward_misses > 0 {
            warn!(
                "{}: {} forecast months had no forward price (treated as 0.0)",
                product.label(),
                counters.forward_misses
            );
        }
        if counters.regime_fallbacks > 0 || counters.empty_series_draws > 0 {
            debug!(
                "{}: {} regime-subset fallbacks, {} empty-series draws across {} trials",
                product.label(),
                counters.regime_fallbacks,
                counters.empty_series_draws,
                n_sims
            );
        }
        out
    }

    fn run_trial(
        &self,
        product: Product,
        negative_rule: bool,
        rng: &mut StdRng,
        counters: &mut FallbackCounters,
    ) -> f64 {
        let mut tot_rev = 0.0;
        let mut tot_gen = 0.0;

        for row in self.forecast {
            let fw = self.forwards.get(row.year, row.month).unwrap_or_default();

            let peak_mwh = draw_volume(rng, row.peak_mwh, row.std_mwh * row.peak_pct);
            let off_mwh = draw_volume(rng, row.off_mwh, row.std_mwh * row.off_pct);

            for (period, mwh, fw_price) in [
                (Period::Peak, peak_mwh, fw.peak),
                (Period::OffPeak, off_mwh, fw.off),
            ] {
                if mwh <= 0.0 {
                    continue;
                }
                let Some(bucket) = self.buckets.get(&BucketKey::new(row.month, period)) else {
                    continue;
                };

                let hub_draw = self.hub_draw(bucket, product, rng, counters);
                let hub_mean = mean_or_zero(bucket.hub_series(product.is_rt()));
                let hub_sim = fw_price + (hub_draw - hub_mean);

                let node_sim = if product.settles_at_hub() {
                    hub_sim
                } else {
                    hub_sim + self.basis_draw_stressed(bucket, product, hub_sim, rng, counters)
                };

                let eff_mwh = if negative_rule && node_sim < 0.0 { 0.0 } else { mwh };
                tot_rev += eff_mwh * node_sim;
                tot_gen += eff_mwh;
            }
        }

        safe_div(tot_rev, tot_gen)
    }

    /// Hub bootstrap. RT products flip a regime coin against `p_high` and
    /// draw from the matching subset, falling back HIGH -> LOW -> full when
    /// a subset is empty; DA products bootstrap the full DA series.
    fn hub_draw(
        &self,
        bucket: &HistBucket,
        product: Product,
        rng: &mut StdRng,
        counters: &mut FallbackCounters,
    ) -> f64 {
        if !product.is_rt() {
            if bucket.da_hub.is_empty() {
                counters.empty_series_draws += 1;
            }
            return bootstrap(&bucket.da_hub, rng);
        }

        let take_high = rng.gen::<f64>() < self.p_high;
        if take_high && !bucket.rt_hub_high.is_empty() {
            return bootstrap(&bucket.rt_hub_high, rng);
        }
        if take_high {
            counters.regime_fallbacks += 1;
        }
        if !bucket.rt_hub_low.is_empty() {
            return bootstrap(&bucket.rt_hub_low, rng);
        }
        counters.regime_fallbacks += 1;
        bootstrap(&bucket.rt_hub, rng)
    }

    fn basis_draw_stressed(
        &self,
        bucket: &HistBucket,
        product: Product,
        hub_sim: f64,
        rng: &mut StdRng,
        counters: &mut FallbackCounters,
    ) -> f64 {
        let series = bucket.basis_series(product.is_rt());
        if series.is_empty() {
            counters.empty_series_draws += 1;
            return 0.0;
        }
        let basis = bootstrap(series, rng);
        stress_basis(basis, hub_sim, self.config.basis_stress_alpha)
    }
}

/// Uniform bootstrap from a historical series; 0.0 for an empty series,
/// without consuming the generator.
fn bootstrap(series: &[f64], rng: &mut StdRng) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series[rng.gen_range(0..series.len())]
}

/// Normal volume draw floored at zero. A zero sigma short-circuits to the
/// mean and leaves the generator untouched.
fn draw_volume(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let v = if std_dev > 0.0 {
        match Normal::new(mean, std_dev) {
            Ok(dist) => dist.sample(rng),
            Err(_) => mean,
        }
    } else {
        mean
    };
    v.max(0.0)
}
