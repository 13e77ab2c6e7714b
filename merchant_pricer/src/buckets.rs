use crate::models::{
    BasisMeans, BucketKey, BucketMap, HourlyObs, SimConfig, VolRegime,
};
use crate::valuation::{mean_or_zero, percentile};
use log::debug;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// Bucketized history for one asset: (month, period) buckets plus the
/// historical probability of the HIGH volatility regime.
#[derive(Debug, Clone)]
pub struct BucketizedHistory {
    pub buckets: BucketMap,
    pub p_high: f64,
}

/// Trailing rolling sample standard deviation over `window` observations.
///
/// Only finite observations count toward the window; an hour's value is
/// undefined (None) until `min_periods` of them have accumulated.
pub fn rolling_std(
    values: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut buf: VecDeque<Option<f64>> = VecDeque::with_capacity(window + 1);
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for &v in values {
        buf.push_back(v);
        if let Some(x) = v.filter(|x| x.is_finite()) {
            n += 1;
            sum += x;
            sum_sq += x * x;
        }
        if buf.len() > window {
            if let Some(Some(old)) = buf.pop_front().map(|o| o.filter(|x| x.is_finite())) {
                n -= 1;
                sum -= old;
                sum_sq -= old * old;
            }
        }

        if n >= min_periods.max(2) {
            let var = (sum_sq - sum * sum / n as f64) / (n as f64 - 1.0);
            out.push(Some(var.max(0.0).sqrt()));
        } else {
            out.push(None);
        }
    }
    out
}

/// Partition history into (month, period) buckets and tag HIGH/LOW regimes
/// from the RT hub rolling std against its median.
///
/// Hours whose rolling std is still undefined (warm-up) classify LOW; they
/// are excluded from the median threshold but still count toward the regime
/// probability denominator. (month, period) combinations with no hours are
/// simply absent from the map.
pub fn build_hist_buckets(history: &[HourlyObs], config: &SimConfig) -> BucketizedHistory {
    let rt_hub: Vec<Option<f64>> = history.iter().map(|h| h.rt_hub).collect();
    let roll = rolling_std(&rt_hub, config.rolling_std_hours, config.rolling_min_periods);

    let defined: Vec<f64> = roll.iter().filter_map(|v| *v).collect();
    let threshold = if defined.is_empty() {
        f64::INFINITY
    } else {
        percentile(&defined, 50.0)
    };

    let mut buckets: BucketMap = BTreeMap::new();
    let mut high_hours = 0usize;

    for (obs, roll_std) in history.iter().zip(&roll) {
        let regime = match roll_std {
            Some(v) if *v > threshold => VolRegime::High,
            _ => VolRegime::Low,
        };
        if regime == VolRegime::High {
            high_hours += 1;
        }

        let bucket = buckets
            .entry(BucketKey::new(obs.month(), obs.period))
            .or_default();
        if let Some(g) = obs.gen {
            bucket.gen.push(g);
        }
        if let Some(p) = obs.rt_hub {
            bucket.rt_hub.push(p);
            match regime {
                VolRegime::High => bucket.rt_hub_high.push(p),
                VolRegime::Low => bucket.rt_hub_low.push(p),
            }
        }
        if let Some(p) = obs.da_hub {
            bucket.da_hub.push(p);
        }
        if let Some(b) = obs.rt_basis {
            bucket.rt_basis.push(b);
        }
        if let Some(b) = obs.da_basis {
            bucket.da_basis.push(b);
        }
    }

    let p_high = if history.is_empty() {
        0.0
    } else {
        high_hours as f64 / history.len() as f64
    };
    debug!(
        "bucketized {} hours into {} buckets, p_high={:.4}",
        history.len(),
        buckets.len(),
        p_high
    );

    BucketizedHistory { buckets, p_high }
}

/// Historical mean basis per bucket for the component decomposition.
pub fn basis_means(buckets: &BucketMap) -> BTreeMap<BucketKey, BasisMeans> {
    buckets
        .iter()
        .map(|(key, bucket)| {
            (
                *key,
                BasisMeans {
                    rt: mean_or_zero(&bucket.rt_basis),
                    da: mean_or_zero(&bucket.da_basis),
                },
            )
        })
        .collect()
}
