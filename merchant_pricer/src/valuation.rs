use crate::models::{BasisMeans, BucketKey, ForwardCurve, GenForecastRow, Period, Product};
use std::collections::BTreeMap;

/// Division that treats a zero denominator as a zero result.
pub fn safe_div(a: f64, b: f64) -> f64 {
    if b != 0.0 {
        a / b
    } else {
        0.0
    }
}

/// Mean of a series, 0.0 when empty.
pub fn mean_or_zero(values: &[f64]) -> f64 {
    safe_div(values.iter().sum(), values.len() as f64)
}

/// Map a P-level to the percentile it reads from: P75 -> 25th, P100 -> 0th.
pub fn percentile_from_p_level(p_level: u32) -> f64 {
    100u32.saturating_sub(p_level) as f64
}

/// Linearly interpolated percentile over the sorted sample, matching the
/// standard "linear" definition: rank = q/100 * (n - 1).
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Conservative merchant price at the configured P-level.
pub fn p_level_price(sim_prices: &[f64], p_level: u32) -> f64 {
    percentile(sim_prices, percentile_from_p_level(p_level))
}

/// Decomposition of the P-level price into its pricing components.
#[derive(Debug, Clone, Copy)]
pub struct PriceComponents {
    pub hub: f64,
    pub basis: f64,
    pub risk_adj: f64,
    pub neg_adj: f64,
    pub p_level_price: f64,
}

/// Break the P-level price into hub, basis, risk and negative-price pieces.
///
/// Hub component is the generation-weighted forward price over the horizon;
/// basis component is the generation-weighted historical mean basis (zero for
/// hub-settled products). The risk adjustment is whatever the tail pricing
/// adds on top of those two, and the negative-price adjustment is the shift
/// from enabling curtailment, when a curtailed price was computed.
pub fn compute_components(
    product: Product,
    gen_fc: &[GenForecastRow],
    forwards: &ForwardCurve,
    basis_means: &BTreeMap<BucketKey, BasisMeans>,
    p_price: f64,
    neg_p_price: Option<f64>,
) -> PriceComponents {
    let total_gen: f64 = gen_fc.iter().map(|r| r.expected_mwh).sum();

    let mut gw_hub = 0.0;
    for row in gen_fc {
        if let Some(fw) = forwards.get(row.year, row.month) {
            gw_hub += row.peak_mwh * fw.peak + row.off_mwh * fw.off;
        }
    }
    let hub = safe_div(gw_hub, total_gen);

    let basis = if product.settles_at_hub() {
        0.0
    } else {
        let mut gw_basis = 0.0;
        for row in gen_fc {
            let b_peak = basis_means
                .get(&BucketKey::new(row.month, Period::Peak))
                .map(|m| m.for_product(product))
                .unwrap_or(0.0);
            let b_off = basis_means
                .get(&BucketKey::new(row.month, Period::OffPeak))
                .map(|m| m.for_product(product))
                .unwrap_or(0.0);
            gw_basis += row.peak_mwh * b_peak + row.off_mwh * b_off;
        }
        safe_div(gw_basis, total_gen)
    };

    PriceComponents {
        hub,
        basis,
        risk_adj: p_price - (hub + basis),
        neg_adj: neg_p_price.map(|n| n - p_price).unwrap_or(0.0),
        p_level_price: p_price,
    }
}

/// Monthly-equivalent rate for an annual discount rate.
pub fn monthly_discount_rate(wacc_annual: f64) -> f64 {
    (1.0 + wacc_annual).powf(1.0 / 12.0) - 1.0
}

/// Present value of a flat $/MWh price applied to the monthly forecast
/// volumes, discounting cash flow i by (1 + r_m)^i.
pub fn dcf_monthly(price: f64, gen_fc: &[GenForecastRow], wacc_annual: f64) -> f64 {
    let r_m = monthly_discount_rate(wacc_annual);
    gen_fc
        .iter()
        .enumerate()
        .map(|(i, row)| price * row.expected_mwh / (1.0 + r_m).powi(i as i32 + 1))
        .sum()
}

#[derive(Debug, Clone, Copy)]
pub struct NpvSummary {
    pub merchant_npv: f64,
    pub fixed_npv: f64,
    pub delta_pct: f64,
}

/// Compare the merchant scenario (median simulated price) against a fixed
/// contract at the P-level price.
pub fn summarize_npvs(
    merchant_price: f64,
    fixed_price: f64,
    gen_fc: &[GenForecastRow],
    wacc_annual: f64,
) -> NpvSummary {
    let merchant_npv = dcf_monthly(merchant_price, gen_fc, wacc_annual);
    let fixed_npv = dcf_monthly(fixed_price, gen_fc, wacc_annual);
    let delta_pct = if merchant_npv != 0.0 {
        (fixed_npv - merchant_npv) / merchant_npv * 100.0
    } else {
        0.0
    };
    NpvSummary {
        merchant_npv,
        fixed_npv,
        delta_pct,
    }
}
