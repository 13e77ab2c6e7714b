use anyhow::{Context, Result};
use merchant_pricer::{GenForecastRow, NpvComparison, PriceDecomposition};
use serde::Serialize;
use std::path::Path;

/// Generation forecast row as written to CSV, tagged with its asset.
#[derive(Debug, Clone, Serialize)]
pub struct GenForecastOutRow {
    pub year: i32,
    pub month: u32,
    pub asset: String,
    pub market: String,
    pub expected_mwh: f64,
    pub peak_mwh: f64,
    pub off_mwh: f64,
    pub peak_pct: f64,
    pub off_pct: f64,
}

impl GenForecastOutRow {
    pub fn new(asset: &str, market: &str, row: &GenForecastRow) -> Self {
        Self {
            year: row.year,
            month: row.month,
            asset: asset.to_string(),
            market: market.to_string(),
            expected_mwh: round2(row.expected_mwh),
            peak_mwh: round2(row.peak_mwh),
            off_mwh: round2(row.off_mwh),
            peak_pct: row.peak_pct,
            off_pct: row.off_pct,
        }
    }
}

/// Round to cents for the summary tables.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_prices_summary(path: &Path, rows: &[PriceDecomposition]) -> Result<()> {
    write_csv(path, rows)
}

pub fn write_generation_forecast(path: &Path, rows: &[GenForecastOutRow]) -> Result<()> {
    write_csv(path, rows)
}

pub fn write_npv_summary(path: &Path, rows: &[NpvComparison]) -> Result<()> {
    write_csv(path, rows)
}

/// JSON mirror of the price summary, for downstream tooling.
pub fn write_prices_json(path: &Path, rows: &[PriceDecomposition]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(41.23456), 41.23);
        assert_eq!(round2(-3.456), -3.46);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_write_prices_summary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices_summary.csv");
        let rows = vec![PriceDecomposition {
            asset: "Valentino".into(),
            market: "ERCOT".into(),
            product: "RT_BUS".into(),
            hub_component: 42.15,
            basis_component: -3.2,
            risk_adj: -1.05,
            neg_adj: 0.0,
            p_level_price: 37.9,
        }];
        write_prices_summary(&path, &rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert!(reader
            .headers()
            .unwrap()
            .iter()
            .any(|h| h == "p_level_price"));
        let parsed: Vec<PriceDecomposition> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].asset, "Valentino");
        assert_eq!(parsed[0].p_level_price, 37.9);
    }
}
