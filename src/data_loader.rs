use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use merchant_pricer::{ForwardCurveRow, HourlyObs, SimConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// One merchant asset and the market it settles in.
#[derive(Debug, Clone)]
pub struct AssetSpec {
    pub name: String,
    pub market: String,
    pub technology: String,
}

impl AssetSpec {
    fn new(name: &str, market: &str, technology: &str) -> Self {
        Self {
            name: name.to_string(),
            market: market.to_string(),
            technology: technology.to_string(),
        }
    }
}

/// The portfolio under analysis: one asset per market.
pub fn default_assets() -> Vec<AssetSpec> {
    vec![
        AssetSpec::new("Valentino", "ERCOT", "Wind"),
        AssetSpec::new("Mantero", "MISO", "Wind"),
        AssetSpec::new("Howling_Gale", "CAISO", "Solar"),
    ]
}

/// Historical CSVs are named `{market}_{asset}.csv`, lowercase.
pub fn asset_csv_path(data_dir: &Path, asset: &AssetSpec) -> PathBuf {
    data_dir.join(format!(
        "{}_{}.csv",
        asset.market.to_lowercase(),
        asset.name.to_lowercase()
    ))
}

#[derive(Debug, Deserialize)]
struct HistoricalCsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "HE")]
    he: u32,
    #[serde(rename = "Gen", default)]
    gen: Option<f64>,
    #[serde(rename = "RT_Busbar", default)]
    rt_busbar: Option<f64>,
    #[serde(rename = "RT_Hub", default)]
    rt_hub: Option<f64>,
    #[serde(rename = "DA_Busbar", default)]
    da_busbar: Option<f64>,
    #[serde(rename = "DA_Hub", default)]
    da_hub: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForwardCsvRow {
    #[serde(rename = "Market")]
    market: String,
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "Peak")]
    peak: f64,
    #[serde(rename = "Off_Peak")]
    off_peak: f64,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .with_context(|| format!("unparseable date '{s}'"))
}

fn require_headers(headers: &csv::StringRecord, required: &[&str], path: &Path) -> Result<()> {
    for name in required {
        if !headers.iter().any(|h| h.trim() == *name) {
            bail!(
                "{} is missing required column '{}' (found: {:?})",
                path.display(),
                name,
                headers.iter().collect::<Vec<_>>()
            );
        }
    }
    Ok(())
}

/// Load one asset's hourly settlement history, deriving basis, period and the
/// hour-beginning timestamp (Date + HE - 1).
///
/// `Date`, `HE`, `Gen` and `RT_Hub` columns are required; DA and busbar
/// columns vary by market and may be absent or sparse.
pub fn load_asset_history(path: &Path, config: &SimConfig) -> Result<Vec<HourlyObs>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("missing historical file {}", path.display()))?;
    require_headers(reader.headers()?, &["Date", "HE", "Gen", "RT_Hub"], path)?;

    let mut history = Vec::new();
    for (idx, record) in reader.deserialize::<HistoricalCsvRow>().enumerate() {
        let row = record.with_context(|| format!("{} row {}", path.display(), idx + 2))?;
        if row.he < 1 || row.he > 24 {
            bail!("{} row {}: HE {} outside 1-24", path.display(), idx + 2, row.he);
        }
        let date = parse_date(&row.date)?;
        let timestamp = date.and_hms_opt(0, 0, 0).unwrap() + Duration::hours(row.he as i64 - 1);

        let rt_basis = match (row.rt_busbar, row.rt_hub) {
            (Some(bus), Some(hub)) => Some(bus - hub),
            _ => None,
        };
        let da_basis = match (row.da_busbar, row.da_hub) {
            (Some(bus), Some(hub)) => Some(bus - hub),
            _ => None,
        };

        history.push(HourlyObs {
            timestamp,
            gen: row.gen,
            rt_hub: row.rt_hub,
            da_hub: row.da_hub,
            rt_basis,
            da_basis,
            period: config.period_of(&timestamp),
        });
    }

    history.sort_by_key(|obs| obs.timestamp);
    log::info!(
        "loaded {} hours from {} ({} - {})",
        history.len(),
        path.display(),
        history.first().map(|o| o.timestamp.to_string()).unwrap_or_default(),
        history.last().map(|o| o.timestamp.to_string()).unwrap_or_default()
    );
    Ok(history)
}

/// Load the multi-market forward curve table (`Market`, `Month`, `Peak`,
/// `Off_Peak`, one row per market-month).
pub fn load_forward_curves(path: &Path) -> Result<Vec<ForwardCurveRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("missing forward curve file {}", path.display()))?;
    require_headers(reader.headers()?, &["Market", "Month", "Peak", "Off_Peak"], path)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<ForwardCsvRow>().enumerate() {
        let row = record.with_context(|| format!("{} row {}", path.display(), idx + 2))?;
        let month_date = parse_date(&row.month)?;
        rows.push(ForwardCurveRow {
            market: row.market,
            year: month_date.year(),
            month: month_date.month(),
            peak: row.peak,
            off_peak: row.off_peak,
        });
    }
    log::info!("loaded {} forward curve rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use merchant_pricer::Period;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_asset_history_derives_fields() {
        let csv = "\
Date,HE,Gen,RT_Busbar,RT_Hub,DA_Busbar,DA_Hub
2024-01-01,1,5.0,28.0,30.0,29.5,31.0
2024-01-01,13,8.0,,42.0,41.0,40.0
";
        let file = write_temp(csv);
        let config = SimConfig::default();
        let history = load_asset_history(file.path(), &config).unwrap();

        assert_eq!(history.len(), 2);
        // HE 1 -> hour-beginning 00:00
        assert_eq!(history[0].timestamp.to_string(), "2024-01-01 00:00:00");
        assert_eq!(history[0].rt_basis, Some(-2.0));
        assert_eq!(history[0].da_basis, Some(-1.5));
        // 2024-01-01 is a Monday; HE 13 begins at 12:00
        assert_eq!(history[1].period, Period::Peak);
        assert_eq!(history[0].period, Period::OffPeak);
        // missing busbar -> undefined basis, hub still usable
        assert_eq!(history[1].rt_basis, None);
        assert_eq!(history[1].rt_hub, Some(42.0));
    }

    #[test]
    fn test_missing_required_header_is_fatal() {
        let csv = "Date,HE,Gen\n2024-01-01,1,5.0\n";
        let file = write_temp(csv);
        let err = load_asset_history(file.path(), &SimConfig::default()).unwrap_err();
        assert!(err.to_string().contains("RT_Hub"));
    }

    #[test]
    fn test_hour_ending_out_of_range_is_fatal() {
        let csv = "Date,HE,Gen,RT_Hub\n2024-01-01,25,5.0,30.0\n";
        let file = write_temp(csv);
        assert!(load_asset_history(file.path(), &SimConfig::default()).is_err());
    }

    #[test]
    fn test_load_forward_curves() {
        let csv = "\
Market,Month,Peak,Off_Peak
ERCOT,2026-01-01,55.0,32.0
MISO,2026-01-01,41.0,28.0
";
        let file = write_temp(csv);
        let rows = load_forward_curves(file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].market, "ERCOT");
        assert_eq!(rows[0].year, 2026);
        assert_eq!(rows[0].month, 1);
        assert_eq!(rows[1].peak, 41.0);
    }

    #[test]
    fn test_forward_curves_missing_header_is_fatal() {
        let csv = "Market,Month,Peak\nERCOT,2026-01-01,55.0\n";
        let file = write_temp(csv);
        let err = load_forward_curves(file.path()).unwrap_err();
        assert!(err.to_string().contains("Off_Peak"));
    }
}
