use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use merchant_pricer::{
    basis_means, build_hist_buckets, compute_components, forecast_generation, p_level_price,
    percentile, select_forwards, summarize_npvs, BucketizedHistory, ForwardCurveRow,
    MonteCarloSimulator, NpvComparison, PriceDecomposition, Product, SimConfig,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

mod data_loader;
mod outputs;
mod plot;

use data_loader::AssetSpec;
use outputs::{round2, GenForecastOutRow};

#[derive(Parser)]
#[command(name = "merchant_risk_pipeline")]
#[command(about = "Monte Carlo merchant price risk for renewable assets across ERCOT/MISO/CAISO")]
struct Args {
    /// Conservative price level (e.g. 75 reads the 25th percentile)
    #[arg(long, default_value_t = 75)]
    p_level: u32,

    /// Monte Carlo trials per asset/product
    #[arg(long, default_value_t = 3000)]
    sims: usize,

    /// Random seed (one seeded generator per simulation call)
    #[arg(long, default_value_t = 504)]
    seed: u64,

    /// Zero out volume when the simulated node price goes negative
    #[arg(long)]
    neg_rule: bool,

    /// First forecast year
    #[arg(long, default_value_t = 2026)]
    start_year: i32,

    /// Forecast horizon in years
    #[arg(long, default_value_t = 5)]
    years: i32,

    /// Annual discount rate for the NPV comparison
    #[arg(long, default_value_t = 0.05)]
    wacc: f64,

    /// Congestion stress scaler applied to basis draws
    #[arg(long, default_value_t = 0.3)]
    stress_alpha: f64,

    /// Directory holding the per-asset historical CSVs and forward_curves.csv
    #[arg(long, default_value = "data/raw")]
    data_dir: PathBuf,

    /// Directory for the summary tables
    #[arg(long, default_value = "outputs/results")]
    results_dir: PathBuf,

    /// Directory for the distribution histograms
    #[arg(long, default_value = "outputs/figures")]
    figures_dir: PathBuf,

    /// Analyze a single asset by name (default: all)
    #[arg(long)]
    asset: Option<String>,

    /// Output format for the price summary
    #[arg(long, value_enum, default_value = "csv")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

/// Everything one asset contributes to the summary tables.
struct AssetResults {
    price_rows: Vec<PriceDecomposition>,
    gen_rows: Vec<GenForecastOutRow>,
    npv_row: NpvComparison,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = SimConfig {
        p_level: args.p_level,
        n_sims: args.sims,
        seed: args.seed,
        negative_price_rule: args.neg_rule,
        forecast_start_year: args.start_year,
        forecast_years: args.years,
        wacc_annual: args.wacc,
        basis_stress_alpha: args.stress_alpha,
        ..SimConfig::default()
    };

    let assets: Vec<AssetSpec> = data_loader::default_assets()
        .into_iter()
        .filter(|a| match &args.asset {
            Some(name) => a.name.eq_ignore_ascii_case(name),
            None => true,
        })
        .collect();
    if assets.is_empty() {
        bail!("no asset matches '{}'", args.asset.unwrap_or_default());
    }

    std::fs::create_dir_all(&args.results_dir)?;
    std::fs::create_dir_all(&args.figures_dir)?;

    let forwards = data_loader::load_forward_curves(&args.data_dir.join("forward_curves.csv"))?;

    info!(
        "pricing {} assets x {} products, {} trials, P{}",
        assets.len(),
        Product::ALL.len(),
        config.n_sims,
        config.p_level
    );

    let progress = ProgressBar::new((assets.len() * Product::ALL.len()) as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("=>-"),
    );

    let results: Vec<AssetResults> = assets
        .par_iter()
        .map(|asset| {
            process_asset(asset, &forwards, &config, &args, &progress)
                .with_context(|| format!("processing asset {}", asset.name))
        })
        .collect::<Result<_>>()?;
    progress.finish_and_clear();

    let mut price_rows: Vec<PriceDecomposition> = Vec::new();
    let mut gen_rows: Vec<GenForecastOutRow> = Vec::new();
    let mut npv_rows: Vec<NpvComparison> = Vec::new();
    for result in results {
        price_rows.extend(result.price_rows);
        gen_rows.extend(result.gen_rows);
        npv_rows.push(result.npv_row);
    }
    price_rows.sort_by(|a, b| (&a.asset, &a.product).cmp(&(&b.asset, &b.product)));

    let prices_path = args.results_dir.join("prices_summary.csv");
    outputs::write_prices_summary(&prices_path, &price_rows)?;
    if matches!(args.format, OutputFormat::Json) {
        outputs::write_prices_json(&args.results_dir.join("prices_summary.json"), &price_rows)?;
    }
    outputs::write_generation_forecast(
        &args.results_dir.join("generation_forecast.csv"),
        &gen_rows,
    )?;
    outputs::write_npv_summary(&args.results_dir.join("npv_summary.csv"), &npv_rows)?;

    println!("\n=== DONE ===");
    println!("Wrote: {}", prices_path.display());
    println!(
        "Wrote: {}",
        args.results_dir.join("generation_forecast.csv").display()
    );
    println!("Wrote: {}", args.results_dir.join("npv_summary.csv").display());
    println!("Figures in: {}", args.figures_dir.display());

    Ok(())
}

fn process_asset(
    asset: &AssetSpec,
    forwards: &[ForwardCurveRow],
    config: &SimConfig,
    args: &Args,
    progress: &ProgressBar,
) -> Result<AssetResults> {
    let csv_path = data_loader::asset_csv_path(&args.data_dir, asset);
    let history = data_loader::load_asset_history(&csv_path, config)?;

    let BucketizedHistory { buckets, p_high } = build_hist_buckets(&history, config);
    let gen_fc = forecast_generation(&history, config);
    let fw = select_forwards(forwards, &asset.market, config);
    let means = basis_means(&buckets);

    let simulator = MonteCarloSimulator::new(config, &buckets, &gen_fc, &fw, p_high);

    let mut price_rows = Vec::with_capacity(Product::ALL.len());
    let mut rt_bus_p50 = 0.0;
    let mut rt_bus_p_level = 0.0;

    for product in Product::ALL {
        progress.set_message(format!("{} {}", asset.name, product.label()));

        let sim_prices = simulator.simulate(product, false, config.seed, config.n_sims);
        let p_price = p_level_price(&sim_prices, config.p_level);

        let neg_p_price = if config.negative_price_rule {
            let curtailed = simulator.simulate(product, true, config.seed, config.n_sims);
            Some(p_level_price(&curtailed, config.p_level))
        } else {
            None
        };

        let components = compute_components(product, &gen_fc, &fw, &means, p_price, neg_p_price);

        let figure_path = figure_path(&args.figures_dir, &asset.name, product);
        plot::plot_distribution(
            &sim_prices,
            p_price,
            &figure_path,
            &format!(
                "{} {} Distribution (P{}={:.2})",
                asset.name,
                product.label(),
                config.p_level,
                p_price
            ),
        )?;

        if product == Product::RtBus {
            rt_bus_p50 = percentile(&sim_prices, 50.0);
            rt_bus_p_level = p_price;
        }

        price_rows.push(PriceDecomposition {
            asset: asset.name.clone(),
            market: asset.market.clone(),
            product: product.label().to_string(),
            hub_component: round2(components.hub),
            basis_component: round2(components.basis),
            risk_adj: round2(components.risk_adj),
            neg_adj: round2(components.neg_adj),
            p_level_price: round2(components.p_level_price),
        });
        progress.inc(1);
    }

    // primary DCF comparison: RT_BUS merchant P50 vs fixed P-level contract
    let npv = summarize_npvs(rt_bus_p50, rt_bus_p_level, &gen_fc, config.wacc_annual);
    let npv_row = NpvComparison {
        asset: asset.name.clone(),
        market: asset.market.clone(),
        merchant_p50_price: round2(rt_bus_p50),
        fixed_p_level_price: round2(rt_bus_p_level),
        merchant_p50_npv: round2(npv.merchant_npv),
        fixed_p_level_npv: round2(npv.fixed_npv),
        delta_pct: round2(npv.delta_pct),
    };

    let gen_rows = gen_fc
        .iter()
        .map(|row| GenForecastOutRow::new(&asset.name, &asset.market, row))
        .collect();

    info!(
        "{}: p_high={:.3}, {} buckets, {} forward months",
        asset.name,
        p_high,
        buckets.len(),
        fw.len()
    );

    Ok(AssetResults {
        price_rows,
        gen_rows,
        npv_row,
    })
}

fn figure_path(figures_dir: &Path, asset: &str, product: Product) -> PathBuf {
    figures_dir.join(format!("{}_{}_dist.png", asset, product.label()))
}
