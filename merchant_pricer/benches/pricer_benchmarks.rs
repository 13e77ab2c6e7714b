use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::{Duration, NaiveDate};
use merchant_pricer::{
    build_hist_buckets, forecast_generation, select_forwards, ForwardCurveRow, HourlyObs,
    MonteCarloSimulator, Product, SimConfig,
};

fn synthetic_history(config: &SimConfig, years: usize) -> Vec<HourlyObs> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..24 * 365 * years)
        .map(|i| {
            let ts = start + Duration::hours(i as i64);
            let hub = 35.0 + (i % 17) as f64 * 2.5 - (i % 5) as f64;
            HourlyObs {
                timestamp: ts,
                gen: Some(8.0 + (i % 4) as f64),
                rt_hub: Some(hub),
                da_hub: Some(hub - 1.5),
                rt_basis: Some(-3.0 + (i % 7) as f64),
                da_basis: Some(-2.0 + (i % 6) as f64),
                period: config.period_of(&ts),
            }
        })
        .collect()
}

fn forward_table(config: &SimConfig) -> Vec<ForwardCurveRow> {
    let mut rows = Vec::new();
    for year in config.forecast_start_year..config.forecast_end_year() {
        for month in 1..=12 {
            rows.push(ForwardCurveRow {
                market: "ERCOT".into(),
                year,
                month,
                peak: 52.0,
                off_peak: 30.0,
            });
        }
    }
    rows
}

fn benchmark_bucketizer(c: &mut Criterion) {
    let config = SimConfig::default();
    let history = synthetic_history(&config, 2);

    c.bench_function("bucketize_two_years", |b| {
        b.iter(|| black_box(build_hist_buckets(black_box(&history), &config)));
    });
}

fn benchmark_simulation(c: &mut Criterion) {
    let config = SimConfig::default();
    let history = synthetic_history(&config, 2);
    let tagged = build_hist_buckets(&history, &config);
    let gen_fc = forecast_generation(&history, &config);
    let fw = select_forwards(&forward_table(&config), "ERCOT", &config);
    let sim = MonteCarloSimulator::new(&config, &tagged.buckets, &gen_fc, &fw, tagged.p_high);

    c.bench_function("simulate_rt_bus_500_trials", |b| {
        b.iter(|| black_box(sim.simulate(Product::RtBus, false, 504, 500)));
    });
}

criterion_group!(benches, benchmark_bucketizer, benchmark_simulation);
criterion_main!(benches);
