pub mod buckets;
pub mod forecast;
pub mod models;
pub mod monte_carlo;
pub mod valuation;

pub use buckets::{basis_means, build_hist_buckets, BucketizedHistory};
pub use forecast::{forecast_generation, select_forwards};
pub use models::{
    BucketKey, BucketMap, ForwardCurve, ForwardCurveRow, GenForecastRow, HistBucket, HourlyObs,
    NpvComparison, Period, PriceDecomposition, Product, SimConfig,
};
pub use monte_carlo::MonteCarloSimulator;
pub use valuation::{
    compute_components, dcf_monthly, p_level_price, percentile, summarize_npvs, NpvSummary,
};
