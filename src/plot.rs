use anyhow::Result;
use plotters::prelude::*;
use std::path::Path;

const BINS: usize = 50;

/// Render the simulated $/MWh distribution as a histogram with a marker at
/// the P-level price.
pub fn plot_distribution(
    sim_prices: &[f64],
    p_level_price: f64,
    output_path: &Path,
    title: &str,
) -> Result<()> {
    if sim_prices.is_empty() {
        return Ok(());
    }

    let mut min = sim_prices.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = sim_prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        // degenerate distribution, widen so the single bar is visible
        min -= 1.0;
        max += 1.0;
    }
    let bin_width = (max - min) / BINS as f64;

    let mut counts = vec![0u32; BINS];
    for price in sim_prices {
        let idx = (((price - min) / bin_width) as usize).min(BINS - 1);
        counts[idx] += 1;
    }
    let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

    let root = BitMapBackend::new(output_path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(min..max, 0u32..(max_count + max_count / 10 + 1))?;

    chart
        .configure_mesh()
        .x_desc("$ / MWh")
        .y_desc("Frequency")
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(i, count)| {
        let x0 = min + i as f64 * bin_width;
        let x1 = x0 + bin_width;
        Rectangle::new([(x0, 0), (x1, *count)], BLUE.mix(0.6).filled())
    }))?;

    chart
        .draw_series(LineSeries::new(
            vec![(p_level_price, 0), (p_level_price, max_count)],
            RED.stroke_width(2),
        ))?
        .label(format!("P-level price {p_level_price:.2}"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
