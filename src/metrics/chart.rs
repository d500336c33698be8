use std::path::Path;

use plotters::prelude::*;

use super::MetricsReport;

fn ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// p50/p99 latency of each tick stage, written as a PNG.
pub fn render_latency_chart(report: &MetricsReport, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let stages = [
        ("acquisition", report.acquisition_p50, report.acquisition_p99, &BLUE),
        ("processing", report.processing_p50, report.processing_p99, &RED),
        ("dispatch", report.dispatch_p50, report.dispatch_p99, &MAGENTA),
        ("tick", report.tick_p50, report.tick_p99, &BLACK),
    ];
    let max_ms = stages
        .iter()
        .map(|(_, _, p99, _)| ms(*p99))
        .fold(0.001, f64::max)
        * 1.2;

    let mut chart = ChartBuilder::on(&root)
        .caption("Tick latency (ms)", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..100.0, 0.0..max_ms)?;

    chart.configure_mesh().x_desc("Quantile").y_desc("Latency (ms)").draw()?;

    for (name, p50, p99, color) in stages {
        chart
            .draw_series(LineSeries::new(vec![(50.0, ms(p50)), (99.0, ms(p99))], color))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}
