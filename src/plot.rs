use plotters::prelude::*;
use std::path::Path;

use crate::reference::ReferenceData;
use crate::sweep::SweepRecord;

/// Render the two stacked validation panels: effective area vs width on
/// top, effective index vs width below. Simulated sweep results are drawn
/// as connected red points, reference measurements as unconnected blue
/// markers. Axis ranges are fixed to the physical domain being validated.
pub fn plot_sweep(
    records: &[SweepRecord],
    reference_aeff: &ReferenceData,
    reference_neff: &ReferenceData,
    filename: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(filename, (900, 1000)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((2, 1));

    let x_max = records
        .iter()
        .map(|r| r.width_nm as f64)
        .chain(reference_aeff.x.iter().copied())
        .chain(reference_neff.x.iter().copied())
        .fold(0.0, f64::max)
        + 50.0;

    // --- top panel: effective area ---
    let mut chart = ChartBuilder::on(&panels[0])
        .margin(20)
        .caption("aeff at h = 500nm", ("sans-serif", 25))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..0.3f64)?;

    chart
        .configure_mesh()
        .x_desc("width (nm)")
        .y_desc("effective area (um^2)")
        .y_labels(7) // major ticks every 0.05
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            records.iter().map(|r| (r.width_nm as f64, r.a_eff)),
            &RED,
        ))?
        .label("simulated aeff")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart.draw_series(
        records
            .iter()
            .map(|r| Circle::new((r.width_nm as f64, r.a_eff), 3, RED.filled())),
    )?;

    chart
        .draw_series(
            reference_aeff
                .x
                .iter()
                .zip(reference_aeff.y.iter())
                .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.filled())),
        )?
        .label("reference aeff")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    // --- bottom panel: effective index ---
    let mut chart = ChartBuilder::on(&panels[1])
        .margin(20)
        .caption("neff at h = 500nm", ("sans-serif", 25))
        .set_left_and_bottom_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..2.8f64)?;

    chart
        .configure_mesh()
        .x_desc("width (nm)")
        .y_desc("effective index")
        .y_labels(8) // major ticks every 0.4
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            records.iter().map(|r| (r.width_nm as f64, r.n_eff)),
            &RED,
        ))?
        .label("simulated neff")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart.draw_series(
        records
            .iter()
            .map(|r| Circle::new((r.width_nm as f64, r.n_eff), 3, RED.filled())),
    )?;

    chart
        .draw_series(
            reference_neff
                .x
                .iter()
                .zip(reference_neff.y.iter())
                .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.filled())),
        )?
        .label("reference neff")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLUE.filled()));

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}
