//! Width-sweep orchestration for the slot waveguide validation case.
//!
//! This module drives the full pipeline for each core width in the sweep:
//! cross-section construction, meshing, permittivity assignment, eigenmode
//! solving and mode selection. Accepted results are accumulated for the
//! output table and the validation plots.
//!
//! The sweep system provides:
//! - Sequential, reproducible iteration over the width range
//! - Progress tracking for long-running sweeps
//! - First-match mode selection with a soft skip on failure
//! - Result aggregation for plotting against reference data

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use std::fs;
use std::path::Path;

use crate::{
    geometry::CrossSection,
    mesh::{self, Mesh},
    modes::Mode,
    output, plot,
    reference::ReferenceData,
    settings::{Settings, TM_FRACTION_THRESHOLD},
    solver,
};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::modes::Polarization;
    use nalgebra::{DVector, Point2};

    /// Minimal two-triangle mesh for fabricating modes.
    fn stub_mesh() -> Mesh {
        let xs = vec![0.0, 1.0];
        let ys = vec![0.0, 1.0];
        let nodes = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
        ];
        let triangles = vec![[0, 1, 3], [0, 3, 2]];
        Mesh {
            num_nodes: nodes.len(),
            num_triangles: triangles.len(),
            regions: vec![0, 0],
            nodes,
            triangles,
            xs,
            ys,
        }
    }

    fn stub_mode(n_eff: f64, polarization: Polarization) -> Mode {
        let mesh = stub_mesh();
        let field = DVector::from_element(mesh.num_nodes, 1.0);
        Mode::new(n_eff, polarization, field, mesh)
    }

    #[test]
    fn selection_takes_first_match_not_maximum() {
        // The scan must accept the first TM mode in solver order, even when
        // a later TM mode has a higher effective index.
        let modes = vec![
            stub_mode(2.0, Polarization::TE),
            stub_mode(1.8, Polarization::TM),
            stub_mode(1.9, Polarization::TM),
        ];
        let selected = select_mode(&modes).unwrap();
        assert_eq!(selected.n_eff, 1.8);
    }

    #[test]
    fn selection_skips_when_no_tm_mode() {
        let modes = vec![
            stub_mode(2.0, Polarization::TE),
            stub_mode(1.7, Polarization::TE),
        ];
        assert!(select_mode(&modes).is_none());
    }

    #[test]
    fn selection_of_empty_candidate_list() {
        assert!(select_mode(&[]).is_none());
    }
}

/// One accepted sweep point. Keeping the effective index and effective area
/// in a single record guarantees the two output series stay equal in length.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRecord {
    pub width_nm: usize,
    pub n_eff: f64,
    pub a_eff: f64,
}

/// Width sweep over the waveguide cross section.
///
/// **Context**: The validation case compares simulated effective indices and
/// effective mode areas against published measurements over a range of core
/// widths. Each width is an independent solve on a freshly built geometry.
///
/// **How it Works**: Iterates the configured width range in ascending order.
/// Every iteration meshes the cross section, assigns the per-element
/// permittivity, requests a fixed number of candidate modes and scans them
/// in solver order for the first mode whose TM fraction exceeds the
/// threshold. Widths without a qualifying mode are skipped with a printed
/// notice; the sweep itself never fails on a skip.
#[derive(Debug)]
pub struct Sweep {
    pub settings: Settings,
    pub records: Vec<SweepRecord>,
    pub skipped: Vec<usize>,
}

impl Sweep {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Runs the sweep sequentially over all configured widths.
    ///
    /// Iterations run strictly in ascending width order; each one completes
    /// its mesh build and solve before the next begins, so rerunning with
    /// identical settings reproduces the identical record sequence.
    pub fn solve(&mut self) -> Result<()> {
        let widths = self.settings.widths_nm();
        println!("Sweeping {} widths...", widths.len());

        let pb = ProgressBar::new(widths.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
            )
            .unwrap()
            .progress_chars("█▇▆▅▄▃▂▁"),
        );
        pb.set_message("width".to_string());

        for width_nm in widths {
            match self.solve_width(width_nm)? {
                Some(record) => self.records.push(record),
                None => {
                    pb.suspend(|| println!("no TM mode found for {} nm", width_nm));
                    self.skipped.push(width_nm);
                }
            }
            pb.inc(1);
        }
        pb.finish();

        println!(
            "Sweep finished: {} accepted, {} skipped",
            self.records.len(),
            self.skipped.len()
        );
        if !self.skipped.is_empty() {
            println!("Skipped widths (nm): {}", self.skipped.iter().format(", "));
        }

        Ok(())
    }

    /// Solves a single width and applies the mode selection policy.
    fn solve_width(&self, width_nm: usize) -> Result<Option<SweepRecord>> {
        let width = width_nm as f64 * 1e-3;

        let cross_section = CrossSection::new(width, &self.settings);
        let grid =
            Mesh::from_cross_section(&cross_section, self.settings.default_resolution_max)?;
        let epsilon = mesh::permittivity(&grid, &cross_section);

        let modes = solver::compute_modes(
            &grid,
            &epsilon,
            self.settings.wavelength,
            self.settings.num_modes,
        )?;

        Ok(select_mode(&modes).map(|mode| {
            let a_eff = mode.effective_area();
            println!("Effective refractive index: {:.4}", mode.n_eff);
            println!("Effective mode area: {:.4}", a_eff);
            SweepRecord {
                width_nm,
                n_eff: mode.n_eff,
                a_eff,
            }
        }))
    }

    /// Writes the result table, the effective settings and the validation
    /// plot to the output directory.
    pub fn writeup(&self) {
        let directory = Path::new(&self.settings.directory);
        if let Err(e) = fs::create_dir_all(directory) {
            eprintln!("Failed to create output directory {:?}: {}", directory, e);
            return;
        }

        let _ = output::write_sweep(&self.records, directory);
        let _ = output::write_settings(&self.settings, directory);

        let reference_aeff = match ReferenceData::from_csv(&self.settings.reference_aeff) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Failed to load reference aeff data: {}", e);
                return;
            }
        };
        let reference_neff = match ReferenceData::from_csv(&self.settings.reference_neff) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("Failed to load reference neff data: {}", e);
                return;
            }
        };

        let plot_path = directory.join("sweep.png");
        match plot::plot_sweep(
            &self.records,
            &reference_aeff,
            &reference_neff,
            &plot_path,
        ) {
            Ok(()) => println!("Plot written to {:?}", plot_path),
            Err(e) => eprintln!("Failed to render plot: {}", e),
        }
    }
}

/// First mode in solver-returned order whose TM fraction exceeds the
/// threshold. A linear scan with early exit; deliberately NOT a search for
/// the largest TM fraction.
pub fn select_mode(modes: &[Mode]) -> Option<&Mode> {
    modes
        .iter()
        .find(|mode| mode.tm_fraction > TM_FRACTION_THRESHOLD)
}
