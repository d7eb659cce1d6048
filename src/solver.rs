use anyhow::{anyhow, Result};
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};

use crate::fem;
use crate::mesh::{self, Mesh};
use crate::modes::{Mode, Polarization};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geometry::CrossSection;
    use crate::settings::{MeshResolution, Settings};

    fn coarse_settings() -> Settings {
        Settings {
            wavelength: 1.55,
            slab_width: 1.4,
            slab_height: 0.3,
            rail_height: 0.5,
            core_thickness: 0.1,
            n_core: 1.6,
            n_silicon: 3.48,
            n_silica: 1.45,
            n_air: 1.0,
            width_start_nm: 500,
            width_stop_nm: 510,
            width_step_nm: 10,
            num_modes: 4,
            refinement: MeshResolution {
                resolution: 0.08,
                distance: 0.1,
            },
            default_resolution_max: 1.5,
            reference_aeff: String::new(),
            reference_neff: String::new(),
            directory: "out".to_string(),
        }
    }

    #[test]
    fn modes_are_sorted_descending_and_bounded() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let grid =
            Mesh::from_cross_section(&cross_section, settings.default_resolution_max).unwrap();
        let epsilon = mesh::permittivity(&grid, &cross_section);

        let modes = compute_modes(
            &grid,
            &epsilon,
            settings.wavelength,
            settings.num_modes,
        )
        .unwrap();

        assert!(!modes.is_empty());
        assert!(modes.len() <= settings.num_modes);
        for pair in modes.windows(2) {
            assert!(pair[0].n_eff >= pair[1].n_eff);
        }
        for mode in &modes {
            assert!(mode.n_eff > settings.n_min(), "n_eff: {}", mode.n_eff);
            assert!(mode.n_eff < settings.n_max(), "n_eff: {}", mode.n_eff);
            assert!(mode.effective_area() > 0.0);
        }
    }

    #[test]
    fn tm_fraction_matches_polarization() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let grid =
            Mesh::from_cross_section(&cross_section, settings.default_resolution_max).unwrap();
        let epsilon = mesh::permittivity(&grid, &cross_section);

        let modes =
            compute_modes(&grid, &epsilon, settings.wavelength, settings.num_modes).unwrap();
        for mode in &modes {
            match mode.polarization {
                Polarization::TM => assert!(mode.tm_fraction > 0.5),
                Polarization::TE => assert!(mode.tm_fraction < 0.5),
            }
        }
    }

    #[test]
    fn repeated_solves_are_identical() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.3, &settings);
        let grid =
            Mesh::from_cross_section(&cross_section, settings.default_resolution_max).unwrap();
        let epsilon = mesh::permittivity(&grid, &cross_section);

        let first =
            compute_modes(&grid, &epsilon, settings.wavelength, settings.num_modes).unwrap();
        let second =
            compute_modes(&grid, &epsilon, settings.wavelength, settings.num_modes).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.n_eff, b.n_eff);
            assert_eq!(a.polarization, b.polarization);
        }
    }
}

/// Computes up to `num_modes` guided modes of the cross section.
///
/// One generalized symmetric eigenproblem is assembled per polarization:
///
/// - TE: (k0^2 M_eps - K_1) f = beta^2 M_1 f
/// - TM: (k0^2 M_1 - K_{1/eps}) f = beta^2 M_{1/eps} f
///
/// with a homogeneous Dirichlet condition on the outer boundary. Both
/// branches are reduced to standard form through a Cholesky factor of the
/// right-hand matrix and solved densely. Guided candidates (effective index
/// above the lowest material index) from both branches are merged and
/// returned sorted by descending effective index.
pub fn compute_modes(
    mesh: &Mesh,
    epsilon: &[f64],
    wavelength: f64,
    num_modes: usize,
) -> Result<Vec<Mode>> {
    if epsilon.len() != mesh.num_triangles {
        return Err(anyhow!(
            "permittivity array and mesh must have the same length. Got {} and {}",
            epsilon.len(),
            mesh.num_triangles
        ));
    }
    mesh::check_elements(mesh)?;

    let k0 = 2.0 * std::f64::consts::PI / wavelength;
    let eps_min = epsilon.iter().cloned().fold(f64::INFINITY, f64::min);

    let boundary = mesh.boundary_nodes();
    let interior = fem::interior_nodes(&boundary);
    if interior.is_empty() {
        return Err(anyhow!("mesh has no interior degrees of freedom"));
    }

    let ones = vec![1.0; mesh.num_triangles];
    let inv_eps: Vec<f64> = epsilon.iter().map(|&e| 1.0 / e).collect();

    let mut modes = Vec::new();
    for polarization in [Polarization::TM, Polarization::TE] {
        let (stiffness_weights, lhs_mass_weights, rhs_mass_weights) = match polarization {
            Polarization::TM => (&inv_eps[..], &ones[..], &inv_eps[..]),
            Polarization::TE => (&ones[..], epsilon, &ones[..]),
        };

        let k = fem::stiffness(mesh, stiffness_weights);
        let m_lhs = fem::mass(mesh, lhs_mass_weights);
        let m_rhs = fem::mass(mesh, rhs_mass_weights);

        let a = fem::restrict(&(&m_lhs * (k0 * k0) - &k), &interior);
        let b = fem::restrict(&m_rhs, &interior);

        for (beta_sq, reduced_field) in solve_pencil(a, b)? {
            // Keep guided candidates only: the propagation constant must
            // exceed that of a plane wave in the least dense material.
            if beta_sq <= k0 * k0 * eps_min {
                continue;
            }
            let n_eff = beta_sq.sqrt() / k0;
            let field = fem::expand(&reduced_field, &interior, mesh.num_nodes);
            modes.push(Mode::new(n_eff, polarization, field, mesh.clone()));
        }
    }

    modes.sort_by(|a, b| b.n_eff.partial_cmp(&a.n_eff).expect("NaN effective index"));
    modes.truncate(num_modes);

    Ok(modes)
}

/// Solves the dense generalized symmetric pencil A f = lambda B f with B
/// positive definite. Returns (eigenvalue, eigenvector) pairs in the order
/// produced by the eigensolver.
fn solve_pencil(a: DMatrix<f64>, b: DMatrix<f64>) -> Result<Vec<(f64, DVector<f64>)>> {
    let chol = Cholesky::new(b)
        .ok_or_else(|| anyhow!("right-hand matrix is not positive definite"))?;
    let l = chol.l();

    // Transform to standard form C = L^-1 A L^-T.
    let y = l
        .solve_lower_triangular(&a)
        .ok_or_else(|| anyhow!("singular Cholesky factor"))?;
    let c = l
        .solve_lower_triangular(&y.transpose())
        .ok_or_else(|| anyhow!("singular Cholesky factor"))?
        .transpose();
    // Guard against round-off asymmetry before the symmetric eigensolver.
    let c = (&c + c.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(c);

    let mut pairs = Vec::with_capacity(eigen.eigenvalues.len());
    for (i, &lambda) in eigen.eigenvalues.iter().enumerate() {
        let y_i = eigen.eigenvectors.column(i).into_owned();
        // Back-substitute to the generalized eigenvector x = L^-T y.
        let x = l
            .transpose()
            .solve_upper_triangular(&y_i)
            .ok_or_else(|| anyhow!("singular Cholesky factor"))?;
        pairs.push((lambda, x));
    }

    Ok(pairs)
}
