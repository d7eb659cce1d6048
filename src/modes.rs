use nalgebra::DVector;
use std::fmt;

use crate::fem;
use crate::mesh::Mesh;

/// Polarization branch of the semivectorial formulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    TE,
    TM,
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarization::TE => write!(f, "TE"),
            Polarization::TM => write!(f, "TM"),
        }
    }
}

/// A guided mode of the waveguide cross section.
///
/// The nodal field is the scalar of the semivectorial formulation (Ey-like
/// for TE, Hx-like for TM), normalized to unit squared integral over the
/// mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub n_eff: f64,
    pub polarization: Polarization,
    /// Fraction of the transverse field energy in the TM polarization.
    /// The semivectorial split puts all energy in one branch, so this is
    /// exactly 0 or 1.
    pub tm_fraction: f64,
    pub field: DVector<f64>,
    pub mesh: Mesh,
}

impl Mode {
    pub fn new(n_eff: f64, polarization: Polarization, field: DVector<f64>, mesh: Mesh) -> Self {
        let tm_fraction = match polarization {
            Polarization::TM => 1.0,
            Polarization::TE => 0.0,
        };
        let mut mode = Self {
            n_eff,
            polarization,
            tm_fraction,
            field,
            mesh,
        };
        mode.normalize();
        mode
    }

    /// Scales the field to unit squared integral.
    fn normalize(&mut self) {
        let norm_sq = fem::integrate_power(&self.mesh, &self.field, 2);
        if norm_sq > 0.0 {
            self.field /= norm_sq.sqrt();
        }
    }

    /// Effective mode area, (integral of |f|^2)^2 / integral of |f|^4.
    pub fn effective_area(&self) -> f64 {
        let i2 = fem::integrate_power(&self.mesh, &self.field, 2);
        let i4 = fem::integrate_power(&self.mesh, &self.field, 4);
        i2 * i2 / i4
    }
}
