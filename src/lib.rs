//! modesweep - effective index and effective area of a Si-NC slot waveguide.
//!
//! Sweeps the waveguide core width over a configured range, solves each
//! cross section for its guided optical modes with a finite-element
//! semivectorial solver, selects the first transverse-magnetic mode per
//! width, and validates the effective index and effective mode area against
//! published reference measurements.

pub mod fem;
pub mod geometry;
pub mod mesh;
pub mod modes;
pub mod output;
pub mod plot;
pub mod reference;
pub mod settings;
pub mod solver;
pub mod sweep;
