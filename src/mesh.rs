use anyhow::{anyhow, Result};
use geo::BoundingRect;
use geo_types::Point;
use nalgebra::Point2;

use crate::geometry::CrossSection;
use crate::settings::{AREA_THRESHOLD, COORD_MERGE_DISTANCE};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::geometry::RegionLabel;
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
                resolution: 0.1,
                distance: 0.1,
            },
            default_resolution_max: 2.0,
            reference_aeff: String::new(),
            reference_neff: String::new(),
            directory: "out".to_string(),
        }
    }

    #[test]
    fn every_triangle_is_tagged() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let mesh = Mesh::from_cross_section(&cross_section, settings.default_resolution_max)
            .unwrap();
        assert_eq!(mesh.num_triangles, mesh.triangles.len());
        assert_eq!(mesh.regions.len(), mesh.num_triangles);
        assert!(mesh.num_triangles > 0);
    }

    #[test]
    fn interfaces_lie_on_mesh_lines() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let mesh = Mesh::from_cross_section(&cross_section, settings.default_resolution_max)
            .unwrap();

        // The silica top surface and the core strip faces are material
        // interfaces; each must coincide with a horizontal mesh line.
        let t = settings.core_thickness;
        let core_bottom = settings.slab_height + (settings.rail_height - t) / 2.0;
        for y in [settings.slab_height, core_bottom, core_bottom + t] {
            assert!(
                mesh.ys.iter().any(|&v| (v - y).abs() < 1e-9),
                "no mesh line at y = {}",
                y
            );
        }
    }

    #[test]
    fn refined_spacing_inside_core() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let mesh = Mesh::from_cross_section(&cross_section, settings.default_resolution_max)
            .unwrap();

        let res = settings.refinement.resolution;
        for pair in mesh.xs.windows(2) {
            let mid = (pair[0] + pair[1]) / 2.0;
            if mid.abs() < 0.25 {
                assert!(
                    pair[1] - pair[0] <= res + 1e-9,
                    "spacing {} exceeds target {} at x = {}",
                    pair[1] - pair[0],
                    res,
                    mid
                );
            }
        }
    }

    #[test]
    fn core_triangles_exist() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let mesh = Mesh::from_cross_section(&cross_section, settings.default_resolution_max)
            .unwrap();

        let core = cross_section
            .regions
            .iter()
            .position(|r| r.label == RegionLabel::Core)
            .unwrap();
        assert!(mesh.regions.iter().any(|&r| r == core));
    }

    #[test]
    fn boundary_nodes_trace_the_domain_edge() {
        let settings = coarse_settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let mesh = Mesh::from_cross_section(&cross_section, settings.default_resolution_max)
            .unwrap();

        let boundary = mesh.boundary_nodes();
        let num_boundary = boundary.iter().filter(|&&b| b).count();
        // A tensor grid has 2 (nx + ny) - 4 edge nodes.
        assert_eq!(num_boundary, 2 * (mesh.xs.len() + mesh.ys.len()) - 4);
    }
}

/// A triangulation of the cross section with per-element region tags.
///
/// Nodes form a graded tensor-product grid; each grid cell is split into two
/// triangles. `regions[e]` is the index into the originating cross section's
/// region list for triangle `e`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub nodes: Vec<Point2<f64>>,
    pub num_nodes: usize,
    pub triangles: Vec<[usize; 3]>,
    pub num_triangles: usize,
    pub regions: Vec<usize>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Mesh {
    /// Meshes a cross section. Axis coordinates are seeded with every region
    /// interface, refined to the per-region target edge length within the
    /// region's refinement distance and capped by `default_resolution_max`
    /// elsewhere. Triangle region tags are resolved by ordered containment
    /// of the centroid.
    pub fn from_cross_section(
        cross_section: &CrossSection,
        default_resolution_max: f64,
    ) -> Result<Mesh> {
        let bounds = cross_section.bounding_rect();

        let mut x_features = Vec::new();
        let mut y_features = Vec::new();
        let mut x_zones = Vec::new();
        let mut y_zones = Vec::new();
        for region in &cross_section.regions {
            let rect = match region.boundary.bounding_rect() {
                Some(rect) => rect,
                None => continue,
            };
            x_features.push(rect.min().x);
            x_features.push(rect.max().x);
            y_features.push(rect.min().y);
            y_features.push(rect.max().y);

            if let Some(refinement) = region.refinement {
                x_zones.push((
                    rect.min().x - refinement.distance,
                    rect.max().x + refinement.distance,
                    refinement.resolution,
                ));
                y_zones.push((
                    rect.min().y - refinement.distance,
                    rect.max().y + refinement.distance,
                    refinement.resolution,
                ));
            }
        }

        let xs = graded_axis(
            bounds.min().x,
            bounds.max().x,
            &x_features,
            &x_zones,
            default_resolution_max,
        );
        let ys = graded_axis(
            bounds.min().y,
            bounds.max().y,
            &y_features,
            &y_zones,
            default_resolution_max,
        );

        let nx = xs.len();
        let ny = ys.len();
        if nx < 2 || ny < 2 {
            return Err(anyhow!("degenerate mesh: {} x {} grid lines", nx, ny));
        }

        let mut nodes = Vec::with_capacity(nx * ny);
        for &y in &ys {
            for &x in &xs {
                nodes.push(Point2::new(x, y));
            }
        }

        let mut triangles = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
        let mut regions = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let n00 = j * nx + i;
                let n10 = j * nx + i + 1;
                let n01 = (j + 1) * nx + i;
                let n11 = (j + 1) * nx + i + 1;

                for tri in [[n00, n10, n11], [n00, n11, n01]] {
                    let cx = (nodes[tri[0]].x + nodes[tri[1]].x + nodes[tri[2]].x) / 3.0;
                    let cy = (nodes[tri[0]].y + nodes[tri[1]].y + nodes[tri[2]].y) / 3.0;
                    let region = cross_section
                        .region_at(Point::new(cx, cy))
                        .ok_or_else(|| {
                            anyhow!("triangle centroid ({}, {}) lies in no region", cx, cy)
                        })?;
                    triangles.push(tri);
                    regions.push(region);
                }
            }
        }

        let num_nodes = nodes.len();
        let num_triangles = triangles.len();

        Ok(Mesh {
            nodes,
            num_nodes,
            triangles,
            num_triangles,
            regions,
            xs,
            ys,
        })
    }

    /// Signed double area of a triangle; positive for the counter-clockwise
    /// node order produced by the mesher.
    pub fn double_area(&self, triangle: &[usize; 3]) -> f64 {
        let a = &self.nodes[triangle[0]];
        let b = &self.nodes[triangle[1]];
        let c = &self.nodes[triangle[2]];
        (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
    }

    /// Flags nodes on the outer boundary of the rectangular domain.
    pub fn boundary_nodes(&self) -> Vec<bool> {
        let x_lo = self.xs[0];
        let x_hi = *self.xs.last().unwrap();
        let y_lo = self.ys[0];
        let y_hi = *self.ys.last().unwrap();
        self.nodes
            .iter()
            .map(|node| {
                (node.x - x_lo).abs() < COORD_MERGE_DISTANCE
                    || (node.x - x_hi).abs() < COORD_MERGE_DISTANCE
                    || (node.y - y_lo).abs() < COORD_MERGE_DISTANCE
                    || (node.y - y_hi).abs() < COORD_MERGE_DISTANCE
            })
            .collect()
    }
}

/// Builds one graded axis: breakpoints at the domain ends, every feature
/// coordinate and every refinement zone edge, each interval subdivided
/// uniformly at the local target spacing.
fn graded_axis(
    lo: f64,
    hi: f64,
    features: &[f64],
    zones: &[(f64, f64, f64)],
    default_max: f64,
) -> Vec<f64> {
    let mut breakpoints = vec![lo, hi];
    breakpoints.extend(features.iter().copied());
    for &(zone_lo, zone_hi, _) in zones {
        breakpoints.push(zone_lo);
        breakpoints.push(zone_hi);
    }
    breakpoints.retain(|&v| v >= lo - COORD_MERGE_DISTANCE && v <= hi + COORD_MERGE_DISTANCE);
    breakpoints.sort_by(|a, b| a.partial_cmp(b).expect("NaN encountered"));
    breakpoints.dedup_by(|a, b| (*a - *b).abs() < COORD_MERGE_DISTANCE);

    let mut axis = vec![breakpoints[0]];
    for pair in breakpoints.windows(2) {
        let span = pair[1] - pair[0];
        if span < COORD_MERGE_DISTANCE {
            continue;
        }
        let mid = (pair[0] + pair[1]) / 2.0;
        let spacing = zones
            .iter()
            .filter(|&&(zone_lo, zone_hi, _)| mid >= zone_lo && mid <= zone_hi)
            .map(|&(_, _, res)| res)
            .fold(default_max, f64::min);
        let n = (span / spacing).ceil().max(1.0) as usize;
        for k in 1..=n {
            axis.push(pair[0] + span * k as f64 / n as f64);
        }
    }
    axis
}

/// Maps each triangle to its region's squared refractive index.
pub fn permittivity(mesh: &Mesh, cross_section: &CrossSection) -> Vec<f64> {
    mesh.regions
        .iter()
        .map(|&region| {
            let n = cross_section.regions[region].refr_index;
            n * n
        })
        .collect()
}

/// Guards against degenerate elements before assembly.
pub fn check_elements(mesh: &Mesh) -> Result<()> {
    for (e, triangle) in mesh.triangles.iter().enumerate() {
        if mesh.double_area(triangle).abs() < AREA_THRESHOLD {
            return Err(anyhow!("degenerate triangle {} (zero area)", e));
        }
    }
    Ok(())
}
