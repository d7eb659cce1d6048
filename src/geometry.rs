use geo::{BoundingRect, Contains};
use geo_clipper::Clipper;
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use std::fmt;

use crate::settings::{MeshResolution, Settings, AIR_BUFFER, CLIP_TOLERANCE};

#[cfg(test)]
mod tests {

    use super::*;
    use geo::Area;

    fn settings() -> Settings {
        crate::settings::load_default_config().unwrap()
    }

    #[test]
    fn region_count_and_order() {
        let cross_section = CrossSection::new(0.5, &settings());
        let labels: Vec<_> = cross_section.regions.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec![
                RegionLabel::Core,
                RegionLabel::Silicon,
                RegionLabel::Silica,
                RegionLabel::Air
            ]
        );
    }

    #[test]
    fn core_shadows_silicon() {
        // The core strip sits inside the silicon rail; ordered lookup must
        // resolve points in the overlap to the core.
        let settings = settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let y_mid = settings.slab_height + settings.rail_height / 2.0;
        let index = cross_section.region_at(Point::new(0.0, y_mid)).unwrap();
        assert_eq!(cross_section.regions[index].label, RegionLabel::Core);
    }

    #[test]
    fn air_is_clipped_against_materials() {
        let settings = settings();
        let cross_section = CrossSection::new(0.5, &settings);
        let air = &cross_section.regions[3];
        // A point inside the silica slab must not be claimed by the air region.
        assert!(!air.boundary.contains(&Point::new(0.0, 0.1)));
        // A point well above the core is air.
        let y_air = settings.slab_height + settings.rail_height + 1.0;
        assert!(air.boundary.contains(&Point::new(0.0, y_air)));
    }

    #[test]
    fn region_areas_are_positive() {
        let cross_section = CrossSection::new(0.3, &settings());
        for region in &cross_section.regions {
            assert!(region.boundary.unsigned_area() > 0.0, "{}", region.label);
        }
    }
}

/// Labels for the four material regions of the cross section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLabel {
    Core,
    Silicon,
    Silica,
    Air,
}

impl fmt::Display for RegionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionLabel::Core => write!(f, "core"),
            RegionLabel::Silicon => write!(f, "silicon"),
            RegionLabel::Silica => write!(f, "silica"),
            RegionLabel::Air => write!(f, "air"),
        }
    }
}

/// A named polygonal region with its material and mesh refinement hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub label: RegionLabel,
    pub boundary: MultiPolygon<f64>,
    pub refr_index: f64,
    pub refinement: Option<MeshResolution>,
}

/// The waveguide cross section as an ordered collection of regions.
/// Region order matters: point lookups resolve to the first region that
/// contains the point, so earlier regions shadow later ones.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub regions: Vec<Region>,
}

/// Axis-aligned rectangle as a closed polygon.
pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    let exterior = vec![
        Coord { x: x0, y: y0 },
        Coord { x: x1, y: y0 },
        Coord { x: x1, y: y1 },
        Coord { x: x0, y: y1 },
        Coord { x: x0, y: y0 },
    ];
    Polygon::new(LineString(exterior), vec![])
}

impl CrossSection {
    /// Builds the slot waveguide cross section for a given core width (um).
    ///
    /// The Si-NC core strip of thickness `t` is centred vertically in the
    /// silicon rail, the silica slab sits below, and the air region is the
    /// core buffered by a fixed margin with the material regions clipped out.
    pub fn new(width: f64, settings: &Settings) -> Self {
        let capital_h = settings.slab_height;
        let h = settings.rail_height;
        let t = settings.core_thickness;

        let core = rect(
            -width / 2.0,
            capital_h + (h - t) / 2.0,
            width / 2.0,
            capital_h + (h - t) / 2.0 + t,
        );
        let silicon = rect(-width / 2.0, capital_h, width / 2.0, capital_h + h);
        let silica = rect(
            -settings.slab_width / 2.0,
            0.0,
            settings.slab_width / 2.0,
            capital_h,
        );

        // Buffer the core outward, then clip the material regions away so the
        // air region covers exactly the remainder of the domain.
        let core_bounds = core.bounding_rect().unwrap();
        let buffered = rect(
            core_bounds.min().x - AIR_BUFFER,
            core_bounds.min().y - AIR_BUFFER,
            core_bounds.max().x + AIR_BUFFER,
            core_bounds.max().y + AIR_BUFFER,
        );
        let materials = core
            .union(&silicon, CLIP_TOLERANCE)
            .union(&silica, CLIP_TOLERANCE);
        let air = buffered.difference(&materials, CLIP_TOLERANCE);

        let regions = vec![
            Region {
                label: RegionLabel::Core,
                boundary: MultiPolygon(vec![core]),
                refr_index: settings.n_core,
                refinement: Some(settings.refinement),
            },
            Region {
                label: RegionLabel::Silicon,
                boundary: MultiPolygon(vec![silicon]),
                refr_index: settings.n_silicon,
                refinement: Some(settings.refinement),
            },
            Region {
                label: RegionLabel::Silica,
                boundary: MultiPolygon(vec![silica]),
                refr_index: settings.n_silica,
                refinement: Some(settings.refinement),
            },
            Region {
                label: RegionLabel::Air,
                boundary: air,
                refr_index: settings.n_air,
                refinement: None,
            },
        ];

        Self { regions }
    }

    /// Index of the first region containing the point, in region order.
    pub fn region_at(&self, point: Point<f64>) -> Option<usize> {
        self.regions
            .iter()
            .position(|region| region.boundary.contains(&point))
    }

    /// Bounding rectangle of the whole cross section.
    pub fn bounding_rect(&self) -> Rect<f64> {
        let mut rect = self.regions[0].boundary.bounding_rect().unwrap();
        for region in &self.regions[1..] {
            if let Some(other) = region.boundary.bounding_rect() {
                let min_x = rect.min().x.min(other.min().x);
                let min_y = rect.min().y.min(other.min().y);
                let max_x = rect.max().x.max(other.max().x);
                let max_y = rect.max().y.max(other.max().y);
                rect = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });
            }
        }
        rect
    }
}
