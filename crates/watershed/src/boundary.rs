//! GeoJSON boundary parsing and selection.

use std::path::Path;

use geo::{Area, BooleanOps, BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Validation};
use geojson::GeoJson;
use tracing::{debug, info};

use storm_common::{BoundingBox, StormError, StormResult};

/// A validated watershed boundary in EPSG:4326 degrees.
#[derive(Debug, Clone)]
pub struct Watershed {
    geometry: MultiPolygon<f64>,
    bounds: BoundingBox,
}

impl Watershed {
    /// Wrap an already validated geometry.
    pub fn from_multi_polygon(geometry: MultiPolygon<f64>) -> StormResult<Self> {
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| StormError::EmptyGeometry("boundary has no coordinates".to_string()))?;
        let bounds = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        Ok(Self { geometry, bounds })
    }

    pub fn from_polygon(polygon: Polygon<f64>) -> StormResult<Self> {
        Self::from_multi_polygon(MultiPolygon::new(vec![polygon]))
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding box of the boundary.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Planar area in square degrees.
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn polygon_count(&self) -> usize {
        self.geometry.0.len()
    }

    /// True when the point lies strictly inside the boundary.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bounds.contains_point(x, y) && self.geometry.contains(&Point::new(x, y))
    }

    /// Outer rings of every polygon, used for drawing the outline.
    pub fn exterior_rings(&self) -> impl Iterator<Item = &LineString<f64>> {
        self.geometry.0.iter().map(|p| p.exterior())
    }
}

/// Load a watershed boundary from a GeoJSON file on disk.
pub fn load_boundary(path: &Path, combine_all: bool) -> StormResult<Watershed> {
    info!(path = %path.display(), combine_all, "Getting watershed geometry");
    let content = std::fs::read_to_string(path)?;
    parse_boundary(&content, combine_all)
}

/// Parse a watershed boundary from GeoJSON text.
///
/// Accepts a FeatureCollection, a single Feature or a bare Geometry.
/// With `combine_all` the union of every exploded polygon is returned,
/// otherwise only the first one (file order).
pub fn parse_boundary(geojson: &str, combine_all: bool) -> StormResult<Watershed> {
    let parsed: GeoJson = geojson
        .parse()
        .map_err(|e| StormError::InvalidGeometry(format!("not valid GeoJSON: {}", e)))?;

    let geometries = collect_geometries(parsed)?;
    if geometries.is_empty() {
        return Err(StormError::EmptyGeometry(
            "feature collection is empty".to_string(),
        ));
    }

    let mut polygons = Vec::new();
    for geometry in geometries {
        explode(geometry, &mut polygons)?;
    }
    if polygons.is_empty() {
        return Err(StormError::EmptyGeometry(
            "no polygons after exploding multi-part geometries".to_string(),
        ));
    }

    if let Some(index) = polygons.iter().position(|p| !p.is_valid()) {
        return Err(StormError::InvalidGeometry(format!(
            "polygon {} of {} is not valid",
            index,
            polygons.len()
        )));
    }

    debug!(polygons = polygons.len(), "Exploded watershed features");

    if combine_all {
        let union = polygons
            .iter()
            .fold(MultiPolygon::new(Vec::new()), |acc, p| {
                acc.union(&MultiPolygon::new(vec![p.clone()]))
            });
        Watershed::from_multi_polygon(union)
    } else {
        let first = polygons.swap_remove(0);
        Watershed::from_polygon(first)
    }
}

/// Pull geometries out of any GeoJSON object, in file order.
fn collect_geometries(parsed: GeoJson) -> StormResult<Vec<geo::Geometry<f64>>> {
    let raw = match parsed {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .enumerate()
            .map(|(i, f)| {
                f.geometry.ok_or_else(|| {
                    StormError::InvalidGeometry(format!("feature {} has no geometry", i))
                })
            })
            .collect::<StormResult<Vec<_>>>()?,
        GeoJson::Feature(f) => match f.geometry {
            Some(g) => vec![g],
            None => {
                return Err(StormError::InvalidGeometry(
                    "feature 0 has no geometry".to_string(),
                ))
            }
        },
        GeoJson::Geometry(g) => vec![g],
    };

    raw.into_iter()
        .map(|g| {
            geo::Geometry::<f64>::try_from(g)
                .map_err(|e| StormError::InvalidGeometry(format!("unsupported geometry: {}", e)))
        })
        .collect()
}

/// Split multi-part geometries into single polygons.
fn explode(geometry: geo::Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> StormResult<()> {
    match geometry {
        geo::Geometry::Polygon(p) => out.push(p),
        geo::Geometry::MultiPolygon(mp) => out.extend(mp.0),
        geo::Geometry::Rect(r) => out.push(r.to_polygon()),
        geo::Geometry::Triangle(t) => out.push(t.to_polygon()),
        geo::Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                explode(g, out)?;
            }
        }
        other => {
            return Err(StormError::InvalidGeometry(format!(
                "watershed boundaries must be polygons, found {}",
                geometry_name(&other)
            )))
        }
    }
    Ok(())
}

fn geometry_name(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

/// Axis-aligned square polygon, handy for synthetic boundaries.
pub fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    let ring = vec![
        Coord { x: min_x, y: min_y },
        Coord { x: min_x + size, y: min_y },
        Coord { x: min_x + size, y: min_y + size },
        Coord { x: min_x, y: min_y + size },
        Coord { x: min_x, y: min_y },
    ];
    Polygon::new(LineString::from(ring), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]]]}"#;

    #[test]
    fn test_bare_geometry() {
        let ws = parse_boundary(SQUARE, false).unwrap();
        assert_eq!(ws.polygon_count(), 1);
        assert!((ws.area() - 4.0).abs() < 1e-9);
        assert_eq!(ws.bounds(), BoundingBox::new(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn test_contains_excludes_outside() {
        let ws = Watershed::from_polygon(square(0.0, 0.0, 1.0)).unwrap();
        assert!(ws.contains(0.5, 0.5));
        assert!(!ws.contains(1.5, 0.5));
        assert!(!ws.contains(-0.5, -0.5));
    }

    #[test]
    fn test_line_geometry_rejected() {
        let line = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        let err = parse_boundary(line, false).unwrap_err();
        assert!(matches!(err, StormError::InvalidGeometry(_)));
    }

    #[test]
    fn test_garbage_is_invalid_geometry() {
        let err = parse_boundary("not json", false).unwrap_err();
        assert!(matches!(err, StormError::InvalidGeometry(_)));
    }
}
