use std::fmt;

use geo::{BoundingRect, Geometry as GeoGeometry};
use geos::{Geom, Geometry as GeosGeometry};

use crate::error::{Result, RouteCardError};
use crate::geo_core::BoundingBox;

/// Quadrant segments used for every buffer
const BUFFER_QUADSEGS: i32 = 8;

/// A geometry kept both as `geo` (for envelopes and reprojection) and as
/// GEOS (for the topological predicates and buffering)
#[derive(Clone)]
pub struct Shape {
    geo: GeoGeometry<f64>,
    geos: GeosGeometry,
}

impl Shape {
    pub fn new(geometry: GeoGeometry<f64>) -> Result<Self> {
        let geos = GeosGeometry::try_from(&geometry)
            .map_err(|e| RouteCardError::Geometry(format!("Failed to convert geometry to GEOS: {}", e)))?;
        Ok(Shape { geo: geometry, geos })
    }

    pub fn from_geos(geos: GeosGeometry) -> Result<Self> {
        let geo: GeoGeometry<f64> = Clone::clone(&geos)
            .try_into()
            .map_err(|e: geos::Error| {
                RouteCardError::Geometry(format!("Failed to convert GEOS geometry: {}", e))
            })?;
        Ok(Shape { geo, geos })
    }

    pub fn geometry(&self) -> &GeoGeometry<f64> {
        &self.geo
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geo.bounding_rect().map(BoundingBox::from_rect)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.geos.is_empty()?)
    }

    pub fn disjoint(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.disjoint(&other.geos)?)
    }

    pub fn intersects(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.intersects(&other.geos)?)
    }

    pub fn contains(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.contains(&other.geos)?)
    }

    pub fn within(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.within(&other.geos)?)
    }

    pub fn overlaps(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.overlaps(&other.geos)?)
    }

    pub fn touches(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.touches(&other.geos)?)
    }

    pub fn crosses(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.crosses(&other.geos)?)
    }

    pub fn equals(&self, other: &Shape) -> Result<bool> {
        Ok(self.geos.equals(&other.geos)?)
    }

    /// Buffer by `distance` metres; a zero distance returns a copy
    pub fn buffer(&self, distance: f64) -> Result<Shape> {
        if distance == 0.0 {
            return Ok(self.clone());
        }
        let buffered = self.geos.buffer(distance, BUFFER_QUADSEGS)?;
        Shape::from_geos(buffered)
    }

    /// Dissolve several shapes into one
    pub fn union_all(shapes: &[Shape]) -> Result<Shape> {
        let mut iter = shapes.iter();
        let first = iter
            .next()
            .ok_or_else(|| RouteCardError::Geometry("Cannot dissolve an empty shape list".into()))?;
        let mut merged = Clone::clone(&first.geos);
        for shape in iter {
            merged = merged.union(&shape.geos)?;
        }
        Shape::from_geos(merged)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.geo {
            GeoGeometry::Point(_) => "Point",
            GeoGeometry::Line(_) => "Line",
            GeoGeometry::LineString(_) => "LineString",
            GeoGeometry::Polygon(_) => "Polygon",
            GeoGeometry::MultiPoint(_) => "MultiPoint",
            GeoGeometry::MultiLineString(_) => "MultiLineString",
            GeoGeometry::MultiPolygon(_) => "MultiPolygon",
            GeoGeometry::GeometryCollection(_) => "GeometryCollection",
            GeoGeometry::Rect(_) => "Rect",
            GeoGeometry::Triangle(_) => "Triangle",
        };
        f.debug_struct("Shape")
            .field("kind", &kind)
            .field("bbox", &self.bounding_box())
            .finish()
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.geo == other.geo
    }
}
