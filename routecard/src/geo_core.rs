use anyhow::{bail, Context, Result};
use geo::{Geometry, Rect};
#[cfg(feature = "proj")]
use geo::{Coord, MapCoords};
#[cfg(feature = "proj")]
use proj::Proj;

/// NAD83 / BC Environment Albers, the working projection of every analysis
pub const WORKING_EPSG: i32 = 3005;

/// Coordinate reference helpers shared by the providers and the subject
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoCore;

impl GeoCore {
    /// Transform coordinates from one CRS to another
    #[cfg(feature = "proj")]
    pub fn transform_coords(from_epsg: i32, to_epsg: i32, x: f64, y: f64) -> Result<(f64, f64)> {
        let from_crs = format!("EPSG:{}", from_epsg);
        let to_crs = format!("EPSG:{}", to_epsg);

        let proj = Proj::new_known_crs(&from_crs, &to_crs, None)
            .context("Failed to create Proj transformation")?;

        let result = proj
            .convert((x, y))
            .context("Failed to transform coordinates")?;

        Ok(result)
    }

    #[cfg(not(feature = "proj"))]
    pub fn transform_coords(from_epsg: i32, to_epsg: i32, x: f64, y: f64) -> Result<(f64, f64)> {
        if from_epsg == to_epsg {
            return Ok((x, y));
        }
        bail!(
            "Reprojection from EPSG:{} to EPSG:{} requires the 'proj' feature",
            from_epsg,
            to_epsg
        )
    }

    /// Reproject every coordinate of a geometry into the target CRS
    #[cfg(feature = "proj")]
    pub fn reproject(geometry: &Geometry<f64>, from_epsg: i32, to_epsg: i32) -> Result<Geometry<f64>> {
        if from_epsg == to_epsg {
            return Ok(geometry.clone());
        }
        let from_crs = format!("EPSG:{}", from_epsg);
        let to_crs = format!("EPSG:{}", to_epsg);
        let proj = Proj::new_known_crs(&from_crs, &to_crs, None)
            .context("Failed to create Proj transformation")?;
        let proj = &proj;

        geometry
            .try_map_coords(|coord: Coord<f64>| {
                proj.convert((coord.x, coord.y))
                    .map(|(x, y)| Coord { x, y })
            })
            .with_context(|| format!("Failed to reproject geometry from EPSG:{}", from_epsg))
    }

    #[cfg(not(feature = "proj"))]
    pub fn reproject(geometry: &Geometry<f64>, from_epsg: i32, to_epsg: i32) -> Result<Geometry<f64>> {
        if from_epsg == to_epsg {
            return Ok(geometry.clone());
        }
        bail!(
            "Reprojection from EPSG:{} to EPSG:{} requires the 'proj' feature",
            from_epsg,
            to_epsg
        )
    }

    /// Parse an EPSG code out of a CRS name such as `EPSG:3005` or
    /// `urn:ogc:def:crs:EPSG::3005`
    pub fn parse_epsg(name: &str) -> Result<i32> {
        let digits: String = name
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if digits.is_empty() || !name.to_ascii_uppercase().contains("EPSG") {
            bail!("Unsupported CRS name: {}", name);
        }
        digits
            .parse::<i32>()
            .with_context(|| format!("Invalid EPSG code in CRS name: {}", name))
    }
}

/// Bounding box structure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_rect(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> Self {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the box by `distance` on every side
    pub fn expand(&self, distance: f64) -> Self {
        BoundingBox::new(
            self.min_x - distance,
            self.min_y - distance,
            self.max_x + distance,
            self.max_y + distance,
        )
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn lower(&self) -> [f64; 2] {
        [self.min_x, self.min_y]
    }

    pub fn upper(&self) -> [f64; 2] {
        [self.max_x, self.max_y]
    }
}
