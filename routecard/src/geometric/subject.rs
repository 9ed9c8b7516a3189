use std::fmt;
use std::str::FromStr;

use geo::Geometry as GeoGeometry;
use log::{debug, info, warn};
use serde::Serialize;

use crate::collect::controls::ScriptControls;
use crate::collect::global_variables::GROSS_AREA_FIELD;
use crate::collect::provider::{FeatureRow, GeometryProvider};
use crate::error::{Result, RouteCardError};
use crate::geo_core::{BoundingBox, GeoCore};
use crate::geometric::shape::Shape;

/// What kind of feature a route card is prepared for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubjectKind {
    Block,
    Road,
}

impl FromStr for SubjectKind {
    type Err = RouteCardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(SubjectKind::Block),
            "road" => Ok(SubjectKind::Road),
            other => Err(RouteCardError::config(format!("Unknown subject kind '{}'", other))),
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Block => write!(f, "Block"),
            SubjectKind::Road => write!(f, "Road"),
        }
    }
}

/// The block or road being evaluated, in the working projection.
///
/// `parts` are the shapes every check is tested against; for a road they
/// are the dissolved road buffer. `search_buffer` surrounds the parts by
/// `SearchBufferDistance` and drives the analysis extent.
#[derive(Debug, Clone)]
pub struct Subject {
    pub kind: SubjectKind,
    pub unique_id: Option<i64>,
    /// Title field name and value, in configured order
    pub title: Vec<(String, String)>,
    pub gross_area: Option<f64>,
    parts: Vec<Shape>,
    search_buffer: Vec<Shape>,
}

impl Subject {
    /// Build a subject from one feature of the subject input
    pub fn from_feature(row: &FeatureRow, kind: SubjectKind, controls: &ScriptControls) -> Result<Self> {
        let shape = row
            .shape
            .as_ref()
            .ok_or_else(|| RouteCardError::Geometry(format!("subject feature {} has no geometry", row.fid)))?;

        let (id_field, title_fields) = match kind {
            SubjectKind::Block => (&controls.block_id_field, &controls.block_title_fields),
            SubjectKind::Road => (&controls.road_id_field, &controls.road_title_fields),
        };

        let unique_id = row.get(id_field).and_then(|v| v.as_i64());
        if unique_id.is_none() {
            warn!("Subject feature {} has no integer {}", row.fid, id_field);
        }

        let title_fields: Vec<String> = if title_fields.is_empty() {
            vec![id_field.clone()]
        } else {
            title_fields.clone()
        };
        let title = title_fields
            .iter()
            .map(|field| {
                let value = row.get(field).map(|v| v.to_string()).unwrap_or_default();
                (field.clone(), value)
            })
            .collect();

        let gross_area = row.get(GROSS_AREA_FIELD).and_then(|v| v.as_f64());

        let parts = match kind {
            SubjectKind::Block => split_parts(shape)?,
            SubjectKind::Road => {
                let buffered = split_parts(shape)?
                    .iter()
                    .map(|part| part.buffer(controls.road_buffer_distance))
                    .collect::<Result<Vec<_>>>()?;
                vec![Shape::union_all(&buffered)?]
            }
        };

        Self::new(kind, unique_id, title, gross_area, parts, controls.search_buffer_distance)
    }

    pub fn new(
        kind: SubjectKind,
        unique_id: Option<i64>,
        title: Vec<(String, String)>,
        gross_area: Option<f64>,
        parts: Vec<Shape>,
        search_buffer_distance: f64,
    ) -> Result<Self> {
        if parts.is_empty() {
            return Err(RouteCardError::Geometry("subject has no parts".into()));
        }
        let search_buffer = parts
            .iter()
            .map(|part| part.buffer(search_buffer_distance))
            .collect::<Result<Vec<_>>>()?;
        Ok(Subject {
            kind,
            unique_id,
            title,
            gross_area,
            parts,
            search_buffer,
        })
    }

    pub fn parts(&self) -> &[Shape] {
        &self.parts
    }

    pub fn search_buffer(&self) -> &[Shape] {
        &self.search_buffer
    }

    /// Every part buffered by `distance`
    pub fn buffered_parts(&self, distance: f64) -> Result<Vec<Shape>> {
        self.parts.iter().map(|part| part.buffer(distance)).collect()
    }

    /// Title values joined by spaces, used in log lines and report headers
    pub fn label(&self) -> String {
        let values: Vec<&str> = self
            .title
            .iter()
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            match self.unique_id {
                Some(id) => format!("{} {}", self.kind, id),
                None => self.kind.to_string(),
            }
        } else {
            values.join(" ")
        }
    }

    /// Envelope of the search buffer grown by `margin`
    pub fn analysis_extent(&self, margin: f64) -> Option<BoundingBox> {
        self.search_buffer
            .iter()
            .filter_map(|shape| shape.bounding_box())
            .reduce(|acc, bbox| acc.union(&bbox))
            .map(|bbox| bbox.expand(margin))
    }

    /// Name of the legal area the subject falls in. The last legal-area
    /// polygon the subject lies within, or that overlaps it, wins.
    pub fn determine_legal_location(
        &self,
        provider: &dyn GeometryProvider,
        controls: &ScriptControls,
        working_epsg: i32,
    ) -> Result<String> {
        let layer = &controls.legal_area_layer;
        let field = controls.legal_area_field.clone();
        let epsg = provider.spatial_reference(layer)?;

        let mut location = None;
        for row in provider.query(layer, &[field], None)? {
            let Some(shape) = &row.shape else {
                continue;
            };
            let area = if epsg != working_epsg {
                Shape::new(GeoCore::reproject(shape.geometry(), epsg, working_epsg)?)?
            } else {
                shape.clone()
            };
            for part in &self.parts {
                if part.within(&area)? || area.overlaps(part)? {
                    let name = row.value(0).map(|v| v.to_string()).unwrap_or_default();
                    debug!("{} falls in legal area '{}'", self.label(), name);
                    location = Some(name);
                }
            }
        }

        match location.filter(|l| !l.is_empty()) {
            Some(location) => {
                info!("Legal location of {}: {}", self.label(), location);
                Ok(location)
            }
            None => Err(RouteCardError::NoLegalLocation(self.label())),
        }
    }
}

fn split_parts(shape: &Shape) -> Result<Vec<Shape>> {
    match shape.geometry() {
        GeoGeometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .map(|polygon| Shape::new(GeoGeometry::Polygon(polygon.clone())))
            .collect(),
        GeoGeometry::MultiLineString(ml) => ml
            .0
            .iter()
            .map(|line| Shape::new(GeoGeometry::LineString(line.clone())))
            .collect(),
        GeoGeometry::GeometryCollection(gc) => gc.0.iter().map(|g| Shape::new(g.clone())).collect(),
        _ => Ok(vec![shape.clone()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::provider::{FieldValue, LayerStore, MemoryLayer};
    use crate::geo_core::WORKING_EPSG;
    use geo::{line_string, polygon, MultiPolygon};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn square(x: f64, y: f64, size: f64) -> geo::Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    fn controls() -> ScriptControls {
        let raw: BTreeMap<String, String> = [
            ("SearchBufferDistance", "100"),
            ("ExtentDistance", "500"),
            ("InputBlockTitleFields", "LICENCE_ID,CUTB_ID"),
            ("InputRoadTitleFields", "ROAD_NAME"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        ScriptControls::from_map(raw).unwrap()
    }

    fn block_row(geometry: GeoGeometry<f64>) -> FeatureRow {
        FeatureRow::new(
            0,
            Some(Shape::new(geometry).unwrap()),
            Arc::new(vec![
                "LICENCE_ID".to_string(),
                "CUTB_ID".to_string(),
                "CUTB_SEQ_NBR".to_string(),
                "GROSS_AREA".to_string(),
            ]),
            vec![
                FieldValue::Text("A12345".into()),
                FieldValue::Text("7".into()),
                FieldValue::Real(991.0),
                FieldValue::Real(24.5),
            ],
        )
    }

    #[test]
    fn test_block_keeps_parts_and_titles() {
        let geometry = GeoGeometry::MultiPolygon(MultiPolygon(vec![
            square(0.0, 0.0, 100.0),
            square(500.0, 0.0, 100.0),
        ]));
        let subject = Subject::from_feature(&block_row(geometry), SubjectKind::Block, &controls()).unwrap();
        assert_eq!(subject.parts().len(), 2);
        assert_eq!(subject.unique_id, Some(991));
        assert_eq!(subject.gross_area, Some(24.5));
        assert_eq!(subject.label(), "A12345 7");

        let extent = subject.analysis_extent(500.0).unwrap();
        assert!((extent.min_x - -600.0).abs() < 1.0);
        assert!((extent.max_x - 1200.0).abs() < 1.0);
    }

    #[test]
    fn test_road_is_buffered_and_dissolved() {
        let row = FeatureRow::new(
            3,
            Some(Shape::new(line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)].into()).unwrap()),
            Arc::new(vec!["ROAD_NAME".to_string()]),
            vec![FieldValue::Text("Mainline".into())],
        );
        let subject = Subject::from_feature(&row, SubjectKind::Road, &controls()).unwrap();
        assert_eq!(subject.parts().len(), 1);
        let bbox = subject.parts()[0].bounding_box().unwrap();
        assert!((bbox.min_y - -10.0).abs() < 0.01);
        assert_eq!(subject.label(), "Mainline");
        assert_eq!(subject.kind.to_string(), "Road");
    }

    #[test]
    fn test_legal_location_last_match_wins() {
        let mut legal = MemoryLayer::new("LegalAreas", WORKING_EPSG, vec!["LegalArea".to_string()]);
        legal
            .push(
                Some(Shape::new(square(-1000.0, -1000.0, 5000.0).into()).unwrap()),
                vec![FieldValue::Text("Kootenay".into())],
            )
            .unwrap();
        legal
            .push(
                Some(Shape::new(square(50.0, -1000.0, 5000.0).into()).unwrap()),
                vec![FieldValue::Text("Okanagan".into())],
            )
            .unwrap();
        legal
            .push(
                Some(Shape::new(square(90_000.0, 0.0, 10.0).into()).unwrap()),
                vec![FieldValue::Text("Cariboo".into())],
            )
            .unwrap();
        let mut store = LayerStore::new();
        store.insert(legal);

        let subject =
            Subject::from_feature(&block_row(square(0.0, 0.0, 100.0).into()), SubjectKind::Block, &controls()).unwrap();
        let location = subject.determine_legal_location(&store, &controls(), WORKING_EPSG).unwrap();
        assert_eq!(location, "Okanagan");

        let far = Subject::from_feature(
            &block_row(square(50_000.0, 50_000.0, 10.0).into()),
            SubjectKind::Block,
            &controls(),
        )
        .unwrap();
        let err = far.determine_legal_location(&store, &controls(), WORKING_EPSG).unwrap_err();
        assert!(matches!(err, RouteCardError::NoLegalLocation(_)));
    }

    #[test]
    fn test_subject_kind_parsing() {
        assert_eq!("Block".parse::<SubjectKind>().unwrap(), SubjectKind::Block);
        assert_eq!(" road ".parse::<SubjectKind>().unwrap(), SubjectKind::Road);
        assert!("trail".parse::<SubjectKind>().unwrap_err().is_config());
    }
}
