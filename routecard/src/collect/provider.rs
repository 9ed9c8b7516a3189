use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use geo::Geometry as GeoGeometry;
use geojson::GeoJson;
use log::{debug, info, warn};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use serde::Serialize;

use crate::collect::definition_query::DefinitionQuery;
use crate::error::{Result, RouteCardError};
use crate::geo_core::{BoundingBox, GeoCore, WORKING_EPSG};
use crate::geometric::shape::Shape;

/// One attribute value of a reference feature
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map(FieldValue::Real).unwrap_or(FieldValue::Null),
            },
            serde_json::Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Real(r) => Some(*r),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            FieldValue::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// NULL renders as an empty string; whole reals keep one decimal ("5.0")
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) if r.is_finite() && r.fract() == 0.0 => write!(f, "{:.1}", r),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A row returned by a provider query: the requested fields, in request
/// order, plus the feature geometry (absent for null shapes)
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub fid: usize,
    pub shape: Option<Shape>,
    fields: Arc<Vec<String>>,
    values: Vec<FieldValue>,
}

impl FeatureRow {
    pub fn new(fid: usize, shape: Option<Shape>, fields: Arc<Vec<String>>, values: Vec<FieldValue>) -> Self {
        FeatureRow {
            fid,
            shape,
            fields,
            values,
        }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Case-insensitive lookup by field name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .position(|f| f.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn field_names(&self) -> &[String] {
        &self.fields
    }
}

/// Source of reference geometries and attributes
pub trait GeometryProvider {
    /// Rows of `layer` restricted to `fields` (all fields when empty),
    /// filtered by an optional where-clause
    fn query(&self, layer: &str, fields: &[String], where_clause: Option<&str>) -> Result<Vec<FeatureRow>>;

    /// Number of features in `layer`
    fn count(&self, layer: &str) -> Result<usize>;

    /// EPSG code the layer's geometries are stored in
    fn spatial_reference(&self, layer: &str) -> Result<i32>;

    fn has_layer(&self, layer: &str) -> bool;

    fn layer_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct StoredFeature {
    fid: usize,
    shape: Option<Shape>,
    values: Vec<FieldValue>,
}

/// An in-memory feature collection in a single CRS
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    name: String,
    epsg: i32,
    fields: Arc<Vec<String>>,
    features: Vec<StoredFeature>,
}

impl MemoryLayer {
    pub fn new(name: impl Into<String>, epsg: i32, fields: Vec<String>) -> Self {
        MemoryLayer {
            name: name.into(),
            epsg,
            fields: Arc::new(fields),
            features: Vec::new(),
        }
    }

    /// Rebuild a layer from query rows that all carry the same field list
    pub fn from_rows(name: impl Into<String>, epsg: i32, rows: Vec<FeatureRow>) -> Self {
        let fields = rows
            .first()
            .map(|r| r.fields.clone())
            .unwrap_or_else(|| Arc::new(Vec::new()));
        let features = rows
            .into_iter()
            .map(|r| StoredFeature {
                fid: r.fid,
                shape: r.shape,
                values: r.values,
            })
            .collect();
        MemoryLayer {
            name: name.into(),
            epsg,
            fields,
            features,
        }
    }

    /// Add a feature; values follow the layer's field order
    pub fn push(&mut self, shape: Option<Shape>, values: Vec<FieldValue>) -> Result<usize> {
        if values.len() != self.fields.len() {
            return Err(RouteCardError::provider(
                &self.name,
                format!("expected {} values, got {}", self.fields.len(), values.len()),
            ));
        }
        let fid = self.features.len();
        self.features.push(StoredFeature { fid, shape, values });
        Ok(fid)
    }

    /// Convenience for building layers in code: named values in any order,
    /// missing fields become NULL
    pub fn push_named(&mut self, shape: Option<Shape>, values: &[(&str, FieldValue)]) -> Result<usize> {
        let mut ordered = vec![FieldValue::Null; self.fields.len()];
        for (name, value) in values {
            let idx = self
                .field_index(name)
                .ok_or_else(|| RouteCardError::provider(&self.name, format!("unknown field '{}'", name)))?;
            ordered[idx] = value.clone();
        }
        self.push(shape, ordered)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epsg(&self) -> i32 {
        self.epsg
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.eq_ignore_ascii_case(name))
    }

    /// Project and filter the stored features
    pub fn rows(&self, fields: &[String], filter: Option<&DefinitionQuery>) -> Result<Vec<FeatureRow>> {
        // Layers rebuilt from an empty query result carry no field list
        if self.features.is_empty() {
            return Ok(Vec::new());
        }
        let (names, indices) = if fields.is_empty() {
            (self.fields.clone(), (0..self.fields.len()).collect::<Vec<_>>())
        } else {
            let mut indices = Vec::with_capacity(fields.len());
            for field in fields {
                let idx = self.field_index(field).ok_or_else(|| {
                    RouteCardError::provider(&self.name, format!("field '{}' does not exist", field))
                })?;
                indices.push(idx);
            }
            (Arc::new(fields.to_vec()), indices)
        };

        if let Some(query) = filter {
            for field in query.fields() {
                if self.field_index(&field).is_none() {
                    return Err(RouteCardError::provider(
                        &self.name,
                        format!("definition query references unknown field '{}'", field),
                    ));
                }
            }
        }

        let rows = self
            .features
            .iter()
            .filter(|feature| match filter {
                Some(query) => query.matches(|name| {
                    self.field_index(name).and_then(|idx| feature.values.get(idx))
                }),
                None => true,
            })
            .map(|feature| {
                let values = indices.iter().map(|i| feature.values[*i].clone()).collect();
                FeatureRow::new(feature.fid, feature.shape.clone(), names.clone(), values)
            })
            .collect();
        Ok(rows)
    }

    /// Features whose envelope intersects `extent`, looked up through an R-tree
    pub fn within_extent(&self, extent: &BoundingBox) -> MemoryLayer {
        let entries: Vec<GeomWithData<Rectangle<[f64; 2]>, usize>> = self
            .features
            .iter()
            .enumerate()
            .filter_map(|(idx, feature)| {
                let bbox = feature.shape.as_ref()?.bounding_box()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners(bbox.lower(), bbox.upper()),
                    idx,
                ))
            })
            .collect();
        let tree = RTree::bulk_load(entries);
        let envelope = AABB::from_corners(extent.lower(), extent.upper());

        let mut hits: Vec<usize> = tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();

        MemoryLayer {
            name: self.name.clone(),
            epsg: self.epsg,
            fields: self.fields.clone(),
            features: hits.into_iter().map(|idx| self.features[idx].clone()).collect(),
        }
    }

    /// Copy of the layer with every geometry reprojected into `to_epsg`
    pub fn reprojected(&self, to_epsg: i32) -> Result<MemoryLayer> {
        if self.epsg == to_epsg {
            return Ok(self.clone());
        }
        let mut features = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let shape = match &feature.shape {
                Some(shape) => Some(Shape::new(GeoCore::reproject(shape.geometry(), self.epsg, to_epsg)?)?),
                None => None,
            };
            features.push(StoredFeature {
                fid: feature.fid,
                shape,
                values: feature.values.clone(),
            });
        }
        Ok(MemoryLayer {
            name: self.name.clone(),
            epsg: to_epsg,
            fields: self.fields.clone(),
            features,
        })
    }

    /// Parse a GeoJSON FeatureCollection. The legacy `crs` member selects the
    /// EPSG code; without it `default_epsg` applies.
    pub fn from_geojson_str(name: &str, content: &str, default_epsg: i32) -> Result<Self> {
        let geojson: GeoJson = content
            .parse()
            .with_context(|| format!("Failed to parse GeoJSON for layer {}", name))?;
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            GeoJson::Feature(f) => geojson::FeatureCollection {
                bbox: None,
                features: vec![f],
                foreign_members: None,
            },
            GeoJson::Geometry(g) => geojson::FeatureCollection {
                bbox: None,
                features: vec![geojson::Feature::from(g)],
                foreign_members: None,
            },
        };

        let epsg = match collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get("crs"))
            .and_then(|crs| crs.pointer("/properties/name"))
            .and_then(|n| n.as_str())
        {
            Some(crs_name) => GeoCore::parse_epsg(crs_name)?,
            None => default_epsg,
        };

        let mut fields: Vec<String> = Vec::new();
        for feature in &collection.features {
            if let Some(props) = &feature.properties {
                for key in props.keys() {
                    if !fields.contains(key) {
                        fields.push(key.clone());
                    }
                }
            }
        }

        let mut layer = MemoryLayer::new(name, epsg, fields);
        for feature in &collection.features {
            let shape = match &feature.geometry {
                Some(geometry) => {
                    let geo_geom: GeoGeometry<f64> = geometry
                        .try_into()
                        .with_context(|| format!("Failed to convert geometry in layer {}", name))?;
                    Some(Shape::new(geo_geom)?)
                }
                None => None,
            };
            let values = layer
                .fields
                .iter()
                .map(|field| {
                    feature
                        .properties
                        .as_ref()
                        .and_then(|p| p.get(field))
                        .map(FieldValue::from_json)
                        .unwrap_or(FieldValue::Null)
                })
                .collect();
            layer.push(shape, values)?;
        }
        debug!("Loaded {} features into layer {}", layer.len(), name);
        Ok(layer)
    }

    pub fn from_geojson_file<P: AsRef<Path>>(name: &str, path: P, default_epsg: i32) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read GeoJSON file: {:?}", path))?;
        Self::from_geojson_str(name, &content, default_epsg)
    }
}

/// In-memory geometry provider: one [`MemoryLayer`] per reference layer name
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: BTreeMap<String, MemoryLayer>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: MemoryLayer) {
        self.layers.insert(layer.name().to_string(), layer);
    }

    pub fn layer(&self, name: &str) -> Option<&MemoryLayer> {
        self.layers.get(name)
    }

    /// Load every `*.geojson` / `*.json` file of a directory; the file stem
    /// is the layer name
    pub fn from_geojson_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut store = LayerStore::new();
        let mut entries: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read layer directory: {:?}", dir))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in entries {
            let is_geojson = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            if !is_geojson {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!("Skipping layer file with a non UTF-8 name: {:?}", path);
                continue;
            };
            let layer = MemoryLayer::from_geojson_file(name, &path, WORKING_EPSG)?;
            store.insert(layer);
        }
        info!("Loaded {} reference layers from {:?}", store.layers.len(), dir);
        Ok(store)
    }

    fn get(&self, layer: &str) -> Result<&MemoryLayer> {
        self.layers
            .get(layer)
            .ok_or_else(|| RouteCardError::provider(layer, "layer does not exist"))
    }
}

impl GeometryProvider for LayerStore {
    fn query(&self, layer: &str, fields: &[String], where_clause: Option<&str>) -> Result<Vec<FeatureRow>> {
        let source = self.get(layer)?;
        let filter = match where_clause.map(str::trim).filter(|w| !w.is_empty()) {
            Some(clause) => Some(DefinitionQuery::parse(clause).map_err(|e| match e {
                RouteCardError::Provider { message, .. } => RouteCardError::provider(layer, message),
                other => other,
            })?),
            None => None,
        };
        source.rows(fields, filter.as_ref())
    }

    fn count(&self, layer: &str) -> Result<usize> {
        Ok(self.get(layer)?.len())
    }

    fn spatial_reference(&self, layer: &str) -> Result<i32> {
        Ok(self.get(layer)?.epsg())
    }

    fn has_layer(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    fn layer_names(&self) -> Vec<String> {
        self.layers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64, size: f64) -> Shape {
        Shape::new(
            polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
                (x: x, y: y),
            ]
            .into(),
        )
        .unwrap()
    }

    fn parks() -> MemoryLayer {
        let mut layer = MemoryLayer::new(
            "Parks",
            WORKING_EPSG,
            vec!["PROTECTED_LANDS_NAME".to_string(), "DESIGNATION".to_string()],
        );
        layer
            .push_named(
                Some(square(0.0, 0.0, 100.0)),
                &[
                    ("PROTECTED_LANDS_NAME", FieldValue::Text("Skaha Bluffs".into())),
                    ("DESIGNATION", FieldValue::Text("PROVINCIAL PARK".into())),
                ],
            )
            .unwrap();
        layer
            .push_named(
                Some(square(5000.0, 5000.0, 100.0)),
                &[("PROTECTED_LANDS_NAME", FieldValue::Text("Far Park".into()))],
            )
            .unwrap();
        layer.push_named(None, &[]).unwrap();
        layer
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::Integer(7).to_string(), "7");
        assert_eq!(FieldValue::Real(5.0).to_string(), "5.0");
        assert_eq!(FieldValue::Real(2.25).to_string(), "2.25");
        assert_eq!(FieldValue::from_json(&serde_json::json!(3)), FieldValue::Integer(3));
        assert_eq!(FieldValue::from_json(&serde_json::json!(null)), FieldValue::Null);
    }

    #[test]
    fn test_rows_project_and_filter() {
        let layer = parks();
        let rows = layer
            .rows(&["DESIGNATION".to_string()], None)
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].values().len(), 1);
        assert!(rows[2].shape.is_none());

        let filter = DefinitionQuery::parse("DESIGNATION = 'PROVINCIAL PARK'").unwrap();
        let rows = layer.rows(&[], Some(&filter)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("protected_lands_name"),
            Some(&FieldValue::Text("Skaha Bluffs".into()))
        );
        assert!(layer.rows(&["MISSING".to_string()], None).is_err());
    }

    #[test]
    fn test_within_extent_uses_envelopes() {
        let layer = parks();
        let selected = layer.within_extent(&BoundingBox::new(-50.0, -50.0, 200.0, 200.0));
        assert_eq!(selected.len(), 1);
        let none = layer.within_extent(&BoundingBox::new(1000.0, 1000.0, 2000.0, 2000.0));
        assert!(none.is_empty());
    }

    #[test]
    fn test_store_queries_with_where_clause() {
        let mut store = LayerStore::new();
        store.insert(parks());
        assert!(store.has_layer("Parks"));
        assert_eq!(store.count("Parks").unwrap(), 3);
        assert_eq!(store.spatial_reference("Parks").unwrap(), WORKING_EPSG);
        let rows = store
            .query("Parks", &[], Some("PROTECTED_LANDS_NAME LIKE 'Far%'"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(store.query("Parks", &[], Some("NAME =")).is_err());
        assert!(store.query("Lakes", &[], None).is_err());
    }

    #[test]
    fn test_geojson_layer_reads_crs_and_properties() {
        let content = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3005"}},
            "features": [
                {"type": "Feature",
                 "properties": {"BGC_LABEL": "PPxh1", "AREA": 12.5},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
                {"type": "Feature", "properties": {"BGC_LABEL": "IDFxh2"}, "geometry": null}
            ]
        }"#;
        let layer = MemoryLayer::from_geojson_str("BEC", content, 4326).unwrap();
        assert_eq!(layer.epsg(), 3005);
        assert_eq!(layer.len(), 2);
        let rows = layer.rows(&["BGC_LABEL".to_string()], None).unwrap();
        assert_eq!(rows[1].value(0), Some(&FieldValue::Text("IDFxh2".into())));
        assert!(rows[1].shape.is_none());
    }
}
