use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};

use crate::collect::catalogue::{CheckDefinition, Strategy};
use crate::collect::definition_query::DefinitionQuery;
use crate::collect::global_variables::ALWAYS_EVALUATED_LAYER;
use crate::collect::provider::{FeatureRow, GeometryProvider, MemoryLayer};
use crate::error::Result;
use crate::geo_core::BoundingBox;

/// Reference layers trimmed to the analysis extent for one subject.
/// Layers left empty by the trim are recorded as having no overlap.
#[derive(Debug, Clone, Default)]
pub struct LayerSelection {
    layers: BTreeMap<String, MemoryLayer>,
    no_overlap: BTreeSet<String>,
}

impl LayerSelection {
    /// Select, for every distinct layer the checks reference, the features
    /// inside `extent`. Layers stored in another CRS are read whole,
    /// reprojected, then trimmed.
    pub fn build(
        provider: &dyn GeometryProvider,
        checks: &[CheckDefinition],
        extent: &BoundingBox,
        working_epsg: i32,
    ) -> Result<Self> {
        let mut names: Vec<&str> = Vec::new();
        for check in checks {
            if check.strategy == Strategy::AccessDenied {
                continue;
            }
            for layer in &check.layers {
                if !names.contains(&layer.name.as_str()) {
                    names.push(layer.name.as_str());
                }
            }
        }

        let mut selection = LayerSelection::default();
        for name in names {
            if !provider.has_layer(name) {
                continue;
            }
            let epsg = provider.spatial_reference(name)?;
            let full = MemoryLayer::from_rows(name, epsg, provider.query(name, &[], None)?);
            let full = if epsg != working_epsg {
                debug!("Reprojecting {} from EPSG:{} to EPSG:{}", name, epsg, working_epsg);
                full.reprojected(working_epsg)?
            } else {
                full
            };

            let trimmed = full.within_extent(extent);
            debug!("{}: {} of {} features inside the extent", name, trimmed.len(), full.len());

            if trimmed.is_empty() {
                if name == ALWAYS_EVALUATED_LAYER {
                    selection.layers.insert(name.to_string(), full);
                    continue;
                }
                selection.no_overlap.insert(name.to_string());
            }
            selection.layers.insert(name.to_string(), trimmed);
        }
        info!(
            "Selected {} layers, {} without features in the extent",
            selection.layers.len(),
            selection.no_overlap.len()
        );
        Ok(selection)
    }

    /// True when the layer had no feature in the extent
    pub fn is_excluded(&self, layer: &str) -> bool {
        self.no_overlap.contains(layer)
    }

    pub fn no_overlap(&self) -> &BTreeSet<String> {
        &self.no_overlap
    }

    pub fn contains_layer(&self, layer: &str) -> bool {
        self.layers.contains_key(layer)
    }

    /// Query the selected copy of a layer; `None` when it was not selected
    pub fn query(
        &self,
        layer: &str,
        fields: &[String],
        filter: Option<&DefinitionQuery>,
    ) -> Option<Result<Vec<FeatureRow>>> {
        self.layers.get(layer).map(|l| l.rows(fields, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::catalogue::LayerRef;
    use crate::collect::provider::{FieldValue, LayerStore};
    use crate::geo_core::WORKING_EPSG;
    use crate::geometric::shape::Shape;
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

    fn layer_with_square(name: &str, x: f64) -> MemoryLayer {
        let mut layer = MemoryLayer::new(name, WORKING_EPSG, vec!["NAME".to_string()]);
        layer
            .push(Some(square(x, 0.0, 10.0)), vec![FieldValue::Text(format!("{} feature", name))])
            .unwrap();
        layer
    }

    fn check(label: &str, strategy: Strategy, layer: &str) -> CheckDefinition {
        CheckDefinition {
            label: label.to_string(),
            strategy,
            layers: vec![LayerRef::parse(layer).unwrap()],
            query_values: vec![],
            query_field: None,
            buffer_meters: 0.0,
            canned_statement: String::new(),
            definition_query: None,
            sensitive: false,
        }
    }

    #[test]
    fn test_empty_layers_are_marked_no_overlap_except_bcts() {
        let mut store = LayerStore::new();
        store.insert(layer_with_square("Parks", 0.0));
        store.insert(layer_with_square("Lakes", 10_000.0));
        store.insert(layer_with_square(ALWAYS_EVALUATED_LAYER, 20_000.0));

        let checks = vec![
            check("Parks", Strategy::SpecialProcessing, "Parks"),
            check("Lakes", Strategy::ContainsOverlap, "Lakes"),
            check("BCTS", Strategy::ContainsOverlap, ALWAYS_EVALUATED_LAYER),
        ];
        let extent = BoundingBox::new(-100.0, -100.0, 100.0, 100.0);
        let selection = LayerSelection::build(&store, &checks, &extent, WORKING_EPSG).unwrap();

        assert!(!selection.is_excluded("Parks"));
        assert!(selection.is_excluded("Lakes"));
        assert!(!selection.is_excluded(ALWAYS_EVALUATED_LAYER));
        let bcts = selection.query(ALWAYS_EVALUATED_LAYER, &[], None).unwrap().unwrap();
        assert_eq!(bcts.len(), 1);
        let lakes = selection.query("Lakes", &[], None).unwrap().unwrap();
        assert!(lakes.is_empty());
    }

    #[test]
    fn test_access_denied_layers_are_not_read() {
        let store = LayerStore::new();
        let checks = vec![check("Parks", Strategy::AccessDenied, "Parks")];
        let extent = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let selection = LayerSelection::build(&store, &checks, &extent, WORKING_EPSG).unwrap();
        assert!(!selection.contains_layer("Parks"));
        assert!(selection.no_overlap().is_empty());
    }
}
