//! Fixtures shared by the route card unit tests

use geo::{point as geo_point, polygon};

use crate::collect::catalogue::{CheckDefinition, LayerRef, Strategy};
use crate::collect::provider::{FieldValue, MemoryLayer};
use crate::geo_core::WORKING_EPSG;
use crate::geometric::shape::Shape;
use crate::geometric::subject::{Subject, SubjectKind};

pub fn square(x: f64, y: f64, size: f64) -> Shape {
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

pub fn point(x: f64, y: f64) -> Shape {
    Shape::new(geo_point!(x: x, y: y).into()).unwrap()
}

pub fn layer(name: &str, fields: &[&str], features: Vec<(Shape, Vec<FieldValue>)>) -> MemoryLayer {
    let mut layer = MemoryLayer::new(name, WORKING_EPSG, fields.iter().map(|f| f.to_string()).collect());
    for (shape, values) in features {
        layer.push(Some(shape), values).unwrap();
    }
    layer
}

pub fn check(label: &str, strategy: Strategy, layer_spec: &str, buffer: f64, canned: &str) -> CheckDefinition {
    CheckDefinition {
        label: label.to_string(),
        strategy,
        layers: layer_spec.split(';').filter_map(LayerRef::parse).collect(),
        query_values: vec![],
        query_field: None,
        buffer_meters: buffer,
        canned_statement: canned.to_string(),
        definition_query: None,
        sensitive: false,
    }
}

pub fn block_subject(shape: Shape) -> Subject {
    Subject::new(
        SubjectKind::Block,
        Some(991),
        vec![("LICENCE_ID".to_string(), "A12345".to_string())],
        Some(12.0),
        vec![shape],
        100.0,
    )
    .unwrap()
}
