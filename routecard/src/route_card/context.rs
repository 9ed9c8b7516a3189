use log::debug;

use crate::collect::definition_query::DefinitionQuery;
use crate::collect::provider::{FeatureRow, GeometryProvider};
use crate::collect::selection::LayerSelection;
use crate::error::{Result, RouteCardError};
use crate::geo_core::GeoCore;
use crate::geometric::shape::Shape;
use crate::geometric::subject::Subject;
use crate::route_card::applicability::RunResult;

/// Everything one subject's evaluation reads and writes.
///
/// A context is created per subject and dropped afterwards, so the result
/// accumulator and the habitat caches never outlive the subject.
pub struct RunContext<'a> {
    pub subject: &'a Subject,
    pub location: &'a str,
    provider: &'a dyn GeometryProvider,
    selection: Option<&'a LayerSelection>,
    working_epsg: i32,
    pub result: RunResult,
    /// BEC labels under the subject, scanned on first use
    pub(crate) bec_zones: Option<Vec<String>>,
    /// Wildlife habitat area codes under the subject
    pub(crate) wha_codes: Option<Vec<String>>,
    /// Ungulate winter range (code, sub-type) pairs under the subject
    pub(crate) uwr_codes: Option<Vec<(String, String)>>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        subject: &'a Subject,
        location: &'a str,
        provider: &'a dyn GeometryProvider,
        selection: Option<&'a LayerSelection>,
        working_epsg: i32,
    ) -> Self {
        RunContext {
            subject,
            location,
            provider,
            selection,
            working_epsg,
            result: RunResult::new(),
            bec_zones: None,
            wha_codes: None,
            uwr_codes: None,
        }
    }

    /// True when pre-selection found nothing of `layer` near the subject
    pub fn is_excluded(&self, layer: &str) -> bool {
        self.selection.map(|s| s.is_excluded(layer)).unwrap_or(false)
    }

    /// Rows of `layer` near the subject. The pre-selected copy is used when
    /// there is one, otherwise the provider is queried directly.
    pub fn rows(&self, layer: &str, fields: &[String], where_clause: Option<&str>) -> Result<Vec<FeatureRow>> {
        if let Some(selection) = self.selection {
            let filter = match where_clause.map(str::trim).filter(|w| !w.is_empty()) {
                Some(clause) => Some(DefinitionQuery::parse(clause).map_err(|e| match e {
                    RouteCardError::Provider { message, .. } => RouteCardError::provider(layer, message),
                    other => other,
                })?),
                None => None,
            };
            if let Some(rows) = selection.query(layer, fields, filter.as_ref()) {
                return rows;
            }
        }
        self.full_rows(layer, fields, where_clause)
    }

    /// Rows of the whole layer, bypassing pre-selection
    pub fn full_rows(&self, layer: &str, fields: &[String], where_clause: Option<&str>) -> Result<Vec<FeatureRow>> {
        let rows = self.provider.query(layer, fields, where_clause)?;
        let epsg = self.provider.spatial_reference(layer)?;
        if epsg == self.working_epsg {
            return Ok(rows);
        }
        debug!("Reprojecting {} rows of {} from EPSG:{}", rows.len(), layer, epsg);
        rows.into_iter()
            .map(|mut row| {
                if let Some(shape) = &row.shape {
                    let geometry = GeoCore::reproject(shape.geometry(), epsg, self.working_epsg)?;
                    row.shape = Some(Shape::new(geometry)?);
                }
                Ok(row)
            })
            .collect()
    }

    /// Not disjoint from any subject part
    pub fn touches_subject(&self, shape: &Shape) -> Result<bool> {
        for part in self.subject.parts() {
            if !shape.disjoint(part)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Not disjoint from any of `areas`
    pub fn touches_any(shape: &Shape, areas: &[Shape]) -> Result<bool> {
        for area in areas {
            if !shape.disjoint(area)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
