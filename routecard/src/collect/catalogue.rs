use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, info, warn};
use serde::Serialize;

use crate::collect::controls::read_latin1;
use crate::collect::global_variables::ACCESS_DENIED_STATEMENT;
use crate::error::{Result, RouteCardError};

const FIXED_COLUMNS: [&str; 9] = [
    "Item",
    "Processing",
    "Layer_List",
    "Query_Values",
    "Query_Field",
    "CannedStatement",
    "BufferDistance",
    "Sensitive_Info",
    "Definition_Query",
];

/// Processing strategy named in the catalogue's `Processing` column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Strategy {
    Title,
    NonSpatial,
    AccessDenied,
    ContainsOverlap,
    Somc,
    PointLine,
    OverlapTouching,
    Contained,
    Bec,
    WildlifeHabitatAreas,
    UngulateWinterRange,
    DefaultToYes,
    SpecialProcessing,
    SpecialProcessingNoLayer,
    /// Kept so the row still shows up in the report; evaluates to nothing
    Unsupported(String),
}

impl Strategy {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "title" => Strategy::Title,
            "nonspatial" => Strategy::NonSpatial,
            "accessdenied" => Strategy::AccessDenied,
            "contains_overlap_layers" => Strategy::ContainsOverlap,
            "SOMC" => Strategy::Somc,
            "point_line_layers" => Strategy::PointLine,
            "overlap_touching_layers" => Strategy::OverlapTouching,
            "contained" => Strategy::Contained,
            "BEC" => Strategy::Bec,
            "wildlife_habitat_areas" => Strategy::WildlifeHabitatAreas,
            "ungulate_winter_range" => Strategy::UngulateWinterRange,
            "default_to_yes" => Strategy::DefaultToYes,
            "special_processing" => Strategy::SpecialProcessing,
            "special_processing_no_layer" => Strategy::SpecialProcessingNoLayer,
            other => Strategy::Unsupported(other.to_string()),
        }
    }

    /// Strategies that read at least one reference layer
    pub fn needs_layer(&self) -> bool {
        matches!(
            self,
            Strategy::ContainsOverlap
                | Strategy::Somc
                | Strategy::PointLine
                | Strategy::OverlapTouching
                | Strategy::Contained
                | Strategy::Bec
                | Strategy::WildlifeHabitatAreas
                | Strategy::UngulateWinterRange
                | Strategy::SpecialProcessing
        )
    }

    /// Strategies that look values up through `Query_Field`
    pub fn needs_query_field(&self) -> bool {
        matches!(
            self,
            Strategy::Bec | Strategy::WildlifeHabitatAreas | Strategy::UngulateWinterRange
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Title => "title",
            Strategy::NonSpatial => "nonspatial",
            Strategy::AccessDenied => "accessdenied",
            Strategy::ContainsOverlap => "contains_overlap_layers",
            Strategy::Somc => "SOMC",
            Strategy::PointLine => "point_line_layers",
            Strategy::OverlapTouching => "overlap_touching_layers",
            Strategy::Contained => "contained",
            Strategy::Bec => "BEC",
            Strategy::WildlifeHabitatAreas => "wildlife_habitat_areas",
            Strategy::UngulateWinterRange => "ungulate_winter_range",
            Strategy::DefaultToYes => "default_to_yes",
            Strategy::SpecialProcessing => "special_processing",
            Strategy::SpecialProcessingNoLayer => "special_processing_no_layer",
            Strategy::Unsupported(name) => name.as_str(),
        };
        write!(f, "{}", name)
    }
}

/// Raw attribute name mapped to the label used in statements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub field: String,
    pub label: String,
}

/// One entry of `Layer_List`: `Layer Name:Label=FIELD,FIELD`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerRef {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl LayerRef {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        let (name, spec) = match token.split_once(':') {
            Some((name, spec)) => (name.trim(), spec),
            None => (token, ""),
        };
        let fields = spec
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| match f.split_once('=') {
                Some((label, field)) => FieldSpec {
                    field: field.trim().to_string(),
                    label: label.trim().to_string(),
                },
                None => FieldSpec {
                    field: f.to_string(),
                    label: f.to_string(),
                },
            })
            .collect();
        Some(LayerRef {
            name: name.to_string(),
            fields,
        })
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.field.clone()).collect()
    }
}

/// One resolved catalogue row: a rule evaluated against the subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckDefinition {
    pub label: String,
    pub strategy: Strategy,
    pub layers: Vec<LayerRef>,
    pub query_values: Vec<String>,
    pub query_field: Option<String>,
    pub buffer_meters: f64,
    pub canned_statement: String,
    pub definition_query: Option<String>,
    pub sensitive: bool,
}

#[derive(Debug, Clone)]
struct CatalogueRow {
    item: String,
    processing: String,
    layer_list: String,
    query_values: String,
    query_field: String,
    canned_statement: String,
    buffer_distance: String,
    sensitive_info: String,
    definition_query: String,
    locations: BTreeMap<String, String>,
}

/// The `LUT_Processing` table, read once and resolved per legal location
#[derive(Debug, Clone)]
pub struct CatalogueTable {
    rows: Vec<CatalogueRow>,
    location_columns: Vec<String>,
}

impl CatalogueTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_latin1(path).map_err(|e| {
            RouteCardError::config(format!("Unable to read catalogue {:?}: {:#}", path, e))
        })?;
        let table = Self::from_csv_str(&content)?;
        info!(
            "Catalogue {:?}: {} rows, locations {:?}",
            path,
            table.rows.len(),
            table.location_columns
        );
        Ok(table)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| RouteCardError::config(format!("Malformed catalogue header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        for column in FIXED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(RouteCardError::config(format!(
                    "Catalogue is missing the '{}' column",
                    column
                )));
            }
        }
        let location_columns: Vec<String> = headers
            .iter()
            .filter(|h| !h.is_empty() && !FIXED_COLUMNS.contains(&h.as_str()) && !is_row_id(h))
            .cloned()
            .collect();

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| {
                RouteCardError::config(format!("Malformed catalogue row {}: {}", line + 2, e))
            })?;
            let cell = |name: &str| -> String {
                headers
                    .iter()
                    .position(|h| h == name)
                    .and_then(|idx| record.get(idx))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            let item = cell("Item");
            if item.is_empty() {
                continue;
            }
            let locations = location_columns
                .iter()
                .map(|loc| (loc.clone(), cell(loc)))
                .collect();
            rows.push(CatalogueRow {
                item,
                processing: cell("Processing"),
                layer_list: cell("Layer_List"),
                query_values: cell("Query_Values"),
                query_field: cell("Query_Field"),
                canned_statement: cell("CannedStatement"),
                buffer_distance: cell("BufferDistance"),
                sensitive_info: cell("Sensitive_Info"),
                definition_query: cell("Definition_Query"),
                locations,
            });
        }
        Ok(CatalogueTable {
            rows,
            location_columns,
        })
    }

    pub fn location_columns(&self) -> &[String] {
        &self.location_columns
    }

    fn enabled_rows<'a>(&'a self, location: &str) -> Result<impl Iterator<Item = &'a CatalogueRow> + 'a> {
        if !self.location_columns.iter().any(|c| c == location) {
            return Err(RouteCardError::config(format!(
                "Catalogue has no enable column for location '{}'",
                location
            )));
        }
        let location = location.to_string();
        Ok(self.rows.iter().filter(move |row| {
            row.locations
                .get(&location)
                .and_then(|v| v.parse::<f64>().ok())
                .map(|v| v > 0.0)
                .unwrap_or(false)
        }))
    }

    /// Distinct layer names referenced by the rows enabled at `location`
    pub fn referenced_layers(&self, location: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for row in self.enabled_rows(location)? {
            for layer in row.layer_list.split(';').filter_map(LayerRef::parse) {
                if !names.contains(&layer.name) {
                    names.push(layer.name);
                }
            }
        }
        Ok(names)
    }

    /// Resolve the checks that apply at `location`, in catalogue order.
    /// Checks touching an inaccessible layer become access-denied checks.
    pub fn for_location(&self, location: &str, inaccessible: &BTreeSet<String>) -> Result<Vec<CheckDefinition>> {
        let mut checks: Vec<CheckDefinition> = Vec::new();

        for row in self.enabled_rows(location)? {
            if checks.iter().any(|c| c.label == row.item) {
                warn!("Duplicate catalogue item '{}' ignored", row.item);
                continue;
            }
            let layers: Vec<LayerRef> = row.layer_list.split(';').filter_map(LayerRef::parse).collect();
            let mut strategy = Strategy::parse(&row.processing);
            let mut canned_statement = row.canned_statement.clone();

            let broken: Vec<&str> = layers
                .iter()
                .filter(|l| inaccessible.contains(&l.name))
                .map(|l| l.name.as_str())
                .collect();
            if !broken.is_empty() {
                debug!("{}: inaccessible layers {:?}", row.item, broken);
                strategy = Strategy::AccessDenied;
                canned_statement = ACCESS_DENIED_STATEMENT.to_string();
            }

            if let Strategy::Unsupported(name) = &strategy {
                warn!("{}: unknown processing strategy '{}', left as N", row.item, name);
            }
            if strategy.needs_layer() && layers.is_empty() {
                return Err(RouteCardError::config(format!(
                    "{}: strategy '{}' requires at least one layer",
                    row.item, strategy
                )));
            }
            let query_field = Some(row.query_field.clone()).filter(|f| !f.is_empty());
            if strategy.needs_query_field() && query_field.is_none() {
                return Err(RouteCardError::config(format!(
                    "{}: strategy '{}' requires a Query_Field",
                    row.item, strategy
                )));
            }

            checks.push(CheckDefinition {
                label: row.item.clone(),
                strategy,
                layers,
                query_values: row
                    .query_values
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
                query_field,
                buffer_meters: row.buffer_distance.parse::<f64>().unwrap_or(0.0),
                canned_statement,
                definition_query: Some(row.definition_query.clone()).filter(|q| !q.is_empty()),
                sensitive: row.sensitive_info == "Y",
            });
        }
        info!("{} checks apply at {}", checks.len(), location);
        Ok(checks)
    }
}

fn is_row_id(header: &str) -> bool {
    matches!(header.to_ascii_uppercase().as_str(), "OBJECTID" | "OID" | "FID")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = "\
OBJECTID,Item,Processing,Layer_List,Query_Values,Query_Field,CannedStatement,BufferDistance,Sensitive_Info,Definition_Query,Okanagan,Kootenay
1,Wildlife,title,,,,,,,,1,1
2,Parks,special_processing,Parks:Name=PROTECTED_LANDS_NAME,,,Overlaps a park.//Near a park.,50,,,1,0
3,Flammulated Owl,BEC,BEC Zones,\"PPxh1,IDFxh*\",BGC_LABEL,Consider owl habitat.,,,,2,1
4,Consultative Areas,special_processing,Consultative Areas,,,Contact the organisation.,100,Y,,1,1
5,Riparian,contains_overlap_layers,Streams:STREAM_NAME;Lakes:Name=GNIS_NAME,,,,abc,,\"STATUS = 'Active'\",1,1
6,Mystery,highestvalue,Streams,,,,,,,1,1
";

    #[test]
    fn test_layer_ref_parsing() {
        let layer = LayerRef::parse("Lakes:Name=GNIS_NAME,AREA_HA").unwrap();
        assert_eq!(layer.name, "Lakes");
        assert_eq!(layer.fields[0].label, "Name");
        assert_eq!(layer.fields[0].field, "GNIS_NAME");
        assert_eq!(layer.fields[1].label, "AREA_HA");
        assert!(LayerRef::parse("  ").is_none());
        assert!(LayerRef::parse("BEC Zones").unwrap().fields.is_empty());
    }

    #[test]
    fn test_for_location_keeps_order_and_filters() {
        let table = CatalogueTable::from_csv_str(CATALOGUE).unwrap();
        assert_eq!(table.location_columns(), &["Okanagan".to_string(), "Kootenay".to_string()]);

        let checks = table.for_location("Okanagan", &BTreeSet::new()).unwrap();
        let labels: Vec<&str> = checks.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Wildlife", "Parks", "Flammulated Owl", "Consultative Areas", "Riparian", "Mystery"]
        );
        assert_eq!(checks[1].buffer_meters, 50.0);
        assert_eq!(checks[2].query_values, vec!["PPxh1", "IDFxh*"]);
        assert!(checks[3].sensitive);
        assert_eq!(checks[4].layers.len(), 2);
        assert_eq!(checks[4].buffer_meters, 0.0);
        assert_eq!(checks[4].definition_query.as_deref(), Some("STATUS = 'Active'"));
        assert_eq!(checks[5].strategy, Strategy::Unsupported("highestvalue".into()));

        let kootenay = table.for_location("Kootenay", &BTreeSet::new()).unwrap();
        assert!(kootenay.iter().all(|c| c.label != "Parks"));
    }

    #[test]
    fn test_inaccessible_layer_forces_access_denied() {
        let table = CatalogueTable::from_csv_str(CATALOGUE).unwrap();
        let broken: BTreeSet<String> = ["Lakes".to_string()].into_iter().collect();
        let checks = table.for_location("Okanagan", &broken).unwrap();
        let riparian = checks.iter().find(|c| c.label == "Riparian").unwrap();
        assert_eq!(riparian.strategy, Strategy::AccessDenied);
        assert_eq!(riparian.canned_statement, ACCESS_DENIED_STATEMENT);
    }

    #[test]
    fn test_unknown_location_and_missing_layers_are_config_errors() {
        let table = CatalogueTable::from_csv_str(CATALOGUE).unwrap();
        assert!(table.for_location("Cariboo", &BTreeSet::new()).unwrap_err().is_config());

        let bad = "Item,Processing,Layer_List,Query_Values,Query_Field,CannedStatement,BufferDistance,Sensitive_Info,Definition_Query,Okanagan\n\
                   Parks,contains_overlap_layers,,,,,,,,1\n";
        let table = CatalogueTable::from_csv_str(bad).unwrap();
        assert!(table.for_location("Okanagan", &BTreeSet::new()).unwrap_err().is_config());

        assert!(CatalogueTable::from_csv_str("Item,Processing\nA,title\n").unwrap_err().is_config());
    }

    #[test]
    fn test_referenced_layers_are_distinct() {
        let table = CatalogueTable::from_csv_str(CATALOGUE).unwrap();
        let layers = table.referenced_layers("Okanagan").unwrap();
        assert_eq!(
            layers,
            vec!["Parks", "BEC Zones", "Consultative Areas", "Streams", "Lakes"]
        );
    }
}
