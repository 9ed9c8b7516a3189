use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::ReaderBuilder;
use log::debug;
use serde::Deserialize;

use crate::collect::global_variables::DEFAULT_OUTPUT_PATH;
use crate::error::{Result, RouteCardError};

const DEFAULT_ROAD_BUFFER: f64 = 10.0;
const DEFAULT_LEGAL_AREA_LAYER: &str = "LegalAreas";
const DEFAULT_LEGAL_AREA_FIELD: &str = "LegalArea";

/// Read a lookup table exported from the supporting geodatabase.
/// The exports are ISO-8859-1 encoded.
pub(crate) fn read_latin1<P: AsRef<Path>>(path: P) -> anyhow::Result<String> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let mut buffer = Vec::new();
    BufReader::new(file).read_to_end(&mut buffer)?;

    let encoding =
        encoding_rs::Encoding::for_label(b"ISO-8859-1").unwrap_or(encoding_rs::WINDOWS_1252);
    let (decoded, _, _) = encoding.decode(&buffer);
    Ok(decoded.into_owned())
}

#[derive(Debug, Deserialize)]
struct ControlRecord {
    #[serde(rename = "Script_Variable")]
    script_variable: String,
    #[serde(rename = "Variable_Value", default)]
    variable_value: Option<String>,
}

/// Typed view of the `LUT_ScriptControls` table
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptControls {
    /// Radius of the search buffer drawn around the subject (m)
    pub search_buffer_distance: f64,
    /// Margin added around the search buffer to form the analysis extent (m)
    pub extent_distance: f64,
    pub block_id_field: String,
    pub block_title_fields: Vec<String>,
    pub road_id_field: String,
    pub road_title_fields: Vec<String>,
    pub output_location: PathBuf,
    /// Road subjects are buffered by this distance and dissolved (m)
    pub road_buffer_distance: f64,
    pub legal_area_layer: String,
    pub legal_area_field: String,
    raw: BTreeMap<String, String>,
}

impl ScriptControls {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_latin1(path).map_err(|e| {
            RouteCardError::config(format!("Unable to read script controls {:?}: {:#}", path, e))
        })?;
        Self::from_csv_str(&content)
    }

    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut raw = BTreeMap::new();
        for result in rdr.deserialize() {
            let record: ControlRecord = result
                .map_err(|e| RouteCardError::config(format!("Malformed script control row: {}", e)))?;
            if record.script_variable.is_empty() {
                continue;
            }
            raw.insert(
                record.script_variable,
                record.variable_value.unwrap_or_default(),
            );
        }
        debug!("Read {} script control variables", raw.len());
        Self::from_map(raw)
    }

    pub fn from_map(raw: BTreeMap<String, String>) -> Result<Self> {
        let text = |key: &str| raw.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str| -> Result<Option<f64>> {
            match text(key) {
                Some(v) => v
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| RouteCardError::config(format!("{} is not a number: '{}'", key, v))),
                None => Ok(None),
            }
        };
        let list = |key: &str| -> Vec<String> {
            text(key)
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        let search_buffer_distance = number("SearchBufferDistance")?
            .ok_or_else(|| RouteCardError::config("SearchBufferDistance is not set"))?;
        let extent_distance = number("ExtentDistance")?
            .ok_or_else(|| RouteCardError::config("ExtentDistance is not set"))?;

        Ok(ScriptControls {
            search_buffer_distance,
            extent_distance,
            block_id_field: text("InputBlockField").unwrap_or_else(|| "CUTB_SEQ_NBR".to_string()),
            block_title_fields: list("InputBlockTitleFields"),
            road_id_field: text("InputRoadField").unwrap_or_else(|| "ROAD_SEQ_NBR".to_string()),
            road_title_fields: list("InputRoadTitleFields"),
            output_location: PathBuf::from(
                text("OutputLocation").unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
            ),
            road_buffer_distance: number("RoadBufferDistance")?.unwrap_or(DEFAULT_ROAD_BUFFER),
            legal_area_layer: text("LegalAreaLayer").unwrap_or_else(|| DEFAULT_LEGAL_AREA_LAYER.to_string()),
            legal_area_field: text("LegalAreaField").unwrap_or_else(|| DEFAULT_LEGAL_AREA_FIELD.to_string()),
            raw,
        })
    }

    /// Raw access to any variable of the table
    pub fn variable(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(|s| s.as_str())
    }
}
