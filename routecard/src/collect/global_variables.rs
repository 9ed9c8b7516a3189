//! Fixed names and tables shared by the loader, the evaluator and the report

pub const DEFAULT_OUTPUT_PATH: &str = "./output";

/// Umbrella check raised by the constraint rules
pub const ACCESS_LABEL: &str = "Access Issues (page 6 - 17)";

/// Checks whose applicability raises the access umbrella; `BEC:` entries
/// match cached zone codes by prefix instead
pub const CONSTRAINT_LABELS: [&str; 9] = [
    "Grizzly Bear Habitat",
    "Mountain Caribou - Okanagan",
    "Mule Deer UWR",
    "Bighorn Sheep Areas",
    "Derenzy Sheep Areas",
    "Mtn Goat Habitat",
    "Community Watersheds",
    "BEC:PPxh",
    "BEC:IDFxh",
];

/// Evaluated even when the extent filter leaves it empty
pub const ALWAYS_EVALUATED_LAYER: &str = "BCTS SU";

pub const ACCESS_DENIED_STATEMENT: &str =
    "User does not have permissions to access this layer or this layer no longer exists";

pub const HYDROLOGICAL_LABEL: &str = "Hydrological";
pub const COMMUNITY_WATERSHEDS_LABEL: &str = "Community Watersheds";
pub const FISHERIES_WATERSHED_LABEL: &str = "Fisheries Sensitive Watershed";
pub const WATERSHED_LABELS: [&str; 2] = [COMMUNITY_WATERSHEDS_LABEL, FISHERIES_WATERSHED_LABEL];

pub const LAKESHORE_LABEL: &str = "Lakeshore Management Zones";
pub const VQO_LABEL: &str = "Visual Quality Objectives";
pub const MIGRATORY_BIRDS_LABEL: &str = "Migratory Birds";
pub const OLD_GROWTH_PREFIX: &str = "Old Growth Deferral";
pub const OLD_GROWTH_WARNING: &str = "TAP field verification and rationale required.  ";
pub const KARST_LABEL: &str = "Karst Potential";
pub const KARST_TIERS: [f64; 3] = [100.0, 200.0, 500.0];
pub const WATER_PURVEYOR_LABEL: &str = "Water Purveyor";
pub const WATER_PURVEYOR_TIERS: [f64; 3] = [100.0, 500.0, 1000.0];
pub const DIVERSION_LINES_LAYER: &str = "Points of Diversion - Lines";

pub const BEC_APPLICABLE_PREFIX: &str = "Occurs in this BEC Variant. ";
pub const BEC_HABITAT_PREFIX: &str = "Assess for suitable habitat: ";
pub const BEC_NOT_APPLICABLE_PREFIX: &str = "Not typically found in this BEC Variant. ";
pub const SCREECH_OWL_LABEL: &str = "Interior Western Screech-Owl";
pub const SAPSUCKER_LABEL: &str = "Williamsons Sapsucker (By BEC)";

pub const ADJACENT_HARVESTED_LABEL: &str =
    "Landscape Level Biodiversity: Adjacent to Another Harvested Cutblock (100m Buffer Analysis)";
pub const ADJACENT_PLANNED_LABEL: &str =
    "Landscape Level Biodiversity: Adjacent to Another Planned Cutblock (100m Buffer Analysis)";
pub const MAX_CUTBLOCK_LABEL: &str = "Landscape Level Biodiversity: Max Cutblock Size";
pub const MAX_CUTBLOCK_HECTARES: f64 = 40.0;
pub const PRIVATE_LAND_LABEL: &str = "Private Land";
pub const PARKS_LABEL: &str = "Parks";
pub const RARE_ECOSYSTEMS_LABEL: &str = "Rare Ecosystems";
pub const WALK_IN_LAKES_LABEL: &str = "Walk-in Lakes";
pub const CONSULTATIVE_AREAS_LABEL: &str = "Consultative Areas";
pub const GRIZZLY_LABEL: &str = "Grizzly Bear Habitat";
pub const GRIZZLY_RMZ_LABEL: &str = "Grizzly Bear Habitat RMZ";
pub const GRIZZLY_RMZ_LAYER: &str = "LRMP Grizzly Bear RMZ";
pub const GRIZZLY_SUITABILITY_LAYER: &str = "LRMP Grizzly Bear Suitability";
pub const INVASIVE_PLANTS_LABEL: &str = "Invasive Plants";

/// Separates the direct-overlap and buffer-only phrasings of a canned statement
pub const PHRASE_DELIMITER: &str = "//";
/// Marker replaced by the matched habitat names
pub const HABITAT_MARKER: &str = "[1]";
/// Marker replaced by the matched ungulate sub-types
pub const SUBTYPE_MARKER: &str = "##";

pub const OKANAGAN_LOCATION: &str = "Okanagan";
pub const ECA_REMINDER: &str = "Check most recent Landbase Reporting ECA analysis to evaluate risk";

/// Fields read by the bespoke checks
pub const CUTBLOCK_ID_FIELD: &str = "CUTB_SEQ_NBR";
pub const NET_AREA_FIELD: &str = "NAR";
pub const STANDARD_UNIT_TYPE_FIELD: &str = "SUTY_TYPE_ID";
pub const PRODUCTIVE_UNIT_TYPE: &str = "PROD";
pub const GROSS_AREA_FIELD: &str = "GROSS_AREA";
pub const BOUNDARY_NAME_FIELD: &str = "BOUNDARY_NAME";
pub const CONTACT_ORG_FIELD: &str = "CONTACT_ORG";
pub const SUITABILITY_FIELD: &str = "SUIT";
pub const MAP_LABEL_FIELD: &str = "MAP_LABEL";
