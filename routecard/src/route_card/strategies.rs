//! Generic overlap strategies shared by most catalogue rows

use std::collections::BTreeSet;

use crate::collect::catalogue::{CheckDefinition, LayerRef};
use crate::collect::global_variables::{
    DIVERSION_LINES_LAYER, HABITAT_MARKER, HYDROLOGICAL_LABEL, KARST_LABEL, KARST_TIERS, LAKESHORE_LABEL,
    MIGRATORY_BIRDS_LABEL, OLD_GROWTH_PREFIX, OLD_GROWTH_WARNING, VQO_LABEL, WATERSHED_LABELS,
    WATER_PURVEYOR_LABEL, WATER_PURVEYOR_TIERS,
};
use crate::collect::provider::FeatureRow;
use crate::commons::basic_functions::{fix_place_names, format_attributes, format_distance, human_join, push_unique};
use crate::error::Result;
use crate::route_card::applicability::ApplicabilityCode;
use crate::route_card::context::RunContext;

/// Attribute text of a matched row, place names corrected
pub(crate) fn attribute_text(row: &FeatureRow) -> String {
    fix_place_names(&format_attributes(row.values()))
}

fn layer_rows(ctx: &RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<Vec<FeatureRow>> {
    ctx.rows(&layer.name, &layer.field_names(), check.definition_query.as_deref())
}

fn layered_statement(layer: &LayerRef, num_layers: usize, attributes: &[String]) -> String {
    if num_layers > 1 {
        format!("{}: {}", layer.name, attributes.join(", "))
    } else {
        attributes.join(", ")
    }
}

/// Watershed checks also describe themselves under the Hydrological row
fn feed_hydrological(ctx: &mut RunContext, label: &str, statement: &str, located: bool) {
    if statement.is_empty() || !WATERSHED_LABELS.contains(&label) {
        return;
    }
    let Some(statements) = ctx.result.statements_mut(HYDROLOGICAL_LABEL) else {
        return;
    };
    if !located {
        statements.push(statement.to_string());
    } else if let Some(first) = statements.first_mut() {
        first.push_str(", ");
        first.push_str(statement);
    } else {
        statements.push(format!("Located within {}", statement));
    }
}

/// Direct overlap with any feature of the layer. Sets `Yes`, or `Somc`
/// for species-of-management-concern rows, then looks for near misses.
pub fn contains_overlap(
    ctx: &mut RunContext,
    check: &CheckDefinition,
    layer: &LayerRef,
    num_layers: usize,
    somc: bool,
) -> Result<()> {
    let label = check.label.as_str();
    let hit = if somc {
        ApplicabilityCode::Somc
    } else {
        ApplicabilityCode::Yes
    };
    let canned = ctx.result.canned(label).to_string();
    let collect_habitat = layer.fields.len() == 1 && canned.contains(HABITAT_MARKER);

    let rows = layer_rows(ctx, check, layer)?;
    let mut attributes: Vec<String> = Vec::new();
    let mut habitats: Vec<String> = Vec::new();
    let mut matched = BTreeSet::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        if !ctx.touches_subject(shape)? {
            continue;
        }
        ctx.result.escalate(label, hit);
        matched.insert(row.fid);

        if label == LAKESHORE_LABEL {
            for (spec, value) in layer.fields.iter().zip(row.values()) {
                push_unique(&mut attributes, format!("{} = {}", spec.label, value));
            }
        } else if collect_habitat {
            if let Some(value) = row.value(0) {
                push_unique(&mut habitats, value.to_string());
            }
        } else {
            let text = attribute_text(row);
            if !text.is_empty() {
                push_unique(&mut attributes, text);
            }
        }
    }

    let mut statement = String::new();
    if !attributes.is_empty() {
        if label == VQO_LABEL {
            statement.push_str("VQO = ");
        } else if label == MIGRATORY_BIRDS_LABEL {
            statement.push_str("Overlaps Habitat Rank:");
        }
        statement.push_str(&layered_statement(layer, num_layers, &attributes));
    }

    if label.starts_with(OLD_GROWTH_PREFIX)
        && ctx.result.code(label) == Some(ApplicabilityCode::Yes)
        && !canned.starts_with(OLD_GROWTH_WARNING)
    {
        ctx.result.set_canned(label, format!("{}{}", OLD_GROWTH_WARNING, canned));
    }
    if !habitats.is_empty() {
        let current = ctx.result.canned(label).to_string();
        ctx.result.set_canned(label, current.replace(HABITAT_MARKER, &human_join(&habitats)));
    }

    feed_hydrological(ctx, label, &statement, true);
    ctx.result.push_statement(label, statement);

    if label == KARST_LABEL {
        for tier in KARST_TIERS {
            check_range(ctx, check, layer, &rows, &mut matched, tier)?;
        }
    } else {
        check_range(ctx, check, layer, &rows, &mut matched, check.buffer_meters)?;
    }
    Ok(())
}

/// Point and line features: touching a boundary counts as a match
pub fn point_line(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef, num_layers: usize) -> Result<()> {
    let label = check.label.as_str();
    let rows = layer_rows(ctx, check, layer)?;
    let mut attributes: Vec<String> = Vec::new();
    let mut matched = BTreeSet::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        let mut hit = false;
        for part in ctx.subject.parts() {
            if part.contains(shape)? || part.touches(shape)? || shape.crosses(part)? || !shape.disjoint(part)? {
                hit = true;
                break;
            }
        }
        if !hit {
            continue;
        }
        ctx.result.escalate(label, ApplicabilityCode::Yes);
        matched.insert(row.fid);
        let text = attribute_text(row);
        if !text.is_empty() {
            push_unique(&mut attributes, text);
        }
    }

    if !attributes.is_empty() {
        ctx.result.push_statement(label, layered_statement(layer, num_layers, &attributes));
    }

    if label == WATER_PURVEYOR_LABEL {
        for tier in WATER_PURVEYOR_TIERS {
            if layer.name == DIVERSION_LINES_LAYER && tier > WATER_PURVEYOR_TIERS[0] {
                break;
            }
            check_range(ctx, check, layer, &rows, &mut matched, tier)?;
        }
    } else {
        check_range(ctx, check, layer, &rows, &mut matched, check.buffer_meters)?;
    }
    Ok(())
}

/// Overlap with the subject or with the subject buffered by the row's
/// distance; no separate near-miss pass
pub fn overlap_touching(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    let rows = layer_rows(ctx, check, layer)?;
    let buffers = ctx.subject.buffered_parts(check.buffer_meters)?;
    let mut attributes: Vec<String> = Vec::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        if ctx.touches_subject(shape)? || RunContext::touches_any(shape, &buffers)? {
            ctx.result.escalate(label, ApplicabilityCode::Yes);
            let text = attribute_text(row);
            if !text.is_empty() {
                push_unique(&mut attributes, text);
            }
        }
    }
    ctx.result.push_statement(label, attributes.join(", "));
    Ok(())
}

/// Downgrade to `No` when a feature of the whole layer contains the
/// subject. The caller sets `Yes` once before the first layer.
pub fn contained(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let rows = ctx.full_rows(&layer.name, &[], check.definition_query.as_deref())?;
    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        for part in ctx.subject.parts() {
            if shape.contains(part)? {
                ctx.result.set_code(&check.label, ApplicabilityCode::No);
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Near-miss search: rows not matched yet that reach the subject buffered
/// by `distance`. Escalates to `WithinDistance` unless the check is already
/// resolved or already within a (smaller) distance.
pub fn check_range(
    ctx: &mut RunContext,
    check: &CheckDefinition,
    layer: &LayerRef,
    rows: &[FeatureRow],
    matched: &mut BTreeSet<usize>,
    distance: f64,
) -> Result<()> {
    if distance <= 0.0 {
        return Ok(());
    }
    let label = check.label.as_str();
    let buffers = ctx.subject.buffered_parts(distance)?;
    let mut attributes: Vec<String> = Vec::new();
    let mut reached = false;

    for row in rows {
        if matched.contains(&row.fid) {
            continue;
        }
        let Some(shape) = &row.shape else {
            continue;
        };
        if !RunContext::touches_any(shape, &buffers)? {
            continue;
        }
        reached = true;
        ctx.result.escalate(label, ApplicabilityCode::WithinDistance(distance));
        matched.insert(row.fid);
        let text = attribute_text(row);
        if !text.is_empty() {
            push_unique(&mut attributes, text);
        }
    }
    if !reached {
        return Ok(());
    }

    let statement = if attributes.is_empty() {
        format!("Within {}m of {}", format_distance(distance), layer.name)
    } else {
        format!(
            "Within {}m of {}: {}",
            format_distance(distance),
            layer.name,
            attributes.join(", ")
        )
    };
    feed_hydrological(ctx, label, &statement, false);
    ctx.result.push_statement(label, statement);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::catalogue::Strategy;
    use crate::collect::global_variables::COMMUNITY_WATERSHEDS_LABEL;
    use crate::collect::provider::{FieldValue, LayerStore};
    use crate::route_card::applicability::CheckResult;
    use crate::route_card::test_support::{block_subject, check, layer, point, square};

    fn context<'a>(subject: &'a crate::geometric::subject::Subject, store: &'a LayerStore) -> RunContext<'a> {
        RunContext::new(subject, "Okanagan", store, None, crate::geo_core::WORKING_EPSG)
    }

    #[test]
    fn test_contains_overlap_collects_attributes_and_near_misses() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Lakes",
            &["GNIS_NAME", "AREA_HA"],
            vec![
                (square(50.0, 50.0, 100.0), vec![FieldValue::Text("Shaha Lake".into()), FieldValue::Real(12.0)]),
                (square(130.0, 0.0, 10.0), vec![FieldValue::Text("Pond".into()), FieldValue::Integer(1)]),
                (square(1000.0, 0.0, 10.0), vec![FieldValue::Text("Far".into()), FieldValue::Integer(2)]),
            ],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let mut def = check("Lakes", Strategy::ContainsOverlap, "Lakes:GNIS_NAME,AREA_HA", 50.0, "");
        def.definition_query = None;
        ctx.result.insert("Lakes", CheckResult::new(ApplicabilityCode::No, ""));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        let result = ctx.result.get("Lakes").unwrap();
        assert_eq!(result.code, ApplicabilityCode::Yes);
        assert_eq!(result.statements[0], "Skaha Lake (12.0)");
        assert_eq!(result.statements[1], "Within 50m of Lakes: Pond (1)");
        assert_eq!(result.statements.len(), 2);
    }

    #[test]
    fn test_habitat_marker_is_filled_in_canned_statement() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Habitat",
            &["HABITAT"],
            vec![
                (square(0.0, 0.0, 50.0), vec![FieldValue::Text("riparian".into())]),
                (square(50.0, 0.0, 50.0), vec![FieldValue::Text("grassland".into())]),
                (square(20.0, 20.0, 10.0), vec![FieldValue::Text("riparian".into())]),
            ],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check("Badger", Strategy::Somc, "Habitat:HABITAT", 0.0, "Assess [1] habitat.");
        ctx.result.insert("Badger", CheckResult::new(ApplicabilityCode::No, def.canned_statement.clone()));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, true).unwrap();
        let result = ctx.result.get("Badger").unwrap();
        assert_eq!(result.code, ApplicabilityCode::Somc);
        assert_eq!(result.canned_statement, "Assess riparian and grassland habitat.");
        assert!(result.statements.is_empty());
    }

    #[test]
    fn test_watershed_feeds_hydrological() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Community Watersheds",
            &["CW_NAME"],
            vec![
                (square(-10.0, -10.0, 500.0), vec![FieldValue::Text("Trout Creek".into())]),
                (square(160.0, 0.0, 10.0), vec![FieldValue::Text("Eneas Creek".into())]),
            ],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check(
            COMMUNITY_WATERSHEDS_LABEL,
            Strategy::ContainsOverlap,
            "Community Watersheds:CW_NAME",
            100.0,
            "",
        );
        ctx.result.insert(HYDROLOGICAL_LABEL, CheckResult::new(ApplicabilityCode::No, ""));
        ctx.result.insert(COMMUNITY_WATERSHEDS_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        let hydro = ctx.result.get(HYDROLOGICAL_LABEL).unwrap();
        assert_eq!(hydro.statements[0], "Located within Trout Creek");
        assert_eq!(hydro.statements[1], "Within 100m of Community Watersheds: Eneas Creek");
    }

    #[test]
    fn test_point_line_tiers_for_diversion_lines() {
        let mut store = LayerStore::new();
        store.insert(layer(
            DIVERSION_LINES_LAYER,
            &["POD_NUMBER"],
            vec![
                (point(150.0, 50.0), vec![FieldValue::Text("PD1".into())]),
                (point(400.0, 50.0), vec![FieldValue::Text("PD2".into())]),
            ],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let spec = format!("{}:POD_NUMBER", DIVERSION_LINES_LAYER);
        let def = check(WATER_PURVEYOR_LABEL, Strategy::PointLine, &spec, 0.0, "");
        ctx.result.insert(WATER_PURVEYOR_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        point_line(&mut ctx, &def, &def.layers[0], 1).unwrap();
        let result = ctx.result.get(WATER_PURVEYOR_LABEL).unwrap();
        assert_eq!(result.code, ApplicabilityCode::WithinDistance(100.0));
        assert_eq!(result.statements, vec![format!("Within 100m of {}: PD1", DIVERSION_LINES_LAYER)]);
    }

    #[test]
    fn test_karst_smallest_tier_wins() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Karst",
            &[],
            vec![(square(250.0, 0.0, 10.0), vec![]), (square(400.0, 0.0, 10.0), vec![])],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check(KARST_LABEL, Strategy::ContainsOverlap, "Karst", 0.0, "");
        ctx.result.insert(KARST_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        let result = ctx.result.get(KARST_LABEL).unwrap();
        assert_eq!(result.code, ApplicabilityCode::WithinDistance(200.0));
        assert_eq!(result.statements, vec!["Within 200m of Karst", "Within 500m of Karst"]);
    }

    #[test]
    fn test_overlap_touching_uses_buffer() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Trails",
            &["NAME"],
            vec![(square(120.0, 0.0, 10.0), vec![FieldValue::Text("Kettle Valley".into())])],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check("Trails", Strategy::OverlapTouching, "Trails:NAME", 25.0, "");
        ctx.result.insert("Trails", CheckResult::new(ApplicabilityCode::No, ""));

        overlap_touching(&mut ctx, &def, &def.layers[0]).unwrap();
        assert_eq!(ctx.result.code("Trails"), Some(ApplicabilityCode::Yes));
        assert_eq!(ctx.result.get("Trails").unwrap().statements, vec!["Kettle Valley"]);
    }

    #[test]
    fn test_contained_downgrades_when_swallowed() {
        let mut store = LayerStore::new();
        store.insert(layer("Range", &[], vec![(square(-100.0, -100.0, 1000.0), vec![])]));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check("Range Tenure", Strategy::Contained, "Range", 0.0, "");
        ctx.result.insert("Range Tenure", CheckResult::new(ApplicabilityCode::Yes, ""));

        contained(&mut ctx, &def, &def.layers[0]).unwrap();
        assert_eq!(ctx.result.code("Range Tenure"), Some(ApplicabilityCode::No));
    }

    #[test]
    fn test_lakeshore_zones_report_label_value_pairs() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Lakeshore Zones",
            &["LMZ_CLASS", "LAKE_NAME"],
            vec![(
                square(50.0, 50.0, 100.0),
                vec![FieldValue::Text("B".into()), FieldValue::Text("Okanagan Lake".into())],
            )],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check(
            LAKESHORE_LABEL,
            Strategy::ContainsOverlap,
            "Lakeshore Zones:Class=LMZ_CLASS,Lake=LAKE_NAME",
            0.0,
            "",
        );
        ctx.result.insert(LAKESHORE_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        let result = ctx.result.get(LAKESHORE_LABEL).unwrap();
        assert_eq!(result.code, ApplicabilityCode::Yes);
        assert_eq!(result.statements, vec!["Class = B, Lake = Okanagan Lake"]);
    }

    #[test]
    fn test_old_growth_warning_is_prefixed_once() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Old Growth",
            &["DEFERRAL_ID"],
            vec![(square(20.0, 20.0, 10.0), vec![FieldValue::Integer(17)])],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let label = "Old Growth Deferral Areas";
        let def = check(label, Strategy::ContainsOverlap, "Old Growth:DEFERRAL_ID", 0.0, "Confirm deferral status.");
        ctx.result.insert(label, CheckResult::new(ApplicabilityCode::No, def.canned_statement.clone()));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        assert_eq!(ctx.result.code(label), Some(ApplicabilityCode::Yes));
        assert_eq!(
            ctx.result.canned(label),
            format!("{}Confirm deferral status.", OLD_GROWTH_WARNING)
        );
    }

    #[test]
    fn test_old_growth_warning_needs_an_overlap() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Old Growth",
            &["DEFERRAL_ID"],
            vec![(square(900.0, 0.0, 10.0), vec![FieldValue::Integer(17)])],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let label = "Old Growth Deferral Areas";
        let def = check(label, Strategy::ContainsOverlap, "Old Growth:DEFERRAL_ID", 0.0, "Confirm deferral status.");
        ctx.result.insert(label, CheckResult::new(ApplicabilityCode::No, def.canned_statement.clone()));

        contains_overlap(&mut ctx, &def, &def.layers[0], 1, false).unwrap();
        assert_eq!(ctx.result.code(label), Some(ApplicabilityCode::No));
        assert_eq!(ctx.result.canned(label), "Confirm deferral status.");
    }

    #[test]
    fn test_vqo_and_migratory_bird_prefixes() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "VQO",
            &["EVQO_CODE"],
            vec![(square(10.0, 10.0, 20.0), vec![FieldValue::Text("PR".into())])],
        ));
        store.insert(layer(
            "Bird Habitat",
            &["HABITAT_RANK"],
            vec![(square(10.0, 10.0, 20.0), vec![FieldValue::Integer(2)])],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let vqo = check(VQO_LABEL, Strategy::ContainsOverlap, "VQO:EVQO_CODE", 0.0, "");
        let birds = check(MIGRATORY_BIRDS_LABEL, Strategy::ContainsOverlap, "Bird Habitat:HABITAT_RANK", 0.0, "");
        ctx.result.insert(VQO_LABEL, CheckResult::new(ApplicabilityCode::No, ""));
        ctx.result.insert(MIGRATORY_BIRDS_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        contains_overlap(&mut ctx, &vqo, &vqo.layers[0], 1, false).unwrap();
        contains_overlap(&mut ctx, &birds, &birds.layers[0], 1, false).unwrap();
        assert_eq!(ctx.result.get(VQO_LABEL).unwrap().statements, vec!["VQO = PR"]);
        assert_eq!(ctx.result.get(MIGRATORY_BIRDS_LABEL).unwrap().statements, vec!["Overlaps Habitat Rank:2"]);
    }

    #[test]
    fn test_vqo_prefix_needs_attributes() {
        let mut store = LayerStore::new();
        store.insert(layer("VQO", &["EVQO_CODE"], vec![(square(10.0, 10.0, 20.0), vec![FieldValue::Null])]));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let vqo = check(VQO_LABEL, Strategy::ContainsOverlap, "VQO:EVQO_CODE", 0.0, "");
        ctx.result.insert(VQO_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        contains_overlap(&mut ctx, &vqo, &vqo.layers[0], 1, false).unwrap();
        assert_eq!(ctx.result.code(VQO_LABEL), Some(ApplicabilityCode::Yes));
        assert!(ctx.result.get(VQO_LABEL).unwrap().statements.is_empty());
    }

    #[test]
    fn test_water_purveyor_runs_three_tiers_on_points() {
        let mut store = LayerStore::new();
        store.insert(layer(
            "Points of Diversion",
            &["POD_NUMBER"],
            vec![
                (point(160.0, 50.0), vec![FieldValue::Text("PD1".into())]),
                (point(400.0, 50.0), vec![FieldValue::Text("PD2".into())]),
                (point(900.0, 50.0), vec![FieldValue::Text("PD3".into())]),
                (point(3000.0, 50.0), vec![FieldValue::Text("PD4".into())]),
            ],
        ));
        let subject = block_subject(square(0.0, 0.0, 100.0));
        let mut ctx = context(&subject, &store);
        let def = check(WATER_PURVEYOR_LABEL, Strategy::PointLine, "Points of Diversion:POD_NUMBER", 0.0, "");
        ctx.result.insert(WATER_PURVEYOR_LABEL, CheckResult::new(ApplicabilityCode::No, ""));

        point_line(&mut ctx, &def, &def.layers[0], 1).unwrap();
        let result = ctx.result.get(WATER_PURVEYOR_LABEL).unwrap();
        assert_eq!(result.code, ApplicabilityCode::WithinDistance(100.0));
        assert_eq!(
            result.statements,
            vec![
                "Within 100m of Points of Diversion: PD1",
                "Within 500m of Points of Diversion: PD2",
                "Within 1000m of Points of Diversion: PD3",
            ]
        );
    }
}
