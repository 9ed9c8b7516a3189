//! Checks with bespoke logic, selected by their catalogue label

use std::collections::BTreeSet;

use log::{debug, warn};

use crate::collect::catalogue::{CheckDefinition, LayerRef};
use crate::collect::global_variables::{
    ADJACENT_HARVESTED_LABEL, ADJACENT_PLANNED_LABEL, BOUNDARY_NAME_FIELD, COMMUNITY_WATERSHEDS_LABEL,
    CONSULTATIVE_AREAS_LABEL, CONTACT_ORG_FIELD, CUTBLOCK_ID_FIELD, FISHERIES_WATERSHED_LABEL, GRIZZLY_LABEL,
    GRIZZLY_RMZ_LABEL, GRIZZLY_RMZ_LAYER, GRIZZLY_SUITABILITY_LAYER, HYDROLOGICAL_LABEL, INVASIVE_PLANTS_LABEL,
    MAP_LABEL_FIELD, MAX_CUTBLOCK_HECTARES, MAX_CUTBLOCK_LABEL, NET_AREA_FIELD, PARKS_LABEL, PHRASE_DELIMITER,
    PRIVATE_LAND_LABEL, PRODUCTIVE_UNIT_TYPE, RARE_ECOSYSTEMS_LABEL, STANDARD_UNIT_TYPE_FIELD, SUITABILITY_FIELD,
    WALK_IN_LAKES_LABEL,
};
use crate::commons::basic_functions::{format_attributes, format_one_decimal, push_unique, round_one_decimal};
use crate::error::Result;
use crate::geometric::subject::SubjectKind;
use crate::route_card::applicability::{ApplicabilityCode, CheckResult};
use crate::route_card::context::RunContext;
use crate::route_card::lookup::{invasive_plant_name, suitability_code, suitability_rank};
use crate::route_card::strategies::{attribute_text, check_range};

/// Dispatch a `special_processing` row by label
pub fn special_processing(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    match check.label.as_str() {
        ADJACENT_HARVESTED_LABEL | ADJACENT_PLANNED_LABEL => adjacent_cutblocks(ctx, check, layer),
        MAX_CUTBLOCK_LABEL => max_cutblock_size(ctx, check, layer),
        PRIVATE_LAND_LABEL | PARKS_LABEL | RARE_ECOSYSTEMS_LABEL => overlap_or_buffer(ctx, check, layer),
        WALK_IN_LAKES_LABEL => walk_in_lakes(ctx, check, layer),
        CONSULTATIVE_AREAS_LABEL => consultative_areas(ctx, check, layer),
        GRIZZLY_LABEL | GRIZZLY_RMZ_LABEL => grizzly_bear(ctx),
        INVASIVE_PLANTS_LABEL => invasive_plants(ctx, check, layer),
        other => {
            warn!("No special processing defined for '{}'", other);
            Ok(())
        }
    }
}

/// Dispatch a `special_processing_no_layer` row; these only read results
/// of checks evaluated before them
pub fn special_no_layer(ctx: &mut RunContext, check: &CheckDefinition) -> Result<()> {
    match check.label.as_str() {
        HYDROLOGICAL_LABEL => {
            let watershed_hit = [FISHERIES_WATERSHED_LABEL, COMMUNITY_WATERSHEDS_LABEL]
                .iter()
                .any(|label| ctx.result.code(label) == Some(ApplicabilityCode::Yes));
            if watershed_hit {
                ctx.result.escalate(HYDROLOGICAL_LABEL, ApplicabilityCode::Yes);
            }
        }
        other => warn!("No layer-less processing defined for '{}'", other),
    }
    Ok(())
}

/// First phrase for a direct overlap, second for a buffer-only match
fn split_phrases(canned: &str) -> (String, String) {
    let mut phrases = canned.split(PHRASE_DELIMITER);
    let overlap = phrases.next().unwrap_or_default().to_string();
    let buffer = phrases.next().map(str::to_string).unwrap_or_else(|| overlap.clone());
    (overlap, buffer)
}

fn adjacent_cutblocks(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    let rows = ctx.rows(&layer.name, &layer.field_names(), check.definition_query.as_deref())?;
    let parts = ctx.subject.parts();
    let buffers = ctx.subject.buffered_parts(check.buffer_meters)?;
    let mut attributes: Vec<String> = Vec::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        for (part, buffer) in parts.iter().zip(&buffers) {
            // The subject itself is usually part of the cutblock layer
            if shape.equals(part)? {
                continue;
            }
            if !shape.disjoint(buffer)? {
                ctx.result.escalate(label, ApplicabilityCode::Yes);
                let text = attribute_text(row);
                if !text.is_empty() {
                    push_unique(&mut attributes, text);
                }
            }
        }
    }
    ctx.result.push_statement(label, attributes.join(", "));
    Ok(())
}

fn max_cutblock_size(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    if ctx.subject.kind == SubjectKind::Road {
        warn!("{}: not implemented for road subjects", label);
        ctx.result.set_code(label, ApplicabilityCode::NotImplemented);
        return Ok(());
    }

    let fields = vec![
        CUTBLOCK_ID_FIELD.to_string(),
        NET_AREA_FIELD.to_string(),
        STANDARD_UNIT_TYPE_FIELD.to_string(),
    ];
    let mut net_area = 0.0;
    if ctx.subject.unique_id.is_some() {
        for row in ctx.rows(&layer.name, &fields, None)? {
            let same_block = row.value(0).and_then(|v| v.as_i64()) == ctx.subject.unique_id;
            let productive = row.value(2).and_then(|v| v.as_text()) == Some(PRODUCTIVE_UNIT_TYPE);
            if same_block && productive {
                net_area += row.value(1).and_then(|v| v.as_f64()).unwrap_or(0.0);
            }
        }
    }
    let net_area = round_one_decimal(net_area);

    let (code, statement) = if net_area != 0.0 {
        let code = if net_area > MAX_CUTBLOCK_HECTARES {
            ApplicabilityCode::Yes
        } else {
            ApplicabilityCode::No
        };
        (code, format!("NAR: {} ha.", format_one_decimal(net_area)))
    } else {
        let gross = round_one_decimal(ctx.subject.gross_area.unwrap_or(0.0));
        let code = if gross.trunc() > MAX_CUTBLOCK_HECTARES {
            ApplicabilityCode::Yes
        } else {
            ApplicabilityCode::No
        };
        (code, format!("Gross Area: {} ha.", format_one_decimal(gross)))
    };
    debug!("{}: {}", label, statement);
    ctx.result.set_code(label, code);
    ctx.result.set_statements(label, vec![statement]);
    Ok(())
}

/// Private land, parks and rare ecosystems: direct overlap first, then the
/// configured buffer
fn overlap_or_buffer(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    let (overlap_phrase, buffer_phrase) = split_phrases(&check.canned_statement);
    let rows = ctx.rows(&layer.name, &layer.field_names(), check.definition_query.as_deref())?;
    let mut attributes: Vec<String> = Vec::new();
    let mut matched = BTreeSet::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        if ctx.touches_subject(shape)? {
            ctx.result.escalate(label, ApplicabilityCode::Yes);
            matched.insert(row.fid);
            let text = format_attributes(row.values());
            if !text.is_empty() {
                push_unique(&mut attributes, text);
            }
        }
    }
    ctx.result.push_statement(label, attributes.join(", "));
    check_range(ctx, check, layer, &rows, &mut matched, check.buffer_meters)?;

    match ctx.result.code(label) {
        Some(ApplicabilityCode::Yes) => ctx.result.set_canned(label, overlap_phrase),
        Some(ApplicabilityCode::WithinDistance(_)) => {
            ctx.result.set_canned(label, buffer_phrase.clone());
            ctx.result.push_statement(label, buffer_phrase);
        }
        _ => {}
    }
    Ok(())
}

fn walk_in_lakes(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    let (overlap_phrase, _) = split_phrases(&check.canned_statement);
    let rows = ctx.rows(&layer.name, &layer.field_names(), check.definition_query.as_deref())?;
    let buffers = ctx.subject.buffered_parts(check.buffer_meters)?;
    let mut attributes: Vec<String> = Vec::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        if RunContext::touches_any(shape, &buffers)? {
            ctx.result.escalate(label, ApplicabilityCode::Yes);
            let text = format_attributes(row.values());
            if !text.is_empty() {
                push_unique(&mut attributes, text);
            }
        }
    }
    if ctx.result.code(label) == Some(ApplicabilityCode::Yes) {
        ctx.result.set_canned(label, overlap_phrase);
    }
    ctx.result.push_statement(label, attributes.join(", "));
    Ok(())
}

/// Every consultative boundary near the subject becomes its own sensitive row
fn consultative_areas(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    let fields = vec![BOUNDARY_NAME_FIELD.to_string(), CONTACT_ORG_FIELD.to_string()];
    let rows = ctx.rows(&layer.name, &fields, check.definition_query.as_deref())?;
    let buffers = ctx.subject.buffered_parts(check.buffer_meters)?;

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        if !RunContext::touches_any(shape, &buffers)? {
            continue;
        }
        let boundary = row.value(0).map(|v| v.to_string()).unwrap_or_default();
        let organisation = row.value(1).map(|v| v.to_string()).unwrap_or_default();
        let sub_label = if boundary == organisation {
            format!("    {}", boundary)
        } else {
            format!("    {}: {}", organisation, boundary)
        };
        ctx.result.escalate(label, ApplicabilityCode::Yes);
        if !ctx.result.contains(&sub_label) {
            ctx.result.insert(sub_label.clone(), CheckResult::new(ApplicabilityCode::Yes, ""));
        }
        ctx.result.mark_sensitive(&sub_label);
    }
    Ok(())
}

/// Habitat zone first; the suitability class is only looked at inside it
fn grizzly_bear(ctx: &mut RunContext) -> Result<()> {
    let mut in_zone = false;
    for row in ctx.rows(GRIZZLY_RMZ_LAYER, &[], None)? {
        let Some(shape) = &row.shape else {
            continue;
        };
        for part in ctx.subject.parts() {
            if shape.overlaps(part)? || shape.contains(part)? || part.contains(shape)? {
                in_zone = true;
            }
        }
    }
    if !in_zone {
        ctx.result.set_code(GRIZZLY_LABEL, ApplicabilityCode::No);
        return Ok(());
    }
    ctx.result.escalate(GRIZZLY_RMZ_LABEL, ApplicabilityCode::Yes);

    let mut best: Option<u8> = None;
    for row in ctx.rows(GRIZZLY_SUITABILITY_LAYER, &[SUITABILITY_FIELD.to_string()], None)? {
        let Some(shape) = &row.shape else {
            continue;
        };
        let mut intersects = false;
        for part in ctx.subject.parts() {
            if shape.intersects(part)? && !shape.touches(part)? {
                intersects = true;
            }
        }
        if !intersects {
            continue;
        }
        let class = row.value(0).map(|v| v.to_string()).unwrap_or_default();
        if let Some(rank) = suitability_rank(&class) {
            best = Some(best.map_or(rank, |b| b.min(rank)));
        }
    }

    match best.and_then(suitability_code) {
        Some(code) => {
            ctx.result.set_code(GRIZZLY_LABEL, ApplicabilityCode::Yes);
            ctx.result
                .set_statements(GRIZZLY_LABEL, vec![format!("Highest Ranking Value: {}", code)]);
        }
        None => ctx.result.set_code(GRIZZLY_LABEL, ApplicabilityCode::No),
    }
    Ok(())
}

fn invasive_plants(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    let rows = ctx.rows(&layer.name, &[MAP_LABEL_FIELD.to_string()], check.definition_query.as_deref())?;
    let mut species: Vec<String> = Vec::new();

    for row in &rows {
        let Some(shape) = &row.shape else {
            continue;
        };
        let mut hit = false;
        for part in ctx.subject.parts() {
            if shape.overlaps(part)? || shape.contains(part)? || part.contains(shape)? {
                hit = true;
            }
        }
        if !hit {
            continue;
        }
        ctx.result.escalate(label, ApplicabilityCode::Yes);
        let map_label = row.value(0).map(|v| v.to_string()).unwrap_or_default();
        for code in map_label.split_whitespace() {
            let name = match invasive_plant_name(code) {
                Some(name) => name.to_string(),
                None => {
                    warn!("{}: unknown map code '{}'", label, code);
                    code.to_string()
                }
            };
            push_unique(&mut species, name);
        }
    }
    ctx.result.push_statement(label, species.join(", "));

    let code = ctx.result.code(label).unwrap_or(ApplicabilityCode::No);
    if !code.is_resolved() && !code.is_within() && check.buffer_meters > 0.0 {
        let buffers = ctx.subject.buffered_parts(check.buffer_meters)?;
        for row in &rows {
            let Some(shape) = &row.shape else {
                continue;
            };
            if RunContext::touches_any(shape, &buffers)? {
                ctx.result.escalate(label, ApplicabilityCode::WithinDistance(check.buffer_meters));
                break;
            }
        }
    }
    Ok(())
}
