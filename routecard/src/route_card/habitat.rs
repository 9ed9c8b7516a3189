//! Strategies that scan a classification layer once per subject and then
//! answer every later check from the cached codes

use log::debug;

use crate::collect::catalogue::{CheckDefinition, LayerRef};
use crate::collect::global_variables::{
    BEC_APPLICABLE_PREFIX, BEC_HABITAT_PREFIX, BEC_NOT_APPLICABLE_PREFIX, SAPSUCKER_LABEL, SCREECH_OWL_LABEL,
    SUBTYPE_MARKER,
};
use crate::commons::basic_functions::push_unique;
use crate::error::{Result, RouteCardError};
use crate::route_card::applicability::ApplicabilityCode;
use crate::route_card::context::RunContext;

fn query_field(check: &CheckDefinition) -> Result<&str> {
    check
        .query_field
        .as_deref()
        .ok_or_else(|| RouteCardError::config(format!("{}: no Query_Field configured", check.label)))
}

/// Values of `fields` for every row of `layer` touching the subject
fn scan_touching(ctx: &RunContext, layer: &LayerRef, fields: &[String]) -> Result<Vec<Vec<String>>> {
    let mut hits = Vec::new();
    for row in ctx.rows(&layer.name, fields, None)? {
        let Some(shape) = &row.shape else {
            continue;
        };
        if ctx.touches_subject(shape)? {
            hits.push(row.values().iter().map(|v| v.to_string()).collect());
        }
    }
    Ok(hits)
}

/// `PPxh*` matches any variant of the subzone; other values match exactly
fn zone_matches(query: &str, zones: &[String]) -> bool {
    match query.strip_suffix('*') {
        Some(prefix) => zones.iter().any(|zone| zone.starts_with(prefix)),
        None => zones.iter().any(|zone| zone == query),
    }
}

/// Biogeoclimatic zone matching
pub fn bec(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    if ctx.bec_zones.is_none() {
        let field = query_field(check)?.to_string();
        let mut zones: Vec<String> = Vec::new();
        for values in scan_touching(ctx, layer, &[field])? {
            let zone: String = values.concat().chars().filter(|c| *c != ' ').collect();
            if !zone.is_empty() {
                push_unique(&mut zones, zone);
            }
        }
        debug!("BEC zones under the subject: {:?}", zones);
        ctx.result.existing_bec_zones = zones.clone();
        ctx.bec_zones = Some(zones);
    }
    let zones = ctx.bec_zones.as_deref().unwrap_or_default();

    let matched = check.query_values.iter().any(|q| zone_matches(q, zones));
    let canned = check.canned_statement.as_str();
    let sapsucker = label == SAPSUCKER_LABEL;

    if matched {
        ctx.result.escalate(label, ApplicabilityCode::BecApplicable);
        if !canned.is_empty() && !sapsucker {
            let prefix = if label == SCREECH_OWL_LABEL {
                BEC_APPLICABLE_PREFIX.to_string()
            } else {
                format!("{}{}", BEC_APPLICABLE_PREFIX, BEC_HABITAT_PREFIX)
            };
            ctx.result.set_canned(label, format!("{}{}", prefix, canned));
        }
    } else if !canned.is_empty() && ctx.result.code(label) == Some(ApplicabilityCode::No) {
        ctx.result.set_code(label, ApplicabilityCode::NotBecApplicable);
        let text = if sapsucker {
            String::new()
        } else {
            format!("{}{}", BEC_NOT_APPLICABLE_PREFIX, canned)
        };
        ctx.result.set_canned(label, text);
    }
    Ok(())
}

/// Wildlife habitat area codes
pub fn wildlife_habitat_areas(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    match &ctx.wha_codes {
        Some(codes) if codes.is_empty() => return Ok(()),
        Some(_) => {}
        None => {
            let field = query_field(check)?.to_string();
            let codes: Vec<String> = scan_touching(ctx, layer, &[field])?.into_iter().map(|v| v.concat()).collect();
            debug!("Wildlife habitat areas under the subject: {:?}", codes);
            ctx.wha_codes = Some(codes);
        }
    }
    let codes = ctx.wha_codes.clone().unwrap_or_default();

    let mut attributes: Vec<String> = Vec::new();
    for code in codes.iter().filter(|c| check.query_values.contains(c)) {
        ctx.result.escalate(label, ApplicabilityCode::Yes);
        push_unique(&mut attributes, code.clone());
    }
    ctx.result.push_statement(label, attributes.join(", "));
    Ok(())
}

/// Ungulate winter range units; the sub-types of the matching units
/// replace `##` in the canned statement
pub fn ungulate_winter_range(ctx: &mut RunContext, check: &CheckDefinition, layer: &LayerRef) -> Result<()> {
    let label = check.label.as_str();
    match &ctx.uwr_codes {
        Some(codes) if codes.is_empty() => return Ok(()),
        Some(_) => {}
        None => {
            let mut fields = vec![query_field(check)?.to_string()];
            fields.extend(layer.field_names().into_iter().take(1));
            let codes: Vec<(String, String)> = scan_touching(ctx, layer, &fields)?
                .into_iter()
                .map(|values| {
                    let mut values = values.into_iter();
                    let code = values.next().unwrap_or_default();
                    (code, values.next().unwrap_or_default())
                })
                .collect();
            debug!("Ungulate winter range units under the subject: {:?}", codes);
            ctx.uwr_codes = Some(codes);
        }
    }
    let codes = ctx.uwr_codes.clone().unwrap_or_default();

    let mut subtypes: Vec<String> = Vec::new();
    let mut matched = false;
    for (code, subtype) in codes.iter().filter(|(c, _)| check.query_values.contains(c)) {
        matched = true;
        if !subtype.is_empty() {
            push_unique(&mut subtypes, subtype.clone());
        }
        debug!("{}: matched unit {}", label, code);
    }
    if matched {
        ctx.result.escalate(label, ApplicabilityCode::Yes);
        let canned = ctx.result.canned(label).replace(SUBTYPE_MARKER, &subtypes.join(","));
        ctx.result.set_canned(label, canned);
    }
    Ok(())
}
