//! Dispatch loop: one pass over the catalogue checks for one subject

use log::{debug, error};

use crate::collect::catalogue::{CheckDefinition, LayerRef, Strategy};
use crate::collect::global_variables::ACCESS_LABEL;
use crate::error::{Result, RouteCardError};
use crate::route_card::aggregate::AccessRollup;
use crate::route_card::applicability::{ApplicabilityCode, CheckResult, RunResult};
use crate::route_card::context::RunContext;
use crate::route_card::{habitat, special, strategies};

/// Starting code of every check, in catalogue order. The access umbrella
/// always starts at `N`; only the roll-up raises it.
pub fn initial_result(checks: &[CheckDefinition]) -> RunResult {
    let mut result = RunResult::new();
    for check in checks {
        let code = match check.strategy {
            _ if check.label == ACCESS_LABEL => ApplicabilityCode::No,
            Strategy::Title => ApplicabilityCode::Header,
            Strategy::NonSpatial => ApplicabilityCode::NonSpatial,
            Strategy::AccessDenied => ApplicabilityCode::AccessDenied,
            _ => ApplicabilityCode::No,
        };
        result.insert(&check.label, CheckResult::new(code, check.canned_statement.clone()));
        if check.sensitive {
            result.mark_sensitive(&check.label);
        }
    }
    result
}

/// Evaluate every check against the context's subject, then apply the
/// access roll-up. The first failing check aborts the subject.
pub fn evaluate(ctx: &mut RunContext, checks: &[CheckDefinition]) -> Result<()> {
    ctx.result = initial_result(checks);
    let mut access = AccessRollup::new();

    for check in checks {
        evaluate_check(ctx, check)?;
        access.note_check(&mut ctx.result, &check.label);
    }
    access.note_bec_zones(&mut ctx.result);
    access.finish(&mut ctx.result);
    Ok(())
}

fn evaluate_check(ctx: &mut RunContext, check: &CheckDefinition) -> Result<()> {
    match &check.strategy {
        Strategy::Title | Strategy::NonSpatial | Strategy::AccessDenied | Strategy::Unsupported(_) => {
            return Ok(());
        }
        Strategy::Contained => {
            // Runs on the whole layer, excluded or not
            ctx.result.set_code(&check.label, ApplicabilityCode::Yes);
            for layer in &check.layers {
                strategies::contained(ctx, check, layer).map_err(|e| fail(check, &layer.name, e))?;
            }
            return Ok(());
        }
        _ => {}
    }

    if check.layers.is_empty() {
        return dispatch(ctx, check, None).map_err(|e| fail(check, "", e));
    }
    for layer in &check.layers {
        // An excluded layer still dispatches; its selected copy is empty
        if ctx.is_excluded(&layer.name) {
            debug!("{}: {} has no features near the subject", check.label, layer.name);
        }
        dispatch(ctx, check, Some(layer)).map_err(|e| fail(check, &layer.name, e))?;
    }
    Ok(())
}

fn dispatch(ctx: &mut RunContext, check: &CheckDefinition, layer: Option<&LayerRef>) -> Result<()> {
    debug!("{}: {} on {}", check.label, check.strategy, layer.map(|l| l.name.as_str()).unwrap_or("-"));
    let num_layers = check.layers.len();
    match (&check.strategy, layer) {
        (Strategy::DefaultToYes, _) => {
            ctx.result.escalate(&check.label, ApplicabilityCode::Yes);
            Ok(())
        }
        (Strategy::SpecialProcessingNoLayer, _) => special::special_no_layer(ctx, check),
        (Strategy::ContainsOverlap, Some(layer)) => strategies::contains_overlap(ctx, check, layer, num_layers, false),
        (Strategy::Somc, Some(layer)) => strategies::contains_overlap(ctx, check, layer, num_layers, true),
        (Strategy::PointLine, Some(layer)) => strategies::point_line(ctx, check, layer, num_layers),
        (Strategy::OverlapTouching, Some(layer)) => strategies::overlap_touching(ctx, check, layer),
        (Strategy::Bec, Some(layer)) => habitat::bec(ctx, check, layer),
        (Strategy::WildlifeHabitatAreas, Some(layer)) => habitat::wildlife_habitat_areas(ctx, check, layer),
        (Strategy::UngulateWinterRange, Some(layer)) => habitat::ungulate_winter_range(ctx, check, layer),
        (Strategy::SpecialProcessing, Some(layer)) => special::special_processing(ctx, check, layer),
        (strategy, _) => Err(RouteCardError::config(format!(
            "{}: strategy '{}' has no layer to evaluate",
            check.label, strategy
        ))),
    }
}

fn fail(check: &CheckDefinition, layer: &str, source: RouteCardError) -> RouteCardError {
    error!("Processing Failed: {}: {}", check.label, layer);
    RouteCardError::CheckFailed {
        label: check.label.clone(),
        layer: layer.to_string(),
        source: Box::new(source),
    }
}
