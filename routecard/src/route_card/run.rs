//! Batch run controller: one fresh evaluation per subject feature

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use crate::collect::catalogue::{CatalogueTable, CheckDefinition};
use crate::collect::controls::{read_latin1, ScriptControls};
use crate::collect::global_variables::{KARST_TIERS, WATER_PURVEYOR_TIERS};
use crate::collect::provider::{FeatureRow, GeometryProvider};
use crate::collect::selection::LayerSelection;
use crate::error::{Result, RouteCardError};
use crate::geo_core::WORKING_EPSG;
use crate::geometric::subject::{Subject, SubjectKind};
use crate::route_card::applicability::RunResult;
use crate::route_card::context::RunContext;
use crate::route_card::evaluator;
use crate::route_card::report::{ReportSink, ReportStatus, RouteCardReport};

/// Smallest margin kept around the search buffer when selecting layers (m)
const MIN_EXTENT_MARGIN: f64 = 1000.0;

#[cfg(feature = "indicatif")]
fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Per-invocation choices made by the user
#[derive(Debug, Clone)]
pub struct RunParameters {
    pub kind: SubjectKind,
    pub status: ReportStatus,
    pub owner: String,
    /// Skips the legal-area lookup when set
    pub location: Option<String>,
    pub broken_layers: BTreeSet<String>,
    pub date: NaiveDate,
    pub show_progress: bool,
}

impl RunParameters {
    pub fn new(kind: SubjectKind) -> Self {
        RunParameters {
            kind,
            status: ReportStatus::Preliminary,
            owner: String::new(),
            location: None,
            broken_layers: BTreeSet::new(),
            date: Local::now().date_naive(),
            show_progress: false,
        }
    }

    /// One layer name per line; blank lines and `#` comments are ignored
    pub fn read_broken_layers<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
        let content = read_latin1(path.as_ref())
            .map_err(|e| RouteCardError::config(format!("broken layer list unreadable: {:#}", e)))?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }
}

/// What one subject produced
#[derive(Debug)]
pub struct CompletedCard {
    pub location: String,
    pub result: RunResult,
    pub report: RouteCardReport,
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct SubjectOutcome {
    pub subject: String,
    pub outcome: Result<CompletedCard>,
}

impl SubjectOutcome {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// A loaded catalogue and controls table, ready to evaluate subjects
#[derive(Debug, Clone)]
pub struct RouteCard {
    controls: ScriptControls,
    table: CatalogueTable,
    params: RunParameters,
    working_epsg: i32,
}

impl RouteCard {
    pub fn new(controls: ScriptControls, table: CatalogueTable, params: RunParameters) -> Self {
        RouteCard {
            controls,
            table,
            params,
            working_epsg: WORKING_EPSG,
        }
    }

    /// Load both lookup tables; any failure is a configuration error
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(controls: P, catalogue: Q, params: RunParameters) -> Result<Self> {
        let controls = ScriptControls::load(controls)?;
        let table = CatalogueTable::load(catalogue)?;
        Ok(Self::new(controls, table, params))
    }

    pub fn controls(&self) -> &ScriptControls {
        &self.controls
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    /// Evaluate every subject feature in order. A failing subject is
    /// reported in its outcome and does not stop the batch.
    pub fn run(
        &self,
        provider: &dyn GeometryProvider,
        subjects: &[FeatureRow],
        sinks: &[&dyn ReportSink],
    ) -> Result<Vec<SubjectOutcome>> {
        if subjects.iter().all(|row| row.shape.is_none()) {
            return Err(RouteCardError::NoSubject);
        }
        info!("Processing {} {} subject(s)", subjects.len(), self.params.kind);

        #[cfg(feature = "indicatif")]
        let progress = if self.params.show_progress {
            let pb = ProgressBar::new(subjects.len() as u64);
            pb.set_style(progress_style());
            Some(pb)
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(subjects.len());
        for row in subjects {
            if row.shape.is_none() {
                warn!("Subject feature {} has no geometry, skipped", row.fid);
                continue;
            }
            let name = format!("{} feature {}", self.params.kind, row.fid);
            let outcome = self.run_feature(provider, row, sinks);
            if let Err(e) = &outcome {
                error!("{}: {}", name, e);
            }
            outcomes.push(SubjectOutcome { subject: name, outcome });

            #[cfg(feature = "indicatif")]
            {
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
            }
        }

        #[cfg(feature = "indicatif")]
        {
            if let Some(pb) = progress {
                pb.finish_with_message("Route cards done");
            }
        }
        Ok(outcomes)
    }

    fn run_feature(
        &self,
        provider: &dyn GeometryProvider,
        row: &FeatureRow,
        sinks: &[&dyn ReportSink],
    ) -> Result<CompletedCard> {
        let subject = Subject::from_feature(row, self.params.kind, &self.controls)?;
        info!("Evaluating {}", subject.label());

        let location = match &self.params.location {
            Some(location) => location.clone(),
            None => subject.determine_legal_location(provider, &self.controls, self.working_epsg)?,
        };
        let result = self.evaluate_subject(provider, &subject, &location)?;

        let report = RouteCardReport::build(
            &subject,
            &location,
            &result,
            self.params.status,
            &self.params.owner,
            self.params.date,
        );
        let mut files = Vec::new();
        for sink in sinks {
            files.extend(sink.write(&report)?);
        }
        Ok(CompletedCard {
            location,
            result,
            report,
            files,
        })
    }

    /// Checks enabled at `location`, with unreachable layers marked as
    /// access denied
    pub fn checks_for(&self, provider: &dyn GeometryProvider, location: &str) -> Result<Vec<CheckDefinition>> {
        let mut inaccessible = self.params.broken_layers.clone();
        for layer in self.table.referenced_layers(location)? {
            if !provider.has_layer(&layer) && inaccessible.insert(layer.clone()) {
                warn!("Layer '{}' is not available, its checks are marked access denied", layer);
            }
        }
        self.table.for_location(location, &inaccessible)
    }

    /// Run the evaluator for one subject with a fresh context
    pub fn evaluate_subject(
        &self,
        provider: &dyn GeometryProvider,
        subject: &Subject,
        location: &str,
    ) -> Result<RunResult> {
        let checks = self.checks_for(provider, location)?;
        info!("{} checks enabled for {}", checks.len(), location);

        let selection = match subject.analysis_extent(extent_margin(&self.controls, &checks)) {
            Some(extent) => Some(LayerSelection::build(provider, &checks, &extent, self.working_epsg)?),
            None => {
                warn!("{} has an empty extent, layers are read whole", subject.label());
                None
            }
        };

        let mut ctx = RunContext::new(subject, location, provider, selection.as_ref(), self.working_epsg);
        evaluator::evaluate(&mut ctx, &checks)?;
        Ok(ctx.result)
    }
}

/// Margin around the search buffer large enough that no check can reach
/// a feature outside the selected extent
fn extent_margin(controls: &ScriptControls, checks: &[CheckDefinition]) -> f64 {
    checks
        .iter()
        .map(|c| c.buffer_meters)
        .chain(KARST_TIERS)
        .chain(WATER_PURVEYOR_TIERS)
        .fold(controls.extent_distance.max(MIN_EXTENT_MARGIN), f64::max)
}
