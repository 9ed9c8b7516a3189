pub mod aggregate;
pub mod applicability;
pub mod context;
pub mod evaluator;
pub mod habitat;
pub mod lookup;
pub mod report;
pub mod run;
pub mod special;
pub mod strategies;

#[cfg(test)]
mod test_support;

pub use applicability::{ApplicabilityCode, CheckResult, RunResult};
pub use report::{CsvReportWriter, JsonReportWriter, ReportSink, ReportStatus, RouteCardReport};
pub use run::{RouteCard, RunParameters, SubjectOutcome};
