//! Route card report model and the sinks that write it

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use log::info;
#[cfg(feature = "polars")]
use polars::prelude::*;
use serde::Serialize;

use crate::collect::global_variables::{
    ACCESS_LABEL, ECA_REMINDER, HYDROLOGICAL_LABEL, MAX_CUTBLOCK_LABEL, OKANAGAN_LOCATION,
};
use crate::commons::basic_functions::{format_distance, natural_sort};
use crate::error::Result;
use crate::geometric::subject::{Subject, SubjectKind};
use crate::route_card::applicability::{ApplicabilityCode, CheckResult, RunResult};

pub const MAIN_SHEET: &str = "Route Card Tool Assessment";
pub const SENSITIVE_SHEET: &str = "Consultative Areas";

pub const OBJECTIVE: &str = "OBJECTIVE: Planning Route Card is a due diligence checklist for the Planning Forester to identify legal and non-legal commitments associated with proposed block/road development, to track completion of assessments/analyses, to identify roles and responsibilities, and provide a communication tools between the Planning Foresters, Practices Foresters, and layout contractors.";
pub const DISCLAIMER: &str = "The Planning Route Card (PRC) is a guidance tool listing constraints applicable at time of preparation.  The PRC does not prescribe management practices.  It is incumbent on the Site Plan author and signatory to ensure management practices and decisions are consistent with the intent of the applicable legislation, higher level plans, Forest Stewardship Plan, Statutory Decision Maker direction, best management practices, and general wildlife measures outlined in GAR Orders. The content of the PRC alone cannot be used for justification of, or as a rationale for management decisions contained in any professional documents.";
pub const MAP_ATTACHMENT: &str =
    "Attach 1:10,000 letter size map showing block with overlaps and forward to Practices Forester";

const HIGHEST_RANKING_MARKER: &str = "Highest Ranking Value";

/// Emphasis a renderer applies to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowStyle {
    Header,
    /// Applicable
    Red,
    Black,
    /// BEC applicable or species of management concern
    Blue,
    /// Near miss
    Orange,
    RedBold,
    Grey,
}

impl fmt::Display for RowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowStyle::Header => "header",
            RowStyle::Red => "red",
            RowStyle::Black => "black",
            RowStyle::Blue => "blue",
            RowStyle::Orange => "orange",
            RowStyle::RedBold => "red-bold",
            RowStyle::Grey => "grey",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub applicable: String,
    pub additional_assessment: String,
    pub comments: Vec<String>,
    pub style: RowStyle,
}

impl ReportRow {
    /// Comments as one cell, one per line
    pub fn comment_text(&self) -> String {
        self.comments.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportStatus {
    Final,
    Preliminary,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Final => write!(f, "Final"),
            ReportStatus::Preliminary => write!(f, "Preliminary"),
        }
    }
}

/// Everything a renderer needs for one subject's route card
#[derive(Debug, Clone, Serialize)]
pub struct RouteCardReport {
    pub title: String,
    pub heading: String,
    pub subject_title: Vec<(String, String)>,
    pub legal_location: String,
    pub status: ReportStatus,
    pub owner: String,
    pub date: NaiveDate,
    pub bec_zones: String,
    pub main: Vec<ReportRow>,
    pub sensitive: Vec<ReportRow>,
}

impl RouteCardReport {
    pub fn build(
        subject: &Subject,
        location: &str,
        result: &RunResult,
        status: ReportStatus,
        owner: &str,
        date: NaiveDate,
    ) -> Self {
        let (main, sensitive) = result.partition();
        let to_rows = |entries: Vec<(&str, &CheckResult)>| -> Vec<ReportRow> {
            entries
                .into_iter()
                .map(|(label, check)| report_row(label, check, location, subject.kind))
                .collect()
        };

        RouteCardReport {
            title: format!("FRPA Planning Route Card - {}", location),
            heading: subject
                .title
                .iter()
                .map(|(_, value)| value.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            subject_title: subject.title.clone(),
            legal_location: location.to_string(),
            status,
            owner: owner.to_string(),
            date,
            bec_zones: result.existing_bec_zones.join(", "),
            main: to_rows(main),
            sensitive: to_rows(sensitive),
        }
    }

    /// Title values each followed by `_`, cleaned of `.0` and path
    /// separators, then the status
    pub fn output_stem(&self) -> String {
        let mut name = String::new();
        for (_, value) in &self.subject_title {
            name.push_str(value);
            name.push('_');
        }
        let name = name.replace(".0", "").replace(['\\', '/'], "");
        format!("{}{}", name, self.status)
    }

    pub fn date_text(&self) -> String {
        self.date.format("%B %d, %Y").to_string()
    }

    /// Convert the main sheet to a Polars DataFrame
    #[cfg(feature = "polars")]
    pub fn to_polars_df(&self) -> anyhow::Result<DataFrame> {
        let mut label_vec: Vec<String> = Vec::new();
        let mut applicable_vec: Vec<String> = Vec::new();
        let mut additional_vec: Vec<String> = Vec::new();
        let mut comments_vec: Vec<String> = Vec::new();
        let mut style_vec: Vec<String> = Vec::new();

        for row in &self.main {
            label_vec.push(row.label.clone());
            applicable_vec.push(row.applicable.clone());
            additional_vec.push(row.additional_assessment.clone());
            comments_vec.push(row.comment_text());
            style_vec.push(row.style.to_string());
        }

        let df = df! [
            "item" => label_vec,
            "applicable" => applicable_vec,
            "additional_assessment" => additional_vec,
            "comments" => comments_vec,
            "style" => style_vec,
        ]
        .context("Failed to create DataFrame")?;

        Ok(df)
    }
}

/// Deduplicated, naturally sorted, empties dropped
fn sorted_statements(statements: &[String]) -> Vec<String> {
    let mut values: Vec<String> = statements.iter().filter(|s| !s.is_empty()).cloned().collect();
    values.sort();
    values.dedup();
    natural_sort(&mut values);
    values
}

fn report_row(label: &str, check: &CheckResult, location: &str, kind: SubjectKind) -> ReportRow {
    use ApplicabilityCode::*;

    let code = check.code;
    let is_access = label == ACCESS_LABEL;
    let mut comments: Vec<String> = Vec::new();

    let shows_canned = !matches!(
        code,
        Header | NonSpatial | No | NotBecApplicable | WithinDistance(_) | NotImplemented
    );
    if shows_canned && !is_access && !check.canned_statement.is_empty() {
        comments.push(check.canned_statement.clone());
    }

    match code {
        Yes | BecApplicable | Somc | AccessDenied => {
            let verbatim = is_access
                || label == MAX_CUTBLOCK_LABEL
                || check.statements.iter().any(|s| s.contains(HIGHEST_RANKING_MARKER));
            if verbatim {
                comments.extend(check.statements.iter().cloned());
            } else {
                comments.extend(sorted_statements(&check.statements));
            }
        }
        WithinDistance(_) => comments.extend(sorted_statements(&check.statements)),
        _ => {}
    }

    let (applicable, additional, style) = match code {
        Header => {
            comments = vec!["Comments".to_string()];
            (
                "Applicable (Y/N)".to_string(),
                "Additional Assessments Needed (Y/N)".to_string(),
                RowStyle::Header,
            )
        }
        Yes => {
            if is_access && !check.canned_statement.is_empty() {
                comments.push(check.canned_statement.clone());
            }
            (code.to_string(), String::new(), RowStyle::Red)
        }
        No => {
            if label == HYDROLOGICAL_LABEL && location == OKANAGAN_LOCATION {
                comments.push(ECA_REMINDER.to_string());
            }
            if label == MAX_CUTBLOCK_LABEL {
                comments.extend(check.statements.iter().cloned());
            }
            (code.to_string(), String::new(), RowStyle::Black)
        }
        NotBecApplicable => {
            if !check.canned_statement.is_empty() {
                comments.push(check.canned_statement.clone());
            }
            ("N".to_string(), String::new(), RowStyle::Black)
        }
        NonSpatial => (code.to_string(), String::new(), RowStyle::Black),
        BecApplicable | Somc => ("BEC Applicable".to_string(), String::new(), RowStyle::Blue),
        WithinDistance(d) => (
            format!("Within {}m of {}", format_distance(d), kind),
            String::new(),
            RowStyle::Orange,
        ),
        AccessDenied => (code.to_string(), String::new(), RowStyle::RedBold),
        NotImplemented => (code.to_string(), String::new(), RowStyle::Grey),
    };
    comments.retain(|c| !c.is_empty());

    ReportRow {
        label: label.to_string(),
        applicable,
        additional_assessment: additional,
        comments,
        style,
    }
}

/// Destination of a finished report
pub trait ReportSink {
    /// Write the report, returning the files produced
    fn write(&self, report: &RouteCardReport) -> Result<Vec<PathBuf>>;
}

fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))
}

/// One CSV file per sheet
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    output_dir: PathBuf,
}

impl CsvReportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        CsvReportWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    fn write_sheet(&self, path: &Path, report: &RouteCardReport, rows: &[ReportRow]) -> anyhow::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to create report file: {:?}", path))?;

        writer.write_record([report.title.as_str()])?;
        writer.write_record([report.heading.as_str()])?;
        writer.write_record([OBJECTIVE])?;
        writer.write_record(["Biogeoclimatic Zone", report.bec_zones.as_str()])?;
        for row in rows {
            writer.write_record([
                row.label.as_str(),
                row.applicable.as_str(),
                row.additional_assessment.as_str(),
                row.comment_text().as_str(),
            ])?;
        }
        writer.write_record([DISCLAIMER])?;
        let prepared_by = format!("Prepared By:  {}", report.owner);
        let date = format!("Date:  {}", report.date_text());
        writer.write_record(["Planning Forester Signoff", prepared_by.as_str(), date.as_str()])?;
        writer.write_record([MAP_ATTACHMENT])?;
        writer.flush().with_context(|| format!("Failed to write report file: {:?}", path))?;
        Ok(())
    }
}

impl ReportSink for CsvReportWriter {
    fn write(&self, report: &RouteCardReport) -> Result<Vec<PathBuf>> {
        ensure_dir(&self.output_dir)?;
        let stem = report.output_stem();
        let main = self.output_dir.join(format!("{}_RouteCard.csv", stem));
        let sensitive = self
            .output_dir
            .join(format!("{}_RouteCard_{}.csv", stem, SENSITIVE_SHEET.replace(' ', "_")));

        self.write_sheet(&main, report, &report.main)?;
        self.write_sheet(&sensitive, report, &report.sensitive)?;
        info!("Route card written to {:?}", main);
        Ok(vec![main, sensitive])
    }
}

/// The whole report as one JSON document
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    output_dir: PathBuf,
}

impl JsonReportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        JsonReportWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }
}

impl ReportSink for JsonReportWriter {
    fn write(&self, report: &RouteCardReport) -> Result<Vec<PathBuf>> {
        ensure_dir(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}_RouteCard.json", report.output_stem()));
        let content = serde_json::to_string_pretty(report).context("Failed to serialize route card")?;
        fs::write(&path, content).with_context(|| format!("Failed to write report file: {:?}", path))?;
        info!("Route card written to {:?}", path);
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route_card::test_support::{block_subject, square};

    fn sample_result() -> RunResult {
        let mut result = RunResult::new();
        result.insert("Wildlife", CheckResult::new(ApplicabilityCode::Header, ""));
        let mut parks = CheckResult::new(ApplicabilityCode::Yes, "Overlaps a park.");
        parks.statements = vec!["Block 10".into(), "Block 2".into(), "Block 1".into(), "Block 2".into()];
        result.insert("Parks", parks);
        let mut karst = CheckResult::new(ApplicabilityCode::WithinDistance(200.0), "Karst canned");
        karst.statements = vec!["Within 200m of Karst".into()];
        result.insert("Karst Potential", karst);
        result.insert(HYDROLOGICAL_LABEL, CheckResult::new(ApplicabilityCode::No, "Hydro canned"));
        result.insert("Owl", CheckResult::new(ApplicabilityCode::NotBecApplicable, "Not typically found here."));
        result.insert("Snail", CheckResult::new(ApplicabilityCode::Somc, "Assess habitat."));
        let mut access = CheckResult::new(ApplicabilityCode::Yes, "Plan access.");
        access.statements = vec!["Mule Deer UWR, BEC PPxh1".into()];
        result.insert(ACCESS_LABEL, access);
        result.insert("    ONA: Area 7", CheckResult::new(ApplicabilityCode::Yes, ""));
        result.mark_sensitive("    ONA: Area 7");
        result.existing_bec_zones = vec!["PPxh1".into(), "IDFxh2".into()];
        result
    }

    fn sample_report() -> RouteCardReport {
        let subject = block_subject(square(0.0, 0.0, 10.0));
        RouteCardReport::build(
            &subject,
            "Okanagan",
            &sample_result(),
            ReportStatus::Preliminary,
            "J. Smith",
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        )
    }

    fn row<'a>(report: &'a RouteCardReport, label: &str) -> &'a ReportRow {
        report.main.iter().find(|r| r.label == label).unwrap()
    }

    #[test]
    fn test_report_rows_follow_display_rules() {
        let report = sample_report();
        assert_eq!(report.title, "FRPA Planning Route Card - Okanagan");
        assert_eq!(report.bec_zones, "PPxh1, IDFxh2");
        assert_eq!(report.main.len(), 7);
        assert_eq!(report.sensitive.len(), 1);

        let header = row(&report, "Wildlife");
        assert_eq!(header.applicable, "Applicable (Y/N)");
        assert_eq!(header.style, RowStyle::Header);

        let parks = row(&report, "Parks");
        assert_eq!(parks.applicable, "Y");
        assert_eq!(parks.comments, vec!["Overlaps a park.", "Block 1", "Block 2", "Block 10"]);

        let karst = row(&report, "Karst Potential");
        assert_eq!(karst.applicable, "Within 200m of Block");
        assert_eq!(karst.comments, vec!["Within 200m of Karst"]);
        assert_eq!(karst.style, RowStyle::Orange);

        assert_eq!(row(&report, HYDROLOGICAL_LABEL).comments, vec![ECA_REMINDER]);
        assert_eq!(row(&report, "Owl").applicable, "N");
        assert_eq!(row(&report, "Owl").comments, vec!["Not typically found here."]);
        assert_eq!(row(&report, "Snail").applicable, "BEC Applicable");

        let access = row(&report, ACCESS_LABEL);
        assert_eq!(access.comments, vec!["Mule Deer UWR, BEC PPxh1", "Plan access."]);
    }

    #[test]
    fn test_output_stem_and_date() {
        let report = sample_report();
        assert_eq!(report.output_stem(), "A12345_Preliminary");
        assert_eq!(report.date_text(), "March 05, 2024");
        assert_eq!(report.heading, "A12345");
    }

    #[test]
    fn test_csv_and_json_sinks_write_files() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();

        let written = CsvReportWriter::new(dir.path()).write(&report).unwrap();
        assert_eq!(written.len(), 2);
        let main = fs::read_to_string(&written[0]).unwrap();
        assert!(main.contains("FRPA Planning Route Card - Okanagan"));
        assert!(main.contains("Prepared By:  J. Smith"));
        let sensitive = fs::read_to_string(&written[1]).unwrap();
        assert!(sensitive.contains("ONA: Area 7"));
        assert!(!sensitive.contains("Overlaps a park."));

        let written = JsonReportWriter::new(dir.path()).write(&report).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(json["legal_location"], "Okanagan");
        assert_eq!(json["status"], "Preliminary");
    }

    #[cfg(feature = "polars")]
    #[test]
    fn test_to_polars_df() {
        let df = sample_report().to_polars_df().unwrap();
        assert_eq!(df.height(), 7);
        assert_eq!(df.width(), 5);
    }
}
