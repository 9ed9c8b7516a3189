use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use routecard::collect::provider::{LayerStore, MemoryLayer};
use routecard::commons::basic_functions::format_elapsed;
use routecard::geo_core::WORKING_EPSG;
use routecard::geometric::subject::SubjectKind;
use routecard::route_card::{CsvReportWriter, JsonReportWriter, ReportSink, ReportStatus, RouteCard, RunParameters};
use routecard::{Result, RouteCardError};

/// Exit status of a run stopped by a configuration problem
const CONFIG_EXIT_CODE: u8 = 100;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
    Both,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Prepare FRPA planning route cards for blocks or roads
#[derive(Debug, Parser)]
#[command(name = "routecard", version)]
struct Cli {
    /// Subject kind: block or road
    #[arg(long, default_value = "block")]
    kind: SubjectKind,

    /// LUT_ScriptControls export (CSV)
    #[arg(long)]
    controls: PathBuf,

    /// LUT_Processing export (CSV)
    #[arg(long)]
    catalogue: PathBuf,

    /// Directory of reference layers, one GeoJSON file per layer
    #[arg(long)]
    layers: PathBuf,

    /// GeoJSON file holding the selected blocks or roads
    #[arg(long)]
    subjects: PathBuf,

    /// Mark the route card as final instead of preliminary
    #[arg(long = "final")]
    final_card: bool,

    #[arg(long, default_value = "")]
    owner: String,

    /// Legal location to use instead of looking it up
    #[arg(long)]
    location: Option<String>,

    /// File listing layers the user cannot access, one per line
    #[arg(long)]
    broken_layers: Option<PathBuf>,

    /// Output directory; defaults to OutputLocation of the controls table
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Both)]
    format: OutputFormat,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Show a progress bar over the subjects
    #[arg(long)]
    progress: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = SimpleLogger::new().with_level(cli.log_level.into()).init() {
        eprintln!("Failed to initialise logging: {}", e);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) if e.is_config() => {
            error!("{}", e);
            ExitCode::from(CONFIG_EXIT_CODE)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let start = Instant::now();

    let mut params = RunParameters::new(cli.kind);
    params.status = if cli.final_card {
        ReportStatus::Final
    } else {
        ReportStatus::Preliminary
    };
    params.owner = cli.owner;
    params.location = cli.location;
    params.show_progress = cli.progress;
    if let Some(path) = &cli.broken_layers {
        params.broken_layers = RunParameters::read_broken_layers(path)?;
    }

    let card = RouteCard::load(&cli.controls, &cli.catalogue, params)?;
    let provider = LayerStore::from_geojson_dir(&cli.layers)
        .map_err(|e| RouteCardError::config(format!("reference layers unreadable: {}", e)))?;

    let subjects = MemoryLayer::from_geojson_file("subjects", &cli.subjects, WORKING_EPSG)
        .map_err(|e| RouteCardError::config(format!("subject input unreadable: {}", e)))?;
    let subjects = if subjects.epsg() != WORKING_EPSG {
        subjects.reprojected(WORKING_EPSG)?
    } else {
        subjects
    };
    let rows = subjects.rows(&[], None)?;

    let output = cli.output.unwrap_or_else(|| card.controls().output_location.clone());
    let csv = CsvReportWriter::new(&output);
    let json = JsonReportWriter::new(&output);
    let sinks: Vec<&dyn ReportSink> = match cli.format {
        OutputFormat::Csv => vec![&csv],
        OutputFormat::Json => vec![&json],
        OutputFormat::Both => vec![&csv, &json],
    };

    let outcomes = card.run(&provider, &rows, &sinks)?;
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        "{} route card(s) completed, {} failed, in {}",
        outcomes.len() - failed,
        failed,
        format_elapsed(start.elapsed())
    );

    Ok(if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
