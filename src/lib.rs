pub mod builder;
pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod rdf;
pub mod uri;
pub mod utils;
pub mod validation;
pub mod workbook;

pub use builder::{BuildOptions, build, build_with};
pub use config::{AppConfig, CliArgs, ConvertConfig, ReportFormat, ValidateConfig};
pub use error::{ErrorCode, ImportError, ImportResult};
pub use import::{DirectoryImporter, GraphImporter, ImportReceipt};
pub use logging::{LoggingConfig, init_logging};
pub use model::{EntityGraph, SheetKind};
pub use pipeline::{ConvertOutcome, FacilityAnchor, ImportPipeline, PipelineOptions};
pub use rdf::{RdfOutputFormat, TripleDocument, TripleSet, compile, serialize};
pub use uri::url_safe;
pub use validation::{CellRef, ValidationOutcome, ValidationReport, ViolationCategory, validate};

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;

/// Whether a run found problems the caller should see in the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    Problems,
}

pub async fn run(config: AppConfig) -> Result<RunStatus> {
    match config {
        AppConfig::Validate(config) => run_validate(config).await,
        AppConfig::Convert(config) => run_convert(config).await,
    }
}

async fn run_validate(config: ValidateConfig) -> Result<RunStatus> {
    let span = logging::workbook_span(&config.file.display().to_string());
    let bytes = read_workbook(&config.file).instrument(span.clone()).await?;
    let outcome = tokio::task::spawn_blocking(move || validate(&bytes))
        .instrument(span.clone())
        .await
        .context("validation task panicked")??;

    println!("{}", render_report(&outcome.report, config.report_format)?);

    if !outcome.has_errors {
        return Ok(RunStatus::Clean);
    }

    import::write_atomic(&config.annotated_out, &outcome.annotated)
        .instrument(span)
        .await
        .with_context(|| format!("failed to write annotated workbook {:?}", config.annotated_out))?;
    tracing::info!(
        path = %config.annotated_out.display(),
        violations = outcome.report.len(),
        "annotated workbook written"
    );
    Ok(RunStatus::Problems)
}

/// Per-file line of the convert summary.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum FileSummary {
    Imported {
        file: PathBuf,
        #[serde(flatten)]
        receipt: ImportReceipt,
    },
    Rejected {
        file: PathBuf,
        report: ValidationReport,
    },
    Failed {
        file: PathBuf,
        code: String,
        error: String,
    },
}

impl FileSummary {
    fn failed(file: PathBuf, code: &str, error: &anyhow::Error) -> Self {
        FileSummary::Failed {
            file,
            code: code.to_string(),
            error: format!("{error:#}"),
        }
    }
}

async fn run_convert(config: ConvertConfig) -> Result<RunStatus> {
    let ConvertConfig {
        files,
        output_dir,
        pipeline,
    } = config;
    let pipeline = Arc::new(ImportPipeline::new(pipeline));
    let importer: Arc<dyn GraphImporter> = Arc::new(DirectoryImporter::new(output_dir));

    tracing::info!(files = files.len(), "converting workbooks");
    let tasks = files.into_iter().map(|file| {
        let pipeline = Arc::clone(&pipeline);
        let importer = Arc::clone(&importer);
        let span = logging::workbook_span(&file.display().to_string());
        convert_file(pipeline, importer, file).instrument(span)
    });
    let summaries = futures::future::join_all(tasks).await;

    let status = if summaries
        .iter()
        .all(|summary| matches!(summary, FileSummary::Imported { .. }))
    {
        RunStatus::Clean
    } else {
        RunStatus::Problems
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summaries).context("failed to encode summary")?
    );
    Ok(status)
}

async fn convert_file(
    pipeline: Arc<ImportPipeline>,
    importer: Arc<dyn GraphImporter>,
    file: PathBuf,
) -> FileSummary {
    let bytes = match read_workbook(&file).await {
        Ok(bytes) => bytes,
        Err(err) => return FileSummary::failed(file, &ErrorCode::IoError.to_string(), &err),
    };

    let outcome = match tokio::task::spawn_blocking(move || pipeline.convert(&bytes)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            let code = err.code();
            tracing::error!(
                error = %err,
                %code,
                category = code.category(),
                internal = code.is_internal(),
                "conversion failed"
            );
            return FileSummary::failed(file, &code.to_string(), &err.into());
        }
        Err(join) => {
            tracing::error!(error = %join, "conversion task panicked");
            return FileSummary::failed(file, "internal", &join.into());
        }
    };

    match outcome {
        ConvertOutcome::Rejected(outcome) => FileSummary::Rejected {
            file,
            report: outcome.report,
        },
        ConvertOutcome::Compiled(mut document) => {
            document.name = utils::artifact_stem(&file);
            match importer.import(&document).await {
                Ok(receipt) => FileSummary::Imported { file, receipt },
                Err(err) => {
                    let code = err.code();
                    tracing::error!(error = %err, %code, "import failed");
                    FileSummary::failed(file, &code.to_string(), &err.into())
                }
            }
        }
    }
}

async fn read_workbook(path: &Path) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read workbook {:?}", path))?;
    tracing::debug!(bytes = bytes.len(), "workbook read from disk");
    Ok(bytes)
}

pub fn render_report(report: &ValidationReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to encode report as JSON")
        }
        ReportFormat::Yaml => serde_yaml::to_string(report).context("failed to encode report as YAML"),
    }
}
