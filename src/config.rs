use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::builder::DEFAULT_CATEGORY_NAMESPACE;
use crate::pipeline::{FacilityAnchor, PipelineOptions};
use crate::rdf::RdfOutputFormat;
use crate::uri::{normalize_anchor, normalize_namespace};
use crate::utils::artifact_stem;

const DEFAULT_OUTPUT_DIR: &str = ".";
const ANNOTATED_SUFFIX: &str = "annotated.xlsx";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    #[value(alias = "yml")]
    #[serde(alias = "yml")]
    Yaml,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Yaml => write!(f, "yaml"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "cobie-graph",
    about = "Validate COBie workbooks and compile them into RDF triples",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check a workbook and report every structural or referential problem
    Validate(ValidateArgs),
    /// Validate, build and serialize one or more workbooks
    Convert(ConvertArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    #[arg(value_name = "FILE", help = "COBie workbook to validate")]
    pub file: PathBuf,

    #[arg(
        long,
        value_name = "PATH",
        help = "Where to write the highlighted workbook when errors are found"
    )]
    pub annotated_out: Option<PathBuf>,

    #[arg(
        long,
        env = "COBIE_GRAPH_REPORT_FORMAT",
        value_enum,
        value_name = "FORMAT",
        help = "Report encoding (json or yaml)"
    )]
    pub report_format: Option<ReportFormat>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    #[arg(value_name = "FILE", required = true, num_args = 1.., help = "COBie workbooks to convert")]
    pub files: Vec<PathBuf>,

    #[arg(
        long,
        env = "COBIE_GRAPH_FACILITY_URI",
        value_name = "URI",
        conflicts_with = "portfolio_namespace",
        help = "Absolute URI every entity URI is rooted at"
    )]
    pub facility_uri: Option<String>,

    #[arg(
        long,
        env = "COBIE_GRAPH_PORTFOLIO_NAMESPACE",
        value_name = "NS",
        help = "Derive each facility URI from this namespace and the Facility name"
    )]
    pub portfolio_namespace: Option<String>,

    #[arg(
        long,
        env = "COBIE_GRAPH_CATEGORY_NAMESPACE",
        value_name = "NS",
        help = "Namespace for Space and Type category nodes"
    )]
    pub category_namespace: Option<String>,

    #[arg(
        long,
        env = "COBIE_GRAPH_OUT_DIR",
        value_name = "DIR",
        help = "Directory receiving the serialized triple documents"
    )]
    pub out_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "COBIE_GRAPH_RDF_FORMAT",
        value_enum,
        value_name = "FORMAT",
        help = "Triple document format (turtle or ntriples)"
    )]
    pub rdf_format: Option<RdfOutputFormat>,

    #[arg(
        long,
        env = "COBIE_GRAPH_SKIP_VALIDATION",
        help = "Build without the validation gate"
    )]
    pub skip_validation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateConfig {
    pub file: PathBuf,
    pub annotated_out: PathBuf,
    pub report_format: ReportFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    pub files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub pipeline: PipelineOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppConfig {
    Validate(ValidateConfig),
    Convert(ConvertConfig),
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs { config, command } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        match command {
            Command::Validate(args) => Ok(AppConfig::Validate(validate_config(args, file_config)?)),
            Command::Convert(args) => Ok(AppConfig::Convert(convert_config(args, file_config)?)),
        }
    }
}

fn validate_config(args: ValidateArgs, file_config: PartialConfig) -> Result<ValidateConfig> {
    let ValidateArgs {
        file,
        annotated_out,
        report_format,
    } = args;

    ensure_input(&file)?;

    let annotated_out = annotated_out.unwrap_or_else(|| {
        let name = format!("{}.{}", artifact_stem(&file), ANNOTATED_SUFFIX);
        match file.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    });

    Ok(ValidateConfig {
        file,
        annotated_out,
        report_format: report_format
            .or(file_config.report_format)
            .unwrap_or_default(),
    })
}

fn convert_config(args: ConvertArgs, file_config: PartialConfig) -> Result<ConvertConfig> {
    let ConvertArgs {
        files,
        facility_uri: cli_facility_uri,
        portfolio_namespace: cli_portfolio_namespace,
        category_namespace: cli_category_namespace,
        out_dir: cli_out_dir,
        rdf_format: cli_rdf_format,
        skip_validation: cli_skip_validation,
    } = args;

    let PartialConfig {
        facility_uri: file_facility_uri,
        portfolio_namespace: file_portfolio_namespace,
        category_namespace: file_category_namespace,
        output_dir: file_output_dir,
        rdf_format: file_rdf_format,
        skip_validation: file_skip_validation,
        report_format: _,
    } = file_config;

    anyhow::ensure!(!files.is_empty(), "at least one workbook must be provided");
    for file in &files {
        ensure_input(file)?;
    }
    ensure_distinct_artifacts(&files)?;

    anyhow::ensure!(
        !(file_facility_uri.is_some() && file_portfolio_namespace.is_some()),
        "config file sets both facility_uri and portfolio_namespace"
    );
    let anchor = anchor(cli_facility_uri, cli_portfolio_namespace)
        .or_else(|| anchor(file_facility_uri, file_portfolio_namespace))
        .context("either a facility URI or a portfolio namespace must be configured")?;
    let anchor = match anchor {
        FacilityAnchor::Uri(uri) => FacilityAnchor::Uri(
            normalize_anchor(&uri).with_context(|| format!("invalid facility URI {uri:?}"))?,
        ),
        FacilityAnchor::Portfolio(namespace) => FacilityAnchor::Portfolio(
            normalize_namespace(&namespace)
                .with_context(|| format!("invalid portfolio namespace {namespace:?}"))?,
        ),
    };

    let category_namespace = cli_category_namespace
        .or(file_category_namespace)
        .unwrap_or_else(|| DEFAULT_CATEGORY_NAMESPACE.to_string());
    let category_namespace = normalize_namespace(&category_namespace)
        .with_context(|| format!("invalid category namespace {category_namespace:?}"))?;

    if anchor_is_shared(&anchor, files.len()) {
        tracing::warn!(
            files = files.len(),
            "several workbooks share one facility URI; their entities will share identities"
        );
    }

    Ok(ConvertConfig {
        files,
        output_dir: cli_out_dir
            .or(file_output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        pipeline: PipelineOptions {
            anchor,
            category_namespace,
            format: cli_rdf_format.or(file_rdf_format).unwrap_or_default(),
            skip_validation: cli_skip_validation || file_skip_validation.unwrap_or(false),
        },
    })
}

fn anchor(facility_uri: Option<String>, portfolio_namespace: Option<String>) -> Option<FacilityAnchor> {
    facility_uri
        .map(FacilityAnchor::Uri)
        .or(portfolio_namespace.map(FacilityAnchor::Portfolio))
}

fn anchor_is_shared(anchor: &FacilityAnchor, files: usize) -> bool {
    matches!(anchor, FacilityAnchor::Uri(_)) && files > 1
}

/// Each workbook's triples are stored under its file stem, so two inputs with
/// the same stem would overwrite each other. Compared case-insensitively.
fn ensure_distinct_artifacts(files: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for file in files {
        let stem = artifact_stem(file).to_lowercase();
        if let Some(previous) = seen.insert(stem.clone(), file) {
            anyhow::bail!(
                "workbooks {:?} and {:?} would both be stored as {stem:?}; rename one of them",
                previous,
                file
            );
        }
    }
    Ok(())
}

fn ensure_input(path: &Path) -> Result<()> {
    anyhow::ensure!(path.exists(), "workbook {:?} does not exist", path);
    anyhow::ensure!(path.is_file(), "workbook {:?} is not a file", path);
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    facility_uri: Option<String>,
    portfolio_namespace: Option<String>,
    category_namespace: Option<String>,
    output_dir: Option<PathBuf>,
    rdf_format: Option<RdfOutputFormat>,
    skip_validation: Option<bool>,
    report_format: Option<ReportFormat>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
