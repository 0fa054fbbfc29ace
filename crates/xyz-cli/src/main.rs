// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use xyz_cli::{
    parse_config_request, parse_period_errors_document, parse_segments_document,
    parse_series_document,
};
use xyz_core::{
    AggregateResult, AggregationMethod, CalculationStrategy, ClassificationResult, ConfigRequest,
    ItemResults, SegmentationConfig, XyzError,
};
use xyz_report::{
    DetailedAnalysis, DistributionAnalysis, SegmentationSummary, analyze_distribution,
    generate_detailed_analysis, generate_summary,
};
use xyz_segment::{
    DEFAULT_CHUNK_SIZE, SegmentationInput, SegmentationOutput, SeriesItems, XyzSegmenter,
};

struct Cli {
    command: Command,
}

enum Command {
    Classify(SegmentArgs),
    Kmeans(KmeansArgs),
    Batch(BatchArgs),
    Aggregate(SegmentArgs),
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Default)]
struct SegmentArgs {
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct KmeansArgs {
    common: SegmentArgs,
    clusters: Option<usize>,
}

#[derive(Debug)]
struct BatchArgs {
    common: SegmentArgs,
    batch_size: usize,
}

impl Default for BatchArgs {
    fn default() -> Self {
        Self {
            common: SegmentArgs::default(),
            batch_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Default)]
struct AnalyzeArgs {
    input: PathBuf,
    output: Option<PathBuf>,
}

#[derive(Debug)]
enum CliError {
    Xyz(XyzError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Xyz(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xyz(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Xyz(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<XyzError> for CliError {
    fn from(value: XyzError) -> Self {
        Self::Xyz(value)
    }
}

#[derive(Serialize)]
struct ClassifyOutput {
    command: &'static str,
    results: ItemResults<ClassificationResult>,
    summary: SegmentationSummary,
}

#[derive(Serialize)]
struct KmeansOutput {
    command: &'static str,
    clusters: usize,
    results: ItemResults<ClassificationResult>,
    summary: SegmentationSummary,
    analysis: DetailedAnalysis,
}

#[derive(Serialize)]
struct BatchOutput {
    command: &'static str,
    results: ItemResults<ClassificationResult>,
    summary: SegmentationSummary,
    batches_processed: usize,
}

#[derive(Serialize)]
struct AggregateOutput {
    command: &'static str,
    aggregation_method: AggregationMethod,
    results: ItemResults<AggregateResult>,
    summary: SegmentationSummary,
    analysis: DetailedAnalysis,
}

#[derive(Serialize)]
struct AnalyzeOutput {
    command: &'static str,
    analysis: DistributionAnalysis,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli(env::args().skip(1).collect())? else {
        return Ok(());
    };

    match cli.command {
        Command::Classify(args) => handle_classify(args),
        Command::Kmeans(args) => handle_kmeans(args),
        Command::Batch(args) => handle_batch(args),
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Analyze(args) => handle_analyze(args),
    }
}

fn parse_cli(args: Vec<String>) -> Result<Option<Cli>, CliError> {
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].as_str();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name)?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name {
        "classify" => Command::Classify(parse_segment_args("classify", rest)?),
        "kmeans" => Command::Kmeans(parse_kmeans_args(rest)?),
        "batch" => Command::Batch(parse_batch_args(rest)?),
        "aggregate" => Command::Aggregate(parse_segment_args("aggregate", rest)?),
        "analyze" => Command::Analyze(parse_analyze_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: classify, kmeans, batch, aggregate, analyze"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

/// Consumes a flag shared by the segmenting commands. Returns `false` when
/// the flag is not one of them.
fn take_common_flag(
    common: &mut SegmentArgs,
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<bool, CliError> {
    match flag {
        "--input" => {
            common.input = PathBuf::from(take_flag_value(flag, inline_value, tokens, idx)?);
        }
        "--config" => {
            common.config = Some(PathBuf::from(take_flag_value(
                flag,
                inline_value,
                tokens,
                idx,
            )?));
        }
        "--output" => {
            common.output = Some(PathBuf::from(take_flag_value(
                flag,
                inline_value,
                tokens,
                idx,
            )?));
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn parse_segment_args(command: &str, tokens: &[String]) -> Result<SegmentArgs, CliError> {
    let mut args = SegmentArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        if !take_common_flag(&mut args, flag, inline_value, tokens, &mut idx)? {
            return Err(CliError::invalid_input(format!(
                "unknown {command} option '{flag}'"
            )));
        }
        idx += 1;
    }
    require_input(command, &args.input)?;
    Ok(args)
}

fn parse_kmeans_args(tokens: &[String]) -> Result<KmeansArgs, CliError> {
    let mut args = KmeansArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        if flag == "--clusters" {
            let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            args.clusters = Some(parse_usize_arg(raw.as_str(), flag)?);
        } else if !take_common_flag(&mut args.common, flag, inline_value, tokens, &mut idx)? {
            return Err(CliError::invalid_input(format!(
                "unknown kmeans option '{flag}'"
            )));
        }
        idx += 1;
    }
    require_input("kmeans", &args.common.input)?;
    Ok(args)
}

fn parse_batch_args(tokens: &[String]) -> Result<BatchArgs, CliError> {
    let mut args = BatchArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        if flag == "--batch-size" {
            let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            args.batch_size = parse_usize_arg(raw.as_str(), flag)?;
        } else if !take_common_flag(&mut args.common, flag, inline_value, tokens, &mut idx)? {
            return Err(CliError::invalid_input(format!(
                "unknown batch option '{flag}'"
            )));
        }
        idx += 1;
    }
    require_input("batch", &args.common.input)?;
    if args.batch_size == 0 {
        return Err(CliError::invalid_input("--batch-size must be >= 1"));
    }
    Ok(args)
}

fn parse_analyze_args(tokens: &[String]) -> Result<AnalyzeArgs, CliError> {
    let mut args = AnalyzeArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                args.input = PathBuf::from(take_flag_value(flag, inline_value, tokens, &mut idx)?);
            }
            "--output" => {
                args.output = Some(PathBuf::from(take_flag_value(
                    flag,
                    inline_value,
                    tokens,
                    &mut idx,
                )?));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown analyze option '{other}'"
                )));
            }
        }
        idx += 1;
    }
    require_input("analyze", &args.input)?;
    Ok(args)
}

fn require_input(command: &str, input: &Path) -> Result<(), CliError> {
    if input.as_os_str().is_empty() {
        return Err(CliError::invalid_input(format!(
            "{command} requires --input <path>"
        )));
    }
    Ok(())
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn print_version() {
    println!("xyz {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "xyz {}\n\nUSAGE:\n  xyz <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  classify    Classify demand series with static thresholds\n  kmeans      Classify demand series with batch K-means\n  batch       Classify demand series in fixed-size chunks\n  aggregate   Classify period-error mappings\n  analyze     Summarize an existing item -> segment assignment\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nSet RUST_LOG to control diagnostics on stderr (default: warn).\nRun 'xyz <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    const COMMON: &str = "  --input <path>                     Required input JSON\n  --config <path>                    Optional configuration JSON\n  --output <path>                    Write JSON output to file";
    match command {
        "classify" => {
            println!("USAGE:\n  xyz classify --input <items.json> [OPTIONS]\n\nOPTIONS:\n{COMMON}");
            Ok(())
        }
        "kmeans" => {
            println!(
                "USAGE:\n  xyz kmeans --input <items.json> [OPTIONS]\n\nOPTIONS:\n  --clusters <usize>                 Default: config value, else 3\n{COMMON}"
            );
            Ok(())
        }
        "batch" => {
            println!(
                "USAGE:\n  xyz batch --input <items.json> [OPTIONS]\n\nOPTIONS:\n  --batch-size <usize>               Default: {DEFAULT_CHUNK_SIZE}\n{COMMON}"
            );
            Ok(())
        }
        "aggregate" => {
            println!("USAGE:\n  xyz aggregate --input <errors.json> [OPTIONS]\n\nOPTIONS:\n{COMMON}");
            Ok(())
        }
        "analyze" => {
            println!(
                "USAGE:\n  xyz analyze --input <segments.json> [OPTIONS]\n\nOPTIONS:\n  --input <path>                     Required item -> segment JSON\n  --output <path>                    Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: classify, kmeans, batch, aggregate, analyze"
        ))),
    }
}

fn handle_classify(args: SegmentArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref(), |_| {})?;
    let results = segment_series(&XyzSegmenter::new(config)?, load_series(&args.input)?)?;
    let summary = generate_summary(&results);

    write_json_output(
        &ClassifyOutput {
            command: "classify",
            results,
            summary,
        },
        args.output.as_deref(),
    )
}

fn handle_kmeans(args: KmeansArgs) -> Result<(), CliError> {
    let config = load_config(args.common.config.as_deref(), |request| {
        request.use_kmeans = Some(true);
        if args.clusters.is_some() {
            request.kmeans_clusters = args.clusters;
        }
    })?;
    let clusters = config.kmeans_clusters;
    let results = segment_series(&XyzSegmenter::new(config)?, load_series(&args.common.input)?)?;
    let summary = generate_summary(&results);
    let analysis = generate_detailed_analysis(&results);

    write_json_output(
        &KmeansOutput {
            command: "kmeans",
            clusters,
            results,
            summary,
            analysis,
        },
        args.common.output.as_deref(),
    )
}

fn handle_batch(args: BatchArgs) -> Result<(), CliError> {
    let config = load_config(args.common.config.as_deref(), |_| {})?;
    if config.strategy != CalculationStrategy::Variation {
        return Err(CliError::invalid_input(format!(
            "batch requires strategy {}, got {}",
            CalculationStrategy::Variation.as_str(),
            config.strategy.as_str()
        )));
    }
    let items = load_series(&args.common.input)?;
    let chunked = XyzSegmenter::new(config)?.segment_items_chunked(&items, args.batch_size)?;
    let summary = generate_summary(&chunked.results);

    write_json_output(
        &BatchOutput {
            command: "batch",
            results: chunked.results,
            summary,
            batches_processed: chunked.batches_processed,
        },
        args.common.output.as_deref(),
    )
}

fn handle_aggregate(args: SegmentArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref(), |request| {
        request.strategy = Some(CalculationStrategy::Aggregate.as_str().to_string());
    })?;
    let aggregation_method = config.aggregation_method;
    let raw = read_text(&args.input)?;
    let input = SegmentationInput::PeriodErrors(parse_period_errors_document(&raw)?);

    let results = match XyzSegmenter::new(config)?.classify(&input)? {
        SegmentationOutput::Aggregated(results) => results,
        SegmentationOutput::Classified(_) => {
            return Err(CliError::invalid_input(
                "aggregate produced raw-series results",
            ));
        }
    };
    let summary = generate_summary(&results);
    let analysis = generate_detailed_analysis(&results);

    write_json_output(
        &AggregateOutput {
            command: "aggregate",
            aggregation_method,
            results,
            summary,
            analysis,
        },
        args.output.as_deref(),
    )
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let segments = parse_segments_document(&read_text(&args.input)?)?;
    write_json_output(
        &AnalyzeOutput {
            command: "analyze",
            analysis: analyze_distribution(&segments),
        },
        args.output.as_deref(),
    )
}

fn segment_series(
    segmenter: &XyzSegmenter,
    items: SeriesItems,
) -> Result<ItemResults<ClassificationResult>, CliError> {
    match segmenter.classify(&SegmentationInput::Series(items))? {
        SegmentationOutput::Classified(results) => Ok(results),
        SegmentationOutput::Aggregated(_) => Err(CliError::invalid_input(
            "raw-series input produced aggregate results",
        )),
    }
}

/// Reads the optional config file, lets the command force some fields, then
/// resolves and validates.
fn load_config(
    path: Option<&Path>,
    overrides: impl FnOnce(&mut ConfigRequest),
) -> Result<SegmentationConfig, CliError> {
    let mut request = match path {
        Some(path) => parse_config_request(&read_text(path)?)?,
        None => ConfigRequest::default(),
    };
    overrides(&mut request);
    let config = request.into_config()?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

fn load_series(path: &Path) -> Result<SeriesItems, CliError> {
    Ok(parse_series_document(&read_text(path)?)?)
}

fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
