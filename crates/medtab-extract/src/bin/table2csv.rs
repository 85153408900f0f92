use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use medtab_extract::{
    Condition, ExtractOptions, Extraction, ExtractionReport, FilterSpec, OverflowMode, QuerySpec,
    SortSpec, TokenizeMode, build_dataset, extract_table, read_text_file, write_csv,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "table2csv",
    version,
    about = "Turn OCR'd medical report tables into normalized tables and CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract a table from OCR text and write CSV output.
    Extract(ExtractArgs),
    /// Print the normalized pipe-delimited table for OCR text.
    Render(RenderArgs),
    /// Load a pipe-delimited table and print it, optionally filtered and sorted.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct LimitArgs {
    /// Maximum number of non-blank input lines.
    #[arg(long)]
    max_lines: Option<usize>,

    /// Maximum number of header columns.
    #[arg(long)]
    max_columns: Option<usize>,

    /// Fail instead of truncating when the input exceeds --max-lines.
    #[arg(long)]
    strict: bool,

    /// Row tokenization: aligned or fixed.
    #[arg(long, default_value = "aligned")]
    tokenize: String,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Column to filter on; requires --condition.
    #[arg(long, requires = "condition")]
    filter_column: Option<String>,

    /// Filter condition like "> 5", "= Normal" or "contains Lipid".
    #[arg(long, requires = "filter_column")]
    condition: Option<String>,

    /// Column to sort by (numeric cells first, then text, then empty).
    #[arg(long)]
    sort_column: Option<String>,

    /// Sort descending instead of ascending.
    #[arg(long, requires = "sort_column")]
    descending: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input text path (OCR output scoped to one table).
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the normalized table to this path.
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    #[command(flatten)]
    limits: LimitArgs,

    #[command(flatten)]
    query: QueryArgs,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Input text path (OCR output scoped to one table).
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    limits: LimitArgs,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// Pipe-delimited table path.
    #[arg(short, long)]
    input: PathBuf,

    #[command(flatten)]
    query: QueryArgs,
}

fn parse_options(limits: &LimitArgs, delimiter: char) -> Result<ExtractOptions> {
    if !delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let tokenize_mode = TokenizeMode::from_str(&limits.tokenize)
        .map_err(|error| anyhow!("invalid tokenize mode: {error}"))
        .context("failed to parse --tokenize")?;

    let defaults = ExtractOptions::default();
    let options = ExtractOptions {
        max_lines: limits.max_lines.unwrap_or(defaults.max_lines),
        max_columns: limits.max_columns.unwrap_or(defaults.max_columns),
        overflow: if limits.strict {
            OverflowMode::Strict
        } else {
            OverflowMode::Truncate
        },
        tokenize_mode,
        delimiter: delimiter as u8,
    };
    options.validate()?;
    Ok(options)
}

fn parse_query(args: &QueryArgs) -> Result<QuerySpec> {
    let filter = match (&args.filter_column, &args.condition) {
        (Some(column), Some(condition)) => Some(FilterSpec {
            column: column.clone(),
            condition: Condition::from_str(condition)
                .with_context(|| format!("failed to parse --condition '{condition}'"))?,
        }),
        _ => None,
    };

    let sort = args.sort_column.as_ref().map(|column| SortSpec {
        column: column.clone(),
        ascending: !args.descending,
    });

    Ok(QuerySpec { filter, sort })
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} row={:?} column={:?}: {}",
                warning.code, warning.row, warning.column, warning.message
            );
        }
    }
}

fn load_extraction(input: &Path, options: &ExtractOptions) -> Result<Extraction> {
    let text = read_text_file(input)
        .with_context(|| format!("failed to read '{}'", input.display()))?;
    extract_table(&text, options)
        .with_context(|| format!("failed to extract a table from '{}'", input.display()))
}

fn run_extract(args: &ExtractArgs) -> Result<ExtractionReport> {
    let options = parse_options(&args.limits, args.delimiter)?;
    let query = parse_query(&args.query)?;
    let extraction = load_extraction(&args.input, &options)?;

    if let Some(path) = &args.markdown {
        std::fs::write(path, extraction.normalized.as_str())
            .with_context(|| format!("failed to write '{}'", path.display()))?;
    }

    let dataset = query.apply(&extraction.dataset)?;
    write_csv(&args.output, &dataset, options.delimiter)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;

    Ok(ExtractionReport {
        row_count: dataset.row_count(),
        ..extraction.report
    })
}

fn run_render(args: &RenderArgs) -> Result<ExtractionReport> {
    let options = parse_options(&args.limits, ',')?;
    let extraction = load_extraction(&args.input, &options)?;
    print!("{}", extraction.normalized);
    Ok(extraction.report)
}

fn run_show(args: &ShowArgs) -> Result<usize> {
    let query = parse_query(&args.query)?;
    let text = read_text_file(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;
    let dataset = build_dataset(&text)
        .with_context(|| format!("failed to parse table in '{}'", args.input.display()))?;
    let dataset = query.apply(&dataset)?;
    print!("{dataset}");
    Ok(dataset.row_count())
}

fn exit_for_rows(row_count: usize) -> ExitCode {
    if row_count > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn report_error(error: &anyhow::Error) -> ExitCode {
    eprintln!("error: {error:#}");
    ExitCode::from(1)
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("medtab_extract=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => match run_extract(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                exit_for_rows(report.row_count)
            }
            Err(error) => report_error(&error),
        },
        Commands::Render(args) => match run_render(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                exit_for_rows(report.row_count)
            }
            Err(error) => report_error(&error),
        },
        Commands::Show(args) => match run_show(&args) {
            Ok(row_count) => exit_for_rows(row_count),
            Err(error) => report_error(&error),
        },
    }
}
