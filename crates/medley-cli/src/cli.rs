use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use medley_engine::payload::DEFAULT_MAX_ROWS;
use medley_engine::{analyze, build_pivot, Payload, Pivot};
use medley_format::{format_grid, NumberStyle};
use medley_io::read_delimited;
use medley_model::{Aggregator, PivotSpec, Scalar, Table};
use medley_narrative::{comment_on_pivot, Audience, Depth, NarrativeOptions};

use crate::session::{DisplayOptions, Session};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StyleArg {
    Separators,
    Compact,
    Raw,
}

impl From<StyleArg> for NumberStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Separators => NumberStyle::Separators,
            StyleArg::Compact => NumberStyle::Compact,
            StyleArg::Raw => NumberStyle::Raw,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AggregatorArg {
    Sum,
    Mean,
    Count,
    Median,
    Min,
    Max,
}

impl From<AggregatorArg> for Aggregator {
    fn from(agg: AggregatorArg) -> Self {
        match agg {
            AggregatorArg::Sum => Aggregator::Sum,
            AggregatorArg::Mean => Aggregator::Mean,
            AggregatorArg::Count => Aggregator::Count,
            AggregatorArg::Median => Aggregator::Median,
            AggregatorArg::Min => Aggregator::Min,
            AggregatorArg::Max => Aggregator::Max,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AudienceArg {
    MediaExpert,
    Executive,
    MarketingStrategist,
}

impl From<AudienceArg> for Audience {
    fn from(audience: AudienceArg) -> Self {
        match audience {
            AudienceArg::MediaExpert => Audience::MediaExpert,
            AudienceArg::Executive => Audience::Executive,
            AudienceArg::MarketingStrategist => Audience::MarketingStrategist,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DepthArg {
    Deep,
    Standard,
    Brief,
}

impl From<DepthArg> for Depth {
    fn from(depth: DepthArg) -> Self {
        match depth {
            DepthArg::Deep => Depth::Deep,
            DepthArg::Standard => Depth::Standard,
            DepthArg::Brief => Depth::Brief,
        }
    }
}

/// Grouping and metric selection shared by every pivot-building subcommand.
#[derive(Args, Debug)]
struct PivotArgs {
    /// Columns to group rows by (repeatable, order matters).
    #[arg(long = "rows", value_name = "COLUMN", required = true)]
    row_fields: Vec<String>,

    /// Columns whose values become cross-tab columns (repeatable).
    #[arg(long = "cols", value_name = "COLUMN")]
    column_fields: Vec<String>,

    /// Metric columns to aggregate (repeatable).
    #[arg(long = "values", value_name = "COLUMN", required = true)]
    value_fields: Vec<String>,

    /// Aggregation applied to the metric columns.
    #[arg(long = "agg", value_enum, default_value_t = AggregatorArg::Sum)]
    aggregator: AggregatorArg,
}

impl PivotArgs {
    fn to_spec(&self) -> PivotSpec {
        PivotSpec {
            row_fields: self.row_fields.clone(),
            column_fields: self.column_fields.clone(),
            value_fields: self.value_fields.clone(),
            aggregator: self.aggregator.into(),
        }
    }
}

#[derive(Parser)]
#[command(
    name = "medley",
    about = "Pivot delimited media data and generate grounded commentary."
)]
struct Cli {
    /// How numeric cells are rendered in text output.
    #[arg(long, value_enum, global = true, default_value_t = StyleArg::Separators)]
    style: StyleArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a file and print its shape, columns, and a preview.
    Inspect {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Preview row count.
        #[arg(long, default_value_t = 10)]
        preview: usize,
    },
    /// Build a pivot and render it (or the guidance message).
    Pivot {
        file: PathBuf,

        #[command(flatten)]
        pivot: PivotArgs,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Build a pivot, analyze it, and print commentary.
    Comment {
        file: PathBuf,

        #[command(flatten)]
        pivot: PivotArgs,

        #[arg(long, value_enum, default_value_t = AudienceArg::MediaExpert)]
        audience: AudienceArg,

        #[arg(long, value_enum, default_value_t = DepthArg::Standard)]
        depth: DepthArg,

        /// Language code for the narrative.
        #[arg(long, default_value = "en")]
        language: String,

        /// Also dump the computed analysis as JSON.
        #[arg(long)]
        analysis_json: bool,

        /// Payload row ceiling before analysis.
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: usize,
    },
    /// Build a pivot and write it to a CSV file.
    Export {
        file: PathBuf,

        #[command(flatten)]
        pivot: PivotArgs,

        /// Destination CSV path.
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let session = Session::new(DisplayOptions {
        number_style: cli.style.into(),
    });

    match cli.command {
        Command::Inspect {
            file,
            format,
            preview,
        } => {
            let session = load(&session, &file)?;
            let table = session.table.as_ref().context("no table loaded")?;
            inspect(table, format, preview, session.display.number_style)
        }
        Command::Pivot {
            file,
            pivot,
            format,
        } => {
            let session = load(&session, &file)?;
            let table = session.table.as_ref().context("no table loaded")?;
            match built_pivot(table, &pivot) {
                Ok(built) => {
                    let session = session.with_pivot(built);
                    render_pivot(
                        session.pivot.as_ref().context("no pivot built")?,
                        format,
                        session.display.number_style,
                    )
                }
                Err(message) => {
                    println!("{message}");
                    Ok(())
                }
            }
        }
        Command::Comment {
            file,
            pivot,
            audience,
            depth,
            language,
            analysis_json,
            max_rows,
        } => {
            let session = load(&session, &file)?;
            let table = session.table.as_ref().context("no table loaded")?;
            match built_pivot(table, &pivot) {
                Ok(built) => {
                    let payload = Payload::from_pivot(&built, max_rows);
                    let analysis = analyze(&payload);
                    let options = NarrativeOptions {
                        language,
                        audience: audience.into(),
                        depth: depth.into(),
                    };
                    let commentary = comment_on_pivot(None, &payload, &analysis, &options);
                    if let Some(reason) = &commentary.fallback_reason {
                        eprintln!("note: using local commentary ({reason})");
                    }
                    println!("{}", commentary.text);
                    if analysis_json {
                        println!();
                        println!("{}", serde_json::to_string_pretty(&analysis)?);
                    }
                    Ok(())
                }
                Err(message) => {
                    println!("{message}");
                    Ok(())
                }
            }
        }
        Command::Export { file, pivot, out } => {
            let session = load(&session, &file)?;
            let table = session.table.as_ref().context("no table loaded")?;
            match built_pivot(table, &pivot) {
                Ok(built) => {
                    let csv = medley_io::write_pivot_csv(&built)
                        .context("serialize pivot to CSV")?;
                    std::fs::write(&out, csv)
                        .with_context(|| format!("write {}", out.display()))?;
                    println!("wrote {}", out.display());
                    Ok(())
                }
                Err(message) => {
                    println!("{message}");
                    Ok(())
                }
            }
        }
    }
}

fn load(session: &Session, file: &Path) -> Result<Session> {
    let bytes =
        std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let table =
        read_delimited(&bytes).with_context(|| format!("parse {}", file.display()))?;
    Ok(session.with_table(table))
}

/// Builds the pivot, mapping configuration guidance to `Err(message)` so
/// callers print it instead of a grid. Guidance is not a process failure.
fn built_pivot(table: &Table, args: &PivotArgs) -> std::result::Result<Pivot, String> {
    let outcome = build_pivot(table, &args.to_spec());
    match outcome.pivot {
        Some(pivot) => Ok(pivot),
        None => Err(outcome.message),
    }
}

fn inspect(
    table: &Table,
    format: OutputFormat,
    preview: usize,
    style: NumberStyle,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{} rows x {} columns", table.row_count(), table.column_count());
            println!();
            for header in table.headers() {
                let numeric = table
                    .column(header)
                    .map(|cells| cells.iter().any(|c| matches!(c, Scalar::Number(_))))
                    .unwrap_or(false);
                let kind = if numeric { "number" } else { "text" };
                println!("  {header} ({kind})");
            }
            if preview > 0 && table.row_count() > 0 {
                println!();
                let rows: Vec<Vec<Scalar>> =
                    table.rows().iter().take(preview).cloned().collect();
                let grid = format_grid(table.headers(), &rows, style);
                println!("{}", table.headers().join(" | "));
                for row in grid {
                    println!("{}", row.join(" | "));
                }
            }
            Ok(())
        }
        OutputFormat::Json => {
            let preview_rows: Vec<Vec<String>> = table
                .rows()
                .iter()
                .take(preview)
                .map(|row| row.iter().map(Scalar::display_string).collect())
                .collect();
            let value = serde_json::json!({
                "rows": table.row_count(),
                "cols": table.column_count(),
                "columns": table.headers(),
                "preview": preview_rows,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

fn render_pivot(pivot: &Pivot, format: OutputFormat, style: NumberStyle) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let mut headers = pivot.row_levels.clone();
            headers.extend(pivot.flattened_columns());
            let rows: Vec<Vec<Scalar>> = pivot
                .rows
                .iter()
                .map(|row| {
                    let mut cells = row.key.0.clone();
                    cells.extend(row.cells.iter().cloned());
                    cells
                })
                .collect();
            println!("{}", headers.join(" | "));
            for row in format_grid(&headers, &rows, style) {
                println!("{}", row.join(" | "));
            }
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(pivot)?);
            Ok(())
        }
    }
}
