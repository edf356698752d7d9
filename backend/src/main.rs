//! aqtrends CLI - chart-ready series from air-quality workbooks
//!
//! # Main Commands
//!
//! ```bash
//! aqtrends series --source 2019.xlsx --source 2020.xlsx --sheet PM2.5
//! aqtrends series --config dashboard.json -o series.json
//! aqtrends columns 2019.xlsx --sheet Ozone
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! aqtrends sheets 2019.xlsx              # List sheets of a workbook
//! aqtrends load 2019.xlsx --sheet PM2.5  # Resolved schema and raw rows
//! aqtrends clean 2019.xlsx --sheet PM2.5 # Cleaned, tagged records
//! ```

use aqtrends::{
    available_columns, clean, list_sheets, load, run_logged, tag, Bucket, GroupKeys, Grouping,
    PipelineConfig, Reducer, RunLog, SourceSpec, SplitBy, TableCache, ValueField,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "aqtrends")]
#[command(about = "Aggregate air-quality workbooks into chart series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a workbook
    Sheets {
        /// Workbook file, CSV file or directory of CSV sheets
        source: PathBuf,
    },

    /// Load one sheet and print its schema and raw rows
    Load {
        source: PathBuf,

        #[arg(short, long)]
        sheet: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load, clean and tag one sheet
    Clean {
        source: PathBuf,

        #[arg(short, long)]
        sheet: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which value columns a sheet offers
    Columns {
        source: PathBuf,

        #[arg(short, long)]
        sheet: String,
    },

    /// Full pipeline: sources → cleaned records → aggregated series
    Series {
        /// Source workbook (repeat for several years)
        #[arg(long = "source")]
        sources: Vec<PathBuf>,

        /// Sheet (pollutant) to read
        #[arg(short, long)]
        sheet: Option<String>,

        /// JSON pipeline config; flags override its fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Value column on the y axis
        #[arg(long, value_enum)]
        value: Option<ValueArg>,

        /// Calendar grouping across years
        #[arg(long, value_enum, conflicts_with = "resample")]
        group: Option<GroupArg>,

        /// Resample a single timeline instead of grouping across years
        #[arg(long, value_enum)]
        resample: Option<BucketArg>,

        #[arg(long, value_enum)]
        reducer: Option<ReducerArg>,

        /// Split into one series per year, or keep a single series
        #[arg(long, value_enum)]
        split: Option<SplitArg>,

        /// Drop rows without an AQI value
        #[arg(long)]
        require_aqi: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ValueArg {
    DailyMean,
    Aqi,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupArg {
    None,
    Year,
    Month,
    Week,
}

#[derive(Clone, Copy, ValueEnum)]
enum BucketArg {
    Day,
    Week,
    Month,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReducerArg {
    Mean,
    Sum,
}

#[derive(Clone, Copy, ValueEnum)]
enum SplitArg {
    Year,
    None,
}

struct SeriesArgs {
    sources: Vec<PathBuf>,
    sheet: Option<String>,
    config: Option<PathBuf>,
    value: Option<ValueArg>,
    group: Option<GroupArg>,
    resample: Option<BucketArg>,
    reducer: Option<ReducerArg>,
    split: Option<SplitArg>,
    require_aqi: bool,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sheets { source } => cmd_sheets(&source),

        Commands::Load { source, sheet, output } => cmd_load(&source, &sheet, output.as_deref()),

        Commands::Clean { source, sheet, output } => cmd_clean(&source, &sheet, output.as_deref()),

        Commands::Columns { source, sheet } => cmd_columns(&source, &sheet),

        Commands::Series {
            sources,
            sheet,
            config,
            value,
            group,
            resample,
            reducer,
            split,
            require_aqi,
            output,
        } => cmd_series(
            SeriesArgs {
                sources,
                sheet,
                config,
                value,
                group,
                resample,
                reducer,
                split,
                require_aqi,
            },
            output.as_deref(),
        ),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_sheets(source: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let sheets = list_sheets(source)?;
    eprintln!("📋 {} sheets in {}", sheets.len(), source.display());
    for sheet in sheets {
        println!("{}", sheet);
    }
    Ok(())
}

fn cmd_load(
    source: &Path,
    sheet: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {} [{}]", source.display(), sheet);

    let table = load(source, sheet)?;
    eprintln!("   Strategy: {:?}", table.schema.strategy);
    eprintln!("   Label: {}", table.source_label);
    eprintln!("✅ Loaded {} rows", table.rows.len());

    write_json(&table, output)
}

fn cmd_clean(
    source: &Path,
    sheet: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🧹 Cleaning: {} [{}]", source.display(), sheet);

    let table = load(source, sheet)?;
    let cleaned = clean(&table);
    let report = cleaned.report.clone();
    eprintln!("   Rows: {}", report.total_rows);
    eprintln!("   Invalid dates: {}", report.invalid_dates);
    eprintln!("   Missing measurement: {}", report.missing_measurement);
    eprintln!("✅ Kept {} rows", report.kept);

    let dataset = tag(cleaned.observations);
    write_json(&json!({ "report": report, "records": dataset.records() }), output)
}

fn cmd_columns(source: &Path, sheet: &str) -> Result<(), Box<dyn std::error::Error>> {
    let columns = available_columns(source, sheet, &mut TableCache::new())?;
    if columns.is_empty() {
        eprintln!("⚠️  No numeric columns in {} [{}]", source.display(), sheet);
    }
    for column in columns {
        println!("{}", column);
    }
    Ok(())
}

fn cmd_series(args: SeriesArgs, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;
    config.validate()?;

    eprintln!("📈 {} source(s), sheet '{}'", config.sources.len(), config.sheet);
    let result = run_logged(&config, &mut TableCache::new(), RunLog::echoing())?;

    for summary in result.sources.iter().filter(|s| !s.is_ok()) {
        eprintln!("   ⚠️  skipped {}", summary.label);
    }
    eprintln!("\n✨ Done!");

    write_json(&result, output)
}

/// Start from the config file (or defaults) and apply flag overrides.
fn build_config(args: SeriesArgs) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::read_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if !args.sources.is_empty() {
        config.sources = args.sources.into_iter().map(SourceSpec::new).collect();
    }
    if let Some(sheet) = args.sheet {
        config.sheet = sheet;
    }
    if let Some(value) = args.value {
        config.value_field = match value {
            ValueArg::DailyMean => ValueField::Measurement,
            ValueArg::Aqi => ValueField::Aqi,
        };
    }
    if let Some(group) = args.group {
        config.grouping = match group {
            GroupArg::None => Grouping::None,
            GroupArg::Year => Grouping::Calendar(GroupKeys::Year),
            GroupArg::Month => Grouping::Calendar(GroupKeys::YearMonth),
            GroupArg::Week => Grouping::Calendar(GroupKeys::YearWeek),
        };
    }
    if let Some(bucket) = args.resample {
        config.grouping = Grouping::Resample(match bucket {
            BucketArg::Day => Bucket::Day,
            BucketArg::Week => Bucket::Week,
            BucketArg::Month => Bucket::Month,
        });
    }
    if let Some(reducer) = args.reducer {
        config.reducer = match reducer {
            ReducerArg::Mean => Reducer::Mean,
            ReducerArg::Sum => Reducer::Sum,
        };
    }
    if let Some(split) = args.split {
        config.split_by = match split {
            SplitArg::Year => SplitBy::Year,
            SplitArg::None => SplitBy::None,
        };
    }
    if args.require_aqi {
        config.require_aqi = true;
    }

    Ok(config)
}

fn write_json<T: Serialize>(
    value: &T,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
