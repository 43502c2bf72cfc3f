//! tabclean CLI - Load, clean and export CSV / spreadsheet tables
//!
//! # Main Commands
//!
//! ```bash
//! tabclean inspect data.csv                     # Columns, types and preview
//! tabclean clean data.xlsx --op dedup --op fill-missing --format csv
//! tabclean batch a.csv b.xlsx --op normalize=price --out-dir out/
//! tabclean serve                                # Start HTTP server (port 3000)
//! tabclean operations                           # Show available operations
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tabclean::{
    api::types::{column_infos, rows_json},
    chart_series, export_artifact, load_path, operations_description, process_batch, run,
    AppConfig, ExportFormat, InputFile, Operation, PipelineOptions, Table,
};

#[derive(Parser)]
#[command(name = "tabclean")]
#[command(about = "Load, clean and export CSV and spreadsheet tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show columns, inferred types and the first rows of a file
    Inspect {
        /// Input file (.csv, .xlsx, .xls)
        input: PathBuf,

        /// Number of preview rows (default: TABCLEAN_PREVIEW_ROWS or 5)
        #[arg(short, long)]
        rows: Option<usize>,

        /// Also print chart data for the first two numeric columns
        #[arg(long)]
        chart: bool,
    },

    /// Apply operations to one file and export the result
    Clean {
        /// Input file (.csv, .xlsx, .xls)
        input: PathBuf,

        /// Operation to apply, repeatable and applied in order
        /// (dedup, fill-missing, normalize=col1,col2)
        #[arg(short = 'p', long = "op")]
        operations: Vec<Operation>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: FormatArg,

        /// Output file (default: stdout for CSV, <input>.xlsx for XLSX)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply operations to several files; failures do not stop the batch
    Batch {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Operation to apply, repeatable and applied in order
        #[arg(short = 'p', long = "op")]
        operations: Vec<Operation>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: FormatArg,

        /// Directory for exported files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Show available operations
    Operations,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: TABCLEAN_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { input, rows, chart } => {
            cmd_inspect(&input, rows.unwrap_or(config.preview_rows), chart)
        }

        Commands::Clean {
            input,
            operations,
            format,
            output,
        } => cmd_clean(&input, &operations, format.into(), output.as_deref()),

        Commands::Batch {
            inputs,
            operations,
            format,
            out_dir,
        } => cmd_batch(&inputs, operations, format.into(), &out_dir, config.preview_rows),

        Commands::Operations => {
            println!("{}", operations_description());
            Ok(())
        }

        Commands::Serve { port } => {
            let config = AppConfig {
                port: port.unwrap_or(config.port),
                ..config
            };
            tabclean::server::start_server(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_inspect(input: &Path, rows: usize, chart: bool) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Inspecting: {}", input.display());

    let table = load_path(input)?;
    eprintln!("   Rows: {}", table.row_count());
    eprintln!("   Columns:");
    for info in column_infos(&table) {
        eprintln!("     - {} ({}, {} missing)", info.name, info.kind, info.missing);
    }

    print_preview(&table.head(rows));

    if chart {
        let data = chart_series(&table);
        println!("{}", serde_json::to_string_pretty(&data)?);
    }

    Ok(())
}

fn cmd_clean(
    input: &Path,
    operations: &[Operation],
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let table = load_path(input)?;
    let result = run(&table, operations);

    eprintln!(
        "\n⚙️  {} operation(s) applied, {} failed, {} rows remaining",
        result.log.len(),
        result.failures.len(),
        result.table.row_count()
    );

    let original = file_name(input);
    let artifact = export_artifact(&result.table, format, &original)?;

    match (output, format) {
        (Some(path), _) => {
            fs::write(path, &artifact.bytes)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        (None, ExportFormat::Csv) => {
            print!("{}", String::from_utf8_lossy(&artifact.bytes));
        }
        (None, ExportFormat::Xlsx) => {
            let path = input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&artifact.file_name);
            fs::write(&path, &artifact.bytes)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
    }

    Ok(())
}

fn cmd_batch(
    inputs: &[PathBuf],
    operations: Vec<Operation>,
    format: ExportFormat,
    out_dir: &Path,
    preview_rows: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📦 Batch: {} file(s)", inputs.len());

    let mut files = Vec::with_capacity(inputs.len());
    let mut read_failures = 0;
    for path in inputs {
        match fs::read(path) {
            Ok(bytes) => files.push(InputFile::new(file_name(path), bytes)),
            Err(e) => {
                read_failures += 1;
                eprintln!("   ❌ {}: {}", path.display(), e);
            }
        }
    }

    let options = PipelineOptions {
        operations,
        preview_rows,
        export: Some(format),
    };
    let report = process_batch(&files, &options);

    fs::create_dir_all(out_dir)?;
    for outcome in report.succeeded() {
        if let Some(ref artifact) = outcome.export {
            let path = out_dir.join(&artifact.file_name);
            fs::write(&path, &artifact.bytes)?;
            eprintln!(
                "   ✅ {} → {} ({} rows)",
                outcome.file_name,
                path.display(),
                outcome.run.table.row_count()
            );
        }
        for failure in &outcome.run.failures {
            eprintln!("      ⚠️  {}: {}", failure.operation, failure.message);
        }
    }
    for error in report.failed() {
        eprintln!("   ❌ {}", error);
    }

    let failed = report.failed().count() + read_failures;
    eprintln!(
        "\n📊 Results: {} succeeded, {} failed",
        report.succeeded().count(),
        failed
    );

    if failed > 0 {
        return Err(format!("{} file(s) failed", failed).into());
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("export")
        .to_string()
}

fn print_preview(table: &Table) {
    println!("{}", table.column_names().join("\t"));
    for row in rows_json(table) {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::Null => String::new(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
}
