use anyhow::Result;
use budget_core::{categories::CategoryMapping, report, validate};
use clap::Parser;
use std::path::PathBuf;

use bcs::{default_mapping, run, PARSER_NAME, SUPPORTED_CURRENCIES};

#[derive(Parser, Debug)]
#[command(
    name = "bcs_parser",
    about = "Usage: bcs_parser --file_names source_file_jan.xls source_file_feb.xls --currency USD"
)]
struct Args {
    /// Space delimited list of workbook file names (in transactions date order)
    #[arg(long = "file_names", num_args = 1.., required = true)]
    file_names: Vec<PathBuf>,

    /// USD, RUR or EUR is supported
    #[arg(long)]
    currency: String,

    /// Optional JSON file overriding the built-in category mapping
    #[arg(long)]
    mapping: Option<PathBuf>,
}

fn main() {
    init_tracing();
    if let Err(err) = try_main() {
        eprintln!("{PARSER_NAME}: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();

    validate::ensure_input_files(&args.file_names)?;
    validate::ensure_supported_currency(&args.currency, SUPPORTED_CURRENCIES)?;

    let mapping = match &args.mapping {
        Some(path) => CategoryMapping::load(path)?,
        None => default_mapping(),
    };

    let transactions = run(&args.file_names, &args.currency, &mapping)?;
    println!("{}", report::render(&transactions)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
