use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use dwarf_treemap::config::{TreemapConfig, parse_address};
use dwarf_treemap::error::TreemapError;
use dwarf_treemap::model::{AddressRange, Variable};
use dwarf_treemap::overview::{format_bytes, render_overview};
use dwarf_treemap::session::{LoadStatus, Session};

/// Prints the global variables of object files and lays them out as a size treemap.
#[derive(Debug, Parser)]
#[command(name = "dwarf_treemap", version)]
struct Cli {
    /// Object files carrying DWARF debug information
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// TOML config file; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Levels shown, counting top-level variables as the first (1-10)
    #[arg(long)]
    depth: Option<u32>,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,

    /// Inset applied around each expanded struct or array
    #[arg(long)]
    border: Option<f64>,

    /// Lowest variable address to keep (hex with 0x, or decimal)
    #[arg(long, value_parser = parse_address, requires = "high")]
    low: Option<u64>,

    /// Highest variable address to keep (inclusive)
    #[arg(long, value_parser = parse_address, requires = "low")]
    high: Option<u64>,

    /// Print the nested variable overview
    #[arg(long)]
    overview: bool,

    /// Print the treemap rectangles and the overview as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    dwarf_treemap::logging::init_logging();
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for path in &cli.paths {
        if let Err(error) = process_file(path, &config, &cli) {
            eprintln!("  {error}");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn build_config(cli: &Cli) -> Result<TreemapConfig, TreemapError> {
    let mut config = match &cli.config {
        Some(path) => TreemapConfig::load(path)?,
        None => TreemapConfig::default(),
    };
    if let Some(depth) = cli.depth {
        config.max_depth = depth;
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(border) = cli.border {
        config.border = border;
    }
    if let (Some(low), Some(high)) = (cli.low, cli.high) {
        config.address_range = Some(AddressRange { low, high });
    }
    config.validate()?;
    Ok(config)
}

fn process_file(path: &Path, config: &TreemapConfig, cli: &Cli) -> Result<(), TreemapError> {
    println!("Processing file: {}", path.display());
    let mut session = Session::new(config.clone())?;

    if session.load_path(path)? == LoadStatus::NoDebugInfo {
        println!("  file has no DWARF info");
        return Ok(());
    }

    for unit in session.units() {
        println!(
            "  Found a compile unit at offset {}, length {}, name {}",
            unit.unit.offset,
            unit.unit.length,
            unit.unit.name.as_deref().unwrap_or("<unknown>")
        );
        for variable in &unit.variables {
            println!("    {}", describe_variable(variable));
        }
    }

    if cli.overview {
        print!("{}", render_overview(&session.overview()));
    }
    if cli.json {
        let overview = session.overview();
        let document = serde_json::json!({
            "treemap": session.treemap(),
            "overview": overview,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    }

    println!("Done processing {}", path.display());
    Ok(())
}

fn describe_variable(variable: &Variable) -> String {
    let size = variable
        .size()
        .map(format_bytes)
        .unwrap_or_else(|| "unknown size".to_string());
    format!(
        "{} : {} @ 0x{:x} ({size})",
        variable.name, variable.ty.name, variable.location
    )
}
