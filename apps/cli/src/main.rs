//! GridMerge CLI: joins eGRID subregion data onto subregion boundaries.
//!
//! Reads the eGRID spreadsheet, left-joins it onto the subregion shapefile,
//! and writes the merged shapefile.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
