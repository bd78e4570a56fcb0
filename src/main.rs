//! espart - Flash partition block-device and OTA staging tool
//!
//! Operates on a flash image file through an ESP-style partition
//! table: partitions are exposed as block devices with a configurable
//! logical block size, and firmware images are staged into OTA slots
//! through begin/write/end update sessions.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use espart_core::partition::toml::LoadedTable;
use espart_file::FileFlash;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let loaded = match LoadedTable::from_toml_file(&cli.table) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load partition table {}: {}", cli.table.display(), e);
            std::process::exit(1);
        }
    };
    log::info!(
        "Loaded table{} with {} partitions",
        loaded
            .name
            .as_deref()
            .map(|n| format!(" '{}'", n))
            .unwrap_or_default(),
        loaded.table.len()
    );

    let mut flash = open_image(&cli, &loaded)?;
    loaded.table.validate(Some(flash.len()))?;

    match cli.command {
        Commands::List => commands::run_list(&loaded.table, loaded.name.as_deref()),
        Commands::Info { partition } => {
            commands::run_info(&mut flash, &loaded.table, &partition)
        }
        Commands::Read { partition, output } => {
            commands::run_read(&mut flash, &loaded.table, &partition, &output)
        }
        Commands::Write {
            partition,
            input,
            block_size,
        } => commands::run_write(&mut flash, &loaded.table, &partition, &input, block_size),
        Commands::Erase { partition } => {
            commands::run_erase(&mut flash, &loaded.table, &partition)
        }
        Commands::Flash {
            input,
            partition,
            no_verify,
        } => commands::run_flash(
            &mut flash,
            &loaded.table,
            partition.as_deref(),
            &input,
            no_verify,
        ),
    }
}

/// Open the image file, creating a blank one from the table's
/// declared flash size when it does not exist yet
fn open_image(cli: &Cli, loaded: &LoadedTable) -> Result<FileFlash, Box<dyn std::error::Error>> {
    if cli.image.exists() {
        return Ok(FileFlash::open(&cli.image)?);
    }
    let size = loaded.flash_size.ok_or_else(|| {
        format!(
            "{} does not exist and the table declares no flash_size to create it",
            cli.image.display()
        )
    })?;
    log::info!(
        "Creating blank image {} ({} bytes)",
        cli.image.display(),
        size
    );
    Ok(FileFlash::create(&cli.image, size)?)
}
