//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "espart")]
#[command(author, version, about = "Flash partition block-device and OTA staging tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Partition table file (TOML format)
    #[arg(short, long, global = true, default_value = "partitions.toml")]
    pub table: PathBuf,

    /// Flash image file (created from the table's flash_size when
    /// missing)
    #[arg(short, long, global = true, default_value = "flash.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the partitions in the table
    List,

    /// Show details for one partition, including any app image found
    /// in it
    Info {
        /// Partition label
        partition: String,
    },

    /// Read a partition's contents to a file
    Read {
        /// Partition label
        partition: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a file into a partition as a block device
    Write {
        /// Partition label
        partition: String,

        /// Input file path
        #[arg(short = 'I', long)]
        input: PathBuf,

        /// Logical block size (hex or decimal); smaller than 4096
        /// engages read-erase-modify-write
        #[arg(long, value_parser = parse_hex_u32, default_value = "4096")]
        block_size: u32,
    },

    /// Erase a whole partition
    Erase {
        /// Partition label
        partition: String,
    },

    /// Stage a firmware image into an OTA slot
    Flash {
        /// Input image path
        #[arg(short = 'I', long)]
        input: PathBuf,

        /// Target partition label (defaults to the slot after the
        /// running partition)
        #[arg(short, long)]
        partition: Option<String>,

        /// Skip image header validation when finalizing
        #[arg(long)]
        no_verify: bool,
    },
}
