//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use espart_core::blockdev::PartitionHandle;
use espart_core::partition::PartitionTable;
use espart_core::{FlashMedium, NATIVE_BLOCK_SIZE};

/// Run the read command
pub fn run_read<M: FlashMedium + ?Sized>(
    medium: &mut M,
    table: &PartitionTable,
    label: &str,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = table.lookup_label(label)?;
    let handle = PartitionHandle::with_native_blocks(part.clone());

    println!(
        "Reading {} ({} bytes) to {}",
        label,
        part.size(),
        output.display()
    );

    let pb = ProgressBar::new(part.size() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) Reading")?
            .progress_chars("#>-"),
    );

    let mut file = File::create(output)?;
    let mut buf = vec![0u8; NATIVE_BLOCK_SIZE as usize];
    for block in 0..handle.block_count() {
        handle.read_blocks(medium, block, &mut buf, None)?;
        file.write_all(&buf)?;
        pb.inc(buf.len() as u64);
    }
    pb.finish_with_message("Read complete");

    Ok(())
}
