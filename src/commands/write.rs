//! Write command implementation

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use espart_core::blockdev::PartitionHandle;
use espart_core::medium::ERASED_BYTE;
use espart_core::partition::{PartitionFlags, PartitionTable};
use espart_core::FlashMedium;

/// Run the write command
///
/// Writes the input file into the partition through the block-device
/// interface at the requested logical block size. The final partial
/// block, if any, is padded with `0xFF`.
pub fn run_write<M: FlashMedium + ?Sized>(
    medium: &mut M,
    table: &PartitionTable,
    label: &str,
    input: &Path,
    block_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = table.lookup_label(label)?;
    if part.flags().contains(PartitionFlags::READONLY) {
        return Err(format!("partition {} is read-only", label).into());
    }
    let mut handle = PartitionHandle::new(part.clone(), block_size)?;

    let mut data = fs::read(input)?;
    let bs = block_size as usize;
    let pad = (bs - data.len() % bs) % bs;
    data.resize(data.len() + pad, ERASED_BYTE);

    if data.len() as u64 > part.size() as u64 {
        return Err(format!(
            "{} is {} bytes, larger than partition {} ({} bytes)",
            input.display(),
            data.len(),
            label,
            part.size()
        )
        .into());
    }

    println!(
        "Writing {} bytes to {} ({}-byte blocks)",
        data.len(),
        label,
        block_size
    );

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) Writing")?
            .progress_chars("#>-"),
    );

    // One chunk of whole blocks at a time keeps the progress bar
    // moving without a medium call per block.
    const CHUNK_BLOCKS: usize = 16;
    let chunk_len = bs * CHUNK_BLOCKS;
    for (i, chunk) in data.chunks(chunk_len).enumerate() {
        let block = (i * CHUNK_BLOCKS) as u32;
        handle.write_blocks(medium, block, chunk, None)?;
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("Write complete");

    Ok(())
}
