//! Flash command implementation
//!
//! Stages a firmware image into an OTA slot through a full update
//! session: begin (pre-erase), chunked writes, end (validate and
//! finalize).

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use espart_core::image::{HeaderVerifier, NoVerify};
use espart_core::ota::{self, Updater};
use espart_core::partition::{PartitionFlags, PartitionTable, Role};
use espart_core::FlashMedium;

/// Write chunk size for session writes
const CHUNK: usize = 64 * 1024;

/// Run the flash command
pub fn run_flash<M: FlashMedium + ?Sized>(
    medium: &mut M,
    table: &PartitionTable,
    label: Option<&str>,
    input: &Path,
    no_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = match label {
        Some(label) => table.lookup_label(label)?,
        None => {
            let running = table.resolve(Role::Running).map_err(|_| {
                "no running partition set in the table; pass --partition to pick a slot"
            })?;
            ota::next_update(table, running)?
        }
    };
    if part.flags().contains(PartitionFlags::READONLY) {
        return Err(format!("partition {} is read-only", part.label()).into());
    }
    if !part.is_ota_slot() {
        log::warn!("{} is not an OTA slot", part.label());
    }

    let data = fs::read(input)?;
    println!(
        "Flashing {} ({} bytes) to {}",
        input.display(),
        data.len(),
        part.label()
    );

    let mut updater = Updater::new();
    let handle = updater.begin(medium, part, data.len() as u32)?;

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) Flashing")?
            .progress_chars("#>-"),
    );

    for chunk in data.chunks(CHUNK) {
        if let Err(e) = updater.write(medium, handle, chunk) {
            pb.abandon();
            updater.abort(handle)?;
            return Err(e.into());
        }
        pb.inc(chunk.len() as u64);
    }

    let end_result = if no_verify {
        updater.end(medium, &NoVerify, handle)
    } else {
        updater.end(medium, &HeaderVerifier, handle)
    };
    if let Err(e) = end_result {
        pb.abandon();
        updater.abort(handle)?;
        return Err(e.into());
    }
    pb.finish_with_message("Flash complete");

    println!(
        "Staged image in {}; set boot = \"{}\" in the table to activate it",
        part.label(),
        part.label()
    );
    Ok(())
}
