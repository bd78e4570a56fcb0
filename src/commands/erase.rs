//! Erase command implementation

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use espart_core::partition::{PartitionFlags, PartitionTable};
use espart_core::FlashMedium;

/// Run the erase command
pub fn run_erase<M: FlashMedium + ?Sized>(
    medium: &mut M,
    table: &PartitionTable,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = table.lookup_label(label)?;
    if part.flags().contains(PartitionFlags::READONLY) {
        return Err(format!("partition {} is read-only", label).into());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Erasing {} ({} bytes)...", label, part.size()));
    pb.enable_steady_tick(Duration::from_millis(100));

    medium.erase(part.address(), part.size())?;

    pb.finish_with_message(format!("Erased {} bytes", part.size()));
    Ok(())
}
