//! Info command implementation

use espart_core::image;
use espart_core::partition::{PartitionTable, PartitionType};
use espart_core::FlashMedium;

/// Run the info command
pub fn run_info<M: FlashMedium + ?Sized>(
    medium: &mut M,
    table: &PartitionTable,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let part = table.lookup_label(label)?;
    println!("{}", part);

    if part.ptype() != PartitionType::App {
        return Ok(());
    }
    match image::app_description(medium, part) {
        Ok(desc) => {
            println!("  app version:      {}", desc.version);
            println!("  project name:     {}", desc.project_name);
            println!("  build time:       {} {}", desc.build_date, desc.build_time);
            println!("  platform version: {}", desc.platform_version);
            println!("  secure version:   {}", desc.secure_version);
            let sha: String = desc.elf_sha256.iter().map(|b| format!("{:02x}", b)).collect();
            println!("  elf sha256:       {}", sha);
        }
        Err(e) => {
            log::debug!("no app descriptor in {}: {}", label, e);
            println!("  no valid app image");
        }
    }
    Ok(())
}
