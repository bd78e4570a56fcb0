//! List command implementation

use espart_core::partition::{PartitionTable, Role};

/// Run the list command
pub fn run_list(table: &PartitionTable, name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(name) = name {
        println!("Partition table: {}", name);
    }
    println!(
        "{:<16} {:>4} {:>7} {:>10} {:>10}  flags",
        "label", "type", "subtype", "address", "size"
    );

    let boot = table.resolve(Role::Boot).ok().map(|p| p.label().to_string());
    let running = table
        .resolve(Role::Running)
        .ok()
        .map(|p| p.label().to_string());

    for part in table.iter() {
        let (ptype, subtype, address, size, label, encrypted) = part.info();
        let mut flags = String::new();
        if encrypted {
            flags.push_str(" encrypted");
        }
        if boot.as_deref() == Some(label) {
            flags.push_str(" [boot]");
        }
        if running.as_deref() == Some(label) {
            flags.push_str(" [running]");
        }
        println!(
            "{:<16} {:>4} {:>7} {:>#10x} {:>#10x} {}",
            label, ptype, subtype, address, size, flags
        );
    }
    Ok(())
}
