//! TOML partition table parsing
//!
//! Parses partition tables in TOML format:
//!
//! ```toml
//! [table]
//! name = "esp32-16mb"
//! flash_size = "16 MiB"
//! boot = "ota_0"
//! running = "ota_0"
//!
//! [[partition]]
//! label = "nvs"
//! type = "data"
//! subtype = "nvs"
//! address = 0x9000
//! size = "24 KiB"
//!
//! [[partition]]
//! label = "ota_0"
//! type = "app"
//! subtype = "ota_0"
//! address = 0x10000
//! size = "1 MiB"
//! ```

use std::format;
use std::fs;
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use crate::error::{Error, Fault, Result};
use crate::partition::{subtype, Label, Partition, PartitionFlags, PartitionTable, PartitionType};

/// TOML table file structure
#[derive(Debug, serde::Deserialize)]
struct TomlTableFile {
    table: Option<TomlTableMeta>,
    partition: Vec<TomlPartition>,
}

/// Table metadata
#[derive(Debug, serde::Deserialize)]
struct TomlTableMeta {
    name: Option<String>,
    flash_size: Option<String>,
    boot: Option<String>,
    running: Option<String>,
}

/// Partition definition in TOML
#[derive(Debug, serde::Deserialize)]
struct TomlPartition {
    label: String,
    #[serde(rename = "type")]
    ptype: String,
    subtype: HexOrName,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    address: u32,
    size: HexOrName,
    #[serde(default)]
    encrypted: bool,
    #[serde(default)]
    readonly: bool,
}

/// A value that can be a number or a symbolic/suffixed string
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum HexOrName {
    Int(u32),
    Str(String),
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match HexOrName::deserialize(deserializer)? {
        HexOrName::Int(n) => Ok(n),
        HexOrName::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// Parse a size string like "16 MiB" or "4096"
fn parse_size(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = s.parse::<u32>() {
        return Ok(n);
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if let Ok(n) = u32::from_str_radix(hex.trim(), 16) {
            return Ok(n);
        }
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("b") {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    Ok(num * multiplier)
}

/// Resolve a subtype name to its numeric value
///
/// Symbolic names follow the IDF partition table conventions; any
/// other value must be numeric.
fn parse_subtype(ptype: PartitionType, value: &HexOrName) -> Result<u8> {
    let s = match value {
        HexOrName::Int(n) => return u8::try_from(*n).map_err(|_| Error::InvalidArgument),
        HexOrName::Str(s) => s.trim(),
    };
    let named = match (ptype, s) {
        (PartitionType::App, "factory") => Some(subtype::APP_FACTORY),
        (PartitionType::Data, "ota") => Some(subtype::DATA_OTA),
        (PartitionType::Data, "nvs") => Some(subtype::DATA_NVS),
        (PartitionType::Data, "fat") => Some(subtype::DATA_FAT),
        (PartitionType::App, _) => s.strip_prefix("ota_").and_then(|n| {
            let slot: u8 = n.parse().ok()?;
            subtype::APP_OTA_MIN
                .checked_add(slot)
                .filter(|v| *v <= subtype::APP_OTA_MAX)
        }),
        _ => None,
    };
    match named {
        Some(v) => Ok(v),
        None => {
            let n = parse_number(s).map_err(|_| Error::InvalidArgument)?;
            u8::try_from(n).map_err(|_| Error::InvalidArgument)
        }
    }
}

/// A partition table loaded from a TOML file, with its metadata
#[derive(Debug)]
pub struct LoadedTable {
    /// The validated table, with boot/running roles applied
    pub table: PartitionTable,
    /// Optional display name
    pub name: Option<String>,
    /// Declared flash size the table was validated against, if any
    pub flash_size: Option<u32>,
}

impl LoadedTable {
    /// Load a partition table from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Io(Fault::Device(e.raw_os_error().unwrap_or(-1))))?;
        Self::from_toml_str(&content)
    }

    /// Parse a partition table from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlTableFile =
            toml::from_str(content).map_err(|_| Error::InvalidArgument)?;

        let mut parts = Vec::with_capacity(file.partition.len());
        for entry in &file.partition {
            let ptype = match entry.ptype.as_str() {
                "app" => PartitionType::App,
                "data" => PartitionType::Data,
                _ => return Err(Error::InvalidArgument),
            };
            let size = match &entry.size {
                HexOrName::Int(n) => *n,
                HexOrName::Str(s) => parse_size(s).map_err(|_| Error::InvalidArgument)?,
            };
            let label =
                Label::try_from(entry.label.as_str()).map_err(|_| Error::InvalidArgument)?;
            let mut flags = PartitionFlags::empty();
            flags.set(PartitionFlags::ENCRYPTED, entry.encrypted);
            flags.set(PartitionFlags::READONLY, entry.readonly);
            parts.push(Partition::new(
                ptype,
                parse_subtype(ptype, &entry.subtype)?,
                entry.address,
                size,
                label,
                flags,
            ));
        }

        let mut table = PartitionTable::from_parts(parts)?;
        let mut name = None;
        let mut flash_size = None;
        if let Some(meta) = file.table {
            name = meta.name;
            if let Some(size_str) = meta.flash_size {
                let size = parse_size(&size_str).map_err(|_| Error::InvalidArgument)?;
                table.validate(Some(size))?;
                flash_size = Some(size);
            }
            if let Some(label) = meta.boot.as_deref() {
                table.set_boot(label)?;
            }
            if let Some(label) = meta.running.as_deref() {
                table.set_running(label)?;
            }
        }

        Ok(Self {
            table,
            name,
            flash_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::Role;
    use std::string::ToString;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("0x1000").unwrap(), 4096);
        assert_eq!(parse_size("24 KiB").unwrap(), 24 * 1024);
        assert_eq!(parse_size("24KiB").unwrap(), 24 * 1024);
        assert_eq!(parse_size("16 MiB").unwrap(), 16 * 1024 * 1024);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_parse_subtype() {
        let app = PartitionType::App;
        let data = PartitionType::Data;
        assert_eq!(parse_subtype(app, &HexOrName::Str("factory".to_string())), Ok(0x00));
        assert_eq!(parse_subtype(app, &HexOrName::Str("ota_0".to_string())), Ok(0x10));
        assert_eq!(parse_subtype(app, &HexOrName::Str("ota_15".to_string())), Ok(0x1F));
        assert_eq!(
            parse_subtype(app, &HexOrName::Str("ota_16".to_string())),
            Err(Error::InvalidArgument)
        );
        assert_eq!(parse_subtype(data, &HexOrName::Str("nvs".to_string())), Ok(0x02));
        assert_eq!(parse_subtype(data, &HexOrName::Str("fat".to_string())), Ok(0x81));
        assert_eq!(parse_subtype(data, &HexOrName::Str("0x81".to_string())), Ok(0x81));
        assert_eq!(parse_subtype(data, &HexOrName::Int(0x81)), Ok(0x81));
        assert_eq!(
            parse_subtype(data, &HexOrName::Int(0x1000)),
            Err(Error::InvalidArgument)
        );
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[table]
name = "esp32-4mb"
flash_size = "4 MiB"
boot = "ota_0"
running = "factory"

[[partition]]
label = "nvs"
type = "data"
subtype = "nvs"
address = 0x9000
size = "24 KiB"

[[partition]]
label = "factory"
type = "app"
subtype = "factory"
address = 0x10000
size = "1 MiB"
readonly = true

[[partition]]
label = "ota_0"
type = "app"
subtype = "ota_0"
address = 0x110000
size = 0x100000
"#;
        let loaded = LoadedTable::from_toml_str(toml).unwrap();
        assert_eq!(loaded.name.as_deref(), Some("esp32-4mb"));
        assert_eq!(loaded.flash_size, Some(4 * 1024 * 1024));
        assert_eq!(loaded.table.len(), 3);

        let factory = loaded.table.lookup_label("factory").unwrap();
        assert_eq!(factory.subtype(), subtype::APP_FACTORY);
        assert!(factory.flags().contains(PartitionFlags::READONLY));
        assert_eq!(loaded.table.resolve(Role::Boot).unwrap().label(), "ota_0");
        assert_eq!(
            loaded.table.resolve(Role::Running).unwrap().label(),
            "factory"
        );
    }

    #[test]
    fn test_rejects_table_larger_than_flash() {
        let toml = r#"
[table]
flash_size = "1 MiB"

[[partition]]
label = "ota_0"
type = "app"
subtype = "ota_0"
address = 0x10000
size = "2 MiB"
"#;
        assert_eq!(
            LoadedTable::from_toml_str(toml).err(),
            Some(Error::InvalidArgument)
        );
    }

    #[test]
    fn test_rejects_unknown_type() {
        let toml = r#"
[[partition]]
label = "x"
type = "bootloader"
subtype = 0
address = 0x1000
size = 0x1000
"#;
        assert_eq!(
            LoadedTable::from_toml_str(toml).err(),
            Some(Error::InvalidArgument)
        );
    }
}
