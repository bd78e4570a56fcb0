//! Firmware image header and application descriptor
//!
//! A firmware image starts with a one-byte magic, followed by segment
//! headers; application images additionally carry a fixed-size
//! application descriptor at a known offset. This module parses that
//! descriptor, maps the image verification state to its string form,
//! and defines the narrow verification seam used when an update
//! session is finalized. Cryptographic checksum/signature validation
//! is deliberately outside this crate; [`HeaderVerifier`] only checks
//! structural magics.

use alloc::string::String;

use crate::error::{Error, ImageFault, Result};
use crate::medium::FlashMedium;
use crate::partition::{Partition, PartitionType};

/// First byte of any firmware image
pub const IMAGE_MAGIC: u8 = 0xE9;

/// Magic word at the start of the application descriptor
pub const APP_DESC_MAGIC: u32 = 0xABCD_5432;

/// Byte offset of the application descriptor within an app image
/// (24-byte image header plus 8-byte extended header)
pub const APP_DESC_OFFSET: usize = 0x20;

/// Size of the application descriptor structure
pub const APP_DESC_SIZE: usize = 256;

/// Bytes of image an [`ImageVerifier`] gets to look at
pub const HEADER_PROBE_LEN: usize = APP_DESC_OFFSET + APP_DESC_SIZE;

/// Application descriptor embedded in an app image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDesc {
    /// Anti-rollback secure version counter
    pub secure_version: u32,
    /// Application version string
    pub version: String,
    /// Project name
    pub project_name: String,
    /// Build time
    pub build_time: String,
    /// Build date
    pub build_date: String,
    /// Platform SDK version the image was built against
    pub platform_version: String,
    /// SHA-256 of the application ELF
    pub elf_sha256: [u8; 32],
}

impl AppDesc {
    /// Parse a descriptor from its raw 256-byte form
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < APP_DESC_SIZE {
            return Err(Error::ValidationFailed(ImageFault::BadAppDesc));
        }
        let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if magic != APP_DESC_MAGIC {
            return Err(Error::ValidationFailed(ImageFault::BadAppDesc));
        }

        let mut elf_sha256 = [0u8; 32];
        elf_sha256.copy_from_slice(&data[144..176]);

        Ok(Self {
            secure_version: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            version: cstr(&data[16..48]),
            project_name: cstr(&data[48..80]),
            build_time: cstr(&data[80..96]),
            build_date: cstr(&data[96..112]),
            platform_version: cstr(&data[112..144]),
            elf_sha256,
        })
    }
}

/// Extract a NUL-terminated string from a fixed-size field
fn cstr(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Read and parse the application descriptor of the image stored in an
/// app partition
pub fn app_description<M: FlashMedium + ?Sized>(
    medium: &mut M,
    part: &Partition,
) -> Result<AppDesc> {
    if part.ptype() != PartitionType::App {
        return Err(Error::InvalidArgument);
    }
    let mut raw = [0u8; APP_DESC_SIZE];
    medium.read(part.address() + APP_DESC_OFFSET as u32, &mut raw)?;
    AppDesc::parse(&raw)
}

/// Verification state of an application image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// First boot not yet attempted
    New,
    /// First boot happened, confirmation pending
    PendingVerify,
    /// Confirmed workable
    Valid,
    /// Confirmed non-workable, never selected for boot
    Invalid,
    /// Confirmation never arrived, never selected for boot
    Aborted,
    /// No recorded state
    Undefined,
}

impl AppState {
    /// Map a raw verification-state value; anything unrecognized is
    /// `Undefined`
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0x0 => Self::New,
            0x1 => Self::PendingVerify,
            0x2 => Self::Valid,
            0x3 => Self::Invalid,
            0x4 => Self::Aborted,
            _ => Self::Undefined,
        }
    }

    /// The state's string form as exposed to callers
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::PendingVerify => "verify",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Aborted => "aborted",
            Self::Undefined => "undefined",
        }
    }
}

/// Finalize-time image check, consumed by the update session engine
///
/// `header` holds the first [`HEADER_PROBE_LEN`] bytes of the staged
/// image (less, if the image is shorter).
pub trait ImageVerifier {
    /// Validate the staged image; an error fails the session's `end`
    fn verify(&self, part: &Partition, header: &[u8]) -> Result<()>;
}

/// Structural header check: image magic, and for app partitions a
/// well-formed application descriptor
#[derive(Debug, Default)]
pub struct HeaderVerifier;

impl ImageVerifier for HeaderVerifier {
    fn verify(&self, part: &Partition, header: &[u8]) -> Result<()> {
        if header.first() != Some(&IMAGE_MAGIC) {
            return Err(Error::ValidationFailed(ImageFault::BadMagic));
        }
        if part.ptype() == PartitionType::App {
            if header.len() < HEADER_PROBE_LEN {
                return Err(Error::ValidationFailed(ImageFault::BadAppDesc));
            }
            AppDesc::parse(&header[APP_DESC_OFFSET..])?;
        }
        Ok(())
    }
}

/// Pass-through verifier that accepts anything
#[derive(Debug, Default)]
pub struct NoVerify;

impl ImageVerifier for NoVerify {
    fn verify(&self, _part: &Partition, _header: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Synthetic app image: magic byte, descriptor at 0x20, payload
#[cfg(test)]
pub(crate) fn sample_image(total_len: usize) -> alloc::vec::Vec<u8> {
    use alloc::vec;

    let mut image = vec![0u8; total_len];
    image[0] = IMAGE_MAGIC;
    let desc = &mut image[APP_DESC_OFFSET..APP_DESC_OFFSET + APP_DESC_SIZE];
    desc[0..4].copy_from_slice(&APP_DESC_MAGIC.to_le_bytes());
    desc[4..8].copy_from_slice(&7u32.to_le_bytes());
    desc[16..22].copy_from_slice(b"1.2.3\0");
    desc[48..55].copy_from_slice(b"blinky\0");
    desc[80..89].copy_from_slice(b"12:34:56\0");
    desc[96..108].copy_from_slice(b"Jan  1 2026\0");
    desc[112..118].copy_from_slice(b"v5.1.2");
    for (i, byte) in desc[144..176].iter_mut().enumerate() {
        *byte = i as u8;
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{subtype, Label, PartitionFlags};

    fn app_partition() -> Partition {
        Partition::new(
            PartitionType::App,
            subtype::APP_OTA_MIN,
            0,
            0x100000,
            Label::try_from("ota_0").unwrap(),
            PartitionFlags::empty(),
        )
    }

    #[test]
    fn parse_descriptor_fields() {
        let image = sample_image(4096);
        let desc = AppDesc::parse(&image[APP_DESC_OFFSET..]).unwrap();
        assert_eq!(desc.secure_version, 7);
        assert_eq!(desc.version, "1.2.3");
        assert_eq!(desc.project_name, "blinky");
        assert_eq!(desc.build_time, "12:34:56");
        assert_eq!(desc.build_date, "Jan  1 2026");
        assert_eq!(desc.platform_version, "v5.1.2");
        assert_eq!(desc.elf_sha256[0], 0);
        assert_eq!(desc.elf_sha256[31], 31);
    }

    #[test]
    fn parse_rejects_bad_magic_and_short_input() {
        let mut image = sample_image(4096);
        image[APP_DESC_OFFSET] ^= 0xFF;
        assert_eq!(
            AppDesc::parse(&image[APP_DESC_OFFSET..]),
            Err(Error::ValidationFailed(ImageFault::BadAppDesc))
        );
        assert_eq!(
            AppDesc::parse(&[0u8; 16]),
            Err(Error::ValidationFailed(ImageFault::BadAppDesc))
        );
    }

    #[test]
    fn state_mapping_with_undefined_fallback() {
        assert_eq!(AppState::from_raw(0).as_str(), "new");
        assert_eq!(AppState::from_raw(1).as_str(), "verify");
        assert_eq!(AppState::from_raw(2).as_str(), "valid");
        assert_eq!(AppState::from_raw(3).as_str(), "invalid");
        assert_eq!(AppState::from_raw(4).as_str(), "aborted");
        assert_eq!(AppState::from_raw(0xFFFF_FFFF).as_str(), "undefined");
        assert_eq!(AppState::from_raw(99).as_str(), "undefined");
    }

    // app_description_reads_from_medium lives in tests/image.rs: the
    // dev-dependency cycle gives unit tests a second copy of this
    // crate, so RamFlash cannot satisfy the unit-test build's
    // FlashMedium trait.

    #[test]
    fn header_verifier_checks_magics() {
        let part = app_partition();
        let image = sample_image(HEADER_PROBE_LEN);
        HeaderVerifier.verify(&part, &image).unwrap();

        let mut bad = image.clone();
        bad[0] = 0x00;
        assert_eq!(
            HeaderVerifier.verify(&part, &bad),
            Err(Error::ValidationFailed(ImageFault::BadMagic))
        );

        assert_eq!(
            HeaderVerifier.verify(&part, &image[..64]),
            Err(Error::ValidationFailed(ImageFault::BadAppDesc))
        );

        NoVerify.verify(&part, &[]).unwrap();
    }
}
