//! Shared helpers for the integration tests. `sample_image` mirrors
//! the `pub(crate)` helper in `src/image.rs`, which integration tests
//! cannot reach.

use espart_core::image::{APP_DESC_MAGIC, APP_DESC_OFFSET, APP_DESC_SIZE, IMAGE_MAGIC};

/// Synthetic app image: magic byte, descriptor at 0x20, payload
pub fn sample_image(total_len: usize) -> Vec<u8> {
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
