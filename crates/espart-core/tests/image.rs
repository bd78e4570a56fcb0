//! Image module tests driven against the `espart-dummy` emulator.
//! These live as integration tests so that `RamFlash` implements the
//! same `FlashMedium` trait instance the tests link against (a
//! dev-dependency cycle gives unit tests a second copy of the crate
//! with incompatible trait identities).

mod common;

use common::sample_image;
use espart_core::error::Error;
use espart_core::image::app_description;
use espart_core::partition::{subtype, Label, Partition, PartitionFlags, PartitionType};

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
fn app_description_reads_from_medium() {
    use espart_dummy::RamFlash;

    let image = sample_image(4096);
    let mut medium = RamFlash::with_data(0x100000, &image);
    let desc = app_description(&mut medium, &app_partition()).unwrap();
    assert_eq!(desc.project_name, "blinky");

    let data = Partition::new(
        PartitionType::Data,
        subtype::DATA_NVS,
        0,
        0x100000,
        Label::try_from("nvs").unwrap(),
        PartitionFlags::empty(),
    );
    assert_eq!(
        app_description(&mut medium, &data),
        Err(Error::InvalidArgument)
    );
}
