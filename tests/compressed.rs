//! End-to-end scenarios over compressed elements (spec §8 scenarios 2, 4, 6).

use hdf4_core::compressed::{CoderParams, ModelParams};
use hdf4_core::error::HdfError;
use hdf4_core::special::Origin;
use hdf4_core::store::{OpenMode, StoreConfig};
use hdf4_core::{make_special, Hdf4File};

fn scratch() -> tempfile::NamedTempFile {
    tempfile::NamedTempFile::new().unwrap()
}

#[test]
fn compress_on_create_migrates_existing_regular_data() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();

    let aid = file.new_element(720, 1, 256).unwrap();
    file.write(aid, &[0xAA; 256]).unwrap();
    file.endaccess(aid).unwrap();

    file.create_compressed(720, 1, ModelParams::Stdio, CoderParams::Rle).unwrap();

    assert!(matches!(file.start_read(720, 1), Err(HdfError::NotFound)));

    let special_tag = make_special(720);
    let read_aid = file.start_read(special_tag, 1).unwrap();
    let bytes = file.read(read_aid, 0).unwrap();
    assert_eq!(bytes, vec![0xAAu8; 256]);
    assert_eq!(file.inquire(read_aid).unwrap().length, 256);

    let info = file.info(read_aid).unwrap();
    assert!(matches!(info, hdf4_core::special::Info::Compressed { length: 256, .. }));
    file.endaccess(read_aid).unwrap();
}

#[test]
fn skphuff_round_trip_with_redundant_high_order_lane() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();

    let aid = file
        .create_compressed(702, 2, ModelParams::Stdio, CoderParams::Skphuff { skip_size: 4 })
        .unwrap();

    let mut plain = Vec::new();
    for i in 0u32..1024 {
        plain.extend_from_slice(&[0x7Fu8, (i >> 16) as u8, (i >> 8) as u8, i as u8]);
    }
    file.write(aid, &plain).unwrap();
    file.endaccess(aid).unwrap();

    let special_tag = make_special(702);
    let read_aid = file.start_read(special_tag, 2).unwrap();
    let bytes = file.read(read_aid, 0).unwrap();
    assert_eq!(bytes, plain);
    file.endaccess(read_aid).unwrap();
}

#[test]
fn random_write_on_compressed_element_fails() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();

    let aid = file
        .create_compressed(702, 3, ModelParams::Stdio, CoderParams::None)
        .unwrap();
    file.write(aid, &[0u8; 100]).unwrap();

    let err = file.seek(aid, 50, Origin::Start).unwrap_err();
    assert!(matches!(err, HdfError::CannotRandomWrite));
}
