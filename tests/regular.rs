//! End-to-end scenarios over regular elements (spec §8 scenario 1 and the
//! boundary properties that apply to every variant).

use hdf4_core::error::HdfError;
use hdf4_core::special::Origin;
use hdf4_core::store::{OpenMode, StoreConfig};
use hdf4_core::Hdf4File;

fn scratch() -> tempfile::NamedTempFile {
    tempfile::NamedTempFile::new().unwrap()
}

#[test]
fn create_write_close_reopen_read() {
    let f = scratch();
    {
        let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
        let aid = file.new_element(1962, 1, 5).unwrap();
        file.write(aid, b"hello").unwrap();
        file.endaccess(aid).unwrap();
        file.close().unwrap();
    }

    let mut file = Hdf4File::open(f.path(), OpenMode::Read, StoreConfig::default()).unwrap();
    let aid = file.start_read(1962, 1).unwrap();
    assert_eq!(file.read(aid, 5).unwrap(), b"hello");
    assert_eq!(file.inquire(aid).unwrap().length, 5);
    file.endaccess(aid).unwrap();
}

#[test]
fn seek_past_end_read_fails_with_range() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
    let aid = file.new_element(1, 1, 100).unwrap();
    file.write(aid, &[0u8; 100]).unwrap();
    file.endaccess(aid).unwrap();

    let read_aid = file.start_read(1, 1).unwrap();
    file.seek(read_aid, 100, Origin::Start).unwrap();
    let err = file.read(read_aid, 1).unwrap_err();
    assert!(matches!(err, HdfError::Range(_)));
}

#[test]
fn seek_current_zero_is_identity() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
    let aid = file.new_element(1, 1, 10).unwrap();
    file.write(aid, b"0123456789").unwrap();
    file.seek(aid, 4, Origin::Start).unwrap();
    let before = file.inquire(aid).unwrap().posn;
    file.seek(aid, 0, Origin::Current).unwrap();
    assert_eq!(file.inquire(aid).unwrap().posn, before);
}

#[test]
fn write_with_zero_length_does_not_extend() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
    let aid = file.new_element(1, 1, 4).unwrap();
    file.write(aid, b"abcd").unwrap();
    let before = file.inquire(aid).unwrap().length;
    let n = file.write(aid, &[]).unwrap();
    assert_eq!(n, 0);
    assert_eq!(file.inquire(aid).unwrap().length, before);
}

#[test]
fn endaccess_on_already_ended_aid_fails_with_args() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
    let aid = file.new_element(1, 1, 1).unwrap();
    file.endaccess(aid).unwrap();
    assert!(matches!(file.endaccess(aid), Err(HdfError::Args(_))));
}

#[test]
fn delete_removes_the_element() {
    let f = scratch();
    let mut file = Hdf4File::open(f.path(), OpenMode::Create, StoreConfig::default()).unwrap();
    let aid = file.new_element(9, 1, 3).unwrap();
    file.write(aid, b"abc").unwrap();
    file.endaccess(aid).unwrap();

    file.delete(9, 1).unwrap();
    assert!(matches!(file.start_read(9, 1), Err(HdfError::NotFound)));
}
