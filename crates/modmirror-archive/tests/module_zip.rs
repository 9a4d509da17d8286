use std::io::{Cursor, Write};

use bytes::Bytes;
use modmirror_archive::{ArchiveError, ModuleZip};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

#[test]
fn walks_every_member_in_order() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.add_directory("m1@v1/sub/", options()).unwrap();
    writer.start_file("m1@v1/go.mod", options()).unwrap();
    writer.write_all(b"module m1").unwrap();
    writer.start_file("m1@v1/sub/x.go", options()).unwrap();
    writer.write_all(b"package sub").unwrap();
    let bytes: Bytes = writer.finish().unwrap().into_inner().into();

    let mut archive = ModuleZip::new(bytes).unwrap();
    assert_eq!(archive.len(), 3);

    let names: Vec<_> = (0..archive.len())
        .map(|i| archive.header(i).unwrap().name)
        .collect();
    assert_eq!(names, ["m1@v1/sub/", "m1@v1/go.mod", "m1@v1/sub/x.go"]);

    assert!(archive.header(0).unwrap().is_dir);
    assert!(matches!(archive.read(0), Err(ArchiveError::Directory { .. })));
    assert_eq!(archive.read(1).unwrap(), b"module m1");
    assert_eq!(archive.read(2).unwrap(), b"package sub");
}

#[test]
fn escaping_member_is_refused_but_others_remain_readable() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file("../../evil", options()).unwrap();
    writer.write_all(b"x").unwrap();
    writer.start_file("m1@v1/ok.txt", options()).unwrap();
    writer.write_all(b"fine").unwrap();
    let bytes: Bytes = writer.finish().unwrap().into_inner().into();

    let mut archive = ModuleZip::new(bytes).unwrap();
    assert!(!archive.header(0).unwrap().enclosed);
    assert!(matches!(archive.read(0), Err(ArchiveError::UnsafeName { .. })));
    assert_eq!(archive.read(1).unwrap(), b"fine");
}

#[test]
fn empty_archive_opens() {
    let writer = ZipWriter::new(Cursor::new(Vec::new()));
    let bytes: Bytes = writer.finish().unwrap().into_inner().into();
    let archive = ModuleZip::new(bytes).unwrap();
    assert!(archive.is_empty());
}
