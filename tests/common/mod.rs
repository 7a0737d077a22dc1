//! Fixture packer for building `.mpkg` containers in tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const TAG: &[u8; 8] = b"PKGM0014";

/// Directory record as it should appear on disk.
pub struct Record<'a> {
    pub name: &'a str,
    pub relative_offset: i32,
    pub payload_size: i32,
}

/// Lay out `files` the way the packer does: records in order, then payloads
/// back to back in the same order.
pub fn pack(tag: &[u8; 8], files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut offset = 0i32;
    let records: Vec<Record> = files
        .iter()
        .map(|(name, data)| {
            let record = Record {
                name: *name,
                relative_offset: offset,
                payload_size: data.len() as i32,
            };
            offset += data.len() as i32;
            record
        })
        .collect();

    let mut out = pack_directory(tag, &records);
    for (_, data) in files {
        out.extend_from_slice(data);
    }
    out
}

/// Header and directory only, with arbitrary record values.
pub fn pack_directory(tag: &[u8; 8], records: &[Record]) -> Vec<u8> {
    let mut out = vec![0u8; 4];
    out.extend_from_slice(tag);
    out.extend_from_slice(&(records.len() as i32).to_le_bytes());
    for record in records {
        out.extend_from_slice(&(record.name.len() as i32).to_le_bytes());
        out.extend_from_slice(record.name.as_bytes());
        out.extend_from_slice(&record.relative_offset.to_le_bytes());
        out.extend_from_slice(&record.payload_size.to_le_bytes());
    }
    out
}

/// Size of the header plus directory for `names`.
pub fn directory_len(names: &[&str]) -> u64 {
    16 + names.iter().map(|n| 12 + n.len() as u64).sum::<u64>()
}

pub fn write_package(dir: &Path, file_name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, bytes).expect("write package");
    path
}
