//! Spreadsheet collaborator.
//!
//! Bulk operations exchange flat positional CSV rows with the outside
//! world: transfer lists in, transfer and key reports out.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One row of a bulk transfer list: `[index, from, to, value, notes]`.
/// Addresses and values stay textual here; coercion happens at the point of
/// use so a bad row fails with its row index attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRow {
    pub index: u64,
    pub from: String,
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub notes: String,
}

/// One row of a key report: `[index, address, path]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRow {
    pub index: u64,
    pub address: String,
    pub path: String,
}

pub fn read_transfer_rows(path: &Path) -> Result<Vec<TransferRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn write_transfer_rows(path: &Path, rows: &[TransferRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_key_rows(path: &Path, rows: &[KeyRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transfers.csv");
        let rows = vec![
            TransferRow {
                index: 1,
                from: "0xaa".into(),
                to: "0xbb".into(),
                value: "0.5".into(),
                notes: "first".into(),
            },
            TransferRow {
                index: 2,
                from: "0xaa".into(),
                to: "0xcc".into(),
                value: "1.25".into(),
                notes: String::new(),
            },
        ];
        write_transfer_rows(&path, &rows).unwrap();

        let read = read_transfer_rows(&path).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].to, "0xbb");
        assert_eq!(read[1].value, "1.25");
    }

    #[test]
    fn key_rows_are_written_with_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.csv");
        write_key_rows(
            &path,
            &[KeyRow {
                index: 1,
                address: "0xaa".into(),
                path: "key_1.json".into(),
            }],
        )
        .unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.starts_with("index,address,path"));
    }
}
