//! Delimited snapshot file reading.
//!
//! Files are UTF-8, header-first. Fields and headers are trimmed, blank
//! lines are skipped, and a row whose field count differs from the header
//! is a structural error.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use sha2::{Digest, Sha256};

use crate::schema::RawRow;

/// Streaming row reader over one snapshot file.
pub struct SnapshotReader<R: Read> {
    headers: StringRecord,
    records: StringRecordsIntoIter<R>,
}

impl SnapshotReader<File> {
    pub fn open(path: &Path, delimiter: u8) -> Result<Self, csv::Error> {
        let file = File::open(path)?;
        Self::from_reader(file, delimiter)
    }
}

impl<R: Read> SnapshotReader<R> {
    pub fn from_reader(reader: R, delimiter: u8) -> Result<Self, csv::Error> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        Ok(Self {
            headers,
            records: rdr.into_records(),
        })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }
}

impl<R: Read> Iterator for SnapshotReader<R> {
    type Item = Result<RawRow, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let headers = &self.headers;
        self.records.next().map(|record| {
            record.map(|record| RawRow::from_pairs(headers.iter().zip(record.iter())))
        })
    }
}

/// Hex SHA-256 of the file contents, streamed.
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
