//! Tabular export of the canonical stop collection.
//!
//! Column mapping: stop order ← `stopNumber`, address ← `address`,
//! postal code ← `cep`, city ← `city`. Output is RFC 4180 CSV.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use thiserror::Error;

use crate::models::DeliveryStop;

pub const EXPORT_HEADERS: [&str; 4] = ["Stop Order", "Address", "Postal Code", "City"];

/// Give up looking for a free file name after this many suffixes.
const MAX_NAME_ATTEMPTS: u32 = 1000;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No free export file name in {0}")]
    NameExhausted(PathBuf),
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow<'a> {
    #[serde(rename = "Stop Order")]
    pub stop_order: &'a str,
    #[serde(rename = "Address")]
    pub address: &'a str,
    #[serde(rename = "Postal Code")]
    pub postal_code: &'a str,
    #[serde(rename = "City")]
    pub city: &'a str,
}

impl<'a> From<&'a DeliveryStop> for ExportRow<'a> {
    fn from(stop: &'a DeliveryStop) -> Self {
        Self {
            stop_order: stop.stop_number(),
            address: stop.address(),
            postal_code: stop.cep(),
            city: stop.city(),
        }
    }
}

impl ExportRow<'_> {
    fn fields(&self) -> [&str; 4] {
        [self.stop_order, self.address, self.postal_code, self.city]
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn write_record<W: Write>(out: &mut W, fields: &[&str]) -> io::Result<()> {
    let line: Vec<String> = fields.iter().map(|f| escape_csv(f)).collect();
    write!(out, "{}\r\n", line.join(","))
}

/// Write a header line plus one row per stop, in collection order.
pub fn write_csv<W: Write>(stops: &[DeliveryStop], out: &mut W) -> io::Result<()> {
    write_record(out, &EXPORT_HEADERS)?;
    for stop in stops {
        write_record(out, &ExportRow::from(stop).fields())?;
    }
    Ok(())
}

/// `route_manifest_<YYYYMMDD_HHMMSS>.csv`, with `_<n>` before the extension for n > 0.
pub fn export_file_name<Tz: TimeZone>(at: &DateTime<Tz>, suffix: u32) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let stamp = at.format("%Y%m%d_%H%M%S");
    if suffix == 0 {
        format!("route_manifest_{stamp}.csv")
    } else {
        format!("route_manifest_{stamp}_{suffix}.csv")
    }
}

/// Create a new export file in `dir`, never overwriting an existing one.
fn create_unique<Tz: TimeZone>(dir: &Path, at: &DateTime<Tz>) -> Result<(PathBuf, File), ExportError>
where
    Tz::Offset: std::fmt::Display,
{
    for suffix in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(export_file_name(at, suffix));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(ExportError::NameExhausted(dir.to_path_buf()))
}

fn export_at<Tz: TimeZone>(
    stops: &[DeliveryStop],
    dir: &Path,
    at: &DateTime<Tz>,
) -> Result<PathBuf, ExportError>
where
    Tz::Offset: std::fmt::Display,
{
    std::fs::create_dir_all(dir)?;
    let (path, file) = create_unique(dir, at)?;

    let mut out = BufWriter::new(file);
    write_csv(stops, &mut out)?;
    out.flush()?;

    tracing::info!(path = %path.display(), rows = stops.len(), "Exported stop list");
    Ok(path)
}

/// Write the stops to a timestamped CSV in `dir` and return its path.
pub fn export_to_dir(stops: &[DeliveryStop], dir: &Path) -> Result<PathBuf, ExportError> {
    export_at(stops, dir, &Local::now())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::RawStop;
    use crate::pipeline::extraction::normalize_stop;

    fn stop(number: &str, address: &str, cep: &str, city: &str) -> DeliveryStop {
        normalize_stop(RawStop {
            stop_number: number.into(),
            address: address.into(),
            cep: cep.into(),
            city: city.into(),
        })
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap()
    }

    #[test]
    fn row_maps_columns() {
        let s = stop("5", "Rua A, 10", "01310100", "São Paulo");
        let row = ExportRow::from(&s);
        assert_eq!(row.stop_order, "5");
        assert_eq!(row.address, "Rua A, 10");
        assert_eq!(row.postal_code, "01310-100");
        assert_eq!(row.city, "São Paulo");
    }

    #[test]
    fn csv_has_header_and_quotes_when_needed() {
        let stops = vec![
            stop("1", "Rua A, 10", "01310100", "SP"),
            stop("2", "Rua \"B\"", "", "Rio"),
            stop("3", "Av. C", "", "Belo\nHorizonte"),
        ];
        let mut out = Vec::new();
        write_csv(&stops, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Stop Order,Address,Postal Code,City\r\n\
             1,\"Rua A, 10\",01310-100,SP\r\n\
             2,\"Rua \"\"B\"\"\",,Rio\r\n\
             3,Av. C,,\"Belo\nHorizonte\"\r\n"
        );
    }

    #[test]
    fn empty_collection_writes_header_only() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(out, b"Stop Order,Address,Postal Code,City\r\n");
    }

    #[test]
    fn file_name_includes_timestamp() {
        assert_eq!(export_file_name(&fixed_time(), 0), "route_manifest_20260307_090501.csv");
        assert_eq!(export_file_name(&fixed_time(), 2), "route_manifest_20260307_090501_2.csv");
    }

    #[test]
    fn export_creates_dir_and_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("exports");
        let stops = vec![stop("1", "Rua A", "", "SP")];

        let first = export_at(&stops, &dir, &fixed_time()).unwrap();
        let second = export_at(&[], &dir, &fixed_time()).unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("route_manifest_20260307_090501_1.csv"));
        let first_text = std::fs::read_to_string(&first).unwrap();
        assert!(first_text.contains("1,Rua A,,SP"));
        let second_text = std::fs::read_to_string(&second).unwrap();
        assert_eq!(second_text, "Stop Order,Address,Postal Code,City\r\n");
    }

    #[test]
    fn export_to_dir_returns_existing_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = export_to_dir(&[stop("1", "Rua A", "", "SP")], tmp.path()).unwrap();
        assert!(path.exists());
        assert!(path.starts_with(tmp.path()));
    }
}
