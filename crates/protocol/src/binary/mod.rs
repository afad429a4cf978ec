//! Binary serialization infrastructure for lock characteristics
//!
//! This module provides traits and utilities for reading and writing
//! binary data in the lock wire format. All multi-byte integers and
//! floating point values use little-endian byte order. UUIDs are written
//! as their raw 16 bytes and dates as a little-endian `f64` holding the
//! seconds elapsed since 2001-01-01T00:00:00Z.

use chrono::{DateTime, Utc};
use std::io::{self, Read, Write};
use uuid::Uuid;

pub mod traits;

pub use traits::{BinaryRead, BinarySerialize, BinaryWrite};

/// Seconds between the Unix epoch and the 2001-01-01 reference date
pub const REFERENCE_DATE_UNIX_OFFSET: i64 = 978_307_200;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Read a u8 from a reader
pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a u16 (little-endian) from a reader
pub fn read_u16_le<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a u32 (little-endian) from a reader
pub fn read_u32_le<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a u64 (little-endian) from a reader
pub fn read_u64_le<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read an f64 (little-endian) from a reader
pub fn read_f64_le<R: Read>(reader: &mut R) -> io::Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read exactly n bytes from a reader
pub fn read_bytes<R: Read>(reader: &mut R, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a fixed-size array from a reader
pub fn read_array<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Read a UUID stored as raw 16 bytes
pub fn read_uuid<R: Read>(reader: &mut R) -> io::Result<Uuid> {
    Ok(Uuid::from_bytes(read_array(reader)?))
}

/// Read a date stored as seconds since the reference date
pub fn read_date<R: Read>(reader: &mut R) -> io::Result<DateTime<Utc>> {
    date_from_reference_seconds(read_f64_le(reader)?)
}

/// Write a u8 to a writer
pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

/// Write a u16 (little-endian) to a writer
pub fn write_u16_le<W: Write>(writer: &mut W, value: u16) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a u32 (little-endian) to a writer
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a u64 (little-endian) to a writer
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write an f64 (little-endian) to a writer
pub fn write_f64_le<W: Write>(writer: &mut W, value: f64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write bytes to a writer
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes)
}

/// Write a UUID as raw 16 bytes
pub fn write_uuid<W: Write>(writer: &mut W, value: &Uuid) -> io::Result<()> {
    writer.write_all(value.as_bytes())
}

/// Write a date as seconds since the reference date
pub fn write_date<W: Write>(writer: &mut W, value: &DateTime<Utc>) -> io::Result<()> {
    write_f64_le(writer, date_to_reference_seconds(value))
}

/// Convert a date to seconds since the reference date
///
/// Precision is limited to microseconds; anything finer is truncated.
pub fn date_to_reference_seconds(date: &DateTime<Utc>) -> f64 {
    let micros = date.timestamp_micros() - REFERENCE_DATE_UNIX_OFFSET * MICROS_PER_SECOND;
    micros as f64 / MICROS_PER_SECOND as f64
}

/// Convert seconds since the reference date back to a date
///
/// The value is rounded to the nearest microsecond, which recovers any date
/// written by [`date_to_reference_seconds`] exactly.
pub fn date_from_reference_seconds(seconds: f64) -> io::Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid date value: {}", seconds),
        ));
    }
    let micros = (seconds * MICROS_PER_SECOND as f64).round();
    if micros.abs() > (i64::MAX / 2) as f64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Date out of range: {}", seconds),
        ));
    }
    let unix_micros = micros as i64 + REFERENCE_DATE_UNIX_OFFSET * MICROS_PER_SECOND;
    let secs = unix_micros.div_euclid(MICROS_PER_SECOND);
    let nanos = (unix_micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Date out of range: {}", seconds),
        )
    })
}

/// Build an `InvalidData` I/O error carrying a protocol error
pub fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        crate::ProtocolError::InvalidData(message.into()),
    )
}

/// Truncate a date to the precision carried on the wire
pub fn wire_date(date: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::SubsecRound;
    date.trunc_subsecs(6)
}
