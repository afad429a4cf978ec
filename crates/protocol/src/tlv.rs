//! Tag-length-value records
//!
//! Variable and extensible payloads are a flat sequence of records:
//!
//! ```text
//! ┌──────────┬─────────────────┬──────────────────┐
//! │ Tag (1B) │ Length (2B, LE) │ Value (Length B) │
//! └──────────┴─────────────────┴──────────────────┘
//! ```
//!
//! Nested values (a permission inside a key, a key inside a key list) are
//! stored as the complete encoding of the inner value. Numbers follow the
//! little-endian conventions of [`crate::binary`].

use crate::binary::{
    date_from_reference_seconds, date_to_reference_seconds, BinaryRead, BinaryWrite,
};
use crate::error::ProtocolError;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use uuid::Uuid;

/// Bytes taken by the tag and length fields
pub const TLV_HEADER_LENGTH: usize = 3;

/// Largest value a single record can carry
pub const MAX_VALUE_LENGTH: usize = u16::MAX as usize;

/// Encoded size of a record carrying `value_length` bytes
pub const fn record_size(value_length: usize) -> usize {
    TLV_HEADER_LENGTH + value_length
}

/// A single decoded record borrowing from the input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvRecord<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

/// Iterator over the records of a buffer
///
/// Yields an error and stops at the first truncated record.
#[derive(Debug, Clone)]
pub struct TlvRecords<'a> {
    bytes: &'a [u8],
    failed: bool,
}

/// Iterate the records of `bytes`
pub fn records(bytes: &[u8]) -> TlvRecords<'_> {
    TlvRecords {
        bytes,
        failed: false,
    }
}

impl<'a> Iterator for TlvRecords<'a> {
    type Item = Result<TlvRecord<'a>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.bytes.is_empty() {
            return None;
        }
        if self.bytes.len() < TLV_HEADER_LENGTH {
            self.failed = true;
            return Some(Err(ProtocolError::InvalidData(format!(
                "truncated record header: {} bytes",
                self.bytes.len()
            ))));
        }
        let tag = self.bytes[0];
        let length = u16::from_le_bytes([self.bytes[1], self.bytes[2]]) as usize;
        let rest = &self.bytes[TLV_HEADER_LENGTH..];
        if rest.len() < length {
            self.failed = true;
            return Some(Err(ProtocolError::InvalidData(format!(
                "record {:#04x} declares {} bytes, {} available",
                tag,
                length,
                rest.len()
            ))));
        }
        let (value, remaining) = rest.split_at(length);
        self.bytes = remaining;
        Some(Ok(TlvRecord { tag, value }))
    }
}

/// Writes records to an underlying writer
pub struct TlvWriter<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> TlvWriter<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }

    /// Write a record with a raw value
    pub fn bytes(&mut self, tag: u8, value: &[u8]) -> io::Result<()> {
        if value.len() > MAX_VALUE_LENGTH {
            return Err(ProtocolError::ValueTooLong {
                tag,
                length: value.len(),
            }
            .into());
        }
        self.writer.write_all(&[tag])?;
        self.writer.write_all(&(value.len() as u16).to_le_bytes())?;
        self.writer.write_all(value)
    }

    pub fn u8(&mut self, tag: u8, value: u8) -> io::Result<()> {
        self.bytes(tag, &[value])
    }

    pub fn uuid(&mut self, tag: u8, value: &Uuid) -> io::Result<()> {
        self.bytes(tag, value.as_bytes())
    }

    pub fn date(&mut self, tag: u8, value: &DateTime<Utc>) -> io::Result<()> {
        self.bytes(tag, &date_to_reference_seconds(value).to_le_bytes())
    }

    pub fn string(&mut self, tag: u8, value: &str) -> io::Result<()> {
        self.bytes(tag, value.as_bytes())
    }

    /// Write a record whose value is the encoding of `value`
    pub fn value<T: BinaryWrite>(&mut self, tag: u8, value: &T) -> io::Result<()> {
        let encoded = value.to_bytes()?;
        self.bytes(tag, &encoded)
    }
}

/// Decoded records of a message with a fixed set of known tags
///
/// Unknown and duplicate tags are rejected at parse time so a message has
/// exactly one meaning.
#[derive(Debug)]
pub struct TlvFields<'a> {
    records: Vec<TlvRecord<'a>>,
}

impl<'a> TlvFields<'a> {
    pub fn parse(bytes: &'a [u8], known_tags: &[u8]) -> Result<Self, ProtocolError> {
        let mut parsed: Vec<TlvRecord<'a>> = Vec::new();
        for record in records(bytes) {
            let record = record?;
            if !known_tags.contains(&record.tag) {
                return Err(ProtocolError::InvalidData(format!(
                    "unknown tag {:#04x}",
                    record.tag
                )));
            }
            if parsed.iter().any(|r| r.tag == record.tag) {
                return Err(ProtocolError::InvalidData(format!(
                    "duplicate tag {:#04x}",
                    record.tag
                )));
            }
            parsed.push(record);
        }
        Ok(Self { records: parsed })
    }

    pub fn get(&self, tag: u8) -> Option<&'a [u8]> {
        self.records.iter().find(|r| r.tag == tag).map(|r| r.value)
    }

    pub fn required(&self, tag: u8, name: &str) -> Result<&'a [u8], ProtocolError> {
        self.get(tag)
            .ok_or_else(|| ProtocolError::InvalidData(format!("missing field '{}'", name)))
    }

    pub fn uuid(&self, tag: u8, name: &str) -> Result<Uuid, ProtocolError> {
        uuid_from_slice(self.required(tag, name)?)
    }

    pub fn u8(&self, tag: u8, name: &str) -> Result<u8, ProtocolError> {
        match self.required(tag, name)? {
            [value] => Ok(*value),
            other => Err(ProtocolError::InvalidData(format!(
                "field '{}' must be 1 byte, got {}",
                name,
                other.len()
            ))),
        }
    }

    pub fn optional_u8(&self, tag: u8, name: &str) -> Result<Option<u8>, ProtocolError> {
        match self.get(tag) {
            Some(_) => self.u8(tag, name).map(Some),
            None => Ok(None),
        }
    }

    pub fn date(&self, tag: u8, name: &str) -> Result<DateTime<Utc>, ProtocolError> {
        date_from_slice(self.required(tag, name)?)
    }

    pub fn optional_date(
        &self,
        tag: u8,
        name: &str,
    ) -> Result<Option<DateTime<Utc>>, ProtocolError> {
        match self.get(tag) {
            Some(_) => self.date(tag, name).map(Some),
            None => Ok(None),
        }
    }

    pub fn string(&self, tag: u8, name: &str) -> Result<String, ProtocolError> {
        let bytes = self.required(tag, name)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::InvalidData(format!("field '{}' is not UTF-8", name)))
    }

    /// Decode a nested value
    pub fn value<T: BinaryRead>(&self, tag: u8, name: &str) -> Result<T, ProtocolError> {
        T::from_bytes(self.required(tag, name)?)
    }

    pub fn optional_value<T: BinaryRead>(&self, tag: u8) -> Result<Option<T>, ProtocolError> {
        self.get(tag).map(T::from_bytes).transpose()
    }
}

/// Decode a raw 16-byte UUID value
pub fn uuid_from_slice(bytes: &[u8]) -> Result<Uuid, ProtocolError> {
    Uuid::from_slice(bytes)
        .map_err(|_| ProtocolError::InvalidData(format!("UUID must be 16 bytes, got {}", bytes.len())))
}

/// Decode an 8-byte date value
pub fn date_from_slice(bytes: &[u8]) -> Result<DateTime<Utc>, ProtocolError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ProtocolError::InvalidData(format!("date must be 8 bytes, got {}", bytes.len())))?;
    Ok(date_from_reference_seconds(f64::from_le_bytes(raw))?)
}

/// Read the remainder of a reader, for TLV messages that span the whole buffer
pub fn read_all<R: io::Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}
