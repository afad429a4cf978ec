//! Traits for binary serialization and deserialization

use crate::error::ProtocolError;
use std::io::{self, Cursor, Read, Write};

/// Trait for types that can be read from binary format
pub trait BinaryRead: Sized {
    /// Read this type from a binary reader
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self>;

    /// Decode a complete buffer
    ///
    /// The buffer must contain exactly one value. Short input and trailing
    /// bytes are both rejected as invalid data.
    fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = Cursor::new(bytes);
        let value = Self::read_from(&mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(ProtocolError::InvalidData(format!(
                "{} trailing bytes after value",
                bytes.len() - consumed
            )));
        }
        Ok(value)
    }
}

/// Trait for types that can be written to binary format
pub trait BinaryWrite {
    /// Write this type to a binary writer
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Get the size in bytes when serialized
    fn serialized_size(&self) -> usize;

    /// Encode into a freshly allocated buffer
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// Trait for types that support both reading and writing
pub trait BinarySerialize: BinaryRead + BinaryWrite {}

// Blanket implementation
impl<T: BinaryRead + BinaryWrite> BinarySerialize for T {}
