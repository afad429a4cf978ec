//! Plaintexts of the list-keys and list-events notifications
//!
//! Both are a stream of repeated records, one record per element, so the
//! list itself is not bounded by the 16-bit record length.

use crate::binary::{invalid_data, BinaryRead, BinaryWrite};
use crate::event::LockEvent;
use crate::key::{Key, NewKey};
use crate::tlv::{read_all, record_size, records, TlvWriter};
use std::io::{self, Read, Write};

const KEY: u8 = 0x01;
const NEW_KEY: u8 = 0x02;
const EVENT: u8 = 0x01;

/// Confirmed keys and pending invitations of a lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeysList {
    pub keys: Vec<Key>,
    pub new_keys: Vec<NewKey>,
}

impl KeysList {
    pub fn len(&self) -> usize {
        self.keys.len() + self.new_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.new_keys.is_empty()
    }
}

impl BinaryRead for KeysList {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let mut list = KeysList::default();
        for record in records(&bytes) {
            let record = record?;
            match record.tag {
                KEY => list.keys.push(Key::from_bytes(record.value)?),
                NEW_KEY => list.new_keys.push(NewKey::from_bytes(record.value)?),
                other => return Err(invalid_data(format!("unknown key list tag {:#04x}", other))),
            }
        }
        Ok(list)
    }
}

impl BinaryWrite for KeysList {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        for key in &self.keys {
            tlv.value(KEY, key)?;
        }
        for new_key in &self.new_keys {
            tlv.value(NEW_KEY, new_key)?;
        }
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        self.keys
            .iter()
            .map(|k| record_size(k.serialized_size()))
            .chain(self.new_keys.iter().map(|k| record_size(k.serialized_size())))
            .sum()
    }
}

/// A page of events, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsList(pub Vec<LockEvent>);

impl BinaryRead for EventsList {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let mut events = Vec::new();
        for record in records(&bytes) {
            let record = record?;
            if record.tag != EVENT {
                return Err(invalid_data(format!(
                    "unknown event list tag {:#04x}",
                    record.tag
                )));
            }
            events.push(LockEvent::from_bytes(record.value)?);
        }
        Ok(EventsList(events))
    }
}

impl BinaryWrite for EventsList {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        for event in &self.0 {
            tlv.value(EVENT, event)?;
        }
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        self.0
            .iter()
            .map(|e| record_size(e.serialized_size()))
            .sum()
    }
}
