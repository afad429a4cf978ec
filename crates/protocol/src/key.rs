//! Key metadata
//!
//! A [`Key`] is a confirmed credential; a [`NewKey`] is a pending invitation
//! that becomes a `Key` once the invitee confirms it. Neither carries secret
//! material, which lives in the authorization store and on the client.

use crate::binary::{invalid_data, wire_date, BinaryRead, BinaryWrite};
use crate::error::ProtocolError;
use crate::permission::Permission;
use crate::tlv::{read_all, record_size, TlvFields, TlvWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Longest name a TLV record can carry, in bytes
pub const MAX_NAME_LENGTH: usize = u16::MAX as usize;

/// Reject names too long to encode
pub fn validate_name(name: &str) -> Result<(), ProtocolError> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(ProtocolError::InvalidData(format!(
            "key name is {} bytes, at most {} allowed",
            name.len(),
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Which table a key identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyType {
    Key,
    NewKey,
}

impl KeyType {
    pub fn from_byte(byte: u8) -> io::Result<Self> {
        match byte {
            0x00 => Ok(KeyType::Key),
            0x01 => Ok(KeyType::NewKey),
            _ => Err(invalid_data(format!("invalid key type: {}", byte))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            KeyType::Key => 0x00,
            KeyType::NewKey => 0x01,
        }
    }
}

/// A confirmed key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
    pub permission: Permission,
}

impl Key {
    /// Dates are truncated to wire precision so the key encodes without loss
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        created: DateTime<Utc>,
        permission: Permission,
    ) -> Self {
        Key {
            id,
            name: name.into(),
            created: wire_date(created),
            permission: permission.at_wire_precision(),
        }
    }
}

mod key_tag {
    pub const ID: u8 = 0x01;
    pub const NAME: u8 = 0x02;
    pub const CREATED: u8 = 0x03;
    pub const PERMISSION: u8 = 0x04;
    pub const ALL: &[u8] = &[ID, NAME, CREATED, PERMISSION];
}

impl BinaryRead for Key {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, key_tag::ALL)?;
        Ok(Key {
            id: fields.uuid(key_tag::ID, "id")?,
            name: fields.string(key_tag::NAME, "name")?,
            created: fields.date(key_tag::CREATED, "created")?,
            permission: fields.value(key_tag::PERMISSION, "permission")?,
        })
    }
}

impl BinaryWrite for Key {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(key_tag::ID, &self.id)?;
        tlv.string(key_tag::NAME, &self.name)?;
        tlv.date(key_tag::CREATED, &self.created)?;
        tlv.value(key_tag::PERMISSION, &self.permission)
    }

    fn serialized_size(&self) -> usize {
        record_size(16)
            + record_size(self.name.len())
            + record_size(8)
            + record_size(self.permission.serialized_size())
    }
}

/// A pending key invitation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKey {
    pub id: Uuid,
    pub name: String,
    pub permission: Permission,
    pub created: DateTime<Utc>,
    /// The invitation must be confirmed before this instant
    pub expiration: DateTime<Utc>,
}

impl NewKey {
    /// Dates are truncated to wire precision, as in [`Key::new`]
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        permission: Permission,
        created: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> Self {
        NewKey {
            id,
            name: name.into(),
            permission: permission.at_wire_precision(),
            created: wire_date(created),
            expiration: wire_date(expiration),
        }
    }

    pub fn is_expired(&self, now: &DateTime<Utc>) -> bool {
        *now >= self.expiration
    }

    /// The confirmed key this invitation turns into
    pub fn confirm(&self, created: DateTime<Utc>) -> Key {
        Key::new(self.id, self.name.clone(), created, self.permission.clone())
    }
}

mod new_key_tag {
    pub const ID: u8 = 0x01;
    pub const NAME: u8 = 0x02;
    pub const PERMISSION: u8 = 0x03;
    pub const CREATED: u8 = 0x04;
    pub const EXPIRATION: u8 = 0x05;
    pub const ALL: &[u8] = &[ID, NAME, PERMISSION, CREATED, EXPIRATION];
}

impl BinaryRead for NewKey {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, new_key_tag::ALL)?;
        Ok(NewKey {
            id: fields.uuid(new_key_tag::ID, "id")?,
            name: fields.string(new_key_tag::NAME, "name")?,
            permission: fields.value(new_key_tag::PERMISSION, "permission")?,
            created: fields.date(new_key_tag::CREATED, "created")?,
            expiration: fields.date(new_key_tag::EXPIRATION, "expiration")?,
        })
    }
}

impl BinaryWrite for NewKey {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(new_key_tag::ID, &self.id)?;
        tlv.string(new_key_tag::NAME, &self.name)?;
        tlv.value(new_key_tag::PERMISSION, &self.permission)?;
        tlv.date(new_key_tag::CREATED, &self.created)?;
        tlv.date(new_key_tag::EXPIRATION, &self.expiration)
    }

    fn serialized_size(&self) -> usize {
        record_size(16)
            + record_size(self.name.len())
            + record_size(self.permission.serialized_size())
            + record_size(8)
            + record_size(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{Interval, Schedule, Weekdays};
    use chrono::{Duration, TimeZone};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn key() -> Key {
        Key {
            id: Uuid::new_v4(),
            name: "Front door".to_string(),
            created: created(),
            permission: Permission::Admin,
        }
    }

    #[test]
    fn test_key_roundtrip() {
        let key = key();
        let bytes = key.to_bytes().unwrap();
        assert_eq!(bytes.len(), key.serialized_size());
        assert_eq!(Key::from_bytes(&bytes).unwrap(), key);
    }

    #[test]
    fn test_new_key_roundtrip_with_schedule() {
        let new_key = NewKey {
            id: Uuid::new_v4(),
            name: "Cleaner".to_string(),
            permission: Permission::Scheduled(Schedule {
                expiry: created() + Duration::days(90),
                interval: Interval::new(480, 720).unwrap(),
                weekdays: Weekdays::ALL,
            }),
            created: created(),
            expiration: created() + Duration::days(1),
        };
        let bytes = new_key.to_bytes().unwrap();
        assert_eq!(bytes.len(), new_key.serialized_size());
        assert_eq!(NewKey::from_bytes(&bytes).unwrap(), new_key);
    }

    #[test]
    fn test_roundtrip_with_nanosecond_dates() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let key = Key::new(Uuid::new_v4(), "Garage", precise, Permission::Anytime);
        assert_eq!(key.created.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(Key::from_bytes(&key.to_bytes().unwrap()).unwrap(), key);

        let schedule = Schedule::new(precise + Duration::days(30), Interval::ANYTIME, Weekdays::ALL);
        let new_key = NewKey::new(
            Uuid::new_v4(),
            "Garage",
            Permission::Scheduled(schedule),
            precise,
            precise + Duration::nanoseconds(999),
        );
        assert_eq!(new_key.expiration, key.created);
        assert_eq!(NewKey::from_bytes(&new_key.to_bytes().unwrap()).unwrap(), new_key);

        let confirmed = new_key.confirm(precise + Duration::nanoseconds(1));
        assert_eq!(confirmed.created, key.created);
        assert_eq!(Key::from_bytes(&confirmed.to_bytes().unwrap()).unwrap(), confirmed);
    }

    #[test]
    fn test_name_length_limit() {
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(matches!(
            validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)),
            Err(ProtocolError::InvalidData(_))
        ));
    }

    #[test]
    fn test_key_missing_field() {
        let mut buf = Vec::new();
        let mut tlv = TlvWriter::new(&mut buf);
        tlv.uuid(key_tag::ID, &Uuid::new_v4()).unwrap();
        tlv.string(key_tag::NAME, "No permission").unwrap();
        tlv.date(key_tag::CREATED, &created()).unwrap();
        let err = Key::from_bytes(&buf).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidData(ref m) if m.contains("permission")));
    }

    #[test]
    fn test_key_truncated() {
        let bytes = key().to_bytes().unwrap();
        for end in [0, 5, 19, bytes.len() - 1] {
            assert!(Key::from_bytes(&bytes[..end]).is_err(), "prefix {}", end);
        }
    }

    #[test]
    fn test_new_key_expiration() {
        let new_key = NewKey {
            id: Uuid::new_v4(),
            name: "Guest".to_string(),
            permission: Permission::Anytime,
            created: created(),
            expiration: created() + Duration::hours(1),
        };
        assert!(!new_key.is_expired(&created()));
        assert!(new_key.is_expired(&(created() + Duration::hours(1))));

        let key = new_key.confirm(created() + Duration::minutes(5));
        assert_eq!(key.id, new_key.id);
        assert_eq!(key.permission, Permission::Anytime);
    }

    #[test]
    fn test_key_type_bytes() {
        assert_eq!(KeyType::from_byte(0x01).unwrap(), KeyType::NewKey);
        assert!(KeyType::from_byte(0x02).is_err());
    }
}
