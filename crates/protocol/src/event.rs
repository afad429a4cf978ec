//! Lock audit events
//!
//! Every event is a TLV message whose first field names the variant:
//!
//! | Tag  | Field         | Variants                        |
//! |------|---------------|---------------------------------|
//! | 0x01 | type          | all                             |
//! | 0x02 | id            | all                             |
//! | 0x03 | date          | all                             |
//! | 0x04 | key           | all                             |
//! | 0x05 | action        | unlock                          |
//! | 0x06 | new key       | create new key, confirm new key |
//! | 0x07 | removed key   | remove key                      |
//! | 0x08 | key type      | remove key                      |

use crate::binary::{invalid_data, wire_date, BinaryRead, BinaryWrite};
use crate::information::UnlockAction;
use crate::key::KeyType;
use crate::tlv::{read_all, record_size, TlvFields, TlvWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Variant discriminant carried in the type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockEventType {
    Setup,
    Unlock,
    CreateNewKey,
    ConfirmNewKey,
    RemoveKey,
}

impl LockEventType {
    pub fn from_byte(byte: u8) -> io::Result<Self> {
        match byte {
            0x00 => Ok(LockEventType::Setup),
            0x01 => Ok(LockEventType::Unlock),
            0x02 => Ok(LockEventType::CreateNewKey),
            0x03 => Ok(LockEventType::ConfirmNewKey),
            0x04 => Ok(LockEventType::RemoveKey),
            _ => Err(invalid_data(format!("invalid event type: {}", byte))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            LockEventType::Setup => 0x00,
            LockEventType::Unlock => 0x01,
            LockEventType::CreateNewKey => 0x02,
            LockEventType::ConfirmNewKey => 0x03,
            LockEventType::RemoveKey => 0x04,
        }
    }
}

/// The lock was set up by its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupEvent {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub key: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEvent {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub key: Uuid,
    pub action: UnlockAction,
}

/// `key` invited `new_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNewKeyEvent {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub key: Uuid,
    pub new_key: Uuid,
}

/// The invitation `new_key` was confirmed as `key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmNewKeyEvent {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub key: Uuid,
    pub new_key: Uuid,
}

/// `key` removed `removed_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveKeyEvent {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub key: Uuid,
    pub removed_key: Uuid,
    pub key_type: KeyType,
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockEvent {
    Setup(SetupEvent),
    Unlock(UnlockEvent),
    CreateNewKey(CreateNewKeyEvent),
    ConfirmNewKey(ConfirmNewKeyEvent),
    RemoveKey(RemoveKeyEvent),
}

/// Constructors assign a fresh identifier and truncate `date` to wire
/// precision, so a recorded event reads back exactly as stored.
impl LockEvent {
    pub fn setup(date: DateTime<Utc>, key: Uuid) -> Self {
        LockEvent::Setup(SetupEvent {
            id: Uuid::new_v4(),
            date: wire_date(date),
            key,
        })
    }

    pub fn unlock(date: DateTime<Utc>, key: Uuid, action: UnlockAction) -> Self {
        LockEvent::Unlock(UnlockEvent {
            id: Uuid::new_v4(),
            date: wire_date(date),
            key,
            action,
        })
    }

    pub fn create_new_key(date: DateTime<Utc>, key: Uuid, new_key: Uuid) -> Self {
        LockEvent::CreateNewKey(CreateNewKeyEvent {
            id: Uuid::new_v4(),
            date: wire_date(date),
            key,
            new_key,
        })
    }

    pub fn confirm_new_key(date: DateTime<Utc>, key: Uuid, new_key: Uuid) -> Self {
        LockEvent::ConfirmNewKey(ConfirmNewKeyEvent {
            id: Uuid::new_v4(),
            date: wire_date(date),
            key,
            new_key,
        })
    }

    pub fn remove_key(
        date: DateTime<Utc>,
        key: Uuid,
        removed_key: Uuid,
        key_type: KeyType,
    ) -> Self {
        LockEvent::RemoveKey(RemoveKeyEvent {
            id: Uuid::new_v4(),
            date: wire_date(date),
            key,
            removed_key,
            key_type,
        })
    }

    pub fn event_type(&self) -> LockEventType {
        match self {
            LockEvent::Setup(_) => LockEventType::Setup,
            LockEvent::Unlock(_) => LockEventType::Unlock,
            LockEvent::CreateNewKey(_) => LockEventType::CreateNewKey,
            LockEvent::ConfirmNewKey(_) => LockEventType::ConfirmNewKey,
            LockEvent::RemoveKey(_) => LockEventType::RemoveKey,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            LockEvent::Setup(e) => e.id,
            LockEvent::Unlock(e) => e.id,
            LockEvent::CreateNewKey(e) => e.id,
            LockEvent::ConfirmNewKey(e) => e.id,
            LockEvent::RemoveKey(e) => e.id,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            LockEvent::Setup(e) => e.date,
            LockEvent::Unlock(e) => e.date,
            LockEvent::CreateNewKey(e) => e.date,
            LockEvent::ConfirmNewKey(e) => e.date,
            LockEvent::RemoveKey(e) => e.date,
        }
    }

    /// The key that performed the action
    pub fn key(&self) -> Uuid {
        match self {
            LockEvent::Setup(e) => e.key,
            LockEvent::Unlock(e) => e.key,
            LockEvent::CreateNewKey(e) => e.key,
            LockEvent::ConfirmNewKey(e) => e.key,
            LockEvent::RemoveKey(e) => e.key,
        }
    }
}

mod tag {
    pub const TYPE: u8 = 0x01;
    pub const ID: u8 = 0x02;
    pub const DATE: u8 = 0x03;
    pub const KEY: u8 = 0x04;
    pub const ACTION: u8 = 0x05;
    pub const NEW_KEY: u8 = 0x06;
    pub const REMOVED_KEY: u8 = 0x07;
    pub const KEY_TYPE: u8 = 0x08;
}

impl LockEventType {
    fn tags(self) -> &'static [u8] {
        use tag::*;
        match self {
            LockEventType::Setup => &[TYPE, ID, DATE, KEY],
            LockEventType::Unlock => &[TYPE, ID, DATE, KEY, ACTION],
            LockEventType::CreateNewKey | LockEventType::ConfirmNewKey => {
                &[TYPE, ID, DATE, KEY, NEW_KEY]
            }
            LockEventType::RemoveKey => &[TYPE, ID, DATE, KEY, REMOVED_KEY, KEY_TYPE],
        }
    }
}

impl BinaryRead for LockEvent {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let all_tags: Vec<u8> = (tag::TYPE..=tag::KEY_TYPE).collect();
        let fields = TlvFields::parse(&bytes, &all_tags)?;
        let event_type = LockEventType::from_byte(fields.u8(tag::TYPE, "type")?)?;

        // reject fields belonging to another variant
        let allowed = event_type.tags();
        if let Some(stray) = all_tags
            .iter()
            .find(|t| !allowed.contains(*t) && fields.get(**t).is_some())
        {
            return Err(invalid_data(format!(
                "field {:#04x} not valid for {:?} event",
                stray, event_type
            )));
        }

        let id = fields.uuid(tag::ID, "id")?;
        let date = fields.date(tag::DATE, "date")?;
        let key = fields.uuid(tag::KEY, "key")?;

        Ok(match event_type {
            LockEventType::Setup => LockEvent::Setup(SetupEvent { id, date, key }),
            LockEventType::Unlock => LockEvent::Unlock(UnlockEvent {
                id,
                date,
                key,
                action: UnlockAction::from_byte(fields.u8(tag::ACTION, "action")?)?,
            }),
            LockEventType::CreateNewKey => LockEvent::CreateNewKey(CreateNewKeyEvent {
                id,
                date,
                key,
                new_key: fields.uuid(tag::NEW_KEY, "new key")?,
            }),
            LockEventType::ConfirmNewKey => LockEvent::ConfirmNewKey(ConfirmNewKeyEvent {
                id,
                date,
                key,
                new_key: fields.uuid(tag::NEW_KEY, "new key")?,
            }),
            LockEventType::RemoveKey => LockEvent::RemoveKey(RemoveKeyEvent {
                id,
                date,
                key,
                removed_key: fields.uuid(tag::REMOVED_KEY, "removed key")?,
                key_type: KeyType::from_byte(fields.u8(tag::KEY_TYPE, "key type")?)?,
            }),
        })
    }
}

impl BinaryWrite for LockEvent {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.u8(tag::TYPE, self.event_type().to_byte())?;
        tlv.uuid(tag::ID, &self.id())?;
        tlv.date(tag::DATE, &self.date())?;
        tlv.uuid(tag::KEY, &self.key())?;
        match self {
            LockEvent::Setup(_) => Ok(()),
            LockEvent::Unlock(e) => tlv.u8(tag::ACTION, e.action.to_byte()),
            LockEvent::CreateNewKey(e) => tlv.uuid(tag::NEW_KEY, &e.new_key),
            LockEvent::ConfirmNewKey(e) => tlv.uuid(tag::NEW_KEY, &e.new_key),
            LockEvent::RemoveKey(e) => {
                tlv.uuid(tag::REMOVED_KEY, &e.removed_key)?;
                tlv.u8(tag::KEY_TYPE, e.key_type.to_byte())
            }
        }
    }

    fn serialized_size(&self) -> usize {
        let common = record_size(1) + record_size(16) + record_size(8) + record_size(16);
        common
            + match self {
                LockEvent::Setup(_) => 0,
                LockEvent::Unlock(_) => record_size(1),
                LockEvent::CreateNewKey(_) | LockEvent::ConfirmNewKey(_) => record_size(16),
                LockEvent::RemoveKey(_) => record_size(16) + record_size(1),
            }
    }
}
