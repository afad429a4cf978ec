//! Characteristic request payloads
//!
//! ```text
//! Setup:          EncryptedData(SetupRequest), setup secret
//! Unlock:         0x01 identifier ‖ 0x02 action ‖ 0x03 authentication
//! CreateNewKey:   0x01 identifier ‖ 0x02 EncryptedData(CreateNewKeyRequest), grantor key
//! ConfirmNewKey:  0x01 identifier ‖ 0x02 EncryptedData(ConfirmNewKeyRequest), invitation secret
//! RemoveKey:      0x01 identifier ‖ 0x02 EncryptedData(RemoveKeyRequest), requester key
//! ListKeys:       0x01 identifier ‖ 0x02 authentication
//! ListEvents:     0x01 identifier ‖ 0x02 authentication ‖ 0x03 fetch request (optional)
//! ```
//!
//! `identifier` is always the key the lock should authenticate the request
//! against; for confirm-new-key that is the pending invitation.

use chrono::{DateTime, Utc};
use smartlock_crypto::{Authentication, CryptoError, EncryptedData, KeyData};
use smartlock_protocol::binary::{read_uuid, write_uuid, BinaryRead, BinarySerialize, BinaryWrite};
use smartlock_protocol::tlv::{read_all, record_size, TlvFields, TlvWriter};
use smartlock_protocol::{
    validate_name, wire_date, FetchRequest, KeyType, Permission, ProtocolError, UnlockAction,
};
use std::fmt;
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use uuid::Uuid;

/// Plaintext of the setup characteristic, fixed 48 bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequest {
    /// Identifier of the owner key
    pub id: Uuid,
    /// Secret of the owner key
    pub secret: KeyData,
}

impl SetupRequest {
    pub const LENGTH: usize = 16 + KeyData::LENGTH;

    pub fn new(id: Uuid, secret: KeyData) -> Self {
        SetupRequest { id, secret }
    }

    /// A fresh owner identifier and secret
    pub fn generate() -> Self {
        SetupRequest {
            id: Uuid::new_v4(),
            secret: KeyData::generate(),
        }
    }
}

impl BinaryRead for SetupRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let id = read_uuid(reader)?;
        let secret = KeyData::read_from(reader)?;
        Ok(SetupRequest { id, secret })
    }
}

impl BinaryWrite for SetupRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_uuid(writer, &self.id)?;
        self.secret.write_to(writer)
    }

    fn serialized_size(&self) -> usize {
        Self::LENGTH
    }
}

/// Setup characteristic: the setup request encrypted with the factory setup secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupCharacteristic {
    pub encrypted: EncryptedData,
}

impl SetupCharacteristic {
    pub fn new(request: &SetupRequest, setup_secret: &KeyData) -> Result<Self, CryptoError> {
        Ok(SetupCharacteristic {
            encrypted: EncryptedData::encrypt_value(request, setup_secret)?,
        })
    }

    pub fn decrypt(&self, setup_secret: &KeyData) -> Result<SetupRequest, CryptoError> {
        self.encrypted.decrypt_value(setup_secret)
    }
}

impl BinaryRead for SetupCharacteristic {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(SetupCharacteristic {
            encrypted: EncryptedData::read_from(reader)?,
        })
    }
}

impl BinaryWrite for SetupCharacteristic {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.encrypted.write_to(writer)
    }

    fn serialized_size(&self) -> usize {
        self.encrypted.serialized_size()
    }
}

/// Unlock characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockRequest {
    pub identifier: Uuid,
    pub action: UnlockAction,
    pub authentication: Authentication,
}

mod unlock_tag {
    pub const IDENTIFIER: u8 = 0x01;
    pub const ACTION: u8 = 0x02;
    pub const AUTHENTICATION: u8 = 0x03;
    pub const ALL: &[u8] = &[IDENTIFIER, ACTION, AUTHENTICATION];
}

impl UnlockRequest {
    pub fn new(identifier: Uuid, action: UnlockAction, key: &KeyData) -> Result<Self, CryptoError> {
        Ok(UnlockRequest {
            identifier,
            action,
            authentication: Authentication::new(key)?,
        })
    }
}

impl BinaryRead for UnlockRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, unlock_tag::ALL)?;
        Ok(UnlockRequest {
            identifier: fields.uuid(unlock_tag::IDENTIFIER, "identifier")?,
            action: UnlockAction::from_byte(fields.u8(unlock_tag::ACTION, "action")?)?,
            authentication: fields.value(unlock_tag::AUTHENTICATION, "authentication")?,
        })
    }
}

impl BinaryWrite for UnlockRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(unlock_tag::IDENTIFIER, &self.identifier)?;
        tlv.u8(unlock_tag::ACTION, self.action.to_byte())?;
        tlv.value(unlock_tag::AUTHENTICATION, &self.authentication)
    }

    fn serialized_size(&self) -> usize {
        record_size(16) + record_size(1) + record_size(Authentication::LENGTH)
    }
}

/// Plaintext of the create-new-key characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNewKeyRequest {
    pub id: Uuid,
    pub name: String,
    pub permission: Permission,
    pub expiration: DateTime<Utc>,
    /// Temporary secret the invitee confirms with
    pub secret: KeyData,
}

impl CreateNewKeyRequest {
    /// Fails when `name` is too long to encode. Dates are truncated to wire
    /// precision.
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        permission: Permission,
        expiration: DateTime<Utc>,
        secret: KeyData,
    ) -> Result<Self, ProtocolError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            id,
            name,
            permission: permission.at_wire_precision(),
            expiration: wire_date(expiration),
            secret,
        })
    }
}

mod create_tag {
    pub const ID: u8 = 0x01;
    pub const NAME: u8 = 0x02;
    pub const PERMISSION: u8 = 0x03;
    pub const EXPIRATION: u8 = 0x04;
    pub const SECRET: u8 = 0x05;
    pub const ALL: &[u8] = &[ID, NAME, PERMISSION, EXPIRATION, SECRET];
}

impl BinaryRead for CreateNewKeyRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, create_tag::ALL)?;
        Ok(CreateNewKeyRequest {
            id: fields.uuid(create_tag::ID, "id")?,
            name: fields.string(create_tag::NAME, "name")?,
            permission: fields.value(create_tag::PERMISSION, "permission")?,
            expiration: fields.date(create_tag::EXPIRATION, "expiration")?,
            secret: fields.value(create_tag::SECRET, "secret")?,
        })
    }
}

impl BinaryWrite for CreateNewKeyRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(create_tag::ID, &self.id)?;
        tlv.string(create_tag::NAME, &self.name)?;
        tlv.value(create_tag::PERMISSION, &self.permission)?;
        tlv.date(create_tag::EXPIRATION, &self.expiration)?;
        tlv.value(create_tag::SECRET, &self.secret)
    }

    fn serialized_size(&self) -> usize {
        record_size(16)
            + record_size(self.name.len())
            + record_size(self.permission.serialized_size())
            + record_size(8)
            + record_size(KeyData::LENGTH)
    }
}

/// Plaintext of the confirm-new-key characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmNewKeyRequest {
    /// Permanent secret replacing the invitation's temporary one
    pub secret: KeyData,
}

const CONFIRM_SECRET: u8 = 0x01;

impl BinaryRead for ConfirmNewKeyRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, &[CONFIRM_SECRET])?;
        Ok(ConfirmNewKeyRequest {
            secret: fields.value(CONFIRM_SECRET, "secret")?,
        })
    }
}

impl BinaryWrite for ConfirmNewKeyRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        TlvWriter::new(writer).value(CONFIRM_SECRET, &self.secret)
    }

    fn serialized_size(&self) -> usize {
        record_size(KeyData::LENGTH)
    }
}

/// Plaintext of the remove-key characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveKeyRequest {
    pub id: Uuid,
    pub key_type: KeyType,
}

mod remove_tag {
    pub const ID: u8 = 0x01;
    pub const KEY_TYPE: u8 = 0x02;
    pub const ALL: &[u8] = &[ID, KEY_TYPE];
}

impl BinaryRead for RemoveKeyRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, remove_tag::ALL)?;
        Ok(RemoveKeyRequest {
            id: fields.uuid(remove_tag::ID, "id")?,
            key_type: KeyType::from_byte(fields.u8(remove_tag::KEY_TYPE, "key type")?)?,
        })
    }
}

impl BinaryWrite for RemoveKeyRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(remove_tag::ID, &self.id)?;
        tlv.u8(remove_tag::KEY_TYPE, self.key_type.to_byte())
    }

    fn serialized_size(&self) -> usize {
        record_size(16) + record_size(1)
    }
}

/// An identifier plus a request encrypted with that identifier's secret
pub struct EncryptedCharacteristic<T> {
    pub identifier: Uuid,
    pub encrypted: EncryptedData,
    request: PhantomData<fn() -> T>,
}

pub type CreateNewKeyCharacteristic = EncryptedCharacteristic<CreateNewKeyRequest>;
pub type ConfirmNewKeyCharacteristic = EncryptedCharacteristic<ConfirmNewKeyRequest>;
pub type RemoveKeyCharacteristic = EncryptedCharacteristic<RemoveKeyRequest>;

mod encrypted_tag {
    pub const IDENTIFIER: u8 = 0x01;
    pub const ENCRYPTED: u8 = 0x02;
    pub const ALL: &[u8] = &[IDENTIFIER, ENCRYPTED];
}

impl<T> EncryptedCharacteristic<T> {
    pub fn from_encrypted(identifier: Uuid, encrypted: EncryptedData) -> Self {
        EncryptedCharacteristic {
            identifier,
            encrypted,
            request: PhantomData,
        }
    }
}

impl<T: BinarySerialize> EncryptedCharacteristic<T> {
    pub fn new(request: &T, identifier: Uuid, key: &KeyData) -> Result<Self, CryptoError> {
        Ok(Self::from_encrypted(
            identifier,
            EncryptedData::encrypt_value(request, key)?,
        ))
    }

    /// Verify and decrypt with the identifier's secret
    pub fn decrypt(&self, key: &KeyData) -> Result<T, CryptoError> {
        self.encrypted.decrypt_value(key)
    }
}

impl<T> Clone for EncryptedCharacteristic<T> {
    fn clone(&self) -> Self {
        Self::from_encrypted(self.identifier, self.encrypted.clone())
    }
}

impl<T> PartialEq for EncryptedCharacteristic<T> {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.encrypted == other.encrypted
    }
}

impl<T> Eq for EncryptedCharacteristic<T> {}

impl<T> fmt::Debug for EncryptedCharacteristic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedCharacteristic")
            .field("identifier", &self.identifier)
            .field("encrypted", &self.encrypted)
            .finish()
    }
}

impl<T> BinaryRead for EncryptedCharacteristic<T> {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, encrypted_tag::ALL)?;
        Ok(Self::from_encrypted(
            fields.uuid(encrypted_tag::IDENTIFIER, "identifier")?,
            fields.value(encrypted_tag::ENCRYPTED, "encrypted data")?,
        ))
    }
}

impl<T> BinaryWrite for EncryptedCharacteristic<T> {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(encrypted_tag::IDENTIFIER, &self.identifier)?;
        tlv.value(encrypted_tag::ENCRYPTED, &self.encrypted)
    }

    fn serialized_size(&self) -> usize {
        record_size(16) + record_size(self.encrypted.serialized_size())
    }
}

/// List-keys characteristic; the response is notified as chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListKeysRequest {
    pub identifier: Uuid,
    pub authentication: Authentication,
}

mod list_keys_tag {
    pub const IDENTIFIER: u8 = 0x01;
    pub const AUTHENTICATION: u8 = 0x02;
    pub const ALL: &[u8] = &[IDENTIFIER, AUTHENTICATION];
}

impl ListKeysRequest {
    pub fn new(identifier: Uuid, key: &KeyData) -> Result<Self, CryptoError> {
        Ok(ListKeysRequest {
            identifier,
            authentication: Authentication::new(key)?,
        })
    }
}

impl BinaryRead for ListKeysRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, list_keys_tag::ALL)?;
        Ok(ListKeysRequest {
            identifier: fields.uuid(list_keys_tag::IDENTIFIER, "identifier")?,
            authentication: fields.value(list_keys_tag::AUTHENTICATION, "authentication")?,
        })
    }
}

impl BinaryWrite for ListKeysRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(list_keys_tag::IDENTIFIER, &self.identifier)?;
        tlv.value(list_keys_tag::AUTHENTICATION, &self.authentication)
    }

    fn serialized_size(&self) -> usize {
        record_size(16) + record_size(Authentication::LENGTH)
    }
}

/// List-events characteristic; the response is notified as chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEventsRequest {
    pub identifier: Uuid,
    pub authentication: Authentication,
    pub fetch_request: Option<FetchRequest>,
}

mod list_events_tag {
    pub const IDENTIFIER: u8 = 0x01;
    pub const AUTHENTICATION: u8 = 0x02;
    pub const FETCH_REQUEST: u8 = 0x03;
    pub const ALL: &[u8] = &[IDENTIFIER, AUTHENTICATION, FETCH_REQUEST];
}

impl ListEventsRequest {
    pub fn new(
        identifier: Uuid,
        key: &KeyData,
        fetch_request: Option<FetchRequest>,
    ) -> Result<Self, CryptoError> {
        Ok(ListEventsRequest {
            identifier,
            authentication: Authentication::new(key)?,
            fetch_request,
        })
    }
}

impl BinaryRead for ListEventsRequest {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let bytes = read_all(reader)?;
        let fields = TlvFields::parse(&bytes, list_events_tag::ALL)?;
        Ok(ListEventsRequest {
            identifier: fields.uuid(list_events_tag::IDENTIFIER, "identifier")?,
            authentication: fields.value(list_events_tag::AUTHENTICATION, "authentication")?,
            fetch_request: fields.optional_value(list_events_tag::FETCH_REQUEST)?,
        })
    }
}

impl BinaryWrite for ListEventsRequest {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut tlv = TlvWriter::new(writer);
        tlv.uuid(list_events_tag::IDENTIFIER, &self.identifier)?;
        tlv.value(list_events_tag::AUTHENTICATION, &self.authentication)?;
        if let Some(fetch_request) = &self.fetch_request {
            tlv.value(list_events_tag::FETCH_REQUEST, fetch_request)?;
        }
        Ok(())
    }

    fn serialized_size(&self) -> usize {
        record_size(16)
            + record_size(Authentication::LENGTH)
            + self
                .fetch_request
                .as_ref()
                .map_or(0, |f| record_size(f.serialized_size()))
    }
}
