//! Phone-side request composition
//!
//! [`LockClient`] holds a key's credentials and builds the characteristic
//! values for each operation. [`NotificationReader`] reassembles notification
//! frames and decrypts the resulting list.

use crate::clock::{Clock, SystemClock};
use crate::error::LockError;
use crate::invitation::Invitation;
use crate::request::{
    CreateNewKeyCharacteristic, CreateNewKeyRequest, ListEventsRequest, ListKeysRequest,
    RemoveKeyCharacteristic, RemoveKeyRequest, SetupCharacteristic, SetupRequest, UnlockRequest,
};
use chrono::{DateTime, Utc};
use smartlock_crypto::{Authentication, AuthenticationMessage, EncryptedData, KeyData};
use smartlock_protocol::{
    BinaryRead, ChunkReassembler, EventsList, FetchRequest, KeyType, KeysList, NewKey,
    Permission, UnlockAction,
};
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

/// Identifier and shared secret of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCredentials {
    pub id: Uuid,
    pub secret: KeyData,
}

impl KeyCredentials {
    pub fn new(id: Uuid, secret: KeyData) -> Self {
        KeyCredentials { id, secret }
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4(), KeyData::generate())
    }
}

#[derive(Debug)]
pub struct LockClient<C = SystemClock> {
    lock: Uuid,
    credentials: KeyCredentials,
    clock: C,
}

impl LockClient<SystemClock> {
    pub fn new(lock: Uuid, credentials: KeyCredentials) -> Self {
        Self::with_clock(lock, credentials, SystemClock)
    }
}

impl<C: Clock> LockClient<C> {
    pub fn with_clock(lock: Uuid, credentials: KeyCredentials, clock: C) -> Self {
        LockClient {
            lock,
            credentials,
            clock,
        }
    }

    /// Owner request for a lock still in setup mode
    ///
    /// Generates the owner's credentials; the returned client holds them.
    pub fn setup(
        lock: Uuid,
        setup_secret: &KeyData,
        clock: C,
    ) -> Result<(SetupCharacteristic, Self), LockError> {
        let credentials = KeyCredentials::generate();
        let request = SetupRequest::new(credentials.id, credentials.secret.clone());
        let encrypted =
            EncryptedData::encrypt_value_with_message(&request, setup_secret, message(&clock))?;
        Ok((
            SetupCharacteristic { encrypted },
            Self::with_clock(lock, credentials, clock),
        ))
    }

    pub fn lock(&self) -> Uuid {
        self.lock
    }

    pub fn credentials(&self) -> &KeyCredentials {
        &self.credentials
    }

    pub fn unlock(&self, action: UnlockAction) -> Result<UnlockRequest, LockError> {
        Ok(UnlockRequest {
            identifier: self.credentials.id,
            action,
            authentication: self.authentication()?,
        })
    }

    /// Invitation request plus the invitation to hand to the invitee
    pub fn create_new_key(
        &self,
        name: impl Into<String>,
        permission: Permission,
        expiration: DateTime<Utc>,
    ) -> Result<(CreateNewKeyCharacteristic, Invitation), LockError> {
        let temporary = KeyCredentials::generate();
        let request = CreateNewKeyRequest::new(
            temporary.id,
            name,
            permission,
            expiration,
            temporary.secret.clone(),
        )?;
        let invitation = Invitation {
            lock: self.lock,
            key: NewKey::new(
                request.id,
                request.name.clone(),
                request.permission.clone(),
                self.clock.now(),
                request.expiration,
            ),
            secret: temporary.secret,
        };
        let characteristic = CreateNewKeyCharacteristic::from_encrypted(
            self.credentials.id,
            self.encrypt(&request)?,
        );
        debug!(lock = %self.lock, new_key = %invitation.key.id, "composed key invitation");
        Ok((characteristic, invitation))
    }

    pub fn remove_key(
        &self,
        id: Uuid,
        key_type: KeyType,
    ) -> Result<RemoveKeyCharacteristic, LockError> {
        let request = RemoveKeyRequest { id, key_type };
        Ok(RemoveKeyCharacteristic::from_encrypted(
            self.credentials.id,
            self.encrypt(&request)?,
        ))
    }

    pub fn list_keys(&self) -> Result<ListKeysRequest, LockError> {
        Ok(ListKeysRequest {
            identifier: self.credentials.id,
            authentication: self.authentication()?,
        })
    }

    pub fn list_events(
        &self,
        fetch_request: Option<FetchRequest>,
    ) -> Result<ListEventsRequest, LockError> {
        Ok(ListEventsRequest {
            identifier: self.credentials.id,
            authentication: self.authentication()?,
            fetch_request,
        })
    }

    pub fn keys_reader(&self) -> NotificationReader<KeysList> {
        NotificationReader::new(self.credentials.secret.clone())
    }

    pub fn events_reader(&self) -> NotificationReader<EventsList> {
        NotificationReader::new(self.credentials.secret.clone())
    }

    fn authentication(&self) -> Result<Authentication, LockError> {
        Ok(Authentication::with_message(
            &self.credentials.secret,
            message(&self.clock),
        )?)
    }

    fn encrypt<T: smartlock_protocol::BinaryWrite>(
        &self,
        value: &T,
    ) -> Result<EncryptedData, LockError> {
        Ok(EncryptedData::encrypt_value_with_message(
            value,
            &self.credentials.secret,
            message(&self.clock),
        )?)
    }
}

fn message<C: Clock>(clock: &C) -> AuthenticationMessage {
    AuthenticationMessage::with_date(clock.now())
}

/// Decoder for one notification characteristic
pub struct NotificationReader<T> {
    secret: KeyData,
    reassembler: ChunkReassembler,
    value: PhantomData<fn() -> T>,
}

impl<T: BinaryRead> NotificationReader<T> {
    pub fn new(secret: KeyData) -> Self {
        NotificationReader {
            secret,
            reassembler: ChunkReassembler::new(),
            value: PhantomData,
        }
    }

    /// Feed one frame; yields the decrypted value once the message is complete
    pub fn push(&mut self, frame: &[u8]) -> Result<Option<T>, LockError> {
        match self.reassembler.push_bytes(frame)? {
            Some(message) => {
                let encrypted = EncryptedData::from_bytes(&message)?;
                Ok(Some(encrypted.decrypt_value(&self.secret)?))
            }
            None => Ok(None),
        }
    }

    /// Feed every frame of one transfer
    pub fn read_all<'a, I>(&mut self, frames: I) -> Result<T, LockError>
    where
        I: IntoIterator<Item = &'a Vec<u8>>,
    {
        for frame in frames {
            if let Some(value) = self.push(frame)? {
                return Ok(value);
            }
        }
        Err(LockError::InvalidData(
            "notification ended before the message was complete".to_string(),
        ))
    }

    pub fn is_in_progress(&self) -> bool {
        self.reassembler.is_in_progress()
    }
}

impl<T> std::fmt::Debug for NotificationReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationReader")
            .field("reassembler", &self.reassembler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{Duration, TimeZone};
    use smartlock_protocol::{BinaryWrite, Chunk, Key};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_setup_request_decrypts_with_setup_secret() {
        let setup_secret = KeyData::generate();
        let (characteristic, client) =
            LockClient::setup(Uuid::new_v4(), &setup_secret, clock()).unwrap();
        let request = characteristic.decrypt(&setup_secret).unwrap();
        assert_eq!(request.id, client.credentials().id);
        assert_eq!(request.secret, client.credentials().secret);
        assert_eq!(
            characteristic.encrypted.authentication.message().date(),
            clock().now()
        );
    }

    #[test]
    fn test_create_new_key_invitation() {
        let client = LockClient::with_clock(Uuid::new_v4(), KeyCredentials::generate(), clock());
        let expiration = clock().now() + Duration::days(1);
        let (characteristic, invitation) = client
            .create_new_key("Guest", Permission::Anytime, expiration)
            .unwrap();
        assert_eq!(characteristic.identifier, client.credentials().id);
        assert_eq!(invitation.lock, client.lock());

        let request = characteristic
            .decrypt(&client.credentials().secret)
            .unwrap();
        assert_eq!(request.id, invitation.key.id);
        assert_eq!(request.secret, invitation.secret);
        assert_eq!(request.expiration, expiration);
    }

    #[test]
    fn test_create_new_key_with_nanosecond_expiration() {
        let client = LockClient::with_clock(Uuid::new_v4(), KeyCredentials::generate(), clock());
        let expiration = clock().now() + Duration::days(1) + Duration::nanoseconds(123_456_789);
        let (characteristic, invitation) = client
            .create_new_key("Guest", Permission::Anytime, expiration)
            .unwrap();
        let request = characteristic
            .decrypt(&client.credentials().secret)
            .unwrap();
        assert_eq!(request.expiration, invitation.key.expiration);
        assert_eq!(invitation.key.expiration.timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn test_create_new_key_rejects_overlong_name() {
        let client = LockClient::with_clock(Uuid::new_v4(), KeyCredentials::generate(), clock());
        let name = "x".repeat(70_000);
        let result = client.create_new_key(name, Permission::Anytime, clock().now() + Duration::days(1));
        assert!(matches!(result, Err(LockError::InvalidData(_))));
    }

    #[test]
    fn test_requests_authenticate_with_own_secret() {
        let client = LockClient::with_clock(Uuid::new_v4(), KeyCredentials::generate(), clock());
        let unlock = client.unlock(UnlockAction::Default).unwrap();
        assert!(unlock
            .authentication
            .is_authenticated(&client.credentials().secret));
        assert!(!unlock.authentication.is_authenticated(&KeyData::generate()));
        let listing = client.list_events(None).unwrap();
        assert_ne!(
            listing.authentication.message().nonce(),
            unlock.authentication.message().nonce()
        );
    }

    #[test]
    fn test_notification_reader() {
        let client = LockClient::with_clock(Uuid::new_v4(), KeyCredentials::generate(), clock());
        let list = KeysList {
            keys: vec![Key {
                id: client.credentials().id,
                name: "Owner".to_string(),
                created: clock().now(),
                permission: Permission::Owner,
            }],
            new_keys: Vec::new(),
        };
        let encrypted =
            EncryptedData::encrypt_value(&list, &client.credentials().secret).unwrap();
        let frames: Vec<Vec<u8>> = Chunk::split(&encrypted.to_bytes().unwrap(), 20)
            .unwrap()
            .iter()
            .map(|chunk| chunk.to_bytes().unwrap())
            .collect();

        let mut reader = client.keys_reader();
        assert_eq!(reader.read_all(&frames).unwrap(), list);
        assert!(!reader.is_in_progress());

        let mut reader = client.keys_reader();
        assert!(reader.read_all(&frames[..frames.len() - 1]).is_err());
        assert!(reader.is_in_progress());
    }

    #[test]
    fn test_notification_reader_wrong_secret() {
        let secret = KeyData::generate();
        let encrypted = EncryptedData::encrypt_value(&EventsList(Vec::new()), &secret).unwrap();
        let frames: Vec<Vec<u8>> = Chunk::split(&encrypted.to_bytes().unwrap(), 64)
            .unwrap()
            .iter()
            .map(|chunk| chunk.to_bytes().unwrap())
            .collect();
        let mut reader = NotificationReader::<EventsList>::new(KeyData::generate());
        assert!(matches!(
            reader.read_all(&frames),
            Err(LockError::InvalidAuthentication)
        ));
    }
}
