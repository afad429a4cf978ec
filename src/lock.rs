//! Lock peripheral engine
//!
//! Decodes characteristic writes, authenticates them against the
//! authorization store, enforces permissions, updates the stores and records
//! an event for every accepted request. Notification responses are encrypted
//! with the requester's key and split into chunks.

use crate::clock::{Clock, SystemClock};
use crate::config::LockConfig;
use crate::error::LockError;
use crate::events::EventStore;
use crate::replay::{NonceJournal, ReplayError};
use crate::request::{
    ConfirmNewKeyCharacteristic, CreateNewKeyCharacteristic, EncryptedCharacteristic,
    ListEventsRequest, ListKeysRequest, RemoveKeyCharacteristic, SetupCharacteristic,
    UnlockRequest,
};
use crate::store::{AuthorizationStore, StoreError};
use chrono::{DateTime, Utc};
use smartlock_crypto::{Authentication, AuthenticationMessage, EncryptedData, KeyData};
use smartlock_protocol::binary::BinarySerialize;
use smartlock_protocol::{
    validate_name, BinaryRead, BinaryWrite, Chunk, EventsList, Key, KeyType, KeysList,
    LockBuildVersion, LockCharacteristic, LockEvent, LockInformation, LockStatus, LockVersion,
    NewKey, Permission, Predicate,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Name given to the key created by setup
pub const OWNER_KEY_NAME: &str = "Owner";

pub struct LockPeripheral<A, E, C = SystemClock> {
    id: Uuid,
    setup_secret: KeyData,
    build: LockBuildVersion,
    version: LockVersion,
    config: LockConfig,
    authorization: A,
    events: E,
    clock: C,
    journal: Option<NonceJournal>,
}

impl<A, E, C> LockPeripheral<A, E, C>
where
    A: AuthorizationStore,
    E: EventStore,
    C: Clock,
{
    /// A lock with the default configuration
    ///
    /// `setup_secret` is the factory secret the owner's setup request must be
    /// encrypted with.
    pub fn new(id: Uuid, setup_secret: KeyData, authorization: A, events: E, clock: C) -> Self {
        let config = LockConfig::default();
        LockPeripheral {
            id,
            setup_secret,
            build: LockBuildVersion(1),
            version: LockVersion::new(
                env_version(env!("CARGO_PKG_VERSION_MAJOR")),
                env_version(env!("CARGO_PKG_VERSION_MINOR")),
                env_version(env!("CARGO_PKG_VERSION_PATCH")),
            ),
            journal: config.authentication_timeout().map(NonceJournal::new),
            config,
            authorization,
            events,
            clock,
        }
    }

    pub fn with_config(mut self, config: LockConfig) -> Result<Self, LockError> {
        config.validate()?;
        self.journal = config.authentication_timeout().map(NonceJournal::new);
        self.config = config;
        Ok(self)
    }

    pub fn with_version(mut self, build: LockBuildVersion, version: LockVersion) -> Self {
        self.build = build;
        self.version = version;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn authorization_store(&self) -> &A {
        &self.authorization
    }

    pub fn event_store(&self) -> &E {
        &self.events
    }

    pub fn status(&self) -> Result<LockStatus, LockError> {
        if self.authorization.is_empty()? {
            Ok(LockStatus::Setup)
        } else {
            Ok(LockStatus::Unlock)
        }
    }

    pub fn information(&self) -> Result<LockInformation, LockError> {
        Ok(LockInformation {
            id: self.id,
            build: self.build,
            version: self.version,
            status: self.status()?,
            unlock_actions: self.config.supported_actions(),
        })
    }

    /// Install the owner key
    ///
    /// Succeeds at most once per lock, including under concurrent writes.
    pub fn setup(&self, request: &SetupCharacteristic) -> Result<Key, LockError> {
        if self.status()? != LockStatus::Setup {
            return Err(already_set_up());
        }
        let setup = request.decrypt(&self.setup_secret)?;
        let now = self.clock.now();
        self.check_freshness(request.encrypted.authentication.message(), now)?;

        let owner = Key::new(setup.id, OWNER_KEY_NAME, now, Permission::Owner);
        self.authorization
            .add_owner(owner.clone(), setup.secret)
            .map_err(|e| match e {
                StoreError::AlreadySetUp => already_set_up(),
                other => other.into(),
            })?;
        self.record(LockEvent::setup(now, owner.id))?;
        info!(lock = %self.id, key = %owner.id, "lock set up");
        Ok(owner)
    }

    pub fn unlock(&self, request: &UnlockRequest) -> Result<(), LockError> {
        let now = self.clock.now();
        let (key, _) = self.authenticate(&request.identifier, &request.authentication, now)?;

        if !self.config.supported_actions().contains(request.action) {
            return Err(LockError::CouldNotComplete(format!(
                "unlock action {:?} is not supported",
                request.action
            )));
        }
        if let Permission::Scheduled(schedule) = &key.permission {
            if now >= schedule.expiry {
                warn!(key = %key.id, "unlock with expired schedule");
                return Err(LockError::Expired(key.id));
            }
        }
        let local = now.with_timezone(&self.config.time_zone());
        if !key.permission.can_unlock(&local) {
            warn!(key = %key.id, "unlock outside schedule");
            return Err(LockError::NotAuthorized {
                key: key.id,
                action: "unlock",
            });
        }

        self.record(LockEvent::unlock(now, key.id, request.action))?;
        info!(lock = %self.id, key = %key.id, action = ?request.action, "unlocked");
        Ok(())
    }

    /// Store a pending invitation on behalf of an owner or administrator
    pub fn create_new_key(&self, request: &CreateNewKeyCharacteristic) -> Result<NewKey, LockError> {
        let now = self.clock.now();
        let (grantor, _, create) = self.decrypt_request(request, now)?;
        require_administrator(&grantor, "create keys")?;
        validate_name(&create.name)?;
        if matches!(create.permission, Permission::Owner) {
            return Err(LockError::NotAuthorized {
                key: grantor.id,
                action: "grant owner permission",
            });
        }
        if create.expiration <= now {
            return Err(LockError::CouldNotComplete(
                "invitation expiration is not in the future".to_string(),
            ));
        }

        let new_key = NewKey::new(
            create.id,
            create.name,
            create.permission,
            now,
            create.expiration,
        );
        self.authorization
            .add_new_key(new_key.clone(), create.secret)
            .map_err(already_exists)?;
        self.record(LockEvent::create_new_key(now, grantor.id, new_key.id))?;
        info!(lock = %self.id, key = %grantor.id, new_key = %new_key.id, "key invitation created");
        Ok(new_key)
    }

    /// Exchange an invitation's temporary secret for the invitee's permanent one
    pub fn confirm_new_key(&self, request: &ConfirmNewKeyCharacteristic) -> Result<Key, LockError> {
        let now = self.clock.now();
        let (new_key, temporary_secret) = self
            .authorization
            .new_key(&request.identifier)?
            .ok_or(LockError::UnknownKey(request.identifier))?;
        let confirm = request.decrypt(&temporary_secret)?;
        self.check_freshness(request.encrypted.authentication.message(), now)?;
        if new_key.is_expired(&now) {
            warn!(new_key = %new_key.id, "confirmation of expired invitation");
            return Err(LockError::Expired(new_key.id));
        }

        let key = new_key.confirm(now);
        self.authorization
            .confirm_new_key(key.clone(), confirm.secret)
            .map_err(already_exists)?;
        self.record(LockEvent::confirm_new_key(now, key.id, new_key.id))?;
        info!(lock = %self.id, key = %key.id, "key invitation confirmed");
        Ok(key)
    }

    pub fn remove_key(&self, request: &RemoveKeyCharacteristic) -> Result<(), LockError> {
        let now = self.clock.now();
        let (requester, _, remove) = self.decrypt_request(request, now)?;
        require_administrator(&requester, "remove keys")?;

        match remove.key_type {
            KeyType::Key => {
                let (target, _) = self
                    .authorization
                    .key(&remove.id)?
                    .ok_or(LockError::UnknownKey(remove.id))?;
                if matches!(target.permission, Permission::Owner) {
                    return Err(LockError::NotAuthorized {
                        key: requester.id,
                        action: "remove the owner key",
                    });
                }
                self.authorization.remove_key(&remove.id).map_err(not_found)?;
            }
            KeyType::NewKey => {
                self.authorization
                    .remove_new_key(&remove.id)
                    .map_err(not_found)?;
            }
        }

        self.record(LockEvent::remove_key(
            now,
            requester.id,
            remove.id,
            remove.key_type,
        ))?;
        info!(lock = %self.id, key = %requester.id, removed = %remove.id, "key removed");
        Ok(())
    }

    /// Encrypted, chunked list of keys and invitations
    pub fn list_keys(&self, request: &ListKeysRequest) -> Result<Vec<Chunk>, LockError> {
        let now = self.clock.now();
        let (key, secret) = self.authenticate(&request.identifier, &request.authentication, now)?;
        require_administrator(&key, "list keys")?;
        let list = KeysList {
            keys: self.authorization.keys()?,
            new_keys: self.authorization.new_keys()?,
        };
        debug!(key = %key.id, count = list.len(), "listing keys");
        self.notification(&list, &secret)
    }

    /// Encrypted, chunked page of events
    ///
    /// Keys without administrator permission only see their own events.
    pub fn list_events(&self, request: &ListEventsRequest) -> Result<Vec<Chunk>, LockError> {
        let now = self.clock.now();
        let (key, secret) = self.authenticate(&request.identifier, &request.authentication, now)?;
        let mut fetch = request.fetch_request.clone().unwrap_or_default();
        if !key.permission.is_administrator() {
            let predicate = fetch.predicate.get_or_insert_with(Predicate::default);
            predicate.keys = Some(vec![key.id]);
        }
        let events = EventsList(self.events.fetch(&fetch)?);
        debug!(key = %key.id, count = events.0.len(), "listing events");
        self.notification(&events, &secret)
    }

    /// Value of a readable characteristic
    pub fn read(&self, characteristic: LockCharacteristic) -> Result<Vec<u8>, LockError> {
        match characteristic {
            LockCharacteristic::Information => Ok(self.information()?.to_bytes()?),
            other => Err(LockError::CouldNotComplete(format!(
                "{:?} is not readable",
                other
            ))),
        }
    }

    /// Handle a characteristic write
    ///
    /// Returns the notification frames to send, in order; empty for
    /// characteristics without a notified response.
    pub fn write(
        &self,
        characteristic: LockCharacteristic,
        value: &[u8],
    ) -> Result<Vec<Vec<u8>>, LockError> {
        let result = self.dispatch(characteristic, value);
        if let Err(e) = &result {
            warn!(?characteristic, code = e.error_code(), error = %e, "request rejected");
        }
        result
    }

    fn dispatch(
        &self,
        characteristic: LockCharacteristic,
        value: &[u8],
    ) -> Result<Vec<Vec<u8>>, LockError> {
        match characteristic {
            LockCharacteristic::Setup => {
                self.setup(&SetupCharacteristic::from_bytes(value)?)?;
                Ok(Vec::new())
            }
            LockCharacteristic::Unlock => {
                self.unlock(&UnlockRequest::from_bytes(value)?)?;
                Ok(Vec::new())
            }
            LockCharacteristic::CreateNewKey => {
                self.create_new_key(&CreateNewKeyCharacteristic::from_bytes(value)?)?;
                Ok(Vec::new())
            }
            LockCharacteristic::ConfirmNewKey => {
                self.confirm_new_key(&ConfirmNewKeyCharacteristic::from_bytes(value)?)?;
                Ok(Vec::new())
            }
            LockCharacteristic::RemoveKey => {
                self.remove_key(&RemoveKeyCharacteristic::from_bytes(value)?)?;
                Ok(Vec::new())
            }
            LockCharacteristic::ListKeys => {
                encode_frames(self.list_keys(&ListKeysRequest::from_bytes(value)?)?)
            }
            LockCharacteristic::ListEvents => {
                encode_frames(self.list_events(&ListEventsRequest::from_bytes(value)?)?)
            }
            LockCharacteristic::Information
            | LockCharacteristic::KeysNotification
            | LockCharacteristic::EventsNotification => Err(LockError::CouldNotComplete(format!(
                "{:?} is not writable",
                characteristic
            ))),
        }
    }

    fn authenticate(
        &self,
        identifier: &Uuid,
        authentication: &Authentication,
        now: DateTime<Utc>,
    ) -> Result<(Key, KeyData), LockError> {
        let (key, secret) = self
            .authorization
            .key(identifier)?
            .ok_or(LockError::UnknownKey(*identifier))?;
        if !authentication.is_authenticated(&secret) {
            warn!(key = %identifier, "authentication failed");
            return Err(LockError::InvalidAuthentication);
        }
        self.check_freshness(authentication.message(), now)?;
        Ok((key, secret))
    }

    fn decrypt_request<T: BinarySerialize>(
        &self,
        request: &EncryptedCharacteristic<T>,
        now: DateTime<Utc>,
    ) -> Result<(Key, KeyData, T), LockError> {
        let (key, secret) = self
            .authorization
            .key(&request.identifier)?
            .ok_or(LockError::UnknownKey(request.identifier))?;
        let value = request.decrypt(&secret)?;
        self.check_freshness(request.encrypted.authentication.message(), now)?;
        Ok((key, secret, value))
    }

    fn check_freshness(
        &self,
        message: &AuthenticationMessage,
        now: DateTime<Utc>,
    ) -> Result<(), LockError> {
        match &self.journal {
            Some(journal) => journal.check(message, now).map_err(|e| {
                match e {
                    ReplayError::Stale => debug!("authentication outside timeout window"),
                    ReplayError::Replayed => debug!("authentication nonce replayed"),
                }
                LockError::InvalidAuthentication
            }),
            None => Ok(()),
        }
    }

    fn record(&self, event: LockEvent) -> Result<(), LockError> {
        debug!(event = ?event.event_type(), key = %event.key(), "recording event");
        self.events.save(event)?;
        Ok(())
    }

    fn notification<T: BinaryWrite>(
        &self,
        value: &T,
        secret: &KeyData,
    ) -> Result<Vec<Chunk>, LockError> {
        let encrypted = EncryptedData::encrypt_value(value, secret)?;
        Ok(Chunk::split(
            &encrypted.to_bytes()?,
            self.config.max_chunk_size,
        )?)
    }
}

impl<A, E, C> std::fmt::Debug for LockPeripheral<A, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockPeripheral")
            .field("id", &self.id)
            .field("build", &self.build)
            .field("version", &self.version)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn require_administrator(key: &Key, action: &'static str) -> Result<(), LockError> {
    if key.permission.is_administrator() {
        Ok(())
    } else {
        warn!(key = %key.id, action, "administrator permission required");
        Err(LockError::NotAuthorized { key: key.id, action })
    }
}

fn already_set_up() -> LockError {
    LockError::CouldNotComplete("lock is already set up".to_string())
}

fn already_exists(e: StoreError) -> LockError {
    match e {
        StoreError::AlreadyExists(id) => {
            LockError::CouldNotComplete(format!("key {} already exists", id))
        }
        other => other.into(),
    }
}

fn not_found(e: StoreError) -> LockError {
    match e {
        StoreError::NotFound(id) => LockError::UnknownKey(id),
        other => other.into(),
    }
}

fn encode_frames(chunks: Vec<Chunk>) -> Result<Vec<Vec<u8>>, LockError> {
    chunks
        .iter()
        .map(|chunk| chunk.to_bytes().map_err(LockError::from))
        .collect()
}

fn env_version(component: &str) -> u8 {
    component.parse().unwrap_or(0)
}
