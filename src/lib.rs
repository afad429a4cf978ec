//! Security protocol core for a Bluetooth LE smart lock
//!
//! The lock side is [`LockPeripheral`]: it decodes characteristic writes,
//! authenticates them with the key's shared secret, enforces permissions and
//! records an event for every accepted request. The phone side is
//! [`LockClient`], which composes the same requests and decodes the chunked,
//! encrypted list notifications.
//!
//! Wire formats live in `smartlock-protocol`; the envelope and HMAC
//! authentication live in `smartlock-crypto`.
//!
//! # Example
//!
//! ```rust
//! use smartlock::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), LockError> {
//! let setup_secret = KeyData::generate();
//! let clock = Arc::new(SystemClock);
//! let lock = LockPeripheral::new(
//!     uuid::Uuid::new_v4(),
//!     setup_secret.clone(),
//!     InMemoryAuthorizationStore::new(),
//!     InMemoryEventStore::new(),
//!     Arc::clone(&clock),
//! );
//!
//! let (setup, owner) = LockClient::setup(lock.id(), &setup_secret, clock)?;
//! lock.setup(&setup)?;
//! lock.unlock(&owner.unlock(UnlockAction::Default)?)?;
//! assert_eq!(lock.event_store().len()?, 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod client;
pub mod clock;
pub mod config;
mod error;
pub mod events;
pub mod invitation;
pub mod lock;
pub mod prelude;
pub mod replay;
pub mod request;
pub mod store;

pub use client::{KeyCredentials, LockClient, NotificationReader};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LockConfig;
pub use error::LockError;
pub use events::{EventStore, InMemoryEventStore};
pub use invitation::Invitation;
pub use lock::LockPeripheral;
pub use replay::{NonceJournal, ReplayError};
pub use request::{
    ConfirmNewKeyCharacteristic, ConfirmNewKeyRequest, CreateNewKeyCharacteristic,
    CreateNewKeyRequest, EncryptedCharacteristic, ListEventsRequest, ListKeysRequest,
    RemoveKeyCharacteristic, RemoveKeyRequest, SetupCharacteristic, SetupRequest, UnlockRequest,
};
pub use store::{AuthorizationStore, InMemoryAuthorizationStore, StoreError};

pub use smartlock_crypto as crypto;
pub use smartlock_protocol as protocol;
