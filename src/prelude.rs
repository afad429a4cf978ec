//! Smart lock prelude
//!
//! Commonly used types and traits for both sides of the protocol.
//!
//! ```rust
//! use smartlock::prelude::*;
//!
//! let credentials = KeyCredentials::generate();
//! let client = LockClient::new(uuid::Uuid::new_v4(), credentials);
//! let request = client.unlock(UnlockAction::Default).unwrap();
//! // BinaryWrite is in scope without an explicit import
//! assert!(!request.to_bytes().unwrap().is_empty());
//! ```

// Lock and client
pub use crate::client::{KeyCredentials, LockClient, NotificationReader};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::LockConfig;
pub use crate::error::LockError;
pub use crate::events::{EventStore, InMemoryEventStore};
pub use crate::invitation::Invitation;
pub use crate::lock::LockPeripheral;
pub use crate::store::{AuthorizationStore, InMemoryAuthorizationStore};

// Requests
pub use crate::request::{
    ConfirmNewKeyCharacteristic, CreateNewKeyCharacteristic, ListEventsRequest, ListKeysRequest,
    RemoveKeyCharacteristic, SetupCharacteristic, UnlockRequest,
};

// Protocol types
pub use smartlock_protocol::{
    EventsList, FetchRequest, Interval, Key, KeyType, KeysList, LockCharacteristic, LockEvent,
    LockInformation, LockStatus, NewKey, Permission, Predicate, Schedule, UnlockAction, Weekdays,
};

// Crypto types
pub use smartlock_crypto::{EncryptedData, KeyData};

// Codec traits
pub use smartlock_protocol::{BinaryRead, BinaryWrite};
