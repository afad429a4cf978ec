//! Smart Lock Protocol Types
//!
//! This crate contains the wire formats exchanged with a lock peripheral:
//! - Little-endian binary helpers and the `BinaryRead`/`BinaryWrite` traits
//! - Tag-length-value records used by every variable-length message
//! - Notification chunking and reassembly
//! - Lock information, permissions, keys, events and event fetch requests
//!
//! This crate contains NO cryptographic operations and NO I/O.
//! It is purely focused on data structures and serialization.

pub mod binary;
pub mod characteristic;
pub mod chunk;
pub mod error;
pub mod event;
pub mod fetch;
pub mod information;
pub mod key;
pub mod list;
pub mod permission;
pub mod tlv;

// Re-export commonly used types
pub use binary::{wire_date, BinaryRead, BinarySerialize, BinaryWrite};
pub use characteristic::{LockCharacteristic, SERVICE_UUID};
pub use chunk::{Chunk, ChunkReassembler, CHUNK_HEADER_LENGTH};
pub use error::ProtocolError;
pub use event::{
    ConfirmNewKeyEvent, CreateNewKeyEvent, LockEvent, LockEventType, RemoveKeyEvent, SetupEvent,
    UnlockEvent,
};
pub use fetch::{FetchRequest, Predicate};
pub use information::{
    LockBuildVersion, LockInformation, LockStatus, LockVersion, UnlockAction, UnlockActions,
};
pub use key::{validate_name, Key, KeyType, NewKey, MAX_NAME_LENGTH};
pub use list::{EventsList, KeysList};
pub use permission::{Interval, Permission, PermissionType, Schedule, Weekdays};
pub use tlv::{TlvFields, TlvRecord, TlvWriter};
