//! Lock information characteristic
//!
//! Read-only, fixed 29-byte layout:
//!
//! ```text
//! [identifier (16B)][build (8B, LE)][major][minor][patch][status][unlock actions]
//! ```

use crate::binary::{
    invalid_data, read_array, read_u64_le, read_u8, read_uuid, write_u64_le, write_u8,
    write_uuid, BinaryRead, BinaryWrite,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use uuid::Uuid;

/// Whether the lock is waiting for its owner or already set up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockStatus {
    /// Fresh from the factory, accepting the setup request
    Setup,
    /// Set up; accepts unlock and key management requests
    Unlock,
}

impl LockStatus {
    pub fn from_byte(byte: u8) -> io::Result<Self> {
        match byte {
            0x00 => Ok(LockStatus::Setup),
            0x01 => Ok(LockStatus::Unlock),
            _ => Err(invalid_data(format!("invalid lock status: {}", byte))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            LockStatus::Setup => 0x00,
            LockStatus::Unlock => 0x01,
        }
    }
}

/// How the lock is asked to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnlockAction {
    /// Unlock immediately
    Default,
    /// Unlock when the physical button is pressed
    Button,
}

impl UnlockAction {
    pub const ALL: [UnlockAction; 2] = [UnlockAction::Default, UnlockAction::Button];

    pub fn from_byte(byte: u8) -> io::Result<Self> {
        match byte {
            0x00 => Ok(UnlockAction::Default),
            0x01 => Ok(UnlockAction::Button),
            _ => Err(invalid_data(format!("invalid unlock action: {}", byte))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            UnlockAction::Default => 0x00,
            UnlockAction::Button => 0x01,
        }
    }

    fn bit(self) -> u8 {
        1 << self.to_byte()
    }
}

/// Set of supported unlock actions, bit *n* set for the action with raw value *n*
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnlockActions(u8);

impl UnlockActions {
    const VALID_BITS: u8 = 0b0000_0011;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u8) -> io::Result<Self> {
        if bits & !Self::VALID_BITS != 0 {
            return Err(invalid_data(format!("invalid unlock action bits: {:#010b}", bits)));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn insert(&mut self, action: UnlockAction) {
        self.0 |= action.bit();
    }

    pub fn contains(self, action: UnlockAction) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = UnlockAction> {
        UnlockAction::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl FromIterator<UnlockAction> for UnlockActions {
    fn from_iter<I: IntoIterator<Item = UnlockAction>>(iter: I) -> Self {
        let mut actions = Self::empty();
        for action in iter {
            actions.insert(action);
        }
        actions
    }
}

/// Firmware version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl LockVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for LockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Monotonic firmware build number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockBuildVersion(pub u64);

/// Decoded information characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInformation {
    pub id: Uuid,
    pub build: LockBuildVersion,
    pub version: LockVersion,
    pub status: LockStatus,
    pub unlock_actions: UnlockActions,
}

impl LockInformation {
    pub const LENGTH: usize = 16 + 8 + 3 + 1 + 1;
}

impl BinaryRead for LockInformation {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let id = read_uuid(reader)?;
        let build = LockBuildVersion(read_u64_le(reader)?);
        let [major, minor, patch]: [u8; 3] = read_array(reader)?;
        let status = LockStatus::from_byte(read_u8(reader)?)?;
        let unlock_actions = UnlockActions::from_bits(read_u8(reader)?)?;
        Ok(Self {
            id,
            build,
            version: LockVersion::new(major, minor, patch),
            status,
            unlock_actions,
        })
    }
}

impl BinaryWrite for LockInformation {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_uuid(writer, &self.id)?;
        write_u64_le(writer, self.build.0)?;
        writer.write_all(&[self.version.major, self.version.minor, self.version.patch])?;
        write_u8(writer, self.status.to_byte())?;
        write_u8(writer, self.unlock_actions.bits())
    }

    fn serialized_size(&self) -> usize {
        Self::LENGTH
    }
}
