//! GATT service and characteristic identifiers

use uuid::Uuid;

/// Lock GATT service
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0xEB5F_0000_0B1E_4D4A_9C1F_62B8_4A1C_0000);

/// Characteristics of the lock service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockCharacteristic {
    /// Read: fixed-layout lock information
    Information,
    /// Write: encrypted setup request
    Setup,
    /// Write: unlock request
    Unlock,
    /// Write: encrypted new key request
    CreateNewKey,
    /// Write: encrypted confirmation of an invitation
    ConfirmNewKey,
    /// Write: encrypted remove key request
    RemoveKey,
    /// Write: list keys request; response is notified on [`LockCharacteristic::KeysNotification`]
    ListKeys,
    /// Notify: chunked encrypted key list
    KeysNotification,
    /// Write: list events request; response is notified on [`LockCharacteristic::EventsNotification`]
    ListEvents,
    /// Notify: chunked encrypted event list
    EventsNotification,
}

impl LockCharacteristic {
    pub const ALL: [LockCharacteristic; 10] = [
        LockCharacteristic::Information,
        LockCharacteristic::Setup,
        LockCharacteristic::Unlock,
        LockCharacteristic::CreateNewKey,
        LockCharacteristic::ConfirmNewKey,
        LockCharacteristic::RemoveKey,
        LockCharacteristic::ListKeys,
        LockCharacteristic::KeysNotification,
        LockCharacteristic::ListEvents,
        LockCharacteristic::EventsNotification,
    ];

    pub fn uuid(self) -> Uuid {
        let suffix: u128 = match self {
            LockCharacteristic::Information => 0x0001,
            LockCharacteristic::Setup => 0x0002,
            LockCharacteristic::Unlock => 0x0003,
            LockCharacteristic::CreateNewKey => 0x0004,
            LockCharacteristic::ConfirmNewKey => 0x0005,
            LockCharacteristic::RemoveKey => 0x0006,
            LockCharacteristic::ListKeys => 0x0007,
            LockCharacteristic::KeysNotification => 0x0008,
            LockCharacteristic::ListEvents => 0x0009,
            LockCharacteristic::EventsNotification => 0x000A,
        };
        Uuid::from_u128(SERVICE_UUID.as_u128() | suffix)
    }

    pub fn from_uuid(uuid: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == *uuid)
    }

    /// Characteristics that deliver their value through notifications
    pub fn is_notification(self) -> bool {
        matches!(
            self,
            LockCharacteristic::KeysNotification | LockCharacteristic::EventsNotification
        )
    }
}
