//! Out-of-band key invitations
//!
//! A grantor hands an [`Invitation`] to the invitee as JSON (file, QR code,
//! message). It is the only JSON in the protocol; everything sent to the lock
//! uses the binary formats.

use crate::client::KeyCredentials;
use crate::clock::Clock;
use crate::error::LockError;
use crate::request::{ConfirmNewKeyCharacteristic, ConfirmNewKeyRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartlock_crypto::{AuthenticationMessage, EncryptedData, KeyData};
use smartlock_protocol::NewKey;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Lock the invitation is valid for
    pub lock: Uuid,
    pub key: NewKey,
    /// Temporary secret, used once to confirm the invitation
    #[serde(with = "base64_key")]
    pub secret: KeyData,
}

impl Invitation {
    pub fn to_json(&self) -> Result<String, LockError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, LockError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_expired(&self, now: &DateTime<Utc>) -> bool {
        self.key.is_expired(now)
    }

    /// Build the confirm request with a freshly generated permanent secret
    ///
    /// Returns the request and the credentials the invitee keeps once the
    /// lock accepts it. The request is authenticated at `clock`'s time.
    pub fn confirm<C: Clock>(
        &self,
        clock: &C,
    ) -> Result<(ConfirmNewKeyCharacteristic, KeyCredentials), LockError> {
        let credentials = KeyCredentials::new(self.key.id, KeyData::generate());
        let request = ConfirmNewKeyRequest {
            secret: credentials.secret.clone(),
        };
        let encrypted = EncryptedData::encrypt_value_with_message(
            &request,
            &self.secret,
            AuthenticationMessage::with_date(clock.now()),
        )?;
        Ok((
            ConfirmNewKeyCharacteristic::from_encrypted(self.key.id, encrypted),
            credentials,
        ))
    }
}

mod base64_key {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use smartlock_crypto::KeyData;

    pub fn serialize<S: Serializer>(key: &KeyData, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(key.as_slice()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<KeyData, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(encoded.as_bytes()).map_err(de::Error::custom)?;
        KeyData::from_slice(&bytes).map_err(de::Error::custom)
    }
}
