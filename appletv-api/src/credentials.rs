//! Pairing credentials, at rest and in memory

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Credentials as persisted by the host after pairing.
///
/// Every byte string is hex-encoded; `accessory_identifier` is stored as
/// the accessory reported it. Field names serialize in camelCase so records
/// written by older installs keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredentials {
    pub accessory_identifier: String,
    pub accessory_long_term_public_key: String,
    pub pairing_id: String,
    pub public_key: String,
    pub secret_key: String,
}

/// Decoded credentials handed to pair-verify.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub accessory_identifier: String,
    pub accessory_long_term_public_key: Vec<u8>,
    pub pairing_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub secret_key: Vec<u8>,
}

impl Credentials {
    /// Hex-decode a stored record
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidCredentials` naming the first field that is
    /// not valid hex or is empty.
    pub fn from_stored(stored: &StoredCredentials) -> Result<Self> {
        Ok(Self {
            accessory_identifier: stored.accessory_identifier.clone(),
            accessory_long_term_public_key: decode_field(
                "accessoryLongTermPublicKey",
                &stored.accessory_long_term_public_key,
            )?,
            pairing_id: decode_field("pairingId", &stored.pairing_id)?,
            public_key: decode_field("publicKey", &stored.public_key)?,
            secret_key: decode_field("secretKey", &stored.secret_key)?,
        })
    }

    /// Hex-encode for persistence
    pub fn to_stored(&self) -> StoredCredentials {
        StoredCredentials {
            accessory_identifier: self.accessory_identifier.clone(),
            accessory_long_term_public_key: hex::encode(&self.accessory_long_term_public_key),
            pairing_id: hex::encode(&self.pairing_id),
            public_key: hex::encode(&self.public_key),
            secret_key: hex::encode(&self.secret_key),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("accessory_identifier", &self.accessory_identifier)
            .field("pairing_id", &hex::encode(&self.pairing_id))
            .field("secret_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    if value.is_empty() {
        return Err(ApiError::InvalidCredentials(format!("{name} is empty")));
    }
    hex::decode(value).map_err(|e| ApiError::InvalidCredentials(format!("{name}: {e}")))
}

/// What a device instance knows about itself before connecting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Identifier matching the accessory's discovery results
    pub id: String,
    pub credentials: StoredCredentials,
}

/// Symmetric keys produced by pair-verify
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub accessory_to_controller: Vec<u8>,
    pub controller_to_accessory: Vec<u8>,
    /// Shared secret used by the realtime channel's stream setup
    pub shared_secret: Vec<u8>,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys { .. }")
    }
}
