use std::fmt;

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::PrivacyResult;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn derive(label: impl AsRef<[u8]>) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(label.as_ref());
        Self(*hasher.finalize().as_bytes())
    }

    /// Hash of the canonical JSON encoding. `serde_json` maps are ordered,
    /// so equal payloads always hash equally.
    pub fn of_json(value: &Value) -> PrivacyResult<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::derive(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..8])
    }

    pub fn as_seed(&self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
