//! Serde types for the JSON cross-implementation test-vector format.
//!
//! The format is the one shared by the reference Noise implementations
//! (`cacophony`, `snow`, `noise-c`): a top-level `vectors` array where
//! every byte field is a lowercase hex string and an empty string means
//! the field is absent.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A byte buffer that serializes to and from a lowercase hex string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexBuffer(Vec<u8>);

impl HexBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for HexBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::ops::Deref for HexBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(HexBuffer).map_err(D::Error::custom)
    }
}

/// A single handshake or transport message of a test vector.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorMessage {
    pub payload: HexBuffer,
    pub ciphertext: HexBuffer,
}

/// A single test vector case.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector {
    pub name: String,

    pub protocol_name: String,
    pub fail: bool,
    pub fallback: bool,
    pub fallback_pattern: String,

    pub init_prologue: HexBuffer,
    pub init_psks: Vec<HexBuffer>,
    pub init_static: HexBuffer,
    pub init_ephemeral: HexBuffer,
    pub init_remote_static: HexBuffer,

    pub resp_prologue: HexBuffer,
    pub resp_psks: Vec<HexBuffer>,
    pub resp_static: HexBuffer,
    pub resp_ephemeral: HexBuffer,
    pub resp_remote_static: HexBuffer,

    pub handshake_hash: HexBuffer,

    pub messages: Vec<VectorMessage>,
}

/// A collection of test vectors.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VectorFile {
    pub vectors: Vec<Vector>,
}
