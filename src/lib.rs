#![deny(unsafe_code)]

//! # rustle
//!
//! A pattern-driven, sans-IO implementation of the Noise Protocol
//! Framework, revision 34.
//!
//! A protocol is selected by name (e.g.
//! `Noise_XX_25519_ChaChaPoly_BLAKE2s`), naming a handshake pattern, a
//! Diffie-Hellman function, an AEAD cipher function, and a hash function.
//! The library drives the handshake one message at a time and yields a
//! pair of AEAD transport cipher states when it completes.
//!
//! ## Supported algorithms
//!
//! - Patterns: every named one-way, interactive, and deferred pattern,
//!   their standard PSK-modified forms, compiled `pskN+pskM` variants, and
//!   validated custom patterns
//! - DH: `25519`, `448`
//! - Ciphers: `ChaChaPoly`, `AESGCM` (plus `DeoxysII` behind the `deoxys`
//!   feature)
//! - Hashes: `SHA256`, `SHA512`, `BLAKE2s`, `BLAKE2b`
//!
//! ## Security properties
//!
//! - All key material zeroized on drop or reset
//! - X25519 all-zero shared-secret rejection
//! - Sticky terminal errors: a failed handshake cannot be resumed
//! - No panics on network input
//!
//! ## Example
//!
//! ```
//! use rustle::{Error, HandshakeConfig, HandshakeState, Protocol};
//!
//! # fn main() -> Result<(), Error> {
//! let protocol = Protocol::new("Noise_NN_25519_ChaChaPoly_BLAKE2s")?;
//!
//! let mut initiator = HandshakeState::new(HandshakeConfig::new(protocol.clone(), true))?;
//! let mut responder = HandshakeState::new(HandshakeConfig::new(protocol, false))?;
//!
//! let mut message = Vec::new();
//! let mut payload = Vec::new();
//!
//! // -> e
//! initiator.write_message(&mut message, b"hello")?;
//! responder.read_message(&mut payload, &message)?;
//! assert_eq!(payload, b"hello");
//!
//! // <- e, ee; the final message completes with `Error::Done`.
//! message.clear();
//! payload.clear();
//! assert_eq!(responder.write_message(&mut message, &[]), Err(Error::Done));
//! assert_eq!(initiator.read_message(&mut payload, &message), Err(Error::Done));
//!
//! let (mut tx, _) = initiator.status_mut().take_cipher_states().unwrap();
//! let (mut rx, _) = responder.status_mut().take_cipher_states().unwrap();
//!
//! let mut ciphertext = Vec::new();
//! tx.encrypt_with_ad(&mut ciphertext, &[], b"transport data")?;
//! let mut plaintext = Vec::new();
//! rx.decrypt_with_ad(&mut plaintext, &[], &ciphertext)?;
//! assert_eq!(plaintext, b"transport data");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod pattern;
pub mod vectors;

mod cipher_state;
mod error;
mod handshake;
mod protocol;
mod symmetric_state;

pub use cipher_state::{CipherState, DEFAULT_MAX_MESSAGE_SIZE};
pub use error::{Error, PatternError};
pub use handshake::{
    HandshakeConfig, HandshakeObserver, HandshakeState, HandshakeStatus, PRE_SHARED_KEY_SIZE,
};
pub use protocol::Protocol;
pub use symmetric_state::SymmetricState;

/// The revision of the Noise Protocol Framework specification implemented.
pub const NOISE_REVISION: u32 = 34;
