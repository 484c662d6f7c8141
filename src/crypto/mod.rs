//! Cryptographic primitive interfaces and the standard Noise algorithms.
//!
//! - [`cipher`]: AEAD cipher functions (`ChaChaPoly`, `AESGCM`, optionally
//!   `DeoxysII`)
//! - [`dh`]: Diffie-Hellman functions (`25519`, `448`)
//! - [`hash`]: hash functions (`SHA256`, `SHA512`, `BLAKE2s`, `BLAKE2b`),
//!   HMAC, and the Noise HKDF
//!
//! Each module keeps a process-wide registry mapping algorithm names to
//! factories. The registries are pre-populated with the standard algorithms
//! and may be extended with `register` during process initialization; after
//! startup they are effectively read-only and safe to share across threads.

pub mod cipher;
pub mod dh;
pub mod hash;
