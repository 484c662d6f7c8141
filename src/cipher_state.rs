use std::sync::Arc;

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::cipher::{Aead, Cipher, KEY_LEN};
use crate::error::Error;

/// The default maximum Noise message size in bytes, including AEAD tags.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 65535;

/// Nonce 2^64 - 1 is reserved for the rekey operation.
const MAX_NONCE: u64 = u64::MAX;

/// Resolves the configured maximum message size: positive values are a hard
/// limit, `0` selects the default, and negative values disable enforcement.
pub(crate) fn resolve_max_message_size(configured: isize) -> usize {
    match configured {
        0 => DEFAULT_MAX_MESSAGE_SIZE,
        n if n < 0 => 0,
        n => n as usize,
    }
}

/// A keyed AEAD algorithm instance with a monotonically increasing nonce
/// counter.
///
/// Per Noise spec Section 5.1.
pub struct CipherState {
    cipher: Arc<dyn Cipher>,
    aead: Option<Box<dyn Aead>>,
    key: Zeroizing<[u8; KEY_LEN]>,
    nonce: u64,
    /// 0 disables the size cap.
    max_message_size: usize,
}

impl CipherState {
    /// Creates an unkeyed cipher state using the given cipher function.
    ///
    /// `max_message_size` follows the configuration convention: a positive
    /// value is a hard limit including the tag, `0` selects the 65535-byte
    /// default, and a negative value disables the limit.
    pub fn new(cipher: Arc<dyn Cipher>, max_message_size: isize) -> Self {
        Self::new_resolved(cipher, resolve_max_message_size(max_message_size))
    }

    pub(crate) fn new_resolved(cipher: Arc<dyn Cipher>, max_message_size: usize) -> Self {
        Self {
            cipher,
            aead: None,
            key: Zeroizing::new([0u8; KEY_LEN]),
            nonce: 0,
            max_message_size,
        }
    }

    /// Sets the cipher key to `key` (empty or exactly 32 bytes) and resets
    /// the nonce counter to 0. Prior key material is zeroized.
    pub fn initialize_key(&mut self, key: &[u8]) -> Result<(), Error> {
        if !matches!(key.len(), 0 | KEY_LEN) {
            return Err(Error::InvalidKeySize);
        }
        self.set_key(key)?;
        self.nonce = 0;
        Ok(())
    }

    /// Replaces the key without touching the nonce counter.
    fn set_key(&mut self, key: &[u8]) -> Result<(), Error> {
        self.reset();
        if !key.is_empty() {
            self.aead = Some(self.cipher.new_aead(key)?);
            self.key.copy_from_slice(key);
        }
        Ok(())
    }

    /// Whether a key has been set.
    pub fn has_key(&self) -> bool {
        self.aead.is_some()
    }

    /// Overwrites the nonce counter. Only needed by callers replaying
    /// fixed-nonce test vectors or implementing out-of-order transports.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    /// The current nonce counter value.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The AEAD tag overhead (0 while unkeyed).
    pub fn overhead(&self) -> usize {
        self.aead.as_ref().map_or(0, |aead| aead.overhead())
    }

    pub(crate) fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Encrypts and authenticates `plaintext` with `ad`, appending the
    /// ciphertext to `dst` and incrementing the nonce. While unkeyed the
    /// plaintext is appended unmodified.
    pub fn encrypt_with_ad(
        &mut self,
        dst: &mut Vec<u8>,
        ad: &[u8],
        plaintext: &[u8],
    ) -> Result<(), Error> {
        let Some(aead) = self.aead.as_ref() else {
            dst.extend_from_slice(plaintext);
            return Ok(());
        };

        if self.nonce == MAX_NONCE {
            return Err(Error::NonceExhausted);
        }
        if self.max_message_size > 0 && plaintext.len() + aead.overhead() > self.max_message_size
        {
            return Err(Error::MessageSize);
        }

        let nonce = self.cipher.encode_nonce(self.nonce);
        aead.seal(nonce.as_slice(), ad, plaintext, dst)?;
        self.nonce += 1;

        Ok(())
    }

    /// Authenticates and decrypts `ciphertext` with `ad`, appending the
    /// plaintext to `dst` and incrementing the nonce. On authentication
    /// failure the nonce is not advanced. While unkeyed the ciphertext is
    /// appended unmodified.
    pub fn decrypt_with_ad(
        &mut self,
        dst: &mut Vec<u8>,
        ad: &[u8],
        ciphertext: &[u8],
    ) -> Result<(), Error> {
        let Some(aead) = self.aead.as_ref() else {
            dst.extend_from_slice(ciphertext);
            return Ok(());
        };

        if self.nonce == MAX_NONCE {
            return Err(Error::NonceExhausted);
        }
        if self.max_message_size > 0 && ciphertext.len() > self.max_message_size {
            return Err(Error::MessageSize);
        }

        let nonce = self.cipher.encode_nonce(self.nonce);
        aead.open(nonce.as_slice(), ad, ciphertext, dst)?;
        self.nonce += 1;

        Ok(())
    }

    /// Sets the key to `REKEY(k)` per Noise spec Section 11.3, without
    /// resetting the nonce counter.
    ///
    /// Uses the cipher function's own REKEY when it defines one, and the
    /// generic construction (encrypting 32 zero bytes with the reserved
    /// maximum nonce and truncating to 32 bytes) otherwise.
    pub fn rekey(&mut self) -> Result<(), Error> {
        let Some(aead) = self.aead.as_ref() else {
            return Err(Error::NoExistingKey);
        };

        let new_key = match self.cipher.rekey(&self.key) {
            Some(key) => key,
            None => {
                let nonce = self.cipher.encode_nonce(MAX_NONCE);
                let zeros = Zeroizing::new([0u8; KEY_LEN]);
                let mut sealed = Zeroizing::new(Vec::with_capacity(KEY_LEN + aead.overhead()));
                aead.seal(nonce.as_slice(), &[], &zeros[..], &mut sealed)?;

                let mut key = Zeroizing::new([0u8; KEY_LEN]);
                key.copy_from_slice(&sealed[..KEY_LEN]);
                key
            }
        };

        self.set_key(&new_key[..])
    }

    /// Zeroizes the key material and drops the AEAD instance.
    pub fn reset(&mut self) {
        if let Some(mut aead) = self.aead.take() {
            aead.reset();
        }
        self.key.zeroize();
    }
}

impl Drop for CipherState {
    fn drop(&mut self) {
        self.reset();
    }
}
