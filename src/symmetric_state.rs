use std::sync::Arc;

use zeroize::{Zeroize, Zeroizing};

use crate::cipher_state::CipherState;
use crate::crypto::cipher::{Cipher, KEY_LEN};
use crate::crypto::hash::{hkdf, Hash};
use crate::error::Error;

/// The symmetric cryptography used during a handshake: the chaining key
/// `ck`, the transcript hash `h`, and an encapsulated [`CipherState`].
///
/// Per Noise spec Section 5.2.
pub struct SymmetricState {
    cipher: Arc<dyn Cipher>,
    hash: Arc<dyn Hash>,
    cs: CipherState,
    ck: Zeroizing<Vec<u8>>,
    h: Vec<u8>,
}

impl SymmetricState {
    pub(crate) fn new(
        cipher: Arc<dyn Cipher>,
        hash: Arc<dyn Hash>,
        max_message_size: usize,
    ) -> Self {
        let hash_len = hash.hash_len();
        Self {
            cs: CipherState::new_resolved(cipher.clone(), max_message_size),
            cipher,
            hash,
            ck: Zeroizing::new(vec![0u8; hash_len]),
            h: vec![0u8; hash_len],
        }
    }

    /// Sets `h` from the protocol name (zero-padded if it fits in `HASHLEN`
    /// bytes, hashed otherwise), copies it to `ck`, and unkeys the cipher.
    pub(crate) fn initialize_symmetric(&mut self, protocol_name: &[u8]) -> Result<(), Error> {
        let hash_len = self.hash.hash_len();
        if protocol_name.len() <= hash_len {
            self.h.iter_mut().for_each(|b| *b = 0);
            self.h[..protocol_name.len()].copy_from_slice(protocol_name);
        } else {
            let mut hasher = self.hash.new_hasher();
            hasher.update(protocol_name);
            hasher.finalize_reset_into(&mut self.h);
        }
        self.ck.copy_from_slice(&self.h);

        self.cs.initialize_key(&[])
    }

    /// Mixes key material into the chaining key and keys the cipher with
    /// the derived output.
    pub(crate) fn mix_key(&mut self, input_key_material: &[u8]) -> Result<(), Error> {
        let hash_len = self.hash.hash_len();
        let mut new_ck = Zeroizing::new(vec![0u8; hash_len]);
        let mut temp_k = Zeroizing::new(vec![0u8; hash_len]);
        hkdf(
            self.hash.as_ref(),
            &self.ck,
            input_key_material,
            &mut [&mut new_ck[..], &mut temp_k[..]],
        );

        self.ck.copy_from_slice(&new_ck);
        self.cs.initialize_key(&temp_k[..KEY_LEN])
    }

    /// Mixes data into the transcript hash: `h = HASH(h || data)`.
    pub(crate) fn mix_hash(&mut self, data: &[u8]) {
        let mut hasher = self.hash.new_hasher();
        hasher.update(&self.h);
        hasher.update(data);
        hasher.finalize_reset_into(&mut self.h);
    }

    /// Mixes key material into both the chaining key and the transcript
    /// hash, used for `psk` tokens.
    pub(crate) fn mix_key_and_hash(&mut self, input_key_material: &[u8]) -> Result<(), Error> {
        let hash_len = self.hash.hash_len();
        let mut new_ck = Zeroizing::new(vec![0u8; hash_len]);
        let mut temp_h = Zeroizing::new(vec![0u8; hash_len]);
        let mut temp_k = Zeroizing::new(vec![0u8; hash_len]);
        hkdf(
            self.hash.as_ref(),
            &self.ck,
            input_key_material,
            &mut [&mut new_ck[..], &mut temp_h[..], &mut temp_k[..]],
        );

        self.ck.copy_from_slice(&new_ck);
        self.mix_hash(&temp_h);
        self.cs.initialize_key(&temp_k[..KEY_LEN])
    }

    /// The transcript hash `h`.
    pub fn get_handshake_hash(&self) -> &[u8] {
        &self.h
    }

    pub(crate) fn has_cipher_key(&self) -> bool {
        self.cs.has_key()
    }

    pub(crate) fn cipher_overhead(&self) -> usize {
        self.cs.overhead()
    }

    /// Encrypts `plaintext` with `h` as the additional data, appends the
    /// ciphertext to `dst`, and mixes the appended bytes into `h`.
    pub(crate) fn encrypt_and_hash(
        &mut self,
        dst: &mut Vec<u8>,
        plaintext: &[u8],
    ) -> Result<(), Error> {
        let offset = dst.len();
        match self.cs.encrypt_with_ad(dst, &self.h, plaintext) {
            Ok(()) => (),
            // Handshakes exchange a handful of messages; reaching the
            // reserved nonce here means the state machine is corrupt.
            Err(Error::NonceExhausted) => {
                panic!("SymmetricState: nonce exhausted during handshake")
            }
            Err(err) => return Err(err),
        }

        let (_, appended) = dst.split_at(offset);
        let appended = appended.to_vec();
        self.mix_hash(&appended);
        Ok(())
    }

    /// Decrypts `ciphertext` with `h` as the additional data, appends the
    /// plaintext to `dst`, and mixes the ciphertext into `h`.
    ///
    /// `h` is snapshotted before the mix because `dst` may alias the
    /// ciphertext's storage; the AEAD must authenticate against the value
    /// `h` had when the peer encrypted.
    pub(crate) fn decrypt_and_hash(
        &mut self,
        dst: &mut Vec<u8>,
        ciphertext: &[u8],
    ) -> Result<(), Error> {
        let h_prev = self.h.clone();
        self.mix_hash(ciphertext);

        self.cs.decrypt_with_ad(dst, &h_prev, ciphertext)
    }

    /// Derives the two transport cipher states from the chaining key.
    pub(crate) fn split(&mut self) -> Result<(CipherState, CipherState), Error> {
        let hash_len = self.hash.hash_len();
        let mut temp_k1 = Zeroizing::new(vec![0u8; hash_len]);
        let mut temp_k2 = Zeroizing::new(vec![0u8; hash_len]);
        hkdf(
            self.hash.as_ref(),
            &self.ck,
            &[],
            &mut [&mut temp_k1[..], &mut temp_k2[..]],
        );

        let max_message_size = self.cs.max_message_size();
        let mut cs1 = CipherState::new_resolved(self.cipher.clone(), max_message_size);
        cs1.initialize_key(&temp_k1[..KEY_LEN])?;
        let mut cs2 = CipherState::new_resolved(self.cipher.clone(), max_message_size);
        cs2.initialize_key(&temp_k2[..KEY_LEN])?;

        Ok((cs1, cs2))
    }

    /// Zeroizes the chaining key and the encapsulated cipher state.
    ///
    /// `h` is retained: it is not sensitive, and callers may still read the
    /// handshake hash after `split`.
    pub(crate) fn reset(&mut self) {
        self.ck.zeroize();
        self.cs.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{cipher, hash};

    fn symmetric(name: &str) -> SymmetricState {
        let mut ss = SymmetricState::new(
            cipher::lookup("ChaChaPoly").unwrap(),
            hash::lookup("BLAKE2s").unwrap(),
            0,
        );
        ss.initialize_symmetric(name.as_bytes()).unwrap();
        ss
    }

    #[test]
    fn short_protocol_names_are_zero_padded() {
        let ss = symmetric("Noise_XX_25519_ChaChaPoly_BLAKE2s");
        let h = ss.get_handshake_hash();
        assert_eq!(h.len(), 32);
        assert_eq!(&h[..5], b"Noise");
    }

    #[test]
    fn long_protocol_names_are_hashed() {
        let long_name = "Noise_XXfallback+psk0+psk1_448_ChaChaPoly_BLAKE2s";
        assert!(long_name.len() > 32);
        let ss = symmetric(long_name);
        assert_eq!(ss.get_handshake_hash().len(), 32);
        assert_ne!(&ss.get_handshake_hash()[..5], b"Noise");
    }

    #[test]
    fn mix_key_enables_encryption() {
        let mut ss = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        assert!(!ss.has_cipher_key());
        ss.mix_key(b"input key material").unwrap();
        assert!(ss.has_cipher_key());
        assert_eq!(ss.cipher_overhead(), 16);
    }

    #[test]
    fn encrypt_and_decrypt_round_trip_with_transcript() {
        let mut alice = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        let mut bob = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");

        alice.mix_hash(b"pre-payload data");
        bob.mix_hash(b"pre-payload data");
        alice.mix_key(b"shared secret").unwrap();
        bob.mix_key(b"shared secret").unwrap();

        let mut ciphertext = Vec::new();
        alice.encrypt_and_hash(&mut ciphertext, b"payload").unwrap();
        let mut plaintext = Vec::new();
        bob.decrypt_and_hash(&mut plaintext, &ciphertext).unwrap();

        assert_eq!(plaintext, b"payload");
        assert_eq!(alice.get_handshake_hash(), bob.get_handshake_hash());
    }

    #[test]
    fn transcript_divergence_breaks_decryption() {
        let mut alice = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        let mut bob = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");

        alice.mix_hash(b"prologue-A");
        bob.mix_hash(b"prologue-B");
        alice.mix_key(b"shared secret").unwrap();
        bob.mix_key(b"shared secret").unwrap();

        let mut ciphertext = Vec::new();
        alice.encrypt_and_hash(&mut ciphertext, b"payload").unwrap();
        let mut plaintext = Vec::new();
        assert_eq!(
            bob.decrypt_and_hash(&mut plaintext, &ciphertext)
                .unwrap_err(),
            Error::AuthFail
        );
    }

    #[test]
    fn mix_key_and_hash_differs_from_mix_key() {
        let mut a = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        let mut b = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");

        a.mix_key(b"material").unwrap();
        b.mix_key_and_hash(b"material").unwrap();
        assert_ne!(a.get_handshake_hash(), b.get_handshake_hash());
    }

    #[test]
    fn split_yields_matching_transport_keys() {
        let mut alice = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        let mut bob = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        alice.mix_key(b"shared secret").unwrap();
        bob.mix_key(b"shared secret").unwrap();

        let (mut a1, mut a2) = alice.split().unwrap();
        let (mut b1, mut b2) = bob.split().unwrap();

        let mut ciphertext = Vec::new();
        a1.encrypt_with_ad(&mut ciphertext, b"", b"initiator to responder")
            .unwrap();
        let mut plaintext = Vec::new();
        b1.decrypt_with_ad(&mut plaintext, b"", &ciphertext).unwrap();
        assert_eq!(plaintext, b"initiator to responder");

        ciphertext.clear();
        b2.encrypt_with_ad(&mut ciphertext, b"", b"responder to initiator")
            .unwrap();
        plaintext.clear();
        a2.decrypt_with_ad(&mut plaintext, b"", &ciphertext).unwrap();
        assert_eq!(plaintext, b"responder to initiator");
    }

    #[test]
    fn reset_keeps_the_handshake_hash_readable() {
        let mut ss = symmetric("Noise_NN_25519_ChaChaPoly_BLAKE2s");
        ss.mix_key(b"shared secret").unwrap();
        let h = ss.get_handshake_hash().to_vec();

        ss.reset();
        assert_eq!(ss.get_handshake_hash(), h);
        assert!(!ss.has_cipher_key());
    }

    #[test]
    fn sha512_sized_state() {
        let mut ss = SymmetricState::new(
            cipher::lookup("AESGCM").unwrap(),
            hash::lookup("SHA512").unwrap(),
            0,
        );
        ss.initialize_symmetric(b"Noise_NN_25519_AESGCM_SHA512")
            .unwrap();
        assert_eq!(ss.get_handshake_hash().len(), 64);
        ss.mix_key(b"material").unwrap();
        assert!(ss.has_cipher_key());
    }
}
