//! AEAD cipher function abstract interface and the standard Noise cipher
//! functions.
//!
//! Every cipher function produces AEAD instances keyed with 32 bytes and a
//! per-message nonce derived from a 64-bit counter; the nonce encoding is
//! cipher-specific.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    ChaCha20Poly1305,
};
use zeroize::Zeroizing;

use crate::error::Error;

/// The size of a Noise symmetric cipher key in bytes.
pub const KEY_LEN: usize = 32;

/// The largest encoded nonce of any supported cipher function.
pub const MAX_NONCE_LEN: usize = 16;

const TAG_LEN: usize = 16;

/// An encoded AEAD nonce, as produced by [`Cipher::encode_nonce`].
pub struct EncodedNonce {
    bytes: [u8; MAX_NONCE_LEN],
    len: usize,
}

impl EncodedNonce {
    /// Builds an encoded nonce of `len` bytes from a prefix of `bytes`.
    pub fn new(bytes: [u8; MAX_NONCE_LEN], len: usize) -> Self {
        Self { bytes, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// An AEAD algorithm factory.
pub trait Cipher: Send + Sync {
    /// The algorithm name as it appears in Noise protocol names.
    fn name(&self) -> &'static str;

    /// Constructs a new AEAD instance keyed with `key` (32 bytes).
    fn new_aead(&self, key: &[u8]) -> Result<Box<dyn Aead>, Error>;

    /// Encodes a Noise 64-bit nonce counter into the cipher's nonce form.
    fn encode_nonce(&self, nonce: u64) -> EncodedNonce;

    /// Cipher-specific `REKEY(k)`, for function sets that define one.
    ///
    /// Returning `None` selects the generic rekey defined by the framework
    /// (encrypting 32 zero bytes with the maximum nonce).
    fn rekey(&self, key: &[u8; KEY_LEN]) -> Option<Zeroizing<[u8; KEY_LEN]>> {
        let _ = key;
        None
    }
}

/// A keyed AEAD instance created by a [`Cipher`] factory.
pub trait Aead: Send {
    /// Encrypts `plaintext`, appending ciphertext and tag to `dst`.
    fn seal(
        &self,
        nonce: &[u8],
        ad: &[u8],
        plaintext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error>;

    /// Authenticates and decrypts `ciphertext`, appending the plaintext to
    /// `dst`. On failure `dst` is left unchanged.
    fn open(
        &self,
        nonce: &[u8],
        ad: &[u8],
        ciphertext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error>;

    /// The authentication tag overhead in bytes.
    fn overhead(&self) -> usize;

    /// Clears whatever sensitive material the instance can reach.
    ///
    /// The RustCrypto AEAD types do not expose their key schedules, so the
    /// default is a no-op; implementations that can sanitize should.
    fn reset(&mut self) {}
}

/// Looks up a registered cipher function by algorithm name.
pub fn lookup(name: &str) -> Option<Arc<dyn Cipher>> {
    REGISTRY
        .read()
        .expect("cipher registry lock poisoned")
        .get(name)
        .cloned()
}

/// Registers a cipher function for use with [`lookup`] and protocol name
/// parsing, replacing any previous registration under the same name.
pub fn register(cipher: Arc<dyn Cipher>) {
    REGISTRY
        .write()
        .expect("cipher registry lock poisoned")
        .insert(cipher.name().to_string(), cipher);
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<dyn Cipher>>>> = LazyLock::new(|| {
    let mut map: HashMap<String, Arc<dyn Cipher>> = HashMap::new();
    #[allow(unused_mut)]
    let mut built_ins: Vec<Arc<dyn Cipher>> = vec![Arc::new(ChaChaPoly), Arc::new(AesGcm)];
    #[cfg(feature = "deoxys")]
    built_ins.push(Arc::new(DeoxysII));
    for cipher in built_ins {
        map.insert(cipher.name().to_string(), cipher);
    }
    RwLock::new(map)
});

fn key_array(key: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, Error> {
    let key: [u8; KEY_LEN] = key.try_into().map_err(|_| Error::InvalidKeySize)?;
    Ok(Zeroizing::new(key))
}

fn seal_detached<A: AeadInPlace>(
    aead: &A,
    nonce: &[u8],
    ad: &[u8],
    plaintext: &[u8],
    dst: &mut Vec<u8>,
) -> Result<(), Error> {
    let offset = dst.len();
    dst.extend_from_slice(plaintext);
    match aead.encrypt_in_place_detached(GenericArray::from_slice(nonce), ad, &mut dst[offset..]) {
        Ok(tag) => {
            dst.extend_from_slice(tag.as_slice());
            Ok(())
        }
        Err(_) => {
            dst.truncate(offset);
            Err(Error::MessageSize)
        }
    }
}

fn open_detached<A: AeadInPlace>(
    aead: &A,
    nonce: &[u8],
    ad: &[u8],
    ciphertext: &[u8],
    dst: &mut Vec<u8>,
) -> Result<(), Error> {
    if ciphertext.len() < TAG_LEN {
        return Err(Error::AuthFail);
    }
    let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_LEN);

    let offset = dst.len();
    dst.extend_from_slice(body);
    match aead.decrypt_in_place_detached(
        GenericArray::from_slice(nonce),
        ad,
        &mut dst[offset..],
        GenericArray::from_slice(tag),
    ) {
        Ok(()) => Ok(()),
        Err(_) => {
            dst.truncate(offset);
            Err(Error::AuthFail)
        }
    }
}

/// The `ChaChaPoly` cipher functions.
///
/// The 96-bit nonce is 4 zero bytes followed by the little-endian counter.
pub struct ChaChaPoly;

impl Cipher for ChaChaPoly {
    fn name(&self) -> &'static str {
        "ChaChaPoly"
    }

    fn new_aead(&self, key: &[u8]) -> Result<Box<dyn Aead>, Error> {
        let key = key_array(key)?;
        Ok(Box::new(ChaChaPolyAead(ChaCha20Poly1305::new(
            GenericArray::from_slice(&key[..]),
        ))))
    }

    fn encode_nonce(&self, nonce: u64) -> EncodedNonce {
        let mut bytes = [0u8; MAX_NONCE_LEN];
        bytes[4..12].copy_from_slice(&nonce.to_le_bytes());
        EncodedNonce::new(bytes, 12)
    }
}

struct ChaChaPolyAead(ChaCha20Poly1305);

impl Aead for ChaChaPolyAead {
    fn seal(
        &self,
        nonce: &[u8],
        ad: &[u8],
        plaintext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error> {
        seal_detached(&self.0, nonce, ad, plaintext, dst)
    }

    fn open(
        &self,
        nonce: &[u8],
        ad: &[u8],
        ciphertext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error> {
        open_detached(&self.0, nonce, ad, ciphertext, dst)
    }

    fn overhead(&self) -> usize {
        TAG_LEN
    }
}

/// The `AESGCM` cipher functions.
///
/// The 96-bit nonce is 4 zero bytes followed by the big-endian counter.
pub struct AesGcm;

impl Cipher for AesGcm {
    fn name(&self) -> &'static str {
        "AESGCM"
    }

    fn new_aead(&self, key: &[u8]) -> Result<Box<dyn Aead>, Error> {
        let key = key_array(key)?;
        Ok(Box::new(AesGcmAead(Aes256Gcm::new(
            GenericArray::from_slice(&key[..]),
        ))))
    }

    fn encode_nonce(&self, nonce: u64) -> EncodedNonce {
        let mut bytes = [0u8; MAX_NONCE_LEN];
        bytes[4..12].copy_from_slice(&nonce.to_be_bytes());
        EncodedNonce::new(bytes, 12)
    }
}

struct AesGcmAead(Aes256Gcm);

impl Aead for AesGcmAead {
    fn seal(
        &self,
        nonce: &[u8],
        ad: &[u8],
        plaintext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error> {
        seal_detached(&self.0, nonce, ad, plaintext, dst)
    }

    fn open(
        &self,
        nonce: &[u8],
        ad: &[u8],
        ciphertext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error> {
        open_detached(&self.0, nonce, ad, ciphertext, dst)
    }

    fn overhead(&self) -> usize {
        TAG_LEN
    }
}

/// The `DeoxysII` cipher functions.
///
/// Non-standard. The 120-bit nonce carries the big-endian counter in its
/// final 8 bytes, following Deoxys-II's internal encoding.
#[cfg(feature = "deoxys")]
pub struct DeoxysII;

#[cfg(feature = "deoxys")]
impl Cipher for DeoxysII {
    fn name(&self) -> &'static str {
        "DeoxysII"
    }

    fn new_aead(&self, key: &[u8]) -> Result<Box<dyn Aead>, Error> {
        let key = key_array(key)?;
        Ok(Box::new(DeoxysIIAead(deoxys::DeoxysII256::new(
            GenericArray::from_slice(&key[..]),
        ))))
    }

    fn encode_nonce(&self, nonce: u64) -> EncodedNonce {
        let mut bytes = [0u8; MAX_NONCE_LEN];
        bytes[7..15].copy_from_slice(&nonce.to_be_bytes());
        EncodedNonce::new(bytes, 15)
    }
}

#[cfg(feature = "deoxys")]
struct DeoxysIIAead(deoxys::DeoxysII256);

#[cfg(feature = "deoxys")]
impl Aead for DeoxysIIAead {
    fn seal(
        &self,
        nonce: &[u8],
        ad: &[u8],
        plaintext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error> {
        seal_detached(&self.0, nonce, ad, plaintext, dst)
    }

    fn open(
        &self,
        nonce: &[u8],
        ad: &[u8],
        ciphertext: &[u8],
        dst: &mut Vec<u8>,
    ) -> Result<(), Error> {
        open_detached(&self.0, nonce, ad, ciphertext, dst)
    }

    fn overhead(&self) -> usize {
        TAG_LEN
    }
}
