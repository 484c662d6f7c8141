//! Hash function abstract interface and the standard Noise hash functions.
//!
//! HMAC uses the standard RFC 2104 construction rather than any built-in
//! keyed mode, for compatibility with other Noise implementations (notably
//! `snow`), and HKDF follows the fixed 2/3-output expansion the Noise
//! key schedule uses.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use zeroize::Zeroizing;

/// The largest digest size of any supported hash function (`SHA512` /
/// `BLAKE2b`).
pub const MAX_HASH_LEN: usize = 64;

/// The largest internal block size of any supported hash function.
pub const MAX_BLOCK_LEN: usize = 128;

/// A collision-resistant cryptographic hash function factory.
pub trait Hash: Send + Sync {
    /// The algorithm name as it appears in Noise protocol names.
    fn name(&self) -> &'static str;

    /// The digest size in bytes (`HASHLEN`).
    fn hash_len(&self) -> usize;

    /// The internal block size in bytes, used by the HMAC construction.
    fn block_len(&self) -> usize;

    /// Constructs a new streaming hasher instance.
    fn new_hasher(&self) -> Box<dyn Hasher>;
}

/// A streaming hash instance created by a [`Hash`] factory.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);

    /// Writes the digest to `out` (exactly `hash_len` bytes) and resets the
    /// instance for reuse.
    fn finalize_reset_into(&mut self, out: &mut [u8]);
}

/// Looks up a registered hash function by algorithm name.
pub fn lookup(name: &str) -> Option<Arc<dyn Hash>> {
    REGISTRY
        .read()
        .expect("hash registry lock poisoned")
        .get(name)
        .cloned()
}

/// Registers a hash function for use with [`lookup`] and protocol name
/// parsing, replacing any previous registration under the same name.
pub fn register(hash: Arc<dyn Hash>) {
    REGISTRY
        .write()
        .expect("hash registry lock poisoned")
        .insert(hash.name().to_string(), hash);
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<dyn Hash>>>> = LazyLock::new(|| {
    let mut map: HashMap<String, Arc<dyn Hash>> = HashMap::new();
    let built_ins: [Arc<dyn Hash>; 4] = [
        Arc::new(Sha256),
        Arc::new(Sha512),
        Arc::new(Blake2s),
        Arc::new(Blake2b),
    ];
    for hash in built_ins {
        map.insert(hash.name().to_string(), hash);
    }
    RwLock::new(map)
});

/// The SHA256 hash function.
pub struct Sha256;

impl Hash for Sha256 {
    fn name(&self) -> &'static str {
        "SHA256"
    }

    fn hash_len(&self) -> usize {
        32
    }

    fn block_len(&self) -> usize {
        64
    }

    fn new_hasher(&self) -> Box<dyn Hasher> {
        Box::new(Sha256Hasher(sha2::Sha256::default()))
    }
}

struct Sha256Hasher(sha2::Sha256);

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.0.update(data);
    }

    fn finalize_reset_into(&mut self, out: &mut [u8]) {
        use sha2::Digest;
        out.copy_from_slice(&core::mem::take(&mut self.0).finalize());
    }
}

/// The SHA512 hash function.
pub struct Sha512;

impl Hash for Sha512 {
    fn name(&self) -> &'static str {
        "SHA512"
    }

    fn hash_len(&self) -> usize {
        64
    }

    fn block_len(&self) -> usize {
        128
    }

    fn new_hasher(&self) -> Box<dyn Hasher> {
        Box::new(Sha512Hasher(sha2::Sha512::default()))
    }
}

struct Sha512Hasher(sha2::Sha512);

impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.0.update(data);
    }

    fn finalize_reset_into(&mut self, out: &mut [u8]) {
        use sha2::Digest;
        out.copy_from_slice(&core::mem::take(&mut self.0).finalize());
    }
}

/// The BLAKE2s hash function.
pub struct Blake2s;

impl Hash for Blake2s {
    fn name(&self) -> &'static str {
        "BLAKE2s"
    }

    fn hash_len(&self) -> usize {
        32
    }

    fn block_len(&self) -> usize {
        64
    }

    fn new_hasher(&self) -> Box<dyn Hasher> {
        Box::new(Blake2sHasher(blake2::Blake2s256::default()))
    }
}

struct Blake2sHasher(blake2::Blake2s256);

impl Hasher for Blake2sHasher {
    fn update(&mut self, data: &[u8]) {
        use blake2::Digest;
        self.0.update(data);
    }

    fn finalize_reset_into(&mut self, out: &mut [u8]) {
        use blake2::Digest;
        out.copy_from_slice(&core::mem::take(&mut self.0).finalize());
    }
}

/// The BLAKE2b hash function.
pub struct Blake2b;

impl Hash for Blake2b {
    fn name(&self) -> &'static str {
        "BLAKE2b"
    }

    fn hash_len(&self) -> usize {
        64
    }

    fn block_len(&self) -> usize {
        128
    }

    fn new_hasher(&self) -> Box<dyn Hasher> {
        Box::new(Blake2bHasher(blake2::Blake2b512::default()))
    }
}

struct Blake2bHasher(blake2::Blake2b512);

impl Hasher for Blake2bHasher {
    fn update(&mut self, data: &[u8]) {
        use blake2::Digest;
        self.0.update(data);
    }

    fn finalize_reset_into(&mut self, out: &mut [u8]) {
        use blake2::Digest;
        out.copy_from_slice(&core::mem::take(&mut self.0).finalize());
    }
}

/// HMAC per RFC 2104, fed `parts` sequentially to avoid concatenating into
/// a temporary buffer. `out` must be exactly `hash.hash_len()` bytes.
pub(crate) fn hmac(hash: &dyn Hash, key: &[u8], parts: &[&[u8]], out: &mut [u8]) {
    const IPAD: u8 = 0x36;
    const OPAD: u8 = 0x5c;

    let block_len = hash.block_len();
    let hash_len = hash.hash_len();
    debug_assert_eq!(out.len(), hash_len);

    // Keys longer than the block size are hashed down first.
    let mut short_key = Zeroizing::new([0u8; MAX_HASH_LEN]);
    let key = if key.len() > block_len {
        let mut hasher = hash.new_hasher();
        hasher.update(key);
        hasher.finalize_reset_into(&mut short_key[..hash_len]);
        &short_key[..hash_len]
    } else {
        key
    };

    let mut ipad_key = Zeroizing::new([IPAD; MAX_BLOCK_LEN]);
    let mut opad_key = Zeroizing::new([OPAD; MAX_BLOCK_LEN]);
    for (i, b) in key.iter().enumerate() {
        ipad_key[i] = *b ^ IPAD;
        opad_key[i] = *b ^ OPAD;
    }

    let mut inner_hash = Zeroizing::new([0u8; MAX_HASH_LEN]);
    let mut hasher = hash.new_hasher();
    hasher.update(&ipad_key[..block_len]);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize_reset_into(&mut inner_hash[..hash_len]);

    hasher.update(&opad_key[..block_len]);
    hasher.update(&inner_hash[..hash_len]);
    hasher.finalize_reset_into(out);
}

/// The Noise `HKDF-HASH(chaining_key, input_key_material)` key derivation.
///
/// Fills each of `outputs` (between one and three, each `hash_len` bytes)
/// with successive HKDF output blocks:
/// `temp = HMAC(ck, ikm)`, `T1 = HMAC(temp, 0x01)`,
/// `T(n) = HMAC(temp, T(n-1) || n)`.
pub(crate) fn hkdf(
    hash: &dyn Hash,
    chaining_key: &[u8],
    input_key_material: &[u8],
    outputs: &mut [&mut [u8]],
) {
    debug_assert!(!outputs.is_empty() && outputs.len() <= 3);

    let hash_len = hash.hash_len();
    let mut temp_key = Zeroizing::new([0u8; MAX_HASH_LEN]);
    hmac(
        hash,
        chaining_key,
        &[input_key_material],
        &mut temp_key[..hash_len],
    );

    let mut previous = Zeroizing::new([0u8; MAX_HASH_LEN]);
    for (index, output) in outputs.iter_mut().enumerate() {
        debug_assert_eq!(output.len(), hash_len);
        let counter = [index as u8 + 1];
        if index == 0 {
            hmac(hash, &temp_key[..hash_len], &[&counter], output);
        } else {
            hmac(
                hash,
                &temp_key[..hash_len],
                &[&previous[..hash_len], &counter],
                output,
            );
        }
        previous[..hash_len].copy_from_slice(output);
    }
}
