//! Diffie-Hellman abstract interface and the standard Noise DH functions.
//!
//! Shared secrets that are the identity element are rejected, so a peer
//! cannot force a predictable key by sending a low-order public key.

use core::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret as DalekStaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::Error;

/// A Diffie-Hellman key exchange algorithm factory.
pub trait Dh: Send + Sync {
    /// The algorithm name as it appears in Noise protocol names.
    fn name(&self) -> &'static str;

    /// The size of public keys and DH outputs in bytes (`DHLEN`).
    fn dh_len(&self) -> usize;

    /// Generates a new keypair from the provided entropy source.
    fn generate_keypair(&self, rng: &mut dyn CryptoRngCore) -> Result<Box<dyn Keypair>, Error>;

    /// Parses a binary encoded private key, re-deriving the public key.
    fn parse_private_key(&self, data: &[u8]) -> Result<Box<dyn Keypair>, Error>;

    /// Parses a binary encoded public key.
    fn parse_public_key(&self, data: &[u8]) -> Result<Box<dyn PublicKey>, Error>;
}

/// A Diffie-Hellman keypair.
pub trait Keypair: Send + Sync {
    /// The public half of the keypair.
    fn public(&self) -> &dyn PublicKey;

    /// The binary serialized private key.
    fn private_bytes(&self) -> Zeroizing<Vec<u8>>;

    /// Performs a DH calculation between this keypair's private key and the
    /// provided public key, which must belong to the same algorithm.
    fn dh(&self, public_key: &dyn PublicKey) -> Result<Zeroizing<Vec<u8>>, Error>;
}

/// A Diffie-Hellman public key.
pub trait PublicKey: Send + Sync {
    /// The canonical `DHLEN`-byte representation.
    fn bytes(&self) -> &[u8];

    fn boxed_clone(&self) -> Box<dyn PublicKey>;

    fn as_any(&self) -> &dyn Any;
}

/// Looks up a registered DH function by algorithm name.
pub fn lookup(name: &str) -> Option<Arc<dyn Dh>> {
    REGISTRY
        .read()
        .expect("dh registry lock poisoned")
        .get(name)
        .cloned()
}

/// Registers a DH function for use with [`lookup`] and protocol name
/// parsing, replacing any previous registration under the same name.
pub fn register(dh: Arc<dyn Dh>) {
    REGISTRY
        .write()
        .expect("dh registry lock poisoned")
        .insert(dh.name().to_string(), dh);
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<dyn Dh>>>> = LazyLock::new(|| {
    let mut map: HashMap<String, Arc<dyn Dh>> = HashMap::new();
    let built_ins: [Arc<dyn Dh>; 2] = [Arc::new(X25519), Arc::new(X448)];
    for dh in built_ins {
        map.insert(dh.name().to_string(), dh);
    }
    RwLock::new(map)
});

/// The `25519` DH function.
pub struct X25519;

const X25519_LEN: usize = 32;

impl Dh for X25519 {
    fn name(&self) -> &'static str {
        "25519"
    }

    fn dh_len(&self) -> usize {
        X25519_LEN
    }

    fn generate_keypair(&self, rng: &mut dyn CryptoRngCore) -> Result<Box<dyn Keypair>, Error> {
        let mut raw = Zeroizing::new([0u8; X25519_LEN]);
        rng.try_fill_bytes(&mut raw[..])
            .map_err(|_| Error::EntropySource)?;
        self.parse_private_key(&raw[..])
    }

    fn parse_private_key(&self, data: &[u8]) -> Result<Box<dyn Keypair>, Error> {
        let raw: [u8; X25519_LEN] = data.try_into().map_err(|_| Error::MalformedPrivateKey)?;
        let secret = DalekStaticSecret::from(raw);
        let public = PublicKey25519(DalekPublicKey::from(&secret).to_bytes());
        Ok(Box::new(Keypair25519 { secret, public }))
    }

    fn parse_public_key(&self, data: &[u8]) -> Result<Box<dyn PublicKey>, Error> {
        let raw: [u8; X25519_LEN] = data.try_into().map_err(|_| Error::MalformedPublicKey)?;
        Ok(Box::new(PublicKey25519(raw)))
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Keypair25519 {
    secret: DalekStaticSecret,
    #[zeroize(skip)]
    public: PublicKey25519,
}

impl Keypair for Keypair25519 {
    fn public(&self) -> &dyn PublicKey {
        &self.public
    }

    fn private_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }

    fn dh(&self, public_key: &dyn PublicKey) -> Result<Zeroizing<Vec<u8>>, Error> {
        let public = public_key
            .as_any()
            .downcast_ref::<PublicKey25519>()
            .ok_or(Error::MismatchedPublicKey)?;
        let shared = self.secret.diffie_hellman(&DalekPublicKey::from(public.0));
        if bool::from(shared.as_bytes().ct_eq(&[0u8; X25519_LEN])) {
            return Err(Error::LowOrderPoint);
        }
        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }
}

#[derive(Clone)]
struct PublicKey25519([u8; X25519_LEN]);

impl PublicKey for PublicKey25519 {
    fn bytes(&self) -> &[u8] {
        &self.0
    }

    fn boxed_clone(&self) -> Box<dyn PublicKey> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The `448` DH function.
pub struct X448;

const X448_LEN: usize = 56;

impl Dh for X448 {
    fn name(&self) -> &'static str {
        "448"
    }

    fn dh_len(&self) -> usize {
        X448_LEN
    }

    fn generate_keypair(&self, rng: &mut dyn CryptoRngCore) -> Result<Box<dyn Keypair>, Error> {
        let mut raw = Zeroizing::new([0u8; X448_LEN]);
        rng.try_fill_bytes(&mut raw[..])
            .map_err(|_| Error::EntropySource)?;
        self.parse_private_key(&raw[..])
    }

    fn parse_private_key(&self, data: &[u8]) -> Result<Box<dyn Keypair>, Error> {
        if data.len() != X448_LEN {
            return Err(Error::MalformedPrivateKey);
        }
        let secret = x448::Secret::from_bytes(data).ok_or(Error::MalformedPrivateKey)?;
        let mut public = [0u8; X448_LEN];
        public.copy_from_slice(x448::PublicKey::from(&secret).as_bytes().as_ref());

        let mut raw = Zeroizing::new([0u8; X448_LEN]);
        raw.copy_from_slice(data);
        Ok(Box::new(Keypair448 {
            secret: raw,
            public: PublicKey448(public),
        }))
    }

    fn parse_public_key(&self, data: &[u8]) -> Result<Box<dyn PublicKey>, Error> {
        if data.len() != X448_LEN {
            return Err(Error::MalformedPublicKey);
        }
        let public = x448::PublicKey::from_bytes(data).ok_or(Error::MalformedPublicKey)?;
        let mut bytes = [0u8; X448_LEN];
        bytes.copy_from_slice(public.as_bytes().as_ref());
        Ok(Box::new(PublicKey448(bytes)))
    }
}

struct Keypair448 {
    secret: Zeroizing<[u8; X448_LEN]>,
    public: PublicKey448,
}

impl Keypair for Keypair448 {
    fn public(&self) -> &dyn PublicKey {
        &self.public
    }

    fn private_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_vec())
    }

    fn dh(&self, public_key: &dyn PublicKey) -> Result<Zeroizing<Vec<u8>>, Error> {
        let public = public_key
            .as_any()
            .downcast_ref::<PublicKey448>()
            .ok_or(Error::MismatchedPublicKey)?;
        let secret =
            x448::Secret::from_bytes(&self.secret[..]).ok_or(Error::MalformedPrivateKey)?;
        let their_public =
            x448::PublicKey::from_bytes(&public.0).ok_or(Error::MalformedPublicKey)?;

        // The x448 crate returns None for an all-zero shared secret.
        let shared = secret
            .as_diffie_hellman(&their_public)
            .ok_or(Error::LowOrderPoint)?;
        Ok(Zeroizing::new(shared.as_bytes().to_vec()))
    }
}

#[derive(Clone)]
struct PublicKey448([u8; X448_LEN]);

impl PublicKey for PublicKey448 {
    fn bytes(&self) -> &[u8] {
        &self.0
    }

    fn boxed_clone(&self) -> Box<dyn PublicKey> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn registry_has_standard_dhs() {
        assert_eq!(lookup("25519").unwrap().dh_len(), 32);
        assert_eq!(lookup("448").unwrap().dh_len(), 56);
        assert!(lookup("P256").is_none());
    }

    #[test]
    fn x25519_agreement() {
        let alice = X25519.generate_keypair(&mut OsRng).unwrap();
        let bob = X25519.generate_keypair(&mut OsRng).unwrap();

        let shared_a = alice.dh(bob.public()).unwrap();
        let shared_b = bob.dh(alice.public()).unwrap();
        assert_eq!(&shared_a[..], &shared_b[..]);
    }

    #[test]
    fn x25519_known_answer() {
        // RFC 7748 section 5.2, first test vector.
        let scalar =
            hex::decode("a546e36bf0527c9d3b16154b82465edd62144c0ac1fc5a18506a2244ba449ac4")
                .unwrap();
        let u = hex::decode("e6db6867583030db3594c1a424b15f7c726624ec26b3353b10a903a6d0ab1c4c")
            .unwrap();
        let expected =
            hex::decode("c3da55379de9c6908e94ea4df28d084f32eccf03491c71f754b4075577a28552")
                .unwrap();

        let keypair = X25519.parse_private_key(&scalar).unwrap();
        let public = X25519.parse_public_key(&u).unwrap();
        let shared = keypair.dh(public.as_ref()).unwrap();
        assert_eq!(&shared[..], &expected[..]);
    }

    #[test]
    fn x448_known_answer() {
        // RFC 7748 section 5.2, second test vector.
        let scalar = hex::decode(
            "3d262fddf9ec8e88495266fea19a34d28882acef045104d0d1aae121\
             700a779c984c24f8cdd78fbff44943eba368f54b29259a4f1c600ad3",
        )
        .unwrap();
        let u = hex::decode(
            "06fce640fa3487bfda5f6cf2d5263f8aad88334cbd07437f020f08f9\
             814dc031ddbdc38c19c6da2583fa5429db94ada18aa7a7fb4ef8a086",
        )
        .unwrap();
        let expected = hex::decode(
            "ce3e4ff95a60dc6697da1db1d85e6afbdf79b50a2412d7546d5f239f\
             e14fbaadeb445fc66a01b0779d98223961111e21766282f73dd96b6f",
        )
        .unwrap();

        let keypair = X448.parse_private_key(&scalar).unwrap();
        let public = X448.parse_public_key(&u).unwrap();
        let shared = keypair.dh(public.as_ref()).unwrap();
        assert_eq!(&shared[..], &expected[..]);
    }

    #[test]
    fn x448_agreement() {
        let alice = X448.generate_keypair(&mut OsRng).unwrap();
        let bob = X448.generate_keypair(&mut OsRng).unwrap();

        let shared_a = alice.dh(bob.public()).unwrap();
        let shared_b = bob.dh(alice.public()).unwrap();
        assert_eq!(&shared_a[..], &shared_b[..]);
    }

    #[test]
    fn mismatched_public_key_is_rejected() {
        let keypair = X25519.generate_keypair(&mut OsRng).unwrap();
        let public = X448.generate_keypair(&mut OsRng).unwrap();
        assert_eq!(
            keypair.dh(public.public()).unwrap_err(),
            Error::MismatchedPublicKey
        );
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert_eq!(
            X25519.parse_private_key(&[0u8; 31]).err(),
            Some(Error::MalformedPrivateKey)
        );
        assert_eq!(
            X25519.parse_public_key(&[0u8; 33]).err(),
            Some(Error::MalformedPublicKey)
        );
        assert_eq!(
            X448.parse_private_key(&[0u8; 32]).err(),
            Some(Error::MalformedPrivateKey)
        );
        assert_eq!(
            X448.parse_public_key(&[0u8; 57]).err(),
            Some(Error::MalformedPublicKey)
        );
    }

    #[test]
    fn x25519_low_order_point_is_rejected() {
        let keypair = X25519.parse_private_key(&[0x42u8; 32]).unwrap();
        // The identity element forces an all-zero shared secret.
        let identity = X25519.parse_public_key(&[0u8; 32]).unwrap();
        assert_eq!(
            keypair.dh(identity.as_ref()).unwrap_err(),
            Error::LowOrderPoint
        );
    }

    #[test]
    fn private_key_round_trips_and_rederives_public() {
        let keypair = X25519.generate_keypair(&mut OsRng).unwrap();
        let parsed = X25519.parse_private_key(&keypair.private_bytes()).unwrap();
        assert_eq!(parsed.public().bytes(), keypair.public().bytes());
    }
}
