use std::str::FromStr;
use std::sync::Arc;

use crate::crypto::cipher::{self, Cipher};
use crate::crypto::dh::{self, Dh};
use crate::crypto::hash::{self, Hash};
use crate::error::Error;
use crate::pattern::{self, HandshakePattern};

const PROTOCOL_PREFIX: &str = "Noise";

/// A fully specified Noise protocol: a handshake pattern plus the DH,
/// cipher, and hash functions, with the canonical name
/// `Noise_<pattern>_<dh>_<cipher>_<hash>`.
///
/// Protocols are usually parsed from a name, but can also be assembled
/// directly from registry handles (or custom implementations), which is the
/// only way to use algorithms that are not registered.
#[derive(Clone)]
pub struct Protocol {
    pub pattern: Arc<HandshakePattern>,
    pub dh: Arc<dyn Dh>,
    pub cipher: Arc<dyn Cipher>,
    pub hash: Arc<dyn Hash>,
}

impl Protocol {
    /// Parses a (case-sensitive) protocol name into a protocol whose
    /// components are resolved from the registries.
    pub fn new(name: &str) -> Result<Self, Error> {
        name.parse()
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 5 || parts[0] != PROTOCOL_PREFIX {
            return Err(Error::ProtocolNotSupported);
        }

        Ok(Self {
            pattern: pattern::lookup(parts[1]).ok_or(Error::ProtocolNotSupported)?,
            dh: dh::lookup(parts[2]).ok_or(Error::ProtocolNotSupported)?,
            cipher: cipher::lookup(parts[3]).ok_or(Error::ProtocolNotSupported)?,
            hash: hash::lookup(parts[4]).ok_or(Error::ProtocolNotSupported)?,
        })
    }
}

impl core::fmt::Display for Protocol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}",
            PROTOCOL_PREFIX,
            self.pattern.name(),
            self.dh.name(),
            self.cipher.name(),
            self.hash.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_round_trip() {
        for name in [
            "Noise_XX_25519_ChaChaPoly_BLAKE2s",
            "Noise_IKpsk2_25519_AESGCM_SHA256",
            "Noise_N_448_ChaChaPoly_SHA512",
            "Noise_X1X1_25519_AESGCM_BLAKE2b",
        ] {
            let protocol = Protocol::new(name).unwrap();
            assert_eq!(protocol.to_string(), name);
        }
    }

    #[test]
    fn manual_construction_matches_parsed() {
        let parsed = Protocol::new("Noise_XX_25519_ChaChaPoly_BLAKE2s").unwrap();
        let manual = Protocol {
            pattern: crate::pattern::lookup("XX").unwrap(),
            dh: crate::crypto::dh::lookup("25519").unwrap(),
            cipher: crate::crypto::cipher::lookup("ChaChaPoly").unwrap(),
            hash: crate::crypto::hash::lookup("BLAKE2s").unwrap(),
        };
        assert_eq!(parsed.to_string(), manual.to_string());
    }

    #[test]
    fn malformed_names_are_rejected() {
        for name in [
            "",
            "Noise",
            "Noise_XX_25519_ChaChaPoly",
            "Noise_XX_25519_ChaChaPoly_BLAKE2s_extra",
            "Signal_XX_25519_ChaChaPoly_BLAKE2s",
            "noise_XX_25519_ChaChaPoly_BLAKE2s",
            "Noise_XQ_25519_ChaChaPoly_BLAKE2s",
            "Noise_XX_25519_ChaChaPoly_blake2s",
            "Noise_XX_31337_ChaChaPoly_BLAKE2s",
            "Noise_XX_25519_Whatever_BLAKE2s",
        ] {
            assert_eq!(
                Protocol::new(name).err(),
                Some(Error::ProtocolNotSupported),
                "{name}"
            );
        }
    }
}
