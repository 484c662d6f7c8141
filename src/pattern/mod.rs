//! Handshake pattern catalogue, validity rules, and the PSK modifier
//! compiler.
//!
//! Every named pattern from the Noise specification is registered at
//! startup: the one-way and interactive fundamental patterns, the deferred
//! variants, and the standard PSK-modified forms. Custom patterns can be
//! added with [`register`], which runs the [`validity`] rules first.

mod deferred;
mod interactive;
mod one_way;
mod psk;
mod validity;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

pub use psk::make_psk;
pub use validity::is_valid;

use crate::error::Error;

/// A Noise handshake pattern token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    E,
    S,
    Ee,
    Es,
    Se,
    Ss,
    Psk,
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::E => "e",
            Self::S => "s",
            Self::Ee => "ee",
            Self::Es => "es",
            Self::Se => "se",
            Self::Ss => "ss",
            Self::Psk => "psk",
        };
        f.write_str(s)
    }
}

/// A Noise handshake pattern: up to two pre-messages followed by one or
/// more messages, each an ordered token sequence.
#[derive(Debug, Clone)]
pub struct HandshakePattern {
    name: String,
    pre_messages: Vec<Vec<Token>>,
    messages: Vec<Vec<Token>>,
    num_psks: usize,
    one_way: bool,
}

impl HandshakePattern {
    /// Builds a pattern from its token sequences. The PSK count is derived
    /// from the number of `psk` tokens in the messages.
    pub fn new(
        name: String,
        pre_messages: Vec<Vec<Token>>,
        messages: Vec<Vec<Token>>,
        one_way: bool,
    ) -> Self {
        let num_psks = messages
            .iter()
            .flatten()
            .filter(|token| **token == Token::Psk)
            .count();
        Self {
            name,
            pre_messages,
            messages,
            num_psks,
            one_way,
        }
    }

    /// The pattern name as it appears in protocol names (e.g. `XXpsk3`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pre-message token sequences, initiator first.
    pub fn pre_messages(&self) -> &[Vec<Token>] {
        &self.pre_messages
    }

    /// The message token sequences, alternating initiator/responder.
    pub fn messages(&self) -> &[Vec<Token>] {
        &self.messages
    }

    /// The number of pre-shared keys the pattern requires.
    pub fn num_psks(&self) -> usize {
        self.num_psks
    }

    /// Whether the pattern is one-way (single message, single transport key).
    pub fn is_one_way(&self) -> bool {
        self.one_way
    }
}

impl core::fmt::Display for HandshakePattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Looks up a registered pattern by name.
pub fn lookup(name: &str) -> Option<Arc<HandshakePattern>> {
    REGISTRY
        .read()
        .expect("pattern registry lock poisoned")
        .get(name)
        .cloned()
}

/// Registers a pattern for use with [`lookup`] and protocol name parsing.
///
/// The pattern is checked against the validity rules first; an invalid
/// pattern is rejected and the registry is left unchanged.
pub fn register(pattern: HandshakePattern) -> Result<(), Error> {
    is_valid(&pattern)?;
    REGISTRY
        .write()
        .expect("pattern registry lock poisoned")
        .insert(pattern.name().to_string(), Arc::new(pattern));
    Ok(())
}

/// The names of all currently registered patterns, sorted.
pub fn names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY
        .read()
        .expect("pattern registry lock poisoned")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

/// Standard PSK-modified variants of the built-in patterns.
const STANDARD_PSK_VARIANTS: &[(&str, &str)] = &[
    ("N", "psk0"),
    ("K", "psk0"),
    ("X", "psk1"),
    ("NN", "psk0"),
    ("NN", "psk2"),
    ("NK", "psk0"),
    ("NK", "psk2"),
    ("NX", "psk2"),
    ("XN", "psk3"),
    ("XK", "psk3"),
    ("XX", "psk3"),
    ("KN", "psk0"),
    ("KN", "psk2"),
    ("KK", "psk0"),
    ("KK", "psk2"),
    ("KX", "psk2"),
    ("IN", "psk1"),
    ("IN", "psk2"),
    ("IK", "psk1"),
    ("IK", "psk2"),
    ("IX", "psk2"),
];

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<HandshakePattern>>>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    let base = one_way::patterns()
        .into_iter()
        .chain(interactive::patterns())
        .chain(deferred::patterns());
    for pattern in base {
        if let Err(err) = is_valid(&pattern) {
            panic!("built-in pattern {} is invalid: {err}", pattern.name());
        }
        map.insert(pattern.name().to_string(), Arc::new(pattern));
    }

    for (base_name, modifier) in STANDARD_PSK_VARIANTS {
        let template: &Arc<HandshakePattern> = map
            .get(*base_name)
            .unwrap_or_else(|| panic!("missing PSK template pattern {base_name}"));
        let compiled = match make_psk(template, modifier) {
            Ok(compiled) => compiled,
            Err(err) => panic!("failed to compile {base_name}{modifier}: {err}"),
        };
        if let Err(err) = is_valid(&compiled) {
            panic!("compiled pattern {} is invalid: {err}", compiled.name());
        }
        map.insert(compiled.name().to_string(), Arc::new(compiled));
    }

    RwLock::new(map)
});

/// Shorthand used by the built-in catalogue tables.
fn built_in(
    name: &str,
    pre_messages: &[&[Token]],
    messages: &[&[Token]],
    one_way: bool,
) -> HandshakePattern {
    HandshakePattern::new(
        name.to_string(),
        pre_messages.iter().map(|msg| msg.to_vec()).collect(),
        messages.iter().map(|msg| msg.to_vec()).collect(),
        one_way,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_built_in_pattern_is_registered_and_valid() {
        // 3 one-way + 12 interactive + 23 deferred + 21 standard PSK forms.
        let names = names();
        assert_eq!(names.len(), 59);
        for name in names {
            let pattern = lookup(&name).unwrap();
            is_valid(&pattern).unwrap();
            assert_eq!(pattern.name(), name);
        }
    }

    #[test]
    fn lookup_well_known_patterns() {
        use super::Token::*;

        let xx = lookup("XX").unwrap();
        assert_eq!(xx.messages().len(), 3);
        assert_eq!(xx.messages()[0], vec![E]);
        assert_eq!(xx.messages()[1], vec![E, Ee, S, Es]);
        assert_eq!(xx.messages()[2], vec![S, Se]);
        assert!(!xx.is_one_way());
        assert_eq!(xx.num_psks(), 0);

        let n = lookup("N").unwrap();
        assert!(n.is_one_way());
        assert_eq!(n.pre_messages().len(), 2);
        assert_eq!(n.pre_messages()[1], vec![S]);

        let xpsk1 = lookup("Xpsk1").unwrap();
        assert_eq!(xpsk1.num_psks(), 1);
        assert_eq!(xpsk1.messages()[0].last(), Some(&Psk));

        assert!(lookup("XQ").is_none());
    }

    #[test]
    fn register_rejects_invalid_patterns() {
        use super::Token::*;

        // `ee` before either side has sent an ephemeral.
        let bogus = HandshakePattern::new(
            "BOGUS".to_string(),
            Vec::new(),
            vec![vec![Ee]],
            false,
        );
        assert!(register(bogus).is_err());
        assert!(lookup("BOGUS").is_none());
    }
}
