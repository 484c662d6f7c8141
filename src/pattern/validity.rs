//! Handshake pattern validity rules.

use crate::error::PatternError;

use super::{HandshakePattern, Token};

#[derive(Default)]
struct TokenSet([bool; 7]);

impl TokenSet {
    fn insert(&mut self, token: Token) {
        self.0[token as usize] = true;
    }

    fn contains(&self, token: Token) -> bool {
        self.0[token as usize]
    }
}

#[derive(Default)]
struct Sides {
    initiator: TokenSet,
    responder: TokenSet,
}

impl Sides {
    fn sender(&self, is_initiator: bool) -> &TokenSet {
        if is_initiator {
            &self.initiator
        } else {
            &self.responder
        }
    }

    fn sender_mut(&mut self, is_initiator: bool) -> &mut TokenSet {
        if is_initiator {
            &mut self.initiator
        } else {
            &mut self.responder
        }
    }

    fn in_either(&self, token: Token) -> bool {
        self.initiator.contains(token) || self.responder.contains(token)
    }

    fn in_both(&self, token: Token) -> bool {
        self.initiator.contains(token) && self.responder.contains(token)
    }
}

/// Checks a pattern against the handshake pattern validity rules and the
/// framework's structural requirements.
///
/// Not fast; intended for validating custom patterns and for testing.
pub fn is_valid(pattern: &HandshakePattern) -> Result<(), PatternError> {
    let mut sides = Sides::default();

    let pre_messages = pattern.pre_messages();
    if pre_messages.len() > 2 {
        return Err(PatternError::TooManyPreMessages);
    }
    for (index, message) in pre_messages.iter().enumerate() {
        let is_initiator = index == 0;
        for token in message.iter().copied() {
            match token {
                // Parties must not send their static or ephemeral public
                // key more than once per handshake.
                Token::E | Token::S => {
                    if sides.sender(is_initiator).contains(token) {
                        return Err(PatternError::DuplicatePublicKey);
                    }
                    sides.sender_mut(is_initiator).insert(token);
                }
                _ => return Err(PatternError::InvalidPreMessageToken),
            }
        }
    }

    let messages = pattern.messages();
    if messages.is_empty() {
        return Err(PatternError::NoMessages);
    }
    if pattern.is_one_way() && messages.len() != 1 {
        return Err(PatternError::OneWayExcessMessages);
    }

    let mut num_dhs = 0usize;
    let mut num_psks = 0usize;
    for (index, message) in messages.iter().enumerate() {
        let is_initiator = index % 2 == 0;
        for token in message.iter().copied() {
            match token {
                Token::E | Token::S => {
                    if sides.sender(is_initiator).contains(token) {
                        return Err(PatternError::DuplicatePublicKey);
                    }
                }
                // Parties must not perform the same DH calculation more
                // than once per handshake.
                Token::Ee | Token::Es | Token::Se | Token::Ss => {
                    if sides.in_either(token) {
                        return Err(PatternError::DuplicateDh);
                    }
                    num_dhs += 1;
                }
                // Multiple psk tokens are allowed; the PSK compiler
                // generates them for `pskN+pskM` modifiers.
                Token::Psk => num_psks += 1,
            }

            // Parties can only perform DH between keys they possess.
            let impossible = match token {
                Token::Ee => !sides.in_both(Token::E),
                Token::Ss => !sides.in_both(Token::S),
                Token::Es => {
                    !(sides.initiator.contains(Token::E) && sides.responder.contains(Token::S))
                }
                Token::Se => {
                    !(sides.initiator.contains(Token::S) && sides.responder.contains(Token::E))
                }
                _ => false,
            };
            if impossible {
                return Err(PatternError::ImpossibleDh);
            }

            sides.sender_mut(is_initiator).insert(token);
        }

        // After a DH between the local static key and any remote public
        // key, a party must not encrypt until the matching ephemeral DH
        // has also been performed.
        let missing = if is_initiator {
            (sides.in_either(Token::Se) && !sides.in_either(Token::Ee))
                || (sides.in_either(Token::Ss) && !sides.in_either(Token::Es))
        } else {
            (sides.in_either(Token::Es) && !sides.in_either(Token::Ee))
                || (sides.in_either(Token::Ss) && !sides.in_either(Token::Se))
        };
        if missing {
            return Err(PatternError::MissingCompletionDh);
        }

        // A party may not send encrypted data after processing a psk token
        // unless it has also sent an ephemeral public key.
        if sides.in_either(Token::Psk) && !sides.sender(is_initiator).contains(Token::E) {
            return Err(PatternError::PskWithoutEphemeral);
        }
    }

    if num_dhs == 0 {
        return Err(PatternError::NoDh);
    }
    if num_psks != pattern.num_psks() {
        return Err(PatternError::PskCountMismatch);
    }

    Ok(())
}
