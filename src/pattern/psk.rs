//! The `pskN` modifier compiler.

use crate::error::PatternError;

use super::{HandshakePattern, Token};

/// Applies a `pskN(+pskM)*` modifier string to a PSK-free template pattern,
/// returning the modified pattern.
///
/// Index 0 prepends a `psk` token to the first message; index `N >= 1`
/// appends one to the `N`-th message. Indices must be unique and within
/// `[0, number of messages]`. The resulting pattern is named
/// `<template><modifier>` and requires one pre-shared key per index.
pub fn make_psk(
    template: &HandshakePattern,
    modifier: &str,
) -> Result<HandshakePattern, PatternError> {
    if template.num_psks() > 0 {
        return Err(PatternError::TemplateHasPsk);
    }

    let mut messages: Vec<Vec<Token>> = template.messages().to_vec();
    let mut applied = vec![false; messages.len() + 1];

    for part in modifier.split('+') {
        let index = part
            .strip_prefix("psk")
            .ok_or(PatternError::NonPskModifier)?;
        let index: usize = index
            .parse()
            .map_err(|_| PatternError::MalformedPskModifier)?;

        if index > messages.len() {
            return Err(PatternError::PskIndexOutOfRange);
        }
        if applied[index] {
            return Err(PatternError::DuplicatePskModifier);
        }
        applied[index] = true;

        match index {
            0 => messages[0].insert(0, Token::Psk),
            n => messages[n - 1].push(Token::Psk),
        }
    }

    Ok(HandshakePattern::new(
        format!("{}{}", template.name(), modifier),
        template.pre_messages().to_vec(),
        messages,
        template.is_one_way(),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::lookup;
    use super::*;

    #[test]
    fn psk0_and_psk2_modify_first_and_second_messages() {
        let nn = lookup("NN").unwrap();
        let compiled = make_psk(&nn, "psk0+psk2").unwrap();

        assert_eq!(compiled.name(), "NNpsk0+psk2");
        assert_eq!(compiled.num_psks(), 2);
        assert_eq!(compiled.messages()[0].first(), Some(&Token::Psk));
        assert_eq!(compiled.messages()[1].last(), Some(&Token::Psk));
    }

    #[test]
    fn modifier_indices_must_be_unique() {
        let nn = lookup("NN").unwrap();
        assert_eq!(
            make_psk(&nn, "psk1+psk1").unwrap_err(),
            PatternError::DuplicatePskModifier
        );
    }

    #[test]
    fn modifier_indices_must_be_in_range() {
        let nn = lookup("NN").unwrap();
        assert_eq!(
            make_psk(&nn, "psk3").unwrap_err(),
            PatternError::PskIndexOutOfRange
        );
    }

    #[test]
    fn non_psk_modifiers_are_rejected() {
        let nn = lookup("NN").unwrap();
        assert_eq!(
            make_psk(&nn, "fallback").unwrap_err(),
            PatternError::NonPskModifier
        );
        assert_eq!(
            make_psk(&nn, "pskX").unwrap_err(),
            PatternError::MalformedPskModifier
        );
    }

    #[test]
    fn template_must_be_psk_free() {
        let already = lookup("NNpsk0").unwrap();
        assert_eq!(
            make_psk(&already, "psk1").unwrap_err(),
            PatternError::TemplateHasPsk
        );
    }
}
