//! The one-way handshake patterns.

use super::Token::*;
use super::{built_in, HandshakePattern};

pub(super) fn patterns() -> Vec<HandshakePattern> {
    vec![
        built_in("N", &[&[], &[S]], &[&[E, Es]], true),
        built_in("K", &[&[S], &[S]], &[&[E, Es, Ss]], true),
        built_in("X", &[&[], &[S]], &[&[E, Es, S, Ss]], true),
    ]
}
