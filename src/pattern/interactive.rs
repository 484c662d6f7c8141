//! The interactive (fundamental) handshake patterns.

use super::Token::*;
use super::{built_in, HandshakePattern};

pub(super) fn patterns() -> Vec<HandshakePattern> {
    vec![
        built_in("NN", &[], &[&[E], &[E, Ee]], false),
        built_in("NK", &[&[], &[S]], &[&[E, Es], &[E, Ee]], false),
        built_in("NX", &[], &[&[E], &[E, Ee, S, Es]], false),
        built_in("XN", &[], &[&[E], &[E, Ee], &[S, Se]], false),
        built_in("XK", &[&[], &[S]], &[&[E, Es], &[E, Ee], &[S, Se]], false),
        built_in("XX", &[], &[&[E], &[E, Ee, S, Es], &[S, Se]], false),
        built_in("KN", &[&[S]], &[&[E], &[E, Ee, Se]], false),
        built_in("KK", &[&[S], &[S]], &[&[E, Es, Ss], &[E, Ee, Se]], false),
        built_in("KX", &[&[S]], &[&[E], &[E, Ee, Se, S, Es]], false),
        built_in("IN", &[], &[&[E, S], &[E, Ee, Se]], false),
        built_in("IK", &[&[], &[S]], &[&[E, Es, S, Ss], &[E, Ee, Se]], false),
        built_in("IX", &[], &[&[E, S], &[E, Ee, Se, S, Es]], false),
    ]
}
