//! The deferred handshake patterns.

use super::Token::*;
use super::{built_in, HandshakePattern};

pub(super) fn patterns() -> Vec<HandshakePattern> {
    vec![
        built_in("NK1", &[&[], &[S]], &[&[E], &[E, Ee, Es]], false),
        built_in("NX1", &[], &[&[E], &[E, Ee, S], &[Es]], false),
        built_in("X1N", &[], &[&[E], &[E, Ee], &[S], &[Se]], false),
        built_in(
            "X1K",
            &[&[], &[S]],
            &[&[E, Es], &[E, Ee], &[S], &[Se]],
            false,
        ),
        built_in("XK1", &[&[], &[S]], &[&[E], &[E, Ee, Es], &[S, Se]], false),
        built_in(
            "X1K1",
            &[&[], &[S]],
            &[&[E], &[E, Ee, Es], &[S], &[Se]],
            false,
        ),
        built_in("X1X", &[], &[&[E], &[E, Ee, S, Es], &[S], &[Se]], false),
        built_in("XX1", &[], &[&[E], &[E, Ee, S], &[Es, S, Se]], false),
        built_in("X1X1", &[], &[&[E], &[E, Ee, S], &[Es, S], &[Se]], false),
        built_in("K1N", &[&[S]], &[&[E], &[E, Ee], &[Se]], false),
        built_in("K1K", &[&[S], &[S]], &[&[E, Es], &[E, Ee], &[Se]], false),
        built_in("KK1", &[&[S], &[S]], &[&[E], &[E, Ee, Se, Es]], false),
        built_in("K1K1", &[&[S], &[S]], &[&[E], &[E, Ee, Es], &[Se]], false),
        built_in("K1X", &[&[S]], &[&[E], &[E, Ee, S, Es], &[Se]], false),
        built_in("KX1", &[&[S]], &[&[E], &[E, Ee, Se, S], &[Es]], false),
        built_in("K1X1", &[&[S]], &[&[E], &[E, Ee, S], &[Se, Es]], false),
        built_in("I1N", &[], &[&[E, S], &[E, Ee], &[Se]], false),
        built_in("I1K", &[&[], &[S]], &[&[E, Es, S], &[E, Ee], &[Se]], false),
        built_in("IK1", &[&[], &[S]], &[&[E, S], &[E, Ee, Se, Es]], false),
        built_in("I1K1", &[&[], &[S]], &[&[E, S], &[E, Ee, Es], &[Se]], false),
        built_in("I1X", &[], &[&[E, S], &[E, Ee, S, Es], &[Se]], false),
        built_in("IX1", &[], &[&[E, S], &[E, Ee, Se, S], &[Es]], false),
        built_in("I1X1", &[], &[&[E, S], &[E, Ee, S], &[Se, Es]], false),
    ]
}
