//! JSON-driven cross-implementation conformance harness.
//!
//! Runs every vector file found in `tests/testdata/` (the format shared by
//! `cacophony`, `snow`, and `noise-c`). Vectors using unsupported protocol
//! names, `fail` semantics, or fallback patterns are skipped, matching how
//! other implementations consume third-party vector sets. With no files
//! present the harness is a no-op.

use std::fs;
use std::path::Path;

use rustle::vectors::{Vector, VectorFile};
use rustle::{pattern, CipherState, Error, HandshakeConfig, HandshakeState, Protocol};

/// Deterministic vectors supply every ephemeral; any attempt to draw
/// entropy is a bug, surfaced as `EntropySource` instead of bad output.
struct FailingRng;

impl rand_core::RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        unreachable!("test vectors must supply all key material")
    }

    fn next_u64(&mut self) -> u64 {
        unreachable!("test vectors must supply all key material")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        unreachable!("test vectors must supply all key material")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand_core::Error> {
        let code = core::num::NonZeroU32::new(rand_core::Error::CUSTOM_START + 1).unwrap();
        Err(code.into())
    }
}

impl rand_core::CryptoRng for FailingRng {}

/// Multi-PSK suites that appear in the snow vector set but are not named
/// patterns; they must be compiled and registered before parsing names.
fn register_multi_psk_suites() {
    for (base, modifier) in [
        ("NN", "psk0+psk2"),
        ("NX", "psk0+psk1+psk2"),
        ("XN", "psk1+psk3"),
        ("XK", "psk0+psk3"),
        ("KN", "psk1+psk2"),
        ("KK", "psk0+psk2"),
        ("IN", "psk1+psk2"),
        ("IK", "psk0+psk2"),
        ("IX", "psk0+psk2"),
        ("XX", "psk0+psk1"),
        ("XX", "psk0+psk2"),
        ("XX", "psk0+psk3"),
        ("XX", "psk0+psk1+psk2+psk3"),
    ] {
        if pattern::lookup(&format!("{base}{modifier}")).is_some() {
            continue;
        }
        let template = pattern::lookup(base).unwrap();
        let compiled = pattern::make_psk(&template, modifier).unwrap();
        pattern::register(compiled).unwrap();
    }
}

#[test]
fn vector_files() {
    register_multi_psk_suites();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata");
    let Ok(entries) = fs::read_dir(&dir) else {
        return;
    };

    for entry in entries {
        let path = entry.unwrap().path();
        let is_vector_file = path
            .extension()
            .is_some_and(|ext| ext == "json" || ext == "txt");
        if !is_vector_file {
            continue;
        }

        let data = fs::read_to_string(&path).unwrap();
        let file: VectorFile = serde_json::from_str(&data)
            .unwrap_or_else(|err| panic!("{}: {err}", path.display()));
        for vector in &file.vectors {
            run_vector(vector, &path.display().to_string());
        }
    }
}

fn run_vector(vector: &Vector, source: &str) {
    // Fail-expected and fallback vectors are out of scope.
    if vector.fail || vector.fallback || !vector.fallback_pattern.is_empty() {
        return;
    }

    // The noise-c sets carry `name` but not `protocol_name`.
    let protocol_name = if vector.protocol_name.is_empty() {
        &vector.name
    } else {
        &vector.protocol_name
    };
    if protocol_name.is_empty() {
        return;
    }
    let Ok(protocol) = Protocol::new(protocol_name) else {
        // Unknown suites (e.g. legacy PSK naming) are skipped.
        return;
    };
    assert_eq!(&protocol.to_string(), protocol_name, "{source}");
    pattern::is_valid(&protocol.pattern).unwrap();

    let context = format!("{source}: {protocol_name}");
    let one_way = protocol.pattern.is_one_way();
    run_side(build_state(&protocol, vector, true), vector, one_way, &context);
    run_side(build_state(&protocol, vector, false), vector, one_way, &context);
}

fn build_state<'a>(
    protocol: &Protocol,
    vector: &Vector,
    is_initiator: bool,
) -> HandshakeState<'a> {
    let (prologue, psks, static_key, ephemeral, remote_static) = if is_initiator {
        (
            &vector.init_prologue,
            &vector.init_psks,
            &vector.init_static,
            &vector.init_ephemeral,
            &vector.init_remote_static,
        )
    } else {
        (
            &vector.resp_prologue,
            &vector.resp_psks,
            &vector.resp_static,
            &vector.resp_ephemeral,
            &vector.resp_remote_static,
        )
    };

    let mut config = HandshakeConfig::new(protocol.clone(), is_initiator);
    config.prologue = prologue.as_bytes().to_vec();
    config.pre_shared_keys = psks.iter().map(|psk| psk.as_bytes().to_vec()).collect();
    config.rng = Some(Box::new(FailingRng));

    if !static_key.is_empty() {
        config.local_static = Some(protocol.dh.parse_private_key(static_key).unwrap());
    }
    if !ephemeral.is_empty() {
        config.local_ephemeral = Some(protocol.dh.parse_private_key(ephemeral).unwrap());
    }
    if !remote_static.is_empty() {
        config.remote_static = Some(protocol.dh.parse_public_key(remote_static).unwrap());
    }

    HandshakeState::new(config).unwrap()
}

fn run_side(mut hs: HandshakeState<'_>, vector: &Vector, one_way: bool, context: &str) {
    let write_on_even = hs.is_initiator();
    let mut transport: Option<(CipherState, Option<CipherState>)> = None;

    for (index, message) in vector.messages.iter().enumerate() {
        let writes = (index % 2 == 0) == write_on_even;

        match transport.as_mut() {
            None => {
                let mut dst = Vec::new();
                let (result, expected) = if writes {
                    (
                        hs.write_message(&mut dst, &message.payload),
                        message.ciphertext.as_bytes(),
                    )
                } else {
                    (
                        hs.read_message(&mut dst, &message.ciphertext),
                        message.payload.as_bytes(),
                    )
                };
                match result {
                    Ok(()) | Err(Error::Done) => (),
                    Err(err) => panic!("{context}: handshake message {index}: {err}"),
                }
                assert_eq!(dst, expected, "{context}: handshake message {index}");

                if result == Err(Error::Done) {
                    if !vector.handshake_hash.is_empty() {
                        assert_eq!(
                            hs.status().handshake_hash().unwrap(),
                            vector.handshake_hash.as_bytes(),
                            "{context}: handshake hash"
                        );
                    }
                    transport = Some(hs.status_mut().take_cipher_states().unwrap());
                }
            }
            Some((cs1, cs2)) => {
                // Transport messages continue the same alternation, except
                // one-way patterns which only flow initiator-to-responder.
                let mut dst = Vec::new();
                let (result, expected) = if one_way {
                    if hs.is_initiator() {
                        (
                            cs1.encrypt_with_ad(&mut dst, &[], &message.payload),
                            message.ciphertext.as_bytes(),
                        )
                    } else {
                        (
                            cs1.decrypt_with_ad(&mut dst, &[], &message.ciphertext),
                            message.payload.as_bytes(),
                        )
                    }
                } else if writes {
                    let tx = if hs.is_initiator() {
                        &mut *cs1
                    } else {
                        cs2.as_mut().unwrap()
                    };
                    (
                        tx.encrypt_with_ad(&mut dst, &[], &message.payload),
                        message.ciphertext.as_bytes(),
                    )
                } else {
                    let rx = if hs.is_initiator() {
                        cs2.as_mut().unwrap()
                    } else {
                        &mut *cs1
                    };
                    (
                        rx.decrypt_with_ad(&mut dst, &[], &message.ciphertext),
                        message.payload.as_bytes(),
                    )
                };

                result.unwrap_or_else(|err| panic!("{context}: transport message {index}: {err}"));
                assert_eq!(dst, expected, "{context}: transport message {index}");
            }
        }
    }

    assert!(
        transport.is_some(),
        "{context}: vector never completed the handshake"
    );
}
