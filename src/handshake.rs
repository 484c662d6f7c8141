use std::sync::Arc;

use rand_core::{CryptoRngCore, OsRng};
use zeroize::Zeroizing;

use crate::cipher_state::{resolve_max_message_size, CipherState};
use crate::crypto::dh::{Dh, Keypair, PublicKey};
use crate::error::Error;
use crate::pattern::{HandshakePattern, Token};
use crate::protocol::Protocol;
use crate::symmetric_state::SymmetricState;

/// The size of a pre-shared symmetric key in bytes.
pub const PRE_SHARED_KEY_SIZE: usize = 32;

/// A callback invoked with each public key received from the peer.
///
/// Returning an error aborts the handshake; the error becomes the sticky
/// status.
pub trait HandshakeObserver {
    /// Called when a peer public key is received, with the pattern token
    /// ([`Token::E`] or [`Token::S`]) it arrived under.
    fn on_peer_public_key(&mut self, token: Token, public_key: &dyn PublicKey)
        -> Result<(), Error>;
}

/// Configuration for a [`HandshakeState`].
///
/// Only `protocol` and `is_initiator` are always required; which keys must
/// be present depends on the pattern's pre-messages and tokens.
pub struct HandshakeConfig<'a> {
    /// The protocol to use for this handshake.
    pub protocol: Protocol,

    /// Optional pre-handshake prologue, mixed into the handshake hash.
    pub prologue: Vec<u8>,

    /// The local static keypair (`s`), if any.
    pub local_static: Option<Box<dyn Keypair>>,

    /// The local ephemeral keypair (`e`), if any. Normally generated
    /// lazily; pre-supplying one is how deterministic test vectors run.
    pub local_ephemeral: Option<Box<dyn Keypair>>,

    /// The remote static public key (`rs`), if any.
    pub remote_static: Option<Box<dyn PublicKey>>,

    /// The remote ephemeral public key (`re`), if any.
    pub remote_ephemeral: Option<Box<dyn PublicKey>>,

    /// Pre-shared keys for PSK-modified patterns, 32 bytes each, in `pskN`
    /// index order.
    pub pre_shared_keys: Vec<Vec<u8>>,

    /// Optional observer notified of each received peer public key.
    pub observer: Option<&'a mut dyn HandshakeObserver>,

    /// The entropy source for ephemeral generation. Defaults to the
    /// operating system's cryptographic source.
    pub rng: Option<Box<dyn CryptoRngCore + 'a>>,

    /// Maximum message size: positive is a hard limit including tags, `0`
    /// selects the 65535-byte default, negative disables enforcement.
    ///
    /// Anything but the default is a non-standard extension.
    pub max_message_size: isize,

    /// Whether this side initiates the handshake.
    pub is_initiator: bool,
}

impl<'a> HandshakeConfig<'a> {
    /// A configuration with no keys, no prologue, and default limits.
    pub fn new(protocol: Protocol, is_initiator: bool) -> Self {
        Self {
            protocol,
            prologue: Vec::new(),
            local_static: None,
            local_ephemeral: None,
            remote_static: None,
            remote_ephemeral: None,
            pre_shared_keys: Vec::new(),
            observer: None,
            rng: None,
            max_message_size: 0,
            is_initiator,
        }
    }
}

/// The observable state of a handshake: the sticky result, the public keys
/// seen so far, and (after completion) the transport cipher states and
/// handshake hash.
#[derive(Default)]
pub struct HandshakeStatus {
    err: Option<Error>,
    local_ephemeral: Option<Box<dyn PublicKey>>,
    remote_static: Option<Box<dyn PublicKey>>,
    remote_ephemeral: Option<Box<dyn PublicKey>>,
    cipher_states: Option<(CipherState, Option<CipherState>)>,
    handshake_hash: Option<Vec<u8>>,
}

impl HandshakeStatus {
    /// The sticky result: `None` while in progress, [`Error::Done`] after
    /// successful completion, and any other error after a failure.
    pub fn error(&self) -> Option<Error> {
        self.err
    }

    /// Whether the handshake completed successfully.
    pub fn is_complete(&self) -> bool {
        self.err == Some(Error::Done)
    }

    /// The local ephemeral public key (`e`), once sent or pre-configured.
    pub fn local_ephemeral(&self) -> Option<&dyn PublicKey> {
        self.local_ephemeral.as_deref()
    }

    /// The remote static public key (`rs`), once known.
    pub fn remote_static(&self) -> Option<&dyn PublicKey> {
        self.remote_static.as_deref()
    }

    /// The remote ephemeral public key (`re`), once known.
    pub fn remote_ephemeral(&self) -> Option<&dyn PublicKey> {
        self.remote_ephemeral.as_deref()
    }

    /// The handshake hash, set once the handshake completes.
    pub fn handshake_hash(&self) -> Option<&[u8]> {
        self.handshake_hash.as_deref()
    }

    /// Takes the transport cipher states produced by the final `split`.
    ///
    /// The first state encrypts initiator-to-responder traffic, the second
    /// responder-to-initiator. For one-way patterns the second is `None`.
    pub fn take_cipher_states(&mut self) -> Option<(CipherState, Option<CipherState>)> {
        self.cipher_states.take()
    }
}

/// A pattern-driven Noise handshake.
///
/// Constructed from a [`HandshakeConfig`], advanced one message at a time
/// with [`write_message`](Self::write_message) and
/// [`read_message`](Self::read_message), and terminated either by an error
/// or by [`Error::Done`], after which the transport cipher states are
/// available from [`status_mut`](Self::status_mut).
pub struct HandshakeState<'a> {
    dh: Arc<dyn Dh>,
    pattern: Arc<HandshakePattern>,
    ss: SymmetricState,

    s: Option<Box<dyn Keypair>>,
    e: Option<Box<dyn Keypair>>,
    rs: Option<Box<dyn PublicKey>>,
    re: Option<Box<dyn PublicKey>>,
    psks: Vec<Zeroizing<[u8; PRE_SHARED_KEY_SIZE]>>,

    observer: Option<&'a mut dyn HandshakeObserver>,
    rng: Box<dyn CryptoRngCore + 'a>,

    status: HandshakeStatus,

    message_index: usize,
    psk_index: usize,
    dh_len: usize,
    max_message_size: usize,
    is_initiator: bool,
}

impl<'a> HandshakeState<'a> {
    /// Constructs a new handshake from `config`, applying the protocol
    /// name, prologue, and pre-messages to the symmetric state.
    ///
    /// This corresponds to the `Initialize` operation of the framework.
    pub fn new(config: HandshakeConfig<'a>) -> Result<Self, Error> {
        let protocol = &config.protocol;
        let pattern = protocol.pattern.clone();

        if pattern.num_psks() != config.pre_shared_keys.len() {
            return Err(Error::MissingPsk);
        }
        let mut psks = Vec::with_capacity(config.pre_shared_keys.len());
        for psk in &config.pre_shared_keys {
            let psk: [u8; PRE_SHARED_KEY_SIZE] =
                psk[..].try_into().map_err(|_| Error::MalformedPsk)?;
            psks.push(Zeroizing::new(psk));
        }

        let max_message_size = resolve_max_message_size(config.max_message_size);
        let mut ss = SymmetricState::new(
            protocol.cipher.clone(),
            protocol.hash.clone(),
            max_message_size,
        );
        ss.initialize_symmetric(protocol.to_string().as_bytes())?;
        ss.mix_hash(&config.prologue);

        let status = HandshakeStatus {
            local_ephemeral: config
                .local_ephemeral
                .as_ref()
                .map(|e| e.public().boxed_clone()),
            remote_static: config.remote_static.as_ref().map(|pk| pk.boxed_clone()),
            remote_ephemeral: config.remote_ephemeral.as_ref().map(|pk| pk.boxed_clone()),
            ..HandshakeStatus::default()
        };

        let mut hs = Self {
            dh: protocol.dh.clone(),
            dh_len: protocol.dh.dh_len(),
            pattern,
            ss,
            s: config.local_static,
            e: config.local_ephemeral,
            rs: config.remote_static,
            re: config.remote_ephemeral,
            psks,
            observer: config.observer,
            rng: config
                .rng
                .unwrap_or_else(|| Box::new(OsRng) as Box<dyn CryptoRngCore>),
            status,
            message_index: 0,
            psk_index: 0,
            max_message_size,
            is_initiator: config.is_initiator,
        };
        hs.apply_pre_messages()?;

        Ok(hs)
    }

    fn apply_pre_messages(&mut self) -> Result<(), Error> {
        let pattern = self.pattern.clone();
        let pre_messages = pattern.pre_messages();
        if pre_messages.is_empty() {
            return Ok(());
        }
        let has_psks = pattern.num_psks() > 0;

        // Gather the public keys from the initiator's point of view.
        let mut s = self.s.as_ref().map(|kp| kp.public().boxed_clone());
        let mut e = self.e.as_ref().map(|kp| kp.public().boxed_clone());
        let mut rs = self.rs.as_ref().map(|pk| pk.boxed_clone());
        let mut re = self.re.as_ref().map(|pk| pk.boxed_clone());
        if !self.is_initiator {
            core::mem::swap(&mut s, &mut rs);
            core::mem::swap(&mut e, &mut re);
        }

        for (index, message) in pre_messages.iter().enumerate() {
            let (side_s, side_e) = if index == 0 { (&s, &e) } else { (&rs, &re) };
            for token in message {
                match token {
                    Token::S => {
                        let public = side_s.as_deref().ok_or(Error::InvalidConfig)?;
                        self.ss.mix_hash(public.bytes());
                    }
                    Token::E => {
                        // No named pattern uses `e` in a pre-message, but
                        // custom patterns may.
                        let public = side_e.as_deref().ok_or(Error::InvalidConfig)?;
                        let bytes = public.bytes().to_vec();
                        self.ss.mix_hash(&bytes);
                        if has_psks {
                            self.ss.mix_key(&bytes)?;
                        }
                    }
                    _ => return Err(Error::InvalidConfig),
                }
            }
        }

        Ok(())
    }

    /// The handshake status.
    pub fn status(&self) -> &HandshakeStatus {
        &self.status
    }

    /// The handshake status, mutably; used to take the transport cipher
    /// states after completion.
    pub fn status_mut(&mut self) -> &mut HandshakeStatus {
        &mut self.status
    }

    /// The current handshake hash. After completion this is the final
    /// channel-binding value.
    pub fn handshake_hash(&self) -> &[u8] {
        self.ss.get_handshake_hash()
    }

    /// The encapsulated symmetric state.
    ///
    /// There should be no reason to touch this outside of protocol
    /// debugging.
    pub fn symmetric_state(&self) -> &SymmetricState {
        &self.ss
    }

    /// Whether this side is the initiator.
    pub fn is_initiator(&self) -> bool {
        self.is_initiator
    }

    /// Clears the handshake of sensitive material: the symmetric state's
    /// chaining key and cipher key, the DH keypairs, and the PSKs.
    ///
    /// The handshake hash and any parsed remote public keys survive.
    pub fn reset(&mut self) {
        self.ss.reset();
        self.s = None;
        self.e = None;
        self.psks.clear();
    }

    fn fail(&mut self, err: Error) -> Error {
        self.status.err = Some(err);
        err
    }

    /// Processes a write step, appending the handshake message for the
    /// current pattern message to `dst`.
    ///
    /// On the final message this returns [`Error::Done`] and the transport
    /// cipher states become available from the status.
    pub fn write_message(&mut self, dst: &mut Vec<u8>, payload: &[u8]) -> Result<(), Error> {
        if let Some(err) = self.status.err {
            return Err(err);
        }
        if self.is_initiator != (self.message_index % 2 == 0) {
            return Err(self.fail(Error::OutOfOrder));
        }

        let base_len = dst.len();
        let message = self.pattern.messages()[self.message_index].clone();
        for token in message {
            let step = match token {
                Token::E => self.on_write_token_e(dst),
                Token::S => self.on_write_token_s(dst),
                Token::Ee => self.on_token_ee(),
                Token::Es => self.on_token_es(),
                Token::Se => self.on_token_se(),
                Token::Ss => self.on_token_ss(),
                Token::Psk => self.on_token_psk(),
            };
            if let Err(err) = step {
                return Err(self.fail(err));
            }
        }

        if let Err(err) = self.ss.encrypt_and_hash(dst, payload) {
            return Err(self.fail(err));
        }
        if self.max_message_size > 0 && dst.len() - base_len > self.max_message_size {
            return Err(self.fail(Error::MessageSize));
        }

        self.on_message_done()
    }

    /// Processes a read step, appending the authenticated payload of the
    /// incoming handshake `message` to `dst`.
    ///
    /// On the final message this returns [`Error::Done`] and the transport
    /// cipher states become available from the status.
    pub fn read_message(&mut self, dst: &mut Vec<u8>, message: &[u8]) -> Result<(), Error> {
        if let Some(err) = self.status.err {
            return Err(err);
        }
        if self.is_initiator != (self.message_index % 2 == 1) {
            return Err(self.fail(Error::OutOfOrder));
        }
        if self.max_message_size > 0 && message.len() > self.max_message_size {
            return Err(self.fail(Error::MessageSize));
        }

        let mut payload = message;
        let tokens = self.pattern.messages()[self.message_index].clone();
        for token in tokens {
            let step = match token {
                Token::E => match self.on_read_token_e(payload) {
                    Ok(tail) => {
                        payload = tail;
                        Ok(())
                    }
                    Err(err) => Err(err),
                },
                Token::S => match self.on_read_token_s(payload) {
                    Ok(tail) => {
                        payload = tail;
                        Ok(())
                    }
                    Err(err) => Err(err),
                },
                Token::Ee => self.on_token_ee(),
                Token::Es => self.on_token_es(),
                Token::Se => self.on_token_se(),
                Token::Ss => self.on_token_ss(),
                Token::Psk => self.on_token_psk(),
            };
            if let Err(err) = step {
                return Err(self.fail(err));
            }
        }

        if let Err(err) = self.ss.decrypt_and_hash(dst, payload) {
            return Err(self.fail(err));
        }

        self.on_message_done()
    }

    fn on_message_done(&mut self) -> Result<(), Error> {
        self.message_index += 1;
        if self.message_index < self.pattern.messages().len() {
            return Ok(());
        }

        let (cs1, cs2) = match self.ss.split() {
            Ok(pair) => pair,
            Err(err) => return Err(self.fail(err)),
        };
        // One-way patterns only ever carry initiator-to-responder traffic;
        // withholding cs2 prevents misuse.
        let cs2 = if self.pattern.is_one_way() {
            drop(cs2);
            None
        } else {
            Some(cs2)
        };

        self.status.cipher_states = Some((cs1, cs2));
        self.status.handshake_hash = Some(self.ss.get_handshake_hash().to_vec());
        self.status.err = Some(Error::Done);

        // The secrets have served their purpose once the split happens.
        self.reset();

        Err(Error::Done)
    }

    fn on_write_token_e(&mut self, dst: &mut Vec<u8>) -> Result<(), Error> {
        // A pre-configured ephemeral is used as-is; otherwise generate one.
        if self.e.is_none() {
            self.e = Some(self.dh.generate_keypair(self.rng.as_mut())?);
        }
        let (e_bytes, e_public) = match self.e.as_ref() {
            Some(e) => (e.public().bytes().to_vec(), e.public().boxed_clone()),
            None => return Err(Error::InvalidConfig),
        };

        self.ss.mix_hash(&e_bytes);
        if self.pattern.num_psks() > 0 {
            self.ss.mix_key(&e_bytes)?;
        }
        self.status.local_ephemeral = Some(e_public);
        dst.extend_from_slice(&e_bytes);

        Ok(())
    }

    fn on_read_token_e<'m>(&mut self, payload: &'m [u8]) -> Result<&'m [u8], Error> {
        if payload.len() < self.dh_len {
            return Err(Error::TruncatedEphemeral);
        }
        let (e_bytes, tail) = payload.split_at(self.dh_len);

        let re = self.dh.parse_public_key(e_bytes)?;
        self.status.remote_ephemeral = Some(re.boxed_clone());
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_peer_public_key(Token::E, re.as_ref())?;
        }

        self.ss.mix_hash(e_bytes);
        if self.pattern.num_psks() > 0 {
            self.ss.mix_key(e_bytes)?;
        }
        self.re = Some(re);

        Ok(tail)
    }

    fn on_write_token_s(&mut self, dst: &mut Vec<u8>) -> Result<(), Error> {
        let s_bytes = match self.s.as_ref() {
            Some(s) => s.public().bytes().to_vec(),
            None => return Err(Error::InvalidConfig),
        };
        self.ss.encrypt_and_hash(dst, &s_bytes)
    }

    fn on_read_token_s<'m>(&mut self, payload: &'m [u8]) -> Result<&'m [u8], Error> {
        // DHLEN plus the tag when the symmetric state is keyed; phrasing it
        // via the cipher's own overhead supports any AEAD tag size.
        let mut temp_len = self.dh_len;
        if self.ss.has_cipher_key() {
            temp_len += self.ss.cipher_overhead();
        }
        if payload.len() < temp_len {
            return Err(Error::TruncatedStatic);
        }
        let (temp, tail) = payload.split_at(temp_len);

        let mut s_bytes = Vec::with_capacity(self.dh_len);
        self.ss.decrypt_and_hash(&mut s_bytes, temp)?;
        let rs = self.dh.parse_public_key(&s_bytes)?;

        self.status.remote_static = Some(rs.boxed_clone());
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_peer_public_key(Token::S, rs.as_ref())?;
        }
        self.rs = Some(rs);

        Ok(tail)
    }

    /// DH between the selected local keypair and remote public key, mixed
    /// into the chaining key. The shared secret is zeroized on drop.
    fn dh_and_mix(&mut self, local_ephemeral: bool, remote_ephemeral: bool) -> Result<(), Error> {
        let shared = {
            let keypair = if local_ephemeral {
                self.e.as_deref()
            } else {
                self.s.as_deref()
            }
            .ok_or(Error::InvalidConfig)?;
            let public = if remote_ephemeral {
                self.re.as_deref()
            } else {
                self.rs.as_deref()
            }
            .ok_or(Error::InvalidConfig)?;
            keypair.dh(public)?
        };
        self.ss.mix_key(&shared)
    }

    fn on_token_ee(&mut self) -> Result<(), Error> {
        self.dh_and_mix(true, true)
    }

    fn on_token_es(&mut self) -> Result<(), Error> {
        if self.is_initiator {
            self.dh_and_mix(true, false)
        } else {
            self.dh_and_mix(false, true)
        }
    }

    fn on_token_se(&mut self) -> Result<(), Error> {
        if self.is_initiator {
            self.dh_and_mix(false, true)
        } else {
            self.dh_and_mix(true, false)
        }
    }

    fn on_token_ss(&mut self) -> Result<(), Error> {
        self.dh_and_mix(false, false)
    }

    fn on_token_psk(&mut self) -> Result<(), Error> {
        // The PSK count was validated at construction.
        let psk = match self.psks.get(self.psk_index) {
            Some(psk) => Zeroizing::new(**psk),
            None => return Err(Error::MissingPsk),
        };
        self.psk_index += 1;
        self.ss.mix_key_and_hash(&psk[..])
    }
}
