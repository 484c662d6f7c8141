/// Errors that can occur while driving a Noise handshake or transport cipher.
///
/// All handshake-level errors are sticky: once a [`crate::HandshakeState`]
/// returns one, every subsequent call returns the same value. [`Error::Done`]
/// is the terminal *success*, returned by the read or write call that
/// completes the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The AEAD nonce counter reached 2^64 - 1, which is reserved for rekey.
    NonceExhausted,
    /// A message exceeds the active maximum message size, including the tag.
    MessageSize,
    /// AEAD authentication failed. The nonce counter was not advanced.
    AuthFail,
    /// The handshake configuration is unusable: a required pre-message key is
    /// absent, the local static key is missing at an `s` token, or a message
    /// pattern contains a token that is invalid in its position.
    InvalidConfig,
    /// A read or write was attempted by the wrong party for the current
    /// message index.
    OutOfOrder,
    /// The handshake completed successfully.
    Done,
    /// The protocol name is malformed or names an unknown algorithm.
    ProtocolNotSupported,
    /// A serialized private key has the wrong length.
    MalformedPrivateKey,
    /// A serialized public key has the wrong length.
    MalformedPublicKey,
    /// A DH was attempted with a public key of a different algorithm.
    MismatchedPublicKey,
    /// The number of configured pre-shared keys does not match the pattern.
    MissingPsk,
    /// A configured pre-shared key is not exactly 32 bytes.
    MalformedPsk,
    /// An incoming message is too short to hold the expected ephemeral key.
    TruncatedEphemeral,
    /// An incoming message is too short to hold the expected static key.
    TruncatedStatic,
    /// A cipher key is neither empty nor exactly 32 bytes.
    InvalidKeySize,
    /// Rekey was requested on an unkeyed cipher state.
    NoExistingKey,
    /// The configured entropy source failed while generating an ephemeral.
    EntropySource,
    /// A DH produced an all-zero shared secret (low-order public key).
    LowOrderPoint,
    /// A handshake pattern failed validation or PSK compilation.
    Pattern(PatternError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NonceExhausted => write!(f, "nonce counter exhausted"),
            Self::MessageSize => write!(f, "oversized message"),
            Self::AuthFail => write!(f, "AEAD authentication failure"),
            Self::InvalidConfig => write!(f, "invalid handshake configuration"),
            Self::OutOfOrder => write!(f, "out of order handshake operation"),
            Self::Done => write!(f, "handshake complete"),
            Self::ProtocolNotSupported => write!(f, "protocol not supported"),
            Self::MalformedPrivateKey => write!(f, "malformed private key"),
            Self::MalformedPublicKey => write!(f, "malformed public key"),
            Self::MismatchedPublicKey => write!(f, "mismatched public key algorithm"),
            Self::MissingPsk => write!(f, "missing or excessive pre-shared key(s)"),
            Self::MalformedPsk => write!(f, "malformed pre-shared key"),
            Self::TruncatedEphemeral => write!(f, "truncated message at ephemeral key"),
            Self::TruncatedStatic => write!(f, "truncated message at static key"),
            Self::InvalidKeySize => write!(f, "invalid cipher key size"),
            Self::NoExistingKey => write!(f, "rekey without an existing key"),
            Self::EntropySource => write!(f, "entropy source failure"),
            Self::LowOrderPoint => write!(f, "all-zero Diffie-Hellman output"),
            Self::Pattern(err) => write!(f, "invalid pattern: {err}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<PatternError> for Error {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}

/// Reasons a handshake pattern can fail validation or PSK compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternError {
    /// A pattern may carry at most two pre-messages.
    TooManyPreMessages,
    /// Pre-messages may only contain `e` and `s` tokens.
    InvalidPreMessageToken,
    /// A pattern must contain at least one message.
    NoMessages,
    /// A one-way pattern must contain exactly one message.
    OneWayExcessMessages,
    /// A party sent its ephemeral or static public key more than once.
    DuplicatePublicKey,
    /// The same DH calculation appears more than once.
    DuplicateDh,
    /// A DH was requested between keys a party cannot possess at that point.
    ImpossibleDh,
    /// A local-static DH is not completed by the matching ephemeral DH
    /// before the end of the message.
    MissingCompletionDh,
    /// A party processes a `psk` token without ever sending an ephemeral.
    PskWithoutEphemeral,
    /// The pattern performs no DH calculations at all.
    NoDh,
    /// The declared PSK count does not match the number of `psk` tokens.
    PskCountMismatch,
    /// The PSK compiler was given a template that already has PSKs.
    TemplateHasPsk,
    /// A modifier component does not start with `psk`.
    NonPskModifier,
    /// A `pskN` index could not be parsed.
    MalformedPskModifier,
    /// The same `pskN` index appears twice in one modifier.
    DuplicatePskModifier,
    /// A `pskN` index is outside `[0, number of messages]`.
    PskIndexOutOfRange,
}

impl core::fmt::Display for PatternError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooManyPreMessages => write!(f, "excessive pre-messages"),
            Self::InvalidPreMessageToken => write!(f, "invalid pre-message token"),
            Self::NoMessages => write!(f, "no handshake messages"),
            Self::OneWayExcessMessages => write!(f, "excessive messages for one-way pattern"),
            Self::DuplicatePublicKey => write!(f, "public key sent more than once"),
            Self::DuplicateDh => write!(f, "redundant DH calculation"),
            Self::ImpossibleDh => write!(f, "impossible DH calculation"),
            Self::MissingCompletionDh => write!(f, "missing DH calculation"),
            Self::PskWithoutEphemeral => write!(f, "psk token without ephemeral"),
            Self::NoDh => write!(f, "no DH calculations at all"),
            Self::PskCountMismatch => write!(f, "PSK count mismatch"),
            Self::TemplateHasPsk => write!(f, "PSK template pattern already has PSKs"),
            Self::NonPskModifier => write!(f, "non-PSK modifier"),
            Self::MalformedPskModifier => write!(f, "failed to parse PSK index"),
            Self::DuplicatePskModifier => write!(f, "redundant PSK modifier"),
            Self::PskIndexOutOfRange => write!(f, "PSK index out of range"),
        }
    }
}

impl core::error::Error for PatternError {}
