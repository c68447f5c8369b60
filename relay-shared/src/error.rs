#![allow(dead_code)]

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer: full")]
    ErrBufferFull,
    #[error("buffer: closed")]
    ErrBufferClosed,
    #[error("packet too big")]
    ErrPacketTooBig,
    #[error("mutex poison: {0}")]
    PoisonError(String),

    // RTP errors
    #[error("RTP header size insufficient")]
    ErrHeaderSizeInsufficient,
    #[error("RTP header size insufficient for extension")]
    ErrHeaderSizeInsufficientForExtension,
    #[error("packet is not large enough")]
    ErrShortPacket,
    #[error("RED block length {0} overflows the payload")]
    ErrRedBlockOverflow(usize),
    #[error("payload type {0} is not RED")]
    ErrNotRedPayload(u8),

    // RTCP errors
    #[error("RTCP packet too short to be read")]
    PacketTooShort,
    #[error("buffer too short for the RTCP packet")]
    BufferTooShort,
    #[error("RTCP version is not 2")]
    BadVersion,
    #[error("invalid RTCP header")]
    InvalidHeader,
    #[error("unexpected RTCP packet type")]
    WrongType,

    // ICE errors
    #[error("ICE connection is not ready")]
    ErrIceNotReady,
    #[error("agent is closed")]
    ErrAgentClosed,
    /// Indicates a component id outside the managed stream.
    #[error("no such component {0}")]
    ErrNoSuchComponent(u16),
    #[error("unknown candidate type")]
    ErrUnknownCandidateType,
    #[error("failed to parse address")]
    ErrAddressParseFailed,

    // Connection errors
    #[error("no transport for {0}")]
    ErrNoTransport(String),
    #[error("remote description has not been set")]
    ErrNoRemoteDescription,
    #[error("remote description has already been set")]
    ErrRemoteDescriptionAlreadySet,
    #[error("transport {0} is not ready")]
    ErrTransportNotReady(String),
    #[error("connection is closed")]
    ErrConnectionClosed,
    #[error("secure channel: {0}")]
    ErrSecureChannel(String),

    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Std(#[source] StdError),
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn from_std<T>(error: T) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        Error::Std(StdError(Box::new(error)))
    }
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// io::Error has no PartialEq; compare kinds.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

/// An escape hatch to preserve the source of errors raised by collaborators
/// (ICE agents, secure channels) that have their own error types.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StdError(pub Box<dyn std::error::Error + Send + Sync>);

impl PartialEq for StdError {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::PoisonError(e.to_string())
    }
}
