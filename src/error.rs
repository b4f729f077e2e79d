// ABOUTME: Gateway error taxonomy shared by the SMPP session, SIP endpoint and bridge
// ABOUTME: Every public fallible operation returns GatewayResult with one of these variants

use crate::codec::CodecError;
use crate::datatypes::CommandStatus;
use std::io;
use thiserror::Error;

/// Errors raised anywhere in the gateway.
///
/// Per-message failures (`SmppTimeout`, `SipRequestTimeout`, `SessionClosed`,
/// `Protocol`) are carried across the bridge and turned into a failure
/// response on the opposite protocol. Session-level failures close and
/// reopen the session that produced them.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// SMPP bytes that could not be decoded
    #[error("Malformed PDU: {0}")]
    MalformedPdu(#[from] CodecError),

    /// SIP bytes that could not be decoded
    #[error("Malformed SIP message: {0}")]
    MalformedMessage(String),

    /// A SIP stream frame that needs more bytes; not a failure on stream transports
    #[error("Incomplete SIP message")]
    IncompleteMessage,

    /// The SMSC answered bind_transceiver with a failure status
    #[error("Bind rejected: {0:?}")]
    BindRejected(CommandStatus),

    #[error("Bind timeout")]
    BindTimeout,

    /// A TCP connect or stream write to the peer did not finish in time
    #[error("Connect timeout to {0}")]
    ConnectTimeout(String),

    /// No SMPP response arrived within the response timeout
    #[error("SMPP response timeout")]
    SmppTimeout,

    /// The SIP client transaction exhausted its overall timeout
    #[error("SIP request timeout")]
    SipRequestTimeout,

    /// The owning session or endpoint closed while the work was outstanding
    #[error("Session closed")]
    SessionClosed,

    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// SMPP protocol error indicated by command_status field
    #[error("Protocol error: {0:?}")]
    Protocol(CommandStatus),

    #[error("SMPP session not bound")]
    NotBound,

    /// Unexpected PDU received (wrong response type for request)
    #[error("Unexpected PDU: expected {expected}, got {actual}")]
    UnexpectedPdu { expected: String, actual: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Data validation error (unmappable address, empty body, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Whether the error ends the SMPP link it happened on.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::BindRejected(_)
                | GatewayError::BindTimeout
                | GatewayError::ConnectTimeout(_)
                | GatewayError::SessionClosed
                | GatewayError::Connection(_)
        ) || matches!(self, GatewayError::MalformedPdu(e) if e.is_fatal())
    }
}
