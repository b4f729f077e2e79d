//! # sipsmpp
//!
//! A bidirectional gateway between SIP MESSAGE (RFC 3428) and SMPP v3.4.
//!
//! * SIP MESSAGE in → `submit_sm` out; the `submit_sm_resp` becomes the SIP
//!   final response (200, or 480/503/400 on failure).
//! * `deliver_sm` in → SIP MESSAGE out; the SIP final response becomes the
//!   `deliver_sm_resp` status.
//!
//! The gateway runs three tasks: the SMPP [`session`], the SIP
//! [`sip::endpoint`], and the [`bridge`] between them. They only talk
//! through channels, and the bridge alone owns message correlation.
//!
//! ## Running the gateway
//!
//! ```rust,no_run
//! use sipsmpp::config::{BindCredentials, GatewayConfig, SipConfig, SmppConfig};
//! use sipsmpp::Gateway;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sip = SipConfig::new("0.0.0.0:5060".parse()?, "10.0.0.7:5060".parse()?);
//!     let smpp = SmppConfig::new("localhost:2775", BindCredentials::transceiver("system_id", "password"))
//!         .with_response_timeout(Duration::from_secs(5));
//!
//!     let gateway = Gateway::start(GatewayConfig::new(sip, smpp)).await?;
//!     tokio::signal::ctrl_c().await?;
//!
//!     // Drains in-flight messages, unbinds and closes the SIP socket
//!     gateway.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Using the codecs directly
//!
//! ```rust
//! use sipsmpp::datatypes::{MessageBody, SubmitSm};
//! use sipsmpp::{Encodable, Frame};
//!
//! let submit = SubmitSm::new(1, MessageBody::new("alice", "+15551234567", b"hi"));
//! let bytes = submit.to_bytes().unwrap();
//! assert!(matches!(Frame::decode(&bytes).unwrap(), Frame::SubmitSm(_)));
//!
//! let wire = b"MESSAGE sip:bob@example.com SIP/2.0\r\n\
//!     Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
//!     From: <sip:alice@example.com>;tag=1\r\n\
//!     To: <sip:bob@example.com>\r\n\
//!     Call-ID: abc\r\n\
//!     CSeq: 1 MESSAGE\r\n\
//!     Content-Length: 2\r\n\r\nhi";
//! let message = sipsmpp::sip::codec::decode(wire).unwrap();
//! assert_eq!(message.body.as_ref(), b"hi");
//! ```

mod macros;

pub mod backoff;
pub mod bridge;
pub mod codec;
pub mod config;
pub mod connection;
pub mod datatypes;
pub mod error;
pub mod gateway;
pub mod session;
pub mod sip;

#[cfg(test)]
mod tests;

// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use sip::{SipMessage, TransactionKey};
