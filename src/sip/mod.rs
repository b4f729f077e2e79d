//! SIP side of the gateway: just enough of RFC 3261 to carry RFC 3428
//! MESSAGE requests in both directions.

pub mod codec;
pub mod endpoint;
pub mod message;
pub mod timer;
pub mod transaction;
pub mod transport;

pub use codec::SipCodecError;
pub use endpoint::{EndpointCommand, EndpointHandle, SipEvent};
pub use message::{Header, Method, SipMessage, StartLine};
pub use transaction::{TransactionKey, TransactionState, TransactionTimer};
