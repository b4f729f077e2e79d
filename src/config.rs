// ABOUTME: Immutable gateway configuration: SMPP link, SIP endpoint and bridge settings
// ABOUTME: Every struct has sensible defaults and chained with_* setters

use crate::backoff::BackoffConfig;
use crate::datatypes::{InterfaceVersion, NumericPlanIndicator, TypeOfNumber};
use crate::session::KeepAliveConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Everything `Gateway::start` needs. Not reloadable once started.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub sip: SipConfig,
    pub smpp: SmppConfig,
    pub bridge: BridgeConfig,
}

impl GatewayConfig {
    pub fn new(sip: SipConfig, smpp: SmppConfig) -> Self {
        let bridge = BridgeConfig::new(sip.destination.ip().to_string());
        Self { sip, smpp, bridge }
    }

    pub fn with_bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }
}

/// Bind credentials for the transceiver session
#[derive(Debug, Clone)]
pub struct BindCredentials {
    /// System identifier for authentication
    pub system_id: String,
    /// Password for authentication
    pub password: String,
    /// System type (empty by default)
    pub system_type: String,
    /// SMPP interface version to use
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

impl BindCredentials {
    /// Create new bind credentials for transceiver session (defaults to SMPP v3.4)
    pub fn transceiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_address_range(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        range: impl Into<String>,
    ) -> Self {
        self.addr_ton = ton;
        self.addr_npi = npi;
        self.address_range = range.into();
        self
    }
}

/// SMPP link settings
#[derive(Debug, Clone)]
pub struct SmppConfig {
    /// SMSC host and port
    pub addr: String,
    pub credentials: BindCredentials,
    /// TCP connect to the SMSC (default: 5 seconds)
    pub connect_timeout: Duration,
    /// Wait for bind_transceiver_resp (default: 5 seconds)
    pub bind_timeout: Duration,
    /// Pending requests older than this resolve as SmppTimeout (default: 10 seconds)
    pub response_timeout: Duration,
    pub keep_alive: KeepAliveConfig,
    pub reconnect: BackoffConfig,
    /// Period of the pending sweep and keep-alive check (default: 1 second)
    pub housekeeping_interval: Duration,
}

impl SmppConfig {
    pub fn new(addr: impl Into<String>, credentials: BindCredentials) -> Self {
        Self {
            addr: addr.into(),
            credentials,
            connect_timeout: Duration::from_secs(5),
            bind_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(10),
            keep_alive: KeepAliveConfig::default(),
            reconnect: BackoffConfig::default(),
            housekeeping_interval: Duration::from_secs(1),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_reconnect(mut self, reconnect: BackoffConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }
}

/// SIP transport for both listening and sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    pub fn is_reliable(&self) -> bool {
        matches!(self, Transport::Tcp)
    }

    /// Token used in the Via sent-by protocol field
    pub fn via_token(&self) -> &'static str {
        match self {
            Transport::Udp => "UDP",
            Transport::Tcp => "TCP",
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            other => Err(format!("unsupported SIP transport '{other}'")),
        }
    }
}

/// Non-INVITE transaction timers (RFC 3261 section 17.1.2 and 17.2.2)
#[derive(Debug, Clone)]
pub struct SipTimers {
    /// First retransmit interval (default: 500 ms)
    pub t1: Duration,
    /// Retransmit interval cap (default: 4 seconds)
    pub t2: Duration,
    /// Overall client transaction timeout, timer F (default: 32 seconds)
    pub request_timeout: Duration,
    /// Client linger in Completed to absorb duplicate responses, timer K (default: 5 seconds)
    pub client_linger: Duration,
    /// Server linger in Completed to answer retransmitted requests, timer J (default: 32 seconds)
    pub server_linger: Duration,
}

impl Default for SipTimers {
    fn default() -> Self {
        Self {
            t1: Duration::from_millis(500),
            t2: Duration::from_secs(4),
            request_timeout: Duration::from_secs(32),
            client_linger: Duration::from_secs(5),
            server_linger: Duration::from_secs(32),
        }
    }
}

impl SipTimers {
    pub fn with_t1(mut self, t1: Duration) -> Self {
        self.t1 = t1;
        self
    }

    pub fn with_t2(mut self, t2: Duration) -> Self {
        self.t2 = t2;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_client_linger(mut self, linger: Duration) -> Self {
        self.client_linger = linger;
        self
    }

    pub fn with_server_linger(mut self, linger: Duration) -> Self {
        self.server_linger = linger;
        self
    }
}

/// SIP endpoint settings
#[derive(Debug, Clone)]
pub struct SipConfig {
    pub bind_addr: SocketAddr,
    /// Proxy or UA that receives MESSAGE requests built from deliver_sm
    pub destination: SocketAddr,
    pub transport: Transport,
    pub timers: SipTimers,
    /// Largest datagram or stream frame accepted (default: 64 KiB)
    pub max_message_size: usize,
    /// Opening an outbound TCP connection, and each stream write (default: 2 seconds)
    pub connect_timeout: Duration,
}

impl SipConfig {
    pub fn new(bind_addr: SocketAddr, destination: SocketAddr) -> Self {
        Self {
            bind_addr,
            destination,
            transport: Transport::Udp,
            timers: SipTimers::default(),
            max_message_size: 64 * 1024,
            connect_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_timers(mut self, timers: SipTimers) -> Self {
        self.timers = timers;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Bridge settings
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host part of generated SIP URIs
    pub domain: String,
    /// How long stop() waits for in-flight messages (default: 5 seconds)
    pub drain_grace: Duration,
    /// Capacity of each command queue into a session (default: 1024)
    pub channel_capacity: usize,
}

impl BridgeConfig {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            drain_grace: Duration::from_secs(5),
            channel_capacity: 1024,
        }
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let smpp = SmppConfig::new("127.0.0.1:2775", BindCredentials::transceiver("id", "pw"));
        assert_eq!(smpp.connect_timeout, Duration::from_secs(5));
        assert_eq!(smpp.bind_timeout, Duration::from_secs(5));
        assert_eq!(smpp.response_timeout, Duration::from_secs(10));
        assert_eq!(smpp.keep_alive.interval, Duration::from_secs(30));
        assert_eq!(smpp.reconnect.base, Duration::from_secs(1));
        assert_eq!(smpp.reconnect.cap, Duration::from_secs(60));

        let timers = SipTimers::default();
        assert_eq!(timers.t1, Duration::from_millis(500));
        assert_eq!(timers.request_timeout, Duration::from_secs(32));
        assert_eq!(timers.client_linger, Duration::from_secs(5));
    }

    #[test]
    fn bridge_domain_defaults_to_destination_host() {
        let sip = SipConfig::new(
            "127.0.0.1:5060".parse().unwrap(),
            "10.0.0.7:5060".parse().unwrap(),
        );
        let smpp = SmppConfig::new("127.0.0.1:2775", BindCredentials::transceiver("id", "pw"));
        let config = GatewayConfig::new(sip, smpp);
        assert_eq!(config.bridge.domain, "10.0.0.7");
    }

    #[test]
    fn transport_parses_case_insensitively() {
        assert_eq!("UDP".parse::<Transport>().unwrap(), Transport::Udp);
        assert_eq!("tcp".parse::<Transport>().unwrap(), Transport::Tcp);
        assert!("sctp".parse::<Transport>().is_err());
    }
}
