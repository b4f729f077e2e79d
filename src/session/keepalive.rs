// ABOUTME: SMPP keep-alive for the gateway's long-running transceiver link
// ABOUTME: Decides when to send enquire_link and when a missing response means the link is dead

use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Configuration for SMPP keep-alive functionality
///
/// Controls the periodic enquire_link PDUs sent while the link is idle. The
/// SMSC should respond with enquire_link_resp within `timeout`; if it does
/// not, the link is considered dead and the session reconnects.
///
/// # Example
///
/// ```rust
/// use sipsmpp::session::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval, 10s timeout)
/// let config = KeepAliveConfig::default();
///
/// // Custom configuration
/// let config = KeepAliveConfig::new(Duration::from_secs(60))
///     .with_timeout(Duration::from_secs(15));
///
/// // Disabled keep-alive
/// let config = KeepAliveConfig::disabled();
/// assert!(!config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Idle time after the last sent PDU before an enquire_link goes out (default: 30 seconds)
    pub interval: Duration,

    /// Grace window for the enquire_link_resp (default: 10 seconds)
    pub timeout: Duration,

    /// Whether keep-alive is enabled (default: true)
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    /// Create a new keep-alive configuration with custom interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set the timeout for enquire_link responses
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a disabled keep-alive configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// What the session should do after a keep-alive check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    Idle,
    SendEnquireLink,
    /// An enquire_link went unanswered past the grace window
    LinkDead,
}

/// Snapshot of the keep-alive counters
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct KeepAliveStatus {
    pub running: bool,
    /// Sequence number of the enquire_link still waiting for a response
    pub outstanding: Option<u32>,
    pub total_pings: u32,
    pub total_pongs: u32,
}

/// Tracks link idleness and outstanding enquire_link PDUs for one bound link.
///
/// Time is always passed in, so the manager can be driven without a clock:
///
/// ```rust
/// # use sipsmpp::session::{KeepAliveAction, KeepAliveConfig, KeepAliveManager};
/// # use std::time::{Duration, Instant};
/// let start = Instant::now();
/// let mut manager = KeepAliveManager::new(KeepAliveConfig::default(), start);
///
/// let later = start + Duration::from_secs(31);
/// assert_eq!(manager.poll(later), KeepAliveAction::SendEnquireLink);
/// manager.on_ping_sent(7, later);
/// assert!(manager.on_pong(7));
/// ```
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,

    /// Last time any PDU was written to the link
    last_sent: Instant,

    /// Outstanding enquire_link: (sequence_number, sent_at)
    outstanding: Option<(u32, Instant)>,

    total_pings: u32,
    total_pongs: u32,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig, now: Instant) -> Self {
        Self {
            config,
            last_sent: now,
            outstanding: None,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    /// Check whether an enquire_link is due or the link has died
    pub fn poll(&self, now: Instant) -> KeepAliveAction {
        if !self.config.enabled {
            return KeepAliveAction::Idle;
        }

        if let Some((sequence_number, sent_at)) = self.outstanding {
            if now.saturating_duration_since(sent_at) >= self.config.timeout {
                warn!(sequence_number, "enquire_link unanswered within grace window");
                return KeepAliveAction::LinkDead;
            }
            return KeepAliveAction::Idle;
        }

        if now.saturating_duration_since(self.last_sent) >= self.config.interval {
            KeepAliveAction::SendEnquireLink
        } else {
            KeepAliveAction::Idle
        }
    }

    /// Record that a PDU was written to the link
    pub fn on_traffic_sent(&mut self, now: Instant) {
        self.last_sent = now;
    }

    /// Record that an enquire_link was sent
    pub fn on_ping_sent(&mut self, sequence_number: u32, now: Instant) {
        self.outstanding = Some((sequence_number, now));
        self.last_sent = now;
        self.total_pings += 1;
        debug!(sequence_number, total = self.total_pings, "enquire_link sent");
    }

    /// Record an enquire_link_resp. Returns false if it answers nothing outstanding.
    pub fn on_pong(&mut self, sequence_number: u32) -> bool {
        match self.outstanding {
            Some((outstanding, _)) if outstanding == sequence_number => {
                self.outstanding = None;
                self.total_pongs += 1;
                trace!(sequence_number, total = self.total_pongs, "enquire_link_resp matched");
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.config.enabled,
            outstanding: self.outstanding.map(|(seq, _)| seq),
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
        }
    }
}
