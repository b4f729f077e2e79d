// ABOUTME: Process-level lifecycle: start brings up the SIP endpoint, SMPP session and bridge
// ABOUTME: stop drains in-flight messages, unbinds SMPP and closes the SIP socket

use crate::bridge::{Bridge, BridgeControl};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::{session, sip};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{info, warn};

/// A running gateway.
///
/// ```rust,no_run
/// use sipsmpp::config::{BindCredentials, GatewayConfig, SipConfig, SmppConfig};
/// use sipsmpp::Gateway;
///
/// # async fn run() -> sipsmpp::GatewayResult<()> {
/// let sip = SipConfig::new("0.0.0.0:5060".parse().unwrap(), "10.0.0.7:5060".parse().unwrap());
/// let smpp = SmppConfig::new("smsc.example.com:2775", BindCredentials::transceiver("gw", "secret"));
///
/// let gateway = Gateway::start(GatewayConfig::new(sip, smpp)).await?;
/// tokio::signal::ctrl_c().await?;
/// gateway.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Gateway {
    control: mpsc::Sender<BridgeControl>,
    bridge: JoinHandle<()>,
    session: JoinHandle<()>,
    endpoint: JoinHandle<()>,
    local_sip_addr: SocketAddr,
    drain_grace: Duration,
}

impl Gateway {
    /// Binds the SIP socket, starts the SMPP session and begins bridging.
    ///
    /// Fails only if the SIP socket cannot be bound. The SMPP session binds
    /// in the background and keeps retrying; until it is bound, inbound
    /// MESSAGE requests are answered with 480.
    pub async fn start(config: GatewayConfig) -> GatewayResult<Self> {
        let capacity = config.bridge.channel_capacity;

        let (sip_tx, sip_rx) = mpsc::unbounded_channel();
        let (endpoint_handle, endpoint) =
            sip::endpoint::bind(config.sip.clone(), capacity, sip_tx).await?;
        let local_sip_addr = endpoint_handle.local_addr();

        let (smpp_tx, smpp_rx) = mpsc::unbounded_channel();
        let (session_handle, session) = session::spawn(config.smpp.clone(), capacity, smpp_tx);

        let (control, control_rx) = mpsc::channel(1);
        let bridge = Bridge::new(
            config.bridge.clone(),
            session_handle,
            endpoint_handle,
            smpp_rx,
            sip_rx,
            control_rx,
        );
        let bridge = tokio::spawn(bridge.run());

        info!(
            sip = %local_sip_addr,
            smsc = %config.smpp.addr,
            destination = %config.sip.destination,
            "gateway started"
        );

        Ok(Self {
            control,
            bridge,
            session,
            endpoint,
            local_sip_addr,
            drain_grace: config.bridge.drain_grace,
        })
    }

    pub fn local_sip_addr(&self) -> SocketAddr {
        self.local_sip_addr
    }

    /// Stops accepting new MESSAGE requests, waits up to the drain grace
    /// for in-flight messages, then unbinds SMPP and closes the SIP socket.
    pub async fn stop(self) -> GatewayResult<()> {
        info!("gateway stopping");
        let (done, wait) = oneshot::channel();
        self.control
            .send(BridgeControl::Drain { done })
            .await
            .map_err(|_| GatewayError::SessionClosed)?;
        let _ = wait.await;
        let _ = self.bridge.await;

        // Both tasks finish on their own after unbind and shutdown
        for (name, task) in [("SMPP session", self.session), ("SIP endpoint", self.endpoint)] {
            let abort = task.abort_handle();
            if time::timeout(self.drain_grace, task).await.is_err() {
                warn!(task = name, "task did not stop in time, aborting");
                abort.abort();
            }
        }

        info!("gateway stopped");
        Ok(())
    }
}
