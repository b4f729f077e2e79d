// ABOUTME: sipsmppd daemon: builds a GatewayConfig from the command line and runs the gateway
// ABOUTME: Ctrl-C drains in-flight messages, unbinds from the SMSC and exits

//! # sipsmppd
//!
//! ```bash
//! # UDP SIP on 5060, forwarding deliver_sm to a proxy at 10.0.0.7
//! sipsmppd --sip-listen 0.0.0.0:5060 --sip-destination 10.0.0.7:5060 \
//!   --smsc smsc.example.com:2775 --system-id gw --password secret
//!
//! # TCP SIP, tighter timers, debug logging
//! sipsmppd -d --sip-transport tcp \
//!   --sip-listen 0.0.0.0:5060 --sip-destination 10.0.0.7:5060 \
//!   --smsc 127.0.0.1:2775 --system-id gw --password secret \
//!   --response-timeout 5 --keep-alive-interval 15
//! ```

use argh::FromArgs;
use sipsmpp::backoff::BackoffConfig;
use sipsmpp::config::{
    BindCredentials, BridgeConfig, GatewayConfig, SipConfig, SipTimers, SmppConfig, Transport,
};
use sipsmpp::session::KeepAliveConfig;
use sipsmpp::Gateway;
use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Bidirectional SIP MESSAGE to SMPP gateway
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// local SIP address to listen on (default: 0.0.0.0:5060)
    #[argh(option)]
    sip_listen: Option<SocketAddr>,

    /// SIP proxy or UA that receives MESSAGE requests built from deliver_sm
    #[argh(option)]
    sip_destination: SocketAddr,

    /// SIP transport, udp or tcp (default: udp)
    #[argh(option)]
    sip_transport: Option<Transport>,

    /// host part of generated SIP URIs (default: the destination IP)
    #[argh(option)]
    sip_domain: Option<String>,

    /// SIP T1 retransmission interval in milliseconds (default: 500)
    #[argh(option)]
    sip_t1: Option<u64>,

    /// SIP request timeout in seconds (default: 32)
    #[argh(option)]
    sip_timeout: Option<u64>,

    /// SMSC host:port (default: localhost:2775)
    #[argh(option)]
    smsc: Option<String>,

    /// the system id
    #[argh(option)]
    system_id: String,

    /// the password
    #[argh(option)]
    password: String,

    /// the system type (default: empty)
    #[argh(option)]
    system_type: Option<String>,

    /// TCP connect timeout in seconds, for the SMSC and SIP TCP peers (default: 5)
    #[argh(option)]
    connect_timeout: Option<u64>,

    /// bind response timeout in seconds (default: 5)
    #[argh(option)]
    bind_timeout: Option<u64>,

    /// SMPP response timeout in seconds (default: 10)
    #[argh(option)]
    response_timeout: Option<u64>,

    /// keep-alive interval in seconds (default: 30)
    #[argh(option)]
    keep_alive_interval: Option<u64>,

    /// keep-alive timeout in seconds (default: 10)
    #[argh(option)]
    keep_alive_timeout: Option<u64>,

    /// maximum reconnect delay in seconds (default: 60)
    #[argh(option)]
    reconnect_cap: Option<u64>,

    /// seconds to wait for in-flight messages on shutdown (default: 5)
    #[argh(option)]
    drain_grace: Option<u64>,
}

impl CliArgs {
    fn into_config(self) -> GatewayConfig {
        let mut timers = SipTimers::default();
        if let Some(t1) = self.sip_t1 {
            timers = timers.with_t1(Duration::from_millis(t1));
        }
        if let Some(timeout) = self.sip_timeout {
            timers = timers.with_request_timeout(Duration::from_secs(timeout));
        }

        let listen = self
            .sip_listen
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5060)));
        let mut sip = SipConfig::new(listen, self.sip_destination)
            .with_transport(self.sip_transport.unwrap_or(Transport::Udp))
            .with_timers(timers);
        if let Some(timeout) = self.connect_timeout {
            sip = sip.with_connect_timeout(Duration::from_secs(timeout));
        }

        let mut credentials = BindCredentials::transceiver(self.system_id, self.password);
        if let Some(system_type) = self.system_type {
            credentials = credentials.with_system_type(system_type);
        }

        let mut keep_alive =
            KeepAliveConfig::new(Duration::from_secs(self.keep_alive_interval.unwrap_or(30)));
        if let Some(timeout) = self.keep_alive_timeout {
            keep_alive = keep_alive.with_timeout(Duration::from_secs(timeout));
        }

        let mut smpp = SmppConfig::new(
            self.smsc.unwrap_or_else(|| "localhost:2775".to_owned()),
            credentials,
        )
        .with_keep_alive(keep_alive);
        if let Some(timeout) = self.connect_timeout {
            smpp = smpp.with_connect_timeout(Duration::from_secs(timeout));
        }
        if let Some(timeout) = self.bind_timeout {
            smpp = smpp.with_bind_timeout(Duration::from_secs(timeout));
        }
        if let Some(timeout) = self.response_timeout {
            smpp = smpp.with_response_timeout(Duration::from_secs(timeout));
        }
        if let Some(cap) = self.reconnect_cap {
            smpp = smpp.with_reconnect(BackoffConfig::new(
                Duration::from_secs(1),
                Duration::from_secs(cap.max(1)),
            ));
        }

        let mut config = GatewayConfig::new(sip, smpp);
        let domain = self.sip_domain.unwrap_or(config.bridge.domain.clone());
        let mut bridge = BridgeConfig::new(domain);
        if let Some(grace) = self.drain_grace {
            bridge = bridge.with_drain_grace(Duration::from_secs(grace));
        }
        config = config.with_bridge(bridge);
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = cli_args.into_config();
    info!(
        sip = %config.sip.bind_addr,
        smsc = %config.smpp.addr,
        "starting sipsmppd"
    );

    let gateway = Gateway::start(config).await.map_err(|e| {
        error!("Gateway failed to start: {e}");
        Box::<dyn Error>::from(e.to_string())
    })?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    gateway.stop().await?;
    Ok(())
}
