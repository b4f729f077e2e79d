// ABOUTME: SIP endpoint runtime: one task owning the SIP socket and every MESSAGE transaction
// ABOUTME: Feeds the transaction state machines and reports requests, responses and failures to the bridge

use super::codec;
use super::message::{Method, SipMessage, reason_phrase};
use super::timer::TimerQueue;
use super::transaction::{
    ClientAction, ClientEvent, ClientTransaction, ServerAction, ServerEvent, ServerTransaction,
    TransactionKey, TransactionState,
};
use super::transport::{Received, SipTransport};
use crate::config::SipConfig;
use crate::error::{GatewayError, GatewayResult};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, trace, warn};

/// Requests from the bridge to the endpoint
#[derive(Debug)]
pub enum EndpointCommand {
    /// Start a client transaction. The endpoint adds the topmost Via with `branch`.
    SendRequest {
        branch: String,
        request: SipMessage,
        correlated_sequence: Option<u32>,
    },
    /// Final response for an inbound MESSAGE
    Respond { key: TransactionKey, code: u16 },
    /// Answer new MESSAGE requests with 503 from now on
    StopAccepting,
    /// Fail open transactions and close the socket
    Shutdown { done: oneshot::Sender<()> },
}

/// Notifications from the endpoint to the bridge
#[derive(Debug)]
pub enum SipEvent {
    /// A new MESSAGE request that needs exactly one final response
    IncomingMessage {
        key: TransactionKey,
        request: SipMessage,
    },
    /// Final response to a request sent with `branch`
    ResponseReceived {
        branch: String,
        correlated_sequence: Option<u32>,
        response: SipMessage,
    },
    RequestFailed {
        branch: String,
        correlated_sequence: Option<u32>,
        error: GatewayError,
    },
}

#[derive(Debug, Clone)]
pub struct EndpointHandle {
    commands: mpsc::Sender<EndpointCommand>,
    local_addr: SocketAddr,
}

impl EndpointHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn send_request(
        &self,
        branch: String,
        request: SipMessage,
        correlated_sequence: Option<u32>,
    ) -> GatewayResult<()> {
        self.send(EndpointCommand::SendRequest {
            branch,
            request,
            correlated_sequence,
        })
        .await
    }

    pub async fn respond(&self, key: TransactionKey, code: u16) -> GatewayResult<()> {
        self.send(EndpointCommand::Respond { key, code }).await
    }

    pub async fn stop_accepting(&self) -> GatewayResult<()> {
        self.send(EndpointCommand::StopAccepting).await
    }

    /// Shut the endpoint down and wait for its task to finish
    pub async fn shutdown(&self) -> GatewayResult<()> {
        let (done, wait) = oneshot::channel();
        self.send(EndpointCommand::Shutdown { done }).await?;
        wait.await.map_err(|_| GatewayError::SessionClosed)
    }

    async fn send(&self, command: EndpointCommand) -> GatewayResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GatewayError::SessionClosed)
    }
}

/// Binds the SIP socket and spawns the endpoint task.
pub async fn bind(
    config: SipConfig,
    capacity: usize,
    events: mpsc::UnboundedSender<SipEvent>,
) -> GatewayResult<(EndpointHandle, JoinHandle<()>)> {
    let transport = SipTransport::bind(&config).await?;
    let local_addr = transport.local_addr()?;
    let (tx, rx) = mpsc::channel(capacity);

    let endpoint = SipEndpoint {
        tag: format!("{:08x}", rand::random::<u32>()),
        config,
        transport,
        local_addr,
        commands: rx,
        events,
        clients: HashMap::new(),
        servers: HashMap::new(),
        timers: TimerQueue::new(),
        accepting: true,
    };
    let task = tokio::spawn(endpoint.run());

    Ok((
        EndpointHandle {
            commands: tx,
            local_addr,
        },
        task,
    ))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TxnRef {
    Client(String),
    Server(TransactionKey),
}

struct ClientEntry {
    fsm: ClientTransaction,
    peer: SocketAddr,
    correlated_sequence: Option<u32>,
}

struct ServerEntry {
    fsm: ServerTransaction,
    peer: SocketAddr,
    request: SipMessage,
}

struct SipEndpoint {
    config: SipConfig,
    transport: SipTransport,
    local_addr: SocketAddr,
    commands: mpsc::Receiver<EndpointCommand>,
    events: mpsc::UnboundedSender<SipEvent>,
    clients: HashMap<String, ClientEntry>,
    servers: HashMap<TransactionKey, ServerEntry>,
    timers: TimerQueue<TxnRef>,
    accepting: bool,
    /// To tag placed on every final response this endpoint generates
    tag: String,
}

impl SipEndpoint {
    async fn run(mut self) {
        info!(
            addr = %self.local_addr,
            transport = self.config.transport.via_token(),
            "SIP endpoint listening"
        );

        loop {
            let wake = self
                .timers
                .next_deadline()
                .map(time::Instant::from_std)
                .unwrap_or_else(|| time::Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                received = self.transport.recv() => match received {
                    Ok(received) => self.on_received(received).await,
                    Err(e) => error!(error = %e, "SIP receive failed"),
                },
                command = self.commands.recv() => match command {
                    Some(EndpointCommand::Shutdown { done }) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                _ = time::sleep_until(wake) => self.on_timers().await,
            }
        }

        info!("SIP endpoint stopped");
    }

    fn reliable(&self) -> bool {
        self.config.transport.is_reliable()
    }

    fn emit(&self, event: SipEvent) {
        if self.events.send(event).is_err() {
            debug!("bridge gone, SIP event dropped");
        }
    }

    async fn on_command(&mut self, command: EndpointCommand) {
        match command {
            EndpointCommand::SendRequest {
                branch,
                request,
                correlated_sequence,
            } => self.send_request(branch, request, correlated_sequence).await,
            EndpointCommand::Respond { key, code } => self.respond(&key, code).await,
            EndpointCommand::StopAccepting => {
                info!("SIP endpoint no longer accepting new MESSAGE requests");
                self.accepting = false;
            }
            // Handled in run()
            EndpointCommand::Shutdown { .. } => {}
        }
    }

    async fn on_received(&mut self, received: Received) {
        match received {
            Received::Malformed { raw, error, peer } => {
                warn!(%peer, error = %error, "malformed SIP message");
                match codec::salvage(&raw) {
                    Some(request) if request.method() != Some(&Method::Ack) => {
                        self.send_stateless(&request, 400, peer).await;
                    }
                    _ => debug!(%peer, "malformed SIP message dropped without a response"),
                }
            }
            Received::Message { message, peer } if message.is_request() => {
                self.on_request(message, peer).await
            }
            Received::Message { message, peer } => self.on_response(message, peer).await,
        }
    }

    async fn on_request(&mut self, request: SipMessage, peer: SocketAddr) {
        let Some(method) = request.method().cloned() else {
            return;
        };
        if method == Method::Ack {
            trace!(%peer, "ACK ignored");
            return;
        }

        let Some(key) = TransactionKey::from_request(&request) else {
            warn!(%peer, "request without a Via branch");
            self.send_stateless(&request, 400, peer).await;
            return;
        };

        if let Some(entry) = self.servers.get_mut(&key) {
            debug!(branch = %key.branch, state = ?entry.fsm.state(), "request retransmission");
            let actions = entry.fsm.on_event(ServerEvent::Retransmission);
            self.perform_server(&key, actions).await;
            return;
        }

        trace!(%peer, %method, branch = %key.branch, "new server transaction");
        self.servers.insert(
            key.clone(),
            ServerEntry {
                fsm: ServerTransaction::new(self.config.timers.clone(), self.reliable()),
                peer,
                request: request.clone(),
            },
        );

        match method {
            Method::Message if self.accepting => {
                self.emit(SipEvent::IncomingMessage { key, request });
            }
            Method::Message => self.respond(&key, 503).await,
            _ => self.respond(&key, 405).await,
        }
    }

    async fn on_response(&mut self, response: SipMessage, peer: SocketAddr) {
        let Some(branch) = response.via_branch().map(str::to_string) else {
            warn!(%peer, "response without a Via branch dropped");
            return;
        };
        let Some(entry) = self.clients.get_mut(&branch) else {
            debug!(%peer, %branch, "response matches no client transaction");
            return;
        };

        let event = match response.status_code() {
            Some(code) if code < 200 => ClientEvent::Provisional(response),
            _ => ClientEvent::Final(response),
        };
        let actions = entry.fsm.on_event(event);
        self.perform_client(&branch, actions).await;
    }

    async fn on_timers(&mut self) {
        for (owner, timer) in self.timers.pop_expired(Instant::now()) {
            match owner {
                TxnRef::Client(branch) => {
                    if let Some(entry) = self.clients.get_mut(&branch) {
                        trace!(%branch, ?timer, "client timer fired");
                        let actions = entry.fsm.on_event(ClientEvent::TimerFired(timer));
                        self.perform_client(&branch, actions).await;
                    }
                }
                TxnRef::Server(key) => {
                    if let Some(entry) = self.servers.get_mut(&key) {
                        let actions = entry.fsm.on_event(ServerEvent::TimerFired(timer));
                        self.perform_server(&key, actions).await;
                    }
                }
            }
        }
    }

    async fn send_request(
        &mut self,
        branch: String,
        mut request: SipMessage,
        correlated_sequence: Option<u32>,
    ) {
        if self.clients.contains_key(&branch) {
            self.emit(SipEvent::RequestFailed {
                branch: branch.clone(),
                correlated_sequence,
                error: GatewayError::InvalidState(format!("branch {branch} already in use")),
            });
            return;
        }

        request.prepend_header(
            "Via",
            format!(
                "SIP/2.0/{} {};branch={}",
                self.config.transport.via_token(),
                self.local_addr,
                branch
            ),
        );
        if request.header("Max-Forwards").is_none() {
            request.set_header("Max-Forwards", "70");
        }

        let mut fsm = ClientTransaction::new(
            codec::to_bytes(&request),
            self.config.timers.clone(),
            self.reliable(),
        );
        let actions = fsm.start();
        debug!(%branch, ?correlated_sequence, "client transaction started");
        self.clients.insert(
            branch.clone(),
            ClientEntry {
                fsm,
                peer: self.config.destination,
                correlated_sequence,
            },
        );
        self.perform_client(&branch, actions).await;
    }

    /// Sends the final response for an inbound request, once.
    async fn respond(&mut self, key: &TransactionKey, code: u16) {
        let Some(entry) = self.servers.get_mut(key) else {
            warn!(branch = %key.branch, code, "no server transaction to respond on");
            return;
        };
        if entry.fsm.state() != TransactionState::Trying {
            warn!(branch = %key.branch, code, "server transaction already answered");
            return;
        }

        let mut response = entry.request.response_to(code, reason_phrase(code), &self.tag);
        if code == 405 {
            response.set_header("Allow", "MESSAGE");
        }
        debug!(branch = %key.branch, code, "sending final response");
        let actions = entry
            .fsm
            .on_event(ServerEvent::SendFinal(codec::to_bytes(&response)));
        self.perform_server(key, actions).await;
    }

    async fn send_stateless(&mut self, request: &SipMessage, code: u16, peer: SocketAddr) {
        let response = request.response_to(code, reason_phrase(code), &self.tag);
        if let Err(e) = self.transport.send(&codec::to_bytes(&response), peer).await {
            warn!(%peer, code, error = %e, "stateless response not sent");
        }
    }

    async fn perform_client(&mut self, branch: &str, actions: Vec<ClientAction>) {
        let owner = TxnRef::Client(branch.to_string());
        for action in actions {
            match action {
                ClientAction::Transmit(bytes) => {
                    let Some(peer) = self.clients.get(branch).map(|entry| entry.peer) else {
                        return;
                    };
                    if let Err(e) = self.transport.send(&bytes, peer).await {
                        error!(%branch, error = %e, "SIP request transmission failed");
                        self.fail_client(branch, e);
                        return;
                    }
                }
                ClientAction::Schedule { timer, duration } => {
                    self.timers
                        .schedule(owner.clone(), timer, Instant::now() + duration);
                }
                ClientAction::Cancel(timer) => self.timers.cancel(&owner, timer),
                ClientAction::Deliver(response) => {
                    if let Some(entry) = self.clients.get(branch) {
                        self.emit(SipEvent::ResponseReceived {
                            branch: branch.to_string(),
                            correlated_sequence: entry.correlated_sequence,
                            response,
                        });
                    }
                }
                ClientAction::Timeout => {
                    warn!(%branch, "SIP request timed out");
                    if let Some(entry) = self.clients.get(branch) {
                        self.emit(SipEvent::RequestFailed {
                            branch: branch.to_string(),
                            correlated_sequence: entry.correlated_sequence,
                            error: GatewayError::SipRequestTimeout,
                        });
                    }
                }
                ClientAction::Terminate => {
                    trace!(%branch, "client transaction terminated");
                    self.clients.remove(branch);
                    self.timers.cancel_all(&owner);
                }
            }
        }
    }

    fn fail_client(&mut self, branch: &str, error: GatewayError) {
        let owner = TxnRef::Client(branch.to_string());
        self.timers.cancel_all(&owner);
        if let Some(mut entry) = self.clients.remove(branch) {
            entry.fsm.on_event(ClientEvent::TransportError);
            self.emit(SipEvent::RequestFailed {
                branch: branch.to_string(),
                correlated_sequence: entry.correlated_sequence,
                error,
            });
        }
    }

    async fn perform_server(&mut self, key: &TransactionKey, actions: Vec<ServerAction>) {
        let owner = TxnRef::Server(key.clone());
        for action in actions {
            match action {
                ServerAction::Transmit(bytes) => {
                    let Some(peer) = self.servers.get(key).map(|entry| entry.peer) else {
                        return;
                    };
                    if let Err(e) = self.transport.send(&bytes, peer).await {
                        error!(branch = %key.branch, error = %e, "SIP response transmission failed");
                        if let Some(entry) = self.servers.get_mut(key) {
                            entry.fsm.on_event(ServerEvent::TransportError);
                        }
                        self.servers.remove(key);
                        self.timers.cancel_all(&owner);
                        return;
                    }
                }
                ServerAction::Schedule { timer, duration } => {
                    self.timers
                        .schedule(owner.clone(), timer, Instant::now() + duration);
                }
                ServerAction::Terminate => {
                    trace!(branch = %key.branch, "server transaction terminated");
                    self.servers.remove(key);
                    self.timers.cancel_all(&owner);
                }
            }
        }
    }

    /// Fails outstanding client transactions with SessionClosed and answers
    /// unanswered inbound requests with 503.
    async fn shutdown(&mut self) {
        self.accepting = false;

        let branches: Vec<String> = self.clients.keys().cloned().collect();
        for branch in branches {
            self.fail_client(&branch, GatewayError::SessionClosed);
        }

        let unanswered: Vec<TransactionKey> = self
            .servers
            .iter()
            .filter(|(_, entry)| entry.fsm.state() == TransactionState::Trying)
            .map(|(key, _)| key.clone())
            .collect();
        for key in unanswered {
            self.respond(&key, 503).await;
        }
    }
}
