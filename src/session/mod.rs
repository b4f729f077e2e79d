// ABOUTME: SMPP session runtime: one task owning the TCP link to the SMSC
// ABOUTME: Binds, keeps the link alive, correlates responses, and reconnects with backoff

//! SMPP Session
//!
//! The session task owns the only connection to the SMSC. It talks to the
//! rest of the gateway exclusively through channels:
//!
//! * [`SessionCommand`] in, from the bridge (bounded queue)
//! * [`SmppEvent`] out, to the bridge (unbounded, so the session never waits
//!   on the bridge)
//!
//! Inside the task, the pure [`state::on_event`] transition function decides
//! what a link event means and the runtime performs the resulting effects.

pub mod keepalive;
pub mod pending;
pub mod state;

pub use keepalive::{KeepAliveAction, KeepAliveConfig, KeepAliveManager};
pub use pending::{PendingSmppRequest, PendingTable};
pub use state::{LinkEffect, LinkEvent, SessionState, Transition};

use crate::backoff::Backoff;
use crate::codec::Frame;
use crate::config::SmppConfig;
use crate::connection::{self, FrameReader, FrameWriter, Inbound};
use crate::datatypes::{
    BindTransceiver, CommandId, CommandStatus, DeliverSm, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, GenericNack, MessageBody, SubmitSm, Unbind, UnbindResponse,
};
use crate::error::{GatewayError, GatewayResult};
use crate::sip::TransactionKey;
use std::collections::HashSet;
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Requests from the bridge to the session
#[derive(Debug)]
pub enum SessionCommand {
    /// Send a submit_sm on behalf of a SIP server transaction
    Submit {
        body: MessageBody,
        origin: TransactionKey,
    },
    /// Answer a deliver_sm received on link `generation`
    RespondDeliver {
        sequence_number: u32,
        generation: u64,
        status: CommandStatus,
    },
    /// Unbind, close the link and stop reconnecting
    Unbind { done: oneshot::Sender<()> },
}

/// Notifications from the session to the bridge
#[derive(Debug)]
pub enum SmppEvent {
    StateChanged(SessionState),
    /// The submit_sm for `origin` is on the wire as `sequence_number`
    Submitted {
        origin: TransactionKey,
        sequence_number: u32,
    },
    /// The submit_sm for `origin` was never sent
    SubmitRejected {
        origin: TransactionKey,
        error: GatewayError,
    },
    /// Final outcome of a submit_sm: the SMSC message_id, or why it failed
    SubmitResolved {
        sequence_number: u32,
        origin: Option<TransactionKey>,
        outcome: GatewayResult<String>,
    },
    /// A mobile-originated message or receipt that needs a deliver_sm_resp
    Deliver {
        deliver: Box<DeliverSm>,
        generation: u64,
    },
}

/// Cloneable sender side of the session's command queue
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub async fn submit(&self, body: MessageBody, origin: TransactionKey) -> GatewayResult<()> {
        self.send(SessionCommand::Submit { body, origin }).await
    }

    pub async fn respond_deliver(
        &self,
        sequence_number: u32,
        generation: u64,
        status: CommandStatus,
    ) -> GatewayResult<()> {
        self.send(SessionCommand::RespondDeliver {
            sequence_number,
            generation,
            status,
        })
        .await
    }

    /// Unbind and wait until the link is closed
    pub async fn unbind(&self) -> GatewayResult<()> {
        let (done, wait) = oneshot::channel();
        self.send(SessionCommand::Unbind { done }).await?;
        wait.await.map_err(|_| GatewayError::SessionClosed)
    }

    async fn send(&self, command: SessionCommand) -> GatewayResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GatewayError::SessionClosed)
    }
}

/// Spawns the session task. It connects immediately and keeps reconnecting
/// until unbound or until every handle is dropped.
pub fn spawn(
    config: SmppConfig,
    capacity: usize,
    events: mpsc::UnboundedSender<SmppEvent>,
) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    let session = SmppSession::new(config, rx, events);
    let task = tokio::spawn(session.run());
    (SessionHandle { commands: tx }, task)
}

/// Per-connection state, dropped with the TCP link
struct Link {
    writer: FrameWriter,
    keepalive: KeepAliveManager,
    /// deliver_sm sequence numbers received and not yet answered
    unanswered: HashSet<u32>,
}

struct SmppSession {
    config: SmppConfig,
    commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::UnboundedSender<SmppEvent>,
    state: SessionState,
    pending: PendingTable,
    /// Incremented on every successful bind
    generation: u64,
    backoff: Backoff,
    /// Set once unbind was requested or the bridge went away
    stopping: bool,
    reconnect: bool,
    unbind_waiters: Vec<oneshot::Sender<()>>,
}

impl SmppSession {
    fn new(
        config: SmppConfig,
        commands: mpsc::Receiver<SessionCommand>,
        events: mpsc::UnboundedSender<SmppEvent>,
    ) -> Self {
        let backoff = Backoff::new(config.reconnect.clone());
        Self {
            config,
            commands,
            events,
            state: SessionState::Disconnected,
            pending: PendingTable::new(),
            generation: 0,
            backoff,
            stopping: false,
            reconnect: false,
            unbind_waiters: Vec::new(),
        }
    }

    async fn run(mut self) {
        info!(addr = %self.config.addr, "SMPP session starting");

        while !self.stopping {
            self.reconnect = true;

            match self.connect_and_bind().await {
                Ok((reader, link)) => {
                    self.backoff.reset();
                    self.serve(reader, link).await;
                }
                Err(e) => warn!(error = %e, "SMPP link not established"),
            }

            if self.stopping || !self.reconnect {
                break;
            }

            let delay = self.backoff.next_delay();
            info!(
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "scheduling SMPP reconnect"
            );
            self.wait_for_reconnect(delay).await;
        }

        if self.state != SessionState::Disconnected {
            self.set_state(SessionState::Disconnected);
        }
        for waiter in self.unbind_waiters.drain(..) {
            let _ = waiter.send(());
        }
        info!("SMPP session stopped");
    }

    /// Applies a link event through the state machine. Returns the effects,
    /// or nothing if the event is meaningless in the current state.
    fn apply(&mut self, event: LinkEvent) -> Vec<LinkEffect> {
        match state::on_event(self.state, &event) {
            Some(transition) => {
                debug!(from = ?self.state, to = ?transition.next, ?event, "SMPP transition");
                if transition.next != self.state {
                    self.set_state(transition.next);
                }
                if transition.effects.contains(&LinkEffect::ScheduleReconnect) {
                    self.reconnect = true;
                } else if transition.effects.contains(&LinkEffect::CloseTransport) {
                    self.reconnect = false;
                }
                transition.effects
            }
            None => {
                debug!(state = ?self.state, ?event, "ignoring SMPP event");
                Vec::new()
            }
        }
    }

    fn set_state(&mut self, state: SessionState) {
        info!(from = ?self.state, to = ?state, "SMPP session state");
        self.state = state;
        self.emit(SmppEvent::StateChanged(state));
    }

    fn emit(&mut self, event: SmppEvent) {
        if self.events.send(event).is_err() {
            // Bridge is gone; nobody will consume results any more
            self.stopping = true;
        }
    }

    async fn connect_and_bind(&mut self) -> GatewayResult<(FrameReader, Link)> {
        let connect = time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.addr),
        );
        let socket = match connect.await {
            Ok(Ok(socket)) => socket,
            Ok(Err(e)) => {
                self.apply(LinkEvent::ConnectFailed);
                return Err(e.into());
            }
            Err(_) => {
                self.apply(LinkEvent::ConnectFailed);
                return Err(GatewayError::ConnectTimeout(self.config.addr.clone()));
            }
        };
        let _ = socket.set_nodelay(true);
        let (mut reader, writer) = connection::split(socket);
        let mut link = Link {
            writer,
            keepalive: KeepAliveManager::new(self.config.keep_alive.clone(), Instant::now()),
            unanswered: HashSet::new(),
        };

        if !self.apply(LinkEvent::TransportUp).contains(&LinkEffect::SendBind) {
            return Err(GatewayError::InvalidState(format!(
                "cannot bind from {:?}",
                self.state
            )));
        }

        let credentials = &self.config.credentials;
        let sequence_number = self.pending.next_sequence();
        let bind = BindTransceiver::new(
            sequence_number,
            &credentials.system_id,
            &credentials.password,
        )
        .system_type(credentials.system_type.clone())
        .interface_version(credentials.interface_version)
        .addr_ton(credentials.addr_ton)
        .addr_npi(credentials.addr_npi)
        .address_range(credentials.address_range.clone());

        if let Err(e) = link.writer.write_frame(&Frame::BindTransceiver(bind)).await {
            self.apply(LinkEvent::TransportLost);
            return Err(e);
        }
        debug!(sequence_number, system_id = %credentials.system_id, "bind_transceiver sent");

        let outcome = time::timeout(
            self.config.bind_timeout,
            Self::await_bind_resp(&mut reader, &mut link.writer, sequence_number),
        )
        .await;

        match outcome {
            Ok(Ok(system_id)) => {
                self.generation += 1;
                self.apply(LinkEvent::BindAccepted);
                info!(smsc = %system_id, generation = self.generation, "SMPP bound as transceiver");
                Ok((reader, link))
            }
            Ok(Err(GatewayError::BindRejected(status))) => {
                self.apply(LinkEvent::BindRejected(status));
                Err(GatewayError::BindRejected(status))
            }
            Ok(Err(e)) => {
                self.apply(LinkEvent::TransportLost);
                Err(e)
            }
            Err(_) => {
                self.apply(LinkEvent::BindTimedOut);
                Err(GatewayError::BindTimeout)
            }
        }
    }

    /// Reads until the bind response for `sequence_number` arrives.
    async fn await_bind_resp(
        reader: &mut FrameReader,
        writer: &mut FrameWriter,
        sequence_number: u32,
    ) -> GatewayResult<String> {
        loop {
            let frame = match reader.read_frame().await? {
                Some(Inbound::Frame(frame)) => frame,
                Some(Inbound::Malformed {
                    sequence_number,
                    error,
                }) => {
                    warn!(sequence_number, error = %error, "malformed PDU while binding");
                    let nack = GenericNack::new(error.to_command_status(), sequence_number);
                    writer.write_frame(&Frame::GenericNack(nack)).await?;
                    continue;
                }
                None => return Err(GatewayError::SessionClosed),
            };

            match frame {
                Frame::BindTransceiverResp(resp) if resp.sequence_number == sequence_number => {
                    return if resp.command_status.is_ok() {
                        Ok(resp.system_id)
                    } else {
                        Err(GatewayError::BindRejected(resp.command_status))
                    };
                }
                Frame::GenericNack(nack) if nack.sequence_number == sequence_number => {
                    return Err(GatewayError::BindRejected(nack.command_status));
                }
                Frame::EnquireLink(req) => {
                    let resp = EnquireLinkResponse::new(req.sequence_number);
                    writer.write_frame(&Frame::EnquireLinkResp(resp)).await?;
                }
                other => {
                    warn!(command_id = ?other.command_id(), "unexpected PDU while binding");
                }
            }
        }
    }

    async fn serve(&mut self, mut reader: FrameReader, mut link: Link) {
        let mut tick = time::interval(self.config.housekeeping_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            let event = tokio::select! {
                inbound = reader.read_frame() => match inbound {
                    Ok(Some(inbound)) => self.on_inbound(inbound, &mut link).await,
                    Ok(None) => {
                        info!("SMSC closed the connection");
                        Ok(Some(LinkEvent::TransportLost))
                    }
                    Err(e) => {
                        error!(error = %e, "SMPP read failed");
                        Ok(Some(LinkEvent::TransportLost))
                    }
                },
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.on_command(command, &mut link).await,
                    None => {
                        debug!("command queue closed, unbinding");
                        commands_open = false;
                        self.stopping = true;
                        Ok(Some(LinkEvent::UnbindRequested))
                    }
                },
                _ = tick.tick() => self.housekeeping(&mut link).await,
            };

            let event = match event {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "SMPP write failed");
                    LinkEvent::TransportLost
                }
            };

            if event == LinkEvent::UnbindRequested && self.state == SessionState::Bound {
                self.release_unanswered(&mut link).await;
            }

            let effects = self.apply(event);
            if self.perform(&effects, &mut link).await {
                let _ = link.writer.shutdown().await;
                return;
            }
        }
    }

    /// Runs the effects of a transition. Returns true when the link must close.
    async fn perform(&mut self, effects: &[LinkEffect], link: &mut Link) -> bool {
        let mut close = false;
        for effect in effects {
            match effect {
                LinkEffect::SendUnbind => {
                    let sequence_number =
                        self.pending.track(CommandId::Unbind, None, Instant::now());
                    if let Err(e) = self
                        .write(link, Frame::Unbind(Unbind::new(sequence_number)))
                        .await
                    {
                        warn!(error = %e, "unbind could not be sent");
                        self.apply(LinkEvent::TransportLost);
                        self.fail_pending();
                        return true;
                    }
                }
                LinkEffect::SendUnbindResp { sequence_number } => {
                    let resp = UnbindResponse::new(*sequence_number);
                    if let Err(e) = self.write(link, Frame::UnbindResp(resp)).await {
                        warn!(error = %e, "unbind_resp could not be sent");
                    }
                }
                LinkEffect::FailPending => self.fail_pending(),
                LinkEffect::CloseTransport => close = true,
                // Handled by the reconnect loop in run()
                LinkEffect::ScheduleReconnect | LinkEffect::SendBind => {}
            }
        }
        close
    }

    /// Answers every deliver_sm still waiting on the bridge with a
    /// temporary error, so the SMSC retries it after the unbind.
    async fn release_unanswered(&mut self, link: &mut Link) {
        let mut sequence_numbers: Vec<u32> = link.unanswered.drain().collect();
        sequence_numbers.sort_unstable();
        for sequence_number in sequence_numbers {
            debug!(sequence_number, "deliver_sm unanswered at unbind");
            let resp =
                DeliverSmResponse::new(sequence_number, CommandStatus::ReceiverTemporaryAppError);
            if let Err(e) = self.write(link, Frame::DeliverSmResp(resp)).await {
                warn!(error = %e, "deliver_sm_resp could not be sent before unbind");
                return;
            }
        }
    }

    fn fail_pending(&mut self) {
        for request in self.pending.drain() {
            if request.command_id == CommandId::SubmitSm {
                self.emit(SmppEvent::SubmitResolved {
                    sequence_number: request.sequence_number,
                    origin: request.origin,
                    outcome: Err(GatewayError::SessionClosed),
                });
            }
        }
    }

    async fn write(&mut self, link: &mut Link, frame: Frame) -> GatewayResult<()> {
        link.writer.write_frame(&frame).await?;
        link.keepalive.on_traffic_sent(Instant::now());
        Ok(())
    }

    async fn on_inbound(
        &mut self,
        inbound: Inbound,
        link: &mut Link,
    ) -> GatewayResult<Option<LinkEvent>> {
        let frame = match inbound {
            Inbound::Frame(frame) => frame,
            Inbound::Malformed {
                sequence_number,
                error,
            } => {
                warn!(sequence_number, error = %error, "malformed PDU, sending generic_nack");
                let nack = GenericNack::new(error.to_command_status(), sequence_number);
                self.write(link, Frame::GenericNack(nack)).await?;
                return Ok(None);
            }
        };

        trace!(
            command_id = ?frame.command_id(),
            sequence_number = frame.sequence_number(),
            "PDU received"
        );

        match frame {
            Frame::DeliverSm(deliver) => self.on_deliver(deliver, link).await?,
            Frame::EnquireLink(req) => {
                let resp = EnquireLinkResponse::new(req.sequence_number);
                self.write(link, Frame::EnquireLinkResp(resp)).await?;
            }
            Frame::Unbind(req) => {
                info!(sequence_number = req.sequence_number, "SMSC requested unbind");
                return Ok(Some(LinkEvent::PeerUnbind {
                    sequence_number: req.sequence_number,
                }));
            }
            Frame::SubmitSmResp(resp) => {
                let outcome = if resp.command_status.is_ok() {
                    Ok(resp.message_id)
                } else {
                    Err(GatewayError::Protocol(resp.command_status))
                };
                self.on_submit_resp(resp.sequence_number, outcome);
            }
            Frame::GenericNack(nack) => {
                warn!(
                    sequence_number = nack.sequence_number,
                    status = ?nack.command_status,
                    "generic_nack received"
                );
                if let Some(request) = self.pending.resolve(nack.sequence_number) {
                    if request.command_id == CommandId::SubmitSm {
                        self.emit(SmppEvent::SubmitResolved {
                            sequence_number: request.sequence_number,
                            origin: request.origin,
                            outcome: Err(GatewayError::Protocol(nack.command_status)),
                        });
                    } else if request.command_id == CommandId::Unbind {
                        return Ok(Some(LinkEvent::UnbindAcknowledged));
                    }
                }
            }
            Frame::EnquireLinkResp(resp) => {
                self.pending.resolve(resp.sequence_number);
                if !link.keepalive.on_pong(resp.sequence_number) {
                    debug!(sequence_number = resp.sequence_number, "unsolicited enquire_link_resp");
                }
            }
            Frame::UnbindResp(resp) => {
                if self.pending.resolve(resp.sequence_number).is_some() {
                    return Ok(Some(LinkEvent::UnbindAcknowledged));
                }
                warn!(sequence_number = resp.sequence_number, "unbind_resp matches no request");
            }
            Frame::SubmitSm(req) => {
                // An ESME never receives submit_sm
                let nack = GenericNack::invalid_command_id(req.sequence_number);
                self.write(link, Frame::GenericNack(nack)).await?;
            }
            Frame::BindTransceiver(req) => {
                let nack = GenericNack::new(CommandStatus::AlreadyBound, req.sequence_number);
                self.write(link, Frame::GenericNack(nack)).await?;
            }
            other => {
                warn!(
                    command_id = ?other.command_id(),
                    sequence_number = other.sequence_number(),
                    "unmatched response dropped"
                );
            }
        }
        Ok(None)
    }

    fn on_submit_resp(&mut self, sequence_number: u32, outcome: GatewayResult<String>) {
        match self.pending.resolve(sequence_number) {
            Some(request) if request.command_id == CommandId::SubmitSm => {
                debug!(sequence_number, ok = outcome.is_ok(), "submit_sm resolved");
                self.emit(SmppEvent::SubmitResolved {
                    sequence_number,
                    origin: request.origin,
                    outcome,
                });
            }
            Some(request) => {
                let error = GatewayError::UnexpectedPdu {
                    expected: request
                        .command_id
                        .response()
                        .map(|id| format!("{id:?}"))
                        .unwrap_or_default(),
                    actual: format!("{:?}", CommandId::SubmitSmResp),
                };
                warn!(sequence_number, error = %error, "response type mismatch, dropped");
            }
            None => warn!(sequence_number, "response matches no pending request, dropped"),
        }
    }

    async fn on_deliver(&mut self, deliver: Box<DeliverSm>, link: &mut Link) -> GatewayResult<()> {
        let sequence_number = deliver.sequence_number;

        if self.state != SessionState::Bound {
            // Unbinding: let the SMSC retry this message later
            let resp =
                DeliverSmResponse::new(sequence_number, CommandStatus::ReceiverTemporaryAppError);
            return self.write(link, Frame::DeliverSmResp(resp)).await;
        }

        if !link.unanswered.insert(sequence_number) {
            debug!(sequence_number, "duplicate deliver_sm while first copy is in flight");
            return Ok(());
        }

        self.emit(SmppEvent::Deliver {
            deliver,
            generation: self.generation,
        });
        Ok(())
    }

    async fn on_command(
        &mut self,
        command: SessionCommand,
        link: &mut Link,
    ) -> GatewayResult<Option<LinkEvent>> {
        match command {
            SessionCommand::Submit { body, origin } => {
                if self.state != SessionState::Bound {
                    self.emit(SmppEvent::SubmitRejected {
                        origin,
                        error: GatewayError::NotBound,
                    });
                    return Ok(None);
                }

                let submit = SubmitSm::new(0, body);
                // Validate the encoding before a sequence number is spent on it
                if let Err(e) = Frame::SubmitSm(Box::new(submit.clone())).to_bytes() {
                    self.emit(SmppEvent::SubmitRejected {
                        origin,
                        error: GatewayError::InvalidData(e.to_string()),
                    });
                    return Ok(None);
                }

                let sequence_number =
                    self.pending
                        .track(CommandId::SubmitSm, Some(origin.clone()), Instant::now());
                let submit = SubmitSm {
                    sequence_number,
                    ..submit
                };
                self.emit(SmppEvent::Submitted {
                    origin,
                    sequence_number,
                });
                self.write(link, Frame::SubmitSm(Box::new(submit))).await?;
                debug!(sequence_number, "submit_sm sent");
            }
            SessionCommand::RespondDeliver {
                sequence_number,
                generation,
                status,
            } => {
                if generation != self.generation || !self.state.is_connected() {
                    debug!(sequence_number, generation, "deliver_sm_resp for a closed link dropped");
                    return Ok(None);
                }
                if !link.unanswered.remove(&sequence_number) {
                    warn!(sequence_number, "deliver_sm already answered");
                    return Ok(None);
                }
                let resp = DeliverSmResponse::new(sequence_number, status);
                self.write(link, Frame::DeliverSmResp(resp)).await?;
            }
            SessionCommand::Unbind { done } => {
                self.stopping = true;
                self.unbind_waiters.push(done);
                return Ok(Some(LinkEvent::UnbindRequested));
            }
        }
        Ok(None)
    }

    async fn housekeeping(&mut self, link: &mut Link) -> GatewayResult<Option<LinkEvent>> {
        let now = Instant::now();
        let mut event = None;

        for request in self.pending.sweep(now, self.config.response_timeout) {
            match request.command_id {
                CommandId::SubmitSm => {
                    warn!(sequence_number = request.sequence_number, "submit_sm timed out");
                    self.emit(SmppEvent::SubmitResolved {
                        sequence_number: request.sequence_number,
                        origin: request.origin,
                        outcome: Err(GatewayError::SmppTimeout),
                    });
                }
                CommandId::Unbind => {
                    warn!("unbind_resp not received, closing anyway");
                    event = Some(LinkEvent::UnbindAcknowledged);
                }
                // enquire_link expiry is the keep-alive manager's decision
                _ => {}
            }
        }
        if event.is_some() {
            return Ok(event);
        }

        if self.state != SessionState::Bound {
            return Ok(None);
        }

        match link.keepalive.poll(now) {
            KeepAliveAction::Idle => Ok(None),
            KeepAliveAction::SendEnquireLink => {
                let sequence_number = self.pending.track(CommandId::EnquireLink, None, now);
                link.writer
                    .write_frame(&Frame::EnquireLink(EnquireLink::new(sequence_number)))
                    .await?;
                link.keepalive.on_ping_sent(sequence_number, now);
                Ok(None)
            }
            KeepAliveAction::LinkDead => Ok(Some(LinkEvent::KeepAliveExpired)),
        }
    }

    /// Sleeps out the reconnect delay while still answering commands.
    async fn wait_for_reconnect(&mut self, delay: std::time::Duration) {
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return,
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Submit { origin, .. }) => {
                        self.emit(SmppEvent::SubmitRejected {
                            origin,
                            error: GatewayError::NotBound,
                        });
                    }
                    Some(SessionCommand::RespondDeliver { sequence_number, .. }) => {
                        debug!(sequence_number, "link is down, deliver_sm_resp dropped");
                    }
                    Some(SessionCommand::Unbind { done }) => {
                        self.stopping = true;
                        self.unbind_waiters.push(done);
                        return;
                    }
                    None => {
                        self.stopping = true;
                        return;
                    }
                },
            }
        }
    }
}
