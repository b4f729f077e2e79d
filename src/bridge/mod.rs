// ABOUTME: Translation bridge: the single task that owns cross-protocol correlation
// ABOUTME: Turns SIP MESSAGE requests into submit_sm and deliver_sm into SIP MESSAGE requests

//! Translation Bridge
//!
//! The bridge consumes events from the SMPP session and the SIP endpoint,
//! whichever is ready first, and drives the opposite side through its
//! handle. It is the only place a [`CorrelationTable`] is mutated.
//!
//! Every inbound MESSAGE gets exactly one final response and every
//! deliver_sm gets exactly one deliver_sm_resp, whatever happens to the
//! other side in between.

pub mod correlation;
pub mod mapping;

pub use correlation::{CorrelationTable, DeliveryRef};

use crate::config::BridgeConfig;
use crate::datatypes::{CommandStatus, DeliverSm};
use crate::session::{SessionHandle, SessionState, SmppEvent};
use crate::sip::{EndpointHandle, SipEvent, SipMessage, TransactionKey};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

/// Requests from the process-level gateway to the bridge
#[derive(Debug)]
pub enum BridgeControl {
    /// Stop taking new work, wait for in-flight messages up to the drain
    /// grace, then unbind SMPP and close the SIP endpoint
    Drain { done: oneshot::Sender<()> },
}

struct Drain {
    deadline: Instant,
    done: Option<oneshot::Sender<()>>,
}

pub struct Bridge {
    config: BridgeConfig,
    session: SessionHandle,
    endpoint: EndpointHandle,
    smpp_events: mpsc::UnboundedReceiver<SmppEvent>,
    sip_events: mpsc::UnboundedReceiver<SipEvent>,
    control: mpsc::Receiver<BridgeControl>,
    correlations: CorrelationTable,
    smpp_state: SessionState,
    drain: Option<Drain>,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        session: SessionHandle,
        endpoint: EndpointHandle,
        smpp_events: mpsc::UnboundedReceiver<SmppEvent>,
        sip_events: mpsc::UnboundedReceiver<SipEvent>,
        control: mpsc::Receiver<BridgeControl>,
    ) -> Self {
        Self {
            config,
            session,
            endpoint,
            smpp_events,
            sip_events,
            control,
            correlations: CorrelationTable::new(),
            smpp_state: SessionState::Disconnected,
            drain: None,
        }
    }

    pub async fn run(mut self) {
        info!(domain = %self.config.domain, "bridge running");
        let mut smpp_open = true;
        let mut sip_open = true;
        let mut control_open = true;

        loop {
            if self.drain.is_some() && self.correlations.is_empty() {
                info!("in-flight messages drained");
                break;
            }
            if !smpp_open && !sip_open {
                error!("both protocol sides are gone");
                break;
            }

            let deadline = match &self.drain {
                Some(drain) => drain.deadline,
                None => Instant::now() + Duration::from_secs(3600),
            };

            tokio::select! {
                event = self.smpp_events.recv(), if smpp_open => match event {
                    Some(event) => self.on_smpp_event(event).await,
                    None => {
                        warn!("SMPP session task ended");
                        smpp_open = false;
                        self.smpp_state = SessionState::Disconnected;
                    }
                },
                event = self.sip_events.recv(), if sip_open => match event {
                    Some(event) => self.on_sip_event(event).await,
                    None => {
                        warn!("SIP endpoint task ended");
                        sip_open = false;
                    }
                },
                control = self.control.recv(), if control_open && self.drain.is_none() => {
                    match control {
                        Some(BridgeControl::Drain { done }) => self.begin_drain(Some(done)).await,
                        None => {
                            control_open = false;
                            self.begin_drain(None).await;
                        }
                    }
                },
                _ = time::sleep_until(deadline), if self.drain.is_some() => {
                    warn!(
                        submits = self.correlations.pending_submits(),
                        deliveries = self.correlations.pending_deliveries(),
                        "drain grace expired"
                    );
                    break;
                }
            }
        }

        self.finish().await;
    }

    fn draining(&self) -> bool {
        self.drain.is_some()
    }

    async fn begin_drain(&mut self, done: Option<oneshot::Sender<()>>) {
        info!(
            submits = self.correlations.pending_submits(),
            deliveries = self.correlations.pending_deliveries(),
            grace_ms = self.config.drain_grace.as_millis() as u64,
            "draining gateway"
        );
        self.drain = Some(Drain {
            deadline: Instant::now() + self.config.drain_grace,
            done,
        });
        if let Err(e) = self.endpoint.stop_accepting().await {
            debug!(error = %e, "SIP endpoint already closed");
        }
    }

    /// Resolves everything still owed, then closes both sides.
    async fn finish(&mut self) {
        // Events the session queued before it saw the unbind
        if self.draining() {
            while let Ok(event) = self.smpp_events.try_recv() {
                self.on_smpp_event(event).await;
            }
        }

        let (transactions, deliveries) = self.correlations.drain();
        for key in transactions {
            warn!(branch = %key.branch, "MESSAGE unresolved at shutdown");
            self.respond(key, 503).await;
        }
        for delivery in deliveries {
            warn!(sequence_number = delivery.sequence_number, "deliver_sm unresolved at shutdown");
            self.respond_deliver(delivery, CommandStatus::ReceiverTemporaryAppError)
                .await;
        }

        let grace = self.config.drain_grace;
        match time::timeout(grace, self.session.unbind()).await {
            Ok(Ok(())) => debug!("SMPP session unbound"),
            Ok(Err(e)) => debug!(error = %e, "SMPP session already closed"),
            Err(_) => warn!("SMPP unbind did not complete in time"),
        }
        match time::timeout(grace, self.endpoint.shutdown()).await {
            Ok(Ok(())) => debug!("SIP endpoint closed"),
            Ok(Err(e)) => debug!(error = %e, "SIP endpoint already closed"),
            Err(_) => warn!("SIP endpoint shutdown did not complete in time"),
        }

        if let Some(done) = self.drain.take().and_then(|drain| drain.done) {
            let _ = done.send(());
        }
        info!("bridge stopped");
    }

    async fn on_sip_event(&mut self, event: SipEvent) {
        match event {
            SipEvent::IncomingMessage { key, request } => self.on_incoming(key, request).await,
            SipEvent::ResponseReceived {
                branch, response, ..
            } => {
                let code = response.status_code().unwrap_or(500);
                match self.correlations.take_delivery(&branch) {
                    Some(delivery) => {
                        let status = mapping::deliver_status(code);
                        debug!(%branch, code, ?status, "MESSAGE answered");
                        self.respond_deliver(delivery, status).await;
                    }
                    None => debug!(%branch, code, "response for an untracked MESSAGE"),
                }
            }
            SipEvent::RequestFailed { branch, error, .. } => {
                match self.correlations.take_delivery(&branch) {
                    Some(delivery) => {
                        warn!(%branch, error = %error, "MESSAGE failed");
                        self.respond_deliver(delivery, CommandStatus::ReceiverTemporaryAppError)
                            .await;
                    }
                    None => debug!(%branch, error = %error, "failure for an untracked MESSAGE"),
                }
            }
        }
    }

    async fn on_incoming(&mut self, key: TransactionKey, request: SipMessage) {
        if self.draining() {
            self.respond(key, 503).await;
            return;
        }

        let body = match mapping::submit_body(&request) {
            Ok(body) => body,
            Err(e) => {
                warn!(branch = %key.branch, error = %e, "MESSAGE cannot be mapped to submit_sm");
                self.respond(key, mapping::failure_response(&e)).await;
                return;
            }
        };

        if !self.smpp_state.is_bound() {
            debug!(branch = %key.branch, state = ?self.smpp_state, "SMPP not bound");
            self.respond(key, 480).await;
            return;
        }

        if !self.correlations.expect_submit(key.clone()) {
            warn!(branch = %key.branch, "MESSAGE already being bridged");
            return;
        }

        debug!(
            branch = %key.branch,
            source = %body.source_addr,
            destination = %body.destination_addr,
            "bridging MESSAGE to submit_sm"
        );
        if let Err(e) = self.session.submit(body, key.clone()).await {
            error!(error = %e, "SMPP session unreachable");
            self.correlations.abandon_submit(&key);
            self.respond(key, 503).await;
        }
    }

    async fn on_smpp_event(&mut self, event: SmppEvent) {
        match event {
            SmppEvent::StateChanged(state) => {
                debug!(from = ?self.smpp_state, to = ?state, "SMPP state seen by bridge");
                self.smpp_state = state;
            }
            SmppEvent::Submitted {
                origin,
                sequence_number,
            } => {
                if !self.correlations.bind_sequence(&origin, sequence_number) {
                    warn!(sequence_number, branch = %origin.branch, "submit_sm for an untracked MESSAGE");
                }
            }
            SmppEvent::SubmitRejected { origin, error } => {
                if self.correlations.abandon_submit(&origin) {
                    debug!(branch = %origin.branch, error = %error, "submit_sm not sent");
                    self.respond(origin, mapping::failure_response(&error)).await;
                }
            }
            SmppEvent::SubmitResolved {
                sequence_number,
                outcome,
                ..
            } => {
                let Some(key) = self.correlations.take_submit(sequence_number) else {
                    debug!(sequence_number, "submit_sm outcome for an untracked MESSAGE");
                    return;
                };
                let code = match outcome {
                    Ok(message_id) => {
                        info!(sequence_number, %message_id, "submit_sm accepted");
                        200
                    }
                    Err(e) => {
                        warn!(sequence_number, error = %e, "submit_sm failed");
                        mapping::failure_response(&e)
                    }
                };
                self.respond(key, code).await;
            }
            SmppEvent::Deliver {
                deliver,
                generation,
            } => self.on_deliver(*deliver, generation).await,
        }
    }

    async fn on_deliver(&mut self, deliver: DeliverSm, generation: u64) {
        let delivery = DeliveryRef {
            sequence_number: deliver.sequence_number,
            generation,
        };

        if deliver.body.is_delivery_receipt() {
            info!(
                sequence_number = delivery.sequence_number,
                source = %deliver.body.source_addr,
                "delivery receipt acknowledged"
            );
            self.respond_deliver(delivery, CommandStatus::Ok).await;
            return;
        }
        if self.draining() {
            self.respond_deliver(delivery, CommandStatus::ReceiverTemporaryAppError)
                .await;
            return;
        }
        if self.correlations.is_delivering(&delivery) {
            debug!(sequence_number = delivery.sequence_number, "deliver_sm already in flight");
            return;
        }

        let call_id = format!("{:016x}@{}", rand::random::<u64>(), self.config.domain);
        let tag = format!("{:08x}", rand::random::<u32>());
        let request =
            match mapping::outbound_message(&deliver.body, &self.config.domain, &call_id, &tag) {
                Ok(request) => request,
                Err(e) => {
                    warn!(sequence_number = delivery.sequence_number, error = %e, "deliver_sm cannot be mapped");
                    self.respond_deliver(delivery, CommandStatus::ReceiverPermanentAppError)
                        .await;
                    return;
                }
            };

        let branch = format!("z9hG4bK{:016x}", rand::random::<u64>());
        if !self.correlations.track_delivery(branch.clone(), delivery) {
            warn!(%branch, "branch collision, deliver_sm left for SMSC retry");
            self.respond_deliver(delivery, CommandStatus::ReceiverTemporaryAppError)
                .await;
            return;
        }

        debug!(
            sequence_number = delivery.sequence_number,
            %branch,
            source = %deliver.body.source_addr,
            destination = %deliver.body.destination_addr,
            "bridging deliver_sm to MESSAGE"
        );
        if let Err(e) = self
            .endpoint
            .send_request(branch.clone(), request, Some(delivery.sequence_number))
            .await
        {
            error!(error = %e, "SIP endpoint unreachable");
            self.correlations.take_delivery(&branch);
            self.respond_deliver(delivery, CommandStatus::ReceiverTemporaryAppError)
                .await;
        }
    }

    async fn respond(&self, key: TransactionKey, code: u16) {
        if let Err(e) = self.endpoint.respond(key, code).await {
            warn!(code, error = %e, "SIP response not delivered to endpoint");
        }
    }

    async fn respond_deliver(&self, delivery: DeliveryRef, status: CommandStatus) {
        if let Err(e) = self
            .session
            .respond_deliver(delivery.sequence_number, delivery.generation, status)
            .await
        {
            warn!(
                sequence_number = delivery.sequence_number,
                error = %e,
                "deliver_sm_resp not delivered to session"
            );
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("smpp_state", &self.smpp_state)
            .field("correlations", &self.correlations)
            .field("draining", &self.draining())
            .finish()
    }
}
