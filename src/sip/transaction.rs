//! Non-INVITE transaction state machines (RFC 3261 sections 17.1.2 and 17.2.2).
//!
//! Both machines are pure: events go in, a list of actions comes out, and
//! the endpoint performs the actions (sending bytes, arming timers). Nothing
//! here touches a socket or a clock.

use super::message::SipMessage;
use crate::backoff::retransmit_interval;
use crate::config::SipTimers;
use bytes::Bytes;
use std::time::Duration;

/// Identity of a server transaction: the topmost Via branch plus Call-ID
/// and CSeq number. Retransmissions of a request share all three.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    pub branch: String,
    pub call_id: String,
    pub cseq: u32,
}

impl TransactionKey {
    /// Returns None when the request lacks any of the identifying headers.
    pub fn from_request(request: &SipMessage) -> Option<Self> {
        Some(Self {
            branch: request.via_branch()?.to_string(),
            call_id: request.call_id()?.to_string(),
            cseq: request.cseq()?.0,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Trying,
    Proceeding,
    Completed,
    Terminated,
}

/// Timers of the non-INVITE transactions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionTimer {
    /// Client request retransmission
    E,
    /// Client overall timeout
    F,
    /// Client wait for response retransmissions
    K,
    /// Server wait for request retransmissions
    J,
}

impl TransactionTimer {
    pub const ALL: [TransactionTimer; 4] = [
        TransactionTimer::E,
        TransactionTimer::F,
        TransactionTimer::K,
        TransactionTimer::J,
    ];
}

#[derive(Debug)]
pub enum ClientEvent {
    Provisional(SipMessage),
    Final(SipMessage),
    TimerFired(TransactionTimer),
    TransportError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    Transmit(Bytes),
    Schedule {
        timer: TransactionTimer,
        duration: Duration,
    },
    Cancel(TransactionTimer),
    /// Hand the final response to the transaction user
    Deliver(SipMessage),
    /// Timer F fired before any final response
    Timeout,
    Terminate,
}

/// Client side of one outbound MESSAGE.
#[derive(Debug)]
pub struct ClientTransaction {
    state: TransactionState,
    request: Bytes,
    timers: SipTimers,
    reliable: bool,
    retransmits: u32,
}

impl ClientTransaction {
    pub fn new(request: Bytes, timers: SipTimers, reliable: bool) -> Self {
        Self {
            state: TransactionState::Trying,
            request,
            timers,
            reliable,
            retransmits: 0,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn retransmits(&self) -> u32 {
        self.retransmits
    }

    /// Initial send: transmit, arm E (unreliable transports only) and F.
    pub fn start(&mut self) -> Vec<ClientAction> {
        self.state = TransactionState::Trying;
        let mut actions = vec![ClientAction::Transmit(self.request.clone())];
        if !self.reliable {
            actions.push(ClientAction::Schedule {
                timer: TransactionTimer::E,
                duration: self.timers.t1,
            });
        }
        actions.push(ClientAction::Schedule {
            timer: TransactionTimer::F,
            duration: self.timers.request_timeout,
        });
        actions
    }

    pub fn on_event(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        use TransactionState::*;
        match (self.state, event) {
            (Trying | Proceeding, ClientEvent::Provisional(_)) => {
                self.state = Proceeding;
                Vec::new()
            }
            (Trying | Proceeding, ClientEvent::Final(response)) => self.handle_final(response),
            (Trying | Proceeding, ClientEvent::TimerFired(TransactionTimer::E)) => {
                self.handle_timer_e()
            }
            (Trying | Proceeding, ClientEvent::TimerFired(TransactionTimer::F)) => {
                self.state = Terminated;
                vec![
                    ClientAction::Cancel(TransactionTimer::E),
                    ClientAction::Timeout,
                    ClientAction::Terminate,
                ]
            }
            (Completed, ClientEvent::TimerFired(TransactionTimer::K)) => {
                self.state = Terminated;
                vec![ClientAction::Terminate]
            }
            (Terminated, _) => Vec::new(),
            (_, ClientEvent::TransportError) => {
                self.state = Terminated;
                vec![ClientAction::Terminate]
            }
            // Response retransmissions absorbed while Completed
            _ => Vec::new(),
        }
    }

    fn handle_final(&mut self, response: SipMessage) -> Vec<ClientAction> {
        let mut actions = vec![
            ClientAction::Cancel(TransactionTimer::E),
            ClientAction::Cancel(TransactionTimer::F),
            ClientAction::Deliver(response),
        ];
        if self.reliable || self.timers.client_linger.is_zero() {
            self.state = TransactionState::Terminated;
            actions.push(ClientAction::Terminate);
        } else {
            self.state = TransactionState::Completed;
            actions.push(ClientAction::Schedule {
                timer: TransactionTimer::K,
                duration: self.timers.client_linger,
            });
        }
        actions
    }

    fn handle_timer_e(&mut self) -> Vec<ClientAction> {
        self.retransmits += 1;
        // In Proceeding the interval stays at T2
        let duration = if self.state == TransactionState::Proceeding {
            self.timers.t2
        } else {
            retransmit_interval(self.retransmits, self.timers.t1, self.timers.t2)
        };
        vec![
            ClientAction::Transmit(self.request.clone()),
            ClientAction::Schedule {
                timer: TransactionTimer::E,
                duration,
            },
        ]
    }
}

#[derive(Debug)]
pub enum ServerEvent {
    /// The same request arrived again
    Retransmission,
    /// The transaction user's final response, already encoded
    SendFinal(Bytes),
    TimerFired(TransactionTimer),
    TransportError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerAction {
    Transmit(Bytes),
    Schedule {
        timer: TransactionTimer,
        duration: Duration,
    },
    Terminate,
}

/// Server side of one inbound request.
#[derive(Debug)]
pub struct ServerTransaction {
    state: TransactionState,
    last_response: Option<Bytes>,
    timers: SipTimers,
    reliable: bool,
}

impl ServerTransaction {
    pub fn new(timers: SipTimers, reliable: bool) -> Self {
        Self {
            state: TransactionState::Trying,
            last_response: None,
            timers,
            reliable,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Timer J. A stream peer does not retransmit, but a request resent on
    /// a new connection still gets the cached response for one T1.
    fn linger(&self) -> Duration {
        if self.reliable {
            self.timers.t1.min(self.timers.server_linger)
        } else {
            self.timers.server_linger
        }
    }

    pub fn on_event(&mut self, event: ServerEvent) -> Vec<ServerAction> {
        use TransactionState::*;
        match (self.state, event) {
            (Trying | Proceeding, ServerEvent::SendFinal(response)) => {
                self.last_response = Some(response.clone());
                let mut actions = vec![ServerAction::Transmit(response)];
                let linger = self.linger();
                if linger.is_zero() {
                    self.state = Terminated;
                    actions.push(ServerAction::Terminate);
                } else {
                    self.state = Completed;
                    actions.push(ServerAction::Schedule {
                        timer: TransactionTimer::J,
                        duration: linger,
                    });
                }
                actions
            }
            (Completed, ServerEvent::Retransmission) => self
                .last_response
                .clone()
                .map(ServerAction::Transmit)
                .into_iter()
                .collect(),
            (Completed, ServerEvent::TimerFired(TransactionTimer::J)) => {
                self.state = Terminated;
                vec![ServerAction::Terminate]
            }
            (Trying | Proceeding | Completed, ServerEvent::TransportError) => {
                self.state = Terminated;
                vec![ServerAction::Terminate]
            }
            // Retransmissions while Trying are absorbed; a second final
            // response is never sent
            _ => Vec::new(),
        }
    }
}
