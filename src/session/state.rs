// ABOUTME: SMPP session state machine as a pure transition function
// ABOUTME: (state, event) -> (next state, side effects); the runtime performs the effects

use crate::datatypes::CommandStatus;

/// Lifecycle of the SMPP link.
///
/// ```text
/// Disconnected -> Binding -> Bound -> Unbinding -> Disconnected
///        \___________\_________\__________\____-> Failed (transport error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Binding,
    Bound,
    Unbinding,
    Failed,
}

impl SessionState {
    pub fn is_bound(&self) -> bool {
        matches!(self, SessionState::Bound)
    }

    /// True while a TCP connection is open
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionState::Binding | SessionState::Bound | SessionState::Unbinding
        )
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// TCP connection established
    TransportUp,
    /// TCP connect attempt failed
    ConnectFailed,
    BindAccepted,
    BindRejected(CommandStatus),
    BindTimedOut,
    /// Local request to end the session
    UnbindRequested,
    /// unbind_resp received, or the wait for it expired
    UnbindAcknowledged,
    /// The SMSC sent unbind
    PeerUnbind { sequence_number: u32 },
    /// Read or write failed, or the peer closed the socket
    TransportLost,
    /// enquire_link unanswered within the grace window
    KeepAliveExpired,
}

/// Work the runtime performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEffect {
    SendBind,
    SendUnbind,
    SendUnbindResp { sequence_number: u32 },
    /// Resolve every pending request as SessionClosed
    FailPending,
    CloseTransport,
    ScheduleReconnect,
}

/// Result of a legal transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub effects: Vec<LinkEffect>,
}

impl Transition {
    fn to(next: SessionState, effects: Vec<LinkEffect>) -> Self {
        Self { next, effects }
    }
}

/// Computes the transition for `event` in `state`.
///
/// Returns `None` when the event has no meaning in that state; the runtime
/// logs and ignores it.
pub fn on_event(state: SessionState, event: &LinkEvent) -> Option<Transition> {
    use LinkEffect::*;
    use SessionState::*;

    let transition = match (state, event) {
        (Disconnected | Failed, LinkEvent::TransportUp) => Transition::to(Binding, vec![SendBind]),
        (Disconnected | Failed, LinkEvent::ConnectFailed) => {
            Transition::to(Failed, vec![ScheduleReconnect])
        }

        (Binding, LinkEvent::BindAccepted) => Transition::to(Bound, vec![]),
        (Binding, LinkEvent::BindRejected(_) | LinkEvent::BindTimedOut) => {
            Transition::to(Failed, vec![CloseTransport, ScheduleReconnect])
        }

        (Bound, LinkEvent::UnbindRequested) => Transition::to(Unbinding, vec![SendUnbind]),
        (Binding, LinkEvent::UnbindRequested) => {
            Transition::to(Disconnected, vec![CloseTransport])
        }
        (Disconnected | Failed, LinkEvent::UnbindRequested) => Transition::to(Disconnected, vec![]),

        (Unbinding, LinkEvent::UnbindAcknowledged) => {
            Transition::to(Disconnected, vec![FailPending, CloseTransport])
        }

        (Unbinding, LinkEvent::PeerUnbind { sequence_number }) => Transition::to(
            Disconnected,
            vec![
                SendUnbindResp {
                    sequence_number: *sequence_number,
                },
                FailPending,
                CloseTransport,
            ],
        ),
        (Binding | Bound, LinkEvent::PeerUnbind { sequence_number }) => Transition::to(
            Disconnected,
            vec![
                SendUnbindResp {
                    sequence_number: *sequence_number,
                },
                FailPending,
                CloseTransport,
                ScheduleReconnect,
            ],
        ),

        (Unbinding, LinkEvent::TransportLost) => {
            Transition::to(Disconnected, vec![FailPending, CloseTransport])
        }
        (Binding | Bound, LinkEvent::TransportLost) | (Bound, LinkEvent::KeepAliveExpired) => {
            Transition::to(Failed, vec![FailPending, CloseTransport, ScheduleReconnect])
        }

        _ => return None,
    };

    Some(transition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_bind_and_unbind() {
        let t = on_event(SessionState::Disconnected, &LinkEvent::TransportUp).unwrap();
        assert_eq!(t.next, SessionState::Binding);
        assert_eq!(t.effects, vec![LinkEffect::SendBind]);

        let t = on_event(SessionState::Binding, &LinkEvent::BindAccepted).unwrap();
        assert_eq!(t.next, SessionState::Bound);

        let t = on_event(SessionState::Bound, &LinkEvent::UnbindRequested).unwrap();
        assert_eq!(t.next, SessionState::Unbinding);
        assert_eq!(t.effects, vec![LinkEffect::SendUnbind]);

        let t = on_event(SessionState::Unbinding, &LinkEvent::UnbindAcknowledged).unwrap();
        assert_eq!(t.next, SessionState::Disconnected);
        assert!(t.effects.contains(&LinkEffect::FailPending));
        assert!(!t.effects.contains(&LinkEffect::ScheduleReconnect));
    }

    #[test]
    fn bind_failures_schedule_reconnect() {
        for event in [
            LinkEvent::BindRejected(CommandStatus::InvalidPassword),
            LinkEvent::BindTimedOut,
        ] {
            let t = on_event(SessionState::Binding, &event).unwrap();
            assert_eq!(t.next, SessionState::Failed);
            assert!(t.effects.contains(&LinkEffect::ScheduleReconnect));
        }
    }

    #[test]
    fn failed_connect_retries() {
        let t = on_event(SessionState::Disconnected, &LinkEvent::ConnectFailed).unwrap();
        assert_eq!(t.next, SessionState::Failed);
        assert_eq!(t.effects, vec![LinkEffect::ScheduleReconnect]);
        assert!(on_event(SessionState::Failed, &LinkEvent::ConnectFailed).is_some());
    }

    #[test]
    fn keepalive_expiry_fails_bound_link() {
        let t = on_event(SessionState::Bound, &LinkEvent::KeepAliveExpired).unwrap();
        assert_eq!(t.next, SessionState::Failed);
        assert_eq!(
            t.effects,
            vec![
                LinkEffect::FailPending,
                LinkEffect::CloseTransport,
                LinkEffect::ScheduleReconnect
            ]
        );
    }

    #[test]
    fn peer_unbind_is_answered_then_reconnects() {
        let t = on_event(
            SessionState::Bound,
            &LinkEvent::PeerUnbind { sequence_number: 9 },
        )
        .unwrap();
        assert_eq!(t.next, SessionState::Disconnected);
        assert_eq!(
            t.effects[0],
            LinkEffect::SendUnbindResp { sequence_number: 9 }
        );
        assert!(t.effects.contains(&LinkEffect::ScheduleReconnect));
    }

    #[test]
    fn transport_loss_while_unbinding_does_not_reconnect() {
        let t = on_event(SessionState::Unbinding, &LinkEvent::TransportLost).unwrap();
        assert_eq!(t.next, SessionState::Disconnected);
        assert!(!t.effects.contains(&LinkEffect::ScheduleReconnect));
    }

    #[test]
    fn meaningless_events_are_ignored() {
        assert!(on_event(SessionState::Bound, &LinkEvent::BindAccepted).is_none());
        assert!(on_event(SessionState::Disconnected, &LinkEvent::KeepAliveExpired).is_none());
        assert!(on_event(SessionState::Bound, &LinkEvent::TransportUp).is_none());
    }
}
