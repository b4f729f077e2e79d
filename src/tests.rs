//! End-to-end gateway scenarios over loopback sockets: a mock SMSC on TCP
//! and a mock SIP user agent on UDP.

use crate::backoff::BackoffConfig;
use crate::codec::Frame;
use crate::config::{
    BindCredentials, BridgeConfig, GatewayConfig, SipConfig, SipTimers, SmppConfig, Transport,
};
use crate::connection::{self, FrameReader, FrameWriter, Inbound};
use crate::datatypes::*;
use crate::gateway::Gateway;
use crate::session::{self, KeepAliveConfig, SessionState, SmppEvent};
use crate::sip::codec;
use crate::sip::message::user_part;
use crate::sip::SipMessage;
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

#[cfg(test)]
mod integration_tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(3);

    /// SMSC side of one TCP connection
    struct MockSmsc {
        reader: FrameReader,
        writer: FrameWriter,
    }

    impl MockSmsc {
        /// Accepts the next connection and answers its bind_transceiver
        async fn accept(listener: &TcpListener) -> Self {
            let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
            let (reader, writer) = connection::split(stream);
            let mut smsc = Self { reader, writer };

            match smsc.next().await {
                Frame::BindTransceiver(bind) => {
                    assert_eq!(bind.system_id, "gw");
                    assert_eq!(bind.password, "secret");
                    let resp =
                        BindTransceiverResponse::new(bind.sequence_number, CommandStatus::Ok, "smsc");
                    smsc.send(Frame::BindTransceiverResp(resp)).await;
                }
                other => panic!("expected bind_transceiver, got {other:?}"),
            }
            smsc
        }

        async fn next(&mut self) -> Frame {
            match timeout(WAIT, self.reader.read_frame()).await.unwrap().unwrap() {
                Some(Inbound::Frame(frame)) => frame,
                other => panic!("unexpected {other:?}"),
            }
        }

        async fn send(&mut self, frame: Frame) {
            self.writer.write_frame(&frame).await.unwrap();
        }

        async fn expect_unbind(&mut self) {
            loop {
                if let Frame::Unbind(unbind) = self.next().await {
                    let resp = UnbindResponse::new(unbind.sequence_number);
                    self.send(Frame::UnbindResp(resp)).await;
                    return;
                }
            }
        }
    }

    fn gateway_config(smsc: SocketAddr, ua: SocketAddr) -> GatewayConfig {
        let sip = SipConfig::new("127.0.0.1:0".parse().unwrap(), ua);
        let smpp = SmppConfig::new(smsc.to_string(), BindCredentials::transceiver("gw", "secret"))
            .with_keep_alive(KeepAliveConfig::disabled())
            .with_housekeeping_interval(Duration::from_millis(50));
        GatewayConfig::new(sip, smpp)
            .with_bridge(BridgeConfig::new("127.0.0.1").with_drain_grace(Duration::from_secs(1)))
    }

    fn message_request(branch: &str, from: &str, to: &str, body: &str, gw: SocketAddr) -> String {
        format!(
            "MESSAGE sip:{to}@{gw} SIP/2.0\r\n\
             Via: SIP/2.0/UDP 127.0.0.1:5999;branch={branch}\r\n\
             From: <sip:{from}@example.com>;tag=ua1\r\n\
             To: <sip:{to}@{gw}>\r\n\
             Call-ID: {branch}@example.com\r\n\
             CSeq: 1 MESSAGE\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    async fn recv_sip(ua: &UdpSocket) -> SipMessage {
        let mut buf = vec![0u8; 65536];
        let (len, _) = timeout(WAIT, ua.recv_from(&mut buf)).await.unwrap().unwrap();
        codec::decode(&buf[..len]).unwrap()
    }

    /// Reads the next message from a SIP TCP stream
    async fn recv_sip_stream(stream: &mut TcpStream, buffer: &mut BytesMut) -> SipMessage {
        loop {
            if let Ok((message, used)) = codec::decode_prefix(buffer) {
                buffer.advance(used);
                return message;
            }
            let read = timeout(WAIT, stream.read_buf(buffer)).await.unwrap().unwrap();
            assert!(read > 0, "SIP TCP stream closed");
        }
    }

    async fn stop(gateway: Gateway, smsc: &mut MockSmsc) {
        let stopping = tokio::spawn(gateway.stop());
        smsc.expect_unbind().await;
        timeout(WAIT, stopping).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn sip_message_becomes_submit_sm_and_200_ok() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;
        sleep(Duration::from_millis(200)).await;

        let request = message_request("z9hG4bKe2e1", "alice", "+15551234567", "hi", gw);
        ua.send_to(request.as_bytes(), gw).await.unwrap();
        // A retransmission must not produce a second submit_sm
        ua.send_to(request.as_bytes(), gw).await.unwrap();

        let submit = match smsc.next().await {
            Frame::SubmitSm(submit) => submit,
            other => panic!("expected submit_sm, got {other:?}"),
        };
        assert_eq!(submit.body.source_addr, "alice");
        assert_eq!(submit.body.destination_addr, "+15551234567");
        assert_eq!(submit.body.short_message.as_ref(), b"hi");
        assert_eq!(submit.body.dest_addr_ton, TypeOfNumber::International);

        let resp = SubmitSmResponse::new(submit.sequence_number, CommandStatus::Ok, "msg-1");
        smsc.send(Frame::SubmitSmResp(resp)).await;

        let response = recv_sip(&ua).await;
        assert_eq!(response.status_code(), Some(200));
        assert_eq!(response.via_branch(), Some("z9hG4bKe2e1"));
        assert_eq!(response.call_id(), Some("z9hG4bKe2e1@example.com"));

        assert!(
            timeout(Duration::from_millis(200), smsc.reader.read_frame())
                .await
                .is_err(),
            "no further PDU expected"
        );

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn peer_unbind_mid_flight_answers_503() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;
        sleep(Duration::from_millis(200)).await;

        let request = message_request("z9hG4bKe2e2", "alice", "+15551234567", "hi", gw);
        ua.send_to(request.as_bytes(), gw).await.unwrap();
        assert!(matches!(smsc.next().await, Frame::SubmitSm(_)));

        // The SMSC unbinds with the submit_sm still pending
        smsc.send(Frame::Unbind(Unbind::new(99))).await;
        match smsc.next().await {
            Frame::UnbindResp(resp) => assert_eq!(resp.sequence_number, 99),
            other => panic!("expected unbind_resp, got {other:?}"),
        }

        let response = recv_sip(&ua).await;
        assert_eq!(response.status_code(), Some(503));

        // Refuse the reconnect so shutdown does not wait on a bind
        drop(listener);
        drop(smsc);
        timeout(WAIT, gateway.stop()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn deliver_sm_becomes_message_and_ok_resp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;

        let body = MessageBody::new("+15551234567", "bob", b"hello");
        smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(7, body))))
            .await;

        let request = recv_sip(&ua).await;
        assert_eq!(request.request_uri(), Some("sip:bob@127.0.0.1"));
        assert_eq!(request.header("From").and_then(user_part), Some("+15551234567"));
        assert_eq!(request.body.as_ref(), b"hello");

        let ok = request.response_to(200, "OK", "bob1");
        ua.send_to(&codec::to_bytes(&ok), gw).await.unwrap();

        match smsc.next().await {
            Frame::DeliverSmResp(resp) => {
                assert_eq!(resp.sequence_number, 7);
                assert_eq!(resp.command_status, CommandStatus::Ok);
            }
            other => panic!("expected deliver_sm_resp, got {other:?}"),
        }

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn rejected_message_maps_to_permanent_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;

        let body = MessageBody::new("+15551234567", "nobody", b"hello");
        smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(8, body))))
            .await;

        let request = recv_sip(&ua).await;
        let not_found = request.response_to(404, "Not Found", "x");
        ua.send_to(&codec::to_bytes(&not_found), gw).await.unwrap();

        match smsc.next().await {
            Frame::DeliverSmResp(resp) => {
                assert_eq!(resp.sequence_number, 8);
                assert_eq!(resp.command_status, CommandStatus::ReceiverPermanentAppError);
            }
            other => panic!("expected deliver_sm_resp, got {other:?}"),
        }

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn delivery_receipt_is_acknowledged_without_sip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let mut smsc = MockSmsc::accept(&listener).await;

        let receipt = MessageBody::new("+15551234567", "alice", b"id:msg-1 stat:DELIVRD")
            .esm_class(0x04);
        smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(9, receipt))))
            .await;

        match smsc.next().await {
            Frame::DeliverSmResp(resp) => {
                assert_eq!(resp.sequence_number, 9);
                assert!(resp.command_status.is_ok());
            }
            other => panic!("expected deliver_sm_resp, got {other:?}"),
        }

        let mut buf = [0u8; 1024];
        assert!(
            timeout(Duration::from_millis(200), ua.recv_from(&mut buf))
                .await
                .is_err()
        );

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn message_while_smpp_down_gets_480() {
        // A port with nothing listening
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let smsc_addr = closed.local_addr().unwrap();
        drop(closed);

        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let gateway = Gateway::start(gateway_config(smsc_addr, ua.local_addr().unwrap()))
            .await
            .unwrap();
        let gw = gateway.local_sip_addr();

        let request = message_request("z9hG4bKe2e3", "alice", "+15551234567", "hi", gw);
        ua.send_to(request.as_bytes(), gw).await.unwrap();

        let response = recv_sip(&ua).await;
        assert_eq!(response.status_code(), Some(480));

        timeout(WAIT, gateway.stop()).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missed_enquire_link_fails_session_and_reconnects_after_backoff() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = SmppConfig::new(
            listener.local_addr().unwrap().to_string(),
            BindCredentials::transceiver("gw", "secret"),
        )
        .with_keep_alive(
            KeepAliveConfig::new(Duration::from_millis(100))
                .with_timeout(Duration::from_millis(100)),
        )
        .with_housekeeping_interval(Duration::from_millis(20));

        let (tx, mut events) = mpsc::unbounded_channel();
        let (handle, task) = session::spawn(config, 8, tx);

        let mut smsc = MockSmsc::accept(&listener).await;
        // The SMSC never answers enquire_link
        assert!(matches!(smsc.next().await, Frame::EnquireLink(_)));

        let failed_at = loop {
            match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
                SmppEvent::StateChanged(SessionState::Failed) => break Instant::now(),
                _ => continue,
            }
        };

        let mut smsc = MockSmsc::accept(&listener).await;
        assert!(failed_at.elapsed() >= Duration::from_millis(950));

        let unbinding = tokio::spawn(async move { handle.unbind().await });
        smsc.expect_unbind().await;
        timeout(WAIT, unbinding).await.unwrap().unwrap().unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unanswered_connect_fails_session_within_connect_timeout() {
        // TEST-NET-1 is never routed, so the SYN goes unanswered
        let config = SmppConfig::new("192.0.2.1:2775", BindCredentials::transceiver("gw", "secret"))
            .with_connect_timeout(Duration::from_millis(200))
            .with_reconnect(BackoffConfig::new(
                Duration::from_millis(100),
                Duration::from_millis(100),
            ));

        let (tx, mut events) = mpsc::unbounded_channel();
        let started = Instant::now();
        let (handle, task) = session::spawn(config, 8, tx);

        loop {
            match timeout(Duration::from_millis(1500), events.recv()).await {
                Ok(Some(SmppEvent::StateChanged(SessionState::Failed))) => break,
                Ok(Some(_)) => continue,
                other => panic!("session never gave up on the connect: {other:?}"),
            }
        }
        assert!(started.elapsed() < Duration::from_millis(1500));

        timeout(WAIT, handle.unbind()).await.unwrap().unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn deliver_sm_unanswered_at_shutdown_gets_temporary_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let mut smsc = MockSmsc::accept(&listener).await;

        let body = MessageBody::new("+15551234567", "bob", b"late");
        smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(21, body))))
            .await;
        // The UA sees the MESSAGE and never answers it
        let request = recv_sip(&ua).await;
        assert_eq!(request.body.as_ref(), b"late");

        let stopping = tokio::spawn(gateway.stop());
        match smsc.next().await {
            Frame::DeliverSmResp(resp) => {
                assert_eq!(resp.sequence_number, 21);
                assert_eq!(resp.command_status, CommandStatus::ReceiverTemporaryAppError);
            }
            other => panic!("expected deliver_sm_resp before unbind, got {other:?}"),
        }
        smsc.expect_unbind().await;
        timeout(WAIT, stopping).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn unbind_answers_deliver_sm_the_bridge_never_saw() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = SmppConfig::new(
            listener.local_addr().unwrap().to_string(),
            BindCredentials::transceiver("gw", "secret"),
        )
        .with_keep_alive(KeepAliveConfig::disabled());

        let (tx, mut events) = mpsc::unbounded_channel();
        let (handle, task) = session::spawn(config, 8, tx);
        let mut smsc = MockSmsc::accept(&listener).await;

        for sequence_number in [31, 32] {
            let body = MessageBody::new("+15551234567", "bob", b"queued");
            smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(sequence_number, body))))
                .await;
        }
        let mut delivered = 0;
        while delivered < 2 {
            if let SmppEvent::Deliver { .. } = timeout(WAIT, events.recv()).await.unwrap().unwrap() {
                delivered += 1;
            }
        }

        let unbinding = tokio::spawn(async move { handle.unbind().await });
        for expected in [31, 32] {
            match smsc.next().await {
                Frame::DeliverSmResp(resp) => {
                    assert_eq!(resp.sequence_number, expected);
                    assert_eq!(resp.command_status, CommandStatus::ReceiverTemporaryAppError);
                }
                other => panic!("expected deliver_sm_resp, got {other:?}"),
            }
        }
        match smsc.next().await {
            Frame::Unbind(unbind) => {
                let resp = UnbindResponse::new(unbind.sequence_number);
                smsc.send(Frame::UnbindResp(resp)).await;
            }
            other => panic!("expected unbind, got {other:?}"),
        }
        timeout(WAIT, unbinding).await.unwrap().unwrap().unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_submit_sm_resp_answers_503() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );
        config.smpp = config.smpp.with_response_timeout(Duration::from_millis(300));

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;
        sleep(Duration::from_millis(200)).await;

        let request = message_request("z9hG4bKe2e4", "alice", "+15551234567", "hi", gw);
        ua.send_to(request.as_bytes(), gw).await.unwrap();
        // The SMSC swallows the submit_sm
        assert!(matches!(smsc.next().await, Frame::SubmitSm(_)));

        let response = recv_sip(&ua).await;
        assert_eq!(response.status_code(), Some(503));
        assert_eq!(response.via_branch(), Some("z9hG4bKe2e4"));

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn unanswered_message_times_out_to_temporary_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );
        config.sip = config.sip.with_timers(
            SipTimers::default()
                .with_t1(Duration::from_millis(50))
                .with_request_timeout(Duration::from_millis(400)),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let mut smsc = MockSmsc::accept(&listener).await;

        let body = MessageBody::new("+15551234567", "bob", b"anyone?");
        smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(11, body))))
            .await;
        let first = recv_sip(&ua).await;
        // Timer E retransmits the same request
        let again = recv_sip(&ua).await;
        assert_eq!(again.via_branch(), first.via_branch());

        match smsc.next().await {
            Frame::DeliverSmResp(resp) => {
                assert_eq!(resp.sequence_number, 11);
                assert_eq!(resp.command_status, CommandStatus::ReceiverTemporaryAppError);
            }
            other => panic!("expected deliver_sm_resp, got {other:?}"),
        }

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn bridges_both_directions_over_sip_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = gateway_config(
            listener.local_addr().unwrap(),
            ua_listener.local_addr().unwrap(),
        );
        config.sip = config.sip.with_transport(Transport::Tcp);

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;
        sleep(Duration::from_millis(200)).await;

        // UA to SMSC on a connection the UA opens
        let mut client = TcpStream::connect(gw).await.unwrap();
        let mut client_buf = BytesMut::new();
        let request = message_request("z9hG4bKe2e5", "alice", "+15551234567", "via tcp", gw)
            .replace("SIP/2.0/UDP", "SIP/2.0/TCP");
        client.write_all(request.as_bytes()).await.unwrap();

        let submit = match smsc.next().await {
            Frame::SubmitSm(submit) => submit,
            other => panic!("expected submit_sm, got {other:?}"),
        };
        assert_eq!(submit.body.short_message.as_ref(), b"via tcp");
        let resp = SubmitSmResponse::new(submit.sequence_number, CommandStatus::Ok, "msg-tcp");
        smsc.send(Frame::SubmitSmResp(resp)).await;

        let response = recv_sip_stream(&mut client, &mut client_buf).await;
        assert_eq!(response.status_code(), Some(200));
        assert_eq!(response.via_branch(), Some("z9hG4bKe2e5"));

        // SMSC to UA on a connection the gateway opens
        let body = MessageBody::new("+15551234567", "bob", b"back over tcp");
        smsc.send(Frame::DeliverSm(Box::new(DeliverSm::new(12, body))))
            .await;
        let (mut inbound, _) = timeout(WAIT, ua_listener.accept()).await.unwrap().unwrap();
        let mut inbound_buf = BytesMut::new();
        let message = recv_sip_stream(&mut inbound, &mut inbound_buf).await;
        assert_eq!(message.body.as_ref(), b"back over tcp");
        assert!(message.header("Via").is_some_and(|via| via.contains("SIP/2.0/TCP")));

        let ok = message.response_to(200, "OK", "bob2");
        inbound.write_all(&codec::to_bytes(&ok)).await.unwrap();

        match smsc.next().await {
            Frame::DeliverSmResp(resp) => {
                assert_eq!(resp.sequence_number, 12);
                assert_eq!(resp.command_status, CommandStatus::Ok);
            }
            other => panic!("expected deliver_sm_resp, got {other:?}"),
        }

        stop(gateway, &mut smsc).await;
    }

    #[tokio::test]
    async fn stop_with_submit_in_flight_answers_503() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ua = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = gateway_config(
            listener.local_addr().unwrap(),
            ua.local_addr().unwrap(),
        );

        let gateway = Gateway::start(config).await.unwrap();
        let gw = gateway.local_sip_addr();
        let mut smsc = MockSmsc::accept(&listener).await;
        sleep(Duration::from_millis(200)).await;

        let request = message_request("z9hG4bKe2e6", "alice", "+15551234567", "hi", gw);
        ua.send_to(request.as_bytes(), gw).await.unwrap();
        assert!(matches!(smsc.next().await, Frame::SubmitSm(_)));

        let started = Instant::now();
        let stopping = tokio::spawn(gateway.stop());

        let response = recv_sip(&ua).await;
        assert_eq!(response.status_code(), Some(503));
        assert_eq!(response.via_branch(), Some("z9hG4bKe2e6"));
        // Held for the drain grace before giving up on the SMSC
        assert!(started.elapsed() >= Duration::from_millis(900));

        smsc.expect_unbind().await;
        timeout(WAIT, stopping).await.unwrap().unwrap().unwrap();
    }
}
