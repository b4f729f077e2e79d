// ABOUTME: SIP socket layer: one UDP socket, or a TCP listener plus per-peer connections
// ABOUTME: Turns datagrams and stream frames into decoded messages tagged with the peer address

use super::codec::{self, SipCodecError};
use super::message::SipMessage;
use crate::config::{SipConfig, Transport};
use crate::error::{GatewayError, GatewayResult};
use bytes::{Buf, Bytes, BytesMut};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// One unit received from the network.
#[derive(Debug)]
pub enum Received {
    Message {
        message: SipMessage,
        peer: SocketAddr,
    },
    /// Bytes that did not decode. `raw` is kept so a 400 can be salvaged.
    Malformed {
        raw: Bytes,
        error: SipCodecError,
        peer: SocketAddr,
    },
}

#[derive(Debug)]
pub enum SipTransport {
    Udp(UdpLink),
    Tcp(TcpLink),
}

impl SipTransport {
    pub async fn bind(config: &SipConfig) -> GatewayResult<Self> {
        match config.transport {
            Transport::Udp => {
                let socket = UdpSocket::bind(config.bind_addr).await?;
                Ok(SipTransport::Udp(UdpLink {
                    socket,
                    buffer: vec![0; config.max_message_size],
                }))
            }
            Transport::Tcp => {
                let listener = TcpListener::bind(config.bind_addr).await?;
                let (tx, rx) = mpsc::unbounded_channel();
                Ok(SipTransport::Tcp(TcpLink {
                    listener,
                    writers: HashMap::new(),
                    readers: Vec::new(),
                    inbound_tx: tx,
                    inbound_rx: rx,
                    max_message_size: config.max_message_size,
                    io_timeout: config.connect_timeout,
                }))
            }
        }
    }

    pub fn local_addr(&self) -> GatewayResult<SocketAddr> {
        Ok(match self {
            SipTransport::Udp(link) => link.socket.local_addr()?,
            SipTransport::Tcp(link) => link.listener.local_addr()?,
        })
    }

    /// Waits for the next message from any peer. Cancel safe.
    pub async fn recv(&mut self) -> GatewayResult<Received> {
        match self {
            SipTransport::Udp(link) => link.recv().await,
            SipTransport::Tcp(link) => link.recv().await,
        }
    }

    pub async fn send(&mut self, bytes: &[u8], peer: SocketAddr) -> GatewayResult<()> {
        trace!(%peer, len = bytes.len(), "sending SIP message");
        match self {
            SipTransport::Udp(link) => {
                link.socket.send_to(bytes, peer).await?;
                Ok(())
            }
            SipTransport::Tcp(link) => link.send(bytes, peer).await,
        }
    }
}

#[derive(Debug)]
pub struct UdpLink {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl UdpLink {
    async fn recv(&mut self) -> GatewayResult<Received> {
        let (len, peer) = self.socket.recv_from(&mut self.buffer).await?;
        let datagram = &self.buffer[..len];
        trace!(%peer, len, "SIP datagram received");

        Ok(match codec::decode(datagram) {
            Ok(message) => Received::Message { message, peer },
            // A datagram is the whole message; a short one will never complete
            Err(error) => Received::Malformed {
                raw: Bytes::copy_from_slice(datagram),
                error,
                peer,
            },
        })
    }
}

#[derive(Debug)]
enum StreamEvent {
    Received(Received),
    Closed(SocketAddr),
}

/// TCP listener plus the write halves of every open connection, keyed by
/// peer address. Each connection's read half runs in its own task.
#[derive(Debug)]
pub struct TcpLink {
    listener: TcpListener,
    writers: HashMap<SocketAddr, OwnedWriteHalf>,
    readers: Vec<JoinHandle<()>>,
    inbound_tx: mpsc::UnboundedSender<StreamEvent>,
    inbound_rx: mpsc::UnboundedReceiver<StreamEvent>,
    max_message_size: usize,
    /// Bound on a connect and on each write, so an unresponsive peer
    /// cannot stall the endpoint task
    io_timeout: Duration,
}

impl TcpLink {
    async fn recv(&mut self) -> GatewayResult<Received> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "SIP TCP connection accepted");
                    self.adopt(stream, peer);
                }
                event = self.inbound_rx.recv() => match event {
                    Some(StreamEvent::Received(received)) => return Ok(received),
                    Some(StreamEvent::Closed(peer)) => {
                        debug!(%peer, "SIP TCP connection closed");
                        self.writers.remove(&peer);
                    }
                    // The link holds a sender, so this only happens mid-drop
                    None => return Err(GatewayError::SessionClosed),
                },
            }
        }
    }

    async fn send(&mut self, bytes: &[u8], peer: SocketAddr) -> GatewayResult<()> {
        if !self.writers.contains_key(&peer) {
            let stream = timeout(self.io_timeout, TcpStream::connect(peer))
                .await
                .map_err(|_| GatewayError::ConnectTimeout(peer.to_string()))??;
            debug!(%peer, "SIP TCP connection opened");
            self.adopt(stream, peer);
        }

        let Some(writer) = self.writers.get_mut(&peer) else {
            return Err(GatewayError::SessionClosed);
        };
        let result = match timeout(self.io_timeout, writer.write_all(bytes)).await {
            Ok(written) => written.map_err(GatewayError::from),
            Err(_) => Err(GatewayError::ConnectTimeout(peer.to_string())),
        };
        if result.is_err() {
            warn!(%peer, "SIP TCP write failed, dropping connection");
            self.writers.remove(&peer);
        }
        result
    }

    fn adopt(&mut self, stream: TcpStream, peer: SocketAddr) {
        let _ = stream.set_nodelay(true);
        let (read, write) = stream.into_split();
        self.writers.insert(peer, write);
        self.readers.retain(|reader| !reader.is_finished());
        self.readers.push(tokio::spawn(read_stream(
            read,
            peer,
            self.inbound_tx.clone(),
            self.max_message_size,
        )));
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

/// Reads back-to-back messages from one connection until it closes or
/// sends something undecodable, after which no frame boundary can be trusted.
async fn read_stream(
    mut read: OwnedReadHalf,
    peer: SocketAddr,
    events: mpsc::UnboundedSender<StreamEvent>,
    max_message_size: usize,
) {
    let mut buffer = BytesMut::with_capacity(4 * 1024);

    'connection: loop {
        loop {
            // CRLF keep-alives between messages
            while buffer.starts_with(b"\r\n") {
                buffer.advance(2);
            }
            if buffer.is_empty() {
                break;
            }

            match codec::decode_prefix(&buffer) {
                Ok((message, used)) => {
                    buffer.advance(used);
                    if events
                        .send(StreamEvent::Received(Received::Message { message, peer }))
                        .is_err()
                    {
                        return;
                    }
                }
                Err(SipCodecError::Incomplete) if buffer.len() <= max_message_size => break,
                Err(error) => {
                    let error = match error {
                        SipCodecError::Incomplete => SipCodecError::Malformed(format!(
                            "message exceeds {max_message_size} bytes"
                        )),
                        other => other,
                    };
                    warn!(%peer, error = %error, "undecodable SIP stream, closing connection");
                    let _ = events.send(StreamEvent::Received(Received::Malformed {
                        raw: buffer.split().freeze(),
                        error,
                        peer,
                    }));
                    break 'connection;
                }
            }
        }

        match read.read_buf(&mut buffer).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(%peer, error = %e, "SIP TCP read failed");
                break;
            }
        }
    }

    let _ = events.send(StreamEvent::Closed(peer));
}
