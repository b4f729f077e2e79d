// ABOUTME: Provides TCP connection management for the SMPP side of the gateway
// ABOUTME: Implements frame-based I/O with a buffered reader half and a buffered writer half

use crate::codec::{CodecError, Frame};
use crate::error::{GatewayError, GatewayResult};
use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::trace;

/// Splits a connected socket into its framed read and write halves.
///
/// The session task owns both halves. Reads happen inside `select!`, so the
/// reader keeps every partially received frame in its own buffer and
/// `read_frame` is cancel safe.
pub fn split(socket: TcpStream) -> (FrameReader, FrameWriter) {
    let (read, write) = socket.into_split();
    (
        FrameReader {
            stream: read,
            // 4KB comfortably holds a burst of deliver_sm PDUs
            buffer: BytesMut::with_capacity(4 * 1024),
        },
        FrameWriter {
            stream: BufWriter::new(write),
            scratch: BytesMut::with_capacity(512),
        },
    )
}

/// One unit read off the wire.
#[derive(Debug)]
pub enum Inbound {
    Frame(Frame),
    /// A complete frame that failed to decode. Its bytes have already been
    /// consumed, so the stream stays usable. `sequence_number` is whatever the
    /// header carried, for the generic_nack.
    Malformed {
        sequence_number: u32,
        error: CodecError,
    },
}

#[derive(Debug)]
pub struct FrameReader {
    stream: OwnedReadHalf,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl FrameReader {
    /// Read a single frame from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// Any data remaining in the read buffer after the frame has been parsed is
    /// kept there for the next call to `read_frame`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` on a clean close between frames. A length prefix outside
    /// the legal range is an error, the stream has no usable frame boundary
    /// after it.
    pub async fn read_frame(&mut self) -> GatewayResult<Option<Inbound>> {
        loop {
            if let Some(inbound) = self.parse_frame()? {
                return Ok(Some(inbound));
            }

            // On success, the number of bytes is returned. `0` indicates "end
            // of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer.
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(GatewayError::Connection(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset by peer mid-frame",
                    )))
                };
            }
        }
    }

    fn parse_frame(&mut self) -> GatewayResult<Option<Inbound>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        let len = match Frame::check(&mut buf) {
            Ok(len) => len,
            // Not enough buffered yet; the caller reads more from the socket.
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => return Err(GatewayError::MalformedPdu(e)),
        };

        let bytes = &self.buffer[..len];
        let inbound = match Frame::decode(bytes) {
            Ok(frame) => Inbound::Frame(frame),
            Err(error) => Inbound::Malformed {
                sequence_number: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
                error,
            },
        };

        // Discard the frame bytes whether or not they decoded
        self.buffer.advance(len);
        Ok(Some(inbound))
    }
}

#[derive(Debug)]
pub struct FrameWriter {
    // Decorated with a `BufWriter` so one PDU becomes one write syscall.
    stream: BufWriter<OwnedWriteHalf>,

    scratch: BytesMut,
}

impl FrameWriter {
    /// Encode and write a single frame, then flush.
    pub async fn write_frame(&mut self, frame: &Frame) -> GatewayResult<()> {
        self.scratch.clear();
        frame.encode(&mut self.scratch)?;

        trace!(
            command_id = ?frame.command_id(),
            sequence_number = frame.sequence_number(),
            len = self.scratch.len(),
            "writing PDU"
        );

        self.stream.write_all(&self.scratch).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Flush and close the write half.
    pub async fn shutdown(&mut self) -> GatewayResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
