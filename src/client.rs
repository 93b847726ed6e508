//! Blocking client for the path server.
//!
//! Sends a query and an edge list over either transport and decodes the
//! response. One client can issue any number of requests; a TCP client
//! reuses its connection.

use crate::config::Transport;
use crate::wire::{
    decode_response, encode_datagram, encode_edge_list, encode_request, read_frame, write_frame,
    DecodeError, Edge, FrameError, PathQuery, Response, MAX_PAYLOAD,
};
use std::io;
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Default receive timeout for datagram requests.
pub const DEFAULT_DATAGRAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),

    #[error("request payload of {len} bytes exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

enum Channel {
    Stream(TcpStream),
    Datagram(UdpSocket),
}

/// A connection to a path server.
pub struct Client {
    channel: Channel,
    max_payload: usize,
}

impl Client {
    /// Connect to `addr`. For UDP this only fixes the peer address.
    pub fn connect(addr: SocketAddr, transport: Transport) -> Result<Self, ClientError> {
        let channel = match transport {
            Transport::Tcp => {
                let stream = TcpStream::connect(addr)?;
                stream.set_nodelay(true)?;
                Channel::Stream(stream)
            }
            Transport::Udp => {
                let local: SocketAddr = match addr {
                    SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
                    SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
                };
                let socket = UdpSocket::bind(local)?;
                socket.connect(addr)?;
                socket.set_read_timeout(Some(DEFAULT_DATAGRAM_TIMEOUT))?;
                Channel::Datagram(socket)
            }
        };

        Ok(Client {
            channel,
            max_payload: MAX_PAYLOAD,
        })
    }

    /// Override the largest payload this client will send or accept.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Set the read timeout on the underlying socket.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match &self.channel {
            Channel::Stream(stream) => {
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)
            }
            Channel::Datagram(socket) => socket.set_read_timeout(timeout),
        }
    }

    /// Ask the server for the shortest path between `query.start` and
    /// `query.end` over `edges`.
    pub fn find_path(
        &mut self,
        query: &PathQuery,
        edges: &[Edge],
    ) -> Result<Response, ClientError> {
        let max = self.max_payload;
        match &mut self.channel {
            Channel::Stream(stream) => {
                let edge_list = encode_edge_list(edges);
                check_size(edge_list.len(), max)?;

                write_frame(stream, &encode_request(query))?;
                write_frame(stream, &edge_list)?;
                trace!(edges = edges.len(), "Sent stream request");

                let payload = read_frame(stream, max)?;
                Ok(decode_response(&payload)?)
            }
            Channel::Datagram(socket) => {
                let datagram = encode_datagram(query, edges);
                check_size(datagram.len(), max)?;

                socket.send(&datagram)?;
                trace!(edges = edges.len(), "Sent datagram request");

                let mut buf = vec![0u8; max];
                let len = socket.recv(&mut buf)?;
                Ok(decode_response(&buf[..len])?)
            }
        }
    }
}

fn check_size(len: usize, max: usize) -> Result<(), ClientError> {
    if len > max {
        return Err(ClientError::PayloadTooLarge { len, max });
    }
    Ok(())
}
