//! Server runtime.
//!
//! Two listener variants share one upstream contract:
//! - `stream`: TCP, one OS thread per accepted connection
//! - `datagram`: UDP, a single sequential loop serving all senders
//!
//! Both block in `mio::Poll` so a [`ShutdownHandle`] can wake them through a
//! `mio::Waker`. Request handling itself lives in `request` and is shared.

mod connection;
mod datagram;
pub mod request;
mod stream;

pub(crate) use connection::ConnectionRegistry;
pub use request::{process_datagram, process_query, process_stream_request, ProcessResult};

use crate::config::{Config, Transport};
use mio::{Poll, Token, Waker};
use std::io;
use std::net::{SocketAddr, TcpListener, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

const LISTENER_TOKEN: Token = Token(0);
const WAKER_TOKEN: Token = Token(1);

/// Stops a running [`Server`] from any thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Request shutdown. Returns immediately; `Server::run` returns once every
    /// connection thread has exited.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Shutdown requested");
            if let Err(e) = self.waker.wake() {
                error!(error = %e, "Failed to wake listener");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

enum Listener {
    Stream(TcpListener),
    Datagram(UdpSocket),
}

/// A bound, not yet running server.
pub struct Server {
    config: Arc<Config>,
    listener: Listener,
    poll: Poll,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the configured transport. The socket is non-blocking and
    /// `SO_REUSEADDR` is set.
    pub fn bind(config: Config) -> io::Result<Self> {
        let listener = match config.transport {
            Transport::Tcp => Listener::Stream(create_stream_listener(config.listen, config.backlog)?),
            Transport::Udp => Listener::Datagram(create_datagram_socket(config.listen)?),
        };

        let poll = Poll::new()?;
        let waker = Waker::new(poll.registry(), WAKER_TOKEN)?;
        let shutdown = ShutdownHandle {
            running: Arc::new(AtomicBool::new(true)),
            waker: Arc::new(waker),
        };

        Ok(Server {
            config: Arc::new(config),
            listener,
            poll,
            shutdown,
        })
    }

    /// Address actually bound, useful when listening on port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match &self.listener {
            Listener::Stream(listener) => listener.local_addr(),
            Listener::Datagram(socket) => socket.local_addr(),
        }
    }

    pub fn transport(&self) -> Transport {
        self.config.transport
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until shutdown is requested.
    pub fn run(self) -> io::Result<()> {
        let addr = self.local_addr()?;
        info!(
            addr = %addr,
            transport = ?self.config.transport,
            max_connections = self.config.max_connections,
            max_payload = self.config.max_payload,
            "Server listening"
        );

        match self.listener {
            Listener::Stream(listener) => stream::serve(listener, self.poll, self.shutdown, self.config),
            Listener::Datagram(socket) => {
                datagram::serve(socket, self.poll, self.shutdown, self.config)
            }
        }
    }
}

fn domain_for(addr: SocketAddr) -> socket2::Domain {
    match addr {
        SocketAddr::V4(_) => socket2::Domain::IPV4,
        SocketAddr::V6(_) => socket2::Domain::IPV6,
    }
}

/// Create a non-blocking TCP listener with `SO_REUSEADDR`.
fn create_stream_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        domain_for(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}

/// Create a non-blocking UDP socket with `SO_REUSEADDR`.
fn create_datagram_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = socket2::Socket::new(
        domain_for(addr),
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    Ok(socket.into())
}
