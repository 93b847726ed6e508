//! TCP listener: accept loop plus one handling thread per connection.
//!
//! The accept loop waits in `mio::Poll` on the listening socket and the
//! shutdown waker. Connection threads use plain blocking sockets with the
//! configured read/write deadlines.

use super::{ConnectionRegistry, ProcessResult, ShutdownHandle, LISTENER_TOKEN, WAKER_TOKEN};
use crate::config::Config;
use crate::runtime::process_stream_request;
use crate::wire::{read_frame, write_frame, FrameError};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

const EVENTS_CAPACITY: usize = 64;

/// Run the accept loop until shutdown, then close every connection and join
/// every connection thread.
pub(super) fn serve(
    listener: TcpListener,
    mut poll: Poll,
    shutdown: ShutdownHandle,
    config: Arc<Config>,
) -> io::Result<()> {
    let fd = listener.as_raw_fd();
    poll.registry()
        .register(&mut SourceFd(&fd), LISTENER_TOKEN, Interest::READABLE)?;

    let registry = ConnectionRegistry::new(config.max_connections);
    let mut workers: Vec<JoinHandle<()>> = Vec::new();
    let mut events = Events::with_capacity(EVENTS_CAPACITY);

    let result = loop {
        if !shutdown.is_running() {
            break Ok(());
        }

        if let Err(e) = poll.poll(&mut events, None) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            break Err(e);
        }

        for event in events.iter() {
            match event.token() {
                LISTENER_TOKEN => {
                    accept_connections(&listener, &registry, &mut workers, &shutdown, &config)
                }
                WAKER_TOKEN => debug!("Accept loop woken"),
                _ => {}
            }
        }

        reap_finished(&mut workers);
    };

    // Listener goes first, then live connections.
    let _ = poll.registry().deregister(&mut SourceFd(&fd));
    drop(listener);

    shutdown.shutdown();
    registry.shutdown_all();
    info!(connections = workers.len(), "Waiting for connection threads");
    for handle in workers {
        if handle.join().is_err() {
            error!("Connection thread panicked");
        }
    }
    info!("Stream listener stopped");

    result
}

fn accept_connections(
    listener: &TcpListener,
    registry: &ConnectionRegistry,
    workers: &mut Vec<JoinHandle<()>>,
    shutdown: &ShutdownHandle,
    config: &Arc<Config>,
) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = spawn_connection(stream, peer, registry, workers, shutdown, config) {
                    error!(peer = %peer, error = %e, "Failed to start connection");
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Accept error: {}", e);
                break;
            }
        }
    }
}

fn spawn_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: &ConnectionRegistry,
    workers: &mut Vec<JoinHandle<()>>,
    shutdown: &ShutdownHandle,
    config: &Arc<Config>,
) -> io::Result<()> {
    // Accepted sockets may inherit O_NONBLOCK from the listener.
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(config.io_timeout())?;
    stream.set_write_timeout(config.io_timeout())?;

    let conn_id = match registry.insert(stream.try_clone()?) {
        Some(id) => id,
        None => {
            warn!(
                peer = %peer,
                max_connections = config.max_connections,
                "Connection limit reached, rejecting connection"
            );
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(());
        }
    };

    debug!(
        conn_id,
        peer = %peer,
        active = registry.len(),
        "Accepted connection"
    );

    let thread_registry = registry.clone();
    let thread_shutdown = shutdown.clone();
    let thread_config = Arc::clone(config);

    let spawned = thread::Builder::new()
        .name(format!("conn-{conn_id}"))
        .spawn(move || {
            match handle_connection(&stream, &thread_shutdown, &thread_config) {
                Ok(()) => debug!(conn_id, "Connection closed"),
                Err(FrameError::Closed) => debug!(conn_id, "Connection closed by peer"),
                Err(e @ FrameError::Oversized { .. }) => {
                    warn!(conn_id, error = %e, "Rejecting frame, closing connection")
                }
                Err(FrameError::Io(e)) => debug!(conn_id, error = %e, "Connection error"),
            }
            let _ = stream.shutdown(Shutdown::Both);
            thread_registry.remove(conn_id);
        });

    match spawned {
        Ok(handle) => {
            workers.push(handle);
            Ok(())
        }
        Err(e) => {
            registry.remove(conn_id);
            Err(e)
        }
    }
}

/// Serve requests on one connection until it closes, errors or shutdown is
/// requested.
fn handle_connection(
    mut stream: &TcpStream,
    shutdown: &ShutdownHandle,
    config: &Config,
) -> Result<(), FrameError> {
    while shutdown.is_running() {
        let request = read_frame(&mut stream, config.max_payload)?;
        let edges = read_frame(&mut stream, config.max_payload)?;

        match process_stream_request(&request, &edges, &config.limits) {
            ProcessResult::Response(response) => {
                write_frame(&mut stream, &response)?;
            }
            ProcessResult::ResponseAndClose(response) => {
                write_frame(&mut stream, &response)?;
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Join threads whose connections already ended.
fn reap_finished(workers: &mut Vec<JoinHandle<()>>) {
    let mut i = 0;
    while i < workers.len() {
        if workers[i].is_finished() {
            let handle = workers.swap_remove(i);
            if handle.join().is_err() {
                error!("Connection thread panicked");
            }
        } else {
            i += 1;
        }
    }
}
