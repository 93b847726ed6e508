//! UDP listener: one loop serving every sender in arrival order.
//!
//! There is no per-sender state. A failed receive or send is logged and the
//! loop moves on to the next datagram.

use super::{process_datagram, ShutdownHandle, LISTENER_TOKEN, WAKER_TOKEN};
use crate::config::Config;
use mio::net::UdpSocket;
use mio::{Events, Interest, Poll};
use std::io;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

const EVENTS_CAPACITY: usize = 16;

pub(super) fn serve(
    socket: std::net::UdpSocket,
    mut poll: Poll,
    shutdown: ShutdownHandle,
    config: Arc<Config>,
) -> io::Result<()> {
    let mut socket = UdpSocket::from_std(socket);
    poll.registry()
        .register(&mut socket, LISTENER_TOKEN, Interest::READABLE)?;

    // One spare byte so an oversized datagram is detected instead of being
    // silently truncated to exactly `max_payload`.
    let mut buf = vec![0u8; config.max_payload + 1];
    let mut events = Events::with_capacity(EVENTS_CAPACITY);

    while shutdown.is_running() {
        if let Err(e) = poll.poll(&mut events, None) {
            if e.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(e);
        }

        for event in events.iter() {
            match event.token() {
                LISTENER_TOKEN => drain(&socket, &mut buf, &shutdown, &config),
                WAKER_TOKEN => debug!("Datagram loop woken"),
                _ => {}
            }
        }
    }

    info!("Datagram listener stopped");
    Ok(())
}

/// Handle queued datagrams until the socket would block.
fn drain(socket: &UdpSocket, buf: &mut [u8], shutdown: &ShutdownHandle, config: &Config) {
    while shutdown.is_running() {
        let (len, peer) = match socket.recv_from(buf) {
            Ok(received) => received,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "Failed to receive datagram");
                continue;
            }
        };

        if len > config.max_payload {
            warn!(
                peer = %peer,
                max = config.max_payload,
                "Dropping oversized datagram"
            );
            continue;
        }

        trace!(peer = %peer, len, "Received datagram");
        let response = process_datagram(&buf[..len], &config.limits);

        match socket.send_to(&response, peer) {
            Ok(_) => {}
            Err(e) => warn!(peer = %peer, error = %e, "Failed to send response"),
        }
    }
}
