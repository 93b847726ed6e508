//! graph-path-server: shortest-path queries over client-supplied graphs
//!
//! A client sends a start/end pair and an edge list; the server builds the
//! graph for that request only, runs Dijkstra over unit-weight undirected
//! edges and answers with the distance and the path.
//!
//! Features:
//! - Compact big-endian binary protocol
//! - TCP with length-prefixed frames, one thread per connection
//! - UDP with one request per datagram, served in arrival order
//! - Configurable graph size bounds, connection cap and socket deadlines
//! - Configuration via CLI arguments or TOML file

pub mod client;
pub mod config;
pub mod graph;
pub mod runtime;
pub mod wire;

pub use client::{Client, ClientError};
pub use config::{Config, Transport};
pub use runtime::{Server, ShutdownHandle};
