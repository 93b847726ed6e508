//! Binary wire protocol.
//!
//! Every integer on the wire is a `u32` in big-endian (network) order,
//! including the request payload.
//!
//! ## Message Layouts
//!
//! ```text
//! Request:   [start(4)] [end(4)]
//! Edge list: [count(4)] count x ([from(4)] [to(4)])
//! Response:  [code(4)] [distance(4)] [node_count(4)] node_count x [node(4)]
//! Frame:     [length(4)] [payload(length)]          (stream transport)
//! Datagram:  [request(8)] [edge list(4 + 8n)]        (datagram transport)
//! ```
//!
//! The codec functions in [`message`] are pure; the stream envelope lives in
//! [`frame`] because it reads from an `io::Read`.

pub mod frame;
pub mod message;

pub use frame::{frame, read_frame, write_frame, FrameError};
pub use message::{
    decode_datagram, decode_edge_list, decode_request, decode_response, encode_datagram,
    encode_edge_list, encode_request, encode_response,
};

use thiserror::Error;

/// Default cap on a frame payload or datagram, in bytes.
pub const MAX_PAYLOAD: usize = 4096;

/// Size of an encoded request payload.
pub const REQUEST_LEN: usize = 8;

/// Size of the edge-list count header.
pub const EDGE_COUNT_LEN: usize = 4;

/// Size of one encoded edge record.
pub const EDGE_LEN: usize = 8;

/// Size of the fixed response header (code, distance, node count).
pub const RESPONSE_HEADER_LEN: usize = 12;

/// Vertex identifier.
pub type Node = u32;

/// An edge as received on the wire. Treated as undirected by the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
}

impl Edge {
    pub fn new(from: Node, to: Node) -> Self {
        Self { from, to }
    }
}

impl From<(Node, Node)> for Edge {
    fn from((from, to): (Node, Node)) -> Self {
        Self { from, to }
    }
}

/// A start/end pair to find a path between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    pub start: Node,
    pub end: Node,
}

impl PathQuery {
    pub fn new(start: Node, end: Node) -> Self {
        Self { start, end }
    }
}

/// Status code carried in the first word of every response.
///
/// The numeric values are shared by server and client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResponseCode {
    Success = 0,
    NoPath = 1,
    InvalidRequest = 2,
}

impl TryFrom<u32> for ResponseCode {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResponseCode::Success),
            1 => Ok(ResponseCode::NoPath),
            2 => Ok(ResponseCode::InvalidRequest),
            other => Err(DecodeError::UnknownCode(other)),
        }
    }
}

/// A decoded or to-be-encoded response.
///
/// Distance and path only exist for [`Response::Success`]; the other
/// variants encode them as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success { distance: u32, path: Vec<Node> },
    NoPath,
    InvalidRequest,
}

impl Response {
    pub fn code(&self) -> ResponseCode {
        match self {
            Response::Success { .. } => ResponseCode::Success,
            Response::NoPath => ResponseCode::NoPath,
            Response::InvalidRequest => ResponseCode::InvalidRequest,
        }
    }
}

/// Payload decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("request payload must be {expected} bytes, got {actual}")]
    RequestLength { expected: usize, actual: usize },

    #[error("payload too short: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("unknown response code {0}")]
    UnknownCode(u32),
}
