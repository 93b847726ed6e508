//! Request dispatch shared by both listeners.
//!
//! Decodes payloads, builds the graph, runs the path search and maps every
//! failure below the transport layer to a response code. Works on raw byte
//! buffers with no I/O.

use crate::graph::{find_path, Graph, GraphLimits, PathResult};
use crate::wire::{
    decode_datagram, decode_edge_list, decode_request, encode_response, Edge, Node, PathQuery,
    Response,
};
use bytes::Bytes;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Result of processing one stream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// Send the encoded response and keep serving the connection.
    Response(Bytes),
    /// Send the encoded response, then close: the stream can no longer be
    /// trusted to sit on a message boundary.
    ResponseAndClose(Bytes),
}

/// Answer a decoded query over a decoded edge list.
///
/// Never panics: an unexpected fault while building or searching is logged
/// and answered with `INVALID_REQUEST`.
pub fn process_query(query: &PathQuery, edges: &[Edge], limits: &GraphLimits) -> Response {
    answer_with(query, edges, limits, find_path)
}

fn answer_with<F>(query: &PathQuery, edges: &[Edge], limits: &GraphLimits, search: F) -> Response
where
    F: Fn(&Graph, Node, Node) -> PathResult,
{
    match panic::catch_unwind(AssertUnwindSafe(|| solve(query, edges, limits, &search))) {
        Ok(response) => response,
        Err(_) => {
            error!(
                start = query.start,
                end = query.end,
                edges = edges.len(),
                "Request processing panicked"
            );
            Response::InvalidRequest
        }
    }
}

fn solve<F>(query: &PathQuery, edges: &[Edge], limits: &GraphLimits, search: &F) -> Response
where
    F: Fn(&Graph, Node, Node) -> PathResult,
{
    let graph = match Graph::build(edges, limits) {
        Ok(graph) => graph,
        Err(e) => {
            warn!(reason = %e, "Rejecting graph");
            return Response::InvalidRequest;
        }
    };

    if let Err(e) = graph.check_vertices(query.start, query.end) {
        warn!(reason = %e, "Rejecting query");
        return Response::InvalidRequest;
    }

    let result = search(&graph, query.start, query.end);
    match result.distance {
        Some(distance) => {
            debug!(
                start = query.start,
                end = query.end,
                distance,
                "Path found"
            );
            Response::Success {
                distance,
                path: result.path,
            }
        }
        None => {
            debug!(start = query.start, end = query.end, "No path between vertices");
            Response::NoPath
        }
    }
}

/// Process one request frame and its edge-list frame.
///
/// A malformed request payload is answered with `INVALID_REQUEST` and the
/// connection stays open, because both frames were consumed. A malformed
/// edge list is answered the same way but closes the connection.
pub fn process_stream_request(
    request: &[u8],
    edges: &[u8],
    limits: &GraphLimits,
) -> ProcessResult {
    let query = match decode_request(request) {
        Ok(query) => query,
        Err(e) => {
            warn!(error = %e, "Malformed request payload");
            return ProcessResult::Response(encode_response(&Response::InvalidRequest));
        }
    };

    let edges = match decode_edge_list(edges) {
        Ok(edges) => edges,
        Err(e) => {
            warn!(error = %e, "Malformed edge list");
            return ProcessResult::ResponseAndClose(encode_response(&Response::InvalidRequest));
        }
    };

    ProcessResult::Response(encode_response(&process_query(&query, &edges, limits)))
}

/// Process one datagram carrying a request followed by an edge list.
pub fn process_datagram(datagram: &[u8], limits: &GraphLimits) -> Bytes {
    let response = match decode_datagram(datagram) {
        Ok((query, edges)) => process_query(&query, &edges, limits),
        Err(e) => {
            warn!(error = %e, len = datagram.len(), "Malformed datagram");
            Response::InvalidRequest
        }
    };
    encode_response(&response)
}
