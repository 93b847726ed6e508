//! Encoding and decoding of request, edge-list, response and datagram payloads.
//!
//! All functions are pure. Decoders never panic on malformed input.

use super::{
    DecodeError, Edge, Node, PathQuery, Response, ResponseCode, EDGE_COUNT_LEN, EDGE_LEN,
    REQUEST_LEN, RESPONSE_HEADER_LEN,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Encode a query as `[start][end]`.
pub fn encode_request(query: &PathQuery) -> [u8; REQUEST_LEN] {
    let mut out = [0u8; REQUEST_LEN];
    let mut buf = &mut out[..];
    buf.put_u32(query.start);
    buf.put_u32(query.end);
    out
}

/// Decode a request payload. The payload must be exactly 8 bytes.
pub fn decode_request(mut input: &[u8]) -> Result<PathQuery, DecodeError> {
    if input.len() != REQUEST_LEN {
        return Err(DecodeError::RequestLength {
            expected: REQUEST_LEN,
            actual: input.len(),
        });
    }
    let start = input.get_u32();
    let end = input.get_u32();
    Ok(PathQuery { start, end })
}

/// Encode an edge list as a count followed by `(from, to)` records.
pub fn encode_edge_list(edges: &[Edge]) -> Bytes {
    let mut buf = BytesMut::with_capacity(EDGE_COUNT_LEN + EDGE_LEN * edges.len());
    put_edge_list(&mut buf, edges);
    buf.freeze()
}

fn put_edge_list(buf: &mut BytesMut, edges: &[Edge]) {
    buf.put_u32(edges.len() as u32);
    for edge in edges {
        buf.put_u32(edge.from);
        buf.put_u32(edge.to);
    }
}

/// Decode an edge list.
///
/// Fails when the buffer cannot hold the declared number of records. Bytes
/// past the last declared record are ignored.
pub fn decode_edge_list(mut input: &[u8]) -> Result<Vec<Edge>, DecodeError> {
    if input.len() < EDGE_COUNT_LEN {
        return Err(DecodeError::Truncated {
            needed: EDGE_COUNT_LEN,
            actual: input.len(),
        });
    }
    let available = input.len();
    let count = input.get_u32() as usize;

    let needed = count
        .checked_mul(EDGE_LEN)
        .and_then(|n| n.checked_add(EDGE_COUNT_LEN))
        .unwrap_or(usize::MAX);
    if needed > available {
        return Err(DecodeError::Truncated {
            needed,
            actual: available,
        });
    }

    let mut edges = Vec::with_capacity(count);
    for _ in 0..count {
        let from = input.get_u32();
        let to = input.get_u32();
        edges.push(Edge { from, to });
    }
    Ok(edges)
}

/// Encode a response. Distance and node count are zero for non-success codes.
pub fn encode_response(response: &Response) -> Bytes {
    let (distance, path): (u32, &[Node]) = match response {
        Response::Success { distance, path } => (*distance, path.as_slice()),
        Response::NoPath | Response::InvalidRequest => (0, &[][..]),
    };

    let mut buf = BytesMut::with_capacity(RESPONSE_HEADER_LEN + 4 * path.len());
    buf.put_u32(response.code() as u32);
    buf.put_u32(distance);
    buf.put_u32(path.len() as u32);
    for node in path {
        buf.put_u32(*node);
    }
    buf.freeze()
}

/// Decode a response payload.
pub fn decode_response(mut input: &[u8]) -> Result<Response, DecodeError> {
    if input.len() < RESPONSE_HEADER_LEN {
        return Err(DecodeError::Truncated {
            needed: RESPONSE_HEADER_LEN,
            actual: input.len(),
        });
    }
    let available = input.len();
    let code = ResponseCode::try_from(input.get_u32())?;
    let distance = input.get_u32();
    let count = input.get_u32() as usize;

    match code {
        ResponseCode::NoPath => return Ok(Response::NoPath),
        ResponseCode::InvalidRequest => return Ok(Response::InvalidRequest),
        ResponseCode::Success => {}
    }

    let needed = count
        .checked_mul(4)
        .and_then(|n| n.checked_add(RESPONSE_HEADER_LEN))
        .unwrap_or(usize::MAX);
    if needed > available {
        return Err(DecodeError::Truncated {
            needed,
            actual: available,
        });
    }

    let path = (0..count).map(|_| input.get_u32()).collect();
    Ok(Response::Success { distance, path })
}

/// Encode a full datagram: request payload directly followed by the edge list.
pub fn encode_datagram(query: &PathQuery, edges: &[Edge]) -> Bytes {
    let mut buf = BytesMut::with_capacity(REQUEST_LEN + EDGE_COUNT_LEN + EDGE_LEN * edges.len());
    buf.put_slice(&encode_request(query));
    put_edge_list(&mut buf, edges);
    buf.freeze()
}

/// Split a datagram into its query and edge list.
pub fn decode_datagram(input: &[u8]) -> Result<(PathQuery, Vec<Edge>), DecodeError> {
    if input.len() < REQUEST_LEN + EDGE_COUNT_LEN {
        return Err(DecodeError::Truncated {
            needed: REQUEST_LEN + EDGE_COUNT_LEN,
            actual: input.len(),
        });
    }
    let (request, edges) = input.split_at(REQUEST_LEN);
    Ok((decode_request(request)?, decode_edge_list(edges)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_big_endian() {
        let bytes = encode_request(&PathQuery::new(1, 0x0102_0304));
        assert_eq!(bytes, [0, 0, 0, 1, 1, 2, 3, 4]);
        assert_eq!(decode_request(&bytes), Ok(PathQuery::new(1, 0x0102_0304)));
    }

    #[test]
    fn test_request_wrong_length() {
        assert_eq!(
            decode_request(&[0; 7]),
            Err(DecodeError::RequestLength {
                expected: 8,
                actual: 7
            })
        );
        assert!(decode_request(&[0; 9]).is_err());
        assert!(decode_request(&[]).is_err());
    }

    #[test]
    fn test_edge_list_layout() {
        let bytes = encode_edge_list(&[Edge::new(0, 1), Edge::new(2, 3)]);
        assert_eq!(
            &bytes[..],
            &[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]
        );
    }

    #[test]
    fn test_edge_list_empty() {
        let bytes = encode_edge_list(&[]);
        assert_eq!(&bytes[..], &[0, 0, 0, 0]);
        assert_eq!(decode_edge_list(&bytes), Ok(vec![]));
    }

    #[test]
    fn test_edge_list_count_exceeds_buffer() {
        // Declares 3 edges, carries 1.
        let mut bytes = vec![0, 0, 0, 3];
        bytes.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(
            decode_edge_list(&bytes),
            Err(DecodeError::Truncated {
                needed: 28,
                actual: 12
            })
        );
    }

    #[test]
    fn test_edge_list_huge_count() {
        assert!(decode_edge_list(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn test_edge_list_missing_header() {
        assert!(decode_edge_list(&[0, 0]).is_err());
    }

    #[test]
    fn test_edge_list_trailing_bytes_ignored() {
        let mut bytes = encode_edge_list(&[Edge::new(5, 6)]).to_vec();
        bytes.extend_from_slice(&[9, 9, 9]);
        assert_eq!(decode_edge_list(&bytes), Ok(vec![Edge::new(5, 6)]));
    }

    #[test]
    fn test_response_success() {
        let response = Response::Success {
            distance: 3,
            path: vec![0, 1, 2, 3],
        };
        let bytes = encode_response(&response);
        assert_eq!(bytes.len(), 12 + 16);
        assert_eq!(&bytes[..12], &[0, 0, 0, 0, 0, 0, 0, 3, 0, 0, 0, 4]);
        assert_eq!(decode_response(&bytes), Ok(response));
    }

    #[test]
    fn test_response_errors_zero_fields() {
        assert_eq!(
            &encode_response(&Response::NoPath)[..],
            &[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            &encode_response(&Response::InvalidRequest)[..],
            &[0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            decode_response(&encode_response(&Response::InvalidRequest)),
            Ok(Response::InvalidRequest)
        );
    }

    #[test]
    fn test_response_unknown_code() {
        let bytes = [0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(decode_response(&bytes), Err(DecodeError::UnknownCode(7)));
    }

    #[test]
    fn test_response_truncated_path() {
        let bytes = [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 5];
        assert!(matches!(
            decode_response(&bytes),
            Err(DecodeError::Truncated { needed: 20, .. })
        ));
    }

    #[test]
    fn test_datagram_split() {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 2)];
        let bytes = encode_datagram(&PathQuery::new(0, 2), &edges);
        assert_eq!(bytes.len(), 8 + 4 + 16);
        let (query, decoded) = decode_datagram(&bytes).unwrap();
        assert_eq!(query, PathQuery::new(0, 2));
        assert_eq!(decoded, edges);
    }

    #[test]
    fn test_datagram_too_short() {
        assert!(matches!(
            decode_datagram(&[0; 11]),
            Err(DecodeError::Truncated { needed: 12, .. })
        ));
    }
}
