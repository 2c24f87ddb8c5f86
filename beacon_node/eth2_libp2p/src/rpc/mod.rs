//! Wire protocol (C9): request/response message framing, independent of whatever multiplexed
//! stream transport carries the bytes (see the module doc on [`crate::service`]).

pub mod codec;
pub mod methods;
pub mod protocol;

use bytes::BytesMut;
use ssz::{Decode, Encode};

pub use codec::{RPCError, ResponseCode};
pub use methods::{
    BlocksByRangeRequest, BlocksByRootRequest, MetaData, Ping, RPCRequest, RPCResponse,
    StatusMessage,
};
pub use protocol::{Protocol, MAX_RPC_SIZE, STREAM_OPEN_TIMEOUT};

/// Builds the bytes for a request: `context_bytes (never present on requests) | length | framed
/// snappy ssz`. Requests never carry a response code or context bytes (those are response-only
/// per spec.md §4.9).
pub fn encode_request<T: Encode>(request: &T) -> Result<BytesMut, RPCError> {
    codec::encode_framed_snappy(&request.as_ssz_bytes())
}

/// Builds the bytes for one response chunk: `response_code | context_bytes? | length | framed
/// snappy ssz`.
pub fn encode_response<T: Encode>(
    code: ResponseCode,
    context_bytes: Option<[u8; 4]>,
    response: &T,
) -> Result<BytesMut, RPCError> {
    let mut out = BytesMut::with_capacity(1 + 4);
    out.extend_from_slice(&[code.as_u8()]);
    if let Some(digest) = context_bytes {
        out.extend_from_slice(&digest);
    }
    out.extend_from_slice(&codec::encode_framed_snappy(&response.as_ssz_bytes())?);
    Ok(out)
}

/// Decodes one complete response chunk already buffered in `buf` (the caller's stream-reading
/// loop is responsible for knowing a full chunk has arrived before calling this — that loop lives
/// on the far side of the transport trait boundary, see [`crate::service`]). `protocol` tells us
/// whether to expect context bytes; `decode_payload` converts the framed-and-decompressed ssz
/// bytes into `T` (the caller knows which concrete response type `protocol` implies).
pub fn decode_response_chunk<T, F>(
    protocol: Protocol,
    buf: &mut BytesMut,
    decode_payload: F,
) -> Result<T, RPCError>
where
    F: FnOnce(&[u8]) -> Result<T, RPCError>,
{
    if buf.is_empty() {
        return Err(RPCError::UnexpectedEOF);
    }
    let code = ResponseCode::from_u8(buf[0])?;
    let mut rest = buf.split_off(1);

    if protocol.has_context_bytes() {
        if rest.len() < 4 {
            return Err(RPCError::InvalidContextBytes);
        }
        let _fork_digest = rest.split_to(4);
    }

    let payload = codec::decode_framed_snappy(&mut rest, MAX_RPC_SIZE)?
        .ok_or(RPCError::PotentiallyExpectedEOF)?;

    if code != ResponseCode::Success {
        let msg = String::from_utf8_lossy(&payload).to_string();
        return Err(RPCError::ReceivedErrorResponse(code, msg));
    }
    decode_payload(&payload)
}

pub fn ssz_decode<T: Decode>(bytes: &[u8]) -> Result<T, RPCError> {
    T::from_ssz_bytes(bytes).map_err(|e| RPCError::InvalidSszBytes(format!("{:?}", e)))
}
