//! The `[response_code | context_bytes | length (LEB128 varint) | framed-snappy payload]` framing
//! of spec.md §4.9. This module only handles bytes; it has no idea what a `Status` or
//! `BlocksByRange` request looks like, so it works the same for every RPC method.

use bytes::{Buf, BufMut, BytesMut};
use std::io;

use super::protocol::MAX_RPC_SIZE;

#[derive(Debug, PartialEq)]
pub enum RPCError {
    /// Transport kind.
    BrokenConnection,
    StreamOpenTimeout,
    ReadResponseTimeout,
    UnexpectedEOF,
    PotentiallyExpectedEOF,
    /// Framing kind.
    InvalidResponseCode(u8),
    InvalidSnappyBytes(String),
    InvalidSszBytes(String),
    ZeroSizePrefix,
    SizePrefixOverflow { declared: usize, max: usize },
    InvalidContextBytes,
    /// Application kind.
    ReceivedErrorResponse(ResponseCode, String),
    InvalidInputs(String),
    ResourceUnavailable,
}

impl From<io::Error> for RPCError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            RPCError::UnexpectedEOF
        } else {
            RPCError::BrokenConnection
        }
    }
}

/// On-wire disconnect/error codes, per spec.md §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    InvalidRequest,
    ServerError,
    ResourceUnavailable,
}

impl ResponseCode {
    pub fn as_u8(&self) -> u8 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::InvalidRequest => 1,
            ResponseCode::ServerError => 2,
            ResponseCode::ResourceUnavailable => 3,
        }
    }

    pub fn from_u8(byte: u8) -> Result<Self, RPCError> {
        match byte {
            0 => Ok(ResponseCode::Success),
            1 => Ok(ResponseCode::InvalidRequest),
            2 => Ok(ResponseCode::ServerError),
            3 => Ok(ResponseCode::ResourceUnavailable),
            other => Err(RPCError::InvalidResponseCode(other)),
        }
    }
}

/// Compresses `payload` with the snappy frame format and prefixes it with its uncompressed
/// length as an LEB128 varint, exactly as the reader expects to find it.
pub fn encode_framed_snappy(payload: &[u8]) -> Result<BytesMut, RPCError> {
    use snap::write::FrameEncoder;
    use std::io::Write;

    let mut compressed = Vec::new();
    {
        let mut encoder = FrameEncoder::new(&mut compressed);
        encoder
            .write_all(payload)
            .map_err(|e| RPCError::InvalidSnappyBytes(e.to_string()))?;
    }

    let mut out = BytesMut::with_capacity(10 + compressed.len());
    let mut len_buf = unsigned_varint::encode::usize_buffer();
    out.put_slice(unsigned_varint::encode::usize(payload.len(), &mut len_buf));
    out.put_slice(&compressed);
    Ok(out)
}

/// Reads a varint-prefixed, framed-snappy payload from the front of `buf`, returning the
/// decompressed bytes and advancing `buf` past what was consumed. Enforces `max_chunk_size`
/// against the *declared* (uncompressed) length before ever touching the decompressor, per
/// spec.md §4.9 ("readers enforce max-chunk-size against the declared length before
/// decompression").
pub fn decode_framed_snappy(buf: &mut BytesMut, max_chunk_size: usize) -> Result<Option<Vec<u8>>, RPCError> {
    if buf.is_empty() {
        return Ok(None);
    }

    let (declared_len, varint_len) = match unsigned_varint::decode::usize(buf) {
        Ok((len, rest)) => (len, buf.len() - rest.len()),
        Err(unsigned_varint::decode::Error::Insufficient) => return Ok(None),
        Err(_) => return Err(RPCError::InvalidInputs("malformed varint length prefix".into())),
    };

    if declared_len == 0 {
        return Err(RPCError::ZeroSizePrefix);
    }
    if declared_len > max_chunk_size {
        return Err(RPCError::SizePrefixOverflow {
            declared: declared_len,
            max: max_chunk_size,
        });
    }

    // We don't know the compressed length ahead of time; try decompressing what's buffered and
    // treat "not enough data yet" as a request for more bytes rather than an error.
    use snap::read::FrameDecoder;
    use std::io::Read;

    let compressed = &buf[varint_len..];
    let mut decoder = FrameDecoder::new(compressed);
    let mut decompressed = vec![0u8; declared_len];
    match decoder.read_exact(&mut decompressed) {
        Ok(()) => {
            let consumed_compressed = compressed.len() - decoder.get_ref().len();
            buf.advance(varint_len + consumed_compressed);
            Ok(Some(decompressed))
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(RPCError::InvalidSnappyBytes(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_payload() {
        let payload = b"hello world, this is an ssz-encoded request".to_vec();
        let mut encoded = encode_framed_snappy(&payload).unwrap();
        let decoded = decode_framed_snappy(&mut encoded, MAX_RPC_SIZE).unwrap().unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn rejects_oversized_declared_length() {
        let payload = vec![0u8; 100];
        let mut encoded = encode_framed_snappy(&payload).unwrap();
        let err = decode_framed_snappy(&mut encoded, 10).unwrap_err();
        assert!(matches!(err, RPCError::SizePrefixOverflow { .. }));
    }
}
