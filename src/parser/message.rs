//! IPFIX message framing [RFC 7011, section 3][message].
//!
//! [message]: https://www.rfc-editor.org/rfc/rfc7011#section-3
//!
//! An IPFIX message is constructed as the following:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |       Version Number          |            Length             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Export Time                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Sequence Number                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Observation Domain ID                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       Set(s)... (variable)
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Each set carries a 4-byte header (set id, set length including the
//! header) followed by its payload.

use crate::error::ParserError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Read;

pub const IPFIX_VERSION: u16 = 10;
pub const MESSAGE_HEADER_LEN: usize = 16;
pub const SET_HEADER_LEN: usize = 4;

/// Set id of a template set (RFC 7011 section 3.3.2).
pub const TEMPLATE_SET_ID: u16 = 2;

/// Smallest set id denoting a data set; below this lies the reserved
/// template/definition range.
pub const MINIMUM_DATA_SET_ID: u16 = 256;

/// The 16-byte IPFIX message header.
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub struct MessageHeader {
    pub version: u16,
    /// Total message length in bytes, header included.
    pub length: u16,
    /// Seconds since epoch at export time.
    pub export_time: u32,
    pub sequence_number: u32,
    /// Always 0 in this system.
    pub observation_domain_id: u32,
}

/// One IPFIX message: header plus the raw payload holding its sets.
#[derive(Debug, PartialEq, Clone)]
pub struct IpfixMessage {
    pub header: MessageHeader,
    payload: Bytes,
}

impl IpfixMessage {
    /// Iterate over the sets embedded in this message.
    pub fn sets(&self) -> SetIter {
        SetIter {
            remaining: self.payload.clone(),
        }
    }
}

/// One set within a message: a set id and the payload behind its header.
#[derive(Debug, PartialEq, Clone)]
pub struct Set {
    pub id: u16,
    pub data: Bytes,
}

/// Walks a message payload as a sequence of sets.
///
/// Trailing bytes too short for another set header terminate the iteration
/// cleanly; they are padding, not an error.
pub struct SetIter {
    remaining: Bytes,
}

impl Iterator for SetIter {
    type Item = Result<Set, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.remaining() < SET_HEADER_LEN {
            return None;
        }
        let id = self.remaining.get_u16();
        let set_len = self.remaining.get_u16();
        if (set_len as usize) < SET_HEADER_LEN {
            return Some(Err(ParserError::InvalidSetLength(set_len)));
        }
        let data_len = set_len as usize - SET_HEADER_LEN;
        if self.remaining.remaining() < data_len {
            return Some(Err(ParserError::TruncatedData {
                needed: data_len,
                available: self.remaining.remaining(),
            }));
        }
        let data = self.remaining.copy_to_bytes(data_len);
        Some(Ok(Set { id, data }))
    }
}

/// Read until `buf` is full or the source is exhausted, returning the number
/// of bytes read. Unlike `read_exact`, a short read is reported with its
/// actual count so truncation errors can carry it.
fn read_fully(input: &mut impl Read, buf: &mut [u8]) -> Result<usize, ParserError> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ParserError::IoError(e)),
        }
    }
    Ok(filled)
}

/// Read the next complete IPFIX message from a byte source.
///
/// A source exhausted before the first header byte is a clean end of stream
/// ([ParserError::EofExpected]); a partial header or short payload is
/// [ParserError::TruncatedData]. A version other than 10 fails with
/// [ParserError::UnsupportedVersion] and no recovery is attempted.
pub fn read_ipfix_message(input: &mut impl Read) -> Result<IpfixMessage, ParserError> {
    let mut raw_header = [0u8; MESSAGE_HEADER_LEN];
    let got = read_fully(input, &mut raw_header)?;
    if got == 0 {
        return Err(ParserError::EofExpected);
    }
    if got < MESSAGE_HEADER_LEN {
        return Err(ParserError::TruncatedData {
            needed: MESSAGE_HEADER_LEN,
            available: got,
        });
    }

    let mut data = &raw_header[..];
    let version = data.get_u16();
    if version != IPFIX_VERSION {
        return Err(ParserError::UnsupportedVersion(version));
    }
    let length = data.get_u16();
    // the length field covers the header itself
    if (length as usize) < MESSAGE_HEADER_LEN {
        return Err(ParserError::TruncatedData {
            needed: MESSAGE_HEADER_LEN,
            available: length as usize,
        });
    }
    let header = MessageHeader {
        version,
        length,
        export_time: data.get_u32(),
        sequence_number: data.get_u32(),
        observation_domain_id: data.get_u32(),
    };

    let payload_len = length as usize - MESSAGE_HEADER_LEN;
    let mut payload = BytesMut::zeroed(payload_len);
    let got = read_fully(input, &mut payload)?;
    if got < payload_len {
        return Err(ParserError::TruncatedData {
            needed: payload_len,
            available: got,
        });
    }

    Ok(IpfixMessage {
        header,
        payload: payload.freeze(),
    })
}

/// Encode one complete message carrying a single set.
///
/// The length field is always `16 + 4 + payload.len()` and the observation
/// domain id is 0.
pub fn encode_ipfix_message(
    set_id: u16,
    payload: &[u8],
    export_time: u32,
    sequence_number: u32,
) -> Bytes {
    let total_len = MESSAGE_HEADER_LEN + SET_HEADER_LEN + payload.len();
    let mut bytes = BytesMut::with_capacity(total_len);
    bytes.put_u16(IPFIX_VERSION);
    bytes.put_u16(total_len as u16);
    bytes.put_u32(export_time);
    bytes.put_u32(sequence_number);
    bytes.put_u32(0); // observation domain id
    bytes.put_u16(set_id);
    bytes.put_u16((SET_HEADER_LEN + payload.len()) as u16);
    bytes.put_slice(payload);
    bytes.freeze()
}
