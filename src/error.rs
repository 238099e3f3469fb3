/*!
error module defines the error types used in sav-ipfix.
*/
use crate::models::Afi;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    /// The 16-byte message header declared a version other than 10.
    ///
    /// This error is fatal for the byte stream: there is no resynchronization
    /// strategy for a source speaking a different protocol version.
    #[error("unsupported IPFIX version: {0}")]
    UnsupportedVersion(u16),
    /// Ran out of bytes during a fixed-size read.
    ///
    /// ## Occurs during:
    ///  - Reading a message header or message payload
    ///  - Positional parsing of a data record or sub-template list
    #[error("truncated data: needed {needed} bytes, {available} available")]
    TruncatedData { needed: usize, available: usize },
    /// A set header declared a length smaller than the header itself.
    /// The containing message cannot be walked past this set.
    #[error("invalid set length: {0}")]
    InvalidSetLength(u16),
    /// A sub-template list referenced a template id with no known mapping
    /// layout. Fatal for the current record only; subsequent messages on the
    /// same stream can still be decoded.
    #[error("unknown sub-template id: {0}")]
    UnknownSubTemplate(u16),
    /// A record's mapping list mixes IPv4 and IPv6 prefixes. One sub-template
    /// list carries exactly one address family.
    #[error("address family mismatch: {expected:?} sub-template list cannot carry {found:?} mapping")]
    InvalidAddressFamily { expected: Afi, found: Afi },
    /// The encoded sub-template list does not fit the single-byte length
    /// prefix of the data record (wire-format cap of 255 bytes).
    #[error("sub-template list of {0} bytes exceeds the one-byte length prefix")]
    OversizedSubTemplateList(usize),
    /// The observationTimeMilliseconds value is outside the representable
    /// timestamp range.
    #[error("timestamp out of range: {0} ms")]
    InvalidTimestamp(u64),
    /// A general IO error triggered by the underlying reader or writer.
    #[error(transparent)]
    IoError(#[from] io::Error),
    /// Clean end of stream: the source was exhausted at a message boundary.
    #[error("end of stream")]
    EofExpected,
}

impl ParserError {
    /// Whether the byte stream must be abandoned after this error.
    ///
    /// Record-scoped failures ([UnknownSubTemplate](Self::UnknownSubTemplate),
    /// [InvalidTimestamp](Self::InvalidTimestamp)) leave the stream positioned
    /// at the next message boundary, so a caller may keep decoding.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParserError::UnsupportedVersion(_)
                | ParserError::TruncatedData { .. }
                | ParserError::InvalidSetLength(_)
                | ParserError::IoError(_)
        )
    }
}
