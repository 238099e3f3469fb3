/*!
Decode path: message framing, record parsing, and the streaming parser
driving them.
*/
use std::io::Read;

pub mod iters;
pub mod message;
pub mod record;
pub mod utils;

pub use crate::error::ParserError;
pub use iters::{FallibleRecordIterator, RecordIterator};
pub use message::{
    encode_ipfix_message, read_ipfix_message, IpfixMessage, MessageHeader, Set, SetIter,
    IPFIX_VERSION, MESSAGE_HEADER_LEN, MINIMUM_DATA_SET_ID, SET_HEADER_LEN, TEMPLATE_SET_ID,
};
pub use record::{parse_data_record, parse_sub_template_list};

use crate::models::{SavRecord, TemplateId};

/// Streaming decoder for SAV IPFIX records.
///
/// Owns exclusive, forward-only access to one byte source. Messages are
/// consumed in order; there is no rewind and no re-parsing of a consumed
/// message.
///
/// ```no_run
/// use sav_ipfix::SavParser;
/// use std::fs::File;
///
/// let file = File::open("scenarios.ipfix").unwrap();
/// for record in SavParser::new(file) {
///     println!("{} with {} mappings", record.rule_type, record.mappings.len());
/// }
/// ```
pub struct SavParser<R> {
    reader: R,
    collected: u64,
}

impl<R: Read> SavParser<R> {
    pub fn new(reader: R) -> Self {
        SavParser {
            reader,
            collected: 0,
        }
    }

    /// Decode the next SAV record.
    ///
    /// Reads messages until one contains a main-data-record set, skipping
    /// template sets and unrelated data sets along the way. The loop is
    /// bounded only by the source: a stream of template-only messages never
    /// grows the call stack. An exhausted source yields
    /// [ParserError::EofExpected].
    pub fn next_record(&mut self) -> Result<SavRecord, ParserError> {
        loop {
            let message = read_ipfix_message(&mut self.reader)?;
            for set in message.sets() {
                let set = set?;
                // Ids below 256 are template/definition sets. This is
                // deliberately coarser than full IPFIX set-id semantics:
                // the codec supports exactly the fixed SAV template set, so
                // everything in the reserved range is skipped wholesale.
                if set.id < MINIMUM_DATA_SET_ID {
                    continue;
                }
                if set.id == u16::from(TemplateId::MainDataRecord) {
                    let record = parse_data_record(set.data)?;
                    self.collected += 1;
                    return Ok(record);
                }
                // data set for a template we do not consume
            }
        }
    }

    /// Number of records decoded so far.
    pub fn collected_count(&self) -> u64 {
        self.collected
    }

    /// Consume the parser and return the underlying byte source.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
