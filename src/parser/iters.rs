/*!
Provides parser iterator implementations.

Two flavors, following the usual split:
- [RecordIterator]: skips record-scoped errors with a warning and stops at
  end of stream or on a stream-fatal error. The default `for` loop behavior.
- [FallibleRecordIterator]: surfaces every error to the caller and fuses
  after a fatal one.
*/
use crate::error::ParserError;
use crate::models::SavRecord;
use crate::parser::SavParser;
use log::warn;
use std::io::Read;

pub struct RecordIterator<R> {
    parser: SavParser<R>,
}

impl<R> RecordIterator<R> {
    pub(crate) fn new(parser: SavParser<R>) -> Self {
        RecordIterator { parser }
    }
}

impl<R: Read> Iterator for RecordIterator<R> {
    type Item = SavRecord;

    fn next(&mut self) -> Option<SavRecord> {
        loop {
            match self.parser.next_record() {
                Ok(record) => return Some(record),
                Err(ParserError::EofExpected) => return None,
                Err(e) if e.is_fatal() => {
                    warn!("stopping iteration: {}", e);
                    return None;
                }
                Err(e) => {
                    // record-scoped error, the next message may still decode
                    warn!("skipping record: {}", e);
                }
            }
        }
    }
}

pub struct FallibleRecordIterator<R> {
    parser: SavParser<R>,
    fused: bool,
}

impl<R> FallibleRecordIterator<R> {
    pub(crate) fn new(parser: SavParser<R>) -> Self {
        FallibleRecordIterator {
            parser,
            fused: false,
        }
    }
}

impl<R: Read> Iterator for FallibleRecordIterator<R> {
    type Item = Result<SavRecord, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.parser.next_record() {
            Ok(record) => Some(Ok(record)),
            Err(ParserError::EofExpected) => {
                self.fused = true;
                None
            }
            Err(e) => {
                if e.is_fatal() {
                    self.fused = true;
                }
                Some(Err(e))
            }
        }
    }
}

/// Use [RecordIterator] as the default iterator, skipping undecodable
/// records.
impl<R: Read> IntoIterator for SavParser<R> {
    type Item = SavRecord;
    type IntoIter = RecordIterator<R>;

    fn into_iter(self) -> Self::IntoIter {
        RecordIterator::new(self)
    }
}

impl<R: Read> SavParser<R> {
    pub fn into_record_iter(self) -> RecordIterator<R> {
        RecordIterator::new(self)
    }

    pub fn into_fallible_record_iter(self) -> FallibleRecordIterator<R> {
        FallibleRecordIterator::new(self)
    }
}
