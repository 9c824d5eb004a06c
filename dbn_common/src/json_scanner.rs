//! Forward-only scanner over a DBN JSON-lines stream.
//!
//! Every non-blank line is one record; there is no metadata frame. Records
//! are decoded by `RecordCodec::decode_json`, so header lengths follow the
//! codec's layouts (DBN v2 without `ts_out` unless told otherwise). Like
//! `DbnScanner`, the scanner stays failed after its first error.
use std::io::{BufRead, BufReader, Read};

use log::debug;

use crate::error::DbnError;
use crate::metadata::DbnVersion;
use crate::record::{Record, RecordCodec};
use crate::result::Result;
use crate::scanner::READ_BUFFER_SIZE;

/// Longest accepted line, line terminator excluded.
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Streaming,
    Finished,
    Failed,
}

/// Sequential reader of one DBN JSON stream.
pub struct JsonScanner<R: Read> {
    reader: BufReader<R>,
    codec: RecordCodec,
    state: ScanState,
    line: String,
    offset: usize,
    lines: u64,
    records: u64,
}

impl<R: Read> JsonScanner<R> {
    /// Scanner over an unbuffered source.
    pub fn new(source: R) -> Self {
        Self::from_buf_reader(BufReader::with_capacity(READ_BUFFER_SIZE, source))
    }

    /// Scanner over an already-buffered source.
    pub fn from_buf_reader(reader: BufReader<R>) -> Self {
        JsonScanner {
            reader,
            codec: RecordCodec::new(DbnVersion::V2, false),
            state: ScanState::Streaming,
            line: String::new(),
            offset: 0,
            lines: 0,
            records: 0,
        }
    }

    /// Replaces the codec that decides record header lengths.
    pub fn with_codec(mut self, codec: RecordCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Advances to the next non-blank line without decoding it.
    ///
    /// Returns `Ok(false)` at end of stream. A final line without a
    /// terminator is still a line.
    pub fn next_line(&mut self) -> Result<bool> {
        match self.state {
            ScanState::Failed => return Err(DbnError::ScannerFailed),
            ScanState::Finished => return Ok(false),
            ScanState::Streaming => {}
        }
        let advanced = self.read_line();
        self.guard(advanced)
    }

    /// Advances and decodes the next record. `Ok(None)` at end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if !self.next_line()? {
            return Ok(None);
        }
        let decoded = self.decode_current();
        self.guard(decoded).map(Some)
    }

    /// Current line without its terminator. Empty before the first line and
    /// after the end of stream.
    pub fn current_line(&self) -> &str {
        &self.line
    }

    /// Decodes the current line.
    pub fn decode_current(&self) -> Result<Record> {
        if self.line.is_empty() {
            return Err(DbnError::InvalidState {
                operation: "decode_current",
                state: format!("{:?}", self.state),
            });
        }
        self.codec.decode_json(&self.line)
    }

    /// Number of physical lines read so far, blank ones included.
    pub fn lines_read(&self) -> u64 {
        self.lines
    }

    /// Number of record lines read so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Returns `true` once the scanner has failed.
    pub fn is_failed(&self) -> bool {
        self.state == ScanState::Failed
    }

    /// Iterator over the remaining records. It stops after the first error.
    pub fn records(&mut self) -> JsonRecords<'_, R> {
        JsonRecords {
            scanner: self,
            done: false,
        }
    }

    /// Decodes every remaining record of a finite stream.
    pub fn read_to_vec(&mut self) -> Result<Vec<Record>> {
        self.records().collect()
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = ScanState::Failed;
            self.line.clear();
        }
        result
    }

    fn read_line(&mut self) -> Result<bool> {
        let mut buf = std::mem::take(&mut self.line).into_bytes();
        loop {
            buf.clear();
            let start = self.offset;
            let got = (&mut self.reader)
                .take(MAX_LINE_LEN as u64 + 1)
                .read_until(b'\n', &mut buf)?;
            if got == 0 {
                debug!(
                    "JSON scanner reached end of stream after {} records",
                    self.records
                );
                self.state = ScanState::Finished;
                return Ok(false);
            }
            self.offset += got;
            self.lines += 1;
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            } else if got > MAX_LINE_LEN {
                return Err(DbnError::LineTooLong {
                    line: self.lines,
                    limit: MAX_LINE_LEN,
                });
            }
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            self.line = String::from_utf8(buf).map_err(|_| DbnError::InvalidUtf8 {
                field: "JSON line",
                offset: start,
            })?;
            self.records += 1;
            return Ok(true);
        }
    }
}

/// Iterator returned by [`JsonScanner::records`].
pub struct JsonRecords<'a, R: Read> {
    scanner: &'a mut JsonScanner<R>,
    done: bool,
}

impl<R: Read> Iterator for JsonRecords<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for JsonRecords<'_, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::rtype;
    use crate::error::ErrorClass;

    const BAR_1: &str = r#"{"hd":{"ts_event":"1609160400000000000","rtype":32,"publisher_id":1,"instrument_id":5482},"open":"372025000000000","high":"372050000000000","low":"372025000000000","close":"372050000000000","volume":"57"}"#;
    const BAR_2: &str = r#"{"hd":{"ts_event":"1609160401000000000","rtype":32,"publisher_id":1,"instrument_id":5482},"open":"372050000000000","high":"372050000000000","low":"372050000000000","close":"372050000000000","volume":"13"}"#;
    const HEARTBEAT: &str = r#"{"hd":{"ts_event":"1609160402000000000","rtype":23,"publisher_id":0,"instrument_id":0},"msg":"Heartbeat","code":0}"#;

    #[test]
    fn reads_one_record_per_line() {
        let input = format!("{BAR_1}\r\n\n  \n{BAR_2}\n{HEARTBEAT}");
        let mut scanner = JsonScanner::new(input.as_bytes());
        let records = scanner.read_to_vec().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].rtype(), rtype::OHLCV_1S);
        assert_eq!(records[0].header().length, 14);
        assert_eq!(records[1].header().ts_event, 1_609_160_401_000_000_000);
        match &records[2] {
            Record::System(msg) => assert!(msg.is_heartbeat()),
            other => panic!("expected System, got {:?}", other),
        }
        assert_eq!(scanner.lines_read(), 5);
        assert_eq!(scanner.records_read(), 3);
        assert_eq!(scanner.current_line(), "");
        assert!(!scanner.next_line().unwrap());
    }

    #[test]
    fn current_line_is_unterminated_text() {
        let input = format!("{BAR_1}\r\n{BAR_2}\n");
        let mut scanner = JsonScanner::new(input.as_bytes());
        assert!(scanner.next_line().unwrap());
        assert_eq!(scanner.current_line(), BAR_1);
        assert!(scanner.next_line().unwrap());
        assert_eq!(scanner.current_line(), BAR_2);
        assert_eq!(scanner.decode_current().unwrap().header().instrument_id, 5482);
        assert!(!scanner.next_line().unwrap());
        assert!(scanner.decode_current().is_err());
    }

    #[test]
    fn codec_sets_header_length() {
        let codec = RecordCodec::new(DbnVersion::V2, true);
        let mut scanner = JsonScanner::new(BAR_1.as_bytes()).with_codec(codec);
        let record = scanner.next_record().unwrap().unwrap();
        assert_eq!(record.header().record_size(), 64);
    }

    #[test]
    fn unknown_rtype_flows_through() {
        let unknown = r#"{"hd":{"ts_event":"1","rtype":238,"publisher_id":1,"instrument_id":1}}"#;
        let input = format!("{unknown}\n{BAR_1}\n");
        let records = JsonScanner::new(input.as_bytes()).read_to_vec().unwrap();
        assert!(records[0].is_unrecognized());
        assert_eq!(records[1].rtype(), rtype::OHLCV_1S);
    }

    #[test]
    fn malformed_line_fails_and_sticks() {
        let input = format!("{BAR_1}\n{{\"hd\":[]}}\n{BAR_2}\n");
        let mut scanner = JsonScanner::new(input.as_bytes());
        assert!(scanner.next_record().unwrap().is_some());
        let err = scanner.next_record().unwrap_err();
        assert_eq!(err.class(), ErrorClass::Format);
        assert!(scanner.is_failed());
        assert_eq!(scanner.current_line(), "");
        assert!(matches!(scanner.next_record(), Err(DbnError::ScannerFailed)));
        assert!(matches!(scanner.next_line(), Err(DbnError::ScannerFailed)));
    }

    #[test]
    fn cut_final_line_is_framing_error() {
        let input = format!("{BAR_1}\n{}", &BAR_2[..40]);
        let mut scanner = JsonScanner::new(input.as_bytes());
        let mut records = scanner.records();
        assert!(records.next().unwrap().is_ok());
        let err = records.next().unwrap().unwrap_err();
        assert_eq!(err.class(), ErrorClass::Framing);
        assert!(records.next().is_none());
    }

    #[test]
    fn overlong_line_is_rejected() {
        let mut input = vec![b' '; MAX_LINE_LEN];
        input.extend_from_slice(b"x\n");
        input.extend_from_slice(BAR_1.as_bytes());
        let mut scanner = JsonScanner::new(&input[..]);
        let err = scanner.next_line().unwrap_err();
        assert!(matches!(
            err,
            DbnError::LineTooLong {
                line: 1,
                limit: MAX_LINE_LEN
            }
        ));
        assert_eq!(err.class(), ErrorClass::Framing);
        assert!(matches!(scanner.next_line(), Err(DbnError::ScannerFailed)));
    }

    #[test]
    fn line_at_limit_is_accepted() {
        let mut line = BAR_1.to_string();
        line.push_str(&" ".repeat(MAX_LINE_LEN - BAR_1.len()));
        line.push('\n');
        let mut scanner = JsonScanner::new(line.as_bytes());
        assert!(scanner.next_record().unwrap().is_some());
    }

    #[test]
    fn invalid_utf8_is_format_error() {
        let input = b"{\"hd\":\xff}\n";
        let err = JsonScanner::new(&input[..]).next_line().unwrap_err();
        assert!(matches!(
            err,
            DbnError::InvalidUtf8 {
                field: "JSON line",
                offset: 0
            }
        ));
        assert_eq!(err.class(), ErrorClass::Format);
    }
}
