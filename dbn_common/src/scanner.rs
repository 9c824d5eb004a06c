//! Forward-only scanner over a DBN byte stream.
//!
//! The first access decodes the metadata frame; every later advance reads one
//! record frame into an internal scratch buffer. The scanner works the same
//! over files and sockets: a clean end of input at a record boundary ends the
//! sequence, anything shorter is a framing error. After the first error the
//! scanner stays failed.
use std::io::{self, BufReader, Read};

use log::debug;

use crate::error::DbnError;
use crate::metadata::{Metadata, MetadataCodec};
use crate::primitives::{read_exact_or_truncated, read_up_to};
use crate::record::{RECORD_HEADER_LEN, Record, RecordCodec, RecordHeader};
use crate::result::Result;

/// Capacity of the buffered reader wrapped around the source.
pub const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Scratch space for one frame. The largest frame a one-byte word count can
/// describe is 1020 bytes.
const FRAME_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Fresh,
    Streaming,
    Finished,
    Failed,
}

/// Counts bytes pulled through it, so the scanner knows the metadata length.
struct Counting<'a, R> {
    inner: &'a mut R,
    count: usize,
}

impl<R: Read> Read for Counting<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n;
        Ok(n)
    }
}

/// Sequential reader of one DBN stream.
pub struct DbnScanner<R: Read> {
    reader: BufReader<R>,
    state: ScanState,
    metadata: Option<Metadata>,
    codec: Option<RecordCodec>,
    frame: Vec<u8>,
    header: Option<RecordHeader>,
    offset: usize,
    frames: u64,
}

impl<R: Read> DbnScanner<R> {
    /// Scanner over an unbuffered source.
    pub fn new(source: R) -> Self {
        Self::from_buf_reader(BufReader::with_capacity(READ_BUFFER_SIZE, source))
    }

    /// Scanner over an already-buffered source. Bytes the reader has buffered
    /// but not yet handed out are the start of the stream.
    pub fn from_buf_reader(reader: BufReader<R>) -> Self {
        DbnScanner {
            reader,
            state: ScanState::Fresh,
            metadata: None,
            codec: None,
            frame: vec![0; FRAME_CAPACITY],
            header: None,
            offset: 0,
            frames: 0,
        }
    }

    /// Stream metadata, decoded on first call and cached afterwards.
    pub fn metadata(&mut self) -> Result<&Metadata> {
        if self.state == ScanState::Fresh {
            let decoded = self.read_metadata();
            self.guard(decoded)?;
        }
        self.metadata.as_ref().ok_or(DbnError::ScannerFailed)
    }

    /// Advances to the next record frame without decoding its body.
    ///
    /// Returns `Ok(false)` at a clean end of stream.
    pub fn next_frame(&mut self) -> Result<bool> {
        match self.state {
            ScanState::Failed => return Err(DbnError::ScannerFailed),
            ScanState::Finished => return Ok(false),
            ScanState::Fresh => {
                self.metadata()?;
            }
            ScanState::Streaming => {}
        }
        let advanced = self.read_frame();
        self.guard(advanced)
    }

    /// Advances and decodes the next record. `Ok(None)` at end of stream.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if !self.next_frame()? {
            return Ok(None);
        }
        let decoded = self.decode_current();
        self.guard(decoded).map(Some)
    }

    /// Header of the current frame.
    pub fn current_header(&self) -> Option<&RecordHeader> {
        self.header.as_ref()
    }

    /// Raw bytes of the current frame, header included. Empty before the
    /// first frame and after the end of stream.
    pub fn current_bytes(&self) -> &[u8] {
        &self.frame[..self.current_size()]
    }

    /// Declared size of the current frame in bytes.
    pub fn current_size(&self) -> usize {
        self.header.map(|h| h.record_size()).unwrap_or(0)
    }

    /// Decodes the current frame.
    pub fn decode_current(&self) -> Result<Record> {
        let (Some(header), Some(codec)) = (self.header.as_ref(), self.codec.as_ref()) else {
            return Err(DbnError::InvalidState {
                operation: "decode_current",
                state: format!("{:?}", self.state),
            });
        };
        codec.decode_body(header, &self.frame[RECORD_HEADER_LEN..header.record_size()])
    }

    /// Send timestamp of the current frame, for streams with `ts_out`.
    pub fn current_ts_out(&self) -> Option<u64> {
        let codec = self.codec.as_ref()?;
        let header = self.header.as_ref()?;
        codec.expected_size(header.rtype)?;
        codec.ts_out(self.current_bytes())
    }

    /// Number of record frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Returns `true` once the scanner has failed.
    pub fn is_failed(&self) -> bool {
        self.state == ScanState::Failed
    }

    /// Iterator over the remaining records. It stops after the first error.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
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
            self.header = None;
        }
        result
    }

    fn read_metadata(&mut self) -> Result<()> {
        let mut counting = Counting {
            inner: &mut self.reader,
            count: 0,
        };
        let metadata = MetadataCodec::decode(&mut counting)?;
        self.offset = counting.count;
        debug!(
            "Scanner read {} v{} metadata ({} bytes, schema {:?}, ts_out {})",
            metadata.dataset,
            metadata.version.as_u8(),
            self.offset,
            metadata.schema,
            metadata.ts_out
        );
        self.codec = Some(RecordCodec::for_metadata(&metadata));
        self.metadata = Some(metadata);
        self.state = ScanState::Streaming;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<bool> {
        let got = read_up_to(&mut self.reader, &mut self.frame[..RECORD_HEADER_LEN])?;
        if got == 0 {
            debug!("Scanner reached end of stream after {} records", self.frames);
            self.state = ScanState::Finished;
            self.header = None;
            return Ok(false);
        }
        if got < RECORD_HEADER_LEN {
            return Err(DbnError::Truncated {
                context: "record header",
                offset: self.offset,
                expected: RECORD_HEADER_LEN,
                got,
            });
        }
        let header = RecordCodec::decode_header(&self.frame[..RECORD_HEADER_LEN])?;
        let size = header.record_size();
        if let Some(expected) = self
            .codec
            .as_ref()
            .and_then(|codec| codec.expected_size(header.rtype))
        {
            if expected != size {
                return Err(DbnError::RecordLength {
                    rtype: header.rtype,
                    expected,
                    got: size,
                });
            }
        }
        read_exact_or_truncated(
            &mut self.reader,
            &mut self.frame[RECORD_HEADER_LEN..size],
            "record body",
            self.offset + RECORD_HEADER_LEN,
        )?;
        self.offset += size;
        self.frames += 1;
        self.header = Some(header);
        Ok(true)
    }
}

/// Iterator returned by [`DbnScanner::records`].
pub struct Records<'a, R: Read> {
    scanner: &'a mut DbnScanner<R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
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

impl<R: Read> std::iter::FusedIterator for Records<'_, R> {}
