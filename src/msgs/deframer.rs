use std::io;
use std::ops::Range;

use crate::error::TlsError;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::enums::{ContentType, ProtocolVersion};

pub const HEADER_SIZE: usize = 1 + 2 + 2;

/// Maximum plaintext fragment, from the protocol.
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// Maximum protected payload: an AEAD tag and a content-type byte of
/// expansion are permitted on top of the plaintext limit.
pub const MAX_CIPHERTEXT_LEN: usize = MAX_FRAGMENT_LEN + 256;

pub const MAX_WIRE_SIZE: usize = HEADER_SIZE + MAX_CIPHERTEXT_LEN;

/// One record, described by indices into the reader's buffer so the
/// caller can decrypt the payload in place.
#[derive(Debug)]
pub struct RecordMeta {
    pub typ: ContentType,
    pub version: ProtocolVersion,
    pub payload: Range<usize>,
}

/// This reads full records out of a blocking byte stream.  Incomplete
/// trailing bytes are compacted to the front of the buffer before the
/// next fill, so a record is always contiguous when returned.
pub struct RecordReader {
    buf: [u8; MAX_WIRE_SIZE],
    start: usize,
    end: usize,
}

impl RecordReader {
    pub fn new() -> RecordReader {
        RecordReader {
            buf: [0u8; MAX_WIRE_SIZE],
            start: 0,
            end: 0,
        }
    }

    /// The whole internal buffer; `RecordMeta::payload` indexes into this.
    pub fn buf_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn buf(&self) -> &[u8] {
        &self.buf
    }

    /// Return the next complete record, or `None` when the stream ends
    /// cleanly at a record boundary.  An end-of-stream in the middle of
    /// a record is an error.
    pub fn next_record(&mut self, rd: &mut dyn io::Read) -> Result<Option<RecordMeta>, TlsError> {
        loop {
            if let Some(wanted) = self.contained_record_len()? {
                if self.end - self.start >= wanted {
                    let base = self.start;
                    self.start += wanted;

                    let mut r = Reader::init(&self.buf[base..base + HEADER_SIZE]);
                    let typ = match ContentType::read(&mut r) {
                        Some(ContentType::Unknown(_)) | None => return Err(TlsError::DecodeError),
                        Some(t) => t,
                    };
                    let version = match ProtocolVersion::read(&mut r) {
                        Some(ProtocolVersion::Unknown(_)) | None => return Err(TlsError::BadVersion),
                        Some(v) => v,
                    };

                    return Ok(Some(RecordMeta {
                        typ,
                        version,
                        payload: base + HEADER_SIZE..base + wanted,
                    }));
                }
            }

            // Compact the partial tail to the buffer head, then fill.
            if self.start > 0 {
                self.buf.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                self.start = 0;
            }

            let n = rd.read(&mut self.buf[self.end..])?;
            if n == 0 {
                if self.end > self.start {
                    return Err(TlsError::EndOfStream);
                }
                return Ok(None);
            }
            self.end += n;
        }
    }

    /// If a header is buffered, the total wire length of its record.
    fn contained_record_len(&self) -> Result<Option<usize>, TlsError> {
        if self.end - self.start < HEADER_SIZE {
            return Ok(None);
        }

        let declared = ((self.buf[self.start + 3] as usize) << 8) | self.buf[self.start + 4] as usize;
        if declared > MAX_CIPHERTEXT_LEN {
            return Err(TlsError::RecordOverflow);
        }

        Ok(Some(HEADER_SIZE + declared))
    }
}
