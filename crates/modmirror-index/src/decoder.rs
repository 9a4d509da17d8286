use bytes::{Buf, BytesMut};

use crate::error::{IndexError, Result};
use crate::record::IndexRecord;

/// Incremental decoder for the index feed body.
///
/// Bytes are pushed as they arrive and complete records are pulled out one
/// at a time. Records may be wrapped in a JSON array or separated by
/// newlines; `[`, `]`, `,` and whitespace between records are skipped.
/// Only the record currently being scanned is buffered.
///
/// After the first error the decoder is poisoned and yields nothing more,
/// while every record returned before it stays valid.
#[derive(Debug, Default)]
pub struct FeedDecoder {
    buf: BytesMut,
    /// Offset into `buf` up to which the current object has been scanned.
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Bytes consumed and discarded so far, for error offsets.
    consumed: u64,
    poisoned: bool,
}

impl FeedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if !self.poisoned {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// Next complete record, or `Ok(None)` when more input is needed.
    pub fn next_record(&mut self) -> Result<Option<IndexRecord>> {
        if self.poisoned {
            return Err(IndexError::Poisoned);
        }
        match self.scan() {
            Ok(Some(end)) => {
                let object = self.buf.split_to(end);
                self.consumed += end as u64;
                self.scanned = 0;
                match serde_json::from_slice(&object) {
                    Ok(record) => Ok(Some(record)),
                    Err(e) => self.fail(IndexError::Json(e)),
                }
            }
            Ok(None) => Ok(None),
            Err(e) => self.fail(e),
        }
    }

    /// Signal end of input. Fails if a record was left incomplete.
    pub fn finish(&mut self) -> Result<()> {
        if self.poisoned {
            return Err(IndexError::Poisoned);
        }
        self.skip_separators();
        if self.buf.is_empty() {
            Ok(())
        } else {
            let pending = self.buf.len();
            self.fail(IndexError::Truncated { pending })
        }
    }

    fn fail<T>(&mut self, error: IndexError) -> Result<T> {
        self.poisoned = true;
        self.buf.clear();
        Err(error)
    }

    fn skip_separators(&mut self) {
        if self.scanned > 0 {
            return;
        }
        let skip = self
            .buf
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'[' | b']' | b','))
            .count();
        self.buf.advance(skip);
        self.consumed += skip as u64;
    }

    /// Returns the exclusive end of the first complete object in `buf`.
    fn scan(&mut self) -> Result<Option<usize>> {
        self.skip_separators();
        if self.scanned == 0 {
            match self.buf.first() {
                None => return Ok(None),
                Some(b'{') => {}
                Some(&byte) => {
                    return Err(IndexError::Framing {
                        offset: self.consumed,
                        byte,
                    });
                }
            }
        }

        while self.scanned < self.buf.len() {
            let byte = self.buf[self.scanned];
            self.scanned += 1;
            if self.in_string {
                match byte {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Ok(Some(self.scanned));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut FeedDecoder) -> Vec<IndexRecord> {
        let mut out = Vec::new();
        while let Some(record) = decoder.next_record().unwrap() {
            out.push(record);
        }
        out
    }

    const NDJSON: &str = concat!(
        r#"{"Path":"golang.org/x/text","Version":"v0.3.0","Timestamp":"2019-04-10T19:08:52.9972Z"}"#,
        "\n",
        r#"{"Path":"github.com/a/b","Version":"v1.0.0","Timestamp":"2019-04-10T19:08:53.001Z"}"#,
        "\n",
    );

    #[test]
    fn newline_delimited() {
        let mut decoder = FeedDecoder::new();
        decoder.push(NDJSON.as_bytes());
        let records = decode_all(&mut decoder);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "golang.org/x/text");
        assert_eq!(records[1].timestamp, "2019-04-10T19:08:53.001Z");
        decoder.finish().unwrap();
    }

    #[test]
    fn json_array() {
        let mut decoder = FeedDecoder::new();
        decoder.push(
            br#"[ {"Path":"m1","Version":"v1","Timestamp":"t1"},
                 {"Path":"m2","Version":"v2","Timestamp":"t2"} ]"#,
        );
        let records = decode_all(&mut decoder);
        assert_eq!(
            records,
            [IndexRecord::new("m1", "v1", "t1"), IndexRecord::new("m2", "v2", "t2")]
        );
        decoder.finish().unwrap();
    }

    #[test]
    fn byte_at_a_time() {
        let mut decoder = FeedDecoder::new();
        let mut records = Vec::new();
        for byte in NDJSON.as_bytes() {
            decoder.push(std::slice::from_ref(byte));
            records.extend(decode_all(&mut decoder));
        }
        assert_eq!(records.len(), 2);
        decoder.finish().unwrap();
    }

    #[test]
    fn braces_and_escapes_inside_strings() {
        let mut decoder = FeedDecoder::new();
        decoder.push(
            br#"{"Path":"a/{weird}\"}","Version":"v1","Timestamp":"t","Extra":[1,{"x":2}]}"#,
        );
        let record = decoder.next_record().unwrap().unwrap();
        assert_eq!(record.path, r#"a/{weird}"}"#);
    }

    #[test]
    fn truncated_body() {
        let mut decoder = FeedDecoder::new();
        decoder.push(br#"{"Path":"m1","Version":"v1","Timestamp":"t1"}{"Path":"m2""#);
        assert_eq!(decode_all(&mut decoder).len(), 1);
        assert!(matches!(decoder.finish(), Err(IndexError::Truncated { .. })));
        assert!(matches!(decoder.next_record(), Err(IndexError::Poisoned)));
    }

    #[test]
    fn garbage_between_records() {
        let mut decoder = FeedDecoder::new();
        decoder.push(b"{\"Path\":\"m1\",\"Version\":\"v1\",\"Timestamp\":\"t1\"}\n<html>");
        assert!(decoder.next_record().unwrap().is_some());
        match decoder.next_record() {
            Err(IndexError::Framing { byte, offset }) => {
                assert_eq!(byte, b'<');
                assert_eq!(offset, 46);
            }
            other => panic!("expected framing error, got {other:?}"),
        }
        assert!(matches!(decoder.next_record(), Err(IndexError::Poisoned)));
    }

    #[test]
    fn missing_field_is_a_json_error() {
        let mut decoder = FeedDecoder::new();
        decoder.push(br#"{"Path":"m1"}"#);
        assert!(matches!(decoder.next_record(), Err(IndexError::Json(_))));
    }
}
