// Line retrieval: seek to an indexed offset, bounded read, ASCII decode, trim.
use std::io::{Read, Seek, SeekFrom};

use bstr::ByteSlice;

use crate::core::error::{Error, ErrorKind};
use crate::core::index::LineIndex;

/// Reads line `line` from `store` using the offsets recorded in `index`.
///
/// The returned text has surrounding whitespace and terminators removed.
pub fn read_line<S: Read + Seek>(
    store: &mut S,
    index: &LineIndex,
    line: usize,
) -> Result<String, Error> {
    let Some(span) = index.span(line) else {
        return Err(Error::new(ErrorKind::OutOfRange)
            .with_message(format!("line out of range (0..{})", index.line_count()))
            .with_line(line as u64));
    };
    if span.length == 0 {
        return Err(Error::new(ErrorKind::InvalidLength)
            .with_message("line length is not positive")
            .with_line(line as u64)
            .with_offset(span.offset));
    }

    let landed = store.seek(SeekFrom::Start(span.offset)).map_err(|err| {
        Error::new(ErrorKind::SeekMismatch)
            .with_line(line as u64)
            .with_offset(span.offset)
            .with_source(err)
    })?;
    if landed != span.offset {
        return Err(Error::new(ErrorKind::SeekMismatch)
            .with_message(format!("seek landed at {landed}"))
            .with_line(line as u64)
            .with_offset(span.offset));
    }

    let mut buf = Vec::with_capacity(span.length as usize);
    store
        .by_ref()
        .take(span.length)
        .read_to_end(&mut buf)
        .map_err(|err| {
            Error::new(ErrorKind::ShortRead)
                .with_line(line as u64)
                .with_offset(span.offset)
                .with_source(err)
        })?;
    if (buf.len() as u64) < span.length {
        return Err(Error::new(ErrorKind::ShortRead)
            .with_message(format!("expected {} bytes, got {}", span.length, buf.len()))
            .with_line(line as u64)
            .with_offset(span.offset));
    }

    decode_ascii(&buf)
        .map(|text| text.trim().to_string())
        .map_err(|bad_at| {
            Error::new(ErrorKind::DecodeFailure)
                .with_message("line is not ascii text")
                .with_line(line as u64)
                .with_offset(span.offset + bad_at as u64)
        })
}

// Err carries the position of the first byte outside the ASCII range.
fn decode_ascii(bytes: &[u8]) -> Result<&str, usize> {
    if let Some(bad_at) = bytes.iter().position(|byte| !byte.is_ascii()) {
        return Err(bad_at);
    }
    bytes.to_str().map_err(|err| err.valid_up_to())
}
