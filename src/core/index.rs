// Byte-offset line index built in one forward pass over the store.
// CR and LF are both terminators; runs of them coalesce into one boundary.
use std::io::{self, Read};

use bstr::ByteSlice;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;
const TERMINATORS: &[u8] = b"\r\n";

/// Offset and byte length of one indexed line, terminator bytes included.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineSpan {
    pub offset: u64,
    pub length: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LineIndex {
    offsets: Vec<u64>,
    total_length: u64,
    terminated: bool,
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `reader` to its end in `chunk_size` pieces, never holding more than one chunk.
    pub fn build<R: Read>(reader: &mut R, chunk_size: usize) -> io::Result<Self> {
        let mut buf = vec![0u8; chunk_size.max(1)];
        let mut offsets = vec![0u64];
        let mut pos = 0u64;
        let mut eol = false;

        loop {
            let read = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            scan_chunk(&buf[..read], pos, &mut eol, &mut offsets);
            pos += read as u64;
        }

        if pos == 0 {
            return Ok(Self::default());
        }
        Ok(Self {
            offsets,
            total_length: pos,
            terminated: eol,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(offsets: Vec<u64>, total_length: u64) -> Self {
        Self {
            offsets,
            total_length,
            terminated: false,
        }
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    pub fn offset(&self, line: usize) -> Option<u64> {
        self.offsets.get(line).copied()
    }

    /// True when the store's final byte is a line terminator (or the store is empty).
    pub fn ends_with_terminator(&self) -> bool {
        self.offsets.is_empty() || self.terminated
    }

    pub fn span(&self, line: usize) -> Option<LineSpan> {
        let offset = self.offset(line)?;
        let end = match self.offsets.get(line + 1) {
            Some(next) => *next,
            None => self.total_length,
        };
        Some(LineSpan {
            offset,
            length: end.saturating_sub(offset),
        })
    }

    /// Records a terminated line written at `offset`, leaving the store `total_length` long.
    pub fn push_line(&mut self, offset: u64, total_length: u64) {
        debug_assert!(self.offsets.last().is_none_or(|last| *last < offset));
        debug_assert!(offset < total_length);
        self.offsets.push(offset);
        self.total_length = total_length;
        self.terminated = true;
    }
}

fn scan_chunk(chunk: &[u8], base: u64, eol: &mut bool, offsets: &mut Vec<u64>) {
    let mut at = 0usize;
    while at < chunk.len() {
        let rest = &chunk[at..];
        if *eol {
            let Some(skip) = rest.find_not_byteset(TERMINATORS) else {
                return;
            };
            at += skip;
            offsets.push(base + at as u64);
            *eol = false;
            at += 1;
        } else {
            let Some(found) = rest.find_byteset(TERMINATORS) else {
                return;
            };
            at += found + 1;
            *eol = true;
        }
    }
}
